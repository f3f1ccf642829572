use caja_engine::{
    db_types::{NewOrder, Order, OrderStatusType, Product, StockAdjustment},
    traits::{SettlementDatabase, SettlementError},
};
use chrono::{DateTime, Utc};
use mockall::mock;

mock! {
    pub SettlementDb {}
    impl SettlementDatabase for SettlementDb {
        fn url(&self) -> &str;
        async fn insert_order(&self, order: NewOrder) -> Result<(Order, bool), SettlementError>;
        async fn fetch_order_by_reference(&self, reference: &str) -> Result<Option<Order>, SettlementError>;
        async fn fetch_order_by_id(&self, id: i64) -> Result<Option<Order>, SettlementError>;
        async fn update_order_payment(
            &self,
            id: i64,
            status: OrderStatusType,
            payment_id: &str,
            paid_at: Option<DateTime<Utc>>,
        ) -> Result<Order, SettlementError>;
        async fn update_order_status(&self, id: i64, status: OrderStatusType) -> Result<Order, SettlementError>;
        async fn set_transfer_tokens(
            &self,
            id: i64,
            confirm_token: &str,
            reject_token: &str,
        ) -> Result<Order, SettlementError>;
        async fn debit_stock(&self, product_id: &str, quantity: i64) -> Result<StockAdjustment, SettlementError>;
        async fn fetch_product(&self, product_id: &str) -> Result<Option<Product>, SettlementError>;
        async fn fetch_admin_flag(&self, uid: &str) -> Result<Option<bool>, SettlementError>;
    }
}
