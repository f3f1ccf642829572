//! `SqliteDatabase` is the concrete SQLite implementation of the settlement storage contract.
//!
//! It holds a connection pool; transactions are begun here and handed down to the low-level query
//! functions in [`super::db`]. Note which methods get a transaction and which get a plain
//! connection: only order insertion (order + line items must land together) and the per-product
//! stock debit are transactional. Order status reads and writes deliberately are not.
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::db::{new_pool, orders, products, users};
use crate::{
    db_types::{NewOrder, Order, OrderStatusType, Product, StockAdjustment},
    traits::{SettlementDatabase, SettlementError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, SettlementError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl SettlementDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_order(&self, order: NewOrder) -> Result<(Order, bool), SettlementError> {
        let mut tx = self.pool.begin().await?;
        let result = orders::idempotent_insert(order, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn fetch_order_by_reference(&self, reference: &str) -> Result<Option<Order>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_by_reference(reference, &mut conn).await
    }

    async fn fetch_order_by_id(&self, id: i64) -> Result<Option<Order>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_by_id(id, &mut conn).await
    }

    async fn update_order_payment(
        &self,
        id: i64,
        status: OrderStatusType,
        payment_id: &str,
        paid_at: Option<DateTime<Utc>>,
    ) -> Result<Order, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        orders::update_order_payment(id, status, payment_id, paid_at, &mut conn).await
    }

    async fn update_order_status(&self, id: i64, status: OrderStatusType) -> Result<Order, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        orders::update_order_status(id, status, &mut conn).await
    }

    async fn set_transfer_tokens(
        &self,
        id: i64,
        confirm_token: &str,
        reject_token: &str,
    ) -> Result<Order, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        orders::set_transfer_tokens(id, confirm_token, reject_token, &mut conn).await
    }

    /// Each debit runs in its own transaction, so concurrent settlements that touch the same
    /// product serialize on the stock field and cannot lose updates.
    async fn debit_stock(&self, product_id: &str, quantity: i64) -> Result<StockAdjustment, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let adjustment = products::debit_stock(product_id, quantity, &mut tx).await?;
        tx.commit().await?;
        Ok(adjustment)
    }

    async fn fetch_product(&self, product_id: &str) -> Result<Option<Product>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        products::fetch_product(product_id, &mut conn).await
    }

    async fn fetch_admin_flag(&self, uid: &str) -> Result<Option<bool>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        users::fetch_admin_flag(uid, &mut conn).await
    }
}
