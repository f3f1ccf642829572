use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::db_types::{NewOrder, Order, OrderStatusType, Product, StockAdjustment};

#[derive(Debug, Clone, Error)]
pub enum SettlementError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("No order matches reference '{0}'")]
    OrderNotFound(String),
    #[error("Order #{0} does not exist")]
    OrderIdNotFound(i64),
    #[error("Product '{0}' not found")]
    ProductNotFound(String),
    #[error("The supplied token does not match the order")]
    TokenMismatch,
    #[error("Order #{0} is already {1} and cannot be modified")]
    OrderAlreadyFinal(i64, OrderStatusType),
}

impl From<sqlx::Error> for SettlementError {
    fn from(e: sqlx::Error) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

/// The storage contract for the settlement workflow.
///
/// The granularity of these methods *is* the concurrency model: [`Self::debit_stock`] is the only
/// operation that runs inside a storage transaction, so two settlements racing on the same product
/// serialize correctly for the stock field, while the order-level fetch/update pair deliberately
/// does not get that protection (see the duplicate-settlement hazard test).
#[allow(async_fn_in_trait)]
pub trait SettlementDatabase {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Store a new order together with its line items, atomically. The call is idempotent on the
    /// order's `reference`: if an order with that reference already exists, it is returned unchanged
    /// and the second element is `false`.
    async fn insert_order(&self, order: NewOrder) -> Result<(Order, bool), SettlementError>;

    /// Resolve an external reference to an order. If several orders carry the same reference
    /// (storage does not enforce uniqueness), the first match wins.
    async fn fetch_order_by_reference(&self, reference: &str) -> Result<Option<Order>, SettlementError>;

    async fn fetch_order_by_id(&self, id: i64) -> Result<Option<Order>, SettlementError>;

    /// Write the payment outcome onto the order: new status, gateway payment id, approval timestamp,
    /// and a server-assigned `updated_at`.
    async fn update_order_payment(
        &self,
        id: i64,
        status: OrderStatusType,
        payment_id: &str,
        paid_at: Option<DateTime<Utc>>,
    ) -> Result<Order, SettlementError>;

    /// Status-only update (used by the reject flow, which never touches payment fields or stock).
    async fn update_order_status(&self, id: i64, status: OrderStatusType) -> Result<Order, SettlementError>;

    /// Attach freshly generated confirm/reject tokens to a bank-transfer order and move it to
    /// `pending_confirmation`.
    async fn set_transfer_tokens(
        &self,
        id: i64,
        confirm_token: &str,
        reject_token: &str,
    ) -> Result<Order, SettlementError>;

    /// Subtract `quantity` from the product's stock and stamp `last_sold`, inside a single atomic
    /// transaction scoped to that product. Oversell is permitted (the new stock may be negative).
    async fn debit_stock(&self, product_id: &str, quantity: i64) -> Result<StockAdjustment, SettlementError>;

    async fn fetch_product(&self, product_id: &str) -> Result<Option<Product>, SettlementError>;

    /// The admin flag on the user record, or `None` if no such user exists.
    async fn fetch_admin_flag(&self, uid: &str) -> Result<Option<bool>, SettlementError>;
}
