use chrono::{DateTime, Utc};
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewOrder, Order, OrderItem, OrderStatusType},
    traits::SettlementError,
};

/// Inserts the order into the database, returning `false` in the second parameter if an order with
/// the same reference already exists. First writes win; replayed creation events are no-ops.
pub async fn idempotent_insert(
    order: NewOrder,
    conn: &mut SqliteConnection,
) -> Result<(Order, bool), SettlementError> {
    let inserted = match fetch_order_by_reference(&order.reference, &mut *conn).await? {
        Some(order) => (order, false),
        None => {
            let order = insert_order(order, conn).await?;
            debug!("📝 Order {} inserted with id {}", order.reference, order.id);
            (order, true)
        },
    };
    Ok(inserted)
}

/// Inserts a new order and its line items using the given connection. This is not atomic by itself.
/// Embed the call inside a transaction and pass `&mut *tx` as the connection argument to make it so.
async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, SettlementError> {
    let mut inserted: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                reference,
                payment_method,
                email,
                total,
                created_at
            ) VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(order.reference)
    .bind(order.payment_method)
    .bind(order.email)
    .bind(order.total)
    .bind(order.created_at)
    .fetch_one(&mut *conn)
    .await?;
    for item in order.items {
        sqlx::query("INSERT INTO order_items (order_id, product_id, name, quantity) VALUES ($1, $2, $3, $4)")
            .bind(inserted.id)
            .bind(item.product_id)
            .bind(item.name)
            .bind(item.quantity)
            .execute(&mut *conn)
            .await?;
    }
    inserted.items = fetch_items_for_order(inserted.id, conn).await?;
    Ok(inserted)
}

/// Resolves an external reference to the first matching order, with its line items attached.
/// The reference column is not unique; `LIMIT 1` encodes the single-result assumption.
pub async fn fetch_order_by_reference(
    reference: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, SettlementError> {
    let order: Option<Order> = sqlx::query_as("SELECT * FROM orders WHERE reference = $1 LIMIT 1")
        .bind(reference)
        .fetch_optional(&mut *conn)
        .await?;
    attach_items(order, conn).await
}

pub async fn fetch_order_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, SettlementError> {
    let order: Option<Order> =
        sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(&mut *conn).await?;
    attach_items(order, conn).await
}

async fn attach_items(order: Option<Order>, conn: &mut SqliteConnection) -> Result<Option<Order>, SettlementError> {
    match order {
        Some(order) => with_items(order, conn).await.map(Some),
        None => Ok(None),
    }
}

async fn with_items(mut order: Order, conn: &mut SqliteConnection) -> Result<Order, SettlementError> {
    order.items = fetch_items_for_order(order.id, conn).await?;
    Ok(order)
}

pub async fn fetch_items_for_order(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderItem>, SettlementError> {
    let items = sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(items)
}

/// Writes the payment outcome onto the order. `updated_at` is always server-assigned.
pub(crate) async fn update_order_payment(
    id: i64,
    status: OrderStatusType,
    payment_id: &str,
    paid_at: Option<DateTime<Utc>>,
    conn: &mut SqliteConnection,
) -> Result<Order, SettlementError> {
    let result: Option<Order> = sqlx::query_as(
        "UPDATE orders SET status = $1, payment_id = $2, paid_at = $3, updated_at = CURRENT_TIMESTAMP WHERE id = \
         $4 RETURNING *",
    )
    .bind(status)
    .bind(payment_id)
    .bind(paid_at)
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    let order = result.ok_or(SettlementError::OrderIdNotFound(id))?;
    with_items(order, conn).await
}

pub(crate) async fn update_order_status(
    id: i64,
    status: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Order, SettlementError> {
    let result: Option<Order> =
        sqlx::query_as("UPDATE orders SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *")
            .bind(status)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
    let order = result.ok_or(SettlementError::OrderIdNotFound(id))?;
    with_items(order, conn).await
}

/// Stores the confirm/reject tokens for a bank-transfer order and moves it to
/// `pending_confirmation`.
pub(crate) async fn set_transfer_tokens(
    id: i64,
    confirm_token: &str,
    reject_token: &str,
    conn: &mut SqliteConnection,
) -> Result<Order, SettlementError> {
    let result: Option<Order> = sqlx::query_as(
        "UPDATE orders SET confirm_token = $1, reject_token = $2, status = $3, updated_at = CURRENT_TIMESTAMP \
         WHERE id = $4 RETURNING *",
    )
    .bind(confirm_token)
    .bind(reject_token)
    .bind(OrderStatusType::PendingConfirmation)
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    let order = result.ok_or(SettlementError::OrderIdNotFound(id))?;
    with_items(order, conn).await
}
