use log::warn;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Product, StockAdjustment},
    traits::SettlementError,
};

pub async fn fetch_product(
    product_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Product>, SettlementError> {
    let product =
        sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(product_id).fetch_optional(conn).await?;
    Ok(product)
}

/// Read-modify-write of a single product's stock. Callers MUST run this inside a transaction scoped
/// to the product, otherwise concurrent settlements touching the same product can lose updates.
///
/// A negative result is allowed and only warned about: settlement availability wins over strict
/// inventory enforcement.
pub(crate) async fn debit_stock(
    product_id: &str,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<StockAdjustment, SettlementError> {
    let product = fetch_product(product_id, &mut *conn)
        .await?
        .ok_or_else(|| SettlementError::ProductNotFound(product_id.to_string()))?;
    let new_stock = product.stock - quantity;
    if new_stock < 0 {
        warn!("📦 Negative stock detected for product {product_id}: {new_stock} after selling {quantity} unit(s)");
    }
    sqlx::query("UPDATE products SET stock = $1, last_sold = CURRENT_TIMESTAMP WHERE id = $2")
        .bind(new_stock)
        .bind(product_id)
        .execute(conn)
        .await?;
    Ok(StockAdjustment { product_id: product_id.to_string(), quantity, new_stock })
}

/// Insert or replace a product row. Products are owned by the storefront's catalogue; the engine
/// only needs this for seeding.
pub async fn upsert_product(product: &Product, conn: &mut SqliteConnection) -> Result<(), SettlementError> {
    sqlx::query(
        "INSERT INTO products (id, name, stock, last_sold) VALUES ($1, $2, $3, $4) ON CONFLICT (id) DO UPDATE SET \
         name = excluded.name, stock = excluded.stock, last_sold = excluded.last_sold",
    )
    .bind(&product.id)
    .bind(&product.name)
    .bind(product.stock)
    .bind(product.last_sold)
    .execute(conn)
    .await?;
    Ok(())
}
