use sqlx::SqliteConnection;

use crate::traits::SettlementError;

/// The admin flag for the given user id, or `None` if the user record does not exist.
pub async fn fetch_admin_flag(uid: &str, conn: &mut SqliteConnection) -> Result<Option<bool>, SettlementError> {
    let row: Option<(bool,)> =
        sqlx::query_as("SELECT is_admin FROM users WHERE uid = $1").bind(uid).fetch_optional(conn).await?;
    Ok(row.map(|r| r.0))
}

pub async fn upsert_user(
    uid: &str,
    email: Option<&str>,
    is_admin: bool,
    conn: &mut SqliteConnection,
) -> Result<(), SettlementError> {
    sqlx::query(
        "INSERT INTO users (uid, email, is_admin) VALUES ($1, $2, $3) ON CONFLICT (uid) DO UPDATE SET email = \
         excluded.email, is_admin = excluded.is_admin",
    )
    .bind(uid)
    .bind(email)
    .bind(is_admin)
    .execute(conn)
    .await?;
    Ok(())
}
