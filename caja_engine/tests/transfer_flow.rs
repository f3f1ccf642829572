//! Integration tests for the bank-transfer confirmation flow.
mod support;

use caja_common::Pesos;
use caja_engine::{
    db_types::{NewOrder, OrderStatusType, PaymentMethod, BANK_TRANSFER_PAYMENT_ID},
    events::EventProducers,
    traits::{SettlementDatabase, SettlementError},
    SettlementApi,
    SettlementOutcome,
    SqliteDatabase,
};
use support::{prepare_test_env, random_db_path, seed};

fn transfer_order(reference: &str) -> NewOrder {
    NewOrder::new(reference, "buyer@example.com", Pesos::from_pesos(2800), PaymentMethod::Transfer)
        .with_item("p1", "Yerba 1kg", 2)
}

fn api(db: &SqliteDatabase) -> SettlementApi<SqliteDatabase> {
    SettlementApi::new(db.clone(), EventProducers::default())
}

#[tokio::test]
async fn gateway_orders_are_ignored_at_creation() {
    let url = random_db_path();
    let db = prepare_test_env(&url).await;
    let api = api(&db);

    let order = NewOrder::new("FEG-1000", "buyer@example.com", Pesos::from_pesos(100), PaymentMethod::Gateway);
    let result = api.register_transfer_order(order).await.expect("Registration failed");
    assert!(result.is_none());
    assert!(db.fetch_order_by_reference("FEG-1000").await.unwrap().is_none());
}

#[tokio::test]
async fn transfer_orders_get_tokens_and_pending_confirmation() {
    let url = random_db_path();
    let db = prepare_test_env(&url).await;
    let api = api(&db);

    let order = api
        .register_transfer_order(transfer_order("FEG-1001"))
        .await
        .expect("Registration failed")
        .expect("Transfer order should have been registered");
    assert_eq!(order.status, OrderStatusType::PendingConfirmation);
    let confirm = order.confirm_token.clone().expect("Missing confirm token");
    let reject = order.reject_token.clone().expect("Missing reject token");
    assert_ne!(confirm, reject);

    // A replayed creation event must not rotate the tokens or touch the order.
    let replay = api.register_transfer_order(transfer_order("FEG-1001")).await.expect("Replay failed");
    assert!(replay.is_none());
    let order = db.fetch_order_by_reference("FEG-1001").await.unwrap().unwrap();
    assert_eq!(order.confirm_token.as_deref(), Some(confirm.as_str()));
    assert_eq!(order.reject_token.as_deref(), Some(reject.as_str()));
}

#[tokio::test]
async fn confirm_with_wrong_token_mutates_nothing() {
    let url = random_db_path();
    let db = prepare_test_env(&url).await;
    seed::product(&db, "p1", "Yerba 1kg", 5).await;
    let api = api(&db);
    let order = api.register_transfer_order(transfer_order("FEG-1002")).await.unwrap().unwrap();

    let err = api.confirm_transfer(order.id, "not-the-token").await.expect_err("Expected a token mismatch");
    assert!(matches!(err, SettlementError::TokenMismatch));
    let order = db.fetch_order_by_id(order.id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::PendingConfirmation);
    assert_eq!(seed::stock_of(&db, "p1").await, 5);

    let err = api.confirm_transfer(99999, "whatever").await.expect_err("Expected a missing order");
    assert!(matches!(err, SettlementError::OrderIdNotFound(99999)));
}

#[tokio::test]
async fn confirm_settles_the_order_once() {
    let url = random_db_path();
    let db = prepare_test_env(&url).await;
    seed::product(&db, "p1", "Yerba 1kg", 5).await;
    let api = api(&db);
    let order = api.register_transfer_order(transfer_order("FEG-1003")).await.unwrap().unwrap();
    let token = order.confirm_token.clone().unwrap();

    let settled = api.confirm_transfer(order.id, &token).await.expect("Confirmation failed");
    let settled_order = match settled {
        SettlementOutcome::Applied { order, .. } => order,
        SettlementOutcome::AlreadyFinal { .. } => panic!("First confirmation must settle"),
    };
    assert_eq!(settled_order.status, OrderStatusType::Approved);
    assert_eq!(settled_order.payment_id.as_deref(), Some(BANK_TRANSFER_PAYMENT_ID));
    assert!(settled_order.paid_at.is_some());
    assert_eq!(seed::stock_of(&db, "p1").await, 3);

    // Double-submission of the same link is an explicit conflict, not a silent replay.
    let err = api.confirm_transfer(order.id, &token).await.expect_err("Expected a conflict");
    assert!(matches!(err, SettlementError::OrderAlreadyFinal(_, OrderStatusType::Approved)));
    assert_eq!(seed::stock_of(&db, "p1").await, 3);
}

#[tokio::test]
async fn reject_never_touches_stock_and_is_guarded() {
    let url = random_db_path();
    let db = prepare_test_env(&url).await;
    seed::product(&db, "p1", "Yerba 1kg", 5).await;
    let api = api(&db);
    let order = api.register_transfer_order(transfer_order("FEG-1004")).await.unwrap().unwrap();
    let reject = order.reject_token.clone().unwrap();
    let confirm = order.confirm_token.clone().unwrap();

    let err = api.reject_transfer(order.id, "bogus").await.expect_err("Expected a token mismatch");
    assert!(matches!(err, SettlementError::TokenMismatch));

    let rejected = api.reject_transfer(order.id, &reject).await.expect("Rejection failed");
    assert_eq!(rejected.status, OrderStatusType::Rejected);
    assert_eq!(seed::stock_of(&db, "p1").await, 5);

    // Tokens stop working once the order left pending_confirmation, even when correct.
    let err = api.reject_transfer(order.id, &reject).await.expect_err("Expected a conflict");
    assert!(matches!(err, SettlementError::OrderAlreadyFinal(_, OrderStatusType::Rejected)));
    let err = api.confirm_transfer(order.id, &confirm).await.expect_err("Expected a conflict");
    assert!(matches!(err, SettlementError::OrderAlreadyFinal(_, OrderStatusType::Rejected)));
    assert_eq!(seed::stock_of(&db, "p1").await, 5);
}

#[tokio::test]
async fn reject_on_an_approved_order_keeps_it_approved() {
    let url = random_db_path();
    let db = prepare_test_env(&url).await;
    seed::product(&db, "p1", "Yerba 1kg", 5).await;
    let api = api(&db);
    let order = api.register_transfer_order(transfer_order("FEG-1005")).await.unwrap().unwrap();
    let confirm = order.confirm_token.clone().unwrap();
    let reject = order.reject_token.clone().unwrap();

    api.confirm_transfer(order.id, &confirm).await.expect("Confirmation failed");
    let err = api.reject_transfer(order.id, &reject).await.expect_err("Expected a conflict");
    assert!(matches!(err, SettlementError::OrderAlreadyFinal(_, OrderStatusType::Approved)));
    let order = db.fetch_order_by_id(order.id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::Approved);
}

#[tokio::test]
async fn admin_flag_lookup() {
    let url = random_db_path();
    let db = prepare_test_env(&url).await;
    let mut conn = db.pool().acquire().await.unwrap();
    caja_engine::sqlite::db::users::upsert_user("u-admin", Some("seller@example.com"), true, &mut conn)
        .await
        .unwrap();
    caja_engine::sqlite::db::users::upsert_user("u-buyer", None, false, &mut conn).await.unwrap();
    drop(conn);
    let api = api(&db);

    assert!(api.is_admin("u-admin").await.unwrap());
    assert!(!api.is_admin("u-buyer").await.unwrap());
    assert!(!api.is_admin("nobody").await.unwrap());
}
