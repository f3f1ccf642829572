use actix_web::{http::StatusCode, web, web::ServiceConfig};
use caja_engine::{
    db_types::{OrderStatusType, StockAdjustment},
    events::EventProducers,
    traits::SettlementError,
    SettlementApi,
};
use mp_tools::{MercadoPagoApi, MercadoPagoConfig};
use serde_json::json;

use super::helpers::{order_fixture, post_request};
use crate::{
    endpoint_tests::mocks::MockSettlementDb,
    routes::{order_created, payment_webhook},
};

fn register(cfg: &mut ServiceConfig, db: MockSettlementDb) {
    let api = SettlementApi::new(db, EventProducers::default());
    let mp_api = MercadoPagoApi::new(MercadoPagoConfig::default()).expect("Could not build gateway client");
    cfg.app_data(web::Data::new(api))
        .app_data(web::Data::new(mp_api))
        .service(web::resource("/webhook/payment").route(web::post().to(payment_webhook::<MockSettlementDb>)))
        .service(web::resource("/webhook/order_created").route(web::post().to(order_created::<MockSettlementDb>)));
}

fn transfer_payload(status: &str) -> serde_json::Value {
    json!({"payment_method": "transfer", "external_reference": "FEG-0042", "status": status})
}

#[actix_web::test]
async fn transfer_approval_settles_and_returns_ok() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request("/webhook/payment", transfer_payload("approved"), configure_settle).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");
}

fn configure_settle(cfg: &mut ServiceConfig) {
    let mut db = MockSettlementDb::new();
    db.expect_fetch_order_by_reference()
        .returning(|_| Ok(Some(order_fixture(OrderStatusType::PendingConfirmation))));
    db.expect_update_order_payment().times(1).returning(|_, status, payment_id, paid_at| {
        let mut order = order_fixture(status);
        order.payment_id = Some(payment_id.to_string());
        order.paid_at = paid_at;
        Ok(order)
    });
    db.expect_debit_stock()
        .times(1)
        .returning(|product_id, quantity| {
            Ok(StockAdjustment { product_id: product_id.to_string(), quantity, new_stock: 3 })
        });
    register(cfg, db);
}

#[actix_web::test]
async fn redelivered_notification_is_a_silent_noop() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request("/webhook/payment", transfer_payload("approved"), configure_noop).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");
}

fn configure_noop(cfg: &mut ServiceConfig) {
    let mut db = MockSettlementDb::new();
    // The order is already approved. No update and no stock debit may be attempted, so no other
    // expectations are registered: any write would panic the mock.
    db.expect_fetch_order_by_reference().returning(|_| Ok(Some(order_fixture(OrderStatusType::Approved))));
    register(cfg, db);
}

#[actix_web::test]
async fn unknown_reference_is_a_404() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request("/webhook/payment", transfer_payload("approved"), configure_missing).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("not found"));
}

fn configure_missing(cfg: &mut ServiceConfig) {
    let mut db = MockSettlementDb::new();
    db.expect_fetch_order_by_reference().returning(|_| Ok(None));
    register(cfg, db);
}

#[actix_web::test]
async fn malformed_payloads_are_400() {
    let _ = env_logger::try_init().ok();
    let (status, _) = post_request("/webhook/payment", json!({"foo": 1}), configure_untouched).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn unknown_status_in_transfer_shape_is_400() {
    let _ = env_logger::try_init().ok();
    let (status, body) =
        post_request("/webhook/payment", transfer_payload("definitely-paid"), configure_untouched).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Invalid order status"));
}

fn configure_untouched(cfg: &mut ServiceConfig) {
    // The request must be rejected before any storage call is made.
    register(cfg, MockSettlementDb::new());
}

#[actix_web::test]
async fn order_created_registers_transfer_orders() {
    let _ = env_logger::try_init().ok();
    let payload = json!({
        "reference": "FEG-0042",
        "email": "buyer@example.com",
        "total": 280000,
        "payment_method": "transfer",
        "products": [{"id": "p1", "name": "Yerba 1kg", "quantity": 2}]
    });
    let (status, body) = post_request("/webhook/order_created", payload, configure_creation).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""success":true"#));
}

fn configure_creation(cfg: &mut ServiceConfig) {
    let mut db = MockSettlementDb::new();
    db.expect_insert_order().returning(|order| {
        let mut stored = order_fixture(OrderStatusType::Pending);
        stored.reference = order.reference;
        Ok((stored, true))
    });
    db.expect_set_transfer_tokens().returning(|_, confirm, reject| {
        let mut order = order_fixture(OrderStatusType::PendingConfirmation);
        order.confirm_token = Some(confirm.to_string());
        order.reject_token = Some(reject.to_string());
        Ok(order)
    });
    register(cfg, db);
}

#[actix_web::test]
async fn order_created_answers_200_even_when_storage_fails() {
    let _ = env_logger::try_init().ok();
    let payload = json!({
        "reference": "FEG-0042",
        "email": "buyer@example.com",
        "total": 280000,
        "payment_method": "transfer",
        "products": []
    });
    let (status, body) = post_request("/webhook/order_created", payload, configure_creation_failure).await;
    // The event source would retry forever on a 5xx; failures are reported in the body only.
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""success":false"#));
}

fn configure_creation_failure(cfg: &mut ServiceConfig) {
    let mut db = MockSettlementDb::new();
    db.expect_insert_order().returning(|_| Err(SettlementError::DatabaseError("disk is a lie".to_string())));
    register(cfg, db);
}
