use actix_web::{http::StatusCode, web, web::ServiceConfig};
use caja_engine::{
    db_types::{OrderStatusType, StockAdjustment},
    events::EventProducers,
    SettlementApi,
};
use mp_tools::{MercadoPagoApi, MercadoPagoConfig};

use super::helpers::{get_request, order_fixture};
use crate::routes::{admin_check, confirm_transfer, health, payment_webhook, reject_transfer};
use crate::endpoint_tests::mocks::MockSettlementDb;

fn register(cfg: &mut ServiceConfig, db: MockSettlementDb) {
    let api = SettlementApi::new(db, EventProducers::default());
    let mp_api = MercadoPagoApi::new(MercadoPagoConfig::default()).expect("Could not build gateway client");
    cfg.app_data(web::Data::new(api))
        .app_data(web::Data::new(mp_api))
        .service(health)
        .service(web::resource("/webhook/payment").route(web::post().to(payment_webhook::<MockSettlementDb>)))
        .service(web::resource("/transfer/confirm").route(web::get().to(confirm_transfer::<MockSettlementDb>)))
        .service(web::resource("/transfer/reject").route(web::get().to(reject_transfer::<MockSettlementDb>)))
        .service(web::resource("/admin/check").route(web::get().to(admin_check::<MockSettlementDb>)));
}

#[actix_web::test]
async fn health_check() {
    let _ = env_logger::try_init().ok();
    let (status, _) = get_request("/health", configure_untouched).await;
    assert_eq!(status, StatusCode::OK);
}

fn configure_untouched(cfg: &mut ServiceConfig) {
    register(cfg, MockSettlementDb::new());
}

#[actix_web::test]
async fn confirm_settles_the_order() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/transfer/confirm?orderId=42&token=tok-confirm", configure_confirm).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("FEG-0042"));
}

fn configure_confirm(cfg: &mut ServiceConfig) {
    let mut db = MockSettlementDb::new();
    db.expect_fetch_order_by_id()
        .returning(|_| Ok(Some(order_fixture(OrderStatusType::PendingConfirmation))));
    db.expect_fetch_order_by_reference()
        .returning(|_| Ok(Some(order_fixture(OrderStatusType::PendingConfirmation))));
    db.expect_update_order_payment().times(1).returning(|_, status, payment_id, paid_at| {
        let mut order = order_fixture(status);
        order.payment_id = Some(payment_id.to_string());
        order.paid_at = paid_at;
        Ok(order)
    });
    db.expect_debit_stock().times(1).returning(|product_id, quantity| {
        Ok(StockAdjustment { product_id: product_id.to_string(), quantity, new_stock: 3 })
    });
    register(cfg, db);
}

#[actix_web::test]
async fn confirm_with_a_mismatched_token_is_400() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/transfer/confirm?orderId=42&token=guessing", configure_pending).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Invalid token"));
}

#[actix_web::test]
async fn reject_with_a_mismatched_token_is_400() {
    let _ = env_logger::try_init().ok();
    let (status, _) = get_request("/transfer/reject?orderId=42&token=guessing", configure_pending).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

fn configure_pending(cfg: &mut ServiceConfig) {
    let mut db = MockSettlementDb::new();
    // A wrong token must end the request here: no write expectations are registered.
    db.expect_fetch_order_by_id()
        .returning(|_| Ok(Some(order_fixture(OrderStatusType::PendingConfirmation))));
    register(cfg, db);
}

#[actix_web::test]
async fn confirm_for_an_unknown_order_is_400() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/transfer/confirm?orderId=9999&token=tok-confirm", configure_no_order).await;
    // Deliberately indistinguishable from a bad token.
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Invalid token"));
}

fn configure_no_order(cfg: &mut ServiceConfig) {
    let mut db = MockSettlementDb::new();
    db.expect_fetch_order_by_id().returning(|_| Ok(None));
    register(cfg, db);
}

#[actix_web::test]
async fn confirm_on_a_settled_order_is_a_conflict() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/transfer/confirm?orderId=42&token=tok-confirm", configure_final).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("already approved"));
}

#[actix_web::test]
async fn reject_on_a_settled_order_is_a_conflict() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/transfer/reject?orderId=42&token=tok-reject", configure_final).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("already approved"));
}

fn configure_final(cfg: &mut ServiceConfig) {
    let mut db = MockSettlementDb::new();
    db.expect_fetch_order_by_id().returning(|_| Ok(Some(order_fixture(OrderStatusType::Approved))));
    register(cfg, db);
}

#[actix_web::test]
async fn reject_marks_the_order_rejected() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/transfer/reject?orderId=42&token=tok-reject", configure_reject).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("FEG-0042"));
}

fn configure_reject(cfg: &mut ServiceConfig) {
    let mut db = MockSettlementDb::new();
    db.expect_fetch_order_by_id()
        .returning(|_| Ok(Some(order_fixture(OrderStatusType::PendingConfirmation))));
    db.expect_update_order_status().times(1).returning(|_, status| Ok(order_fixture(status)));
    register(cfg, db);
}

#[actix_web::test]
async fn admin_check_reports_the_flag() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/admin/check?uid=u-admin", configure_admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "true");

    let (status, body) = get_request("/admin/check?uid=nobody", configure_admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "false");
}

fn configure_admin(cfg: &mut ServiceConfig) {
    let mut db = MockSettlementDb::new();
    db.expect_fetch_admin_flag().returning(|uid| Ok(if uid == "u-admin" { Some(true) } else { None }));
    register(cfg, db);
}
