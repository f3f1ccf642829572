use actix_web::{http::StatusCode, test, test::TestRequest, web::ServiceConfig, App};
use caja_common::Pesos;
use caja_engine::db_types::{Order, OrderItem, OrderStatusType, PaymentMethod};
use chrono::{TimeZone, Utc};

pub async fn get_request(path: &str, configure: fn(&mut ServiceConfig)) -> (StatusCode, String) {
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    let req = TestRequest::get().uri(path).to_request();
    let res = test::call_service(&service, req).await;
    let status = res.status();
    let body = String::from_utf8_lossy(&test::read_body(res).await).into_owned();
    (status, body)
}

pub async fn post_request(
    path: &str,
    body: serde_json::Value,
    configure: fn(&mut ServiceConfig),
) -> (StatusCode, String) {
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    let req = TestRequest::post().uri(path).set_json(body).to_request();
    let res = test::call_service(&service, req).await;
    let status = res.status();
    let body = String::from_utf8_lossy(&test::read_body(res).await).into_owned();
    (status, body)
}

/// A bank-transfer order with one line item and both tokens populated, in the given status.
pub fn order_fixture(status: OrderStatusType) -> Order {
    Order {
        id: 42,
        reference: "FEG-0042".to_string(),
        status,
        payment_method: PaymentMethod::Transfer,
        payment_id: None,
        email: "buyer@example.com".to_string(),
        total: Pesos::from_pesos(2800),
        confirm_token: Some("tok-confirm".to_string()),
        reject_token: Some("tok-reject".to_string()),
        created_at: Utc.with_ymd_and_hms(2024, 12, 7, 12, 0, 0).unwrap(),
        updated_at: Utc.with_ymd_and_hms(2024, 12, 7, 12, 0, 0).unwrap(),
        paid_at: None,
        items: vec![OrderItem {
            id: 1,
            order_id: 42,
            product_id: "p1".to_string(),
            name: "Yerba 1kg".to_string(),
            quantity: 2,
        }],
    }
}
