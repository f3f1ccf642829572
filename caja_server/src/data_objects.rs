use std::fmt::Display;

use caja_common::Pesos;
use caja_engine::db_types::{NewOrder, NewOrderItem, PaymentMethod};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

//----------------------------------------  PaymentNotification  ------------------------------------------------------
/// An inbound settlement notification. Two shapes arrive on the same route:
///
/// * the gateway's asynchronous callback, `{ "data": { "id": <paymentId> } }`, which carries only an
///   opaque payment id and requires a secondary lookup against the gateway;
/// * the self-originated transfer shape,
///   `{ "payment_method": "transfer", "external_reference": ..., "status": ... }`, which is already
///   complete.
///
/// Dispatch is by variant, not by ad hoc field sniffing; anything that matches neither shape is a
/// 400 at the extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PaymentNotification {
    Gateway { data: GatewayNotificationData },
    Transfer { payment_method: PaymentMethod, external_reference: String, status: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayNotificationData {
    /// The gateway sends the payment id as a string in webhooks and as a number in older IPN
    /// payloads. Accept both.
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where D: Deserializer<'de> {
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("expected a string or number, got {other}"))),
    }
}

//------------------------------------------  IncomingOrder  ----------------------------------------------------------
/// The full order payload carried by an order-creation event. Field aliases accept the storefront's
/// original camelCase spelling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingOrder {
    pub reference: String,
    pub email: String,
    pub total: Pesos,
    #[serde(alias = "paymentMethod")]
    pub payment_method: PaymentMethod,
    #[serde(default = "Utc::now")]
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub products: Vec<IncomingOrderItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingOrderItem {
    #[serde(alias = "id")]
    pub product_id: String,
    pub name: String,
    pub quantity: i64,
}

impl From<IncomingOrder> for NewOrder {
    fn from(order: IncomingOrder) -> Self {
        let items = order
            .products
            .into_iter()
            .map(|p| NewOrderItem { product_id: p.product_id, name: p.name, quantity: p.quantity })
            .collect();
        NewOrder {
            reference: order.reference,
            email: order.email,
            total: order.total,
            payment_method: order.payment_method,
            created_at: order.date,
            items,
        }
    }
}

//-------------------------------------------  Query params  ----------------------------------------------------------
/// Query parameters of the confirm/reject action links.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenParams {
    #[serde(rename = "orderId")]
    pub order_id: i64,
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminCheckParams {
    pub uid: String,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn gateway_shape_parses_with_string_or_numeric_id() {
        let n: PaymentNotification = serde_json::from_str(r#"{"data": {"id": "12345"}}"#).unwrap();
        assert!(matches!(n, PaymentNotification::Gateway { ref data } if data.id == "12345"));
        let n: PaymentNotification = serde_json::from_str(r#"{"data": {"id": 12345}}"#).unwrap();
        assert!(matches!(n, PaymentNotification::Gateway { ref data } if data.id == "12345"));
    }

    #[test]
    fn transfer_shape_parses() {
        let n: PaymentNotification = serde_json::from_str(
            r#"{"payment_method": "transfer", "external_reference": "FEG-007", "status": "approved"}"#,
        )
        .unwrap();
        match n {
            PaymentNotification::Transfer { payment_method, external_reference, status } => {
                assert_eq!(payment_method, PaymentMethod::Transfer);
                assert_eq!(external_reference, "FEG-007");
                assert_eq!(status, "approved");
            },
            PaymentNotification::Gateway { .. } => panic!("Wrong variant"),
        }
    }

    #[test]
    fn unrecognized_shapes_are_rejected() {
        assert!(serde_json::from_str::<PaymentNotification>(r#"{"foo": 1}"#).is_err());
        assert!(serde_json::from_str::<PaymentNotification>(r#"{"data": {}}"#).is_err());
    }

    #[test]
    fn incoming_order_accepts_the_storefront_spelling() {
        let order: IncomingOrder = serde_json::from_str(
            r#"{
                "reference": "FEG-010",
                "email": "buyer@example.com",
                "total": 250000,
                "paymentMethod": "transfer",
                "products": [{"id": "p1", "name": "Yerba 1kg", "quantity": 2}]
            }"#,
        )
        .unwrap();
        assert_eq!(order.payment_method, PaymentMethod::Transfer);
        assert_eq!(order.products[0].product_id, "p1");
        let new_order = NewOrder::from(order);
        assert_eq!(new_order.items.len(), 1);
        assert_eq!(new_order.total, Pesos::from_pesos(2500));
    }
}
