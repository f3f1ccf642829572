use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The subset of the gateway's payment record that the settlement workflow cares about.
/// Unknown fields in the response are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentResource {
    pub id: u64,
    pub status: String,
    /// The merchant-supplied correlation string. The gateway echoes back whatever the checkout sent,
    /// so it can be absent on payments created outside the storefront.
    pub external_reference: Option<String>,
    #[serde(default)]
    pub date_approved: Option<DateTime<Utc>>,
    #[serde(default)]
    pub payment_method_id: Option<String>,
    #[serde(default)]
    pub transaction_amount: Option<f64>,
}

impl PaymentResource {
    /// The transaction amount in centavos. The gateway reports a decimal number of pesos.
    pub fn amount_centavos(&self) -> Option<i64> {
        #[allow(clippy::cast_possible_truncation)]
        self.transaction_amount.map(|a| (a * 100.0).round() as i64)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const PAYMENT_JSON: &str = r#"{
        "id": 123456789,
        "status": "approved",
        "external_reference": "FEG-2024-000123",
        "date_approved": "2024-12-07T16:02:00Z",
        "payment_method_id": "visa",
        "transaction_amount": 1549.5,
        "currency_id": "ARS",
        "collector_id": 439285460
    }"#;

    #[test]
    fn deserializes_gateway_payment() {
        let payment: PaymentResource = serde_json::from_str(PAYMENT_JSON).unwrap();
        assert_eq!(payment.id, 123456789);
        assert_eq!(payment.status, "approved");
        assert_eq!(payment.external_reference.as_deref(), Some("FEG-2024-000123"));
        assert_eq!(payment.payment_method_id.as_deref(), Some("visa"));
        assert_eq!(payment.amount_centavos(), Some(154_950));
    }

    #[test]
    fn tolerates_missing_optional_fields() {
        let payment: PaymentResource = serde_json::from_str(r#"{"id": 1, "status": "pending"}"#).unwrap();
        assert!(payment.external_reference.is_none());
        assert!(payment.date_approved.is_none());
        assert!(payment.amount_centavos().is_none());
    }
}
