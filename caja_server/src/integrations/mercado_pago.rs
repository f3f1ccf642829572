//! Normalization of inbound payment notifications against the Mercado Pago gateway.
//!
//! Whatever the source of a notification, the settlement flow only ever sees the canonical
//! [`PaymentOutcome`] triple (reference, status, payment id). The gateway shape needs a secondary
//! lookup because the callback carries nothing but an opaque payment id; the transfer shape is
//! complete in itself, since bank-transfer orders have no gateway-side payment to query.
use caja_engine::db_types::{OrderStatusType, PaymentMethod, PaymentOutcome, BANK_TRANSFER_PAYMENT_ID};
use chrono::Utc;
use log::*;
use mp_tools::MercadoPagoApi;

use crate::{data_objects::PaymentNotification, errors::ServerError};

pub async fn resolve_notification(
    notification: PaymentNotification,
    mp_api: &MercadoPagoApi,
) -> Result<PaymentOutcome, ServerError> {
    match notification {
        PaymentNotification::Gateway { data } => {
            let payment = mp_api.get_payment(&data.id).await.map_err(|e| {
                error!("💳 Could not fetch payment {} from the gateway. {e}", data.id);
                ServerError::UpstreamError(e.to_string())
            })?;
            let reference = payment.external_reference.clone().ok_or_else(|| {
                warn!("💳 Payment {} carries no external reference; it cannot be matched to an order", payment.id);
                ServerError::InvalidRequestBody(format!("Payment {} has no external reference", payment.id))
            })?;
            let status = payment.status.parse::<OrderStatusType>().map_err(|e| {
                error!("💳 Gateway returned an unrecognized payment status for {}: {e}", payment.id);
                ServerError::UpstreamError(e.to_string())
            })?;
            debug!("💳 Payment {} normalized: reference {reference}, status {status}", payment.id);
            Ok(PaymentOutcome {
                reference,
                status,
                payment_id: payment.id.to_string(),
                paid_at: payment.date_approved,
            })
        },
        PaymentNotification::Transfer { payment_method, external_reference, status } => {
            if payment_method != PaymentMethod::Transfer {
                return Err(ServerError::InvalidRequestBody(format!(
                    "Unexpected payment method '{payment_method}' in a transfer notification"
                )));
            }
            let status = status
                .parse::<OrderStatusType>()
                .map_err(|e| ServerError::InvalidRequestBody(e.to_string()))?;
            let paid_at = (status == OrderStatusType::Approved).then(Utc::now);
            Ok(PaymentOutcome {
                reference: external_reference,
                status,
                payment_id: BANK_TRANSFER_PAYMENT_ID.to_string(),
                paid_at,
            })
        },
    }
}

#[cfg(test)]
mod test {
    use mp_tools::MercadoPagoConfig;

    use super::*;

    fn offline_api() -> MercadoPagoApi {
        MercadoPagoApi::new(MercadoPagoConfig::default()).expect("Could not build client")
    }

    #[actix_web::test]
    async fn transfer_notifications_resolve_without_a_gateway_call() {
        let notification = PaymentNotification::Transfer {
            payment_method: PaymentMethod::Transfer,
            external_reference: "FEG-031".to_string(),
            status: "approved".to_string(),
        };
        let outcome = resolve_notification(notification, &offline_api()).await.unwrap();
        assert_eq!(outcome.reference, "FEG-031");
        assert_eq!(outcome.status, OrderStatusType::Approved);
        assert_eq!(outcome.payment_id, BANK_TRANSFER_PAYMENT_ID);
        assert!(outcome.paid_at.is_some());
    }

    #[actix_web::test]
    async fn non_approved_transfer_notifications_have_no_paid_at() {
        let notification = PaymentNotification::Transfer {
            payment_method: PaymentMethod::Transfer,
            external_reference: "FEG-032".to_string(),
            status: "rejected".to_string(),
        };
        let outcome = resolve_notification(notification, &offline_api()).await.unwrap();
        assert_eq!(outcome.status, OrderStatusType::Rejected);
        assert!(outcome.paid_at.is_none());
    }

    #[actix_web::test]
    async fn bogus_status_in_a_transfer_notification_is_a_client_error() {
        let notification = PaymentNotification::Transfer {
            payment_method: PaymentMethod::Transfer,
            external_reference: "FEG-033".to_string(),
            status: "definitely-paid".to_string(),
        };
        let err = resolve_notification(notification, &offline_api()).await.unwrap_err();
        assert!(matches!(err, ServerError::InvalidRequestBody(_)));
    }

    #[actix_web::test]
    async fn gateway_method_in_a_transfer_shape_is_rejected() {
        let notification = PaymentNotification::Transfer {
            payment_method: PaymentMethod::Gateway,
            external_reference: "FEG-034".to_string(),
            status: "approved".to_string(),
        };
        let err = resolve_notification(notification, &offline_api()).await.unwrap_err();
        assert!(matches!(err, ServerError::InvalidRequestBody(_)));
    }
}
