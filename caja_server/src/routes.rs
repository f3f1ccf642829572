//! Request handler definitions
//!
//! Define each route and its handler here. Handlers stay thin: parse the payload, call the
//! settlement API, map errors onto status codes. Anything with real logic belongs in the engine or
//! in [`crate::integrations`].
//!
//! Handlers are generic over the storage trait so that the endpoint tests can substitute a mocked
//! backend; actix cannot register generic handlers through the attribute macros, so everything
//! except `health` is registered explicitly in [`crate::server`].
use actix_web::{get, web, HttpResponse, Responder};
use caja_engine::{traits::SettlementDatabase, SettlementApi, SettlementOutcome};
use log::*;
use mp_tools::MercadoPagoApi;

use crate::{
    data_objects::{AdminCheckParams, IncomingOrder, JsonResponse, PaymentNotification, TokenParams},
    errors::ServerError,
    integrations::mercado_pago::resolve_notification,
};

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻 Received health check request");
    HttpResponse::Ok().body("👍\n")
}

// ------------------------------------------   Settlement webhook  ---------------------------------------------
/// POST /webhook/payment
///
/// The settlement notification endpoint. Accepts both the gateway callback shape and the
/// self-originated transfer shape, normalizes either into a canonical outcome, and applies it.
/// Responds `200 OK` with body "OK" on success — including the no-op case where the gateway
/// re-delivered a notification for an order that is already settled.
pub async fn payment_webhook<B: SettlementDatabase + 'static>(
    body: web::Json<PaymentNotification>,
    api: web::Data<SettlementApi<B>>,
    mp_api: web::Data<MercadoPagoApi>,
) -> Result<HttpResponse, ServerError> {
    trace!("💳 Received settlement notification");
    let outcome = resolve_notification(body.into_inner(), &mp_api).await?;
    match api.settle_order(&outcome).await? {
        SettlementOutcome::Applied { order, adjustments } => {
            info!(
                "💳 Order {} (#{}) settled as {} with {} stock adjustment(s)",
                order.reference,
                order.id,
                order.status,
                adjustments.len()
            );
        },
        SettlementOutcome::AlreadyFinal { order } => {
            info!("💳 Order {} (#{}) was already {}; nothing to do", order.reference, order.id, order.status);
        },
    }
    Ok(HttpResponse::Ok().body("OK"))
}

// ------------------------------------------   Order-created event  --------------------------------------------
/// POST /webhook/order_created
///
/// Fired by the storefront when an order record is created; carries the full order payload. The
/// event source has no response channel and retries on non-2xx, so this handler always answers 200
/// and reports problems in the JSON body only.
pub async fn order_created<B: SettlementDatabase + 'static>(
    body: web::Json<IncomingOrder>,
    api: web::Data<SettlementApi<B>>,
) -> HttpResponse {
    let order = body.into_inner();
    trace!("🏦 Received order-created event for {}", order.reference);
    let result = match api.register_transfer_order(order.into()).await {
        Ok(Some(order)) => {
            info!("🏦 Order {} (#{}) registered for transfer confirmation", order.reference, order.id);
            JsonResponse::success("Order registered for transfer confirmation.")
        },
        Ok(None) => JsonResponse::success("Nothing to do."),
        Err(e) => {
            warn!("🏦 Could not register incoming order. {e}");
            JsonResponse::failure(e)
        },
    };
    HttpResponse::Ok().json(result)
}

// ------------------------------------------   Confirm / reject  -----------------------------------------------
/// GET /transfer/confirm?orderId=..&token=..
pub async fn confirm_transfer<B: SettlementDatabase + 'static>(
    query: web::Query<TokenParams>,
    api: web::Data<SettlementApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let params = query.into_inner();
    debug!("🏦 Confirm request for order #{}", params.order_id);
    let settled = api.confirm_transfer(params.order_id, &params.token).await?;
    let order = settled.order();
    Ok(HttpResponse::Ok().body(format!("Transferencia confirmada para la orden {}", order.reference)))
}

/// GET /transfer/reject?orderId=..&token=..
pub async fn reject_transfer<B: SettlementDatabase + 'static>(
    query: web::Query<TokenParams>,
    api: web::Data<SettlementApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let params = query.into_inner();
    debug!("🏦 Reject request for order #{}", params.order_id);
    let order = api.reject_transfer(params.order_id, &params.token).await?;
    Ok(HttpResponse::Ok().body(format!("Transferencia rechazada para la orden {}", order.reference)))
}

// ------------------------------------------   Admin check  ----------------------------------------------------
/// GET /admin/check?uid=..
///
/// Auxiliary endpoint, not part of the settlement workflow: reports the admin flag on the user
/// record as a bare "true"/"false" body. Unknown users are not admins.
pub async fn admin_check<B: SettlementDatabase + 'static>(
    query: web::Query<AdminCheckParams>,
    api: web::Data<SettlementApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let is_admin = api.is_admin(&query.uid).await?;
    Ok(HttpResponse::Ok().body(is_admin.to_string()))
}
