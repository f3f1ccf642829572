use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use caja_engine::{
    db_types::OrderStatusType,
    events::{EventHandlers, EventHooks, EventProducers},
    SettlementApi,
    SqliteDatabase,
};
use log::*;
use mp_tools::MercadoPagoApi;

use crate::{
    config::{ActionLinkConfig, ServerConfig},
    errors::ServerError,
    mailer::{templates, MailClient},
    routes::{admin_check, confirm_transfer, health, order_created, payment_webhook, reject_transfer},
};

const EVENT_BUFFER_SIZE: usize = 25;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let mp_api = MercadoPagoApi::new(config.mercado_pago.clone())
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let mail = MailClient::new(config.mail.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = wire_mail_hooks(mail, &config);
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let srv = create_server_instance(config, db, mp_api, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// Subscribe the mail dispatch to the settlement events. Every hook is best-effort: a failed send is
/// logged with the order reference and swallowed, since mail sits outside the consistency boundary.
pub fn wire_mail_hooks(mail: MailClient, config: &ServerConfig) -> EventHandlers {
    let mut hooks = EventHooks::default();

    let seller = config.mail.seller_email.clone();
    let client = mail.clone();
    hooks.on_order_settled(move |ev| {
        let mail = client.clone();
        let seller = seller.clone();
        Box::pin(async move {
            // Only approved settlements are worth a sale notice.
            if ev.order.status != OrderStatusType::Approved {
                return;
            }
            let msg = templates::sale_to_seller(&ev.order);
            if let Err(e) = mail.send(&seller, msg).await {
                error!("📬 Could not notify the seller about order {}. {e}", ev.order.reference);
            }
        })
    });

    let seller = config.mail.seller_email.clone();
    let links: ActionLinkConfig = config.links.clone();
    let client = mail.clone();
    hooks.on_transfer_pending(move |ev| {
        let mail = client.clone();
        let seller = seller.clone();
        let links = links.clone();
        Box::pin(async move {
            let msg = templates::transfer_pending_to_seller(&ev.order, &links);
            if let Err(e) = mail.send(&seller, msg).await {
                error!("📬 Could not send the confirmation request for order {}. {e}", ev.order.reference);
            }
        })
    });

    let client = mail.clone();
    hooks.on_transfer_confirmed(move |ev| {
        let mail = client.clone();
        Box::pin(async move {
            let msg = templates::purchase_to_buyer(&ev.order);
            if let Err(e) = mail.send(&ev.order.email, msg).await {
                error!("📬 Could not notify the buyer of order {}. {e}", ev.order.reference);
            }
        })
    });

    let seller = config.mail.seller_email.clone();
    hooks.on_transfer_rejected(move |ev| {
        let mail = mail.clone();
        let seller = seller.clone();
        Box::pin(async move {
            let msg = templates::transfer_rejected_to_buyer(&ev.order, &seller);
            if let Err(e) = mail.send(&ev.order.email, msg).await {
                error!("📬 Could not notify the buyer of order {}. {e}", ev.order.reference);
            }
        })
    });

    EventHandlers::new(EVENT_BUFFER_SIZE, hooks)
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    mp_api: MercadoPagoApi,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    info!("💻 Starting server on {}:{}", config.host, config.port);
    let srv = HttpServer::new(move || {
        let api = SettlementApi::new(db.clone(), producers.clone());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("caja::access_log"))
            .app_data(web::Data::new(api))
            .app_data(web::Data::new(mp_api.clone()))
            .service(health)
            .service(web::resource("/webhook/payment").route(web::post().to(payment_webhook::<SqliteDatabase>)))
            .service(
                web::resource("/webhook/order_created").route(web::post().to(order_created::<SqliteDatabase>)),
            )
            .service(web::resource("/transfer/confirm").route(web::get().to(confirm_transfer::<SqliteDatabase>)))
            .service(web::resource("/transfer/reject").route(web::get().to(reject_transfer::<SqliteDatabase>)))
            .service(web::resource("/admin/check").route(web::get().to(admin_check::<SqliteDatabase>)))
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
