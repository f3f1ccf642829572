//! The four notification templates, rendered as inline HTML.
//!
//! These stay deliberately plain: a heading, the order fields, the product list, and (for pending
//! transfers) the two action buttons. Timestamps are shown in Argentina local time.
use caja_engine::db_types::{Order, OrderItem};
use chrono::{DateTime, FixedOffset, Utc};

use crate::{config::ActionLinkConfig, mailer::MailMessage};

/// Sent to the seller when a settlement lands an approved payment.
pub fn sale_to_seller(order: &Order) -> MailMessage {
    let subject = format!("Nueva venta - Orden {}", order.reference);
    let html = format!(
        r#"<h1>¡Nueva venta realizada!</h1>
<p>Detalles de la orden:</p>
<ul>
  <li>Fecha: {date}</li>
  <li>Referencia: {reference}</li>
  <li>Total: {total}</li>
</ul>
<h3>Productos vendidos:</h3>
<ul>{products}</ul>"#,
        date = format_local(order.created_at),
        reference = order.reference,
        total = order.total,
        products = product_list(&order.items),
    );
    MailMessage { subject, html }
}

/// Sent to the buyer once the seller confirmed their bank transfer.
pub fn purchase_to_buyer(order: &Order) -> MailMessage {
    let subject = format!("Confirmación de transferencia - Orden {}", order.reference);
    let html = format!(
        r#"<h1>¡Transferencia confirmada!</h1>
<p>La transferencia de la orden {reference} ha sido confirmada.</p>
<ul>
  <li>Referencia: {reference}</li>
  <li>Total: {total}</li>
  <li>Fecha: {date}</li>
</ul>
<p>Gracias por tu compra.</p>"#,
        reference = order.reference,
        total = order.total,
        date = format_local(order.created_at),
    );
    MailMessage { subject, html }
}

/// Sent to the seller when a new bank-transfer order needs manual confirmation. The two buttons
/// carry the order id and its respective single-use token.
pub fn transfer_pending_to_seller(order: &Order, links: &ActionLinkConfig) -> MailMessage {
    let subject = format!("Confirmación de transferencia - Orden {}", order.reference);
    let confirm_url = action_url(&links.confirm_url, order.id, order.confirm_token.as_deref());
    let reject_url = action_url(&links.reject_url, order.id, order.reject_token.as_deref());
    let html = format!(
        r#"<h1>Nueva orden pendiente de confirmación</h1>
<p>Por favor, confirmá si recibiste la transferencia bancaria para la siguiente orden:</p>
<ul>
  <li>Referencia: {reference}</li>
  <li>Total: {total}</li>
  <li>Fecha: {date}</li>
</ul>
<h3>Productos:</h3>
<ul>{products}</ul>
<div style="margin: 30px 0;">
  <a href="{confirm_url}" style="background-color: #4CAF50; color: white; padding: 14px 25px; text-decoration: none; display: inline-block; margin-right: 10px;">Confirmar Transferencia</a>
  <a href="{reject_url}" style="background-color: #f44336; color: white; padding: 14px 25px; text-decoration: none; display: inline-block;">Rechazar Transferencia</a>
</div>
<p style="color: #666; font-size: 14px;">* Al confirmar la transferencia, la orden será procesada automáticamente.</p>"#,
        reference = order.reference,
        total = order.total,
        date = format_local(order.created_at),
        products = product_list(&order.items),
    );
    MailMessage { subject, html }
}

/// Sent to the buyer when the seller rejected their transfer.
pub fn transfer_rejected_to_buyer(order: &Order, seller_email: &str) -> MailMessage {
    let subject = format!("Transferencia rechazada - Orden {}", order.reference);
    let html = format!(
        r#"<h1>Transferencia rechazada</h1>
<p>La transferencia de la orden {reference} ha sido rechazada.</p>
<ul>
  <li>Referencia: {reference}</li>
  <li>Total: {total}</li>
  <li>Fecha: {date}</li>
</ul>
<p>Por favor, escribinos a <a href="mailto:{seller_email}">{seller_email}</a> para más información.</p>"#,
        reference = order.reference,
        total = order.total,
        date = format_local(order.created_at),
    );
    MailMessage { subject, html }
}

fn product_list(items: &[OrderItem]) -> String {
    items.iter().map(|p| format!("<li>{} - {} unidad(es)</li>", p.name, p.quantity)).collect()
}

fn action_url(base: &str, order_id: i64, token: Option<&str>) -> String {
    format!("{base}?orderId={order_id}&token={}", token.unwrap_or_default())
}

/// Buenos Aires is UTC-3 year round.
fn format_local(ts: DateTime<Utc>) -> String {
    match FixedOffset::west_opt(3 * 3600) {
        Some(offset) => ts.with_timezone(&offset).format("%d/%m/%Y %H:%M").to_string(),
        None => ts.format("%d/%m/%Y %H:%M").to_string(),
    }
}

#[cfg(test)]
mod test {
    use caja_engine::db_types::{OrderStatusType, PaymentMethod};
    use chrono::TimeZone;

    use super::*;

    fn sample_order() -> Order {
        Order {
            id: 7,
            reference: "FEG-2024-000123".to_string(),
            status: OrderStatusType::PendingConfirmation,
            payment_method: PaymentMethod::Transfer,
            payment_id: None,
            email: "buyer@example.com".to_string(),
            total: caja_common::Pesos::from_centavos(154_950),
            confirm_token: Some("tok-confirm".to_string()),
            reject_token: Some("tok-reject".to_string()),
            created_at: Utc.with_ymd_and_hms(2024, 12, 7, 16, 30, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2024, 12, 7, 16, 30, 0).unwrap(),
            paid_at: None,
            items: vec![OrderItem {
                id: 1,
                order_id: 7,
                product_id: "p1".to_string(),
                name: "Yerba 1kg".to_string(),
                quantity: 2,
            }],
        }
    }

    #[test]
    fn sale_notice_embeds_order_fields_and_local_time() {
        let msg = sale_to_seller(&sample_order());
        assert_eq!(msg.subject, "Nueva venta - Orden FEG-2024-000123");
        assert!(msg.html.contains("$1549.50"));
        assert!(msg.html.contains("Yerba 1kg - 2 unidad(es)"));
        // 16:30 UTC is 13:30 in Buenos Aires.
        assert!(msg.html.contains("07/12/2024 13:30"));
    }

    #[test]
    fn pending_notice_links_carry_order_id_and_tokens() {
        let links = ActionLinkConfig {
            confirm_url: "https://caja.example.com/transfer/confirm".to_string(),
            reject_url: "https://caja.example.com/transfer/reject".to_string(),
        };
        let msg = transfer_pending_to_seller(&sample_order(), &links);
        assert!(msg.html.contains("https://caja.example.com/transfer/confirm?orderId=7&token=tok-confirm"));
        assert!(msg.html.contains("https://caja.example.com/transfer/reject?orderId=7&token=tok-reject"));
    }

    #[test]
    fn rejection_notice_points_the_buyer_at_the_seller() {
        let msg = transfer_rejected_to_buyer(&sample_order(), "seller@example.com");
        assert!(msg.html.contains("mailto:seller@example.com"));
        assert!(msg.subject.contains("FEG-2024-000123"));
    }
}
