use std::fmt::Debug;

use futures_util::future::join_all;
use log::*;

use crate::{
    db_types::{NewOrder, Order, OrderStatusType, PaymentMethod, PaymentOutcome, StockAdjustment},
    events::{
        EventProducers,
        OrderSettledEvent,
        TransferConfirmedEvent,
        TransferPendingEvent,
        TransferRejectedEvent,
    },
    helpers::{random_token, TRANSFER_TOKEN_LEN},
    traits::{SettlementDatabase, SettlementError},
};

/// The result of applying a payment outcome to an order.
#[derive(Debug, Clone)]
pub enum SettlementOutcome {
    /// The transition was applied. `adjustments` holds the per-product stock debits (empty unless
    /// the order was approved).
    Applied { order: Order, adjustments: Vec<StockAdjustment> },
    /// The order was already in a terminal state; nothing was written. Re-delivered gateway
    /// notifications land here and must not debit stock or send mail a second time.
    AlreadyFinal { order: Order },
}

impl SettlementOutcome {
    pub fn order(&self) -> &Order {
        match self {
            SettlementOutcome::Applied { order, .. } => order,
            SettlementOutcome::AlreadyFinal { order } => order,
        }
    }
}

/// `SettlementApi` is the primary API for reacting to payment outcomes and order-creation events.
///
/// It owns a storage backend and a set of event producers. Every mutation of orders or stock in the
/// system goes through here; the HTTP layer only parses payloads and maps errors to status codes.
pub struct SettlementApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for SettlementApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SettlementApi")
    }
}

impl<B> SettlementApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> SettlementApi<B>
where B: SettlementDatabase
{
    /// Apply a canonical payment outcome to the order it references.
    ///
    /// The flow is: look the order up by its external reference, short-circuit if it is already in
    /// a terminal state, write the new status and payment fields, and — if and only if the new
    /// status is `approved` — debit stock for every line item concurrently.
    ///
    /// The status check and the subsequent write are NOT wrapped in a transaction, mirroring the
    /// per-document consistency model of the storage layer: two concurrent duplicate notifications
    /// for one order can both observe a non-terminal status and both proceed. The per-product debits
    /// themselves are each atomic, so racing settlements never corrupt a stock value — they can only
    /// apply it twice. See `tests/settlement_flow.rs` for a demonstration.
    ///
    /// If any line item's debit fails (e.g. the product does not exist), the whole call fails, but
    /// debits that already committed are not rolled back.
    pub async fn settle_order(&self, outcome: &PaymentOutcome) -> Result<SettlementOutcome, SettlementError> {
        let order = self
            .db
            .fetch_order_by_reference(&outcome.reference)
            .await?
            .ok_or_else(|| SettlementError::OrderNotFound(outcome.reference.clone()))?;
        if order.status.is_final() {
            info!(
                "🧾 Order {} (#{}) is already {}; ignoring duplicate notification [{}]",
                order.reference, order.id, order.status, outcome.payment_id
            );
            return Ok(SettlementOutcome::AlreadyFinal { order });
        }
        let order =
            self.db.update_order_payment(order.id, outcome.status, &outcome.payment_id, outcome.paid_at).await?;
        debug!("🧾 Order {} (#{}) moved to {}", order.reference, order.id, order.status);
        let adjustments = if outcome.status == OrderStatusType::Approved {
            let adjustments = self.debit_stock_for_order(&order).await?;
            info!("📦 Stock debited for all {} line items of order {}", adjustments.len(), order.reference);
            adjustments
        } else {
            Vec::new()
        };
        self.call_order_settled_hook(&order, &adjustments).await;
        Ok(SettlementOutcome::Applied { order, adjustments })
    }

    /// Fan the per-product debits out concurrently and wait for all of them. The first error wins;
    /// debits that committed before the failure stay committed. This is a known weak point of the
    /// design, not a guarantee.
    async fn debit_stock_for_order(&self, order: &Order) -> Result<Vec<StockAdjustment>, SettlementError> {
        let debits = order.items.iter().map(|item| self.db.debit_stock(&item.product_id, item.quantity));
        let results = join_all(debits).await;
        let mut adjustments = Vec::with_capacity(order.items.len());
        for result in results {
            match result {
                Ok(adj) => adjustments.push(adj),
                Err(e) => {
                    error!("📦 Stock update failed for order {} (#{}): {e}", order.reference, order.id);
                    return Err(e);
                },
            }
        }
        Ok(adjustments)
    }

    /// React to an order-creation event.
    ///
    /// Orders paid through the gateway need nothing from us at creation time and return `None`.
    /// Bank-transfer orders are stored idempotently, given a pair of independent confirm/reject
    /// tokens, moved to `pending_confirmation`, and announced so the seller can be mailed the two
    /// action links. Replayed events for an order that already left `pending` are ignored.
    pub async fn register_transfer_order(&self, order: NewOrder) -> Result<Option<Order>, SettlementError> {
        if order.payment_method != PaymentMethod::Transfer {
            debug!("🏦 Order {} is not a bank-transfer order; ignoring", order.reference);
            return Ok(None);
        }
        let reference = order.reference.clone();
        let (order, inserted) = self.db.insert_order(order).await?;
        if !inserted && order.status != OrderStatusType::Pending {
            info!("🏦 Order {} (#{}) was already registered (status {}); ignoring replay", reference, order.id, order.status);
            return Ok(None);
        }
        let confirm_token = random_token(TRANSFER_TOKEN_LEN);
        let reject_token = random_token(TRANSFER_TOKEN_LEN);
        let order = self.db.set_transfer_tokens(order.id, &confirm_token, &reject_token).await?;
        info!("🏦 Order {} (#{}) is awaiting transfer confirmation", order.reference, order.id);
        self.call_transfer_pending_hook(&order).await;
        Ok(Some(order))
    }

    /// The seller clicked the confirm link: verify the token, then settle the order as if the
    /// gateway had approved a transfer payment. This is a direct internal call into
    /// [`Self::settle_order`]; there is no HTTP round trip back into the webhook.
    pub async fn confirm_transfer(&self, order_id: i64, token: &str) -> Result<SettlementOutcome, SettlementError> {
        let order =
            self.db.fetch_order_by_id(order_id).await?.ok_or(SettlementError::OrderIdNotFound(order_id))?;
        if order.confirm_token.as_deref() != Some(token) {
            warn!("🏦 Confirm token mismatch for order {} (#{})", order.reference, order.id);
            return Err(SettlementError::TokenMismatch);
        }
        if order.status.is_final() {
            warn!("🏦 Confirm re-submitted for order {} (#{}), which is already {}", order.reference, order.id, order.status);
            return Err(SettlementError::OrderAlreadyFinal(order.id, order.status));
        }
        let outcome = PaymentOutcome::bank_transfer_approved(&order.reference);
        let settled = self.settle_order(&outcome).await?;
        if let SettlementOutcome::Applied { order, .. } = &settled {
            self.call_transfer_confirmed_hook(order).await;
        }
        Ok(settled)
    }

    /// The seller clicked the reject link: verify the token and mark the order rejected. Rejection
    /// never touches inventory, so this bypasses the settlement transition entirely.
    pub async fn reject_transfer(&self, order_id: i64, token: &str) -> Result<Order, SettlementError> {
        let order =
            self.db.fetch_order_by_id(order_id).await?.ok_or(SettlementError::OrderIdNotFound(order_id))?;
        if order.reject_token.as_deref() != Some(token) {
            warn!("🏦 Reject token mismatch for order {} (#{})", order.reference, order.id);
            return Err(SettlementError::TokenMismatch);
        }
        if order.status.is_final() {
            warn!("🏦 Reject re-submitted for order {} (#{}), which is already {}", order.reference, order.id, order.status);
            return Err(SettlementError::OrderAlreadyFinal(order.id, order.status));
        }
        let order = self.db.update_order_status(order.id, OrderStatusType::Rejected).await?;
        info!("🏦 Transfer for order {} (#{}) was rejected", order.reference, order.id);
        self.call_transfer_rejected_hook(&order).await;
        Ok(order)
    }

    /// Auxiliary admin check. Unknown users are not admins.
    pub async fn is_admin(&self, uid: &str) -> Result<bool, SettlementError> {
        Ok(self.db.fetch_admin_flag(uid).await?.unwrap_or(false))
    }

    async fn call_order_settled_hook(&self, order: &Order, adjustments: &[StockAdjustment]) {
        for emitter in &self.producers.order_settled_producer {
            let event = OrderSettledEvent::new(order.clone(), adjustments.to_vec());
            emitter.publish_event(event).await;
        }
    }

    async fn call_transfer_pending_hook(&self, order: &Order) {
        for emitter in &self.producers.transfer_pending_producer {
            emitter.publish_event(TransferPendingEvent { order: order.clone() }).await;
        }
    }

    async fn call_transfer_confirmed_hook(&self, order: &Order) {
        for emitter in &self.producers.transfer_confirmed_producer {
            emitter.publish_event(TransferConfirmedEvent { order: order.clone() }).await;
        }
    }

    async fn call_transfer_rejected_hook(&self, order: &Order) {
        for emitter in &self.producers.transfer_rejected_producer {
            emitter.publish_event(TransferRejectedEvent { order: order.clone() }).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
