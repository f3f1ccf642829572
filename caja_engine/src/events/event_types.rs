use crate::db_types::{Order, StockAdjustment};

/// Emitted after a payment outcome has been written to an order. `adjustments` is empty unless the
/// new status is `approved`.
#[derive(Debug, Clone)]
pub struct OrderSettledEvent {
    pub order: Order,
    pub adjustments: Vec<StockAdjustment>,
}

impl OrderSettledEvent {
    pub fn new(order: Order, adjustments: Vec<StockAdjustment>) -> Self {
        Self { order, adjustments }
    }
}

/// Emitted when a new bank-transfer order has been given its confirm/reject tokens. The order
/// carries the tokens, so subscribers can build the action links.
#[derive(Debug, Clone)]
pub struct TransferPendingEvent {
    pub order: Order,
}

/// Emitted after the seller confirmed a transfer and the settlement was applied.
#[derive(Debug, Clone)]
pub struct TransferConfirmedEvent {
    pub order: Order,
}

/// Emitted after the seller rejected a transfer.
#[derive(Debug, Clone)]
pub struct TransferRejectedEvent {
    pub order: Order,
}
