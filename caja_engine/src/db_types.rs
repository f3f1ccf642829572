use std::{fmt::Display, str::FromStr};

use caja_common::Pesos;
use chrono::{DateTime, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

/// The `payment_id` recorded against orders settled by manual bank transfer, which have no
/// gateway-side payment record to point at.
pub const BANK_TRANSFER_PAYMENT_ID: &str = "bank-transfer";

//--------------------------------------   OrderStatusType     --------------------------------------------------------
/// Order status as stored in the database and as reported by the payment gateway.
///
/// `pending_confirmation` is ours (a bank-transfer order waiting for the seller to confirm receipt);
/// every other variant is a status string the gateway emits verbatim. Only `approved` and `rejected`
/// are terminal: once an order reaches either, no further transition is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatusType {
    /// Newly created, no payment outcome yet.
    Pending,
    /// Bank-transfer order awaiting manual confirmation by the seller.
    PendingConfirmation,
    /// Payment received in full. Stock has been debited.
    Approved,
    Authorized,
    InProcess,
    InMediation,
    /// Payment rejected, or transfer rejected by the seller.
    Rejected,
    Cancelled,
    Refunded,
    ChargedBack,
}

impl OrderStatusType {
    /// Terminal states admit no further transitions.
    pub fn is_final(&self) -> bool {
        matches!(self, OrderStatusType::Approved | OrderStatusType::Rejected)
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatusType::Pending => "pending",
            OrderStatusType::PendingConfirmation => "pending_confirmation",
            OrderStatusType::Approved => "approved",
            OrderStatusType::Authorized => "authorized",
            OrderStatusType::InProcess => "in_process",
            OrderStatusType::InMediation => "in_mediation",
            OrderStatusType::Rejected => "rejected",
            OrderStatusType::Cancelled => "cancelled",
            OrderStatusType::Refunded => "refunded",
            OrderStatusType::ChargedBack => "charged_back",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid order status: {0}")]
pub struct StatusConversionError(pub String);

impl FromStr for OrderStatusType {
    type Err = StatusConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "pending_confirmation" => Ok(Self::PendingConfirmation),
            "approved" => Ok(Self::Approved),
            "authorized" => Ok(Self::Authorized),
            "in_process" => Ok(Self::InProcess),
            "in_mediation" => Ok(Self::InMediation),
            "rejected" => Ok(Self::Rejected),
            "cancelled" => Ok(Self::Cancelled),
            "refunded" => Ok(Self::Refunded),
            "charged_back" => Ok(Self::ChargedBack),
            s => Err(StatusConversionError(s.to_string())),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to pending");
            OrderStatusType::Pending
        })
    }
}

//--------------------------------------    PaymentMethod      --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Paid through the hosted gateway checkout.
    Gateway,
    /// Manual bank transfer, settled via the confirm/reject flow.
    Transfer,
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::Gateway => write!(f, "gateway"),
            PaymentMethod::Transfer => write!(f, "transfer"),
        }
    }
}

//--------------------------------------        Order        ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    /// Merchant-chosen correlation string, shared with the payment gateway as `external_reference`.
    pub reference: String,
    pub status: OrderStatusType,
    pub payment_method: PaymentMethod,
    pub payment_id: Option<String>,
    /// Buyer contact address.
    pub email: String,
    pub total: Pesos,
    pub confirm_token: Option<String>,
    pub reject_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    /// Line items, loaded alongside the order row.
    #[sqlx(skip)]
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: String,
    pub name: String,
    pub quantity: i64,
}

//--------------------------------------      NewOrder        ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub reference: String,
    pub email: String,
    pub total: Pesos,
    pub payment_method: PaymentMethod,
    pub created_at: DateTime<Utc>,
    pub items: Vec<NewOrderItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub product_id: String,
    pub name: String,
    pub quantity: i64,
}

impl NewOrder {
    pub fn new(reference: impl Into<String>, email: impl Into<String>, total: Pesos, method: PaymentMethod) -> Self {
        Self {
            reference: reference.into(),
            email: email.into(),
            total,
            payment_method: method,
            created_at: Utc::now(),
            items: Vec::new(),
        }
    }

    pub fn with_item(mut self, product_id: impl Into<String>, name: impl Into<String>, quantity: i64) -> Self {
        self.items.push(NewOrderItem { product_id: product_id.into(), name: name.into(), quantity });
        self
    }
}

//--------------------------------------       Product        ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    /// May legitimately go negative: settlement availability is preferred over strict inventory
    /// enforcement, and oversell is only warned about.
    pub stock: i64,
    pub last_sold: Option<DateTime<Utc>>,
}

//--------------------------------------   StockAdjustment     --------------------------------------------------------
/// The result of one per-product stock debit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdjustment {
    pub product_id: String,
    pub quantity: i64,
    pub new_stock: i64,
}

//--------------------------------------    PaymentOutcome     --------------------------------------------------------
/// The canonical outcome of a payment notification, regardless of whether it arrived as a gateway
/// callback (requiring a secondary lookup) or as a self-originated transfer confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentOutcome {
    /// The order's external reference, as correlated by the gateway.
    pub reference: String,
    pub status: OrderStatusType,
    pub payment_id: String,
    pub paid_at: Option<DateTime<Utc>>,
}

impl PaymentOutcome {
    pub fn new(reference: impl Into<String>, status: OrderStatusType, payment_id: impl Into<String>) -> Self {
        Self { reference: reference.into(), status, payment_id: payment_id.into(), paid_at: None }
    }

    /// The outcome synthesized when the seller confirms receipt of a bank transfer.
    pub fn bank_transfer_approved(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            status: OrderStatusType::Approved,
            payment_id: BANK_TRANSFER_PAYMENT_ID.to_string(),
            paid_at: Some(Utc::now()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        for s in ["pending", "pending_confirmation", "approved", "in_process", "rejected", "charged_back"] {
            let status: OrderStatusType = s.parse().unwrap();
            assert_eq!(status.to_string(), s);
        }
        assert!("paid".parse::<OrderStatusType>().is_err());
    }

    #[test]
    fn only_approved_and_rejected_are_final() {
        assert!(OrderStatusType::Approved.is_final());
        assert!(OrderStatusType::Rejected.is_final());
        assert!(!OrderStatusType::Pending.is_final());
        assert!(!OrderStatusType::PendingConfirmation.is_final());
        assert!(!OrderStatusType::InProcess.is_final());
        assert!(!OrderStatusType::Cancelled.is_final());
    }

    #[test]
    fn transfer_outcome_uses_the_sentinel_payment_id() {
        let outcome = PaymentOutcome::bank_transfer_approved("FEG-001");
        assert_eq!(outcome.payment_id, BANK_TRANSFER_PAYMENT_ID);
        assert_eq!(outcome.status, OrderStatusType::Approved);
        assert!(outcome.paid_at.is_some());
    }
}
