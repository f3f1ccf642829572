//! Caja settlement engine
//!
//! The engine owns everything between an incoming payment outcome and a consistent order record:
//! order lookup by external reference, the idempotent status transition, the per-product stock
//! debits, and the transfer confirm/reject flow. It is split into:
//!
//! 1. Storage ([`mod@sqlite`]): low-level query functions over a SQLite pool, and the
//!    [`SqliteDatabase`] struct that implements the [`traits::SettlementDatabase`] contract. Callers
//!    outside of tests should never touch the database directly; use the [`SettlementApi`] instead.
//! 2. The settlement flow API ([`SettlementApi`]): the public surface the HTTP layer drives. It is
//!    generic over the storage trait so that endpoint tests can substitute a mock backend.
//!
//! Side effects that live outside the consistency boundary (seller/buyer mail) are not performed
//! here. Instead the flow API emits events through a small pub-sub actor ([`mod@events`]); the
//! process entry point decides what, if anything, subscribes to them.

pub mod db_types;
pub mod events;
pub mod helpers;
mod settlement;
pub mod sqlite;
pub mod traits;

pub use settlement::{SettlementApi, SettlementOutcome};
pub use sqlite::SqliteDatabase;
