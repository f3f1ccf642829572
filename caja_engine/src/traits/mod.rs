mod settlement_database;

pub use settlement_database::{SettlementDatabase, SettlementError};
