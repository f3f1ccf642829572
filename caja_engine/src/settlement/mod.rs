mod flow_api;

pub use flow_api::{SettlementApi, SettlementOutcome};
