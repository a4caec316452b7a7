//! treasury-core
//!
//! Business logic and services for the treasury ledger: account directory, registry,
//! voucher engine, statements, settlement, and dashboard aggregation.
//! Depends on treasury-domain. No terminal I/O, no direct file access.

pub mod account_service;
pub mod dashboard_service;
pub mod error;
pub mod netting;
pub mod registry_service;
pub mod settings;
pub mod settlement_service;
pub mod snapshot;
pub mod statement_service;
pub mod storage;
pub mod time;
pub mod voucher_service;

pub use account_service::*;
pub use dashboard_service::*;
pub use error::{CoreError, ErrorClass};
pub use netting::*;
pub use registry_service::*;
pub use settings::EngineSettings;
pub use settlement_service::*;
pub use snapshot::*;
pub use statement_service::*;
pub use storage::{ledger_warnings, LedgerBackupInfo, LedgerStorage, MemoryLedgerStorage};
pub use time::{Clock, FixedClock, SystemClock};
pub use voucher_service::*;

#[cfg(test)]
mod tests;
