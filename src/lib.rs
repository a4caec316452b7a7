#![doc(test(attr(deny(warnings))))]

//! Treasury Ledger offers a double-entry voucher engine, account statements, dashboard
//! roll-ups, and multi-investor expense settlement behind a single [`LedgerManager`].

pub mod config;
pub mod core;
pub mod errors;
pub mod utils;

pub use crate::core::ledger_manager::{LedgerManager, LedgerSummary};
pub use errors::TreasuryError;
pub use treasury_core as services;
pub use treasury_domain as domain;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Treasury ledger tracing initialized.");
    });
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_does_not_panic() {
        super::init();
        super::init();
    }
}
