//! Bridges the persisted [`Config`] into engine settings and storage locations.

pub use treasury_config::{Config, ConfigError, ConfigManager};

use treasury_core::EngineSettings;
use treasury_storage_json::{JsonLedgerStorage, StoragePaths};

use crate::TreasuryError;

/// Thresholds the services compare against, taken from `config`.
pub fn engine_settings(config: &Config) -> EngineSettings {
    EngineSettings {
        ratio_tolerance: config.ratio_tolerance,
        settlement_epsilon: config.settlement_epsilon,
    }
}

pub fn storage_paths(config: &Config) -> StoragePaths {
    StoragePaths {
        ledger_root: config.resolve_ledger_root(),
        backup_root: config.resolve_backup_root(),
    }
}

/// Opens JSON storage under the configured roots with the configured retention.
pub fn open_json_storage(config: &Config) -> Result<JsonLedgerStorage, TreasuryError> {
    config.validate()?;
    Ok(JsonLedgerStorage::with_retention(
        storage_paths(config),
        config.backup_retention,
    )?)
}
