use std::path::PathBuf;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Engine thresholds and storage locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Allowed distance of a project's ratio sum from 1.
    #[serde(default = "Config::default_ratio_tolerance")]
    pub ratio_tolerance: Decimal,
    /// Netting remainders below this amount count as settled.
    #[serde(default = "Config::default_settlement_epsilon")]
    pub settlement_epsilon: Decimal,
    /// Backups kept per ledger before the oldest are pruned.
    #[serde(default = "Config::default_backup_retention")]
    pub backup_retention: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_opened_ledger: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    /// Optional custom root directory for ledgers. Defaults to `~/Documents/Treasury`.
    pub ledger_root: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    /// Optional custom root directory for backups. Defaults to `~/Documents/Treasury/backups`.
    pub backup_root: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ratio_tolerance: Self::default_ratio_tolerance(),
            settlement_epsilon: Self::default_settlement_epsilon(),
            backup_retention: Self::default_backup_retention(),
            last_opened_ledger: None,
            ledger_root: None,
            backup_root: None,
        }
    }
}

impl Config {
    pub fn default_ratio_tolerance() -> Decimal {
        Decimal::new(1, 4)
    }

    pub fn default_settlement_epsilon() -> Decimal {
        Decimal::new(1, 2)
    }

    pub fn default_backup_retention() -> usize {
        5
    }

    /// Rejects thresholds the engine cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ratio_tolerance < Decimal::ZERO || self.ratio_tolerance >= Decimal::ONE {
            return Err(ConfigError::Invalid(format!(
                "ratio_tolerance must be in [0, 1), got {}",
                self.ratio_tolerance
            )));
        }
        if self.settlement_epsilon <= Decimal::ZERO {
            return Err(ConfigError::Invalid(format!(
                "settlement_epsilon must be positive, got {}",
                self.settlement_epsilon
            )));
        }
        if self.backup_retention == 0 {
            return Err(ConfigError::Invalid(
                "backup_retention must keep at least one backup".into(),
            ));
        }
        Ok(())
    }

    fn documents_base() -> PathBuf {
        dirs::document_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn resolve_ledger_root(&self) -> PathBuf {
        match &self.ledger_root {
            Some(path) => path.clone(),
            None => Self::documents_base().join("Treasury"),
        }
    }

    pub fn resolve_backup_root(&self) -> PathBuf {
        match &self.backup_root {
            Some(path) => path.clone(),
            None => self.resolve_ledger_root().join("backups"),
        }
    }
}
