use thiserror::Error;
use treasury_config::ConfigError;
use treasury_core::{CoreError, ErrorClass};
use treasury_domain::DomainError;

/// Error type surfaced by the [`crate::LedgerManager`] facade.
#[derive(Debug, Error)]
pub enum TreasuryError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl TreasuryError {
    /// Error class of engine failures; configuration problems count as validation.
    pub fn class(&self) -> ErrorClass {
        match self {
            TreasuryError::Core(err) => err.class(),
            TreasuryError::Config(ConfigError::Io(_)) => ErrorClass::Storage,
            TreasuryError::Config(_) | TreasuryError::Domain(_) => ErrorClass::Validation,
        }
    }

    /// The engine error, if this is one.
    pub fn as_core(&self) -> Option<&CoreError> {
        match self {
            TreasuryError::Core(err) => Some(err),
            _ => None,
        }
    }
}
