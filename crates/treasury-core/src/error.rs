use rust_decimal::Decimal;
use thiserror::Error;
use treasury_domain::DomainError;
use uuid::Uuid;

/// Coarse grouping of [`CoreError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Rejected input, detected before any write. Never retried.
    Validation,
    /// A referenced entity does not exist.
    NotFound,
    /// The mutation would break a referential or uniqueness invariant.
    Integrity,
    /// The mirrored settlement write of an investor-attributed payment failed.
    CrossStore,
    /// Persistence or serialization failure.
    Storage,
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Amount must be greater than zero, got {0}")]
    AmountNotPositive(Decimal),
    #[error("Cash account and contra account must differ")]
    AccountsIdentical,
    #[error("Missing required account: {0}")]
    MissingRequiredAccount(String),
    #[error("Settlement ratios for project {project} sum to {sum}, expected 1")]
    RatiosNotNormalized { project: Uuid, sum: Decimal },
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Account not found: {0}")]
    AccountNotFound(Uuid),
    #[error("{kind} not found: {id}")]
    PartyNotFound { kind: String, id: Uuid },
    #[error("Investor not found: {0}")]
    InvestorNotFound(Uuid),
    #[error("Project not found: {0}")]
    ProjectNotFound(Uuid),
    #[error("Expense category not found: {0}")]
    CategoryNotFound(Uuid),
    #[error("Voucher not found: {0}")]
    VoucherNotFound(String),
    #[error("Settlement expense not found: {0}")]
    ExpenseNotFound(Uuid),

    #[error("Voucher number {0} is already in use")]
    DuplicateVoucherNumber(u64),
    #[error("Voucher {voucher} has no posting on account {account}")]
    VoucherAccountMismatch { voucher: u64, account: Uuid },
    #[error("`{0}` already exists")]
    DuplicateName(String),
    #[error("Cannot delete {entity}: {reason}")]
    InUse { entity: String, reason: String },
    #[error("Snapshot is missing required collection `{0}`")]
    SnapshotIncomplete(String),

    #[error("Cross-store write failed, nothing was persisted: {0}")]
    CrossStoreWriteFailed(String),

    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Serialization error: {0}")]
    Serde(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    pub fn class(&self) -> ErrorClass {
        match self {
            CoreError::AmountNotPositive(_)
            | CoreError::AccountsIdentical
            | CoreError::MissingRequiredAccount(_)
            | CoreError::RatiosNotNormalized { .. }
            | CoreError::Validation(_)
            | CoreError::Domain(_) => ErrorClass::Validation,
            CoreError::AccountNotFound(_)
            | CoreError::PartyNotFound { .. }
            | CoreError::InvestorNotFound(_)
            | CoreError::ProjectNotFound(_)
            | CoreError::CategoryNotFound(_)
            | CoreError::VoucherNotFound(_)
            | CoreError::ExpenseNotFound(_) => ErrorClass::NotFound,
            CoreError::DuplicateVoucherNumber(_)
            | CoreError::VoucherAccountMismatch { .. }
            | CoreError::DuplicateName(_)
            | CoreError::InUse { .. }
            | CoreError::SnapshotIncomplete(_) => ErrorClass::Integrity,
            CoreError::CrossStoreWriteFailed(_) => ErrorClass::CrossStore,
            CoreError::Storage(_) | CoreError::Serde(_) | CoreError::Io(_) => ErrorClass::Storage,
        }
    }

    pub(crate) fn in_use(entity: impl Into<String>, reason: impl Into<String>) -> Self {
        CoreError::InUse {
            entity: entity.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Serde(err.to_string())
    }
}
