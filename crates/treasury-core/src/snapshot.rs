//! Whole-ledger export and import.
//!
//! An import is validated completely before the caller replaces anything: every required
//! collection must be present, the schema must not be newer than this build, and the
//! decoded ledger must pass [`ledger_warnings`].

use serde_json::Value;
use treasury_domain::{Ledger, CURRENT_SCHEMA_VERSION, REQUIRED_COLLECTIONS};

use crate::{storage::ledger_warnings, CoreError};

/// Serializes the ledger as pretty-printed JSON.
pub fn export_ledger(ledger: &Ledger) -> Result<String, CoreError> {
    Ok(serde_json::to_string_pretty(ledger)?)
}

/// Decodes and validates a snapshot produced by [`export_ledger`].
pub fn import_ledger(raw: &str) -> Result<Ledger, CoreError> {
    let value: Value = serde_json::from_str(raw)?;
    let object = value
        .as_object()
        .ok_or_else(|| CoreError::Serde("snapshot must be a JSON object".into()))?;
    if let Some(missing) = REQUIRED_COLLECTIONS
        .iter()
        .find(|key| !object.contains_key(**key))
    {
        return Err(CoreError::SnapshotIncomplete((*missing).to_string()));
    }
    let version = object
        .get("schema_version")
        .and_then(Value::as_u64)
        .unwrap_or(u64::from(CURRENT_SCHEMA_VERSION));
    if version > u64::from(CURRENT_SCHEMA_VERSION) {
        return Err(CoreError::Storage(format!(
            "snapshot schema v{version} is newer than supported v{CURRENT_SCHEMA_VERSION}"
        )));
    }

    let mut ledger: Ledger = serde_json::from_value(value)?;
    let highest = ledger.highest_voucher_number();
    if ledger.last_voucher_number < highest {
        ledger.last_voucher_number = highest;
    }
    let warnings = ledger_warnings(&ledger);
    if !warnings.is_empty() {
        return Err(CoreError::Validation(format!(
            "snapshot failed integrity checks: {}",
            warnings.join("; ")
        )));
    }
    Ok(ledger)
}
