use std::{
    collections::{HashMap, HashSet},
    path::PathBuf,
    sync::Mutex,
};

use chrono::Utc;
use rust_decimal::Decimal;
use treasury_domain::Ledger;
use uuid::Uuid;

use crate::CoreError;

/// Describes a persisted backup artifact for a ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerBackupInfo {
    pub ledger: String,
    pub id: String,
    pub created_at: String,
    pub path: PathBuf,
}

/// Abstraction over persistence backends capable of storing ledgers and backups.
///
/// `save_ledger` is the commit point of every mutation: it must either persist the whole
/// ledger or leave the previously stored version untouched. `load_backup` only reads; a
/// restore is committed by the caller through `save_ledger`.
pub trait LedgerStorage: Send + Sync {
    fn save_ledger(&self, name: &str, ledger: &Ledger) -> Result<(), CoreError>;
    fn load_ledger(&self, name: &str) -> Result<Ledger, CoreError>;
    fn list_ledgers(&self) -> Result<Vec<String>, CoreError>;
    fn delete_ledger(&self, name: &str) -> Result<(), CoreError>;
    fn backup_ledger(
        &self,
        name: &str,
        ledger: &Ledger,
        note: Option<&str>,
    ) -> Result<LedgerBackupInfo, CoreError>;
    fn list_backups(&self, name: &str) -> Result<Vec<LedgerBackupInfo>, CoreError>;
    /// Reads a backup of `name`. Backups taken for another ledger are rejected.
    fn load_backup(&self, name: &str, backup: &LedgerBackupInfo) -> Result<Ledger, CoreError>;
}

/// In-process storage, for embedding and tests.
#[derive(Default)]
pub struct MemoryLedgerStorage {
    ledgers: Mutex<HashMap<String, Ledger>>,
    backups: Mutex<HashMap<String, Vec<(LedgerBackupInfo, Ledger)>>>,
}

impl MemoryLedgerStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> CoreError {
    CoreError::Storage("memory storage lock poisoned".into())
}

impl LedgerStorage for MemoryLedgerStorage {
    fn save_ledger(&self, name: &str, ledger: &Ledger) -> Result<(), CoreError> {
        let mut ledgers = self.ledgers.lock().map_err(poisoned)?;
        ledgers.insert(name.to_string(), ledger.clone());
        Ok(())
    }

    fn load_ledger(&self, name: &str) -> Result<Ledger, CoreError> {
        let ledgers = self.ledgers.lock().map_err(poisoned)?;
        ledgers
            .get(name)
            .cloned()
            .ok_or_else(|| CoreError::Storage(format!("ledger `{name}` not found")))
    }

    fn list_ledgers(&self) -> Result<Vec<String>, CoreError> {
        let ledgers = self.ledgers.lock().map_err(poisoned)?;
        let mut names: Vec<String> = ledgers.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn delete_ledger(&self, name: &str) -> Result<(), CoreError> {
        let mut ledgers = self.ledgers.lock().map_err(poisoned)?;
        ledgers.remove(name);
        Ok(())
    }

    fn backup_ledger(
        &self,
        name: &str,
        ledger: &Ledger,
        note: Option<&str>,
    ) -> Result<LedgerBackupInfo, CoreError> {
        let mut backups = self.backups.lock().map_err(poisoned)?;
        let slot = backups.entry(name.to_string()).or_default();
        let created_at = Utc::now().to_rfc3339();
        let mut id = format!("{}_{}", name, slot.len() + 1);
        if let Some(note) = note.map(str::trim).filter(|note| !note.is_empty()) {
            id.push('_');
            id.push_str(note);
        }
        let info = LedgerBackupInfo {
            ledger: name.to_string(),
            id: id.clone(),
            created_at,
            path: PathBuf::from(format!("memory://{name}/{id}")),
        };
        slot.push((info.clone(), ledger.clone()));
        Ok(info)
    }

    fn list_backups(&self, name: &str) -> Result<Vec<LedgerBackupInfo>, CoreError> {
        let backups = self.backups.lock().map_err(poisoned)?;
        Ok(backups
            .get(name)
            .map(|slot| slot.iter().rev().map(|(info, _)| info.clone()).collect())
            .unwrap_or_default())
    }

    fn load_backup(&self, name: &str, backup: &LedgerBackupInfo) -> Result<Ledger, CoreError> {
        if backup.ledger != name {
            return Err(CoreError::Validation(format!(
                "backup `{}` belongs to ledger `{}`, not `{name}`",
                backup.id, backup.ledger
            )));
        }
        let backups = self.backups.lock().map_err(poisoned)?;
        backups
            .get(name)
            .and_then(|slot| slot.iter().find(|(info, _)| info.id == backup.id))
            .map(|(_, ledger)| ledger.clone())
            .ok_or_else(|| CoreError::Storage(format!("backup `{}` not found", backup.id)))
    }
}

/// Detects dangling references, unbalanced vouchers, and other anomalies within a ledger snapshot.
pub fn ledger_warnings(ledger: &Ledger) -> Vec<String> {
    let account_ids: HashSet<Uuid> = ledger.accounts.iter().map(|a| a.id).collect();
    let voucher_ids: HashSet<Uuid> = ledger.vouchers.iter().map(|v| v.id).collect();
    let investor_ids: HashSet<Uuid> = ledger.investors.iter().map(|i| i.id).collect();
    let project_ids: HashSet<Uuid> = ledger.projects.iter().map(|p| p.id).collect();
    let category_ids: HashSet<Uuid> = ledger.expense_categories.iter().map(|c| c.id).collect();
    let party_ids: HashSet<Uuid> = ledger.parties.iter().map(|p| p.id).collect();
    let partner_ids: HashSet<Uuid> = ledger.partners.iter().map(|p| p.id).collect();
    let mut warnings = Vec::new();

    for account in &ledger.accounts {
        if let Some(parent) = account.parent_id {
            if !account_ids.contains(&parent) {
                warnings.push(format!(
                    "account {} references unknown parent {}",
                    account.id, parent
                ));
            }
        }
    }

    let mut numbers = HashSet::new();
    let mut transfer_legs: HashMap<Uuid, usize> = HashMap::new();
    for voucher in &ledger.vouchers {
        if !numbers.insert(voucher.number) {
            warnings.push(format!("voucher number {} is used twice", voucher.number));
        }
        if !account_ids.contains(&voucher.account_id) {
            warnings.push(format!(
                "voucher {} references unknown account {}",
                voucher.number, voucher.account_id
            ));
        }
        let references = [
            (voucher.contra_account_id, &account_ids, "contra account"),
            (voucher.party_id, &party_ids, "party"),
            (voucher.partner_id, &partner_ids, "partner"),
            (voucher.investor_id, &investor_ids, "investor"),
            (voucher.project_id, &project_ids, "project"),
            (voucher.category_id, &category_ids, "category"),
        ];
        for (reference, known, label) in references {
            if let Some(id) = reference {
                if !known.contains(&id) {
                    warnings.push(format!(
                        "voucher {} references unknown {} {}",
                        voucher.number, label, id
                    ));
                }
            }
        }
        if let Some(transfer_id) = voucher.transfer_id {
            *transfer_legs.entry(transfer_id).or_default() += 1;
        }

        let lines: Vec<_> = ledger.entries_for_voucher(voucher.id).collect();
        let debit: Decimal = lines.iter().map(|entry| entry.debit).sum();
        let credit: Decimal = lines.iter().map(|entry| entry.credit).sum();
        if lines.len() != 2 || debit != credit || lines.iter().any(|e| !e.is_well_formed()) {
            warnings.push(format!(
                "voucher {} is unbalanced ({} lines, debit {}, credit {})",
                voucher.number,
                lines.len(),
                debit,
                credit
            ));
        }
    }
    for (transfer_id, legs) in transfer_legs {
        if legs != 2 {
            warnings.push(format!("transfer {transfer_id} has {legs} legs"));
        }
    }
    if ledger.last_voucher_number < ledger.highest_voucher_number() {
        warnings.push(format!(
            "voucher sequence {} is behind highest voucher number {}",
            ledger.last_voucher_number,
            ledger.highest_voucher_number()
        ));
    }

    for entry in &ledger.entries {
        if !voucher_ids.contains(&entry.voucher_id) {
            warnings.push(format!(
                "entry {} belongs to unknown voucher {}",
                entry.id, entry.voucher_id
            ));
        }
        if !account_ids.contains(&entry.account_id) {
            warnings.push(format!(
                "entry {} references unknown account {}",
                entry.id, entry.account_id
            ));
        }
    }

    for link in &ledger.project_investors {
        if !project_ids.contains(&link.project_id) || !investor_ids.contains(&link.investor_id) {
            warnings.push(format!(
                "ratio link {}/{} references unknown project or investor",
                link.project_id, link.investor_id
            ));
        }
    }

    for expense in &ledger.settlement_expenses {
        if !project_ids.contains(&expense.project_id)
            || !investor_ids.contains(&expense.investor_id)
            || !category_ids.contains(&expense.category_id)
        {
            warnings.push(format!(
                "settlement expense {} references unknown project, investor, or category",
                expense.id
            ));
        }
        if let Some(voucher_id) = expense.voucher_id {
            if !voucher_ids.contains(&voucher_id) {
                warnings.push(format!(
                    "settlement expense {} mirrors unknown voucher {}",
                    expense.id, voucher_id
                ));
            }
        }
    }

    warnings
}
