//! Business logic helpers for the chart of accounts.

use std::collections::{HashSet, VecDeque};

use rust_decimal::Decimal;
use treasury_domain::{
    normalized_name, Account, AccountKind, AccountUpdate, Activatable, Ledger,
};
use uuid::Uuid;

use crate::CoreError;

/// Provides validated mutations and balance queries for [`Account`] entities.
///
/// See also: [`crate::VoucherService`], which refuses postings on inactive accounts.
pub struct AccountService;

impl AccountService {
    /// Adds a new account after validating its name and parent link.
    pub fn add(ledger: &mut Ledger, account: Account) -> Result<Uuid, CoreError> {
        if account.system {
            return Err(CoreError::Validation(
                "system accounts are provisioned by the engine".into(),
            ));
        }
        Self::validate_name(ledger, None, account.kind, &account.name)?;
        if let Some(parent_id) = account.parent_id {
            Self::validate_parent(ledger, account.id, account.kind, parent_id)?;
        }
        Ok(ledger.add_account(account))
    }

    /// Applies a changeset to an existing account.
    pub fn update(ledger: &mut Ledger, id: Uuid, changes: AccountUpdate) -> Result<(), CoreError> {
        let current = Self::get(ledger, id)?;
        if current.system {
            return Err(CoreError::Validation(format!(
                "`{}` is a system account",
                current.name
            )));
        }
        let kind = current.kind;
        if let Some(name) = changes.name.as_deref() {
            Self::validate_name(ledger, Some(id), kind, name)?;
        }
        if let Some(Some(parent_id)) = changes.parent_id {
            Self::validate_parent(ledger, id, kind, parent_id)?;
        }
        let account = ledger
            .account_mut(id)
            .ok_or(CoreError::AccountNotFound(id))?;
        changes.apply(account);
        ledger.touch();
        Ok(())
    }

    /// Activates or deactivates an account. Inactive accounts accept no new postings.
    pub fn set_active(ledger: &mut Ledger, id: Uuid, active: bool) -> Result<(), CoreError> {
        let account = ledger
            .account_mut(id)
            .ok_or(CoreError::AccountNotFound(id))?;
        if account.system && !active {
            return Err(CoreError::Validation(format!(
                "`{}` is a system account",
                account.name
            )));
        }
        account.set_active(active);
        ledger.touch();
        Ok(())
    }

    /// Removes an account that has neither child accounts nor postings.
    pub fn delete(ledger: &mut Ledger, id: Uuid) -> Result<(), CoreError> {
        let account = Self::get(ledger, id)?;
        let entity = format!("account `{}`", account.name);
        if account.system {
            return Err(CoreError::in_use(entity, "it is a system account"));
        }
        if ledger.accounts.iter().any(|a| a.parent_id == Some(id)) {
            return Err(CoreError::in_use(entity, "it has child accounts"));
        }
        if ledger.entries_for_account(id).next().is_some() {
            return Err(CoreError::in_use(entity, "it has posted entries"));
        }
        ledger.accounts.retain(|account| account.id != id);
        ledger.touch();
        Ok(())
    }

    pub fn get(ledger: &Ledger, id: Uuid) -> Result<&Account, CoreError> {
        ledger.account(id).ok_or(CoreError::AccountNotFound(id))
    }

    /// Lists accounts, optionally restricted to one kind, in insertion order.
    pub fn list(ledger: &Ledger, kind: Option<AccountKind>) -> Vec<&Account> {
        ledger
            .accounts
            .iter()
            .filter(|account| kind.map_or(true, |kind| account.kind == kind))
            .collect()
    }

    pub fn children(ledger: &Ledger, id: Uuid) -> Vec<&Account> {
        ledger
            .accounts
            .iter()
            .filter(|account| account.parent_id == Some(id))
            .collect()
    }

    /// Names from the root of the tree down to `id`.
    pub fn path(ledger: &Ledger, id: Uuid) -> Result<Vec<String>, CoreError> {
        let mut names = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if !seen.insert(current) {
                break;
            }
            let account = Self::get(ledger, current)?;
            names.push(account.name.clone());
            cursor = account.parent_id;
        }
        names.reverse();
        Ok(names)
    }

    /// Opening balance plus every posting on the account (`debit - credit`).
    pub fn balance(ledger: &Ledger, id: Uuid) -> Result<Decimal, CoreError> {
        let account = Self::get(ledger, id)?;
        let movements: Decimal = ledger.entries_for_account(id).map(|e| e.net()).sum();
        Ok(account.opening_balance + movements)
    }

    /// Balance of the account and all of its descendants.
    pub fn rollup_balance(ledger: &Ledger, id: Uuid) -> Result<Decimal, CoreError> {
        Self::get(ledger, id)?;
        let mut total = Decimal::ZERO;
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            if !seen.insert(current) {
                continue;
            }
            total += Self::balance(ledger, current)?;
            queue.extend(Self::children(ledger, current).iter().map(|child| child.id));
        }
        Ok(total)
    }

    /// Returns the transfer clearing account, creating it on first use.
    pub fn ensure_transfer_clearing(ledger: &mut Ledger) -> Uuid {
        if let Some(account) = ledger.system_clearing_account() {
            return account.id;
        }
        ledger.add_account(Account::transfer_clearing())
    }

    fn validate_name(
        ledger: &Ledger,
        exclude: Option<Uuid>,
        kind: AccountKind,
        candidate: &str,
    ) -> Result<(), CoreError> {
        let normalized = normalized_name(candidate);
        if normalized.is_empty() {
            return Err(CoreError::Validation("account name is required".into()));
        }
        let duplicate = ledger.accounts.iter().any(|account| {
            account.kind == kind
                && normalized_name(&account.name) == normalized
                && exclude != Some(account.id)
        });
        if duplicate {
            Err(CoreError::DuplicateName(candidate.trim().to_string()))
        } else {
            Ok(())
        }
    }

    fn validate_parent(
        ledger: &Ledger,
        id: Uuid,
        kind: AccountKind,
        parent_id: Uuid,
    ) -> Result<(), CoreError> {
        let parent = Self::get(ledger, parent_id)?;
        if parent.kind != kind {
            return Err(CoreError::Validation(format!(
                "parent `{}` is a {} account, expected {}",
                parent.name, parent.kind, kind
            )));
        }
        let mut seen = HashSet::new();
        let mut cursor = Some(parent_id);
        while let Some(current) = cursor {
            if current == id {
                return Err(CoreError::Validation(
                    "re-parenting would create a cycle".into(),
                ));
            }
            if !seen.insert(current) {
                break;
            }
            cursor = ledger.account(current).and_then(|a| a.parent_id);
        }
        Ok(())
    }
}
