//! The ledger aggregate: every keyed collection of one treasury book.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    account::{Account, AccountKind},
    common::normalized_name,
    investor::{Investor, Project, ProjectInvestor},
    party::{Party, PartyKind},
    settlement::{ExpenseCategory, SettlementExpense, SettlementSnapshot},
    voucher::{Entry, Voucher},
};

pub const CURRENT_SCHEMA_VERSION: u8 = 1;

/// Top-level collections every serialized ledger must carry.
pub const REQUIRED_COLLECTIONS: [&str; 12] = [
    "accounts",
    "parties",
    "partners",
    "investors",
    "projects",
    "project_investors",
    "vouchers",
    "entries",
    "expense_categories",
    "settlement_expenses",
    "settlement_snapshots",
    "last_voucher_number",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ledger {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub parties: Vec<Party>,
    #[serde(default)]
    pub partners: Vec<Party>,
    #[serde(default)]
    pub investors: Vec<Investor>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub project_investors: Vec<ProjectInvestor>,
    #[serde(default)]
    pub vouchers: Vec<Voucher>,
    #[serde(default)]
    pub entries: Vec<Entry>,
    #[serde(default)]
    pub expense_categories: Vec<ExpenseCategory>,
    #[serde(default)]
    pub settlement_expenses: Vec<SettlementExpense>,
    #[serde(default)]
    pub settlement_snapshots: Vec<SettlementSnapshot>,
    /// Sequence column for voucher numbers; the next voucher gets `last_voucher_number + 1`.
    #[serde(default)]
    pub last_voucher_number: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default = "Ledger::schema_version_default")]
    pub schema_version: u8,
}

impl Ledger {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            accounts: Vec::new(),
            parties: Vec::new(),
            partners: Vec::new(),
            investors: Vec::new(),
            projects: Vec::new(),
            project_investors: Vec::new(),
            vouchers: Vec::new(),
            entries: Vec::new(),
            expense_categories: Vec::new(),
            settlement_expenses: Vec::new(),
            settlement_snapshots: Vec::new(),
            last_voucher_number: 0,
            created_at: now,
            updated_at: now,
            schema_version: CURRENT_SCHEMA_VERSION,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn schema_version_default() -> u8 {
        CURRENT_SCHEMA_VERSION
    }

    pub fn add_account(&mut self, account: Account) -> Uuid {
        let id = account.id;
        self.accounts.push(account);
        self.touch();
        id
    }

    pub fn account(&self, id: Uuid) -> Option<&Account> {
        self.accounts.iter().find(|account| account.id == id)
    }

    pub fn account_mut(&mut self, id: Uuid) -> Option<&mut Account> {
        self.accounts.iter_mut().find(|account| account.id == id)
    }

    pub fn account_by_name(&self, kind: AccountKind, name: &str) -> Option<&Account> {
        let wanted = normalized_name(name);
        self.accounts
            .iter()
            .find(|account| account.kind == kind && normalized_name(&account.name) == wanted)
    }

    pub fn system_clearing_account(&self) -> Option<&Account> {
        self.accounts.iter().find(|account| account.system)
    }

    pub fn counterparties(&self, kind: PartyKind) -> &Vec<Party> {
        match kind {
            PartyKind::Party => &self.parties,
            PartyKind::Partner => &self.partners,
        }
    }

    pub fn counterparties_mut(&mut self, kind: PartyKind) -> &mut Vec<Party> {
        match kind {
            PartyKind::Party => &mut self.parties,
            PartyKind::Partner => &mut self.partners,
        }
    }

    pub fn party(&self, kind: PartyKind, id: Uuid) -> Option<&Party> {
        self.counterparties(kind).iter().find(|party| party.id == id)
    }

    pub fn investor(&self, id: Uuid) -> Option<&Investor> {
        self.investors.iter().find(|investor| investor.id == id)
    }

    pub fn project(&self, id: Uuid) -> Option<&Project> {
        self.projects.iter().find(|project| project.id == id)
    }

    pub fn category(&self, id: Uuid) -> Option<&ExpenseCategory> {
        self.expense_categories
            .iter()
            .find(|category| category.id == id)
    }

    pub fn voucher(&self, id: Uuid) -> Option<&Voucher> {
        self.vouchers.iter().find(|voucher| voucher.id == id)
    }

    pub fn voucher_by_number(&self, number: u64) -> Option<&Voucher> {
        self.vouchers.iter().find(|voucher| voucher.number == number)
    }

    pub fn entries_for_voucher(&self, voucher_id: Uuid) -> impl Iterator<Item = &Entry> {
        self.entries
            .iter()
            .filter(move |entry| entry.voucher_id == voucher_id)
    }

    pub fn entries_for_account(&self, account_id: Uuid) -> impl Iterator<Item = &Entry> {
        self.entries
            .iter()
            .filter(move |entry| entry.account_id == account_id)
    }

    pub fn ratios_for_project(&self, project_id: Uuid) -> impl Iterator<Item = &ProjectInvestor> {
        self.project_investors
            .iter()
            .filter(move |link| link.project_id == project_id)
    }

    pub fn expenses_for_project(
        &self,
        project_id: Uuid,
    ) -> impl Iterator<Item = &SettlementExpense> {
        self.settlement_expenses
            .iter()
            .filter(move |expense| expense.project_id == project_id)
    }

    pub fn highest_voucher_number(&self) -> u64 {
        self.vouchers
            .iter()
            .map(|voucher| voucher.number)
            .max()
            .unwrap_or(0)
    }

    pub fn voucher_count(&self) -> usize {
        self.vouchers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_ledger_is_empty_and_current() {
        let ledger = Ledger::new("Treasury");
        assert!(ledger.accounts.is_empty());
        assert_eq!(ledger.last_voucher_number, 0);
        assert_eq!(ledger.schema_version, CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn serialized_ledger_carries_every_required_collection() {
        let ledger = Ledger::new("Treasury");
        let value = serde_json::to_value(&ledger).unwrap();
        for key in REQUIRED_COLLECTIONS {
            assert!(value.get(key).is_some(), "missing `{key}`");
        }
    }

    #[test]
    fn lookups_by_kind_are_case_insensitive() {
        let mut ledger = Ledger::new("Treasury");
        ledger.add_account(Account::new("Main Cashbox", AccountKind::Cash));
        assert!(ledger
            .account_by_name(AccountKind::Cash, "  main cashbox ")
            .is_some());
        assert!(ledger
            .account_by_name(AccountKind::Bank, "main cashbox")
            .is_none());
    }
}
