//! Chart-of-accounts entries.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::*;

/// Name of the system account that carries funds between the two legs of a transfer.
pub const TRANSFER_CLEARING_ACCOUNT: &str = "Transfers in transit";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
/// Enumerates the account families of the chart of accounts.
pub enum AccountKind {
    Asset,
    Cash,
    Bank,
    Revenue,
    Expense,
}

impl AccountKind {
    /// Accounts that can act as the cash leg of a receipt, payment, or transfer.
    pub fn is_cash_like(self) -> bool {
        matches!(self, AccountKind::Cash | AccountKind::Bank)
    }

    /// Accounts whose debit balance counts towards the point-in-time treasury balance.
    pub fn is_balance_sheet_asset(self) -> bool {
        matches!(self, AccountKind::Asset | AccountKind::Cash | AccountKind::Bank)
    }
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AccountKind::Asset => "Asset",
            AccountKind::Cash => "Cash",
            AccountKind::Bank => "Bank",
            AccountKind::Revenue => "Revenue",
            AccountKind::Expense => "Expense",
        };
        f.write_str(label)
    }
}

/// Represents a node in the chart of accounts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub kind: AccountKind,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub opening_balance: Decimal,
    #[serde(default = "Account::default_active")]
    pub active: bool,
    /// Accounts provisioned by the engine itself; never deactivated or deleted.
    #[serde(default)]
    pub system: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Account {
    /// Creates a new active root account with a zero opening balance.
    pub fn new(name: impl Into<String>, kind: AccountKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind,
            parent_id: None,
            opening_balance: Decimal::ZERO,
            active: true,
            system: false,
            notes: None,
        }
    }

    pub fn with_parent(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_opening_balance(mut self, opening_balance: Decimal) -> Self {
        self.opening_balance = opening_balance;
        self
    }

    /// The clearing account used to balance each leg of a transfer on its own.
    pub fn transfer_clearing() -> Self {
        let mut account = Self::new(TRANSFER_CLEARING_ACCOUNT, AccountKind::Asset);
        account.system = true;
        account
    }

    fn default_active() -> bool {
        true
    }
}

impl Identifiable for Account {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl NamedEntity for Account {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Activatable for Account {
    fn is_active(&self) -> bool {
        self.active
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }
}
