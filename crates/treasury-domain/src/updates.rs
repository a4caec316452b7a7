//! Partial-update changesets for registry entities.
//!
//! Merge precedence is identical for every changeset, field by field:
//! * `Some(value)` overwrites the stored value;
//! * `None` keeps the stored value;
//! * nullable fields are `Option<Option<T>>`, where `Some(None)` clears the stored value.
//!
//! Identifiers, kinds, and active flags are never touched by a changeset.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Account, ExpenseCategory, Investor, Party, Project};

fn merge<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AccountUpdate {
    pub name: Option<String>,
    pub parent_id: Option<Option<Uuid>>,
    pub opening_balance: Option<Decimal>,
    pub notes: Option<Option<String>>,
}

impl AccountUpdate {
    pub fn apply(self, account: &mut Account) {
        merge(&mut account.name, self.name);
        merge(&mut account.parent_id, self.parent_id);
        merge(&mut account.opening_balance, self.opening_balance);
        merge(&mut account.notes, self.notes);
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PartyUpdate {
    pub name: Option<String>,
    pub phone: Option<Option<String>>,
    pub email: Option<Option<String>>,
    pub address: Option<Option<String>>,
    pub opening_balance: Option<Decimal>,
    pub notes: Option<Option<String>>,
}

impl PartyUpdate {
    pub fn apply(self, party: &mut Party) {
        merge(&mut party.name, self.name);
        merge(&mut party.phone, self.phone);
        merge(&mut party.email, self.email);
        merge(&mut party.address, self.address);
        merge(&mut party.opening_balance, self.opening_balance);
        merge(&mut party.notes, self.notes);
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InvestorUpdate {
    pub name: Option<String>,
    pub phone: Option<Option<String>>,
    pub notes: Option<Option<String>>,
}

impl InvestorUpdate {
    pub fn apply(self, investor: &mut Investor) {
        merge(&mut investor.name, self.name);
        merge(&mut investor.phone, self.phone);
        merge(&mut investor.notes, self.notes);
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
}

impl ProjectUpdate {
    pub fn apply(self, project: &mut Project) {
        merge(&mut project.name, self.name);
        merge(&mut project.description, self.description);
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CategoryUpdate {
    pub name: Option<String>,
}

impl CategoryUpdate {
    pub fn apply(self, category: &mut ExpenseCategory) {
        merge(&mut category.name, self.name);
    }
}
