//! Counterparties (parties) and capital partners referenced by vouchers.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::*;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
/// Selects which registry collection a [`Party`] lives in.
pub enum PartyKind {
    Party,
    Partner,
}

impl fmt::Display for PartyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartyKind::Party => f.write_str("party"),
            PartyKind::Partner => f.write_str("partner"),
        }
    }
}

/// A counterparty or partner record. The owning collection decides its [`PartyKind`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Party {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default)]
    pub opening_balance: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default = "Party::default_active")]
    pub active: bool,
}

impl Party {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            phone: None,
            email: None,
            address: None,
            opening_balance: Decimal::ZERO,
            notes: None,
            active: true,
        }
    }

    fn default_active() -> bool {
        true
    }
}

impl Identifiable for Party {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl NamedEntity for Party {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Activatable for Party {
    fn is_active(&self) -> bool {
        self.active
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }
}
