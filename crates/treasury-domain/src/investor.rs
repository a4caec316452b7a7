//! Investors, projects, and the ratio links between them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::*;

/// A capital partner that funds shared project expenses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Investor {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl Investor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            phone: None,
            notes: None,
            active: true,
        }
    }
}

/// A venture whose expenses are shared among its investors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            active: true,
        }
    }
}

/// Links an investor to a project with the fraction of expenses they carry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectInvestor {
    pub project_id: Uuid,
    pub investor_id: Uuid,
    pub ratio: Decimal,
}

impl ProjectInvestor {
    pub fn new(project_id: Uuid, investor_id: Uuid, ratio: Decimal) -> Self {
        Self {
            project_id,
            investor_id,
            ratio,
        }
    }
}

fn default_active() -> bool {
    true
}

impl Identifiable for Investor {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl NamedEntity for Investor {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Activatable for Investor {
    fn is_active(&self) -> bool {
        self.active
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }
}

impl Identifiable for Project {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl NamedEntity for Project {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Activatable for Project {
    fn is_active(&self) -> bool {
        self.active
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }
}
