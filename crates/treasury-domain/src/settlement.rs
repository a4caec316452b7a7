//! Settlement records: expense categories, investor-paid expenses, and settlement runs.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{common::*, money::format_money};

/// Category dimension for shared project expenses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExpenseCategory {
    pub id: Uuid,
    pub name: String,
    #[serde(default = "ExpenseCategory::default_active")]
    pub active: bool,
}

impl ExpenseCategory {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            active: true,
        }
    }

    fn default_active() -> bool {
        true
    }
}

impl Identifiable for ExpenseCategory {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl NamedEntity for ExpenseCategory {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Activatable for ExpenseCategory {
    fn is_active(&self) -> bool {
        self.active
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }
}

/// A project expense paid by one investor.
///
/// Either entered directly, or mirrored from an investor-attributed treasury payment,
/// in which case `voucher_id` points back at that payment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SettlementExpense {
    pub id: Uuid,
    pub project_id: Uuid,
    pub investor_id: Uuid,
    pub category_id: Uuid,
    pub amount: Decimal,
    pub date: NaiveDate,
    #[serde(default)]
    pub voucher_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Identifiable for SettlementExpense {
    fn id(&self) -> Uuid {
        self.id
    }
}

/// Per-investor figures of a settlement run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvestorSettlement {
    pub investor_id: Uuid,
    pub investor_name: String,
    pub ratio: Decimal,
    pub paid: Decimal,
    pub fair_share: Decimal,
    /// `paid - fair_share`; positive means the investor is owed money.
    pub balance: Decimal,
}

/// One investor-to-investor payment of a netting plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SettlementTransfer {
    pub from_investor: Uuid,
    pub from_name: String,
    pub to_investor: Uuid,
    pub to_name: String,
    pub amount: Decimal,
}

impl fmt::Display for SettlementTransfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pays {} to {}",
            self.from_name,
            format_money(self.amount),
            self.to_name
        )
    }
}

/// Expense total for one category of a project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryTotal {
    pub category_id: Uuid,
    pub category_name: String,
    pub total: Decimal,
}

/// Output of a settlement computation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SettlementResult {
    pub project_id: Uuid,
    pub total_expenses: Decimal,
    pub per_investor: Vec<InvestorSettlement>,
    pub plan: Vec<SettlementTransfer>,
    #[serde(default)]
    pub categories: Vec<CategoryTotal>,
}

impl SettlementResult {
    /// Human-readable plan lines, e.g. `"Y pays 280.00 to X"`.
    pub fn plan_lines(&self) -> Vec<String> {
        self.plan.iter().map(ToString::to_string).collect()
    }
}

/// Immutable audit record of a settlement run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SettlementSnapshot {
    pub id: Uuid,
    pub project_id: Uuid,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub result: SettlementResult,
}

impl Identifiable for SettlementSnapshot {
    fn id(&self) -> Uuid {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_renders_plan_line() {
        let transfer = SettlementTransfer {
            from_investor: Uuid::new_v4(),
            from_name: "Y".into(),
            to_investor: Uuid::new_v4(),
            to_name: "X".into(),
            amount: Decimal::new(280, 0),
        };
        assert_eq!(transfer.to_string(), "Y pays 280.00 to X");
    }
}
