//! Settlement of shared project expenses among investors.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use treasury_domain::{
    within_tolerance, CategoryTotal, InvestorSettlement, Ledger, ProjectInvestor,
    SettlementExpense, SettlementResult, SettlementSnapshot,
};
use uuid::Uuid;

use crate::{netting::net_balances, settings::EngineSettings, CoreError};

/// A project expense paid directly by an investor, outside the treasury books.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseDraft {
    pub project: Uuid,
    pub investor: Uuid,
    pub category: Uuid,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub description: Option<String>,
}

pub struct SettlementService;

impl SettlementService {
    /// Replaces the ratio set of `project` wholesale.
    ///
    /// Every ratio lies in `0..=1`, names an active investor at most once, and the set sums
    /// to one within `tolerance`. Nothing changes on failure.
    pub fn save_ratios(
        ledger: &mut Ledger,
        project: Uuid,
        ratios: &[(Uuid, Decimal)],
        tolerance: Decimal,
    ) -> Result<(), CoreError> {
        ledger
            .project(project)
            .ok_or(CoreError::ProjectNotFound(project))?;
        let mut seen = HashSet::new();
        for (investor_id, ratio) in ratios {
            if *ratio < Decimal::ZERO || *ratio > Decimal::ONE {
                return Err(CoreError::Validation(format!(
                    "ratio {ratio} is outside 0..1"
                )));
            }
            let investor = ledger
                .investor(*investor_id)
                .ok_or(CoreError::InvestorNotFound(*investor_id))?;
            if !investor.active {
                return Err(CoreError::Validation(format!(
                    "investor `{}` is inactive",
                    investor.name
                )));
            }
            if !seen.insert(*investor_id) {
                return Err(CoreError::Validation(format!(
                    "investor `{}` appears twice",
                    investor.name
                )));
            }
        }
        let sum: Decimal = ratios.iter().map(|(_, ratio)| *ratio).sum();
        if !within_tolerance(sum, Decimal::ONE, tolerance) {
            return Err(CoreError::RatiosNotNormalized { project, sum });
        }

        ledger
            .project_investors
            .retain(|link| link.project_id != project);
        ledger.project_investors.extend(
            ratios
                .iter()
                .map(|(investor_id, ratio)| ProjectInvestor::new(project, *investor_id, *ratio)),
        );
        ledger.touch();
        Ok(())
    }

    /// Active ratios of `project`, keyed by investor, failing unless they sum to one.
    fn normalized_ratios(
        ledger: &Ledger,
        project: Uuid,
        tolerance: Decimal,
    ) -> Result<Vec<(Uuid, Decimal)>, CoreError> {
        let ratios: Vec<(Uuid, Decimal)> = ledger
            .ratios_for_project(project)
            .filter(|link| {
                ledger
                    .investor(link.investor_id)
                    .is_some_and(|investor| investor.active)
            })
            .map(|link| (link.investor_id, link.ratio))
            .collect();
        let sum: Decimal = ratios.iter().map(|(_, ratio)| *ratio).sum();
        if ratios.is_empty() || !within_tolerance(sum, Decimal::ONE, tolerance) {
            return Err(CoreError::RatiosNotNormalized { project, sum });
        }
        Ok(ratios)
    }

    /// Fair shares, balances, and the netting plan for `project`.
    ///
    /// Investors who paid expenses without holding a ratio take part with a zero share.
    pub fn compute(
        ledger: &Ledger,
        project: Uuid,
        settings: &EngineSettings,
    ) -> Result<SettlementResult, CoreError> {
        ledger
            .project(project)
            .ok_or(CoreError::ProjectNotFound(project))?;
        let ratios = Self::normalized_ratios(ledger, project, settings.ratio_tolerance)?;

        let mut paid: HashMap<Uuid, Decimal> = HashMap::new();
        let mut order: Vec<Uuid> = ratios.iter().map(|(id, _)| *id).collect();
        for expense in ledger.expenses_for_project(project) {
            if !paid.contains_key(&expense.investor_id) && !order.contains(&expense.investor_id) {
                order.push(expense.investor_id);
            }
            *paid.entry(expense.investor_id).or_default() += expense.amount;
        }
        let total_expenses = Self::total_expenses(ledger, project);
        let ratio_of: HashMap<Uuid, Decimal> = ratios.into_iter().collect();

        let per_investor: Vec<InvestorSettlement> = order
            .into_iter()
            .map(|investor_id| {
                let ratio = ratio_of.get(&investor_id).copied().unwrap_or_default();
                let paid = paid.get(&investor_id).copied().unwrap_or_default();
                let fair_share = total_expenses * ratio;
                InvestorSettlement {
                    investor_id,
                    investor_name: ledger
                        .investor(investor_id)
                        .map(|investor| investor.name.clone())
                        .unwrap_or_else(|| investor_id.to_string()),
                    ratio,
                    paid,
                    fair_share,
                    balance: paid - fair_share,
                }
            })
            .collect();

        let plan = net_balances(&per_investor, settings.settlement_epsilon);
        tracing::debug!(
            project = %project,
            total = %total_expenses,
            investors = per_investor.len(),
            transfers = plan.len(),
            "settlement computed"
        );

        Ok(SettlementResult {
            project_id: project,
            total_expenses,
            per_investor,
            plan,
            categories: Self::category_totals(ledger, project),
        })
    }

    /// Computes the settlement and appends it as an immutable snapshot.
    pub fn record_settlement(
        ledger: &mut Ledger,
        project: Uuid,
        date: NaiveDate,
        settings: &EngineSettings,
        now: DateTime<Utc>,
    ) -> Result<Uuid, CoreError> {
        let result = Self::compute(ledger, project, settings)?;
        let id = Uuid::new_v4();
        ledger.settlement_snapshots.push(SettlementSnapshot {
            id,
            project_id: project,
            date,
            created_at: now,
            result,
        });
        ledger.touch();
        Ok(id)
    }

    /// Snapshots of `project` in creation order.
    pub fn snapshots(ledger: &Ledger, project: Uuid) -> Vec<&SettlementSnapshot> {
        ledger
            .settlement_snapshots
            .iter()
            .filter(|snapshot| snapshot.project_id == project)
            .collect()
    }

    pub fn record_expense(
        ledger: &mut Ledger,
        draft: ExpenseDraft,
        now: DateTime<Utc>,
    ) -> Result<Uuid, CoreError> {
        if draft.amount <= Decimal::ZERO {
            return Err(CoreError::AmountNotPositive(draft.amount));
        }
        ledger
            .project(draft.project)
            .ok_or(CoreError::ProjectNotFound(draft.project))?;
        ledger
            .category(draft.category)
            .ok_or(CoreError::CategoryNotFound(draft.category))?;
        let investor = ledger
            .investor(draft.investor)
            .ok_or(CoreError::InvestorNotFound(draft.investor))?;
        if !investor.active {
            return Err(CoreError::Validation(format!(
                "investor `{}` is inactive",
                investor.name
            )));
        }
        let id = Uuid::new_v4();
        ledger.settlement_expenses.push(SettlementExpense {
            id,
            project_id: draft.project,
            investor_id: draft.investor,
            category_id: draft.category,
            amount: draft.amount,
            date: draft.date,
            voucher_id: None,
            description: draft.description,
            created_at: now,
        });
        ledger.touch();
        Ok(id)
    }

    /// Removes a directly entered expense. Mirrored expenses go with their voucher.
    pub fn delete_expense(ledger: &mut Ledger, id: Uuid) -> Result<(), CoreError> {
        let expense = ledger
            .settlement_expenses
            .iter()
            .find(|expense| expense.id == id)
            .ok_or(CoreError::ExpenseNotFound(id))?;
        if let Some(voucher_id) = expense.voucher_id {
            let number = ledger.voucher(voucher_id).map_or(0, |v| v.number);
            return Err(CoreError::in_use(
                "settlement expense",
                format!("it mirrors voucher #{number}; delete the voucher instead"),
            ));
        }
        ledger.settlement_expenses.retain(|expense| expense.id != id);
        ledger.touch();
        Ok(())
    }

    pub fn total_expenses(ledger: &Ledger, project: Uuid) -> Decimal {
        ledger
            .expenses_for_project(project)
            .map(|expense| expense.amount)
            .sum()
    }

    /// Per-category expense totals of `project`, ordered by category name.
    pub fn category_totals(ledger: &Ledger, project: Uuid) -> Vec<CategoryTotal> {
        let mut totals: BTreeMap<(String, Uuid), Decimal> = BTreeMap::new();
        for expense in ledger.expenses_for_project(project) {
            let name = ledger
                .category(expense.category_id)
                .map(|category| category.name.clone())
                .unwrap_or_default();
            *totals.entry((name, expense.category_id)).or_default() += expense.amount;
        }
        totals
            .into_iter()
            .map(|((category_name, category_id), total)| CategoryTotal {
                category_id,
                category_name,
                total,
            })
            .collect()
    }
}
