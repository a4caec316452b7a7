//! KPI roll-ups over posted entries.

use std::collections::BTreeMap;

use chrono::Datelike;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use treasury_domain::{AccountKind, DateRange, Entry, Ledger};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kpis {
    pub total_revenue: Decimal,
    pub total_expenses: Decimal,
    pub net_income: Decimal,
    /// Point-in-time total of asset, cash, and bank postings; ignores the KPI period.
    pub current_balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyPoint {
    /// Calendar month as `YYYY-MM`.
    pub month: String,
    pub revenue: Decimal,
    pub expenses: Decimal,
}

pub struct DashboardService;

impl DashboardService {
    pub fn kpis(ledger: &Ledger, range: DateRange) -> Kpis {
        let mut total_revenue = Decimal::ZERO;
        let mut total_expenses = Decimal::ZERO;
        let mut current_balance = Decimal::ZERO;
        for (entry, kind) in Self::entries_with_kind(ledger) {
            if kind.is_balance_sheet_asset() {
                current_balance += entry.net();
            }
            if !range.contains(entry.date) {
                continue;
            }
            match kind {
                AccountKind::Revenue => total_revenue += entry.credit,
                AccountKind::Expense => total_expenses += entry.debit,
                _ => {}
            }
        }
        Kpis {
            total_revenue,
            total_expenses,
            net_income: total_revenue - total_expenses,
            current_balance,
        }
    }

    /// Revenue and expense totals per calendar month in `range`, oldest first.
    ///
    /// Months without revenue or expense postings are omitted.
    pub fn monthly_chart(ledger: &Ledger, range: DateRange) -> Vec<MonthlyPoint> {
        let mut buckets: BTreeMap<(i32, u32), (Decimal, Decimal)> = BTreeMap::new();
        for (entry, kind) in Self::entries_with_kind(ledger) {
            if !range.contains(entry.date) {
                continue;
            }
            let key = (entry.date.year(), entry.date.month());
            match kind {
                AccountKind::Revenue => buckets.entry(key).or_default().0 += entry.credit,
                AccountKind::Expense => buckets.entry(key).or_default().1 += entry.debit,
                _ => {}
            }
        }
        buckets
            .into_iter()
            .map(|((year, month), (revenue, expenses))| MonthlyPoint {
                month: format!("{year:04}-{month:02}"),
                revenue,
                expenses,
            })
            .collect()
    }

    fn entries_with_kind(ledger: &Ledger) -> impl Iterator<Item = (&Entry, AccountKind)> {
        ledger.entries.iter().filter_map(move |entry| {
            ledger
                .account(entry.account_id)
                .map(|account| (entry, account.kind))
        })
    }
}
