//! Account statements: opening balance plus a running balance over selected postings.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use treasury_domain::{DateRange, Entry, Ledger, Voucher, VoucherKind};
use uuid::Uuid;

use crate::{account_service::AccountService, voucher_service::VoucherService, CoreError};

/// Which postings a statement covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatementSelector {
    DateRange(DateRange),
    VoucherRange { first: u64, last: u64 },
    Voucher(u64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementRow {
    /// `true` only for the synthetic zeroth row that carries the opening balance.
    pub opening: bool,
    pub date: NaiveDate,
    pub voucher_number: Option<u64>,
    pub voucher_kind: Option<VoucherKind>,
    pub description: Option<String>,
    pub debit: Decimal,
    pub credit: Decimal,
    pub balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub account_id: Uuid,
    pub account_name: String,
    pub selector: StatementSelector,
    pub opening_balance: Decimal,
    pub rows: Vec<StatementRow>,
    pub closing_balance: Decimal,
    pub total_debit: Decimal,
    pub total_credit: Decimal,
}

pub struct StatementService;

impl StatementService {
    /// Builds the statement of `account_id` for the postings chosen by `selector`.
    ///
    /// The opening balance is the account's configured opening balance plus every posting
    /// dated strictly before the statement's starting date. Rows are ordered by
    /// `(date, voucher number)` and each carries `previous + debit - credit`.
    pub fn build(
        ledger: &Ledger,
        account_id: Uuid,
        selector: StatementSelector,
    ) -> Result<Statement, CoreError> {
        let account = AccountService::get(ledger, account_id)?;
        let vouchers: HashMap<Uuid, &Voucher> =
            ledger.vouchers.iter().map(|v| (v.id, v)).collect();
        let number_of = |entry: &Entry| vouchers.get(&entry.voucher_id).map(|v| v.number);

        let (start, mut selected): (NaiveDate, Vec<&Entry>) = match selector {
            StatementSelector::DateRange(range) => {
                DateRange::new(range.from, range.to)?;
                (
                    range.from,
                    ledger
                        .entries_for_account(account_id)
                        .filter(|entry| range.contains(entry.date))
                        .collect(),
                )
            }
            StatementSelector::VoucherRange { first, last } => {
                if first > last {
                    return Err(CoreError::Validation(format!(
                        "voucher range #{first}..#{last} is reversed"
                    )));
                }
                // Back-dated vouchers can carry a higher number than earlier-dated ones.
                let earliest = VoucherService::in_number_range(ledger, first, last)
                    .into_iter()
                    .map(|voucher| voucher.date)
                    .min()
                    .ok_or_else(|| CoreError::VoucherNotFound(format!("#{first}..#{last}")))?;
                (
                    earliest,
                    ledger
                        .entries_for_account(account_id)
                        .filter(|entry| {
                            number_of(*entry).is_some_and(|n| n >= first && n <= last)
                        })
                        .collect(),
                )
            }
            StatementSelector::Voucher(number) => {
                let voucher = VoucherService::by_number(ledger, number)?;
                let lines: Vec<&Entry> = ledger
                    .entries_for_voucher(voucher.id)
                    .filter(|entry| entry.account_id == account_id)
                    .collect();
                if lines.is_empty() {
                    return Err(CoreError::VoucherAccountMismatch {
                        voucher: number,
                        account: account_id,
                    });
                }
                (voucher.date, lines)
            }
        };

        let prior: Decimal = ledger
            .entries_for_account(account_id)
            .filter(|entry| entry.date < start)
            .map(Entry::net)
            .sum();
        let opening_balance = account.opening_balance + prior;

        selected.sort_by_key(|entry| (entry.date, number_of(*entry).unwrap_or(u64::MAX)));

        let mut rows = Vec::with_capacity(selected.len() + 1);
        rows.push(StatementRow {
            opening: true,
            date: start,
            voucher_number: None,
            voucher_kind: None,
            description: Some("Opening balance".into()),
            debit: Decimal::ZERO,
            credit: Decimal::ZERO,
            balance: opening_balance,
        });
        let mut balance = opening_balance;
        let mut total_debit = Decimal::ZERO;
        let mut total_credit = Decimal::ZERO;
        for entry in selected {
            balance += entry.debit - entry.credit;
            total_debit += entry.debit;
            total_credit += entry.credit;
            let voucher = vouchers.get(&entry.voucher_id);
            rows.push(StatementRow {
                opening: false,
                date: entry.date,
                voucher_number: voucher.map(|v| v.number),
                voucher_kind: voucher.map(|v| v.kind),
                description: entry.notes.clone(),
                debit: entry.debit,
                credit: entry.credit,
                balance,
            });
        }

        tracing::debug!(
            account = %account.name,
            rows = rows.len(),
            closing = %balance,
            "statement built"
        );

        Ok(Statement {
            account_id,
            account_name: account.name.clone(),
            selector,
            opening_balance,
            rows,
            closing_balance: balance,
            total_debit,
            total_credit,
        })
    }
}
