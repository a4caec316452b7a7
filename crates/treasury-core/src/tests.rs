use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use treasury_domain::{
    Account, AccountKind, DateRange, ExpenseCategory, Investor, Ledger, Project, CENT,
};
use uuid::Uuid;

use crate::{
    account_service::AccountService,
    netting::residual_balances,
    settings::EngineSettings,
    settlement_service::{ExpenseDraft, SettlementService},
    statement_service::{StatementSelector, StatementService},
    storage::ledger_warnings,
    voucher_service::{TransferDraft, VoucherDraft, VoucherService},
    CoreError,
};

fn day(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, month, day).expect("valid date")
}

struct Books {
    ledger: Ledger,
    cash: Uuid,
    bank: Uuid,
    sales: Uuid,
    rent: Uuid,
}

fn books() -> Books {
    let mut ledger = Ledger::new("Core");
    let cash = AccountService::add(
        &mut ledger,
        Account::new("Main Cashbox", AccountKind::Cash).with_opening_balance(Decimal::new(500, 0)),
    )
    .expect("cash");
    let bank = AccountService::add(&mut ledger, Account::new("Bank", AccountKind::Bank))
        .expect("bank");
    let sales = AccountService::add(&mut ledger, Account::new("Sales", AccountKind::Revenue))
        .expect("sales");
    let rent = AccountService::add(&mut ledger, Account::new("Rent", AccountKind::Expense))
        .expect("rent");
    Books {
        ledger,
        cash,
        bank,
        sales,
        rent,
    }
}

/// Posts a spread of receipts, payments, and transfers across the first half of 2024.
fn populate(books: &mut Books) {
    for i in 1..=36u32 {
        let date = day(1 + (i % 6), 1 + (i * 7) % 28);
        let amount = Decimal::new(i64::from(i) * 1_337 % 50_000 + 1, 2);
        let draft = match i % 3 {
            0 => VoucherDraft::receipt(date, books.cash, books.sales, amount),
            1 => VoucherDraft::payment(date, books.bank, books.rent, amount),
            _ => {
                VoucherService::post_transfer(
                    &mut books.ledger,
                    TransferDraft::new(books.cash, books.bank, amount, date),
                    Utc::now(),
                )
                .expect("transfer");
                continue;
            }
        };
        VoucherService::post(&mut books.ledger, draft, Utc::now()).expect("voucher");
    }
}

#[test]
fn every_voucher_balances() {
    let mut books = books();
    populate(&mut books);
    for voucher in &books.ledger.vouchers {
        let lines: Vec<_> = books.ledger.entries_for_voucher(voucher.id).collect();
        assert_eq!(lines.len(), 2);
        let debit: Decimal = lines.iter().map(|e| e.debit).sum();
        let credit: Decimal = lines.iter().map(|e| e.credit).sum();
        assert_eq!(debit, credit, "voucher {}", voucher.number);
        assert!(lines.iter().all(|e| e.is_well_formed()));
    }
    assert!(VoucherService::trial_balance(&books.ledger).is_balanced());
    assert!(ledger_warnings(&books.ledger).is_empty());
}

#[test]
fn transfer_moves_exactly_the_amount() {
    let mut books = books();
    let cash_before = AccountService::balance(&books.ledger, books.cash).unwrap();
    let bank_before = AccountService::balance(&books.ledger, books.bank).unwrap();
    let posted = VoucherService::post_transfer(
        &mut books.ledger,
        TransferDraft::new(books.cash, books.bank, Decimal::new(100, 0), day(2, 1)),
        Utc::now(),
    )
    .unwrap();

    let cash_after = AccountService::balance(&books.ledger, books.cash).unwrap();
    let bank_after = AccountService::balance(&books.ledger, books.bank).unwrap();
    assert_eq!(cash_after - cash_before, Decimal::new(-100, 0));
    assert_eq!(bank_after - bank_before, Decimal::new(100, 0));

    let out = books.ledger.voucher(posted.out_id).unwrap();
    let incoming = books.ledger.voucher(posted.in_id).unwrap();
    assert_eq!(out.transfer_id, Some(posted.transfer_id));
    assert_eq!(incoming.transfer_id, Some(posted.transfer_id));
    assert_eq!(incoming.number, out.number + 1);
}

#[test]
fn statements_chain_across_adjacent_ranges() {
    let mut books = books();
    populate(&mut books);
    let mids = [day(1, 31), day(3, 15), day(5, 2)];
    for account in [books.cash, books.bank] {
        for mid in mids {
            let left = DateRange::new(day(1, 1), mid).unwrap();
            let right = DateRange::new(mid.succ_opt().unwrap(), day(6, 30)).unwrap();
            let first =
                StatementService::build(&books.ledger, account, StatementSelector::DateRange(left))
                    .unwrap();
            let second =
                StatementService::build(&books.ledger, account, StatementSelector::DateRange(right))
                    .unwrap();
            assert_eq!(first.closing_balance, second.opening_balance);
        }
    }
}

#[test]
fn rebuilding_a_statement_is_stable() {
    let mut books = books();
    populate(&mut books);
    let before = books.ledger.clone();
    let range = DateRange::new(day(1, 1), day(6, 30)).unwrap();
    let first =
        StatementService::build(&books.ledger, books.cash, StatementSelector::DateRange(range))
            .unwrap();
    let second =
        StatementService::build(&books.ledger, books.cash, StatementSelector::DateRange(range))
            .unwrap();
    assert_eq!(first, second);
    assert_eq!(books.ledger, before);
}

#[test]
fn main_cashbox_statement() {
    let mut books = books();
    VoucherService::post(
        &mut books.ledger,
        VoucherDraft::receipt(day(3, 2), books.cash, books.sales, Decimal::new(1000, 0)),
        Utc::now(),
    )
    .unwrap();
    VoucherService::post(
        &mut books.ledger,
        VoucherDraft::payment(day(3, 4), books.cash, books.rent, Decimal::new(300, 0)),
        Utc::now(),
    )
    .unwrap();
    let range = DateRange::new(day(3, 1), day(3, 31)).unwrap();
    let statement =
        StatementService::build(&books.ledger, books.cash, StatementSelector::DateRange(range))
            .unwrap();
    let balances: Vec<Decimal> = statement.rows.iter().map(|row| row.balance).collect();
    assert_eq!(
        balances,
        vec![
            Decimal::new(500, 0),
            Decimal::new(1500, 0),
            Decimal::new(1200, 0)
        ]
    );
    assert_eq!(statement.closing_balance, Decimal::new(1200, 0));
}

#[test]
fn deleting_an_account_with_postings_changes_nothing() {
    let mut books = books();
    populate(&mut books);
    let before = books.ledger.clone();
    let err = AccountService::delete(&mut books.ledger, books.cash).unwrap_err();
    assert!(matches!(err, CoreError::InUse { .. }));
    assert_eq!(books.ledger, before);
}

#[test]
fn settlement_conserves_totals_and_nets_to_zero() {
    let mut ledger = Ledger::new("Settlement");
    let project = Project::new("Tower");
    let category = ExpenseCategory::new("Concrete");
    let investors: Vec<Investor> = ["A", "B", "C", "D", "E"]
        .into_iter()
        .map(Investor::new)
        .collect();
    let (project_id, category_id) = (project.id, category.id);
    let ids: Vec<Uuid> = investors.iter().map(|i| i.id).collect();
    ledger.projects.push(project);
    ledger.expense_categories.push(category);
    ledger.investors.extend(investors);

    let settings = EngineSettings::default();
    let ratios: Vec<(Uuid, Decimal)> = ids
        .iter()
        .zip([35, 25, 20, 15, 5])
        .map(|(id, pct)| (*id, Decimal::new(pct, 2)))
        .collect();
    SettlementService::save_ratios(&mut ledger, project_id, &ratios, settings.ratio_tolerance)
        .unwrap();

    for (n, investor) in ids.iter().cycle().take(17).enumerate() {
        let amount = Decimal::new((n as i64 * 7_919) % 1_000 + 10, 0);
        SettlementService::record_expense(
            &mut ledger,
            ExpenseDraft {
                project: project_id,
                investor: if n % 4 == 0 { ids[0] } else { *investor },
                category: category_id,
                amount,
                date: day(4, 1),
                description: None,
            },
            Utc::now(),
        )
        .unwrap();
    }

    let result = SettlementService::compute(&ledger, project_id, &settings).unwrap();
    let fair: Decimal = result.per_investor.iter().map(|i| i.fair_share).sum();
    let balance: Decimal = result.per_investor.iter().map(|i| i.balance).sum();
    assert!((fair - result.total_expenses).abs() < CENT);
    assert!(balance.abs() < CENT);

    let creditors = result
        .per_investor
        .iter()
        .filter(|i| i.balance >= CENT)
        .count();
    let debtors = result
        .per_investor
        .iter()
        .filter(|i| -i.balance >= CENT)
        .count();
    assert!(result.plan.len() < (creditors + debtors).max(1));
    for (_, left) in residual_balances(&result.per_investor, &result.plan) {
        assert!(left.abs() < CENT, "residual {left}");
    }
}
