use chrono::{Duration, NaiveDate, Utc};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use rust_decimal::Decimal;
use tempfile::tempdir;
use treasury_ledger::{
    domain::{Account, AccountKind, DateRange, ExpenseCategory, Investor, Ledger, Project},
    services::{
        DashboardService, EngineSettings, ExpenseDraft, SettlementService, StatementSelector,
        StatementService, TransferDraft, VoucherDraft, VoucherService,
    },
};
use treasury_storage_json::{load_ledger_from_path, save_ledger_to_path};
use uuid::Uuid;

struct Sample {
    ledger: Ledger,
    cash: Uuid,
    project: Uuid,
}

fn build_sample_ledger(voucher_count: usize) -> Sample {
    let mut ledger = Ledger::new("Benchmark");
    let cash = ledger.add_account(
        Account::new("Main Cashbox", AccountKind::Cash).with_opening_balance(Decimal::new(1_000, 0)),
    );
    let bank = ledger.add_account(Account::new("Bank", AccountKind::Bank));
    let sales = ledger.add_account(Account::new("Sales", AccountKind::Revenue));
    let rent = ledger.add_account(Account::new("Rent", AccountKind::Expense));
    let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
    let now = Utc::now();

    for idx in 0..voucher_count {
        let date = start + Duration::days((idx % 365) as i64);
        let amount = Decimal::new(5_000 + (idx % 100) as i64 * 25, 2);
        match idx % 5 {
            0 => {
                VoucherService::post_transfer(
                    &mut ledger,
                    TransferDraft::new(cash, bank, amount, date),
                    now,
                )
                .expect("transfer");
            }
            1 | 2 => {
                VoucherService::post(&mut ledger, VoucherDraft::payment(date, bank, rent, amount), now)
                    .expect("payment");
            }
            _ => {
                VoucherService::post(&mut ledger, VoucherDraft::receipt(date, cash, sales, amount), now)
                    .expect("receipt");
            }
        }
    }

    let project = add_settlement_project(&mut ledger);
    Sample {
        ledger,
        cash,
        project,
    }
}

/// Twenty investors with equal ratios and a few hundred direct expenses.
fn add_settlement_project(ledger: &mut Ledger) -> Uuid {
    let project = Project::new("Expansion");
    let project_id = project.id;
    ledger.projects.push(project);
    let category = ExpenseCategory::new("Materials");
    let category_id = category.id;
    ledger.expense_categories.push(category);

    let investors: Vec<(Uuid, Decimal)> = (0..20)
        .map(|n| {
            let investor = Investor::new(format!("Investor {n:02}"));
            let id = investor.id;
            ledger.investors.push(investor);
            (id, Decimal::new(5, 2))
        })
        .collect();
    SettlementService::save_ratios(ledger, project_id, &investors, Decimal::new(1, 4))
        .expect("ratios");

    let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
    for n in 0..400usize {
        let (investor, _) = investors[(n * 7) % investors.len()];
        SettlementService::record_expense(
            ledger,
            ExpenseDraft {
                project: project_id,
                investor,
                category: category_id,
                amount: Decimal::new(((n * 7_919) % 100_000 + 100) as i64, 2),
                date,
                description: None,
            },
            Utc::now(),
        )
        .expect("expense");
    }
    project_id
}

fn bench_ledger_io(c: &mut Criterion) {
    let sample = build_sample_ledger(black_box(10_000));
    let dir = tempdir().expect("tempdir");
    let file_path = dir.path().join("benchmark.json");

    c.bench_function("ledger_save_10k", |b| {
        b.iter(|| {
            save_ledger_to_path(&sample.ledger, &file_path).expect("save ledger");
        })
    });

    save_ledger_to_path(&sample.ledger, &file_path).expect("seed");

    c.bench_function("ledger_load_10k", |b| {
        b.iter(|| {
            let loaded = load_ledger_from_path(&file_path).expect("load ledger");
            black_box(loaded);
        })
    });
}

fn bench_posting(c: &mut Criterion) {
    let sample = build_sample_ledger(black_box(10_000));
    let sales = sample
        .ledger
        .accounts
        .iter()
        .find(|account| account.kind == AccountKind::Revenue)
        .map(|account| account.id)
        .expect("sales");
    let date = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();

    c.bench_function("post_receipt_into_10k", |b| {
        b.iter_batched(
            || sample.ledger.clone(),
            |mut ledger| {
                let id = VoucherService::post(
                    &mut ledger,
                    VoucherDraft::receipt(date, sample.cash, sales, Decimal::new(12_345, 2)),
                    Utc::now(),
                )
                .expect("post");
                black_box(id);
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_reports(c: &mut Criterion) {
    let sample = build_sample_ledger(black_box(10_000));
    let year = DateRange::new(
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
    )
    .expect("range");
    let quarter = DateRange::new(
        NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
        NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
    )
    .expect("range");

    c.bench_function("cash_statement_quarter", |b| {
        b.iter(|| {
            let statement = StatementService::build(
                &sample.ledger,
                sample.cash,
                StatementSelector::DateRange(quarter),
            )
            .expect("statement");
            black_box(statement);
        })
    });

    c.bench_function("dashboard_year", |b| {
        b.iter(|| {
            black_box(DashboardService::kpis(&sample.ledger, year));
            black_box(DashboardService::monthly_chart(&sample.ledger, year));
        })
    });

    let settings = EngineSettings::default();
    c.bench_function("settlement_20_investors", |b| {
        b.iter(|| {
            let result = SettlementService::compute(&sample.ledger, sample.project, &settings)
                .expect("settlement");
            black_box(result);
        })
    });
}

criterion_group!(benches, bench_ledger_io, bench_posting, bench_reports);
criterion_main!(benches);
