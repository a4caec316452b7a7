//! Single-writer facade over one stored ledger.
//!
//! Every mutation runs against a staged clone of the committed ledger and is published
//! only after the storage backend accepted it. Readers get an `Arc` of the last committed
//! state and never see a half-applied voucher, transfer, or ratio set.

use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use treasury_core::{
    ledger_warnings, snapshot, AccountService, Clock, CoreError, DashboardService,
    EngineSettings, ErrorClass, ExpenseDraft, Kpis, LedgerBackupInfo, LedgerStorage,
    MonthlyPoint, PostedTransfer, RegistryService, SettlementService, Statement,
    StatementSelector, StatementService, SystemClock, TransferDraft, TrialBalance,
    VoucherDraft, VoucherService,
};
use treasury_domain::{
    Account, AccountUpdate, CategoryUpdate, DateRange, ExpenseCategory, Investor,
    InvestorUpdate, Ledger, Party, PartyKind, PartyUpdate, Project, ProjectUpdate,
    SettlementResult, SettlementSnapshot, Voucher, CURRENT_SCHEMA_VERSION,
};
use uuid::Uuid;

use crate::TreasuryError;

/// Headline numbers of the committed ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerSummary {
    pub name: String,
    pub accounts: usize,
    pub vouchers: usize,
    pub last_voucher_number: u64,
    pub total_debit: Decimal,
    pub total_credit: Decimal,
    pub warnings: Vec<String>,
}

/// Facade that coordinates ledger state, persistence, and backups.
pub struct LedgerManager {
    name: String,
    storage: Box<dyn LedgerStorage>,
    clock: Box<dyn Clock>,
    settings: EngineSettings,
    current: RwLock<Arc<Ledger>>,
    writer: Mutex<()>,
}

fn poisoned<T>(_: T) -> CoreError {
    CoreError::Storage("ledger lock poisoned".into())
}

impl LedgerManager {
    /// Creates and persists an empty ledger under `name`.
    pub fn create(
        storage: Box<dyn LedgerStorage>,
        name: &str,
        settings: EngineSettings,
    ) -> Result<Self, TreasuryError> {
        let ledger = Ledger::new(name);
        storage.save_ledger(name, &ledger)?;
        tracing::info!(ledger = name, "ledger created");
        Ok(Self::with_ledger(storage, name, ledger, settings))
    }

    /// Opens the ledger stored under `name`.
    pub fn open(
        storage: Box<dyn LedgerStorage>,
        name: &str,
        settings: EngineSettings,
    ) -> Result<Self, TreasuryError> {
        let ledger = storage.load_ledger(name)?;
        ensure_schema_support(ledger.schema_version)?;
        for warning in ledger_warnings(&ledger) {
            tracing::warn!(ledger = name, %warning, "ledger integrity warning");
        }
        tracing::info!(ledger = name, vouchers = ledger.voucher_count(), "ledger opened");
        Ok(Self::with_ledger(storage, name, ledger, settings))
    }

    fn with_ledger(
        storage: Box<dyn LedgerStorage>,
        name: &str,
        ledger: Ledger,
        settings: EngineSettings,
    ) -> Self {
        Self {
            name: name.to_string(),
            storage,
            clock: Box::new(SystemClock),
            settings,
            current: RwLock::new(Arc::new(ledger)),
            writer: Mutex::new(()),
        }
    }

    /// Replaces the timestamp source, e.g. with a `FixedClock` in tests.
    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn storage(&self) -> &dyn LedgerStorage {
        self.storage.as_ref()
    }

    /// The last committed state.
    pub fn snapshot(&self) -> Result<Arc<Ledger>, TreasuryError> {
        Ok(self.committed()?)
    }

    fn committed(&self) -> Result<Arc<Ledger>, CoreError> {
        let guard = self.current.read().map_err(poisoned)?;
        Ok(Arc::clone(&guard))
    }

    /// Applies `mutate` to a staged copy and commits it through storage.
    ///
    /// The writer lock covers the stage, the save, and the publish, so voucher numbers are
    /// allocated and persisted in one critical section. Any error discards the stage.
    fn write<T>(
        &self,
        operation: &str,
        mutate: impl FnOnce(&mut Ledger, DateTime<Utc>) -> Result<T, CoreError>,
    ) -> Result<T, CoreError> {
        let _writer = self.writer.lock().map_err(poisoned)?;
        let mut staged = Ledger::clone(&*self.committed()?);
        let value = mutate(&mut staged, self.clock.now()).map_err(|err| {
            tracing::warn!(ledger = %self.name, operation, error = %err, "staged write discarded");
            err
        })?;
        self.storage
            .save_ledger(&self.name, &staged)
            .map_err(|err| {
                tracing::warn!(ledger = %self.name, operation, error = %err, "commit failed");
                err
            })?;
        *self.current.write().map_err(poisoned)? = Arc::new(staged);
        Ok(value)
    }

    // Vouchers

    /// Posts a receipt or payment and returns the voucher id.
    ///
    /// An investor-attributed payment commits together with its mirrored settlement
    /// expense; if that commit fails the error is [`CoreError::CrossStoreWriteFailed`].
    pub fn post_voucher(&self, draft: VoucherDraft) -> Result<Uuid, TreasuryError> {
        VoucherService::validate(&*self.committed()?, &draft)?;
        let attributed = draft.is_investor_attributed();
        let result = self.write("post_voucher", |ledger, now| {
            VoucherService::post(ledger, draft, now)
        });
        let id = match result {
            Err(err) if attributed && err.class() == ErrorClass::Storage => {
                return Err(CoreError::CrossStoreWriteFailed(err.to_string()).into());
            }
            other => other?,
        };
        tracing::info!(ledger = %self.name, voucher = %id, attributed, "voucher posted");
        Ok(id)
    }

    /// Posts both legs of a transfer in one commit.
    pub fn post_transfer(&self, draft: TransferDraft) -> Result<PostedTransfer, TreasuryError> {
        VoucherService::validate_transfer(&*self.committed()?, &draft)?;
        let posted = self.write("post_transfer", |ledger, now| {
            VoucherService::post_transfer(ledger, draft, now)
        })?;
        tracing::info!(
            ledger = %self.name,
            out = posted.out_number,
            incoming = posted.in_number,
            "transfer posted"
        );
        Ok(posted)
    }

    /// Deletes a voucher with its entries. Returns `false` when no such voucher exists.
    pub fn delete_voucher(&self, id: Uuid) -> Result<bool, TreasuryError> {
        match self.write("delete_voucher", |ledger, _| VoucherService::delete(ledger, id)) {
            Ok(removed) => {
                tracing::info!(ledger = %self.name, removed = removed.len(), "voucher deleted");
                Ok(true)
            }
            Err(CoreError::VoucherNotFound(_)) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    pub fn voucher(&self, number: u64) -> Result<Voucher, TreasuryError> {
        Ok(VoucherService::by_number(&*self.committed()?, number)?.clone())
    }

    pub fn vouchers_in_range(&self, first: u64, last: u64) -> Result<Vec<Voucher>, TreasuryError> {
        let ledger = self.committed()?;
        Ok(VoucherService::in_number_range(&ledger, first, last)
            .into_iter()
            .cloned()
            .collect())
    }

    pub fn trial_balance(&self) -> Result<TrialBalance, TreasuryError> {
        Ok(VoucherService::trial_balance(&*self.committed()?))
    }

    pub fn ledger_warnings(&self) -> Result<Vec<String>, TreasuryError> {
        Ok(ledger_warnings(&*self.committed()?))
    }

    pub fn summary(&self) -> Result<LedgerSummary, TreasuryError> {
        let ledger = self.committed()?;
        let totals = VoucherService::trial_balance(&ledger);
        Ok(LedgerSummary {
            name: self.name.clone(),
            accounts: ledger.accounts.len(),
            vouchers: ledger.voucher_count(),
            last_voucher_number: ledger.last_voucher_number,
            total_debit: totals.total_debit,
            total_credit: totals.total_credit,
            warnings: ledger_warnings(&ledger),
        })
    }

    // Reports

    pub fn build_statement(
        &self,
        account: Uuid,
        selector: StatementSelector,
    ) -> Result<Statement, TreasuryError> {
        Ok(StatementService::build(&*self.committed()?, account, selector)?)
    }

    pub fn get_kpis(&self, range: DateRange) -> Result<Kpis, TreasuryError> {
        Ok(DashboardService::kpis(&*self.committed()?, range))
    }

    pub fn get_monthly_chart(&self, range: DateRange) -> Result<Vec<MonthlyPoint>, TreasuryError> {
        Ok(DashboardService::monthly_chart(&*self.committed()?, range))
    }

    // Settlement

    /// Replaces the ratio set of `project` in one commit.
    pub fn save_settlement_ratios(
        &self,
        project: Uuid,
        ratios: &[(Uuid, Decimal)],
    ) -> Result<(), TreasuryError> {
        let tolerance = self.settings.ratio_tolerance;
        self.write("save_settlement_ratios", |ledger, _| {
            SettlementService::save_ratios(ledger, project, ratios, tolerance)
        })?;
        tracing::info!(ledger = %self.name, project = %project, investors = ratios.len(), "settlement ratios saved");
        Ok(())
    }

    pub fn compute_settlement(&self, project: Uuid) -> Result<SettlementResult, TreasuryError> {
        Ok(SettlementService::compute(
            &*self.committed()?,
            project,
            &self.settings,
        )?)
    }

    /// Computes the settlement of `project` and appends it as an immutable snapshot.
    pub fn record_settlement(&self, project: Uuid, date: NaiveDate) -> Result<Uuid, TreasuryError> {
        let settings = self.settings;
        let id = self.write("record_settlement", |ledger, now| {
            SettlementService::record_settlement(ledger, project, date, &settings, now)
        })?;
        tracing::info!(ledger = %self.name, project = %project, snapshot = %id, "settlement recorded");
        Ok(id)
    }

    pub fn settlement_snapshots(
        &self,
        project: Uuid,
    ) -> Result<Vec<SettlementSnapshot>, TreasuryError> {
        let ledger = self.committed()?;
        Ok(SettlementService::snapshots(&ledger, project)
            .into_iter()
            .cloned()
            .collect())
    }

    pub fn record_expense(&self, draft: ExpenseDraft) -> Result<Uuid, TreasuryError> {
        Ok(self.write("record_expense", |ledger, now| {
            SettlementService::record_expense(ledger, draft, now)
        })?)
    }

    pub fn delete_expense(&self, id: Uuid) -> Result<(), TreasuryError> {
        Ok(self.write("delete_expense", |ledger, _| {
            SettlementService::delete_expense(ledger, id)
        })?)
    }

    // Snapshot import and export

    pub fn export_ledger(&self) -> Result<String, TreasuryError> {
        Ok(snapshot::export_ledger(&*self.committed()?)?)
    }

    /// Replaces the whole ledger with a validated snapshot.
    ///
    /// The snapshot is fully decoded and checked before anything is touched, and the
    /// current state is backed up first.
    pub fn import_ledger(&self, raw: &str) -> Result<(), TreasuryError> {
        let imported = snapshot::import_ledger(raw)?;
        let current = self.committed()?;
        self.storage
            .backup_ledger(&self.name, &current, Some("before import"))?;
        let vouchers = imported.voucher_count();
        self.write("import_ledger", move |ledger, _| {
            *ledger = imported;
            Ok(())
        })?;
        tracing::info!(ledger = %self.name, vouchers, "ledger imported");
        Ok(())
    }

    // Backups

    pub fn backup(&self, note: Option<&str>) -> Result<LedgerBackupInfo, TreasuryError> {
        let current = self.committed()?;
        Ok(self.storage.backup_ledger(&self.name, &current, note)?)
    }

    pub fn list_backups(&self) -> Result<Vec<LedgerBackupInfo>, TreasuryError> {
        Ok(self.storage.list_backups(&self.name)?)
    }

    /// Restores a backup of this ledger and makes it the committed state.
    ///
    /// The backup is checked before anything is written; a backup of another ledger, from a
    /// newer schema, or with dangling references leaves the stored ledger untouched.
    pub fn restore_backup(&self, backup: &LedgerBackupInfo) -> Result<(), TreasuryError> {
        let restored = self.storage.load_backup(&self.name, backup)?;
        ensure_schema_support(restored.schema_version)?;
        let warnings = ledger_warnings(&restored);
        if !warnings.is_empty() {
            return Err(CoreError::Validation(format!(
                "backup `{}` is inconsistent: {}",
                backup.id,
                warnings.join("; ")
            ))
            .into());
        }
        self.write("restore_backup", move |ledger, _| {
            *ledger = restored;
            Ok(())
        })?;
        tracing::info!(ledger = %self.name, backup = %backup.id, "backup restored");
        Ok(())
    }

    // Account directory

    pub fn add_account(&self, account: Account) -> Result<Uuid, TreasuryError> {
        Ok(self.write("add_account", |ledger, _| AccountService::add(ledger, account))?)
    }

    pub fn update_account(&self, id: Uuid, changes: AccountUpdate) -> Result<(), TreasuryError> {
        Ok(self.write("update_account", |ledger, _| {
            AccountService::update(ledger, id, changes)
        })?)
    }

    pub fn set_account_active(&self, id: Uuid, active: bool) -> Result<(), TreasuryError> {
        Ok(self.write("set_account_active", |ledger, _| {
            AccountService::set_active(ledger, id, active)
        })?)
    }

    pub fn delete_account(&self, id: Uuid) -> Result<(), TreasuryError> {
        Ok(self.write("delete_account", |ledger, _| AccountService::delete(ledger, id))?)
    }

    pub fn account_balance(&self, id: Uuid) -> Result<Decimal, TreasuryError> {
        Ok(AccountService::balance(&*self.committed()?, id)?)
    }

    pub fn rollup_balance(&self, id: Uuid) -> Result<Decimal, TreasuryError> {
        Ok(AccountService::rollup_balance(&*self.committed()?, id)?)
    }

    pub fn account_children(&self, id: Uuid) -> Result<Vec<Account>, TreasuryError> {
        let ledger = self.committed()?;
        Ok(AccountService::children(&ledger, id)
            .into_iter()
            .cloned()
            .collect())
    }

    pub fn account_path(&self, id: Uuid) -> Result<Vec<String>, TreasuryError> {
        Ok(AccountService::path(&*self.committed()?, id)?)
    }

    // Registry

    pub fn add_party(&self, kind: PartyKind, party: Party) -> Result<Uuid, TreasuryError> {
        Ok(self.write("add_party", |ledger, _| {
            RegistryService::add_party(ledger, kind, party)
        })?)
    }

    pub fn update_party(
        &self,
        kind: PartyKind,
        id: Uuid,
        changes: PartyUpdate,
    ) -> Result<(), TreasuryError> {
        Ok(self.write("update_party", |ledger, _| {
            RegistryService::update_party(ledger, kind, id, changes)
        })?)
    }

    pub fn set_party_active(
        &self,
        kind: PartyKind,
        id: Uuid,
        active: bool,
    ) -> Result<(), TreasuryError> {
        Ok(self.write("set_party_active", |ledger, _| {
            RegistryService::set_party_active(ledger, kind, id, active)
        })?)
    }

    pub fn delete_party(&self, kind: PartyKind, id: Uuid) -> Result<(), TreasuryError> {
        Ok(self.write("delete_party", |ledger, _| {
            RegistryService::delete_party(ledger, kind, id)
        })?)
    }

    pub fn add_investor(&self, investor: Investor) -> Result<Uuid, TreasuryError> {
        Ok(self.write("add_investor", |ledger, _| {
            RegistryService::add_investor(ledger, investor)
        })?)
    }

    pub fn update_investor(&self, id: Uuid, changes: InvestorUpdate) -> Result<(), TreasuryError> {
        Ok(self.write("update_investor", |ledger, _| {
            RegistryService::update_investor(ledger, id, changes)
        })?)
    }

    pub fn set_investor_active(&self, id: Uuid, active: bool) -> Result<(), TreasuryError> {
        Ok(self.write("set_investor_active", |ledger, _| {
            RegistryService::set_investor_active(ledger, id, active)
        })?)
    }

    pub fn delete_investor(&self, id: Uuid) -> Result<(), TreasuryError> {
        Ok(self.write("delete_investor", |ledger, _| {
            RegistryService::delete_investor(ledger, id)
        })?)
    }

    pub fn add_project(&self, project: Project) -> Result<Uuid, TreasuryError> {
        Ok(self.write("add_project", |ledger, _| {
            RegistryService::add_project(ledger, project)
        })?)
    }

    pub fn update_project(&self, id: Uuid, changes: ProjectUpdate) -> Result<(), TreasuryError> {
        Ok(self.write("update_project", |ledger, _| {
            RegistryService::update_project(ledger, id, changes)
        })?)
    }

    pub fn set_project_active(&self, id: Uuid, active: bool) -> Result<(), TreasuryError> {
        Ok(self.write("set_project_active", |ledger, _| {
            RegistryService::set_project_active(ledger, id, active)
        })?)
    }

    pub fn delete_project(&self, id: Uuid) -> Result<(), TreasuryError> {
        Ok(self.write("delete_project", |ledger, _| {
            RegistryService::delete_project(ledger, id)
        })?)
    }

    pub fn add_category(&self, category: ExpenseCategory) -> Result<Uuid, TreasuryError> {
        Ok(self.write("add_category", |ledger, _| {
            RegistryService::add_category(ledger, category)
        })?)
    }

    pub fn update_category(&self, id: Uuid, changes: CategoryUpdate) -> Result<(), TreasuryError> {
        Ok(self.write("update_category", |ledger, _| {
            RegistryService::update_category(ledger, id, changes)
        })?)
    }

    pub fn delete_category(&self, id: Uuid) -> Result<(), TreasuryError> {
        Ok(self.write("delete_category", |ledger, _| {
            RegistryService::delete_category(ledger, id)
        })?)
    }
}

fn ensure_schema_support(schema_version: u8) -> Result<(), CoreError> {
    if schema_version > CURRENT_SCHEMA_VERSION {
        return Err(CoreError::Storage(format!(
            "ledger schema v{schema_version} is newer than supported v{CURRENT_SCHEMA_VERSION}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use treasury_core::{FixedClock, MemoryLedgerStorage};
    use treasury_domain::AccountKind;

    fn manager() -> LedgerManager {
        LedgerManager::create(
            Box::new(MemoryLedgerStorage::new()),
            "treasury",
            EngineSettings::default(),
        )
        .expect("create ledger")
    }

    #[test]
    fn create_then_open_roundtrip() {
        let storage = MemoryLedgerStorage::new();
        let mut ledger = Ledger::new("treasury");
        ledger.add_account(Account::new("Cashbox", AccountKind::Cash));
        storage.save_ledger("treasury", &ledger).unwrap();

        let manager =
            LedgerManager::open(Box::new(storage), "treasury", EngineSettings::default()).unwrap();
        assert_eq!(manager.snapshot().unwrap().accounts.len(), 1);
        assert_eq!(manager.name(), "treasury");
    }

    #[test]
    fn rejects_future_schema_versions() {
        let storage = MemoryLedgerStorage::new();
        let mut ledger = Ledger::new("future");
        ledger.schema_version = CURRENT_SCHEMA_VERSION + 5;
        storage.save_ledger("future", &ledger).unwrap();

        let err = LedgerManager::open(Box::new(storage), "future", EngineSettings::default())
            .err()
            .expect("newer schema must fail");
        match err {
            TreasuryError::Core(CoreError::Storage(message)) => {
                assert!(message.contains("newer"), "unexpected error: {message}");
            }
            other => panic!("expected storage error, got {other:?}"),
        }
    }

    #[test]
    fn snapshots_held_by_readers_are_not_mutated() {
        let manager = manager();
        let before = manager.snapshot().unwrap();
        manager
            .add_account(Account::new("Cashbox", AccountKind::Cash))
            .unwrap();
        assert!(before.accounts.is_empty());
        assert_eq!(manager.snapshot().unwrap().accounts.len(), 1);
    }

    #[test]
    fn fixed_clock_stamps_vouchers() {
        let stamp = DateTime::parse_from_rfc3339("2024-07-01T09:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let manager = manager().with_clock(Box::new(FixedClock(stamp)));
        let cash = manager
            .add_account(Account::new("Cashbox", AccountKind::Cash))
            .unwrap();
        let sales = manager
            .add_account(Account::new("Sales", AccountKind::Revenue))
            .unwrap();
        manager
            .post_voucher(VoucherDraft::receipt(
                NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
                cash,
                sales,
                Decimal::ONE_HUNDRED,
            ))
            .unwrap();
        assert_eq!(manager.voucher(1).unwrap().created_at, stamp);
    }

    #[test]
    fn missing_voucher_delete_reports_false() {
        let manager = manager();
        assert!(!manager.delete_voucher(Uuid::new_v4()).unwrap());
    }
}
