#![allow(dead_code)]

use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};

use once_cell::sync::Lazy;
use tempfile::TempDir;
use treasury_ledger::{
    config::ConfigManager,
    services::{
        CoreError, EngineSettings, LedgerBackupInfo, LedgerStorage, MemoryLedgerStorage,
    },
    domain::Ledger,
    LedgerManager,
};
use treasury_storage_json::{JsonLedgerStorage, StoragePaths};

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

pub fn temp_base() -> PathBuf {
    let temp = TempDir::new().expect("create temp dir");
    let base = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    base
}

pub fn json_storage(base: &std::path::Path) -> JsonLedgerStorage {
    JsonLedgerStorage::with_retention(
        StoragePaths {
            ledger_root: base.join("ledgers"),
            backup_root: base.join("backups"),
        },
        3,
    )
    .expect("create json storage backend")
}

/// Creates an isolated JSON-backed ledger and config manager for one test.
pub fn setup_test_env() -> (LedgerManager, ConfigManager, PathBuf) {
    let base = temp_base();
    let manager = LedgerManager::create(
        Box::new(json_storage(&base)),
        "Main Books",
        EngineSettings::default(),
    )
    .expect("create ledger");
    let config_manager =
        ConfigManager::with_base_dir(base.clone()).expect("create config manager for temp dir");
    (manager, config_manager, base)
}

/// In-memory storage whose commits can be made to fail on demand.
#[derive(Clone, Default)]
pub struct FailingStorage {
    inner: Arc<MemoryLedgerStorage>,
    fail_saves: Arc<AtomicBool>,
}

impl FailingStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn stored(&self, name: &str) -> Ledger {
        self.inner.load_ledger(name).expect("stored ledger")
    }

    /// Puts a ledger straight into the backup list of `name`.
    pub fn plant_backup(&self, name: &str, ledger: &Ledger) -> LedgerBackupInfo {
        self.inner.backup_ledger(name, ledger, None).expect("plant backup")
    }
}

impl LedgerStorage for FailingStorage {
    fn save_ledger(&self, name: &str, ledger: &Ledger) -> Result<(), CoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(CoreError::Storage("disk unavailable".into()));
        }
        self.inner.save_ledger(name, ledger)
    }

    fn load_ledger(&self, name: &str) -> Result<Ledger, CoreError> {
        self.inner.load_ledger(name)
    }

    fn list_ledgers(&self) -> Result<Vec<String>, CoreError> {
        self.inner.list_ledgers()
    }

    fn delete_ledger(&self, name: &str) -> Result<(), CoreError> {
        self.inner.delete_ledger(name)
    }

    fn backup_ledger(
        &self,
        name: &str,
        ledger: &Ledger,
        note: Option<&str>,
    ) -> Result<LedgerBackupInfo, CoreError> {
        self.inner.backup_ledger(name, ledger, note)
    }

    fn list_backups(&self, name: &str) -> Result<Vec<LedgerBackupInfo>, CoreError> {
        self.inner.list_backups(name)
    }

    fn load_backup(&self, name: &str, backup: &LedgerBackupInfo) -> Result<Ledger, CoreError> {
        self.inner.load_backup(name, backup)
    }
}

/// A manager over [`FailingStorage`], plus a handle to toggle failures.
pub fn failing_manager() -> (LedgerManager, FailingStorage) {
    let storage = FailingStorage::new();
    let manager = LedgerManager::create(
        Box::new(storage.clone()),
        "Main Books",
        EngineSettings::default(),
    )
    .expect("create ledger");
    (manager, storage)
}
