//! JSON files on disk as a [`LedgerStorage`] backend.
//!
//! Layout: `<ledger_root>/<slug>.json` holds the live ledger and
//! `<backup_root>/<slug>/<slug>.<stamp>[-n][.<note>].json` holds its backups, where
//! `<stamp>` is the UTC time the backup was taken (`YYYYMMDDTHHMMSSmmm`).
//! Ledger files are replaced through a temp file and a rename, so a crash mid-write
//! leaves the previous version in place.

use std::{
    fs::{self, File},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use chrono::{DateTime, NaiveDateTime, Utc};
use treasury_core::{
    storage::{LedgerBackupInfo, LedgerStorage},
    CoreError,
};
use treasury_domain::Ledger;

const LEDGER_EXTENSION: &str = "json";
const STAMP_FORMAT: &str = "%Y%m%dT%H%M%S%3f";
const DEFAULT_RETENTION: usize = 5;

/// Directories used by [`JsonLedgerStorage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePaths {
    pub ledger_root: PathBuf,
    pub backup_root: PathBuf,
}

/// Filesystem-backed JSON persistence for ledgers and their backups.
#[derive(Debug, Clone)]
pub struct JsonLedgerStorage {
    paths: StoragePaths,
    retention: usize,
}

impl JsonLedgerStorage {
    pub fn new(paths: StoragePaths) -> Result<Self, CoreError> {
        Self::with_retention(paths, DEFAULT_RETENTION)
    }

    /// `retention` is the number of backups kept per ledger; at least one is always kept.
    pub fn with_retention(paths: StoragePaths, retention: usize) -> Result<Self, CoreError> {
        fs::create_dir_all(&paths.ledger_root)?;
        fs::create_dir_all(&paths.backup_root)?;
        Ok(Self {
            paths,
            retention: retention.max(1),
        })
    }

    pub fn ledger_path(&self, name: &str) -> PathBuf {
        self.paths
            .ledger_root
            .join(format!("{}.{LEDGER_EXTENSION}", canonical_name(name)))
    }

    pub fn backup_path(&self, name: &str, backup_id: &str) -> PathBuf {
        self.backup_dir(name).join(backup_id)
    }

    fn backup_dir(&self, name: &str) -> PathBuf {
        self.paths.backup_root.join(canonical_name(name))
    }

    /// Writes `contents` as a new backup of `name`, then prunes past the retention limit.
    fn store_backup(
        &self,
        name: &str,
        note: Option<&str>,
        contents: &str,
    ) -> Result<LedgerBackupInfo, CoreError> {
        let slug = canonical_name(name);
        let dir = self.backup_dir(name);
        let taken_at = Utc::now();
        let stamp = taken_at.format(STAMP_FORMAT).to_string();
        let suffix = note_label(note).map(|label| format!(".{label}")).unwrap_or_default();

        let mut id = format!("{slug}.{stamp}{suffix}.{LEDGER_EXTENSION}");
        let mut copy = 1;
        while dir.join(&id).exists() {
            copy += 1;
            id = format!("{slug}.{stamp}-{copy}{suffix}.{LEDGER_EXTENSION}");
        }
        let path = dir.join(&id);
        write_synced(&path, contents)?;
        tracing::debug!(ledger = %slug, backup = %id, "backup written");
        self.prune_backups(name)?;

        Ok(LedgerBackupInfo {
            ledger: slug,
            id,
            created_at: taken_at.to_rfc3339(),
            path,
        })
    }

    fn prune_backups(&self, name: &str) -> Result<(), CoreError> {
        for stale in self.list_backups(name)?.into_iter().skip(self.retention) {
            if let Err(err) = fs::remove_file(&stale.path) {
                tracing::warn!(backup = %stale.id, error = %err, "failed to prune backup");
            }
        }
        Ok(())
    }
}

impl LedgerStorage for JsonLedgerStorage {
    /// The version being replaced is kept as an unlabelled backup first.
    fn save_ledger(&self, name: &str, ledger: &Ledger) -> Result<(), CoreError> {
        let path = self.ledger_path(name);
        match fs::read_to_string(&path) {
            Ok(previous) => {
                self.store_backup(name, None, &previous)?;
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
        save_ledger_to_path(ledger, &path)
    }

    fn load_ledger(&self, name: &str) -> Result<Ledger, CoreError> {
        let path = self.ledger_path(name);
        if !path.is_file() {
            return Err(CoreError::Storage(format!("ledger `{name}` not found")));
        }
        load_ledger_from_path(&path)
    }

    fn list_ledgers(&self) -> Result<Vec<String>, CoreError> {
        let mut slugs: Vec<String> = json_files(&self.paths.ledger_root)?
            .filter_map(|path| Some(path.file_stem()?.to_str()?.to_string()))
            .collect();
        slugs.sort();
        Ok(slugs)
    }

    fn delete_ledger(&self, name: &str) -> Result<(), CoreError> {
        match fs::remove_file(self.ledger_path(name)) {
            Err(err) if err.kind() != ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }

    fn backup_ledger(
        &self,
        name: &str,
        ledger: &Ledger,
        note: Option<&str>,
    ) -> Result<LedgerBackupInfo, CoreError> {
        self.store_backup(name, note, &serde_json::to_string_pretty(ledger)?)
    }

    /// Backups of `name`, newest first.
    fn list_backups(&self, name: &str) -> Result<Vec<LedgerBackupInfo>, CoreError> {
        let slug = canonical_name(name);
        let mut rows: Vec<(Option<(NaiveDateTime, u32)>, LedgerBackupInfo)> =
            json_files(&self.backup_dir(name))?
                .filter_map(|path| {
                    let id = path.file_name()?.to_str()?.to_string();
                    let key = backup_order(&id);
                    let created_at = key
                        .map(|(stamp, _)| utc(stamp).to_rfc3339())
                        .unwrap_or_default();
                    Some((
                        key,
                        LedgerBackupInfo {
                            ledger: slug.clone(),
                            id,
                            created_at,
                            path,
                        },
                    ))
                })
                .collect();
        rows.sort_by(|(a, _), (b, _)| b.cmp(a));
        Ok(rows.into_iter().map(|(_, info)| info).collect())
    }

    /// Only files inside this ledger's own backup folder are read.
    fn load_backup(&self, name: &str, backup: &LedgerBackupInfo) -> Result<Ledger, CoreError> {
        let slug = canonical_name(name);
        if backup.ledger != slug {
            return Err(CoreError::Validation(format!(
                "backup `{}` belongs to ledger `{}`, not `{slug}`",
                backup.id, backup.ledger
            )));
        }
        let path = self.backup_path(name, &backup.id);
        let plain_file_name =
            Path::new(&backup.id).file_name().and_then(|n| n.to_str()) == Some(backup.id.as_str());
        if !plain_file_name || !path.is_file() {
            return Err(CoreError::Storage(format!("backup `{}` not found", backup.id)));
        }
        load_ledger_from_path(&path)
    }
}

/// Saves a ledger to an arbitrary path on disk through a temp file and a rename.
pub fn save_ledger_to_path(ledger: &Ledger, path: &Path) -> Result<(), CoreError> {
    let tmp = path.with_extension(format!("{LEDGER_EXTENSION}.tmp"));
    write_synced(&tmp, &serde_json::to_string_pretty(ledger)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Loads a ledger from the provided filesystem path.
pub fn load_ledger_from_path(path: &Path) -> Result<Ledger, CoreError> {
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

/// File-system safe slug for a ledger name.
pub fn canonical_name(name: &str) -> String {
    let slug: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if slug.trim_matches('_').is_empty() {
        "ledger".into()
    } else {
        slug
    }
}

/// Lowercase dash-separated form of a backup note; `None` when nothing printable is left.
fn note_label(note: Option<&str>) -> Option<String> {
    let words: Vec<String> = note?
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_ascii_lowercase)
        .collect();
    (!words.is_empty()).then(|| words.join("-"))
}

/// Sort key of a backup file name: its stamp and copy number.
fn backup_order(file_name: &str) -> Option<(NaiveDateTime, u32)> {
    let raw = file_name.split('.').nth(1)?;
    let (stamp, copy) = match raw.split_once('-') {
        Some((stamp, copy)) => (stamp, copy.parse().ok()?),
        None => (raw, 1),
    };
    let stamp = NaiveDateTime::parse_from_str(stamp, STAMP_FORMAT).ok()?;
    Some((stamp, copy))
}

fn utc(stamp: NaiveDateTime) -> DateTime<Utc> {
    DateTime::from_naive_utc_and_offset(stamp, Utc)
}

fn json_files(dir: &Path) -> Result<impl Iterator<Item = PathBuf>, CoreError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries.collect::<Result<Vec<_>, _>>()?,
        Err(err) if err.kind() == ErrorKind::NotFound => Vec::new(),
        Err(err) => return Err(err.into()),
    };
    Ok(entries.into_iter().map(|entry| entry.path()).filter(|path| {
        path.is_file() && path.extension().and_then(|ext| ext.to_str()) == Some(LEDGER_EXTENSION)
    }))
}

fn write_synced(path: &Path, data: &str) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.sync_all()?;
    Ok(())
}
