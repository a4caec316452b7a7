use std::{
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
};

use chrono::Utc;

use crate::{Config, ConfigError};

const CONFIG_FILE: &str = "config.json";
const STAMP_FORMAT: &str = "%Y%m%dT%H%M%S";

/// Loads, saves, and keeps dated copies of the [`Config`] file.
///
/// Backups are named `config.<stamp>[.<note>].json`; the fixed-width stamp makes name order
/// chronological.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_path: PathBuf,
    backups_dir: PathBuf,
}

impl ConfigManager {
    pub fn new(config_path: PathBuf, backups_dir: PathBuf) -> Self {
        Self {
            config_path,
            backups_dir,
        }
    }

    /// Lays out `<base>/config/config.json` and `<base>/config/backups/`.
    pub fn with_base_dir(base: PathBuf) -> Result<Self, ConfigError> {
        let dir = base.join("config");
        let manager = Self::new(dir.join(CONFIG_FILE), dir.join("backups"));
        fs::create_dir_all(&manager.backups_dir)?;
        Ok(manager)
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn backups_dir(&self) -> &Path {
        &self.backups_dir
    }

    /// Reads the stored config, or the defaults when none has been saved yet.
    pub fn load(&self) -> Result<Config, ConfigError> {
        match read_config(&self.config_path) {
            Err(ConfigError::Io(err)) if err.kind() == io::ErrorKind::NotFound => {
                Ok(Config::default())
            }
            other => other,
        }
    }

    /// Validates and replaces the config file; an invalid config never reaches disk.
    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        config.validate()?;
        let staged = self.config_path.with_extension("json.tmp");
        write_json(&staged, config)?;
        fs::rename(&staged, &self.config_path)?;
        Ok(())
    }

    /// Writes a dated copy of `config` and returns the backup's file name.
    pub fn backup(&self, config: &Config, note: Option<&str>) -> Result<String, ConfigError> {
        let mut name = format!("config.{}", Utc::now().format(STAMP_FORMAT));
        let words: Vec<String> = note
            .unwrap_or_default()
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|word| !word.is_empty())
            .map(str::to_ascii_lowercase)
            .collect();
        if !words.is_empty() {
            name = format!("{name}.{}", words.join("-"));
        }
        name.push_str(".json");
        write_json(&self.backups_dir.join(&name), config)?;
        Ok(name)
    }

    /// Reads a backup back; the caller decides whether to [`save`](Self::save) it.
    pub fn restore(&self, backup_name: &str) -> Result<Config, ConfigError> {
        if Path::new(backup_name).file_name().and_then(|n| n.to_str()) != Some(backup_name) {
            return Err(ConfigError::Invalid(format!(
                "`{backup_name}` is not a backup file name"
            )));
        }
        read_config(&self.backups_dir.join(backup_name)).map_err(|err| match err {
            ConfigError::Io(source) if source.kind() == io::ErrorKind::NotFound => {
                ConfigError::Io(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("configuration backup `{backup_name}` not found"),
                ))
            }
            other => other,
        })
    }

    /// Backup file names, newest first.
    pub fn list_backups(&self) -> Result<Vec<String>, ConfigError> {
        let entries = match fs::read_dir(&self.backups_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let mut names = Vec::new();
        for entry in entries {
            let name = entry?.file_name().to_string_lossy().into_owned();
            if name.starts_with("config.") && name.ends_with(".json") {
                names.push(name);
            }
        }
        names.sort_unstable_by(|a, b| b.cmp(a));
        Ok(names)
    }
}

fn read_config(path: &Path) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(&fs::read_to_string(path)?)?;
    config.validate()?;
    Ok(config)
}

fn write_json(path: &Path, config: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    serde_json::to_writer_pretty(&mut file, config)?;
    file.flush()?;
    Ok(())
}
