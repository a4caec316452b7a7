use rust_decimal::Decimal;
use tempfile::tempdir;
use treasury_config::{Config, ConfigError, ConfigManager};

#[test]
fn default_config_carries_engine_thresholds() {
    let cfg = Config::default();

    assert_eq!(cfg.ratio_tolerance, Decimal::new(1, 4));
    assert_eq!(cfg.settlement_epsilon, Decimal::new(1, 2));
    assert_eq!(cfg.backup_retention, 5);
    cfg.validate().expect("defaults are valid");
}

#[test]
fn missing_file_loads_defaults_and_sparse_file_fills_them_in() {
    let dir = tempdir().expect("tempdir");
    let manager = ConfigManager::with_base_dir(dir.path().to_path_buf()).expect("manager");
    assert_eq!(manager.load().expect("defaults"), Config::default());

    std::fs::write(
        manager.config_path(),
        r#"{ "ratio_tolerance": "0.001", "locale": "ar-EG" }"#,
    )
    .expect("write");
    let loaded = manager.load().expect("load sparse");
    assert_eq!(loaded.ratio_tolerance, Decimal::new(1, 3));
    assert_eq!(loaded.settlement_epsilon, Config::default_settlement_epsilon());
}

#[test]
fn config_manager_persists_backs_up_and_restores() {
    let dir = tempdir().expect("tempdir");
    let manager = ConfigManager::new(dir.path().join("config.json"), dir.path().join("backups"));

    let mut cfg = Config::default();
    cfg.backup_retention = 9;
    cfg.last_opened_ledger = Some("main".into());
    manager.save(&cfg).expect("save config");
    assert_eq!(manager.load().expect("load").backup_retention, 9);

    let name = manager.backup(&cfg, Some("Before upgrade!")).expect("backup");
    assert!(name.starts_with("config."), "{name}");
    assert!(name.ends_with(".before-upgrade.json"), "{name}");
    assert_eq!(manager.list_backups().expect("list"), vec![name.clone()]);

    let restored = manager.restore(&name).expect("restore");
    assert_eq!(restored, cfg);
    assert!(matches!(
        manager.restore("config_missing.json"),
        Err(ConfigError::Io(_))
    ));
    assert!(matches!(
        manager.restore("../config.json"),
        Err(ConfigError::Invalid(_))
    ));
}

#[test]
fn invalid_thresholds_are_rejected_on_save() {
    let dir = tempdir().expect("tempdir");
    let manager = ConfigManager::new(dir.path().join("config.json"), dir.path().join("backups"));
    let cfg = Config {
        settlement_epsilon: Decimal::ZERO,
        ..Config::default()
    };
    assert!(matches!(manager.save(&cfg), Err(ConfigError::Invalid(_))));
    assert!(!manager.config_path().exists());
}
