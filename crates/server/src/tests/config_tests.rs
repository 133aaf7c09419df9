use super::{normalize_database_url, prepare_database_url, settings_from_sources, Settings};

use std::collections::HashMap;

use shared::domain::{GameMode, TableNumber};

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn defaults_apply_without_file_or_env() {
    let settings = settings_from_sources(None, env_from(&[]));
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.game_mode, GameMode::Manual);
    assert_eq!(settings.shuffle_seed, None);
}

#[test]
fn file_values_are_read_and_env_wins() {
    let file = r#"
bind_addr = "0.0.0.0:9000"
database_url = "sqlite://./file.db"
table_number = "4"
min_bet = "25"
max_bet = "500"
game_mode = "automatic"
"#;
    let settings = settings_from_sources(
        Some(file),
        env_from(&[
            ("APP__BIND_ADDR", "127.0.0.1:7000"),
            ("APP__MAX_BET", "750"),
            ("APP__SHUFFLE_SEED", "42"),
        ]),
    );

    assert_eq!(settings.server_bind, "127.0.0.1:7000");
    assert_eq!(settings.database_url, "sqlite://./file.db");
    assert_eq!(settings.table_number, 4);
    assert_eq!(settings.min_bet, 25);
    assert_eq!(settings.max_bet, 750);
    assert_eq!(settings.game_mode, GameMode::Automatic);
    assert_eq!(settings.shuffle_seed, Some(42));
}

#[test]
fn app_prefixed_database_url_beats_plain_one() {
    let settings = settings_from_sources(
        None,
        env_from(&[
            ("DATABASE_URL", "sqlite://./plain.db"),
            ("APP__DATABASE_URL", "sqlite://./prefixed.db"),
        ]),
    );
    assert_eq!(settings.database_url, "sqlite://./prefixed.db");
}

#[test]
fn unparseable_values_keep_defaults() {
    let settings = settings_from_sources(
        None,
        env_from(&[("APP__MIN_BET", "lots"), ("APP__GAME_MODE", "turbo")]),
    );
    assert_eq!(settings.min_bet, 10);
    assert_eq!(settings.game_mode, GameMode::Manual);
}

#[test]
fn table_settings_carry_configured_values() {
    let settings = Settings {
        table_number: 3,
        min_bet: 5,
        max_bet: 50,
        game_mode: GameMode::Live,
        ..Settings::default()
    };
    let table = settings.table_settings().expect("valid limits");
    assert_eq!(table.table_number, TableNumber(3));
    assert_eq!(table.min_bet, 5);
    assert_eq!(table.max_bet, 50);
    assert_eq!(table.mode, GameMode::Live);
}

#[test]
fn table_settings_reject_inverted_limits() {
    let settings = Settings {
        min_bet: 100,
        max_bet: 10,
        ..Settings::default()
    };
    assert!(settings.table_settings().is_err());

    let settings = Settings {
        min_bet: 0,
        ..Settings::default()
    };
    assert!(settings.table_settings().is_err());
}

#[test]
fn normalizes_plain_file_path_to_sqlite_url() {
    assert_eq!(
        normalize_database_url("./data/test.db"),
        "sqlite://./data/test.db"
    );
}

#[test]
fn keeps_memory_url_untouched() {
    assert_eq!(normalize_database_url("sqlite::memory:"), "sqlite::memory:");
}

#[test]
fn empty_url_falls_back_to_default() {
    assert_eq!(
        normalize_database_url("  "),
        Settings::default().database_url
    );
}

#[test]
fn keeps_windows_absolute_path_with_single_sqlite_colon() {
    assert_eq!(
        normalize_database_url("sqlite:C:\\Users\\dealer\\war.db"),
        "sqlite:C:/Users/dealer/war.db"
    );
}

#[test]
fn normalizes_windows_plain_path_with_single_sqlite_colon() {
    assert_eq!(
        normalize_database_url("C:\\Users\\dealer\\war.db"),
        "sqlite:C:/Users/dealer/war.db"
    );
}

#[test]
fn converts_sqlite_double_slash_windows_path() {
    assert_eq!(
        normalize_database_url("sqlite://C:/Users/dealer/war.db"),
        "sqlite:C:/Users/dealer/war.db"
    );
}

#[test]
fn creates_parent_dir_for_sqlite_path() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("data").join("test.db");

    prepare_database_url(db_path.to_string_lossy().as_ref()).expect("prepare db url");
    assert!(temp_root.path().join("data").exists());
}

#[tokio::test]
async fn prepared_database_url_creates_openable_sqlite_file() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("nested").join("server.db");

    let prepared = prepare_database_url(db_path.to_string_lossy().as_ref()).expect("prepare");
    let storage = storage::Storage::new(&prepared).await.expect("open sqlite");
    storage.health_check().await.expect("ping");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should be created: {}",
        db_path.display()
    );
}
