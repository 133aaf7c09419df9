use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{ensure, Context};
use serde::Deserialize;
use shared::domain::{GameMode, TableNumber};
use table::TableSettings;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub server_bind: String,
    pub database_url: String,
    pub table_number: u32,
    pub min_bet: u64,
    pub max_bet: u64,
    pub game_mode: GameMode,
    pub shuffle_seed: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8765".into(),
            database_url: "sqlite://./data/casino_war.db".into(),
            table_number: 1,
            min_bet: 10,
            max_bet: 1000,
            game_mode: GameMode::Manual,
            shuffle_seed: None,
        }
    }
}

impl Settings {
    pub fn table_settings(&self) -> anyhow::Result<TableSettings> {
        ensure!(
            self.min_bet > 0 && self.min_bet <= self.max_bet,
            "invalid bet limits: min_bet {} max_bet {}",
            self.min_bet,
            self.max_bet
        );
        Ok(TableSettings {
            table_number: TableNumber(self.table_number),
            min_bet: self.min_bet,
            max_bet: self.max_bet,
            mode: self.game_mode,
        })
    }
}

pub fn load_settings() -> Settings {
    let file = fs::read_to_string("server.toml").ok();
    settings_from_sources(file.as_deref(), |key| std::env::var(key).ok())
}

/// `server.toml` keys first, then environment overrides. Unparseable values are ignored.
pub(crate) fn settings_from_sources(
    file: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Settings {
    let mut settings = Settings::default();

    if let Some(file_cfg) = file.and_then(|raw| toml::from_str::<HashMap<String, String>>(raw).ok()) {
        if let Some(v) = file_cfg.get("bind_addr") {
            settings.server_bind = v.clone();
        }
        if let Some(v) = file_cfg.get("database_url") {
            settings.database_url = v.clone();
        }
        apply_table_value(&mut settings, "table_number", file_cfg.get("table_number"));
        apply_table_value(&mut settings, "min_bet", file_cfg.get("min_bet"));
        apply_table_value(&mut settings, "max_bet", file_cfg.get("max_bet"));
        apply_table_value(&mut settings, "game_mode", file_cfg.get("game_mode"));
        apply_table_value(&mut settings, "shuffle_seed", file_cfg.get("shuffle_seed"));
    }

    if let Some(v) = env("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Some(v) = env("APP__BIND_ADDR") {
        settings.server_bind = v;
    }

    if let Some(v) = env("DATABASE_URL") {
        settings.database_url = v;
    }
    if let Some(v) = env("APP__DATABASE_URL") {
        settings.database_url = v;
    }

    apply_table_value(&mut settings, "table_number", env("APP__TABLE_NUMBER").as_ref());
    apply_table_value(&mut settings, "min_bet", env("APP__MIN_BET").as_ref());
    apply_table_value(&mut settings, "max_bet", env("APP__MAX_BET").as_ref());
    apply_table_value(&mut settings, "game_mode", env("APP__GAME_MODE").as_ref());
    apply_table_value(&mut settings, "shuffle_seed", env("APP__SHUFFLE_SEED").as_ref());

    settings
}

fn apply_table_value(settings: &mut Settings, key: &str, value: Option<&String>) {
    let Some(value) = value.map(|v| v.trim()) else {
        return;
    };
    match key {
        "table_number" => {
            if let Ok(parsed) = value.parse() {
                settings.table_number = parsed;
            }
        }
        "min_bet" => {
            if let Ok(parsed) = value.parse() {
                settings.min_bet = parsed;
            }
        }
        "max_bet" => {
            if let Ok(parsed) = value.parse() {
                settings.max_bet = parsed;
            }
        }
        "game_mode" => {
            if let Some(mode) = GameMode::parse(value) {
                settings.game_mode = mode;
            }
        }
        "shuffle_seed" => {
            if let Ok(parsed) = value.parse() {
                settings.shuffle_seed = Some(parsed);
            }
        }
        _ => {}
    }
}

pub fn prepare_database_url(raw_database_url: &str) -> anyhow::Result<String> {
    let database_url = normalize_database_url(raw_database_url);
    ensure_parent_dir_exists(&database_url)?;
    Ok(database_url)
}

pub(crate) fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:") {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite://") {
        if has_drive_letter(path) {
            return format!("sqlite:{}", path.replace('\\', "/"));
        }
        return raw_database_url.to_string();
    }

    if raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        return format!("sqlite:{}", path.replace('\\', "/"));
    }

    if has_drive_letter(raw_database_url) {
        return format!("sqlite:{}", raw_database_url.replace('\\', "/"));
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

fn has_drive_letter(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

fn ensure_parent_dir_exists(database_url: &str) -> anyhow::Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
