use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::{
    card::Card,
    domain::{GameMode, PlayerId, PlayerStats, RoundNumber, RoundResult, TableNumber},
    protocol::ResultRecord,
};

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredResult {
    pub id: i64,
    pub record: ResultRecord,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        // every connection to an in-memory url opens its own empty database
        let max_connections = if is_memory_url(database_url) { 1 } else { 5 };
        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(connect_options)
            .await
            .with_context(|| format!("failed to open result store at '{database_url}'"))?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn insert_result(&self, record: &ResultRecord) -> Result<i64> {
        let rec = sqlx::query(
            "INSERT INTO game_results (round_number, player_id, player_card, war_card, dealer_card, result, created_at, table_number, min_bet, max_bet, game_mode)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(i64::try_from(record.round_number.0).unwrap_or(i64::MAX))
        .bind(record.player_id.as_str())
        .bind(record.player_card.to_string())
        .bind(record.war_card.map(|card| card.to_string()))
        .bind(record.dealer_card.to_string())
        .bind(record.result.as_str())
        .bind(record.timestamp)
        .bind(i64::from(record.table_number.0))
        .bind(i64::try_from(record.min_bet).unwrap_or(i64::MAX))
        .bind(i64::try_from(record.max_bet).unwrap_or(i64::MAX))
        .bind(record.game_mode.as_str())
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("failed to store result for player {}", record.player_id))?;
        Ok(rec.get::<i64, _>(0))
    }

    /// Aggregated outcomes for one player across every stored round. Ties are not counted.
    pub async fn player_stats(&self, player_id: &PlayerId) -> Result<PlayerStats> {
        let rows = sqlx::query(
            "SELECT result, COUNT(*) FROM game_results
             WHERE player_id = ? AND result != 'tie'
             GROUP BY result",
        )
        .bind(player_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut stats = PlayerStats::default();
        for row in rows {
            add_counted(&mut stats, &row.get::<String, _>(0), row.get::<i64, _>(1))?;
        }
        Ok(stats)
    }

    pub async fn all_player_stats(&self) -> Result<BTreeMap<PlayerId, PlayerStats>> {
        let rows = sqlx::query(
            "SELECT player_id, result, COUNT(*) FROM game_results
             WHERE result != 'tie'
             GROUP BY player_id, result",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut stats: BTreeMap<PlayerId, PlayerStats> = BTreeMap::new();
        for row in rows {
            let player_id = PlayerId(row.get::<String, _>(0));
            let entry = stats.entry(player_id).or_default();
            add_counted(entry, &row.get::<String, _>(1), row.get::<i64, _>(2))?;
        }
        Ok(stats)
    }

    /// Newest first.
    pub async fn recent_results(&self, limit: u32) -> Result<Vec<StoredResult>> {
        let rows = sqlx::query(
            "SELECT id, round_number, player_id, player_card, war_card, dealer_card, result, created_at, table_number, min_bet, max_bet, game_mode
             FROM game_results
             ORDER BY id DESC
             LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(stored_result).collect()
    }

    pub async fn delete_latest_result(&self) -> Result<bool> {
        let done = sqlx::query(
            "DELETE FROM game_results WHERE id = (SELECT MAX(id) FROM game_results)",
        )
        .execute(&self.pool)
        .await?;
        Ok(done.rows_affected() > 0)
    }

    pub async fn delete_all_results(&self) -> Result<u64> {
        let done = sqlx::query("DELETE FROM game_results")
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected())
    }
}

fn add_counted(stats: &mut PlayerStats, result: &str, count: i64) -> Result<()> {
    let count = u64::try_from(count).unwrap_or_default();
    match parse_result(result)? {
        RoundResult::Win => stats.wins += count,
        RoundResult::Lose => stats.losses += count,
        RoundResult::Surrender => stats.surrenders += count,
        RoundResult::Tie => {}
    }
    Ok(())
}

fn parse_result(raw: &str) -> Result<RoundResult> {
    RoundResult::parse(raw).with_context(|| format!("unknown result '{raw}' in result store"))
}

fn parse_card(raw: &str) -> Result<Card> {
    raw.parse::<Card>()
        .with_context(|| format!("bad card '{raw}' in result store"))
}

fn stored_result(row: &SqliteRow) -> Result<StoredResult> {
    let war_card = row
        .get::<Option<String>, _>(4)
        .map(|raw| parse_card(&raw))
        .transpose()?;
    let game_mode = row.get::<String, _>(11);
    Ok(StoredResult {
        id: row.get::<i64, _>(0),
        record: ResultRecord {
            round_number: RoundNumber(non_negative(row, 1, "round_number")?),
            player_id: PlayerId(row.get::<String, _>(2)),
            player_card: parse_card(&row.get::<String, _>(3))?,
            war_card,
            dealer_card: parse_card(&row.get::<String, _>(5))?,
            result: parse_result(&row.get::<String, _>(6))?,
            timestamp: row.get::<DateTime<Utc>, _>(7),
            table_number: TableNumber(
                u32::try_from(row.get::<i64, _>(8)).context("bad table_number in result store")?,
            ),
            min_bet: non_negative(row, 9, "min_bet")?,
            max_bet: non_negative(row, 10, "max_bet")?,
            game_mode: GameMode::parse(&game_mode)
                .with_context(|| format!("unknown game mode '{game_mode}' in result store"))?,
        },
    })
}

fn non_negative(row: &SqliteRow, index: usize, column: &str) -> Result<u64> {
    let raw = row.get::<i64, _>(index);
    u64::try_from(raw).with_context(|| format!("negative {column} {raw} in result store"))
}

fn is_memory_url(database_url: &str) -> bool {
    database_url.starts_with("sqlite::memory:") || database_url.contains("mode=memory")
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
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
    if is_memory_url(database_url) || !database_url.starts_with("sqlite:") {
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
#[path = "tests/lib_tests.rs"]
mod tests;
