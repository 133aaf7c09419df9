use anyhow::Result;
use clap::{Parser, Subcommand};
use shared::domain::PlayerId;
use storage::Storage;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://./data/casino_war.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Win/loss/surrender counts, for one player or everyone.
    Stats { player_id: Option<String> },
    /// Most recent stored results, newest first.
    Results {
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    DeleteLast,
    Clear {
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url).await?;

    match cli.command {
        Command::Stats {
            player_id: Some(player_id),
        } => {
            let stats = storage.player_stats(&PlayerId(player_id.clone())).await?;
            println!(
                "{player_id}: wins={} losses={} surrenders={}",
                stats.wins, stats.losses, stats.surrenders
            );
        }
        Command::Stats { player_id: None } => {
            let all = storage.all_player_stats().await?;
            if all.is_empty() {
                println!("no results stored");
            }
            for (player_id, stats) in all {
                println!(
                    "{player_id}: wins={} losses={} surrenders={}",
                    stats.wins, stats.losses, stats.surrenders
                );
            }
        }
        Command::Results { limit } => {
            for stored in storage.recent_results(limit).await? {
                let record = stored.record;
                let war = record
                    .war_card
                    .map(|card| format!(" war={card}"))
                    .unwrap_or_default();
                println!(
                    "#{} {} round={} table={} mode={} player={} card={} dealer={}{war} result={}",
                    stored.id,
                    record.timestamp.to_rfc3339(),
                    record.round_number,
                    record.table_number,
                    record.game_mode,
                    record.player_id,
                    record.player_card,
                    record.dealer_card,
                    record.result.as_str(),
                );
            }
        }
        Command::DeleteLast => {
            if storage.delete_latest_result().await? {
                println!("deleted latest result");
            } else {
                println!("no results stored");
            }
        }
        Command::Clear { yes } => {
            anyhow::ensure!(yes, "refusing to clear every stored result without --yes");
            let deleted = storage.delete_all_results().await?;
            println!("deleted {deleted} results");
        }
    }

    Ok(())
}
