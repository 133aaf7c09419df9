use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use shared::{
    domain::{PlayerId, PlayerStats},
    protocol::ResultRecord,
};
use storage::Storage;

/// Durable side of the table: finished results and their aggregates.
#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn insert_result(&self, record: &ResultRecord) -> Result<()>;
    async fn player_stats(&self, player_id: &PlayerId) -> Result<PlayerStats>;
    async fn all_player_stats(&self) -> Result<BTreeMap<PlayerId, PlayerStats>>;
    async fn delete_latest_result(&self) -> Result<bool>;
    async fn delete_all_results(&self) -> Result<u64>;
    async fn health_check(&self) -> Result<()>;
}

#[async_trait]
impl ResultStore for Storage {
    async fn insert_result(&self, record: &ResultRecord) -> Result<()> {
        Storage::insert_result(self, record).await.map(|_| ())
    }

    async fn player_stats(&self, player_id: &PlayerId) -> Result<PlayerStats> {
        Storage::player_stats(self, player_id).await
    }

    async fn all_player_stats(&self) -> Result<BTreeMap<PlayerId, PlayerStats>> {
        Storage::all_player_stats(self).await
    }

    async fn delete_latest_result(&self) -> Result<bool> {
        Storage::delete_latest_result(self).await
    }

    async fn delete_all_results(&self) -> Result<u64> {
        Storage::delete_all_results(self).await
    }

    async fn health_check(&self) -> Result<()> {
        Storage::health_check(self).await
    }
}
