use std::collections::BTreeMap;

use shared::domain::{PlayerId, PlayerStats, RoundResult};

/// Outcome tally for the current session. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    by_player: BTreeMap<PlayerId, PlayerStats>,
}

impl SessionStats {
    pub fn record(&mut self, player_id: &PlayerId, result: RoundResult) {
        if result == RoundResult::Tie {
            return;
        }
        self.by_player
            .entry(player_id.clone())
            .or_default()
            .record(result);
    }

    pub fn get(&self, player_id: &PlayerId) -> PlayerStats {
        self.by_player.get(player_id).copied().unwrap_or_default()
    }

    pub fn snapshot(&self) -> BTreeMap<PlayerId, PlayerStats> {
        self.by_player.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.by_player.is_empty()
    }

    pub fn clear(&mut self) {
        self.by_player.clear();
    }
}
