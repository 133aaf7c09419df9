use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    card::Card,
    domain::{
        GameMode, PlayerId, PlayerStats, PlayerStatus, RoundNumber, RoundResult, TableNumber,
        TargetKind, WarChoice,
    },
    error::ApiError,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientRequest {
    RegisterDealer,
    RegisterPlayer {
        player_id: PlayerId,
    },
    ShuffleDeck,
    BurnCard,
    AddPlayer {
        player_id: PlayerId,
    },
    RemovePlayer {
        player_id: PlayerId,
    },
    DealCards,
    ResetGame,
    ChangeBets {
        min_bet: u64,
        max_bet: u64,
    },
    ChangeTable {
        table_number: TableNumber,
    },
    UndoLastCard,
    AddCardManual {
        card: Card,
    },
    PlayerChoice {
        player_id: PlayerId,
        choice: WarChoice,
    },
    SetGameMode {
        mode: GameMode,
    },
    AssignWarCard {
        target: TargetKind,
        card: Card,
        #[serde(default)]
        player_id: Option<PlayerId>,
    },
    EvaluateWarRound,
    ManualDealCard {
        target: TargetKind,
        card: Card,
        #[serde(default)]
        player_id: Option<PlayerId>,
    },
    EvaluateRound,
    StartAutoRound,
    ClearRound,
    GetAllPlayerStats,
    ClearAllStats,
    DeleteLastResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    pub player_id: PlayerId,
    pub card: Option<Card>,
    pub status: PlayerStatus,
    pub result: Option<RoundResult>,
    pub war_card: Option<Card>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OriginalCardsView {
    pub dealer_card: Option<Card>,
    pub players: BTreeMap<PlayerId, Option<Card>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WarRoundView {
    pub active: bool,
    pub dealer_card: Option<Card>,
    pub players: BTreeMap<PlayerId, Option<Card>>,
    pub original_cards: OriginalCardsView,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStateView {
    pub deck_count: usize,
    pub burned_cards_count: usize,
    pub dealer_card: Option<Card>,
    pub players: Vec<PlayerView>,
    pub round_active: bool,
    pub round_number: RoundNumber,
    pub game_mode: GameMode,
    pub table_number: TableNumber,
    pub min_bet: u64,
    pub max_bet: u64,
    pub player_results: BTreeMap<PlayerId, RoundResult>,
    pub war_round_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub war_round: Option<WarRoundView>,
    pub stats: BTreeMap<PlayerId, PlayerStats>,
}

/// One finished player's outcome for one round, as written to the result store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub round_number: RoundNumber,
    pub player_id: PlayerId,
    pub player_card: Card,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub war_card: Option<Card>,
    pub dealer_card: Card,
    pub result: RoundResult,
    pub timestamp: DateTime<Utc>,
    pub table_number: TableNumber,
    pub min_bet: u64,
    pub max_bet: u64,
    pub game_mode: GameMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ServerEvent {
    GameStateUpdate {
        game_state: GameStateView,
    },
    DealerRegistered,
    PlayerRegistered {
        player_id: PlayerId,
        stats: PlayerStats,
    },
    DeckShuffled {
        deck_count: usize,
        burned_card: Option<Card>,
        burned_cards_count: usize,
    },
    CardBurned {
        burned_card: Card,
        deck_count: usize,
        burned_cards_count: usize,
    },
    CardAddedManually {
        card: Card,
        deck_count: usize,
    },
    PlayerAdded {
        player_id: PlayerId,
        players: Vec<PlayerView>,
    },
    PlayerRemoved {
        player_id: PlayerId,
        players: Vec<PlayerView>,
        player_results: BTreeMap<PlayerId, RoundResult>,
    },
    RoundDealt {
        round_number: RoundNumber,
        dealer_card: Option<Card>,
        players: Vec<PlayerView>,
        tie_players: Vec<PlayerId>,
        deck_count: usize,
        player_results: BTreeMap<PlayerId, RoundResult>,
    },
    ChoiceRequired {
        player_id: PlayerId,
        card: Card,
        dealer_card: Card,
    },
    DealerCardSet {
        card: Card,
        deck_count: usize,
    },
    PlayerCardSet {
        player_id: PlayerId,
        card: Card,
        deck_count: usize,
    },
    PlayerChoiceMade {
        player_id: PlayerId,
        choice: WarChoice,
        players: Vec<PlayerView>,
        player_results: BTreeMap<PlayerId, RoundResult>,
        deck_count: usize,
    },
    WarRoundStarted {
        war_round: WarRoundView,
        players: Vec<PlayerId>,
    },
    WarCardAssigned {
        target: TargetKind,
        card: Card,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        player_id: Option<PlayerId>,
    },
    WarRoundEvaluated {
        dealer_card: Card,
        players: Vec<PlayerView>,
        player_results: BTreeMap<PlayerId, RoundResult>,
        war_round: WarRoundView,
    },
    RoundCompleted {
        round_number: RoundNumber,
        player_results: BTreeMap<PlayerId, RoundResult>,
        stats: BTreeMap<PlayerId, PlayerStats>,
    },
    CardsUndone {
        deck_count: usize,
        players: Vec<PlayerView>,
        dealer_card: Option<Card>,
        message: String,
    },
    GameReset {
        game_state: GameStateView,
    },
    GameModeChanged {
        mode: GameMode,
    },
    BetsChanged {
        min_bet: u64,
        max_bet: u64,
    },
    TableChanged {
        table_number: TableNumber,
    },
    AllPlayerStats {
        stats: BTreeMap<PlayerId, PlayerStats>,
    },
    ClearAllStats {
        deleted_count: u64,
    },
    LastResultDeleted {
        deleted: bool,
    },
    Error(ApiError),
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
