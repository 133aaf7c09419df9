use shared::{
    card::Card,
    domain::{GameMode, PlayerId, RoundNumber, TableNumber, WarChoice},
    protocol::ResultRecord,
};

use crate::ledger::{Assignment, Seat};

/// What a successful command changed, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableEvent {
    DeckShuffled {
        burned_card: Option<Card>,
    },
    CardBurned {
        card: Card,
    },
    CardRestored {
        card: Card,
    },
    PlayerAdded {
        player_id: PlayerId,
    },
    PlayerRemoved {
        player_id: PlayerId,
    },
    RoundDealt {
        round_number: RoundNumber,
        tie_players: Vec<PlayerId>,
    },
    CardAssigned {
        seat: Seat,
        card: Card,
    },
    ChoiceMade {
        player_id: PlayerId,
        choice: WarChoice,
    },
    WarRoundStarted {
        players: Vec<PlayerId>,
    },
    /// The automatic war could not draw; the war round waits with empty slots.
    WarDrawSkipped {
        needed: usize,
        available: usize,
    },
    WarCardAssigned {
        seat: Seat,
        card: Card,
    },
    WarRoundEvaluated {
        dealer_card: Card,
        players: Vec<PlayerId>,
    },
    RoundCompleted {
        round_number: RoundNumber,
        records: Vec<ResultRecord>,
    },
    CardUndone {
        assignment: Assignment,
    },
    RoundCleared,
    GameReset,
    ModeChanged {
        mode: GameMode,
    },
    BetsChanged {
        min_bet: u64,
        max_bet: u64,
    },
    TableChanged {
        table_number: TableNumber,
    },
}
