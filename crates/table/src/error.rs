use shared::{
    card::Card,
    domain::{GameMode, PlayerId},
    error::{ApiError, ErrorCode},
};
use thiserror::Error;

use crate::{ledger::Seat, mode::Operation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Exhausted,
    Conflict,
}

/// Every way a table command can be rejected. A rejected command never mutates the table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("no cards left in the shoe")]
    EmptyDeck,
    #[error("not enough cards for all seats: need {needed}, shoe holds {available}")]
    InsufficientCards { needed: usize, available: usize },
    #[error("maximum {max} players allowed")]
    MaxPlayersReached { max: usize },
    #[error("player {0} not found")]
    PlayerNotFound(PlayerId),
    #[error("player {0} is already seated")]
    PlayerAlreadySeated(PlayerId),
    #[error("a player target requires a player_id")]
    MissingPlayerId,
    #[error("cannot {operation} in {mode} mode")]
    ModeForbids { operation: Operation, mode: GameMode },
    #[error("no players seated")]
    NoPlayers,
    #[error("invalid bet limits: min_bet {min_bet}, max_bet {max_bet}")]
    InvalidBetLimits { min_bet: u64, max_bet: u64 },
    #[error("round already active")]
    RoundAlreadyActive,
    #[error("table still holds cards from the previous round; clear the round first")]
    TableNotClear,
    #[error("no active war round")]
    NoActiveWarRound,
    #[error("player {0} is not part of the war round")]
    PlayerNotInWar(PlayerId),
    #[error("not all cards assigned, missing: {}", list_seats(.0))]
    IncompleteAssignment(Vec<Seat>),
    #[error("card {0} is not available")]
    CardUnavailable(Card),
    #[error("{0} already holds a card")]
    SeatAlreadyAssigned(Seat),
    #[error("{0} already holds a war card")]
    SlotAlreadyAssigned(Seat),
    #[error("player {0} is not waiting for a war or surrender choice")]
    NotAwaitingChoice(PlayerId),
    #[error("no card to undo")]
    NothingToUndo,
    #[error("no seat is waiting to be evaluated")]
    NothingToEvaluate,
}

fn list_seats(seats: &[Seat]) -> String {
    seats
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl TableError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TableError::EmptyDeck
            | TableError::InsufficientCards { .. }
            | TableError::MaxPlayersReached { .. } => ErrorKind::Exhausted,
            TableError::PlayerNotFound(_)
            | TableError::MissingPlayerId
            | TableError::ModeForbids { .. }
            | TableError::NoPlayers
            | TableError::InvalidBetLimits { .. }
            | TableError::PlayerNotInWar(_) => ErrorKind::Validation,
            TableError::PlayerAlreadySeated(_)
            | TableError::RoundAlreadyActive
            | TableError::TableNotClear
            | TableError::NoActiveWarRound
            | TableError::IncompleteAssignment(_)
            | TableError::CardUnavailable(_)
            | TableError::SeatAlreadyAssigned(_)
            | TableError::SlotAlreadyAssigned(_)
            | TableError::NotAwaitingChoice(_)
            | TableError::NothingToUndo
            | TableError::NothingToEvaluate => ErrorKind::Conflict,
        }
    }
}

impl From<&TableError> for ApiError {
    fn from(err: &TableError) -> Self {
        let code = match err {
            TableError::PlayerNotFound(_) => ErrorCode::NotFound,
            other => match other.kind() {
                ErrorKind::Validation => ErrorCode::Validation,
                ErrorKind::Exhausted => ErrorCode::Exhausted,
                ErrorKind::Conflict => ErrorCode::Conflict,
            },
        };
        ApiError::new(code, err.to_string())
    }
}

impl From<TableError> for ApiError {
    fn from(err: TableError) -> Self {
        ApiError::from(&err)
    }
}
