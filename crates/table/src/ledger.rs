use std::fmt;

use shared::{
    card::Card,
    domain::{PlayerId, PlayerStatus, TargetKind},
};
use tracing::debug;

use crate::{error::TableError, event::TableEvent, table::Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Main,
    War,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Seat {
    Dealer,
    Player(PlayerId),
}

impl Seat {
    pub fn from_target(target: TargetKind, player_id: Option<PlayerId>) -> Result<Self, TableError> {
        match target {
            TargetKind::Dealer => Ok(Seat::Dealer),
            TargetKind::Player => player_id.map(Seat::Player).ok_or(TableError::MissingPlayerId),
        }
    }

    pub fn target(&self) -> TargetKind {
        match self {
            Seat::Dealer => TargetKind::Dealer,
            Seat::Player(_) => TargetKind::Player,
        }
    }

    pub fn player_id(&self) -> Option<&PlayerId> {
        match self {
            Seat::Dealer => None,
            Seat::Player(id) => Some(id),
        }
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Seat::Dealer => f.write_str("dealer"),
            Seat::Player(id) => write!(f, "player {id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub scope: Scope,
    pub seat: Seat,
    pub card: Card,
}

impl Assignment {
    pub fn main(seat: Seat, card: Card) -> Self {
        Self {
            scope: Scope::Main,
            seat,
            card,
        }
    }

    pub fn war(seat: Seat, card: Card) -> Self {
        Self {
            scope: Scope::War,
            seat,
            card,
        }
    }
}

/// Every card assignment of the current round, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    entries: Vec<Assignment>,
}

impl Ledger {
    pub fn push(&mut self, entry: Assignment) {
        self.entries.push(entry);
    }

    pub fn pop(&mut self) -> Option<Assignment> {
        self.entries.pop()
    }

    pub fn last(&self) -> Option<&Assignment> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Assignment> + '_ {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drops the entries of a player who left the table together with their cards.
    pub(crate) fn forget_player(&mut self, player_id: &PlayerId) {
        self.entries
            .retain(|entry| entry.seat.player_id() != Some(player_id));
    }
}

impl Table {
    /// Reverses the most recent assignment, whatever its scope or seat.
    pub fn undo_last_card(&mut self) -> Result<Vec<TableEvent>, TableError> {
        let entry = self.ledger.pop().ok_or(TableError::NothingToUndo)?;
        match (&entry.scope, &entry.seat) {
            (Scope::Main, Seat::Dealer) => self.unassign_dealer_card(),
            (Scope::Main, Seat::Player(id)) => self.unassign_player_card(id),
            (Scope::War, seat) => {
                if let Some(war) = self.war.as_mut() {
                    war.clear_slot(seat);
                }
                if let Seat::Player(id) = seat {
                    if let Some(player) = self.player_mut(id) {
                        player.war_card = None;
                    }
                }
            }
        }
        self.shoe.insert_front(entry.card);

        if self.ledger.is_empty() && self.round_active {
            self.round_active = false;
            self.round_number.0 = self.round_number.0.saturating_sub(1);
            debug!(round = %self.round_number, "round rolled back by undo");
        }
        debug!(card = %entry.card, seat = %entry.seat, "card unassigned");
        Ok(vec![TableEvent::CardUndone { assignment: entry }])
    }

    /// Every result of an active round was measured against the dealer card, so all seats
    /// holding a card go back to `active`. A completed round keeps its results on display.
    fn unassign_dealer_card(&mut self) {
        self.dealer_card = None;
        let round_active = self.round_active;
        let mut reopened = Vec::new();
        for player in &mut self.players {
            let undecided = matches!(
                player.status,
                PlayerStatus::WaitingChoice | PlayerStatus::War
            );
            if undecided || (round_active && player.card.is_some()) {
                player.status = PlayerStatus::Active;
                player.result = None;
                player.war_card = None;
                reopened.push(player.id.clone());
            }
        }
        for id in &reopened {
            self.last_results.remove(id);
        }
        if let Some(war) = self.war.take() {
            self.discard_war_cards(war);
        }
    }

    fn unassign_player_card(&mut self, player_id: &PlayerId) {
        if let Some(player) = self.player_mut(player_id) {
            player.reset();
        }
        self.last_results.remove(player_id);

        let Some(war) = self.war.as_mut() else {
            return;
        };
        let leftover = war.remove_player(player_id);
        let empty = war.players.is_empty();
        if let Some(card) = leftover {
            self.shoe.discard(card);
        }
        if empty {
            if let Some(war) = self.war.take() {
                self.discard_war_cards(war);
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/ledger_tests.rs"]
mod tests;
