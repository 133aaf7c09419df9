use std::collections::BTreeMap;

use shared::{
    card::Card,
    domain::{GameMode, PlayerId, PlayerStatus},
    protocol::{OriginalCardsView, WarRoundView},
};
use tracing::{debug, warn};

use crate::{
    error::TableError,
    event::TableEvent,
    ledger::{Assignment, Seat},
    table::{compare_cards, Table},
};

/// The cards that caused the war, kept for display after the war round is evaluated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OriginalCards {
    pub dealer_card: Option<Card>,
    pub players: BTreeMap<PlayerId, Option<Card>>,
}

/// Tie-breaking sub-round. Stays on the table as a display snapshot once evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarRound {
    pub(crate) active: bool,
    pub(crate) dealer_card: Option<Card>,
    pub(crate) players: BTreeMap<PlayerId, Option<Card>>,
    pub(crate) original: OriginalCards,
}

impl WarRound {
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn dealer_card(&self) -> Option<Card> {
        self.dealer_card
    }

    pub fn players(&self) -> &BTreeMap<PlayerId, Option<Card>> {
        &self.players
    }

    pub fn original(&self) -> &OriginalCards {
        &self.original
    }

    pub fn slot(&self, seat: &Seat) -> Option<Card> {
        match seat {
            Seat::Dealer => self.dealer_card,
            Seat::Player(id) => self.players.get(id).copied().flatten(),
        }
    }

    pub fn missing_seats(&self) -> Vec<Seat> {
        let mut missing = Vec::new();
        if self.dealer_card.is_none() {
            missing.push(Seat::Dealer);
        }
        missing.extend(
            self.players
                .iter()
                .filter(|(_, card)| card.is_none())
                .map(|(id, _)| Seat::Player(id.clone())),
        );
        missing
    }

    pub fn assigned_cards(&self) -> impl Iterator<Item = Card> + '_ {
        self.dealer_card
            .into_iter()
            .chain(self.players.values().filter_map(|card| *card))
    }

    pub(crate) fn clear_slot(&mut self, seat: &Seat) {
        match seat {
            Seat::Dealer => self.dealer_card = None,
            Seat::Player(id) => {
                if let Some(slot) = self.players.get_mut(id) {
                    *slot = None;
                }
            }
        }
    }

    /// Drops a participant, returning any war card it still held.
    pub(crate) fn remove_player(&mut self, player_id: &PlayerId) -> Option<Card> {
        self.original.players.remove(player_id);
        self.players.remove(player_id).flatten()
    }

    pub fn view(&self) -> WarRoundView {
        WarRoundView {
            active: self.active,
            dealer_card: self.dealer_card,
            players: self.players.clone(),
            original_cards: OriginalCardsView {
                dealer_card: self.original.dealer_card,
                players: self.original.players.clone(),
            },
        }
    }
}

impl Table {
    pub(crate) fn open_war_round(&self, war_players: &[PlayerId]) -> WarRound {
        let original = OriginalCards {
            dealer_card: self.dealer_card,
            players: war_players
                .iter()
                .map(|id| (id.clone(), self.player(id).and_then(|p| p.card)))
                .collect(),
        };
        WarRound {
            active: true,
            dealer_card: None,
            players: war_players.iter().map(|id| (id.clone(), None)).collect(),
            original,
        }
    }

    pub(crate) fn start_war(&mut self, war_players: Vec<PlayerId>) -> Vec<TableEvent> {
        let war = self.open_war_round(&war_players);
        self.war = Some(war);
        debug!(players = war_players.len(), "war round started");
        vec![TableEvent::WarRoundStarted {
            players: war_players,
        }]
    }

    /// Draws and settles every war card at once. Used in automatic mode.
    pub(crate) fn run_automatic_war(&mut self, war_players: Vec<PlayerId>) -> Vec<TableEvent> {
        let needed = war_players.len() + 1;
        let available = self.deck_count();
        if available < needed {
            warn!(needed, available, "shoe exhausted before automatic war draw");
            let mut events = self.start_war(war_players);
            events.push(TableEvent::WarDrawSkipped { needed, available });
            return events;
        }

        let mut war = self.open_war_round(&war_players);
        for id in &war_players {
            let Ok(card) = self.shoe.draw() else {
                break;
            };
            war.players.insert(id.clone(), Some(card));
            self.ledger
                .push(Assignment::war(Seat::Player(id.clone()), card));
        }
        if let Ok(card) = self.shoe.draw() {
            war.dealer_card = Some(card);
            self.ledger.push(Assignment::war(Seat::Dealer, card));
        }
        self.war = Some(war);
        self.settle_war_round()
    }

    pub fn assign_war_card(&mut self, seat: Seat, card: Card) -> Result<Vec<TableEvent>, TableError> {
        let war = self.war.as_ref().filter(|war| war.active).ok_or(TableError::NoActiveWarRound)?;
        if let Seat::Player(id) = &seat {
            if !war.players.contains_key(id) {
                return Err(TableError::PlayerNotInWar(id.clone()));
            }
        }
        if war.slot(&seat).is_some() {
            return Err(TableError::SlotAlreadyAssigned(seat));
        }
        self.shoe.remove(card)?;

        if let Some(war) = self.war.as_mut() {
            match &seat {
                Seat::Dealer => war.dealer_card = Some(card),
                Seat::Player(id) => {
                    war.players.insert(id.clone(), Some(card));
                }
            }
        }
        self.ledger.push(Assignment::war(seat.clone(), card));
        debug!(%card, %seat, "war card assigned");
        Ok(vec![TableEvent::WarCardAssigned { seat, card }])
    }

    pub fn evaluate_war_round(&mut self) -> Result<Vec<TableEvent>, TableError> {
        let war = self.war.as_ref().filter(|war| war.active).ok_or(TableError::NoActiveWarRound)?;
        let missing = war.missing_seats();
        if !missing.is_empty() {
            return Err(TableError::IncompleteAssignment(missing));
        }
        Ok(self.settle_war_round())
    }

    /// Compares every war card with the dealer's and finishes the participants.
    /// Ties inside a war are final.
    fn settle_war_round(&mut self) -> Vec<TableEvent> {
        let Some(war) = self.war.as_mut() else {
            return Vec::new();
        };
        let Some(dealer_card) = war.dealer_card else {
            return Vec::new();
        };
        war.active = false;
        let settled: Vec<(PlayerId, Card)> = war
            .players
            .iter()
            .filter_map(|(id, card)| card.map(|card| (id.clone(), card)))
            .collect();

        let mut players = Vec::with_capacity(settled.len());
        for (id, card) in settled {
            let result = compare_cards(card, dealer_card);
            if let Some(player) = self.player_mut(&id) {
                player.war_card = Some(card);
            }
            self.finish_player(&id, result);
            players.push(id);
        }
        debug!(%dealer_card, players = players.len(), "war round evaluated");

        let mut events = vec![TableEvent::WarRoundEvaluated {
            dealer_card,
            players,
        }];
        events.extend(self.advance());
        events
    }

    pub(crate) fn war_players(&self) -> Vec<PlayerId> {
        self.players
            .iter()
            .filter(|player| player.status == PlayerStatus::War)
            .map(|player| player.id.clone())
            .collect()
    }

    pub(crate) fn route_war(&mut self, war_players: Vec<PlayerId>) -> Vec<TableEvent> {
        if self.settings.mode == GameMode::Automatic {
            self.run_automatic_war(war_players)
        } else {
            self.start_war(war_players)
        }
    }

    pub(crate) fn discard_war_cards(&mut self, war: WarRound) {
        for card in war.assigned_cards() {
            self.shoe.discard(card);
        }
    }
}

#[cfg(test)]
#[path = "tests/war_tests.rs"]
mod tests;
