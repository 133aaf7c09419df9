use std::{cmp::Ordering, collections::BTreeMap};

use chrono::Utc;
use rand::{rngs::StdRng, SeedableRng};
use shared::{
    card::Card,
    domain::{
        GameMode, PlayerId, PlayerStats, PlayerStatus, RoundNumber, RoundResult, TableNumber,
        WarChoice,
    },
    protocol::{GameStateView, PlayerView, ResultRecord},
};
use tracing::debug;

use crate::{
    deck::Shoe,
    error::TableError,
    event::TableEvent,
    ledger::{Assignment, Ledger, Seat},
    mode::{ensure_permitted, Operation},
    stats::SessionStats,
    war::WarRound,
};

pub const MAX_PLAYERS: usize = 6;

/// Rank-only comparison. Suits never break ties.
pub fn compare_cards(player: Card, dealer: Card) -> RoundResult {
    match player.value().cmp(&dealer.value()) {
        Ordering::Greater => RoundResult::Win,
        Ordering::Less => RoundResult::Lose,
        Ordering::Equal => RoundResult::Tie,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSettings {
    pub table_number: TableNumber,
    pub min_bet: u64,
    pub max_bet: u64,
    pub mode: GameMode,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            table_number: TableNumber(1),
            min_bet: 10,
            max_bet: 1000,
            mode: GameMode::Manual,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub card: Option<Card>,
    pub status: PlayerStatus,
    pub result: Option<RoundResult>,
    pub war_card: Option<Card>,
}

impl Player {
    fn seated(id: PlayerId) -> Self {
        Self {
            id,
            card: None,
            status: PlayerStatus::Active,
            result: None,
            war_card: None,
        }
    }

    pub(crate) fn reset(&mut self) {
        self.card = None;
        self.status = PlayerStatus::Active;
        self.result = None;
        self.war_card = None;
    }

    pub fn view(&self) -> PlayerView {
        PlayerView {
            player_id: self.id.clone(),
            card: self.card,
            status: self.status,
            result: self.result,
            war_card: self.war_card,
        }
    }
}

/// Where every card of the shoe currently sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardCensus {
    pub deck: usize,
    pub burned: usize,
    pub main: usize,
    pub war: usize,
}

impl CardCensus {
    pub fn total(&self) -> usize {
        self.deck + self.burned + self.main + self.war
    }
}

/// One casino war table. Every command validates fully before it mutates anything.
#[derive(Debug)]
pub struct Table {
    pub(crate) settings: TableSettings,
    pub(crate) shoe: Shoe,
    pub(crate) players: Vec<Player>,
    pub(crate) dealer_card: Option<Card>,
    pub(crate) round_number: RoundNumber,
    pub(crate) round_active: bool,
    pub(crate) war: Option<WarRound>,
    pub(crate) ledger: Ledger,
    pub(crate) stats: SessionStats,
    pub(crate) last_results: BTreeMap<PlayerId, RoundResult>,
    rng: StdRng,
}

impl Table {
    pub fn new(settings: TableSettings) -> Self {
        Self::with_rng(settings, StdRng::from_entropy())
    }

    /// Deterministic shuffles, for replays and tests.
    pub fn with_seed(settings: TableSettings, seed: u64) -> Self {
        Self::with_rng(settings, StdRng::seed_from_u64(seed))
    }

    /// Starts from a prepared shoe instead of a shuffled one.
    pub fn with_shoe(settings: TableSettings, shoe: Shoe) -> Self {
        let mut table = Self::with_seed(settings, 0);
        table.shoe = shoe;
        table
    }

    fn with_rng(settings: TableSettings, mut rng: StdRng) -> Self {
        let shoe = Shoe::shuffled(&mut rng);
        Self {
            settings,
            shoe,
            players: Vec::new(),
            dealer_card: None,
            round_number: RoundNumber(0),
            round_active: false,
            war: None,
            ledger: Ledger::default(),
            stats: SessionStats::default(),
            last_results: BTreeMap::new(),
            rng,
        }
    }

    pub fn settings(&self) -> &TableSettings {
        &self.settings
    }

    pub fn mode(&self) -> GameMode {
        self.settings.mode
    }

    pub fn shoe(&self) -> &Shoe {
        &self.shoe
    }

    pub fn deck_count(&self) -> usize {
        self.shoe.len()
    }

    pub fn burned_count(&self) -> usize {
        self.shoe.burned().len()
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, player_id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|player| &player.id == player_id)
    }

    pub(crate) fn player_mut(&mut self, player_id: &PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|player| &player.id == player_id)
    }

    pub fn dealer_card(&self) -> Option<Card> {
        self.dealer_card
    }

    pub fn round_number(&self) -> RoundNumber {
        self.round_number
    }

    pub fn round_active(&self) -> bool {
        self.round_active
    }

    pub fn war_round(&self) -> Option<&WarRound> {
        self.war.as_ref()
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn last_results(&self) -> &BTreeMap<PlayerId, RoundResult> {
        &self.last_results
    }

    pub fn session_stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn player_stats(&self, player_id: &PlayerId) -> PlayerStats {
        self.stats.get(player_id)
    }

    pub fn player_views(&self) -> Vec<PlayerView> {
        self.players.iter().map(Player::view).collect()
    }

    pub fn snapshot(&self) -> GameStateView {
        GameStateView {
            deck_count: self.deck_count(),
            burned_cards_count: self.burned_count(),
            dealer_card: self.dealer_card,
            players: self.player_views(),
            round_active: self.round_active,
            round_number: self.round_number,
            game_mode: self.settings.mode,
            table_number: self.settings.table_number,
            min_bet: self.settings.min_bet,
            max_bet: self.settings.max_bet,
            player_results: self.last_results.clone(),
            war_round_active: self.war.as_ref().is_some_and(WarRound::is_active),
            war_round: self.war.as_ref().map(WarRound::view),
            stats: self.stats.snapshot(),
        }
    }

    pub fn census(&self) -> CardCensus {
        CardCensus {
            deck: self.deck_count(),
            burned: self.burned_count(),
            main: self.main_cards().count(),
            war: self
                .war
                .as_ref()
                .map_or(0, |war| war.assigned_cards().count()),
        }
    }

    /// How often each card token occurs across the shoe, the burned pile and the table.
    pub fn token_counts(&self) -> BTreeMap<Card, usize> {
        let mut counts = BTreeMap::new();
        let war_cards = self.war.iter().flat_map(WarRound::assigned_cards);
        let everywhere = self
            .shoe
            .cards()
            .copied()
            .chain(self.shoe.burned().iter().copied())
            .chain(self.main_cards())
            .chain(war_cards);
        for card in everywhere {
            *counts.entry(card).or_insert(0) += 1;
        }
        counts
    }

    fn main_cards(&self) -> impl Iterator<Item = Card> + '_ {
        self.dealer_card
            .into_iter()
            .chain(self.players.iter().filter_map(|player| player.card))
    }

    fn ensure_idle(&self) -> Result<(), TableError> {
        if self.round_active {
            return Err(TableError::RoundAlreadyActive);
        }
        Ok(())
    }

    fn ensure_seated(&self, player_id: &PlayerId) -> Result<&Player, TableError> {
        self.player(player_id)
            .ok_or_else(|| TableError::PlayerNotFound(player_id.clone()))
    }

    /// Replaces the shoe with a freshly shuffled one and burns its first card.
    pub fn shuffle_deck(&mut self) -> Result<Vec<TableEvent>, TableError> {
        self.ensure_idle()?;
        self.shoe = Shoe::shuffled(&mut self.rng);
        self.forget_table();
        let burned_card = self.shoe.burn().ok();
        debug!(deck = self.deck_count(), "shoe shuffled");
        Ok(vec![TableEvent::DeckShuffled { burned_card }])
    }

    pub fn burn_card(&mut self) -> Result<Vec<TableEvent>, TableError> {
        let card = self.shoe.burn()?;
        debug!(%card, deck = self.deck_count(), "card burned");
        Ok(vec![TableEvent::CardBurned { card }])
    }

    /// Returns a burned card to the top of the shoe.
    pub fn add_card_manual(&mut self, card: Card) -> Result<Vec<TableEvent>, TableError> {
        self.shoe.restore_burned(card)?;
        debug!(%card, "burned card restored");
        Ok(vec![TableEvent::CardRestored { card }])
    }

    pub fn add_player(&mut self, player_id: PlayerId) -> Result<Vec<TableEvent>, TableError> {
        self.ensure_idle()?;
        if self.player(&player_id).is_some() {
            return Err(TableError::PlayerAlreadySeated(player_id));
        }
        if self.players.len() >= MAX_PLAYERS {
            return Err(TableError::MaxPlayersReached { max: MAX_PLAYERS });
        }
        self.players.push(Player::seated(player_id.clone()));
        debug!(player = %player_id, seated = self.players.len(), "player added");
        Ok(vec![TableEvent::PlayerAdded { player_id }])
    }

    pub fn remove_player(&mut self, player_id: &PlayerId) -> Result<Vec<TableEvent>, TableError> {
        self.ensure_idle()?;
        if self.war.as_ref().is_some_and(WarRound::is_active) {
            return Err(TableError::RoundAlreadyActive);
        }
        let index = self
            .players
            .iter()
            .position(|player| &player.id == player_id)
            .ok_or_else(|| TableError::PlayerNotFound(player_id.clone()))?;

        let player = self.players.remove(index);
        if let Some(card) = player.card {
            self.shoe.discard(card);
        }
        if let Some(card) = self.war.as_mut().and_then(|war| war.remove_player(player_id)) {
            self.shoe.discard(card);
        }
        self.ledger.forget_player(player_id);
        self.last_results.remove(player_id);
        debug!(player = %player_id, "player removed");
        Ok(vec![TableEvent::PlayerRemoved {
            player_id: player_id.clone(),
        }])
    }

    pub fn deal_cards(&mut self) -> Result<Vec<TableEvent>, TableError> {
        ensure_permitted(self.settings.mode, Operation::DealCards)?;
        self.ensure_idle()?;
        self.deal_round(false)
    }

    /// Burns one card, then deals. Only from an empty table.
    pub fn start_auto_round(&mut self) -> Result<Vec<TableEvent>, TableError> {
        ensure_permitted(self.settings.mode, Operation::StartAutoRound)?;
        self.ensure_idle()?;
        if self.players.is_empty() {
            return Err(TableError::NoPlayers);
        }
        if self.main_cards().next().is_some() {
            return Err(TableError::TableNotClear);
        }
        self.deal_round(true)
    }

    fn deal_round(&mut self, burn_first: bool) -> Result<Vec<TableEvent>, TableError> {
        if self.players.is_empty() {
            return Err(TableError::NoPlayers);
        }
        let needed = self.players.len() + 1 + usize::from(burn_first);
        let available = self.deck_count();
        if available < needed {
            return Err(TableError::InsufficientCards { needed, available });
        }

        let mut events = Vec::new();
        self.clear_table();
        if burn_first {
            let card = self.shoe.burn()?;
            events.push(TableEvent::CardBurned { card });
        }

        self.round_number.0 += 1;
        self.round_active = true;
        for index in 0..self.players.len() {
            let card = self.shoe.draw()?;
            let player = &mut self.players[index];
            player.card = Some(card);
            self.ledger
                .push(Assignment::main(Seat::Player(player.id.clone()), card));
        }
        let dealer_card = self.shoe.draw()?;
        self.dealer_card = Some(dealer_card);
        self.ledger.push(Assignment::main(Seat::Dealer, dealer_card));
        debug!(round = %self.round_number, %dealer_card, "round dealt");

        events.extend(self.evaluate());
        Ok(events)
    }

    /// Assigns one main card to a chosen seat. Used when cards come from a physical shoe.
    pub fn manual_deal_card(&mut self, seat: Seat, card: Card) -> Result<Vec<TableEvent>, TableError> {
        ensure_permitted(self.settings.mode, Operation::ManualDealCard)?;
        let stale = self.holds_settled_round();
        let occupied = match &seat {
            Seat::Dealer => self.dealer_card.is_some(),
            Seat::Player(id) => self.ensure_seated(id)?.card.is_some(),
        };
        if occupied && !stale {
            return Err(TableError::SeatAlreadyAssigned(seat));
        }
        if !self.shoe.available(card) {
            return Err(TableError::CardUnavailable(card));
        }

        if stale {
            self.clear_table();
        }
        self.shoe.remove(card)?;
        match &seat {
            Seat::Dealer => self.dealer_card = Some(card),
            Seat::Player(id) => {
                if let Some(player) = self.player_mut(id) {
                    player.card = Some(card);
                    player.status = PlayerStatus::Active;
                    player.result = None;
                }
            }
        }
        self.ledger.push(Assignment::main(seat.clone(), card));
        debug!(%card, %seat, "card assigned");
        Ok(vec![TableEvent::CardAssigned { seat, card }])
    }

    /// Confirms that every seat holds a card and evaluates the seats still in play.
    pub fn evaluate_round(&mut self) -> Result<Vec<TableEvent>, TableError> {
        ensure_permitted(self.settings.mode, Operation::EvaluateRound)?;
        if self.players.is_empty() {
            return Err(TableError::NoPlayers);
        }
        let mut missing = Vec::new();
        if self.dealer_card.is_none() {
            missing.push(Seat::Dealer);
        }
        missing.extend(
            self.players
                .iter()
                .filter(|player| player.card.is_none())
                .map(|player| Seat::Player(player.id.clone())),
        );
        if !missing.is_empty() {
            return Err(TableError::IncompleteAssignment(missing));
        }
        if !self
            .players
            .iter()
            .any(|player| player.status == PlayerStatus::Active)
        {
            return Err(TableError::NothingToEvaluate);
        }

        if !self.round_active {
            self.round_number.0 += 1;
            self.round_active = true;
        }
        Ok(self.evaluate())
    }

    fn evaluate(&mut self) -> Vec<TableEvent> {
        let Some(dealer_card) = self.dealer_card else {
            return Vec::new();
        };
        let mut settled = Vec::new();
        let mut tie_players = Vec::new();
        for player in &mut self.players {
            let Some(card) = player.card.filter(|_| player.status == PlayerStatus::Active) else {
                continue;
            };
            match compare_cards(card, dealer_card) {
                RoundResult::Tie => {
                    player.status = PlayerStatus::WaitingChoice;
                    tie_players.push(player.id.clone());
                }
                result => settled.push((player.id.clone(), result)),
            }
        }
        for (id, result) in settled {
            self.finish_player(&id, result);
        }
        debug!(round = %self.round_number, ties = tie_players.len(), "round evaluated");

        let mut events = vec![TableEvent::RoundDealt {
            round_number: self.round_number,
            tie_players,
        }];
        events.extend(self.advance());
        events
    }

    pub fn player_choice(
        &mut self,
        player_id: &PlayerId,
        choice: WarChoice,
    ) -> Result<Vec<TableEvent>, TableError> {
        if self.ensure_seated(player_id)?.status != PlayerStatus::WaitingChoice {
            return Err(TableError::NotAwaitingChoice(player_id.clone()));
        }
        match choice {
            WarChoice::Surrender => self.finish_player(player_id, RoundResult::Surrender),
            WarChoice::War => {
                if let Some(player) = self.player_mut(player_id) {
                    player.status = PlayerStatus::War;
                }
            }
        }
        debug!(player = %player_id, ?choice, "choice made");

        let mut events = vec![TableEvent::ChoiceMade {
            player_id: player_id.clone(),
            choice,
        }];
        events.extend(self.advance());
        Ok(events)
    }

    pub(crate) fn finish_player(&mut self, player_id: &PlayerId, result: RoundResult) {
        if let Some(player) = self.player_mut(player_id) {
            player.status = PlayerStatus::Finished;
            player.result = Some(result);
        }
        self.last_results.insert(player_id.clone(), result);
    }

    /// Moves the round forward once nobody is left to decide.
    pub(crate) fn advance(&mut self) -> Vec<TableEvent> {
        if !self.round_active {
            return Vec::new();
        }
        if self
            .players
            .iter()
            .any(|player| player.status == PlayerStatus::WaitingChoice)
        {
            return Vec::new();
        }
        if self.war.as_ref().is_some_and(WarRound::is_active) {
            return Vec::new();
        }
        let war_players = self.war_players();
        if !war_players.is_empty() {
            return self.route_war(war_players);
        }
        if self
            .players
            .iter()
            .all(|player| player.status == PlayerStatus::Finished)
        {
            return self.complete();
        }
        Vec::new()
    }

    fn complete(&mut self) -> Vec<TableEvent> {
        let Some(dealer_card) = self.dealer_card else {
            return Vec::new();
        };
        let timestamp = Utc::now();
        let mut records = Vec::new();
        for player in &self.players {
            let (Some(result), Some(player_card)) = (player.result, player.card) else {
                continue;
            };
            records.push(ResultRecord {
                round_number: self.round_number,
                player_id: player.id.clone(),
                player_card,
                war_card: player.war_card,
                dealer_card,
                result,
                timestamp,
                table_number: self.settings.table_number,
                min_bet: self.settings.min_bet,
                max_bet: self.settings.max_bet,
                game_mode: self.settings.mode,
            });
        }
        for record in &records {
            self.stats.record(&record.player_id, record.result);
        }
        self.round_active = false;
        debug!(round = %self.round_number, results = records.len(), "round completed");
        vec![TableEvent::RoundCompleted {
            round_number: self.round_number,
            records,
        }]
    }

    /// Drops every card from the table, abandoning the round if one is in progress.
    pub fn clear_round(&mut self) -> Result<Vec<TableEvent>, TableError> {
        ensure_permitted(self.settings.mode, Operation::ClearRound)?;
        self.clear_table();
        self.round_active = false;
        debug!(round = %self.round_number, "round cleared");
        Ok(vec![TableEvent::RoundCleared])
    }

    /// Full reset: fresh shoe, empty roster, round counter and session stats back to zero.
    pub fn reset_game(&mut self) -> Result<Vec<TableEvent>, TableError> {
        self.shoe = Shoe::shuffled(&mut self.rng);
        self.players.clear();
        self.forget_table();
        self.round_number = RoundNumber(0);
        self.round_active = false;
        self.stats.clear();
        debug!("game reset");
        Ok(vec![TableEvent::GameReset])
    }

    pub fn set_game_mode(&mut self, mode: GameMode) -> Result<Vec<TableEvent>, TableError> {
        self.ensure_idle()?;
        self.settings.mode = mode;
        debug!(%mode, "game mode changed");
        Ok(vec![TableEvent::ModeChanged { mode }])
    }

    pub fn change_bets(&mut self, min_bet: u64, max_bet: u64) -> Result<Vec<TableEvent>, TableError> {
        if min_bet == 0 || min_bet > max_bet {
            return Err(TableError::InvalidBetLimits { min_bet, max_bet });
        }
        self.settings.min_bet = min_bet;
        self.settings.max_bet = max_bet;
        Ok(vec![TableEvent::BetsChanged { min_bet, max_bet }])
    }

    pub fn change_table(&mut self, table_number: TableNumber) -> Result<Vec<TableEvent>, TableError> {
        self.settings.table_number = table_number;
        Ok(vec![TableEvent::TableChanged { table_number }])
    }

    pub fn clear_session_stats(&mut self) {
        self.stats.clear();
    }

    /// A finished round whose cards are still on display.
    fn holds_settled_round(&self) -> bool {
        !self.round_active
            && (self.war.is_some() || self.players.iter().any(|player| player.result.is_some()))
    }

    /// Sends every card on the table to the burned pile and resets the seats.
    fn clear_table(&mut self) {
        if let Some(card) = self.dealer_card.take() {
            self.shoe.discard(card);
        }
        for card in self.players.iter().filter_map(|player| player.card) {
            self.shoe.discard(card);
        }
        if let Some(war) = self.war.take() {
            self.discard_war_cards(war);
        }
        self.forget_table();
    }

    /// Resets seats and round bookkeeping without touching the shoe.
    fn forget_table(&mut self) {
        self.dealer_card = None;
        for player in &mut self.players {
            player.reset();
        }
        self.war = None;
        self.ledger.clear();
        self.last_results.clear();
    }
}

#[cfg(test)]
#[path = "tests/table_tests.rs"]
mod tests;
