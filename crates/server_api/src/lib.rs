use std::sync::Arc;

use shared::{
    domain::PlayerId,
    error::{ApiError, ErrorCode},
    protocol::{ClientRequest, ResultRecord, ServerEvent},
};
use table::{Seat, Table, TableError, TableEvent};
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

mod store;

pub use store::ResultStore;

/// Who receives an outbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    All,
    Dealers,
    Player(PlayerId),
    /// Only the connection that sent the request.
    Origin,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    pub audience: Audience,
    pub event: ServerEvent,
}

impl Dispatch {
    pub fn new(audience: Audience, event: ServerEvent) -> Self {
        Self { audience, event }
    }

    fn error(err: ApiError) -> Self {
        Self::new(Audience::Dealers, ServerEvent::Error(err))
    }
}

#[derive(Clone)]
pub struct ApiContext {
    table: Arc<Mutex<Table>>,
    store: Arc<dyn ResultStore>,
}

impl ApiContext {
    pub fn new(table: Table, store: Arc<dyn ResultStore>) -> Self {
        Self {
            table: Arc::new(Mutex::new(table)),
            store,
        }
    }

    pub fn store(&self) -> &Arc<dyn ResultStore> {
        &self.store
    }

    pub async fn game_state(&self) -> ServerEvent {
        let table = self.table.lock().await;
        ServerEvent::GameStateUpdate {
            game_state: table.snapshot(),
        }
    }

    /// Sends the current snapshot to the requesting connection before any later command can
    /// publish over it.
    pub async fn publish_game_state<F>(&self, publish: F)
    where
        F: FnOnce(Dispatch),
    {
        let table = self.table.lock().await;
        publish(Dispatch::new(
            Audience::Origin,
            ServerEvent::GameStateUpdate {
                game_state: table.snapshot(),
            },
        ));
    }

    /// Runs one inbound request to completion and returns what to send to whom.
    pub async fn handle_request(&self, request: ClientRequest) -> Vec<Dispatch> {
        let mut dispatches = Vec::new();
        self.dispatch_request(request, |dispatch| dispatches.push(dispatch))
            .await;
        dispatches
    }

    /// Runs one inbound request and hands each outbound event to `publish`.
    /// Table commands publish before the table lock is released, so events leave in the
    /// order the commands ran.
    pub async fn dispatch_request<F>(&self, request: ClientRequest, mut publish: F)
    where
        F: FnMut(Dispatch) + Send,
    {
        match request {
            ClientRequest::RegisterDealer => publish(Dispatch::new(
                Audience::Dealers,
                ServerEvent::DealerRegistered,
            )),
            ClientRequest::RegisterPlayer { player_id } => {
                publish(self.register_player(player_id).await)
            }
            ClientRequest::GetAllPlayerStats => match self.store.all_player_stats().await {
                Ok(stats) => publish(Dispatch::new(
                    Audience::Origin,
                    ServerEvent::AllPlayerStats { stats },
                )),
                Err(err) => publish(Dispatch::error(internal(err))),
            },
            ClientRequest::ClearAllStats => self.clear_all_stats(&mut publish).await,
            ClientRequest::DeleteLastResult => match self.store.delete_latest_result().await {
                Ok(deleted) => publish(Dispatch::new(
                    Audience::Dealers,
                    ServerEvent::LastResultDeleted { deleted },
                )),
                Err(err) => publish(Dispatch::error(internal(err))),
            },
            command => self.run_table_command(command, &mut publish).await,
        }
    }

    async fn register_player(&self, player_id: PlayerId) -> Dispatch {
        let stats = match self.store.player_stats(&player_id).await {
            Ok(stats) => stats,
            Err(err) => {
                warn!(player = %player_id, error = %err, "falling back to session stats");
                self.table.lock().await.player_stats(&player_id)
            }
        };
        Dispatch::new(
            Audience::Player(player_id.clone()),
            ServerEvent::PlayerRegistered { player_id, stats },
        )
    }

    async fn clear_all_stats<F>(&self, publish: &mut F)
    where
        F: FnMut(Dispatch) + Send,
    {
        let deleted_count = match self.store.delete_all_results().await {
            Ok(count) => count,
            Err(err) => return publish(Dispatch::error(internal(err))),
        };
        let mut table = self.table.lock().await;
        table.clear_session_stats();
        debug!(deleted_count, "all stats cleared");
        publish(Dispatch::new(
            Audience::All,
            ServerEvent::ClearAllStats { deleted_count },
        ));
    }

    async fn run_table_command<F>(&self, command: ClientRequest, publish: &mut F)
    where
        F: FnMut(Dispatch) + Send,
    {
        let mut completed = Vec::new();
        let mut table = self.table.lock().await;
        match apply(&mut table, command) {
            Ok(events) => {
                for event in events {
                    for dispatch in dispatches_for(&table, event, &mut completed) {
                        publish(dispatch);
                    }
                }
            }
            Err(err) => {
                debug!(error = %err, "command rejected");
                publish(Dispatch::error(ApiError::from(&err)));
            }
        }
        drop(table);
        if !completed.is_empty() {
            self.persist(completed);
        }
    }

    /// Writes finished results in the background. Failures are logged and never touch the table.
    fn persist(&self, records: Vec<ResultRecord>) {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            for record in records {
                if let Err(err) = store.insert_result(&record).await {
                    error!(
                        player = %record.player_id,
                        round = %record.round_number,
                        error = %err,
                        "failed to persist round result"
                    );
                }
            }
        });
    }
}

fn apply(table: &mut Table, command: ClientRequest) -> Result<Vec<TableEvent>, TableError> {
    match command {
        ClientRequest::ShuffleDeck => table.shuffle_deck(),
        ClientRequest::BurnCard => table.burn_card(),
        ClientRequest::AddPlayer { player_id } => table.add_player(player_id),
        ClientRequest::RemovePlayer { player_id } => table.remove_player(&player_id),
        ClientRequest::DealCards => table.deal_cards(),
        ClientRequest::ResetGame => table.reset_game(),
        ClientRequest::ChangeBets { min_bet, max_bet } => table.change_bets(min_bet, max_bet),
        ClientRequest::ChangeTable { table_number } => table.change_table(table_number),
        ClientRequest::UndoLastCard => table.undo_last_card(),
        ClientRequest::AddCardManual { card } => table.add_card_manual(card),
        ClientRequest::PlayerChoice { player_id, choice } => table.player_choice(&player_id, choice),
        ClientRequest::SetGameMode { mode } => table.set_game_mode(mode),
        ClientRequest::AssignWarCard {
            target,
            card,
            player_id,
        } => table.assign_war_card(Seat::from_target(target, player_id)?, card),
        ClientRequest::EvaluateWarRound => table.evaluate_war_round(),
        ClientRequest::ManualDealCard {
            target,
            card,
            player_id,
        } => table.manual_deal_card(Seat::from_target(target, player_id)?, card),
        ClientRequest::EvaluateRound => table.evaluate_round(),
        ClientRequest::StartAutoRound => table.start_auto_round(),
        ClientRequest::ClearRound => table.clear_round(),
        ClientRequest::RegisterDealer
        | ClientRequest::RegisterPlayer { .. }
        | ClientRequest::GetAllPlayerStats
        | ClientRequest::ClearAllStats
        | ClientRequest::DeleteLastResult => Ok(Vec::new()),
    }
}

/// Builds the outbound events for one table event from the state the command left behind.
fn dispatches_for(
    table: &Table,
    event: TableEvent,
    completed: &mut Vec<ResultRecord>,
) -> Vec<Dispatch> {
    let all = |event| vec![Dispatch::new(Audience::All, event)];
    match event {
        TableEvent::DeckShuffled { burned_card } => all(ServerEvent::DeckShuffled {
            deck_count: table.deck_count(),
            burned_card,
            burned_cards_count: table.burned_count(),
        }),
        TableEvent::CardBurned { card } => all(ServerEvent::CardBurned {
            burned_card: card,
            deck_count: table.deck_count(),
            burned_cards_count: table.burned_count(),
        }),
        TableEvent::CardRestored { card } => vec![Dispatch::new(
            Audience::Dealers,
            ServerEvent::CardAddedManually {
                card,
                deck_count: table.deck_count(),
            },
        )],
        TableEvent::PlayerAdded { player_id } => all(ServerEvent::PlayerAdded {
            player_id,
            players: table.player_views(),
        }),
        TableEvent::PlayerRemoved { player_id } => all(ServerEvent::PlayerRemoved {
            player_id,
            players: table.player_views(),
            player_results: table.last_results().clone(),
        }),
        TableEvent::RoundDealt {
            round_number,
            tie_players,
        } => {
            let mut dispatches = Vec::with_capacity(tie_players.len() + 1);
            dispatches.push(Dispatch::new(
                Audience::All,
                ServerEvent::RoundDealt {
                    round_number,
                    dealer_card: table.dealer_card(),
                    players: table.player_views(),
                    tie_players: tie_players.clone(),
                    deck_count: table.deck_count(),
                    player_results: table.last_results().clone(),
                },
            ));
            for player_id in tie_players {
                let card = table.player(&player_id).and_then(|player| player.card);
                if let (Some(card), Some(dealer_card)) = (card, table.dealer_card()) {
                    dispatches.push(Dispatch::new(
                        Audience::Player(player_id.clone()),
                        ServerEvent::ChoiceRequired {
                            player_id,
                            card,
                            dealer_card,
                        },
                    ));
                }
            }
            dispatches
        }
        TableEvent::CardAssigned { seat, card } => match seat {
            Seat::Dealer => all(ServerEvent::DealerCardSet {
                card,
                deck_count: table.deck_count(),
            }),
            Seat::Player(player_id) => all(ServerEvent::PlayerCardSet {
                player_id,
                card,
                deck_count: table.deck_count(),
            }),
        },
        TableEvent::ChoiceMade { player_id, choice } => all(ServerEvent::PlayerChoiceMade {
            player_id,
            choice,
            players: table.player_views(),
            player_results: table.last_results().clone(),
            deck_count: table.deck_count(),
        }),
        TableEvent::WarRoundStarted { players } => all(ServerEvent::WarRoundStarted {
            war_round: table
                .war_round()
                .map(|war| war.view())
                .unwrap_or_default(),
            players,
        }),
        TableEvent::WarDrawSkipped { needed, available } => {
            vec![Dispatch::error(ApiError::from(TableError::InsufficientCards {
                needed,
                available,
            }))]
        }
        TableEvent::WarCardAssigned { seat, card } => all(ServerEvent::WarCardAssigned {
            target: seat.target(),
            card,
            player_id: seat.player_id().cloned(),
        }),
        TableEvent::WarRoundEvaluated { dealer_card, .. } => all(ServerEvent::WarRoundEvaluated {
            dealer_card,
            players: table.player_views(),
            player_results: table.last_results().clone(),
            war_round: table
                .war_round()
                .map(|war| war.view())
                .unwrap_or_default(),
        }),
        TableEvent::RoundCompleted {
            round_number,
            records,
        } => {
            completed.extend(records);
            all(ServerEvent::RoundCompleted {
                round_number,
                player_results: table.last_results().clone(),
                stats: table.session_stats().snapshot(),
            })
        }
        TableEvent::CardUndone { assignment } => {
            let mut dispatches = all(ServerEvent::CardsUndone {
                deck_count: table.deck_count(),
                players: table.player_views(),
                dealer_card: table.dealer_card(),
                message: format!("returned {} from {}", assignment.card, assignment.seat),
            });
            dispatches.extend(all(ServerEvent::GameStateUpdate {
                game_state: table.snapshot(),
            }));
            dispatches
        }
        TableEvent::RoundCleared => all(ServerEvent::GameStateUpdate {
            game_state: table.snapshot(),
        }),
        TableEvent::GameReset => all(ServerEvent::GameReset {
            game_state: table.snapshot(),
        }),
        TableEvent::ModeChanged { mode } => all(ServerEvent::GameModeChanged { mode }),
        TableEvent::BetsChanged { min_bet, max_bet } => {
            all(ServerEvent::BetsChanged { min_bet, max_bet })
        }
        TableEvent::TableChanged { table_number } => {
            all(ServerEvent::TableChanged { table_number })
        }
    }
}

fn internal(err: anyhow::Error) -> ApiError {
    error!(error = %err, "result store request failed");
    ApiError::new(ErrorCode::Internal, err.to_string())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
