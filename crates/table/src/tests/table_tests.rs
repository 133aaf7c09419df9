use super::*;
use crate::SHOE_SIZE;

fn card(token: &str) -> Card {
    token.parse().expect("card token")
}

fn pid(id: &str) -> PlayerId {
    PlayerId::new(id)
}

fn table_in(mode: GameMode, front: &[&str], players: &[&str]) -> Table {
    let cards: Vec<Card> = front.iter().map(|token| card(token)).collect();
    let settings = TableSettings {
        mode,
        ..TableSettings::default()
    };
    let mut table = Table::with_shoe(settings, Shoe::stacked(&cards).expect("stacked shoe"));
    for id in players {
        table.add_player(pid(id)).expect("seat");
    }
    table
}

#[test]
fn compare_cards_ignores_suits() {
    assert_eq!(compare_cards(card("AS"), card("KH")), RoundResult::Win);
    assert_eq!(compare_cards(card("2D"), card("3D")), RoundResult::Lose);
    assert_eq!(compare_cards(card("TC"), card("TH")), RoundResult::Tie);
}

#[test]
fn new_table_starts_with_a_full_shoe_and_no_round() {
    let table = Table::with_seed(TableSettings::default(), 42);
    let state = table.snapshot();
    assert_eq!(state.deck_count, SHOE_SIZE);
    assert_eq!(state.burned_cards_count, 0);
    assert_eq!(state.round_number, RoundNumber(0));
    assert!(!state.round_active);
    assert!(state.players.is_empty());
    assert_eq!(state.game_mode, GameMode::Manual);
    assert_eq!((state.min_bet, state.max_bet), (10, 1000));
    assert!(state.war_round.is_none());
}

#[test]
fn seating_is_capped_and_unique() {
    let mut table = table_in(GameMode::Manual, &[], &["p1", "p2", "p3", "p4", "p5", "p6"]);
    assert_eq!(
        table.add_player(pid("p7")),
        Err(TableError::MaxPlayersReached { max: MAX_PLAYERS })
    );
    assert_eq!(table.players().len(), MAX_PLAYERS);

    table.remove_player(&pid("p3")).expect("remove");
    assert_eq!(
        table.add_player(pid("p1")),
        Err(TableError::PlayerAlreadySeated(pid("p1")))
    );
    table.add_player(pid("p7")).expect("free seat");
    let order: Vec<&str> = table.players().iter().map(|p| p.id.as_str()).collect();
    assert_eq!(order, vec!["p1", "p2", "p4", "p5", "p6", "p7"]);
}

#[test]
fn removing_an_unknown_player_is_rejected() {
    let mut table = table_in(GameMode::Manual, &[], &["a"]);
    assert_eq!(
        table.remove_player(&pid("zed")),
        Err(TableError::PlayerNotFound(pid("zed")))
    );
}

#[test]
fn deal_needs_players_and_cards() {
    let mut table = table_in(GameMode::Manual, &[], &[]);
    assert_eq!(table.deal_cards(), Err(TableError::NoPlayers));

    table.add_player(pid("a")).expect("seat");
    while table.deck_count() > 1 {
        table.burn_card().expect("burn");
    }
    let before = table.snapshot();
    assert_eq!(
        table.deal_cards(),
        Err(TableError::InsufficientCards {
            needed: 2,
            available: 1
        })
    );
    assert_eq!(table.snapshot(), before);
}

#[test]
fn deal_is_manual_only() {
    let mut table = table_in(GameMode::Live, &[], &["a"]);
    assert_eq!(
        table.deal_cards(),
        Err(TableError::ModeForbids {
            operation: Operation::DealCards,
            mode: GameMode::Live,
        })
    );
}

#[test]
fn tie_free_deal_completes_at_once() {
    let mut table = table_in(GameMode::Manual, &["AH", "5C", "KS"], &["a", "b"]);
    let events = table.deal_cards().expect("deal");

    assert_eq!(
        events.first(),
        Some(&TableEvent::RoundDealt {
            round_number: RoundNumber(1),
            tie_players: Vec::new(),
        })
    );
    let Some(TableEvent::RoundCompleted { records, .. }) = events.last() else {
        panic!("round should complete, got {events:?}");
    };
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].player_id, pid("a"));
    assert_eq!(records[0].result, RoundResult::Win);
    assert_eq!(records[0].dealer_card, card("KS"));
    assert_eq!(records[1].result, RoundResult::Lose);
    assert_eq!(records[1].table_number, TableNumber(1));

    assert!(!table.round_active());
    assert_eq!(table.player_stats(&pid("a")).wins, 1);
    assert_eq!(table.player_stats(&pid("b")).losses, 1);
}

#[test]
fn a_second_deal_waits_for_the_round_to_finish() {
    let mut table = table_in(GameMode::Manual, &["KH", "KS"], &["a"]);
    table.deal_cards().expect("deal");
    assert_eq!(table.deal_cards(), Err(TableError::RoundAlreadyActive));
    assert_eq!(table.shuffle_deck(), Err(TableError::RoundAlreadyActive));
    assert_eq!(
        table.set_game_mode(GameMode::Live),
        Err(TableError::RoundAlreadyActive)
    );
    assert_eq!(
        table.add_player(pid("late")),
        Err(TableError::RoundAlreadyActive)
    );
}

#[test]
fn next_deal_discards_the_previous_cards() {
    let mut table = table_in(GameMode::Manual, &["AH", "KS"], &["a"]);
    table.deal_cards().expect("first deal");
    table.deal_cards().expect("second deal");

    assert_eq!(table.round_number(), RoundNumber(2));
    assert_eq!(table.burned_count(), 2);
    assert_eq!(table.ledger().len(), 2);
    assert_eq!(table.census().total(), SHOE_SIZE);
}

#[test]
fn surrender_finishes_the_round() {
    let mut table = table_in(GameMode::Manual, &["KH", "KS"], &["a"]);
    table.deal_cards().expect("deal");
    assert_eq!(
        table.player_choice(&pid("zed"), WarChoice::Surrender),
        Err(TableError::PlayerNotFound(pid("zed")))
    );

    let events = table
        .player_choice(&pid("a"), WarChoice::Surrender)
        .expect("surrender");
    assert!(matches!(events.last(), Some(TableEvent::RoundCompleted { .. })));
    assert_eq!(table.player_stats(&pid("a")).surrenders, 1);
    assert_eq!(
        table.player_choice(&pid("a"), WarChoice::War),
        Err(TableError::NotAwaitingChoice(pid("a")))
    );
}

#[test]
fn round_waits_until_every_tied_player_has_chosen() {
    let mut table = table_in(GameMode::Manual, &["KH", "KD", "KS"], &["a", "b"]);
    let events = table.deal_cards().expect("deal");
    assert_eq!(
        events,
        vec![TableEvent::RoundDealt {
            round_number: RoundNumber(1),
            tie_players: vec![pid("a"), pid("b")],
        }]
    );

    let events = table
        .player_choice(&pid("a"), WarChoice::War)
        .expect("war");
    assert_eq!(events.len(), 1);
    assert!(table.war_round().is_none());

    table
        .player_choice(&pid("b"), WarChoice::Surrender)
        .expect("surrender");
    let war = table.war_round().expect("war round");
    assert_eq!(war.players().keys().collect::<Vec<_>>(), vec![&pid("a")]);
    assert!(table.round_active());
}

#[test]
fn auto_round_burns_first_and_requires_a_clear_table() {
    let mut table = table_in(GameMode::Automatic, &["2C", "AH", "KS"], &["a"]);
    let events = table.start_auto_round().expect("auto round");
    assert_eq!(events[0], TableEvent::CardBurned { card: card("2C") });
    assert_eq!(table.player(&pid("a")).and_then(|p| p.card), Some(card("AH")));
    assert!(!table.round_active());

    assert_eq!(table.start_auto_round(), Err(TableError::TableNotClear));
    table.clear_round().expect("clear");
    assert_eq!(table.dealer_card(), None);
    assert!(table.last_results().is_empty());
    table.start_auto_round().expect("second auto round");
    assert_eq!(table.round_number(), RoundNumber(2));
    assert_eq!(table.census().total(), SHOE_SIZE);
}

#[test]
fn clear_round_is_refused_in_manual_mode() {
    let mut table = table_in(GameMode::Manual, &[], &["a"]);
    assert!(matches!(
        table.clear_round(),
        Err(TableError::ModeForbids { .. })
    ));
}

#[test]
fn live_mode_assigns_cards_to_seats() {
    let mut table = table_in(GameMode::Live, &[], &["a", "b"]);
    table
        .manual_deal_card(Seat::Player(pid("a")), card("9H"))
        .expect("a");
    assert_eq!(
        table.manual_deal_card(Seat::Player(pid("a")), card("8H")),
        Err(TableError::SeatAlreadyAssigned(Seat::Player(pid("a"))))
    );
    assert_eq!(
        table.manual_deal_card(Seat::Player(pid("zed")), card("8H")),
        Err(TableError::PlayerNotFound(pid("zed")))
    );
    assert_eq!(
        table.evaluate_round(),
        Err(TableError::IncompleteAssignment(vec![
            Seat::Dealer,
            Seat::Player(pid("b"))
        ]))
    );

    table.manual_deal_card(Seat::Dealer, card("5S")).expect("dealer");
    table
        .manual_deal_card(Seat::Player(pid("b")), card("2H"))
        .expect("b");
    assert!(!table.round_active());
    assert_eq!(table.deck_count(), SHOE_SIZE - 3);

    let events = table.evaluate_round().expect("evaluate");
    assert_eq!(table.round_number(), RoundNumber(1));
    assert!(matches!(events.last(), Some(TableEvent::RoundCompleted { .. })));
    assert_eq!(table.evaluate_round(), Err(TableError::NothingToEvaluate));
}

#[test]
fn live_mode_starts_over_after_a_settled_round() {
    let mut table = table_in(GameMode::Live, &[], &["a"]);
    table.manual_deal_card(Seat::Dealer, card("5S")).expect("dealer");
    table
        .manual_deal_card(Seat::Player(pid("a")), card("9H"))
        .expect("a");
    table.evaluate_round().expect("evaluate");

    table.manual_deal_card(Seat::Dealer, card("6S")).expect("next round");
    assert_eq!(table.dealer_card(), Some(card("6S")));
    assert_eq!(table.player(&pid("a")).and_then(|p| p.card), None);
    assert_eq!(table.burned_count(), 2);
    assert!(table.last_results().is_empty());
}

#[test]
fn shuffle_replaces_the_shoe_and_burns_one() {
    let mut table = Table::with_seed(TableSettings::default(), 1);
    table.burn_card().expect("burn");
    let events = table.shuffle_deck().expect("shuffle");
    let [TableEvent::DeckShuffled {
        burned_card: Some(_),
    }] = events.as_slice()
    else {
        panic!("unexpected events {events:?}");
    };
    assert_eq!(table.deck_count(), SHOE_SIZE - 1);
    assert_eq!(table.burned_count(), 1);
}

#[test]
fn add_card_manual_returns_a_burned_card() {
    let mut table = table_in(GameMode::Manual, &["JD"], &[]);
    assert_eq!(
        table.add_card_manual(card("JD")),
        Err(TableError::CardUnavailable(card("JD")))
    );
    table.burn_card().expect("burn");
    table.add_card_manual(card("JD")).expect("restore");
    assert_eq!(table.shoe().cards().next(), Some(&card("JD")));
    assert_eq!(table.burned_count(), 0);
}

#[test]
fn reset_clears_roster_rounds_and_stats() {
    let mut table = table_in(GameMode::Manual, &["AH", "KS"], &["a"]);
    table.change_bets(25, 500).expect("bets");
    table.deal_cards().expect("deal");
    assert!(!table.session_stats().is_empty());

    table.reset_game().expect("reset");
    let state = table.snapshot();
    assert!(state.players.is_empty());
    assert_eq!(state.round_number, RoundNumber(0));
    assert!(state.stats.is_empty());
    assert_eq!(state.deck_count, SHOE_SIZE);
    assert_eq!(state.burned_cards_count, 0);
    assert_eq!((state.min_bet, state.max_bet), (25, 500));
}

#[test]
fn bet_limits_are_validated() {
    let mut table = Table::with_seed(TableSettings::default(), 3);
    assert_eq!(
        table.change_bets(0, 10),
        Err(TableError::InvalidBetLimits {
            min_bet: 0,
            max_bet: 10
        })
    );
    assert_eq!(
        table.change_bets(50, 10),
        Err(TableError::InvalidBetLimits {
            min_bet: 50,
            max_bet: 10
        })
    );
    table.change_bets(5, 5).expect("equal limits");
    table.change_table(TableNumber(9)).expect("table");
    assert_eq!(table.settings().table_number, TableNumber(9));
}
