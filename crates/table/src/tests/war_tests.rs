use shared::domain::{RoundResult, WarChoice};

use super::*;
use crate::{deck::Shoe, table::TableSettings, SHOE_SIZE};

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
fn interactive_war_opens_with_empty_slots_and_original_cards() {
    let mut table = table_in(GameMode::Manual, &["9H", "KH", "KS"], &["a", "b"]);
    table.deal_cards().expect("deal");

    let events = table
        .player_choice(&pid("b"), WarChoice::War)
        .expect("choice");
    assert_eq!(
        events.last(),
        Some(&TableEvent::WarRoundStarted {
            players: vec![pid("b")]
        })
    );

    let war = table.war_round().expect("war round");
    assert!(war.is_active());
    assert_eq!(war.dealer_card(), None);
    assert_eq!(war.players().get(&pid("b")), Some(&None));
    assert_eq!(war.original().dealer_card, Some(card("KS")));
    assert_eq!(war.original().players.get(&pid("b")), Some(&Some(card("KH"))));
    assert!(!war.original().players.contains_key(&pid("a")));
}

#[test]
fn war_cards_need_an_active_war_round() {
    let mut table = table_in(GameMode::Manual, &["9H", "KS"], &["a"]);
    table.deal_cards().expect("deal");
    assert_eq!(
        table.assign_war_card(Seat::Dealer, card("2C")),
        Err(TableError::NoActiveWarRound)
    );
    assert_eq!(table.evaluate_war_round(), Err(TableError::NoActiveWarRound));
}

#[test]
fn war_card_assignment_is_validated() {
    let mut table = table_in(GameMode::Manual, &["9H", "KH", "KS"], &["a", "b"]);
    table.deal_cards().expect("deal");
    table
        .player_choice(&pid("b"), WarChoice::War)
        .expect("choice");

    assert_eq!(
        table.assign_war_card(Seat::Player(pid("a")), card("2C")),
        Err(TableError::PlayerNotInWar(pid("a")))
    );
    table
        .assign_war_card(Seat::Player(pid("b")), card("QH"))
        .expect("first war card");
    assert_eq!(
        table.assign_war_card(Seat::Player(pid("b")), card("JH")),
        Err(TableError::SlotAlreadyAssigned(Seat::Player(pid("b"))))
    );

    while table.deck_count() > 0 {
        table.burn_card().expect("burn");
    }
    assert_eq!(
        table.assign_war_card(Seat::Dealer, card("4D")),
        Err(TableError::CardUnavailable(card("4D")))
    );
}

#[test]
fn evaluating_an_incomplete_war_round_changes_nothing() {
    let mut table = table_in(GameMode::Manual, &["KH", "KS"], &["a"]);
    table.deal_cards().expect("deal");
    table
        .player_choice(&pid("a"), WarChoice::War)
        .expect("choice");
    table
        .assign_war_card(Seat::Player(pid("a")), card("QH"))
        .expect("war card");

    let before = table.snapshot();
    assert_eq!(
        table.evaluate_war_round(),
        Err(TableError::IncompleteAssignment(vec![Seat::Dealer]))
    );
    assert_eq!(table.snapshot(), before);
}

#[test]
fn a_tie_inside_the_war_is_final() {
    let mut table = table_in(GameMode::Manual, &["KH", "KS"], &["a"]);
    table.deal_cards().expect("deal");
    table
        .player_choice(&pid("a"), WarChoice::War)
        .expect("choice");
    table
        .assign_war_card(Seat::Player(pid("a")), card("7H"))
        .expect("player war card");
    table
        .assign_war_card(Seat::Dealer, card("7C"))
        .expect("dealer war card");

    let events = table.evaluate_war_round().expect("evaluate");
    assert!(matches!(
        events.last(),
        Some(TableEvent::RoundCompleted { records, .. })
            if records.len() == 1 && records[0].result == RoundResult::Tie
    ));
    assert!(!table.round_active());
    assert!(table.session_stats().is_empty());

    let war = table.war_round().expect("snapshot kept");
    assert!(!war.is_active());
    assert_eq!(war.original().dealer_card, Some(card("KS")));
}

#[test]
fn automatic_war_draws_and_settles_at_once() {
    let mut table = table_in(
        GameMode::Automatic,
        &["2C", "KH", "KS", "QH", "4D"],
        &["a"],
    );
    table.start_auto_round().expect("auto round");
    let events = table
        .player_choice(&pid("a"), WarChoice::War)
        .expect("choice");

    assert!(events.contains(&TableEvent::WarRoundEvaluated {
        dealer_card: card("4D"),
        players: vec![pid("a")],
    }));
    let player = table.player(&pid("a")).expect("seated");
    assert_eq!(player.war_card, Some(card("QH")));
    assert_eq!(player.result, Some(RoundResult::Win));
    assert_eq!(table.ledger().len(), 4);
    assert!(!table.round_active());
    assert_eq!(table.census().total(), SHOE_SIZE);
}

#[test]
fn automatic_war_without_cards_waits_for_manual_assignment() {
    let mut table = table_in(GameMode::Automatic, &["2C", "KH", "KS"], &["a"]);
    table.start_auto_round().expect("auto round");
    while table.deck_count() > 1 {
        table.burn_card().expect("burn");
    }

    let events = table
        .player_choice(&pid("a"), WarChoice::War)
        .expect("choice");
    assert_eq!(
        events.last(),
        Some(&TableEvent::WarDrawSkipped {
            needed: 2,
            available: 1
        })
    );
    assert_eq!(table.deck_count(), 1);
    let war = table.war_round().expect("war round");
    assert!(war.is_active());
    assert_eq!(war.missing_seats().len(), 2);
    assert!(table.round_active());
}
