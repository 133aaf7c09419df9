use std::collections::VecDeque;

use rand::{seq::SliceRandom, Rng};
use shared::card::{Card, Rank, Suit};

use crate::error::TableError;

pub const DECKS_PER_SHOE: usize = 6;
pub const SHOE_SIZE: usize = DECKS_PER_SHOE * 52;

/// The multi-deck shoe plus its burned pile. Cards are drawn from the front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shoe {
    cards: VecDeque<Card>,
    burned: Vec<Card>,
}

impl Shoe {
    /// Six unshuffled decks, suit-major within each deck.
    pub fn ordered() -> Self {
        let mut cards = VecDeque::with_capacity(SHOE_SIZE);
        for _ in 0..DECKS_PER_SHOE {
            for rank in Rank::ALL {
                for suit in Suit::ALL {
                    cards.push_back(Card::new(rank, suit));
                }
            }
        }
        Self {
            cards,
            burned: Vec::new(),
        }
    }

    pub fn shuffled<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut cards: Vec<Card> = Self::ordered().cards.into();
        cards.shuffle(rng);
        Self {
            cards: cards.into(),
            burned: Vec::new(),
        }
    }

    /// A full shoe whose first cards are `front`, in order. The rest keep the ordered layout.
    pub fn stacked(front: &[Card]) -> Result<Self, TableError> {
        let mut shoe = Self::ordered();
        for card in front.iter().rev() {
            shoe.remove(*card)?;
            shoe.cards.push_front(*card);
        }
        Ok(shoe)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn burned(&self) -> &[Card] {
        &self.burned
    }

    pub fn cards(&self) -> impl Iterator<Item = &Card> + '_ {
        self.cards.iter()
    }

    pub fn available(&self, card: Card) -> bool {
        self.cards.contains(&card)
    }

    pub fn draw(&mut self) -> Result<Card, TableError> {
        self.cards.pop_front().ok_or(TableError::EmptyDeck)
    }

    pub fn burn(&mut self) -> Result<Card, TableError> {
        let card = self.draw()?;
        self.burned.push(card);
        Ok(card)
    }

    /// Removes the first copy of `card`, for out-of-order assignment.
    pub fn remove(&mut self, card: Card) -> Result<(), TableError> {
        let index = self
            .cards
            .iter()
            .position(|candidate| *candidate == card)
            .ok_or(TableError::CardUnavailable(card))?;
        self.cards.remove(index);
        Ok(())
    }

    /// Puts an unassigned card back on top. Only undo uses this.
    pub fn insert_front(&mut self, card: Card) {
        self.cards.push_front(card);
    }

    /// Sends a card that left the table to the burned pile.
    pub fn discard(&mut self, card: Card) {
        self.burned.push(card);
    }

    /// Moves the most recently burned copy of `card` back to the top of the shoe.
    pub fn restore_burned(&mut self, card: Card) -> Result<(), TableError> {
        let index = self
            .burned
            .iter()
            .rposition(|candidate| *candidate == card)
            .ok_or(TableError::CardUnavailable(card))?;
        self.burned.remove(index);
        self.cards.push_front(card);
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/deck_tests.rs"]
mod tests;
