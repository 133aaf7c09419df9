//! Round and war state machine for a single casino war table.
//!
//! Everything here is synchronous and free of I/O: callers serialize access to a [`Table`]
//! and forward the returned [`TableEvent`]s to their notification and persistence sinks.

mod deck;
mod error;
mod event;
mod ledger;
mod mode;
mod stats;
mod table;
mod war;

pub use deck::{Shoe, DECKS_PER_SHOE, SHOE_SIZE};
pub use error::{ErrorKind, TableError};
pub use event::TableEvent;
pub use ledger::{Assignment, Ledger, Scope, Seat};
pub use mode::{ensure_permitted, Operation};
pub use stats::SessionStats;
pub use table::{compare_cards, CardCensus, Player, Table, TableSettings, MAX_PLAYERS};
pub use war::{OriginalCards, WarRound};
