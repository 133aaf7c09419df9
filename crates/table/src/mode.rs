use std::fmt;

use shared::domain::GameMode;

use crate::error::TableError;

/// Entry points whose legality depends on the table's mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    DealCards,
    StartAutoRound,
    ManualDealCard,
    EvaluateRound,
    ClearRound,
}

impl Operation {
    pub fn name(self) -> &'static str {
        match self {
            Operation::DealCards => "deal cards",
            Operation::StartAutoRound => "start an automatic round",
            Operation::ManualDealCard => "assign cards individually",
            Operation::EvaluateRound => "evaluate the round",
            Operation::ClearRound => "clear the round",
        }
    }

    pub fn permitted_in(self, mode: GameMode) -> bool {
        match self {
            Operation::DealCards => mode == GameMode::Manual,
            Operation::StartAutoRound => mode == GameMode::Automatic,
            Operation::ManualDealCard => mode == GameMode::Live,
            Operation::EvaluateRound => matches!(mode, GameMode::Manual | GameMode::Live),
            Operation::ClearRound => matches!(mode, GameMode::Automatic | GameMode::Live),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub fn ensure_permitted(mode: GameMode, operation: Operation) -> Result<(), TableError> {
    if operation.permitted_in(mode) {
        Ok(())
    } else {
        Err(TableError::ModeForbids { operation, mode })
    }
}
