use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! number_newtype {
    ($name:ident, $inner:ty) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub $inner);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

number_newtype!(TableNumber, u32);
number_newtype!(RoundNumber, u64);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    #[default]
    Manual,
    Automatic,
    Live,
}

impl GameMode {
    pub fn as_str(self) -> &'static str {
        match self {
            GameMode::Manual => "manual",
            GameMode::Automatic => "automatic",
            GameMode::Live => "live",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "manual" => Some(GameMode::Manual),
            "automatic" | "auto" => Some(GameMode::Automatic),
            "live" => Some(GameMode::Live),
            _ => None,
        }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerStatus {
    #[default]
    Active,
    WaitingChoice,
    War,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundResult {
    Win,
    Lose,
    Tie,
    Surrender,
}

impl RoundResult {
    pub fn as_str(self) -> &'static str {
        match self {
            RoundResult::Win => "win",
            RoundResult::Lose => "lose",
            RoundResult::Tie => "tie",
            RoundResult::Surrender => "surrender",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "win" => Some(RoundResult::Win),
            "lose" => Some(RoundResult::Lose),
            "tie" => Some(RoundResult::Tie),
            "surrender" => Some(RoundResult::Surrender),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarChoice {
    War,
    Surrender,
}

/// Which seat an individually assigned card goes to, as named on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Dealer,
    Player,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PlayerStats {
    pub wins: u64,
    pub losses: u64,
    pub surrenders: u64,
}

impl PlayerStats {
    /// Counts a terminal result. Ties are never counted.
    pub fn record(&mut self, result: RoundResult) {
        match result {
            RoundResult::Win => self.wins += 1,
            RoundResult::Lose => self.losses += 1,
            RoundResult::Surrender => self.surrenders += 1,
            RoundResult::Tie => {}
        }
    }

    pub fn total(&self) -> u64 {
        self.wins + self.losses + self.surrenders
    }
}
