pub mod card;
pub mod domain;
pub mod error;
pub mod protocol;
