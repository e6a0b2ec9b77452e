//! Services layered over the database and the mastery engine.

pub mod ledger;
pub mod progress;
