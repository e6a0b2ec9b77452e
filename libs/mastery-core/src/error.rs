//! Error types for mastery-core.

use thiserror::Error;

/// Result type alias using EngineError.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors raised by the engine.
///
/// Pure ranking and derivation functions degrade to empty results instead of
/// failing; only structural violations end up here.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no eligible advice for biome {biome_id}")]
    NoEligibleAdvice { biome_id: String },

    #[error("invalid catalog document: {0}")]
    Catalog(#[from] serde_json::Error),
}
