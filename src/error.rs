//! Error types for Reverie.

use thiserror::Error;

/// Reverie error types.
///
/// Configuration errors (unknown names, shape mismatches, exhausted
/// generation budgets) are fatal: they indicate a wiring mistake rather than
/// a transient condition, and callers are expected to abort the run.
#[derive(Error, Debug)]
pub enum ReverieError {
    /// A layer name the engine does not know
    #[error("unknown layer: {0}")]
    UnknownLayer(String),

    /// A pathway name the engine does not know
    #[error("unknown pathway: {0}")]
    UnknownPathway(String),

    /// A slot name absent from the pattern layout
    #[error("unknown slot: {0}")]
    UnknownSlot(String),

    /// A pool entry name that was never generated
    #[error("unknown pool entry: {0}")]
    UnknownPoolEntry(String),

    /// An experiment id absent from the paradigm table
    #[error("unknown paradigm: {0}")]
    UnknownParadigm(String),

    /// Mismatched vector/layer dimensions
    #[error("shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: usize, got: usize },

    /// The permuted-binary generator could not satisfy the pairwise
    /// minimum-difference floor within its attempt budget
    #[error("vector generation exhausted for '{name}' after {attempts} attempts")]
    GenerationExhausted { name: String, attempts: usize },

    /// An epoch not covered by any curriculum binding
    #[error("no pattern set bound for epoch {0}")]
    CurriculumGap(usize),

    /// Empty input where non-empty was required
    #[error("empty input: {0}")]
    EmptyInput(String),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Reverie operations.
pub type Result<T> = std::result::Result<T, ReverieError>;
