//! Block engine errors

use nb_dom::DomError;

/// Errors surfaced by definitions, explicit lookups and handlers
#[derive(Debug, thiserror::Error)]
pub enum BlockError {
    #[error("Unknown block type: {0}")]
    UnknownType(String),

    #[error("Block type `{block}` has no method `{method}`")]
    UnknownMethod { block: String, method: String },

    #[error("Invalid block type name: {0:?}")]
    InvalidName(String),

    #[error(transparent)]
    Dom(#[from] DomError),

    /// A handler or method failed; the rest of the dispatch was abandoned
    #[error(transparent)]
    Handler(#[from] anyhow::Error),
}
