//! Errors raised while building field trees and handler maps.

use thiserror::Error;

use crate::lang::Rule;

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("GraphQL syntax error at {index}: {message}")]
    Syntax { message: String, index: usize },

    #[error("Handler language error: {0}")]
    Grammar(#[from] Box<pest::error::Error<Rule>>),

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Document contains {0} operations, an operation name is required")]
    AmbiguousOperation(usize),

    #[error("Unknown fragment: {0}")]
    UnknownFragment(String),

    #[error("Fragment spreads itself: {0}")]
    FragmentCycle(String),

    #[error("Field was not requested: {0}")]
    MissingField(String),

    #[error("Context has no accumulator for key: {0}")]
    UnknownAccumulator(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
