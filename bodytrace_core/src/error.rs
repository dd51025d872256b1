//! Error types for the trace core.

use thiserror::Error;

/// Errors raised while loading, building or setting up traces.
#[derive(Debug, Error)]
pub enum TraceError {
    /// A referenced body, object or file does not exist (or is unreadable)
    #[error("Not found: {0}")]
    NotFound(String),

    /// A line of a point file could not be parsed
    #[error("Parse error in {source_name} line {line}: {reason}")]
    Parse {
        source_name: String,
        line: usize,
        reason: String,
    },

    /// A point sequence with zero points was handed to the trace builder
    #[error("Empty input: no points to draw")]
    EmptyInput,

    /// Configuration values out of range
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

impl TraceError {
    /// Creates a not-found error.
    pub fn not_found(what: impl std::fmt::Display) -> Self {
        Self::NotFound(what.to_string())
    }

    /// Creates a parse error for a 1-based line number.
    pub fn parse(source_name: impl Into<String>, line: usize, reason: impl Into<String>) -> Self {
        Self::Parse {
            source_name: source_name.into(),
            line,
            reason: reason.into(),
        }
    }
}

pub type TraceResult<T> = Result<T, TraceError>;
