use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid short code {code:?}: {reason}")]
    InvalidShortCode { code: String, reason: String },

    #[error("unknown content kind: {0}")]
    UnknownKind(String),

    #[error("invalid identifier: {0}")]
    InvalidId(String),
}
