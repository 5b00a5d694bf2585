//! Единый тип ошибок публичного API.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("regex error: {0}")]
    Pattern(#[from] regex::Error),

    #[error("header not found, expected columns: {expected:?}")]
    HeaderNotFound { expected: Vec<String> },

    #[error("sentinel row not found: {0:?}")]
    SentinelNotFound(String),

    #[error("malformed amount: {0:?}")]
    MalformedAmount(String),

    #[error("malformed date: {0:?}")]
    MalformedDate(String),

    #[error("no account matching {0:?} in statement")]
    AccountNotMatched(String),

    #[error("missing required column: {0}")]
    MissingField(&'static str),

    #[error("OFX error: {0}")]
    Ofx(String),
}

pub type Result<T> = std::result::Result<T, ImportError>;
