//! Error types for Gigstore
//!
//! Statements that merely fail to match anything are not errors: reads come
//! back empty and mutations report zero changes. The variants below cover
//! the structural failures that callers have to handle.

use thiserror::Error;

/// The main error type for Gigstore
#[derive(Error, Debug)]
pub enum Error {
    // ========== Lexer Errors ==========
    #[error("Lexer error: unexpected character '{0}' at position {1}")]
    UnexpectedCharacter(char, usize),

    #[error("Lexer error: unterminated string literal starting at position {0}")]
    UnterminatedString(usize),

    #[error("Lexer error: invalid number format at position {0}")]
    InvalidNumber(usize),

    // ========== Parser Errors ==========
    #[error("Parse error: unexpected token '{found}', expected {expected}")]
    UnexpectedToken { expected: String, found: String },

    #[error("Parse error: {0}")]
    ParseError(String),

    // ========== Storage Errors ==========
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: document '{path}' is corrupt: {reason}")]
    CorruptDocument { path: String, reason: String },

    // ========== Marketplace Errors ==========
    #[error("{0} not found")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid request: {0}")]
    Invalid(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    // ========== Internal Errors ==========
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Gigstore operations
pub type Result<T> = std::result::Result<T, Error>;
