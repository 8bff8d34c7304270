//! Error types for ShowDB
//!
//! This module defines all error types used throughout the statement engine.

use thiserror::Error;

/// The main error type for ShowDB
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

    #[error("Parse error: unexpected end of input, expected {0}")]
    UnexpectedEof(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    // ========== Planning Errors ==========
    #[error("unknown variable: \"{0}\"")]
    UnknownVariable(String),

    #[error("no database specified")]
    NoDatabase,

    #[error("{0} is not supported")]
    Unsupported(String),

    // ========== Catalog Errors ==========
    #[error("database \"{0}\" does not exist")]
    UndefinedDatabase(String),

    #[error("table \"{0}\" does not exist")]
    UndefinedTable(String),

    #[error("\"{name}\" is not a {expected}")]
    WrongObjectType { name: String, expected: &'static str },

    #[error("database \"{0}\" already exists")]
    DatabaseAlreadyExists(String),

    #[error("table \"{0}\" already exists")]
    TableAlreadyExists(String),

    #[error("column \"{0}\" does not exist in \"{1}\"")]
    ColumnNotFound(String, String),

    #[error("column \"{0}\" specified more than once in \"{1}\"")]
    DuplicateColumn(String, String),

    #[error("index \"{0}\" already exists")]
    IndexAlreadyExists(String),

    #[error("duplicate constraint name: \"{0}\"")]
    DuplicateConstraint(String),

    #[error("user \"{0}\" does not exist")]
    UndefinedUser(String),

    #[error("user \"{0}\" already exists")]
    UserAlreadyExists(String),

    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("{0}")]
    MalformedStoredDefinition(String),

    // ========== Privilege Errors ==========
    #[error("{0}")]
    PermissionDenied(String),

    // ========== Execution Errors ==========
    #[error("memory budget exceeded: {requested} bytes requested, {used} of {limit} bytes in use")]
    MemoryBudgetExceeded {
        requested: usize,
        used: usize,
        limit: usize,
    },

    // ========== Transaction Errors ==========
    #[error("result is ambiguous: {0}")]
    AmbiguousResult(String),

    #[error("transaction {0} is not active")]
    TransactionAborted(u64),

    #[error("there is already a transaction in progress")]
    TransactionInProgress,

    #[error("there is no transaction in progress")]
    NoTransaction,

    // ========== I/O Errors ==========
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // ========== Internal Errors ==========
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// PostgreSQL-compatible SQLSTATE for this error
    pub fn code(&self) -> &'static str {
        match self {
            Error::UnexpectedCharacter(..)
            | Error::UnterminatedString(_)
            | Error::InvalidNumber(_)
            | Error::UnexpectedToken { .. }
            | Error::UnexpectedEof(_)
            | Error::ParseError(_) => "42601",
            Error::UnknownVariable(_) | Error::UndefinedUser(_) => "42704",
            Error::NoDatabase | Error::UndefinedDatabase(_) => "3D000",
            Error::Unsupported(_) => "0A000",
            Error::UndefinedTable(_) => "42P01",
            Error::WrongObjectType { .. } => "42809",
            Error::DatabaseAlreadyExists(_) => "42P04",
            Error::TableAlreadyExists(_) | Error::IndexAlreadyExists(_) => "42P07",
            Error::ColumnNotFound(..) => "42703",
            Error::DuplicateColumn(..) => "42701",
            Error::DuplicateConstraint(_) | Error::UserAlreadyExists(_) => "42710",
            Error::PermissionDenied(_) => "42501",
            Error::MemoryBudgetExceeded { .. } => "53200",
            Error::AmbiguousResult(_) => "40003",
            Error::TransactionAborted(_) => "25P02",
            Error::TransactionInProgress => "25001",
            Error::NoTransaction => "25P01",
            Error::MalformedStoredDefinition(_)
            | Error::InvalidDescriptor(_)
            | Error::IoError(_)
            | Error::Serialization(_)
            | Error::Internal(_) => "XX000",
        }
    }

    /// Whether the transaction layer could not determine the outcome
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Error::AmbiguousResult(_))
    }
}

/// Result type alias for ShowDB operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::UndefinedTable("db.users".to_string());
        assert_eq!(err.to_string(), "table \"db.users\" does not exist");

        let err = Error::UnexpectedCharacter('@', 5);
        assert_eq!(
            err.to_string(),
            "Lexer error: unexpected character '@' at position 5"
        );

        let err = Error::UnknownVariable("FOO".to_string());
        assert_eq!(err.to_string(), "unknown variable: \"FOO\"");
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::UndefinedDatabase("d".into()).code(), "3D000");
        assert_eq!(Error::UndefinedTable("d.t".into()).code(), "42P01");
        assert_eq!(Error::PermissionDenied("no".into()).code(), "42501");
        assert!(Error::AmbiguousResult("lost".into()).is_ambiguous());
        assert!(!Error::NoDatabase.is_ambiguous());
    }
}
