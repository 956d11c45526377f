//! Error handling for ormstudy-store
//!
//! Wraps ormstudy-core ExError with store-specific helpers

use ormstudy_core::errors::{ExError, ExErrorKind};
use thiserror::Error;

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// Failures raised while loading a persistence unit
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("persistence unit name must not be empty")]
    EmptyName,

    #[error("file database path must not be empty")]
    EmptyPath,

    #[error("cannot parse persistence unit: {0}")]
    Parse(#[from] serde_yaml::Error),
}

impl From<ConfigError> for ExError {
    fn from(err: ConfigError) -> Self {
        config_error(&err.to_string())
    }
}

/// Create a migration error
pub fn migration_error(migration_id: &str, reason: &str) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("migration")
        .with_message(format!("Migration {} failed: {}", migration_id, reason))
}

/// Create a checksum mismatch error
pub fn checksum_mismatch(migration_id: &str, expected: &str, actual: &str) -> ExError {
    ExError::new(ExErrorKind::ConstraintViolation)
        .with_op("migration_checksum")
        .with_message(format!(
            "Checksum mismatch for migration {}: expected {}, got {}",
            migration_id, expected, actual
        ))
}

/// Create a configuration error
pub fn config_error(reason: &str) -> ExError {
    ExError::new(ExErrorKind::Configuration)
        .with_op("persistence_unit")
        .with_message(reason.to_string())
}

/// Create a database error from rusqlite::Error
///
/// Constraint failures keep their own kind so callers can tell a duplicate
/// key from a broken connection.
pub fn from_rusqlite(err: rusqlite::Error) -> ExError {
    let kind = match &err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation => {
            ExErrorKind::ConstraintViolation
        }
        rusqlite::Error::FromSqlConversionFailure(..)
        | rusqlite::Error::InvalidColumnType(..)
        | rusqlite::Error::IntegralValueOutOfRange(..) => ExErrorKind::Conversion,
        rusqlite::Error::InvalidParameterName(_)
        | rusqlite::Error::InvalidParameterCount(..)
        | rusqlite::Error::InvalidColumnName(_) => ExErrorKind::InvalidQuery,
        _ => ExErrorKind::Persistence,
    };
    ExError::new(kind)
        .with_op("sqlite")
        .with_message(err.to_string())
}

/// Create an IO error
pub fn io_error(operation: &str, err: std::io::Error) -> ExError {
    ExError::new(ExErrorKind::Io)
        .with_op(operation.to_string())
        .with_message(err.to_string())
}
