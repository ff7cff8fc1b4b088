//! Error kinds surfaced by the nutrition accounting core
//!
//! Storage failures keep their `DbError` shape and pass through unmodified.

use thiserror::Error;

use crate::db::DbError;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Input rejected at the boundary (bad quantity, unknown enum value, ...)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown food, missing diary, or no matching entry
    #[error("Not found: {0}")]
    NotFound(String),

    /// Incremental totals drifted from a from-scratch recomputation
    #[error("Consistency error: {field} is {incremental} incrementally but {recomputed} recomputed")]
    Consistency {
        field: &'static str,
        incremental: f64,
        recomputed: f64,
    },

    #[error(transparent)]
    Database(#[from] DbError),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        CoreError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        CoreError::NotFound(message.into())
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(e: rusqlite::Error) -> Self {
        CoreError::Database(DbError::Sqlite(e))
    }
}

impl From<r2d2::Error> for CoreError {
    fn from(e: r2d2::Error) -> Self {
        CoreError::Database(DbError::Connection(e))
    }
}
