use thiserror::Error;

/// Main error type for reviewgraph
#[derive(Error, Debug)]
pub enum ReviewgraphError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialize rule names a field or path that does not exist
    #[error("Invalid serialize rule '{rule}' on {entity}: {reason}")]
    Rule {
        entity: &'static str,
        rule: String,
        reason: String,
    },

    /// Record not found
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    /// Foreign key does not resolve, or a delete would orphan rows
    #[error("Integrity error: {0}")]
    Integrity(String),

    /// Serializer walked deeper than the configured limit
    #[error("Recursion limit of {max_depth} exceeded at '{path}'")]
    RecursionLimit { path: String, max_depth: usize },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ReviewgraphError {
    /// Convert a rusqlite error, classifying foreign key violations as integrity errors.
    pub fn from_sqlite(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, msg)
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY =>
            {
                ReviewgraphError::Integrity(
                    msg.clone()
                        .unwrap_or_else(|| "FOREIGN KEY constraint failed".to_string()),
                )
            }
            _ => ReviewgraphError::Database(err),
        }
    }
}

/// Convenient Result type using ReviewgraphError
pub type Result<T> = std::result::Result<T, ReviewgraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ReviewgraphError::Config("Test error".to_string());
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("Test error"));
    }

    #[test]
    fn test_not_found_display() {
        let err = ReviewgraphError::NotFound { entity: "Customer", id: 7 };
        assert_eq!(err.to_string(), "Customer not found: 7");
    }

    #[test]
    fn test_error_from_rusqlite() {
        let rusqlite_err = rusqlite::Error::InvalidQuery;
        let err: ReviewgraphError = rusqlite_err.into();
        assert!(matches!(err, ReviewgraphError::Database(_)));
    }

    #[test]
    fn test_foreign_key_failure_is_integrity() {
        let sqlite_err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY),
            None,
        );
        let err = ReviewgraphError::from_sqlite(sqlite_err);
        assert!(matches!(err, ReviewgraphError::Integrity(_)));
    }

    #[test]
    fn test_other_sqlite_failure_stays_database() {
        let err = ReviewgraphError::from_sqlite(rusqlite::Error::QueryReturnedNoRows);
        assert!(matches!(err, ReviewgraphError::Database(_)));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ReviewgraphError = io_err.into();
        assert!(matches!(err, ReviewgraphError::Io(_)));
    }
}
