//! Domain error types.

use thiserror::Error;

/// Errors surfaced by stores and domain services.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DomainError::NotFound("Resource not found".into()),
            sqlx::Error::Database(db_err) => from_sqlstate(db_err.code().as_deref(), &db_err),
            _ => DomainError::Storage(format!("Database error: {}", err)),
        }
    }
}

/// Maps a PostgreSQL SQLSTATE to the matching domain error.
fn from_sqlstate(code: Option<&str>, detail: &dyn std::fmt::Display) -> DomainError {
    match code {
        // unique_violation
        Some("23505") => DomainError::Validation(format!("Duplicate value: {}", detail)),
        // check_violation
        Some("23514") => DomainError::Validation(format!("Value rejected by database: {}", detail)),
        // foreign_key_violation
        Some("23503") => DomainError::NotFound("Referenced resource not found".into()),
        _ => DomainError::Storage(format!("Database error: {}", detail)),
    }
}

impl From<validator::ValidationErrors> for DomainError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| match &e.message {
                    Some(m) => format!("{}: {}", field, m),
                    None => format!("{}: invalid value", field),
                })
            })
            .collect();

        DomainError::Validation(messages.join("; "))
    }
}
