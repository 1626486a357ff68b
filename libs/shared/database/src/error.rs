use serde::Deserialize;
use thiserror::Error;

use shared_models::error::AppError;

/// PostgreSQL `unique_violation`, surfaced by PostgREST as the error `code`.
const UNIQUE_VIOLATION: &str = "23505";

/// PostgREST error payload; only the SQLSTATE is needed here.
#[derive(Deserialize)]
struct PostgrestErrorBody {
    code: Option<String>,
}

fn sqlstate(body: &str) -> Option<String> {
    serde_json::from_str::<PostgrestErrorBody>(body).ok()?.code
}

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Unique constraint violated: {0}")]
    Conflict(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl DatabaseError {
    pub fn from_status(status: u16, body: String) -> Self {
        if status == 409 || sqlstate(&body).as_deref() == Some(UNIQUE_VIOLATION) {
            return DatabaseError::Conflict(body);
        }

        match status {
            401 | 403 => DatabaseError::Auth(body),
            404 => DatabaseError::NotFound(body),
            500..=599 => DatabaseError::Unavailable(format!("upstream returned {}: {}", status, body)),
            _ => DatabaseError::Api { status, message: body },
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, DatabaseError::Conflict(_))
    }
}

impl From<reqwest::Error> for DatabaseError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            DatabaseError::Decode(err.to_string())
        } else {
            DatabaseError::Unavailable(err.to_string())
        }
    }
}

impl From<serde_json::Error> for DatabaseError {
    fn from(err: serde_json::Error) -> Self {
        DatabaseError::Decode(err.to_string())
    }
}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Conflict(msg) => AppError::Conflict(msg),
            DatabaseError::NotFound(msg) => AppError::NotFound(msg),
            DatabaseError::Auth(msg) => AppError::Auth(msg),
            DatabaseError::Unavailable(msg) => AppError::Unavailable(msg),
            other => AppError::Database(other.to_string()),
        }
    }
}
