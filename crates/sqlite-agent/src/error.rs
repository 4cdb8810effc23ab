use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("database file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to open database: {}: {source}", path.display())]
    DbOpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("sqlite error: {0}")]
    Sql(String),

    #[error("write operations are disabled in the configuration")]
    WriteDisabled,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<rusqlite::Error> for AppError {
    fn from(e: rusqlite::Error) -> Self {
        AppError::Sql(e.to_string())
    }
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidRequest(_) => "INVALID_REQUEST",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::DbOpenFailed { .. } => "DB_OPEN_FAILED",
            AppError::Sql(_) => "SQL_ERROR",
            AppError::WriteDisabled => "WRITE_DISABLED",
            AppError::Io(_) => "IO_ERROR",
            AppError::Json(_) => "JSON_ERROR",
            AppError::Internal(_) => "INTERNAL",
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
