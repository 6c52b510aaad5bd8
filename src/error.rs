use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum QifError {
    #[error("Error loading '{}'.\n{source}", .path.display())]
    Config {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Prompt error: {0}")]
    Prompt(#[from] rustyline::error::ReadlineError),

    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    #[error("{0}")]
    ConflictingOptions(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, QifError>;
