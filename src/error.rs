// ABOUTME: Error type shared by the change feed, diff and usage service clients

use thiserror::Error;

/// Failure talking to a backing service (change feed, diff or usage). These never surface
/// to the user; callers log them and degrade.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("File watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Background task failed: {0}")]
    Task(String),
}
