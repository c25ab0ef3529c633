//! Error taxonomy.
//!
//! Setup errors abort a send and surface to the caller. Transport errors
//! never leave the bridge — they are converted into a fallback assistant
//! message. Side-effect failures (summarize, feedback) are logged only.

use thiserror::Error;

/// Durable store failures
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("database task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("migration error: {0}")]
    Migration(String),

    #[error("row not found: {0}")]
    NotFound(String),
}

/// Failures of the streaming chat connection.
///
/// None of these trigger a retry; reopening a generation stream risks
/// duplicate assistant replies.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to connect: {0}")]
    Connect(#[source] tokio_tungstenite::tungstenite::Error),

    #[error("stream error: {0}")]
    Stream(#[source] tokio_tungstenite::tungstenite::Error),

    #[error("failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Errors surfaced from a user submission before any stream is opened
#[derive(Debug, Error)]
pub enum SendError {
    #[error("failed to create session: {0}")]
    SessionCreate(#[source] StoreError),
}

/// Failures of the discrete academic endpoints (upload, task polling)
#[derive(Debug, Error)]
pub enum AcademicError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upload failed with status {status}: {body}")]
    UploadRejected { status: u16, body: String },

    #[error("status check failed with status {0}")]
    StatusRejected(u16),

    #[error("processing failed: {0}")]
    TaskFailed(String),

    #[error("처리 시간이 초과되었습니다. 잠시 후 다시 시도해주세요.")]
    Timeout,

    #[error("could not read file: {0}")]
    File(#[from] std::io::Error),
}

/// Failures of the fire-and-forget advisory endpoints
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned status {0}")]
    Status(u16),
}
