use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Mail connection failed: {0}")]
    Connection(String),
    #[error("Failed to fetch message {id}: {reason}")]
    Fetch { id: String, reason: String },
    #[error("Failed to parse message: {0}")]
    Parse(#[from] mailparse::MailParseError),
    #[error("Mail backend not available: {0}")]
    NotAvailable(String),
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),
    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
