use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Processed,
    Error,
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessingStatus::Processed => write!(f, "processed"),
            ProcessingStatus::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for ProcessingStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processed" => Ok(ProcessingStatus::Processed),
            "error" => Ok(ProcessingStatus::Error),
            other => Err(format!("Unknown processing status: '{other}'")),
        }
    }
}

/// One row per processed email. `error_message` is set iff the status is
/// `Error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailLogEntry {
    pub id: i64,
    pub email_id: String,
    pub processed_at: String,
    pub status: ProcessingStatus,
    pub error_message: Option<String>,
}
