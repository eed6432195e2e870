use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tally_core::EmailLogEntry;
use tally_email::{MailAccount, MessageFailure, OutcomeCounts, ProcessedEmail, ReceiptOutcome};
use tally_storage::{list_log, status_counts, StatusCount};

use crate::config::EmailDefaults;
use crate::error::ApiError;
use crate::state::AppState;

const MISSING_PARAMS: &str = "Missing email configuration parameters";
const LOG_LIMIT: i64 = 50;

/// Credentials as posted by the client. Every field is required; the port
/// may arrive as a number or a numeric string.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MailParams {
    pub user: Option<String>,
    pub password: Option<String>,
    pub host: Option<String>,
    pub port: Option<Value>,
}

impl MailParams {
    fn into_account(self) -> Result<MailAccount, ApiError> {
        let missing = || ApiError::Validation(MISSING_PARAMS.to_string());
        let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        let port = match self.port {
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        }
        .and_then(|p| u16::try_from(p).ok())
        .filter(|p| *p != 0)
        .ok_or_else(missing)?;

        Ok(MailAccount {
            user: present(self.user).ok_or_else(missing)?,
            password: present(self.password).ok_or_else(missing)?,
            host: present(self.host).ok_or_else(missing)?,
            port,
        })
    }
}

fn account_from(body: Result<Json<MailParams>, JsonRejection>) -> Result<MailAccount, ApiError> {
    match body {
        Ok(Json(params)) => params.into_account(),
        Err(_) => Err(ApiError::Validation(MISSING_PARAMS.to_string())),
    }
}

#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub message: String,
    pub emails: Vec<ProcessedEmail>,
    pub results: Vec<ReceiptOutcome>,
    pub counts: OutcomeCounts,
    pub failures: Vec<MessageFailure>,
}

#[derive(Debug, Serialize)]
pub struct ConnectionStatus {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct EmailStats {
    pub summary: Vec<StatusCount>,
    pub total: i64,
}

impl EmailStats {
    fn from_counts(counts: Vec<StatusCount>) -> Self {
        if counts.is_empty() {
            return Self {
                summary: ["processed", "error"]
                    .into_iter()
                    .map(|status| StatusCount {
                        status: status.to_string(),
                        count: 0,
                    })
                    .collect(),
                total: 0,
            };
        }
        let total = counts.iter().map(|c| c.count).sum();
        Self {
            summary: counts,
            total,
        }
    }
}

/// Fetches the whole inbox, extracts receipts and saves the savable ones.
pub async fn process(
    State(state): State<AppState>,
    body: Result<Json<MailParams>, JsonRejection>,
) -> Result<Json<ProcessResponse>, ApiError> {
    let account = account_from(body)?;
    let report = state.ingestor.fetch_receipts(&account).await?;
    let results = state.writer.save_all(&report.emails).await;
    let counts = OutcomeCounts::tally(&results);

    tracing::info!(
        emails = report.emails.len(),
        saved = counts.saved,
        skipped = counts.skipped,
        failed = counts.failed,
        "email processing finished"
    );

    Ok(Json(ProcessResponse {
        message: format!("Processed {} emails", report.emails.len()),
        emails: report.emails,
        results,
        counts,
        failures: report.failures,
    }))
}

pub async fn test_connection(
    State(state): State<AppState>,
    body: Result<Json<MailParams>, JsonRejection>,
) -> Result<Json<ConnectionStatus>, ApiError> {
    let account = account_from(body)?;
    state.ingestor.test_connection(&account).await?;
    Ok(Json(ConnectionStatus {
        success: true,
        message: "Email connection successful".to_string(),
    }))
}

pub async fn log(State(state): State<AppState>) -> Result<Json<Vec<EmailLogEntry>>, ApiError> {
    Ok(Json(list_log(&state.db, LOG_LIMIT).await?))
}

pub async fn stats(State(state): State<AppState>) -> Result<Json<EmailStats>, ApiError> {
    Ok(Json(EmailStats::from_counts(status_counts(&state.db).await?)))
}

pub async fn config(State(state): State<AppState>) -> Json<EmailDefaults> {
    Json(state.email_defaults.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> MailParams {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn port_accepts_number_or_string() {
        let a = params(json!({"user": "u", "password": "p", "host": "h", "port": 993}))
            .into_account()
            .unwrap();
        assert_eq!(a.port, 993);

        let b = params(json!({"user": "u", "password": "p", "host": "h", "port": "143"}))
            .into_account()
            .unwrap();
        assert_eq!(b.port, 143);
    }

    #[test]
    fn any_missing_field_is_rejected() {
        for body in [
            json!({"password": "p", "host": "h", "port": 993}),
            json!({"user": "u", "host": "h", "port": 993}),
            json!({"user": "u", "password": "p", "port": 993}),
            json!({"user": "u", "password": "p", "host": "h"}),
            json!({"user": "", "password": "p", "host": "h", "port": 993}),
            json!({"user": "u", "password": "p", "host": "h", "port": 70000}),
        ] {
            let err = params(body.clone()).into_account().unwrap_err();
            assert_eq!(err.to_string(), MISSING_PARAMS, "{body}");
        }
    }

    #[test]
    fn empty_stats_are_zero_filled() {
        let stats = EmailStats::from_counts(Vec::new());
        assert_eq!(stats.total, 0);
        let statuses: Vec<_> = stats.summary.iter().map(|c| c.status.as_str()).collect();
        assert_eq!(statuses, ["processed", "error"]);
    }

    #[test]
    fn stats_total_sums_counts() {
        let stats = EmailStats::from_counts(vec![
            StatusCount { status: "processed".into(), count: 3 },
            StatusCount { status: "error".into(), count: 1 },
        ]);
        assert_eq!(stats.total, 4);
    }
}
