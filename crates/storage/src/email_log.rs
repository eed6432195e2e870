use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::str::FromStr;
use tally_core::{EmailLogEntry, ProcessingStatus};

use crate::db::DbPool;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

type LogRow = (i64, String, String, String, Option<String>);

fn log_entry(r: LogRow) -> Result<EmailLogEntry, sqlx::Error> {
    let status = ProcessingStatus::from_str(&r.3).map_err(|e| sqlx::Error::Decode(e.into()))?;
    Ok(EmailLogEntry {
        id: r.0,
        email_id: r.1,
        processed_at: r.2,
        status,
        error_message: r.4,
    })
}

pub async fn find_log(pool: &DbPool, email_id: &str) -> Result<Option<EmailLogEntry>, sqlx::Error> {
    let row = sqlx::query_as::<_, LogRow>(
        "SELECT id, email_id, processed_at, status, error_message FROM email_processing_log WHERE email_id = ?",
    )
    .bind(email_id)
    .fetch_optional(pool)
    .await?;
    row.map(log_entry).transpose()
}

/// Records the latest outcome for an email, replacing any earlier row. The
/// error message is dropped unless the status is `Error`.
pub async fn upsert_log(
    pool: &DbPool,
    email_id: &str,
    status: ProcessingStatus,
    error_message: Option<&str>,
) -> Result<(), sqlx::Error> {
    let error_message = match status {
        ProcessingStatus::Error => error_message,
        ProcessingStatus::Processed => None,
    };
    let processed_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

    sqlx::query(
        r#"
        INSERT INTO email_processing_log (email_id, processed_at, status, error_message)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(email_id) DO UPDATE SET
            processed_at = excluded.processed_at,
            status = excluded.status,
            error_message = excluded.error_message
        "#,
    )
    .bind(email_id)
    .bind(processed_at)
    .bind(status.to_string())
    .bind(error_message)
    .execute(pool)
    .await?;
    Ok(())
}

/// Most recently processed first.
pub async fn list_log(pool: &DbPool, limit: i64) -> Result<Vec<EmailLogEntry>, sqlx::Error> {
    let rows = sqlx::query_as::<_, LogRow>(
        r#"
        SELECT id, email_id, processed_at, status, error_message
        FROM email_processing_log
        ORDER BY processed_at DESC, id DESC
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(log_entry).collect()
}

pub async fn status_counts(pool: &DbPool) -> Result<Vec<StatusCount>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (String, i64)>(
        "SELECT status, COUNT(*) FROM email_processing_log GROUP BY status ORDER BY status DESC",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|(status, count)| StatusCount { status, count })
        .collect())
}
