use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tally_core::{BankTransaction, ComparisonResult, ComparisonSummary, ReconciliationRecord};
use tally_import::parse_statement;
use tally_storage::{entries_for_reconciliation, ledger_stats, list_history, save_summary, LedgerStats};

use crate::error::ApiError;
use crate::state::AppState;

const STATEMENT_FIELD: &str = "statement";
const RECENT_RUNS: i64 = 5;
const HISTORY_LIMIT: i64 = 50;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub ledger_stats: LedgerStats,
    pub recent_reconciliations: Vec<ReconciliationRecord>,
}

#[derive(Debug, Serialize)]
pub struct ParsedStatement {
    pub message: String,
    pub transactions: Vec<BankTransaction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareRequest {
    pub bank_transactions: Option<Vec<BankTransaction>>,
}

#[derive(Debug, Deserialize)]
pub struct SaveRequest {
    pub summary: ComparisonSummary,
}

#[derive(Debug, Serialize)]
pub struct Saved {
    pub message: String,
    pub id: i64,
}

pub async fn overview(State(state): State<AppState>) -> Result<Json<Overview>, ApiError> {
    Ok(Json(Overview {
        ledger_stats: ledger_stats(&state.db).await?,
        recent_reconciliations: list_history(&state.db, RECENT_RUNS).await?,
    }))
}

fn is_csv(content_type: Option<&str>, file_name: Option<&str>) -> bool {
    content_type == Some("text/csv") || file_name.is_some_and(|n| n.ends_with(".csv"))
}

/// Accepts a single CSV file in the `statement` field and returns its rows.
/// Nothing is stored.
pub async fn upload_statement(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ParsedStatement>, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(STATEMENT_FIELD) {
            continue;
        }
        if !is_csv(field.content_type(), field.file_name()) {
            return Err(ApiError::Validation("Only CSV files are allowed".to_string()));
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let data = field.bytes().await?;
        if data.len() > state.upload_limit {
            return Err(ApiError::PayloadTooLarge(format!(
                "File '{file_name}' exceeds the {} byte upload limit",
                state.upload_limit
            )));
        }

        let transactions = parse_statement(&data[..])?;
        tracing::info!(
            file = %file_name,
            bytes = data.len(),
            transactions = transactions.len(),
            "bank statement parsed"
        );
        return Ok(Json(ParsedStatement {
            message: format!("Parsed {} transactions from bank statement", transactions.len()),
            transactions,
        }));
    }

    Err(ApiError::Validation("No file uploaded".to_string()))
}

/// Matches the posted bank rows against the whole ledger. Read-only.
pub async fn compare(
    State(state): State<AppState>,
    body: Result<Json<CompareRequest>, JsonRejection>,
) -> Result<Json<ComparisonResult>, ApiError> {
    let bank = body
        .ok()
        .and_then(|Json(req)| req.bank_transactions)
        .ok_or_else(|| ApiError::Validation("Bank transactions array is required".to_string()))?;

    let ledger = entries_for_reconciliation(&state.db).await?;
    Ok(Json(state.engine.compare(&bank, &ledger)))
}

pub async fn history(
    State(state): State<AppState>,
) -> Result<Json<Vec<ReconciliationRecord>>, ApiError> {
    Ok(Json(list_history(&state.db, HISTORY_LIMIT).await?))
}

pub async fn save(
    State(state): State<AppState>,
    body: Result<Json<SaveRequest>, JsonRejection>,
) -> Result<Json<Saved>, ApiError> {
    let Json(req) = body?;
    let totals = [
        req.summary.total_matched_amount,
        req.summary.total_ledger_amount,
        req.summary.total_bank_amount,
    ];
    if let Some(bad) = totals.iter().find(|m| m.is_negative() || m.to_cents().is_none()) {
        return Err(ApiError::Validation(format!("Invalid summary amount: {bad}")));
    }
    let id = save_summary(&state.db, &req.summary).await?;
    tracing::info!(id, matches = req.summary.total_matches, "reconciliation saved");
    Ok(Json(Saved {
        message: "Reconciliation saved successfully".to_string(),
        id,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_by_mime_type_or_extension() {
        assert!(is_csv(Some("text/csv"), Some("statement.txt")));
        assert!(is_csv(Some("application/octet-stream"), Some("march.csv")));
        assert!(is_csv(None, Some("march.csv")));
        assert!(!is_csv(Some("application/pdf"), Some("march.pdf")));
        assert!(!is_csv(None, None));
    }
}
