use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tally_core::{LedgerEntry, LedgerUpdate, UnvalidatedEntry, ValidatedEntry};
use tally_storage::{
    category_totals, clear_all, delete_entry, get_entry, insert_entry, ledger_stats, list_entries,
    monthly_totals, update_entry, CategoryTotal, LedgerQuery, LedgerStats, MonthlyTotal,
};

use crate::error::ApiError;
use crate::state::AppState;

const NOT_FOUND: &str = "Ledger entry not found";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub category: Option<String>,
}

impl From<ListParams> for LedgerQuery {
    fn from(p: ListParams) -> Self {
        let defaults = LedgerQuery::default();
        LedgerQuery {
            search: p.search.filter(|s| !s.is_empty()),
            category: p.category.filter(|s| !s.is_empty()),
            page: p.page.unwrap_or(defaults.page).max(1),
            limit: p.limit.unwrap_or(defaults.limit).max(1),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub pages: i64,
}

#[derive(Debug, Serialize)]
pub struct LedgerListing {
    pub ledger: Vec<LedgerEntry>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct LedgerSummary {
    pub summary: LedgerStats,
    pub categories: Vec<CategoryTotal>,
    pub monthly: Vec<MonthlyTotal>,
}

pub async fn list(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<LedgerListing>, ApiError> {
    let Query(params) = params?;
    let query = LedgerQuery::from(params);
    let page = list_entries(&state.db, &query).await?;
    let limit = i64::from(query.limit);

    Ok(Json(LedgerListing {
        ledger: page.entries,
        pagination: Pagination {
            page: query.page,
            limit: query.limit,
            total: page.total,
            pages: (page.total + limit - 1) / limit,
        },
    }))
}

pub async fn show(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<LedgerEntry>, ApiError> {
    let Path(id) = id?;
    get_entry(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(NOT_FOUND.to_string()))
}

pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<UnvalidatedEntry>, JsonRejection>,
) -> Result<(StatusCode, Json<LedgerEntry>), ApiError> {
    let Json(entry) = body?;
    let valid = ValidatedEntry::validate(entry)?;
    let created = insert_entry(&state.db, &valid).await?;
    tracing::info!(id = created.id, merchant = %created.merchant_name, "ledger entry created");
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<LedgerUpdate>, JsonRejection>,
) -> Result<Json<LedgerEntry>, ApiError> {
    let Path(id) = id?;
    let Json(update) = body?;
    let update = update.validate()?;
    update_entry(&state.db, id, &update)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(NOT_FOUND.to_string()))
}

pub async fn remove(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    let Path(id) = id?;
    if !delete_entry(&state.db, id).await? {
        return Err(ApiError::NotFound(NOT_FOUND.to_string()));
    }
    Ok(Json(json!({ "message": "Ledger entry deleted successfully" })))
}

pub async fn clear(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    clear_all(&state.db).await?;
    tracing::warn!("ledger and email log cleared");
    Ok(Json(json!({
        "message": "All ledger entries and email logs cleared successfully"
    })))
}

pub async fn stats(State(state): State<AppState>) -> Result<Json<LedgerSummary>, ApiError> {
    Ok(Json(LedgerSummary {
        summary: ledger_stats(&state.db).await?,
        categories: category_totals(&state.db).await?,
        monthly: monthly_totals(&state.db).await?,
    }))
}
