pub mod email;
pub mod ledger;
pub mod reconciliation;

use axum::Json;
use serde_json::{json, Value};

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
