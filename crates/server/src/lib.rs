pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::{Config, ConfigError, EmailDefaults, LogFormat};
pub use error::ApiError;
pub use state::AppState;

/// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;
/// Cap for JSON bodies, which can carry a whole statement's transactions.
const JSON_BODY_LIMIT: usize = 10 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.upload_limit.saturating_add(MULTIPART_OVERHEAD);

    let ledger = Router::new()
        .route("/", get(routes::ledger::list).post(routes::ledger::create))
        .route("/stats/summary", get(routes::ledger::stats))
        .route("/clear/all", delete(routes::ledger::clear))
        .route(
            "/{id}",
            get(routes::ledger::show)
                .put(routes::ledger::update)
                .delete(routes::ledger::remove),
        );

    let email = Router::new()
        .route("/process", post(routes::email::process))
        .route("/test-connection", post(routes::email::test_connection))
        .route("/log", get(routes::email::log))
        .route("/stats", get(routes::email::stats))
        .route("/config", get(routes::email::config));

    let reconciliation = Router::new()
        .route("/", get(routes::reconciliation::overview))
        .route(
            "/upload-statement",
            post(routes::reconciliation::upload_statement).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/compare", post(routes::reconciliation::compare))
        .route("/history", get(routes::reconciliation::history))
        .route("/save", post(routes::reconciliation::save));

    Router::new()
        .route("/api/health", get(routes::health))
        .nest("/api/ledger", ledger)
        .nest("/api/email", email)
        .nest("/api/reconciliation", reconciliation)
        .layer(DefaultBodyLimit::max(JSON_BODY_LIMIT))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
