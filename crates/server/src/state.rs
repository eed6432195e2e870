use std::sync::Arc;
use tally_email::{Ingestor, LedgerWriter, WriterPolicy};
use tally_import::ReconciliationEngine;
use tally_storage::DbPool;

use crate::config::EmailDefaults;

/// Shared by every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub ingestor: Ingestor,
    pub writer: Arc<LedgerWriter>,
    pub engine: Arc<ReconciliationEngine>,
    pub email_defaults: EmailDefaults,
    /// Largest accepted bank statement, in bytes.
    pub upload_limit: usize,
}

impl AppState {
    pub fn new(
        db: DbPool,
        ingestor: Ingestor,
        policy: WriterPolicy,
        email_defaults: EmailDefaults,
        upload_limit: usize,
    ) -> Self {
        Self {
            writer: Arc::new(LedgerWriter::new(db.clone(), policy)),
            db,
            ingestor,
            engine: Arc::new(ReconciliationEngine::default()),
            email_defaults,
            upload_limit,
        }
    }
}
