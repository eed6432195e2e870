use chrono::Utc;
use serde::Serialize;
use tally_core::{ProcessingStatus, UnvalidatedEntry, ValidatedEntry};
use tally_storage::{find_log, insert_entry, upsert_log, DbPool};

use crate::ingest::{ProcessedEmail, ReceiptCandidate};

pub const SKIP_NOT_SAVABLE: &str = "Receipt has no merchant or no positive amount";
pub const SKIP_ALREADY_PROCESSED: &str = "Email already processed";

#[derive(Debug, Clone, Copy, Default)]
pub struct WriterPolicy {
    /// Skip emails whose log row already says `processed`. Off by default,
    /// so fetching the same mailbox twice records its receipts twice.
    pub skip_processed_emails: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReceiptOutcome {
    Saved { filename: String, ledger_id: i64 },
    Skipped { filename: String, reason: String },
    Failed { filename: String, error: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeCounts {
    pub saved: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl OutcomeCounts {
    pub fn tally(outcomes: &[ReceiptOutcome]) -> Self {
        outcomes.iter().fold(Self::default(), |mut c, o| {
            match o {
                ReceiptOutcome::Saved { .. } => c.saved += 1,
                ReceiptOutcome::Skipped { .. } => c.skipped += 1,
                ReceiptOutcome::Failed { .. } => c.failed += 1,
            }
            c
        })
    }
}

/// Persists receipt candidates. Each receipt is its own insert, so one
/// failure does not undo its siblings.
pub struct LedgerWriter {
    pool: DbPool,
    policy: WriterPolicy,
}

impl LedgerWriter {
    pub fn new(pool: DbPool, policy: WriterPolicy) -> Self {
        Self { pool, policy }
    }

    pub async fn save_all(&self, emails: &[ProcessedEmail]) -> Vec<ReceiptOutcome> {
        let mut outcomes = Vec::new();
        for email in emails {
            outcomes.extend(self.save(email).await);
        }
        outcomes
    }

    /// One outcome per receipt. Storage failures, including failures to
    /// read or write the processing log, are reported per receipt and never
    /// stop the remaining receipts.
    pub async fn save(&self, email: &ProcessedEmail) -> Vec<ReceiptOutcome> {
        let existing = match find_log(&self.pool, &email.email_id).await {
            Ok(log) => log,
            Err(e) => {
                tracing::warn!(email_id = %email.email_id, error = %e, "failed to read processing log");
                None
            }
        };
        if let Some(log) = existing.filter(|l| l.status == ProcessingStatus::Processed) {
            if self.policy.skip_processed_emails {
                tracing::info!(email_id = %email.email_id, "email already processed, skipping");
                return email
                    .receipts
                    .iter()
                    .map(|r| ReceiptOutcome::Skipped {
                        filename: r.filename.clone(),
                        reason: SKIP_ALREADY_PROCESSED.to_string(),
                    })
                    .collect();
            }
            tracing::info!(
                email_id = %email.email_id,
                processed_at = %log.processed_at,
                "email processed before, recording its receipts again"
            );
        }

        let mut outcomes = Vec::with_capacity(email.receipts.len());
        for receipt in &email.receipts {
            outcomes.push(self.save_receipt(email, receipt).await);
        }
        outcomes
    }

    async fn save_receipt(&self, email: &ProcessedEmail, receipt: &ReceiptCandidate) -> ReceiptOutcome {
        let filename = receipt.filename.clone();
        let extracted = &receipt.extracted;
        if !extracted.is_savable() {
            tracing::info!(
                email_id = %email.email_id,
                %filename,
                merchant = %extracted.merchant_name,
                amount = %extracted.amount,
                "receipt not savable, skipping"
            );
            return ReceiptOutcome::Skipped {
                filename,
                reason: SKIP_NOT_SAVABLE.to_string(),
            };
        }

        let entry = UnvalidatedEntry {
            email_id: Some(email.email_id.clone()),
            email_subject: Some(email.subject.clone()),
            email_date: email.date.clone(),
            merchant_name: Some(extracted.merchant_name.clone()),
            amount: extracted.amount,
            date: extracted.date.unwrap_or_else(|| Utc::now().date_naive()),
            category: extracted.category.map(|c| c.to_string()),
            description: Some(extracted.description.clone()),
            receipt_text: Some(receipt.raw_text.clone()),
        };

        let inserted = match ValidatedEntry::validate(entry) {
            Ok(valid) => insert_entry(&self.pool, &valid).await.map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        match inserted {
            Ok(row) => {
                // The entry is committed; a log failure does not undo it.
                if let Err(e) = upsert_log(&self.pool, &email.email_id, ProcessingStatus::Processed, None).await {
                    tracing::warn!(email_id = %email.email_id, ledger_id = row.id, error = %e, "failed to log processed email");
                }
                tracing::info!(email_id = %email.email_id, ledger_id = row.id, %filename, "receipt saved");
                ReceiptOutcome::Saved {
                    filename,
                    ledger_id: row.id,
                }
            }
            Err(error) => {
                tracing::warn!(email_id = %email.email_id, %filename, %error, "failed to save receipt");
                let error = match upsert_log(&self.pool, &email.email_id, ProcessingStatus::Error, Some(error.as_str())).await {
                    Ok(()) => error,
                    Err(e) => {
                        tracing::warn!(email_id = %email.email_id, error = %e, "failed to log email error");
                        format!("{error} (processing log not updated: {e})")
                    }
                };
                ReceiptOutcome::Failed { filename, error }
            }
        }
    }
}
