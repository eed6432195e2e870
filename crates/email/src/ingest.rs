use serde::Serialize;
use std::sync::Arc;
use tally_receipt::{ExtractedReceipt, ReceiptPipeline};

use crate::error::EmailError;
use crate::message::parse_message;
use crate::source::{MailAccount, MailSource};

/// One PDF attachment after conversion and extraction.
#[derive(Debug, Clone, Serialize)]
pub struct ReceiptCandidate {
    pub filename: String,
    #[serde(flatten)]
    pub extracted: ExtractedReceipt,
    pub raw_text: String,
}

/// A message that carried at least one PDF attachment.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedEmail {
    pub email_id: String,
    pub subject: String,
    pub date: Option<String>,
    pub attachments: Vec<String>,
    pub receipts: Vec<ReceiptCandidate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageFailure {
    pub email_id: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    /// Messages seen in the inbox, with or without receipts.
    pub total_messages: usize,
    pub emails: Vec<ProcessedEmail>,
    pub failures: Vec<MessageFailure>,
}

/// Pulls receipt candidates out of a mailbox.
///
/// Each call opens its own session, lists and fetches every message, and
/// closes the session before any parsing starts. Fetch and parse failures
/// are per message; only a failure to connect or list fails the call.
#[derive(Clone)]
pub struct Ingestor {
    source: Arc<dyn MailSource>,
    pipeline: Arc<ReceiptPipeline>,
}

struct FetchedBatch {
    total: usize,
    messages: Vec<(String, Vec<u8>)>,
    failures: Vec<MessageFailure>,
}

impl Ingestor {
    pub fn new(source: Arc<dyn MailSource>, pipeline: Arc<ReceiptPipeline>) -> Self {
        Self { source, pipeline }
    }

    pub async fn fetch_receipts(&self, account: &MailAccount) -> Result<IngestReport, EmailError> {
        let source = Arc::clone(&self.source);
        let account = account.clone();
        let batch = tokio::task::spawn_blocking(move || fetch_all(source.as_ref(), &account)).await??;

        let handles: Vec<_> = batch
            .messages
            .into_iter()
            .map(|(id, raw)| {
                let pipeline = Arc::clone(&self.pipeline);
                let task_id = id.clone();
                (id, tokio::task::spawn_blocking(move || process_message(&pipeline, task_id, &raw)))
            })
            .collect();

        let mut report = IngestReport {
            total_messages: batch.total,
            failures: batch.failures,
            ..Default::default()
        };

        for (email_id, handle) in handles {
            match handle.await {
                Ok(Ok(Some(email))) => report.emails.push(email),
                Ok(Ok(None)) => tracing::debug!(%email_id, "no PDF attachments, skipping"),
                Ok(Err(e)) => {
                    tracing::warn!(%email_id, error = %e, "failed to parse message");
                    report.failures.push(MessageFailure { email_id, error: e.to_string() });
                }
                Err(e) => {
                    tracing::warn!(%email_id, error = %e, "message task failed");
                    report.failures.push(MessageFailure { email_id, error: e.to_string() });
                }
            }
        }

        tracing::info!(
            total = report.total_messages,
            with_receipts = report.emails.len(),
            failures = report.failures.len(),
            "mailbox scan complete"
        );
        Ok(report)
    }

    /// Opens a session and closes it straight away.
    pub async fn test_connection(&self, account: &MailAccount) -> Result<(), EmailError> {
        let source = Arc::clone(&self.source);
        let account = account.clone();
        tokio::task::spawn_blocking(move || source.connect(&account).map(drop)).await?
    }
}

fn fetch_all(source: &dyn MailSource, account: &MailAccount) -> Result<FetchedBatch, EmailError> {
    let mut session = source.connect(account)?;
    let ids = session.list_message_ids()?;
    tracing::info!(count = ids.len(), "messages in inbox");

    let mut messages = Vec::with_capacity(ids.len());
    let mut failures = Vec::new();
    for id in &ids {
        match session.fetch_raw(id) {
            Ok(raw) => messages.push((id.clone(), raw)),
            Err(e) => {
                tracing::warn!(email_id = %id, error = %e, "failed to fetch message");
                failures.push(MessageFailure {
                    email_id: id.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    Ok(FetchedBatch {
        total: ids.len(),
        messages,
        failures,
    })
}

fn process_message(
    pipeline: &ReceiptPipeline,
    email_id: String,
    raw: &[u8],
) -> Result<Option<ProcessedEmail>, EmailError> {
    let message = parse_message(raw)?;

    let mut attachments = Vec::new();
    let mut receipts = Vec::new();
    for attachment in message.pdf_attachments() {
        let parsed = pipeline.process_bytes(&attachment.content);
        tracing::debug!(
            %email_id,
            filename = %attachment.filename,
            merchant = %parsed.extracted.merchant_name,
            amount = %parsed.extracted.amount,
            "receipt extracted"
        );
        attachments.push(attachment.filename.clone());
        receipts.push(ReceiptCandidate {
            filename: attachment.filename.clone(),
            extracted: parsed.extracted,
            raw_text: parsed.raw_text,
        });
    }

    if attachments.is_empty() {
        return Ok(None);
    }

    Ok(Some(ProcessedEmail {
        email_id,
        subject: message.subject,
        date: message.date,
        attachments,
        receipts,
    }))
}
