use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::EmailError;

/// Credentials and server for one mailbox. Supplied per request, never stored.
#[derive(Clone, Deserialize)]
pub struct MailAccount {
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
}

impl fmt::Debug for MailAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailAccount")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

/// Opens mail sessions. Implementations block; callers run them on a
/// blocking thread.
pub trait MailSource: Send + Sync {
    fn connect(&self, account: &MailAccount) -> Result<Box<dyn MailSession>, EmailError>;
}

/// An open mailbox. Dropping the session closes it.
pub trait MailSession: Send {
    /// Ids of every message in the inbox, oldest first.
    fn list_message_ids(&mut self) -> Result<Vec<String>, EmailError>;
    /// The full RFC 822 source of one message.
    fn fetch_raw(&mut self, id: &str) -> Result<Vec<u8>, EmailError>;
}

// ── Mock backend (always available, used for tests) ───────────────────────────

/// In-memory mailbox. Counts open sessions so callers can check that
/// nothing outlives an ingestion run.
#[derive(Default)]
pub struct MockMailSource {
    messages: Vec<(String, Vec<u8>)>,
    failing_ids: HashSet<String>,
    unreachable: Option<String>,
    open_sessions: Arc<AtomicUsize>,
    total_sessions: Arc<AtomicUsize>,
}

impl MockMailSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// A source whose every connection attempt fails with `reason`.
    pub fn unreachable(reason: impl Into<String>) -> Self {
        Self {
            unreachable: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn with_message(mut self, id: impl Into<String>, raw: impl Into<Vec<u8>>) -> Self {
        self.messages.push((id.into(), raw.into()));
        self
    }

    /// Listed, but fetching it fails.
    pub fn with_broken_message(mut self, id: impl Into<String>) -> Self {
        let id = id.into();
        self.failing_ids.insert(id.clone());
        self.messages.push((id, Vec::new()));
        self
    }

    pub fn open_sessions(&self) -> usize {
        self.open_sessions.load(Ordering::SeqCst)
    }

    pub fn total_sessions(&self) -> usize {
        self.total_sessions.load(Ordering::SeqCst)
    }
}

impl MailSource for MockMailSource {
    fn connect(&self, _account: &MailAccount) -> Result<Box<dyn MailSession>, EmailError> {
        if let Some(reason) = &self.unreachable {
            return Err(EmailError::Connection(reason.clone()));
        }
        self.open_sessions.fetch_add(1, Ordering::SeqCst);
        self.total_sessions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockSession {
            messages: self.messages.clone(),
            failing_ids: self.failing_ids.clone(),
            open_sessions: Arc::clone(&self.open_sessions),
        }))
    }
}

struct MockSession {
    messages: Vec<(String, Vec<u8>)>,
    failing_ids: HashSet<String>,
    open_sessions: Arc<AtomicUsize>,
}

impl MailSession for MockSession {
    fn list_message_ids(&mut self) -> Result<Vec<String>, EmailError> {
        Ok(self.messages.iter().map(|(id, _)| id.clone()).collect())
    }

    fn fetch_raw(&mut self, id: &str) -> Result<Vec<u8>, EmailError> {
        if self.failing_ids.contains(id) {
            return Err(EmailError::Fetch {
                id: id.to_string(),
                reason: "mock fetch failure".to_string(),
            });
        }
        self.messages
            .iter()
            .find(|(mid, _)| mid == id)
            .map(|(_, raw)| raw.clone())
            .ok_or_else(|| EmailError::Fetch {
                id: id.to_string(),
                reason: "no such message".to_string(),
            })
    }
}

impl Drop for MockSession {
    fn drop(&mut self) {
        self.open_sessions.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Stands in for the IMAP backend when the crate is built without it.
pub struct UnavailableSource;

impl MailSource for UnavailableSource {
    fn connect(&self, _account: &MailAccount) -> Result<Box<dyn MailSession>, EmailError> {
        Err(EmailError::NotAvailable(
            "IMAP support not compiled in; rebuild with `--features imap`".to_string(),
        ))
    }
}
