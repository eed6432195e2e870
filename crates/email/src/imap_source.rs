//! IMAP-over-TLS mail source, built with the `imap` feature.

use native_tls::{TlsConnector, TlsStream};
use std::net::TcpStream;

use crate::error::EmailError;
use crate::source::{MailAccount, MailSession, MailSource};

const MAILBOX: &str = "INBOX";

/// Certificates are verified by the platform TLS stack.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImapSource;

impl MailSource for ImapSource {
    fn connect(&self, account: &MailAccount) -> Result<Box<dyn MailSession>, EmailError> {
        let tls = TlsConnector::builder()
            .build()
            .map_err(|e| EmailError::Connection(e.to_string()))?;
        let client = imap::connect((account.host.as_str(), account.port), &account.host, &tls)
            .map_err(|e| EmailError::Connection(e.to_string()))?;
        let mut session = client
            .login(&account.user, &account.password)
            .map_err(|(e, _)| EmailError::Connection(e.to_string()))?;
        session
            .select(MAILBOX)
            .map_err(|e| EmailError::Connection(e.to_string()))?;

        tracing::info!(host = %account.host, user = %account.user, "IMAP session opened");
        Ok(Box::new(ImapSession { session }))
    }
}

struct ImapSession {
    session: imap::Session<TlsStream<TcpStream>>,
}

impl MailSession for ImapSession {
    fn list_message_ids(&mut self) -> Result<Vec<String>, EmailError> {
        let uids = self
            .session
            .uid_search("ALL")
            .map_err(|e| EmailError::Connection(e.to_string()))?;
        let mut uids: Vec<u32> = uids.into_iter().collect();
        uids.sort_unstable();
        Ok(uids.into_iter().map(|uid| uid.to_string()).collect())
    }

    fn fetch_raw(&mut self, id: &str) -> Result<Vec<u8>, EmailError> {
        let fetch_err = |reason: String| EmailError::Fetch {
            id: id.to_string(),
            reason,
        };
        let fetches = self
            .session
            .uid_fetch(id, "RFC822")
            .map_err(|e| fetch_err(e.to_string()))?;
        let body = fetches
            .iter()
            .find_map(|f| f.body())
            .ok_or_else(|| fetch_err("message has no body".to_string()))?;
        Ok(body.to_vec())
    }
}

impl Drop for ImapSession {
    fn drop(&mut self) {
        if let Err(e) = self.session.logout() {
            tracing::warn!(error = %e, "IMAP logout failed");
        }
    }
}
