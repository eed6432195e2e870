pub mod error;
#[cfg(feature = "imap")]
pub mod imap_source;
pub mod ingest;
pub mod message;
pub mod source;
pub mod writer;

pub use error::EmailError;
#[cfg(feature = "imap")]
pub use imap_source::ImapSource;
pub use ingest::{IngestReport, Ingestor, MessageFailure, ProcessedEmail, ReceiptCandidate};
pub use message::{parse_message, Attachment, ParsedMessage};
pub use source::{MailAccount, MailSession, MailSource, MockMailSource, UnavailableSource};
pub use writer::{LedgerWriter, OutcomeCounts, ReceiptOutcome, WriterPolicy};
