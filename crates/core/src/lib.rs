pub mod bank;
pub mod email_log;
pub mod ledger;
pub mod money;
pub mod reconciliation;

pub use bank::BankTransaction;
pub use email_log::{EmailLogEntry, ProcessingStatus};
pub use ledger::{
    Category, LedgerEntry, LedgerError, LedgerUpdate, UnvalidatedEntry, ValidatedEntry,
    DEFAULT_DESCRIPTION, MAX_ENTRY_CENTS, UNKNOWN_MERCHANT,
};
pub use money::Money;
pub use reconciliation::{
    BankOnly, ComparisonResult, ComparisonSummary, LedgerOnly, MatchConfidence, MatchedPair,
    ReconciliationRecord,
};
