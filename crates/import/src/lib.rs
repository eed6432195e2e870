pub mod csv;
pub mod match_engine;

pub use csv::{parse_statement, CsvError};
pub use match_engine::{normalize, ReconciliationEngine, NO_BANK_MATCH, NO_LEDGER_MATCH};
