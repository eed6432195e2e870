use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::money::Money;

/// One row of an uploaded bank statement. Lives only for the duration of a
/// reconciliation session; the date is kept exactly as the bank wrote it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankTransaction {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub description: String,
    /// Absolute value; the statement's sign convention is discarded.
    pub amount: Money,
    /// Header → cell mapping of the source row, for traceability.
    #[serde(default)]
    pub original_row: BTreeMap<String, String>,
}

impl BankTransaction {
    pub fn new(date: impl Into<String>, description: impl Into<String>, amount: Money) -> Self {
        Self {
            date: date.into(),
            description: description.into(),
            amount: amount.abs(),
            original_row: BTreeMap::new(),
        }
    }
}
