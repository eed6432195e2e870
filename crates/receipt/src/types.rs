use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tally_core::{Category, Money};

/// Best-effort structured view of a receipt's text.
///
/// `is_valid` only says that there was text to look at. Whether the result
/// may be written to the ledger is a separate question, see [`is_savable`].
///
/// [`is_savable`]: ExtractedReceipt::is_savable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedReceipt {
    pub merchant_name: String,
    pub amount: Money,
    pub date: Option<NaiveDate>,
    pub category: Option<Category>,
    pub description: String,
    pub is_valid: bool,
}

impl ExtractedReceipt {
    /// The result for empty or whitespace-only input.
    pub fn invalid() -> Self {
        Self {
            merchant_name: String::new(),
            amount: Money::zero(),
            date: None,
            category: None,
            description: String::new(),
            is_valid: false,
        }
    }

    pub fn is_savable(&self) -> bool {
        self.is_valid && !self.merchant_name.trim().is_empty() && self.amount.is_positive()
    }
}
