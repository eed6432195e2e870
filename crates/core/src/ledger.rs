use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::money::Money;

pub const UNKNOWN_MERCHANT: &str = "Unknown Merchant";
pub const DEFAULT_DESCRIPTION: &str = "Receipt processing";
/// Largest amount a single entry may carry, in cents. Keeps ledger sums well
/// inside `i64`.
pub const MAX_ENTRY_CENTS: i64 = 100_000_000_000;

/// Spending labels. The ledger stores the label text, so entries may carry
/// a category outside this set; it is a convention, not a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Category {
    Groceries,
    Gas,
    Dining,
    #[serde(rename = "Online Shopping")]
    OnlineShopping,
    #[default]
    Retail,
    Entertainment,
    Transportation,
    Utilities,
    Healthcare,
    Other,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::Groceries,
        Category::Gas,
        Category::Dining,
        Category::OnlineShopping,
        Category::Retail,
        Category::Entertainment,
        Category::Transportation,
        Category::Utilities,
        Category::Healthcare,
        Category::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Groceries => "Groceries",
            Category::Gas => "Gas",
            Category::Dining => "Dining",
            Category::OnlineShopping => "Online Shopping",
            Category::Retail => "Retail",
            Category::Entertainment => "Entertainment",
            Category::Transportation => "Transportation",
            Category::Utilities => "Utilities",
            Category::Healthcare => "Healthcare",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown category: '{s}'"))
    }
}

/// A recorded purchase as stored in the ledger table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub email_id: Option<String>,
    pub email_subject: Option<String>,
    pub email_date: Option<String>,
    pub merchant_name: String,
    pub amount: Money,
    pub date: NaiveDate,
    pub category: String,
    pub description: String,
    pub receipt_text: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum LedgerError {
    #[error("Amount must not be negative: {0}")]
    NegativeAmount(Money),
    #[error("Amount is too large: {0}")]
    AmountTooLarge(Money),
}

/// Non-negative and at most [`MAX_ENTRY_CENTS`], rounded to the cent.
fn check_amount(amount: Money) -> Result<Money, LedgerError> {
    if amount.is_negative() {
        return Err(LedgerError::NegativeAmount(amount));
    }
    match amount.to_cents() {
        Some(cents) if cents <= MAX_ENTRY_CENTS => Ok(Money::from_cents(cents)),
        _ => Err(LedgerError::AmountTooLarge(amount)),
    }
}

/// Input for a new ledger row, from manual entry or receipt ingestion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnvalidatedEntry {
    #[serde(default)]
    pub email_id: Option<String>,
    #[serde(default)]
    pub email_subject: Option<String>,
    #[serde(default)]
    pub email_date: Option<String>,
    #[serde(default)]
    pub merchant_name: Option<String>,
    pub amount: Money,
    pub date: NaiveDate,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub receipt_text: Option<String>,
}

/// A ledger row that is ready to insert: amount non-negative and rounded to
/// the cent, blank text fields replaced by their defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedEntry {
    pub email_id: Option<String>,
    pub email_subject: Option<String>,
    pub email_date: Option<String>,
    pub merchant_name: String,
    pub amount: Money,
    pub date: NaiveDate,
    pub category: String,
    pub description: String,
    pub receipt_text: String,
}

impl ValidatedEntry {
    pub fn validate(entry: UnvalidatedEntry) -> Result<ValidatedEntry, LedgerError> {
        let amount = check_amount(entry.amount)?;

        Ok(ValidatedEntry {
            email_id: entry.email_id,
            email_subject: entry.email_subject,
            email_date: entry.email_date,
            merchant_name: non_blank(entry.merchant_name)
                .unwrap_or_else(|| UNKNOWN_MERCHANT.to_string()),
            amount,
            date: entry.date,
            category: non_blank(entry.category)
                .unwrap_or_else(|| Category::default().to_string()),
            description: non_blank(entry.description)
                .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
            receipt_text: entry.receipt_text.unwrap_or_default(),
        })
    }
}

/// Full replacement of the user-editable fields of an entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerUpdate {
    pub merchant_name: String,
    pub amount: Money,
    pub date: NaiveDate,
    pub category: String,
    #[serde(default)]
    pub description: String,
}

impl LedgerUpdate {
    pub fn validate(mut self) -> Result<LedgerUpdate, LedgerError> {
        self.amount = check_amount(self.amount)?;
        Ok(self)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
