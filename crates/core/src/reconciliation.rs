use serde::{Deserialize, Serialize};

use super::bank::BankTransaction;
use super::ledger::LedgerEntry;
use super::money::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchConfidence {
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedPair {
    pub bank_transaction: BankTransaction,
    pub ledger_entry: LedgerEntry,
    pub match_confidence: MatchConfidence,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerOnly {
    pub ledger_entry: LedgerEntry,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankOnly {
    pub bank_transaction: BankTransaction,
    pub reason: String,
}

/// Counts and amount totals per bucket. `total_ledger_amount` and
/// `total_bank_amount` cover the unmatched buckets only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComparisonSummary {
    pub total_matches: i64,
    pub total_ledger_only: i64,
    pub total_bank_only: i64,
    pub total_matched_amount: Money,
    pub total_ledger_amount: Money,
    pub total_bank_amount: Money,
}

/// Output of one reconciliation run. Every input row lands in exactly one
/// of `matches`, `ledger_only` or `bank_only`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    pub matches: Vec<MatchedPair>,
    pub ledger_only: Vec<LedgerOnly>,
    pub bank_only: Vec<BankOnly>,
    pub summary: ComparisonSummary,
}

/// A saved comparison summary. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationRecord {
    pub id: i64,
    pub created_at: String,
    pub total_matches: i64,
    pub total_ledger_only: i64,
    pub total_bank_only: i64,
    pub total_matched_amount: Money,
    pub total_ledger_amount: Money,
    pub total_bank_amount: Money,
}
