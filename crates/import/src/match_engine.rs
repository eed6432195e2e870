use tally_core::{
    BankOnly, BankTransaction, ComparisonResult, ComparisonSummary, LedgerEntry, LedgerOnly,
    MatchConfidence, MatchedPair, Money,
};

pub const NO_BANK_MATCH: &str = "No matching bank transaction found";
pub const NO_LEDGER_MATCH: &str = "No matching ledger entry found";

/// Pairs bank statement rows with ledger entries.
///
/// A pair needs both an amount within `amount_tolerance` and a description
/// match against the entry's merchant name. Pairing is greedy: bank rows are
/// taken in input order and each claims the first unclaimed ledger entry it
/// matches, so the result depends on the order of both inputs.
pub struct ReconciliationEngine {
    pub amount_tolerance: Money,
    /// Length of the prefix used for partial description matches.
    pub prefix_len: usize,
}

impl Default for ReconciliationEngine {
    fn default() -> Self {
        Self {
            amount_tolerance: Money::from_cents(1),
            prefix_len: 5,
        }
    }
}

impl ReconciliationEngine {
    pub fn new(amount_tolerance: Money, prefix_len: usize) -> Self {
        Self {
            amount_tolerance,
            prefix_len,
        }
    }

    pub fn compare(&self, bank: &[BankTransaction], ledger: &[LedgerEntry]) -> ComparisonResult {
        let mut ledger_claimed = vec![false; ledger.len()];
        let mut bank_claimed = vec![false; bank.len()];
        let mut matches = Vec::new();

        for (bi, tx) in bank.iter().enumerate() {
            let hit = ledger.iter().enumerate().find(|(li, entry)| {
                !ledger_claimed[*li]
                    && self.amounts_match(tx.amount, entry.amount)
                    && self.descriptions_match(&tx.description, &entry.merchant_name)
            });

            if let Some((li, entry)) = hit {
                ledger_claimed[li] = true;
                bank_claimed[bi] = true;
                matches.push(MatchedPair {
                    bank_transaction: tx.clone(),
                    ledger_entry: entry.clone(),
                    match_confidence: MatchConfidence::High,
                });
            }
        }

        let ledger_only: Vec<LedgerOnly> = ledger
            .iter()
            .zip(&ledger_claimed)
            .filter(|(_, claimed)| !**claimed)
            .map(|(entry, _)| LedgerOnly {
                ledger_entry: entry.clone(),
                reason: NO_BANK_MATCH.to_string(),
            })
            .collect();

        let bank_only: Vec<BankOnly> = bank
            .iter()
            .zip(&bank_claimed)
            .filter(|(_, claimed)| !**claimed)
            .map(|(tx, _)| BankOnly {
                bank_transaction: tx.clone(),
                reason: NO_LEDGER_MATCH.to_string(),
            })
            .collect();

        let summary = ComparisonSummary {
            total_matches: matches.len() as i64,
            total_ledger_only: ledger_only.len() as i64,
            total_bank_only: bank_only.len() as i64,
            total_matched_amount: matches.iter().map(|m| m.bank_transaction.amount).sum(),
            total_ledger_amount: ledger_only.iter().map(|l| l.ledger_entry.amount).sum(),
            total_bank_amount: bank_only.iter().map(|b| b.bank_transaction.amount).sum(),
        };

        tracing::info!(
            matches = summary.total_matches,
            ledger_only = summary.total_ledger_only,
            bank_only = summary.total_bank_only,
            "reconciliation complete"
        );

        ComparisonResult {
            matches,
            ledger_only,
            bank_only,
            summary,
        }
    }

    pub fn amounts_match(&self, a: Money, b: Money) -> bool {
        a.distance(b) <= self.amount_tolerance
    }

    /// Equal, containment either way, or (both longer than the prefix) one
    /// containing the other's prefix. Compared after [`normalize`]; an empty
    /// side is contained in everything and so matches.
    pub fn descriptions_match(&self, a: &str, b: &str) -> bool {
        let a = normalize(a);
        let b = normalize(b);
        if a == b || a.contains(&b) || b.contains(&a) {
            return true;
        }
        let n = self.prefix_len;
        a.len() > n && b.len() > n && (a.contains(&b[..n]) || b.contains(&a[..n]))
    }
}

/// Lowercase and keep ASCII letters and digits only.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn cents(c: i64) -> Money {
        Money::from_cents(c)
    }

    fn entry(id: i64, merchant: &str, amount: i64) -> LedgerEntry {
        LedgerEntry {
            id,
            email_id: None,
            email_subject: None,
            email_date: None,
            merchant_name: merchant.to_string(),
            amount: cents(amount),
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            category: "Retail".to_string(),
            description: String::new(),
            receipt_text: String::new(),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn bank(description: &str, amount: i64) -> BankTransaction {
        BankTransaction::new("2024-01-15", description, cents(amount))
    }

    fn engine() -> ReconciliationEngine {
        ReconciliationEngine::default()
    }

    // ── normalize ─────────────────────────────────────────────────────────────

    #[test]
    fn normalize_strips_everything_but_ascii_alnum() {
        assert_eq!(normalize("WAL-MART #5106"), "walmart5106");
        assert_eq!(normalize("  Café & Co. "), "cafco");
        assert_eq!(normalize("***"), "");
    }

    // ── amounts_match ─────────────────────────────────────────────────────────

    #[test]
    fn tolerance_boundary() {
        let e = engine();
        assert!(e.amounts_match(cents(1000), cents(1001)));
        assert!(e.amounts_match(cents(1001), cents(1000)));
        assert!(!e.amounts_match(cents(1000), cents(1002)));
        assert!(e.amounts_match("10.005".parse().unwrap(), cents(1000)));
        assert!(!e.amounts_match("10.0101".parse().unwrap(), cents(1000)));
    }

    // ── descriptions_match ────────────────────────────────────────────────────

    #[test]
    fn description_equality_and_containment() {
        let e = engine();
        assert!(e.descriptions_match("WALMART", "walmart"));
        assert!(e.descriptions_match("WAL-MART SUPERCENTER #5106", "WALMART"));
        assert!(e.descriptions_match("Amazon", "AMAZON MKTPLACE PMTS"));
    }

    #[test]
    fn description_prefix_rule_needs_both_longer_than_prefix() {
        let e = engine();
        // "walmar" prefix "walma" appears in "walmasupercenter"
        assert!(e.descriptions_match("walmar", "walma supercenter"));
        // "shell" is exactly five characters, so only containment applies.
        assert!(!e.descriptions_match("shell", "shelby oil"));
        assert!(e.descriptions_match("shellx", "shelly shellx2"));
    }

    #[test]
    fn unrelated_descriptions_do_not_match() {
        assert!(!engine().descriptions_match("Target", "Costco Wholesale"));
    }

    #[test]
    fn empty_description_matches_anything() {
        assert!(engine().descriptions_match("", "WALMART"));
        assert!(engine().descriptions_match("!!!", "Amazon"));
    }

    // ── compare ───────────────────────────────────────────────────────────────

    #[test]
    fn walmart_scenario() {
        let ledger = vec![entry(1, "WALMART", 1598)];
        let statement = vec![bank("WAL-MART #5106", 1598)];
        let result = engine().compare(&statement, &ledger);

        assert_eq!(result.matches.len(), 1);
        assert_eq!(result.matches[0].match_confidence, MatchConfidence::High);
        assert_eq!(result.matches[0].ledger_entry.id, 1);
        assert!(result.ledger_only.is_empty());
        assert!(result.bank_only.is_empty());
        assert_eq!(result.summary.total_matches, 1);
        assert_eq!(result.summary.total_matched_amount, cents(1598));
        assert!(result.summary.total_ledger_amount.is_zero());
        assert!(result.summary.total_bank_amount.is_zero());
    }

    #[test]
    fn unmatched_rows_carry_reasons_and_totals() {
        let ledger = vec![entry(1, "Amazon", 2500), entry(2, "WALMART", 1598)];
        let statement = vec![bank("SHELL OIL 123", 4000), bank("WALMART", 1598)];
        let result = engine().compare(&statement, &ledger);

        assert_eq!(result.matches.len(), 1);
        assert_eq!(result.ledger_only.len(), 1);
        assert_eq!(result.ledger_only[0].ledger_entry.id, 1);
        assert_eq!(result.ledger_only[0].reason, NO_BANK_MATCH);
        assert_eq!(result.bank_only.len(), 1);
        assert_eq!(result.bank_only[0].bank_transaction.description, "SHELL OIL 123");
        assert_eq!(result.bank_only[0].reason, NO_LEDGER_MATCH);
        assert_eq!(result.summary.total_ledger_amount, cents(2500));
        assert_eq!(result.summary.total_bank_amount, cents(4000));
        assert_eq!(result.summary.total_matched_amount, cents(1598));
    }

    #[test]
    fn greedy_first_fit_follows_ledger_order() {
        let ledger = vec![entry(10, "WALMART", 1598), entry(11, "WALMART", 1598)];
        let statement = vec![bank("WALMART", 1598), bank("WALMART", 1598), bank("WALMART", 1598)];
        let result = engine().compare(&statement, &ledger);

        let ids: Vec<i64> = result.matches.iter().map(|m| m.ledger_entry.id).collect();
        assert_eq!(ids, vec![10, 11]);
        assert_eq!(result.bank_only.len(), 1);
        assert!(result.ledger_only.is_empty());
    }

    #[test]
    fn ledger_entry_is_claimed_only_once() {
        let ledger = vec![entry(1, "Amazon", 1000)];
        let statement = vec![bank("AMAZON", 1000), bank("AMAZON", 1001)];
        let result = engine().compare(&statement, &ledger);
        assert_eq!(result.matches.len(), 1);
        assert_eq!(result.bank_only.len(), 1);
        assert_eq!(result.bank_only[0].bank_transaction.amount, cents(1001));
    }

    #[test]
    fn every_row_lands_in_exactly_one_bucket() {
        let ledger = vec![
            entry(1, "WALMART", 1598),
            entry(2, "Amazon", 4210),
            entry(3, "Corner Bakery", 650),
            entry(4, "Unknown Merchant", 1200),
        ];
        let statement = vec![
            bank("AMAZON.COM*2K4", 4210),
            bank("CORNER BAKERY CAFE", 651),
            bank("NETFLIX", 1599),
            bank("WAL-MART", 1598),
        ];
        let result = engine().compare(&statement, &ledger);

        assert_eq!(result.matches.len() + result.ledger_only.len(), ledger.len());
        assert_eq!(result.matches.len() + result.bank_only.len(), statement.len());

        let mut ledger_ids: Vec<i64> = result
            .matches
            .iter()
            .map(|m| m.ledger_entry.id)
            .chain(result.ledger_only.iter().map(|l| l.ledger_entry.id))
            .collect();
        ledger_ids.sort_unstable();
        assert_eq!(ledger_ids, vec![1, 2, 3, 4]);
        assert_eq!(result.summary.total_matches, 3);
    }

    #[test]
    fn empty_inputs() {
        let result = engine().compare(&[], &[]);
        assert_eq!(result, ComparisonResult::default());

        let result = engine().compare(&[bank("X", 100)], &[]);
        assert_eq!(result.bank_only.len(), 1);
        assert_eq!(result.summary.total_bank_amount, cents(100));
    }

    #[test]
    fn inputs_are_not_mutated() {
        let ledger = vec![entry(1, "WALMART", 1598)];
        let statement = vec![bank("WALMART", 1598)];
        let before = (ledger.clone(), statement.clone());
        let _ = engine().compare(&statement, &ledger);
        assert_eq!((ledger, statement), before);
    }
}
