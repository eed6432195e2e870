//! Ordered rule tables for merchant and category detection.
//!
//! Each table is evaluated top to bottom and the first matching rule wins.
//! Keywords are compared as case-insensitive substrings.

use tally_core::Category;

pub const WALMART: &str = "WALMART";
pub const AMAZON: &str = "Amazon";
pub const ONLINE_STORE: &str = "Online Store";

const WALMART_KEYWORDS: &[&str] = &["wal*mart", "wal-mart", "walmart"];
const AMAZON_KEYWORDS: &[&str] = &["amazon"];

/// What a merchant rule yields once its keywords hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MerchantLabel {
    Fixed(&'static str),
    /// Generic order summaries: `Amazon` if Amazon is named anywhere in the
    /// receipt, otherwise `Online Store`.
    AmazonOrOnlineStore,
}

#[derive(Debug, Clone, Copy)]
pub struct MerchantRule {
    pub name: &'static str,
    pub keywords: &'static [&'static str],
    pub label: MerchantLabel,
}

impl MerchantRule {
    /// `haystack` must already be lowercased.
    pub fn matches(&self, haystack: &str) -> bool {
        self.keywords.iter().any(|k| haystack.contains(k))
    }

    /// `full_text` must already be lowercased.
    pub fn resolve(&self, full_text: &str) -> &'static str {
        match self.label {
            MerchantLabel::Fixed(name) => name,
            MerchantLabel::AmazonOrOnlineStore => {
                if AMAZON_KEYWORDS.iter().any(|k| full_text.contains(k)) {
                    AMAZON
                } else {
                    ONLINE_STORE
                }
            }
        }
    }
}

/// Tried against each of the first lines of the receipt, in order.
pub const LINE_RULES: &[MerchantRule] = &[
    MerchantRule {
        name: "walmart",
        keywords: WALMART_KEYWORDS,
        label: MerchantLabel::Fixed(WALMART),
    },
    MerchantRule {
        name: "amazon",
        keywords: AMAZON_KEYWORDS,
        label: MerchantLabel::Fixed(AMAZON),
    },
    MerchantRule {
        name: "order summary",
        keywords: &["order summary"],
        label: MerchantLabel::AmazonOrOnlineStore,
    },
];

/// Tried against the whole text when no line rule hit.
pub const FULL_TEXT_RULES: &[MerchantRule] = &[
    MerchantRule {
        name: "walmart",
        keywords: WALMART_KEYWORDS,
        label: MerchantLabel::Fixed(WALMART),
    },
    MerchantRule {
        name: "amazon",
        keywords: AMAZON_KEYWORDS,
        label: MerchantLabel::Fixed(AMAZON),
    },
];

#[derive(Debug, Clone, Copy)]
pub enum CategoryTrigger {
    /// Exact merchant label produced by the merchant rules.
    Merchant(&'static str),
    /// Any keyword present in the lowercased receipt text.
    Keywords(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy)]
pub struct CategoryRule {
    pub trigger: CategoryTrigger,
    pub category: Category,
}

impl CategoryRule {
    fn matches(&self, merchant: &str, text_lower: &str) -> bool {
        match self.trigger {
            CategoryTrigger::Merchant(name) => merchant == name,
            CategoryTrigger::Keywords(words) => words.iter().any(|w| text_lower.contains(w)),
        }
    }
}

pub const CATEGORY_RULES: &[CategoryRule] = &[
    CategoryRule {
        trigger: CategoryTrigger::Merchant(WALMART),
        category: Category::Groceries,
    },
    CategoryRule {
        trigger: CategoryTrigger::Merchant(AMAZON),
        category: Category::OnlineShopping,
    },
    CategoryRule {
        trigger: CategoryTrigger::Keywords(&["gas", "fuel", "shell"]),
        category: Category::Transportation,
    },
    CategoryRule {
        trigger: CategoryTrigger::Keywords(&["restaurant", "food", "dining"]),
        category: Category::Dining,
    },
];

/// First matching line rule over `lines`, in line order then rule order.
pub fn merchant_from_lines<'a, I>(lines: I, text_lower: &str) -> Option<&'static str>
where
    I: IntoIterator<Item = &'a str>,
{
    lines.into_iter().find_map(|line| {
        let line = line.to_lowercase();
        LINE_RULES
            .iter()
            .find(|rule| rule.matches(&line))
            .map(|rule| {
                tracing::debug!(rule = rule.name, line = %line, "merchant rule matched");
                rule.resolve(text_lower)
            })
    })
}

pub fn merchant_from_text(text_lower: &str) -> Option<&'static str> {
    FULL_TEXT_RULES
        .iter()
        .find(|rule| rule.matches(text_lower))
        .map(|rule| rule.resolve(text_lower))
}

/// Category for a receipt; `Retail` when no rule applies.
pub fn categorize(merchant: &str, text_lower: &str) -> Category {
    CATEGORY_RULES
        .iter()
        .find(|rule| rule.matches(merchant, text_lower))
        .map(|rule| rule.category)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walmart_variants_match_case_insensitively() {
        for line in ["WAL*MART", "wal-mart supercenter", "Walmart.com", "Thanks for shopping at WALMART"] {
            assert_eq!(merchant_from_lines([line], &line.to_lowercase()), Some(WALMART), "{line}");
        }
    }

    #[test]
    fn walmart_rule_outranks_amazon_on_same_line() {
        let line = "Amazon gift card sold at Walmart";
        assert_eq!(merchant_from_lines([line], &line.to_lowercase()), Some(WALMART));
    }

    #[test]
    fn earlier_line_wins_over_higher_priority_rule() {
        let lines = ["Amazon.com order", "WAL*MART"];
        let text = lines.join("\n").to_lowercase();
        assert_eq!(merchant_from_lines(lines, &text), Some(AMAZON));
    }

    #[test]
    fn order_summary_without_amazon_is_online_store() {
        let text = "order summary\nitems: 2";
        assert_eq!(merchant_from_lines(["Order Summary"], text), Some(ONLINE_STORE));
    }

    #[test]
    fn order_summary_with_amazon_elsewhere_is_amazon() {
        let text = "order summary\nsold by amazon services llc";
        assert_eq!(merchant_from_lines(["Order Summary"], text), Some(AMAZON));
    }

    #[test]
    fn no_line_rule_returns_none() {
        assert_eq!(merchant_from_lines(["Corner Bakery", "Receipt #12"], "corner bakery"), None);
    }

    #[test]
    fn full_text_rules_prefer_walmart() {
        assert_eq!(merchant_from_text("amazon ... wal-mart"), Some(WALMART));
        assert_eq!(merchant_from_text("amazon"), Some(AMAZON));
        assert_eq!(merchant_from_text("target"), None);
    }

    #[test]
    fn categorize_by_merchant_before_keywords() {
        assert_eq!(categorize(WALMART, "fuel"), Category::Groceries);
        assert_eq!(categorize(AMAZON, "restaurant"), Category::OnlineShopping);
    }

    #[test]
    fn categorize_by_keywords_in_order() {
        assert_eq!(categorize("Unknown Merchant", "shell station"), Category::Transportation);
        assert_eq!(categorize("Unknown Merchant", "fuel and food"), Category::Transportation);
        assert_eq!(categorize("Unknown Merchant", "thai dining room"), Category::Dining);
        assert_eq!(categorize("Unknown Merchant", "hardware"), Category::Retail);
    }
}
