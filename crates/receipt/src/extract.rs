use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{NaiveDate, Utc};
use regex::{Captures, Regex};
use rust_decimal::Decimal;
use tally_core::{Money, DEFAULT_DESCRIPTION, UNKNOWN_MERCHANT};

use crate::rules;
use crate::types::ExtractedReceipt;

/// Lines inspected for a merchant before falling back to the whole text.
const MERCHANT_LINE_WINDOW: usize = 15;

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_currency, r"\$(\d+\.\d{2})");
re!(re_bare_amount, r"(\d+\.\d{2})");

re!(re_date_iso, r"(\d{4})-(\d{2})-(\d{2})");
re!(re_date_us_slash, r"(\d{2})/(\d{2})/(\d{4})");
re!(re_date_us_dash, r"(\d{2})-(\d{2})-(\d{4})");
re!(re_date_short, r"(\d{1,2})/(\d{1,2})/(\d{2,4})");

// ── Date patterns ─────────────────────────────────────────────────────────────

/// Field order of a date pattern's three capture groups.
#[derive(Debug, Clone, Copy)]
enum DateLayout {
    YearMonthDay,
    MonthDayYear,
}

struct DatePattern {
    regex: fn() -> &'static Regex,
    layout: DateLayout,
}

/// Tried in order; only the first occurrence of each pattern is considered.
const DATE_PATTERNS: &[DatePattern] = &[
    DatePattern { regex: re_date_iso, layout: DateLayout::YearMonthDay },
    DatePattern { regex: re_date_us_slash, layout: DateLayout::MonthDayYear },
    DatePattern { regex: re_date_us_dash, layout: DateLayout::MonthDayYear },
    DatePattern { regex: re_date_short, layout: DateLayout::MonthDayYear },
];

fn earliest_receipt_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default()
}

// ── Public extraction API ─────────────────────────────────────────────────────

pub struct Extractor;

impl Extractor {
    /// Extract structured fields from raw receipt text, judging dates against
    /// today's UTC date.
    pub fn extract(text: &str) -> ExtractedReceipt {
        Self::extract_on(text, Utc::now().date_naive())
    }

    /// Same as [`Extractor::extract`] with an explicit "today".
    pub fn extract_on(text: &str, today: NaiveDate) -> ExtractedReceipt {
        let lines: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();

        if lines.is_empty() {
            tracing::debug!("empty receipt text, nothing to extract");
            return ExtractedReceipt::invalid();
        }

        let text_lower = text.to_lowercase();
        let merchant_name = Self::extract_merchant(&lines, &text_lower);
        let amount = Self::extract_amount(text, &lines);
        let date = Self::extract_date(text, today).unwrap_or(today);
        let category = rules::categorize(&merchant_name, &text_lower);

        let description = if !merchant_name.is_empty() && amount.is_positive() {
            format!("Purchase from {merchant_name} for {amount}")
        } else {
            DEFAULT_DESCRIPTION.to_string()
        };

        tracing::debug!(merchant = %merchant_name, %amount, %date, %category, "receipt extracted");

        ExtractedReceipt {
            merchant_name,
            amount,
            date: Some(date),
            category: Some(category),
            description,
            is_valid: true,
        }
    }

    // ── Merchant ──────────────────────────────────────────────────────────────

    fn extract_merchant(lines: &[&str], text_lower: &str) -> String {
        let window = lines.iter().copied().take(MERCHANT_LINE_WINDOW);
        rules::merchant_from_lines(window, text_lower)
            .or_else(|| rules::merchant_from_text(text_lower))
            .unwrap_or(UNKNOWN_MERCHANT)
            .to_string()
    }

    // ── Amount ────────────────────────────────────────────────────────────────

    fn extract_amount(text: &str, lines: &[&str]) -> Money {
        Self::largest_currency_amount(text)
            .or_else(|| Self::amount_near_total(lines))
            .unwrap_or_else(Money::zero)
    }

    /// Receipts list line items before the total, and the total is the
    /// largest figure, so the maximum `$D.DD` value is taken.
    fn largest_currency_amount(text: &str) -> Option<Money> {
        re_currency()
            .captures_iter(text)
            .filter_map(|c| parse_amount(c.get(1)?.as_str()))
            .filter(|m| is_plausible_amount(*m))
            .max()
    }

    /// Fallback for receipts that print bare numbers: the first plausible
    /// decimal on a line mentioning TOTAL, or on the line right after it.
    fn amount_near_total(lines: &[&str]) -> Option<Money> {
        lines.iter().enumerate().find_map(|(i, line)| {
            if !line.to_uppercase().contains("TOTAL") {
                return None;
            }
            std::iter::once(*line)
                .chain(lines.get(i + 1).copied())
                .find_map(|candidate| {
                    re_bare_amount()
                        .captures(candidate)
                        .and_then(|c| parse_amount(c.get(1)?.as_str()))
                        .filter(|m| is_plausible_amount(*m))
                })
        })
    }

    // ── Date ─────────────────────────────────────────────────────────────────

    fn extract_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
        let earliest = earliest_receipt_date();
        DATE_PATTERNS.iter().find_map(|pattern| {
            let c = (pattern.regex)().captures(text)?;
            let date = date_from_captures(&c, pattern.layout)?;
            (date > earliest && date <= today).then_some(date)
        })
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn is_plausible_amount(m: Money) -> bool {
    m.is_positive() && m < Money::from_cents(1_000_000)
}

fn parse_amount(s: &str) -> Option<Money> {
    Decimal::from_str(s).ok().map(Money::from)
}

fn date_from_captures(c: &Captures<'_>, layout: DateLayout) -> Option<NaiveDate> {
    let field = |i: usize| c.get(i).map(|m| m.as_str());
    let (year, month, day) = match layout {
        DateLayout::YearMonthDay => (field(1)?, field(2)?, field(3)?),
        DateLayout::MonthDayYear => (field(3)?, field(1)?, field(2)?),
    };
    let year = if year.len() == 2 {
        expand_two_digit_year(year.parse().ok()?)
    } else {
        year.parse().ok()?
    };
    NaiveDate::from_ymd_opt(year, month.parse().ok()?, day.parse().ok()?)
}

/// `00`–`49` are this century, `50`–`99` the last.
fn expand_two_digit_year(y: i32) -> i32 {
    if y < 50 { 2000 + y } else { 1900 + y }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
