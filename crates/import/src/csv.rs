use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::io::Read;
use std::str::FromStr;
use tally_core::{BankTransaction, Money};
use thiserror::Error;

/// Header names accepted for each field, in priority order.
const AMOUNT_HEADERS: &[&str] = &["amount", "Amount", "AMOUNT", "Transaction Amount"];
const DATE_HEADERS: &[&str] = &["date", "Date", "DATE", "Transaction Date"];
const DESCRIPTION_HEADERS: &[&str] =
    &["description", "Description", "DESC", "Transaction Description"];

#[derive(Error, Debug)]
pub enum CsvError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
}

/// Parses a bank statement whose first record is a header row.
///
/// Quoted fields follow RFC 4180, so a quoted comma stays inside its cell.
/// Rows are mapped header → cell by position; cells missing at the end of a
/// short row read as empty. Cells that are not valid UTF-8 are decoded
/// lossily. Rows without a usable non-zero amount are dropped rather than
/// reported.
pub fn parse_statement<R: Read>(data: R) -> Result<Vec<BankTransaction>, CsvError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(data);

    let mut records = reader.byte_records();
    let headers: Vec<String> = match records.next() {
        Some(record) => decode(&record?).iter().map(|c| clean_cell(c)).collect(),
        None => return Ok(Vec::new()),
    };

    let mut transactions = Vec::new();
    for (index, result) in records.enumerate() {
        let record = decode(&result?);
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        let row: BTreeMap<String, String> = headers
            .iter()
            .enumerate()
            .map(|(i, header)| (header.clone(), record.get(i).map(|c| clean_cell(c)).unwrap_or_default()))
            .collect();

        let amount = match lookup(&row, AMOUNT_HEADERS).map(parse_amount) {
            Some(Ok(amount)) if !amount.is_zero() => amount,
            Some(Err(e)) => {
                tracing::debug!(row = index + 2, error = %e, "dropping statement row");
                continue;
            }
            _ => continue,
        };

        transactions.push(BankTransaction {
            date: lookup(&row, DATE_HEADERS).unwrap_or_default().to_string(),
            description: lookup(&row, DESCRIPTION_HEADERS).unwrap_or_default().trim().to_string(),
            amount: amount.abs(),
            original_row: row,
        });
    }

    tracing::info!(count = transactions.len(), "parsed bank statement");
    Ok(transactions)
}

fn decode(record: &csv::ByteRecord) -> Vec<String> {
    record
        .iter()
        .map(|cell| String::from_utf8_lossy(cell).into_owned())
        .collect()
}

fn clean_cell(cell: &str) -> String {
    cell.trim().replace('"', "")
}

/// First non-empty value among `aliases`.
fn lookup<'a>(row: &'a BTreeMap<String, String>, aliases: &[&str]) -> Option<&'a str> {
    aliases
        .iter()
        .filter_map(|alias| row.get(*alias))
        .map(String::as_str)
        .find(|value| !value.is_empty())
}

/// Accepts `$`, thousands separators and accounting parentheses.
fn parse_amount(s: &str) -> Result<Money, CsvError> {
    let s = s.trim();
    let (negative, s) = if s.starts_with('(') && s.ends_with(')') && s.len() >= 2 {
        (true, &s[1..s.len() - 1])
    } else {
        (false, s)
    };
    let s = s.replace([',', '$', ' '], "");
    let mut dec = Decimal::from_str(&s).map_err(|_| CsvError::InvalidAmount(s.to_string()))?;
    if negative {
        dec = -dec;
    }
    Ok(Money::from(dec))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cents(c: i64) -> Money {
        Money::from_cents(c)
    }

    fn parse(data: &str) -> Vec<BankTransaction> {
        parse_statement(data.as_bytes()).unwrap()
    }

    // ── parse_amount ──────────────────────────────────────────────────────────

    #[test]
    fn parse_amount_plain() {
        assert_eq!(parse_amount("123.45").unwrap(), cents(12345));
    }

    #[test]
    fn parse_amount_with_dollar_sign_and_commas() {
        assert_eq!(parse_amount("$1,234.56").unwrap(), cents(123456));
    }

    #[test]
    fn parse_amount_accounting_parens() {
        assert_eq!(parse_amount("(75.25)").unwrap(), cents(-7525));
    }

    #[test]
    fn parse_amount_invalid() {
        assert!(parse_amount("not_a_number").is_err());
        assert!(parse_amount("").is_err());
        assert!(parse_amount("()").is_err());
    }

    // ── parse_statement ───────────────────────────────────────────────────────

    #[test]
    fn basic_statement() {
        let txs = parse("Date,Description,Amount\n2024-01-15,WAL-MART #5106,-15.98\n2024-01-16,SHELL OIL,40.00\n");
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].date, "2024-01-15");
        assert_eq!(txs[0].description, "WAL-MART #5106");
        assert_eq!(txs[0].amount, cents(1598));
        assert_eq!(txs[0].original_row.get("Amount").map(String::as_str), Some("-15.98"));
        assert_eq!(txs[1].amount, cents(4000));
    }

    #[test]
    fn negative_amount_becomes_absolute() {
        let txs = parse("date,description,amount\n01/02/2024,Coffee,-42.50\n");
        assert_eq!(txs[0].amount, cents(4250));
    }

    #[test]
    fn non_numeric_and_zero_amounts_are_dropped() {
        let txs = parse("date,description,amount\n2024-01-01,A,abc\n2024-01-02,B,0.00\n2024-01-03,C,\n2024-01-04,D,9.99\n");
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].description, "D");
    }

    #[test]
    fn long_form_headers() {
        let txs = parse("Transaction Date,Transaction Description,Transaction Amount\n2024-02-01,AMAZON MKTPLACE,$25.00\n");
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].date, "2024-02-01");
        assert_eq!(txs[0].description, "AMAZON MKTPLACE");
        assert_eq!(txs[0].amount, cents(2500));
    }

    #[test]
    fn first_non_empty_alias_wins() {
        let txs = parse("amount,Amount,DESC\n,12.00,Fallback amount\n");
        assert_eq!(txs[0].amount, cents(1200));
        assert_eq!(txs[0].description, "Fallback amount");
        assert_eq!(txs[0].date, "");
    }

    #[test]
    fn short_rows_and_blank_lines() {
        let txs = parse("Amount,Date,Description\n5.00\n\n,,\n7.25,2024-03-01\n");
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].description, "");
        assert_eq!(txs[0].original_row.get("Date").map(String::as_str), Some(""));
        assert_eq!(txs[1].date, "2024-03-01");
    }

    #[test]
    fn quoted_fields_keep_embedded_commas() {
        let txs = parse("\"Date\",\"Description\",\"Amount\"\n\"2024-01-15\",\"ACME, INC\",\"1,200.00\"\n");
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].description, "ACME, INC");
        assert_eq!(txs[0].amount, cents(120000));
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(parse("").is_empty());
        assert!(parse("Date,Description,Amount\n").is_empty());
    }

    #[test]
    fn crlf_line_endings() {
        let txs = parse("Date,Description,Amount\r\n2024-01-15,Store,3.50\r\n");
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].amount, cents(350));
    }

    #[test]
    fn latin1_cell_is_decoded_lossily() {
        let data: &[u8] = b"Date,Description,Amount\n2024-01-15,WALMART,15.98\n2024-01-16,CAF\xE9 CORNER,4.50\n";
        let txs = parse_statement(data).unwrap();
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].description, "WALMART");
        assert_eq!(txs[1].description, "CAF\u{FFFD} CORNER");
        assert_eq!(txs[1].amount, cents(450));
    }
}
