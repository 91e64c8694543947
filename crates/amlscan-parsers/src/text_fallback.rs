//! Line-oriented fallback parser.
//!
//! Used when spatial parsing is impossible: OCR output has no reliable
//! word coordinates, and some exports have no detectable table header. A
//! transaction block starts at a line beginning with a date; following
//! non-date lines continue its description.

use amlscan_core::{ParseMethod, ParseOutcome, RawTransaction};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;

use crate::amounts::{parse_amount, parse_date};
use crate::header::{detect_bank, extract_info_common};

static BLOCK_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{2}[.\-/]\d{2}[.\-/]\d{2,4})").expect("static regex"));
static BLOCK_AMOUNT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([\-+]?\d[\d ]*[,.]\d{2})").expect("static regex"));

/// Parse transactions from raw statement text.
///
/// Amounts come from the last numeric values in each block; when the last
/// value is much larger than the one before it, it is taken as the running
/// balance instead of the amount.
pub fn parse_text_multiline(text: &str) -> Vec<RawTransaction> {
    let mut blocks: Vec<Vec<&str>> = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        let stripped = line.trim();
        if stripped.is_empty() {
            continue;
        }
        if BLOCK_DATE_RE.is_match(stripped) {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
            current.push(stripped);
        } else if !current.is_empty() {
            current.push(stripped);
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }

    let mut transactions = Vec::new();
    for block in blocks {
        let first_line = block[0];
        let Some(date_match) = BLOCK_DATE_RE.captures(first_line) else {
            continue;
        };
        let Some(date) = parse_date(&date_match[1], None) else {
            continue;
        };

        let full_block = block.join(" ");
        // Scan for amounts past the date prefix so the date's own digits
        // never count as a candidate amount.
        let date_end = date_match.get(0).map(|m| m.end()).unwrap_or(0);
        let body = &full_block[date_end..];
        let amounts: Vec<&str> = BLOCK_AMOUNT_RE
            .find_iter(body)
            .map(|m| m.as_str())
            .collect();
        if amounts.is_empty() {
            continue;
        }

        let mut amount = parse_amount(amounts[amounts.len() - 1]);
        let mut balance: Option<Decimal> = None;
        if amounts.len() >= 2 {
            let candidate_amount = parse_amount(amounts[amounts.len() - 2]);
            if let (Some(a), Some(b)) = (candidate_amount, amount) {
                // The trailing value dwarfs the previous one: treat it as
                // the running balance.
                if b.abs() > a.abs() * Decimal::TWO {
                    amount = Some(a);
                    balance = Some(b);
                }
            }
        }
        let Some(amount) = amount else {
            continue;
        };

        // Description is the block minus the date prefix and amount strings.
        let mut description = body.to_string();
        for a in &amounts {
            description = description.replacen(a, "", 1);
        }
        let description = description.split_whitespace().collect::<Vec<_>>().join(" ");

        let mut tx = RawTransaction::new(date, amount);
        tx.balance_after = balance;
        tx.title = description;
        tx.raw_text = full_block.chars().take(200).collect();
        transactions.push(tx);
    }

    transactions
}

/// Parse a whole statement from raw text: header metadata plus the
/// multiline transaction fallback.
pub fn parse_text_statement(text: &str, method: ParseMethod) -> ParseOutcome {
    let (bank_id, bank_name) = detect_bank(text);
    let mut info = extract_info_common(text);
    info.bank_id = bank_id;
    info.bank_name = bank_name;

    let mut outcome = ParseOutcome::new(info, method);
    outcome.transactions = parse_text_multiline(text);
    outcome
}
