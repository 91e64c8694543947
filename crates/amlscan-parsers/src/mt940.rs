//! MT940 (SWIFT) statement parser.
//!
//! Parses MT940/STA files exported by Polish banks into the same statement
//! and transaction shape the PDF parser produces, enabling cross-validation
//! between the printed and electronic statement data.
//!
//! Field reference:
//!   :20:  transaction reference number
//!   :25:  account identification (IBAN)
//!   :28C: statement number / sequence number
//!   :60F: opening balance (F=first, M=intermediate)
//!   :61:  statement line (transaction)
//!   :86:  information to account owner (transaction details)
//!   :62F: closing balance
//!   :64:  available balance

use std::collections::BTreeMap;
use std::path::Path;

use amlscan_core::{
    AmlError, AmlResult, Direction, ParseMethod, ParseOutcome, RawTransaction, StatementInfo,
};
use chrono::{Datelike, NaiveDate};
use encoding_rs::{ISO_8859_2, WINDOWS_1250, WINDOWS_1252};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::amounts::expand_two_digit_year;

/// Single parsed MT940 transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mt940Transaction {
    pub value_date: Option<NaiveDate>,
    pub entry_date: Option<NaiveDate>,
    pub direction: Direction,
    /// Always positive; see [`Mt940Transaction::signed_amount`].
    pub amount: Decimal,
    /// SWIFT S-type code, e.g. "073".
    pub swift_code: String,
    /// Bank reference id from the :61: tail.
    pub reference: String,
    /// Counterparty name/address from ~32/~33.
    pub counterparty: String,
    /// Title from ~20..~25.
    pub title: String,
    /// Counterparty IBAN from ~38.
    pub counterparty_account: String,
    /// Counterparty bank code from ~30.
    pub counterparty_bank: String,
    /// Full :86: content.
    pub raw_86: String,
    pub row_index: usize,
}

impl Mt940Transaction {
    /// Signed amount: debits negative, credits positive.
    pub fn signed_amount(&self) -> Decimal {
        match self.direction {
            Direction::Debit => -self.amount,
            Direction::Credit => self.amount,
        }
    }
}

/// Parsed MT940 statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mt940Statement {
    pub account_number: String,
    pub account_holder: String,
    pub statement_number: String,
    pub opening_balance: Decimal,
    pub closing_balance: Decimal,
    pub available_balance: Option<Decimal>,
    pub currency: String,
    pub balance_date: Option<NaiveDate>,
    pub transactions: Vec<Mt940Transaction>,
    pub total_debits: Decimal,
    pub total_credits: Decimal,
    pub debit_count: usize,
    pub credit_count: usize,
}

static RE_61: Lazy<Regex> = Lazy::new(|| {
    // YYMMDD MMDD R?[DC] amount,dd S<code> reference
    Regex::new(r"^:61:(\d{6})(\d{4})(R?[DC])(\d+,\d{2})S(\d+)(.*)$").expect("static regex")
});
static RE_BALANCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([CD])(\d{6})([A-Z]{3})(\d+,\d{2})").expect("static regex"));
static RE_HOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r":86:NAME ACCOUNT OWNER:(.+)").expect("static regex"));
static RE_SUBFIELD: Lazy<Regex> = Lazy::new(|| Regex::new(r"~(\d{2})").expect("static regex"));

/// Parse an MT940/STA file, detecting the encoding.
pub fn parse_mt940_file(path: &Path) -> AmlResult<Mt940Statement> {
    let bytes = std::fs::read(path)?;
    parse_mt940_bytes(&bytes)
}

/// Parse MT940 content from raw bytes.
///
/// Encodings are tried in order UTF-8, CP1250, ISO-8859-2, Latin-1; the
/// first decoding whose first 200 characters contain `:20:` or `:25:` wins.
pub fn parse_mt940_bytes(bytes: &[u8]) -> AmlResult<Mt940Statement> {
    let text = decode_mt940(bytes)?;
    Ok(parse_mt940_text(&text))
}

fn looks_like_mt940(text: &str) -> bool {
    let head: String = text.chars().take(200).collect();
    head.contains(":20:") || head.contains(":25:")
}

fn decode_mt940(bytes: &[u8]) -> AmlResult<String> {
    if let Ok(s) = std::str::from_utf8(bytes) {
        if looks_like_mt940(s) {
            return Ok(s.to_string());
        }
    }
    for encoding in [WINDOWS_1250, ISO_8859_2] {
        let (decoded, _, had_errors) = encoding.decode(bytes);
        if !had_errors && looks_like_mt940(&decoded) {
            return Ok(decoded.into_owned());
        }
    }
    // Latin-1 style fallback never fails to decode.
    let (decoded, _, _) = WINDOWS_1252.decode(bytes);
    if looks_like_mt940(&decoded) {
        Ok(decoded.into_owned())
    } else {
        Err(AmlError::unsupported(
            "file does not look like MT940 (no :20:/:25: tag in header)".to_string(),
        ))
    }
}

/// Parse MT940 content from a string.
pub fn parse_mt940_text(text: &str) -> Mt940Statement {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");

    let account_number = extract_tag(&text, "25")
        .unwrap_or_default()
        .trim_start_matches('/')
        .trim()
        .to_string();
    let statement_number = extract_tag(&text, "28C").unwrap_or_default();

    let opening_raw = extract_tag(&text, "60F")
        .or_else(|| extract_tag(&text, "60M"))
        .unwrap_or_default();
    let (opening_balance, currency, balance_date) = parse_balance_field(&opening_raw);

    let closing_raw = extract_tag(&text, "62F")
        .or_else(|| extract_tag(&text, "62M"))
        .unwrap_or_default();
    let (closing_balance, _, _) = parse_balance_field(&closing_raw);

    let available_balance = extract_tag(&text, "64").map(|raw| parse_balance_field(&raw).0);

    let account_holder = RE_HOLDER
        .captures(&text)
        .map(|m| m[1].trim().to_string())
        .unwrap_or_default();

    let transactions = parse_transactions(&text, balance_date);

    let total_debits: Decimal = transactions
        .iter()
        .filter(|t| t.direction == Direction::Debit)
        .map(|t| t.amount)
        .sum();
    let total_credits: Decimal = transactions
        .iter()
        .filter(|t| t.direction == Direction::Credit)
        .map(|t| t.amount)
        .sum();
    let debit_count = transactions
        .iter()
        .filter(|t| t.direction == Direction::Debit)
        .count();
    let credit_count = transactions.len() - debit_count;

    Mt940Statement {
        account_number,
        account_holder,
        statement_number,
        opening_balance,
        closing_balance,
        available_balance,
        currency: if currency.is_empty() {
            "PLN".to_string()
        } else {
            currency
        },
        balance_date,
        transactions,
        total_debits,
        total_credits,
        debit_count,
        credit_count,
    }
}

/// Extract the value of a `:TAG:` field (everything up to the next tag
/// line or the end of input).
fn extract_tag(text: &str, tag: &str) -> Option<String> {
    let marker = format!(":{tag}:");
    let start = text.find(&marker)? + marker.len();
    let rest = &text[start..];
    let end = rest.find("\n:").unwrap_or(rest.len());
    Some(rest[..end].trim().to_string())
}

/// Parse a balance field like `C260131PLN4200,82`.
fn parse_balance_field(raw: &str) -> (Decimal, String, Option<NaiveDate>) {
    let Some(m) = RE_BALANCE.captures(raw) else {
        return (Decimal::ZERO, String::new(), None);
    };
    let sign = if &m[1] == "C" {
        Decimal::ONE
    } else {
        -Decimal::ONE
    };
    let date = parse_yymmdd(&m[2]);
    let currency = m[3].to_string();
    let amount = m[4]
        .replace(',', ".")
        .parse::<Decimal>()
        .unwrap_or(Decimal::ZERO);
    (amount * sign, currency, date)
}

/// Parse `YYMMDD` to a date.
fn parse_yymmdd(s: &str) -> Option<NaiveDate> {
    if s.len() != 6 {
        return None;
    }
    let yy: i32 = s[..2].parse().ok()?;
    let mm: u32 = s[2..4].parse().ok()?;
    let dd: u32 = s[4..6].parse().ok()?;
    NaiveDate::from_ymd_opt(expand_two_digit_year(yy), mm, dd)
}

/// Infer the full entry date from an `MMDD` fragment.
///
/// The value date's year is authoritative; the statement period end year is
/// the fallback. When the naive combination lands more than ~6 months away
/// from the value date the year is adjusted, which handles entries booked
/// across the December/January boundary.
fn infer_entry_date(
    mmdd: &str,
    value_date: Option<NaiveDate>,
    period_end: Option<NaiveDate>,
) -> Option<NaiveDate> {
    if mmdd.len() != 4 {
        return None;
    }
    let mm: u32 = mmdd[..2].parse().ok()?;
    let dd: u32 = mmdd[2..].parse().ok()?;
    let year = value_date.or(period_end)?.year();
    let candidate = NaiveDate::from_ymd_opt(year, mm, dd)?;

    if let Some(vd) = value_date {
        let days = (candidate - vd).num_days();
        if days > 180 {
            return NaiveDate::from_ymd_opt(year - 1, mm, dd);
        }
        if days < -180 {
            return NaiveDate::from_ymd_opt(year + 1, mm, dd);
        }
    }
    Some(candidate)
}

/// Extract all `:61:` + `:86:` transaction pairs.
fn parse_transactions(text: &str, period_end: Option<NaiveDate>) -> Vec<Mt940Transaction> {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut transactions = Vec::new();
    let mut i = 0;
    let mut row_index = 0;

    while i < lines.len() {
        let line = lines[i].trim();
        if !line.starts_with(":61:") {
            i += 1;
            continue;
        }
        let Some(m) = RE_61.captures(line) else {
            warn!(line = &line[..line.len().min(80)], "unparseable :61: line");
            i += 1;
            continue;
        };

        let value_date = parse_yymmdd(&m[1]);
        let entry_date = infer_entry_date(&m[2], value_date, period_end);
        // D = debit, C = credit; reversals flip: RD = credit, RC = debit.
        let direction = match &m[3] {
            "D" | "RC" => Direction::Debit,
            _ => Direction::Credit,
        };
        let amount = m[4]
            .replace(',', ".")
            .parse::<Decimal>()
            .unwrap_or(Decimal::ZERO);
        let swift_code = m[5].to_string();
        let reference = m[6].trim().to_string();

        // Collect the :86: block (may span several continuation lines).
        i += 1;
        let mut raw_86_lines: Vec<String> = Vec::new();
        while i < lines.len() {
            let l = lines[i].trim();
            if let Some(content) = l.strip_prefix(":86:") {
                raw_86_lines.push(content.to_string());
                i += 1;
            } else if l.starts_with(":61:") || l.starts_with(":62") || l.starts_with(":64:") {
                break;
            } else if l.starts_with('~') || (!raw_86_lines.is_empty() && !l.starts_with(':')) {
                raw_86_lines.push(l.to_string());
                i += 1;
            } else {
                i += 1;
                break;
            }
        }
        let raw_86 = raw_86_lines.join("\n");

        let subfields = parse_86_subfields(&raw_86);
        let counterparty = format!(
            "{} {}",
            subfields.get("32").map(String::as_str).unwrap_or(""),
            subfields.get("33").map(String::as_str).unwrap_or(""),
        )
        .trim()
        .to_string();
        let title = (20..=25)
            .filter_map(|k| subfields.get(&k.to_string()))
            .filter(|s| !s.is_empty())
            .cloned()
            .collect::<Vec<_>>()
            .join(" ")
            .trim()
            .to_string();

        transactions.push(Mt940Transaction {
            value_date,
            entry_date,
            direction,
            amount,
            swift_code,
            reference,
            counterparty,
            title,
            counterparty_account: subfields.get("38").cloned().unwrap_or_default(),
            counterparty_bank: subfields.get("30").cloned().unwrap_or_default(),
            raw_86,
            row_index,
        });
        row_index += 1;
    }

    transactions
}

/// Parse `~XX` subfield notation from :86: content.
///
/// Format: `~00code~20line1~21line2~30bank~31account~32name~33address~38iban`.
/// Repeated keys concatenate with a space.
fn parse_86_subfields(raw: &str) -> BTreeMap<String, String> {
    let mut result = BTreeMap::new();

    let markers: Vec<(usize, usize, String)> = RE_SUBFIELD
        .captures_iter(raw)
        .map(|c| {
            let m = c.get(0).expect("whole match");
            (m.start(), m.end(), c[1].to_string())
        })
        .collect();

    if let Some((first_start, _, _)) = markers.first() {
        let prefix = raw[..*first_start].trim();
        if !prefix.is_empty() {
            result.insert("type_prefix".to_string(), prefix.to_string());
        }
    } else if !raw.trim().is_empty() {
        result.insert("type_prefix".to_string(), raw.trim().to_string());
    }

    for (idx, (_, end, key)) in markers.iter().enumerate() {
        let value_end = markers
            .get(idx + 1)
            .map(|(next_start, _, _)| *next_start)
            .unwrap_or(raw.len());
        let value = raw[*end..value_end].trim().replace('\n', " ");
        result
            .entry(key.clone())
            .and_modify(|existing: &mut String| {
                existing.push(' ');
                existing.push_str(&value);
            })
            .or_insert(value);
    }

    result
}

/// Convert a parsed MT940 statement into the common parse outcome shape.
pub fn to_parse_outcome(stmt: &Mt940Statement) -> ParseOutcome {
    let mut info = StatementInfo::new("mt940", "MT940");
    info.account_number = stmt.account_number.chars().filter(|c| !c.is_whitespace()).collect();
    info.account_holder = stmt.account_holder.clone();
    info.opening_balance = Some(stmt.opening_balance);
    info.closing_balance = Some(stmt.closing_balance);
    info.available_balance = stmt.available_balance;
    info.currency = stmt.currency.clone();
    info.declared_credits_sum = Some(stmt.total_credits);
    info.declared_credits_count = Some(stmt.credit_count as u32);
    info.declared_debits_sum = Some(stmt.total_debits);
    info.declared_debits_count = Some(stmt.debit_count as u32);

    let mut outcome = ParseOutcome::new(info, ParseMethod::Mt940);
    for tx in &stmt.transactions {
        let Some(date) = tx.entry_date.or(tx.value_date) else {
            outcome
                .warnings
                .push(format!("Pominięto wiersz MT940 #{} bez daty", tx.row_index + 1));
            continue;
        };
        let mut raw = RawTransaction::new(date, tx.signed_amount());
        raw.value_date = tx.value_date;
        raw.currency = stmt.currency.clone();
        raw.counterparty = tx.counterparty.clone();
        raw.title = tx.title.clone();
        raw.raw_text = tx.raw_86.chars().take(500).collect();
        raw.bank_category = tx.swift_code.clone();
        outcome.transactions.push(raw);
    }
    outcome
}

/// One matched transaction pair in a cross-validation report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxMatch {
    pub mt940_idx: usize,
    pub pdf_idx: usize,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub mt940_counterparty: String,
    pub pdf_counterparty: String,
}

/// A transaction present on only one side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnmatchedTx {
    pub idx: usize,
    pub date: Option<NaiveDate>,
    pub amount: Decimal,
    pub counterparty: String,
}

/// A compared balance or total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueCheck {
    pub mt940: Decimal,
    pub pdf: Decimal,
    pub matches: bool,
}

/// Cross-validation report between MT940 and PDF parse results.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrossValidation {
    pub mt940_tx_count: usize,
    pub pdf_tx_count: usize,
    pub matches: Vec<TxMatch>,
    pub mt940_only: Vec<UnmatchedTx>,
    pub pdf_only: Vec<UnmatchedTx>,
    pub balance_check: BTreeMap<String, ValueCheck>,
    pub totals_check: BTreeMap<String, ValueCheck>,
    /// Percentage of MT940 transactions matched in the PDF.
    pub match_rate: f64,
}

const CROSS_TOLERANCE: &str = "0.01";

/// Compare MT940 data with PDF-parsed data.
///
/// Transactions match on (entry date, signed amount) within 0.01. This is a
/// diagnostic report, never a gate: mismatches don't fail the parse.
pub fn cross_validate(
    mt940: &Mt940Statement,
    pdf_transactions: &[RawTransaction],
    pdf_info: &StatementInfo,
) -> CrossValidation {
    let tolerance: Decimal = CROSS_TOLERANCE.parse().expect("static decimal");
    let mut report = CrossValidation {
        mt940_tx_count: mt940.transactions.len(),
        pdf_tx_count: pdf_transactions.len(),
        ..Default::default()
    };

    for (label, mt940_value, pdf_value) in [
        (
            "opening_balance",
            mt940.opening_balance,
            pdf_info.opening_balance,
        ),
        (
            "closing_balance",
            mt940.closing_balance,
            pdf_info.closing_balance,
        ),
    ] {
        if let Some(pdf_value) = pdf_value {
            report.balance_check.insert(
                label.to_string(),
                ValueCheck {
                    mt940: mt940_value,
                    pdf: pdf_value,
                    matches: (pdf_value - mt940_value).abs() < tolerance,
                },
            );
        }
    }

    for (label, mt940_value, pdf_value) in [
        (
            "total_credits",
            mt940.total_credits,
            pdf_info.declared_credits_sum,
        ),
        (
            "total_debits",
            mt940.total_debits,
            pdf_info.declared_debits_sum,
        ),
        (
            "credit_count",
            Decimal::from(mt940.credit_count),
            pdf_info.declared_credits_count.map(Decimal::from),
        ),
        (
            "debit_count",
            Decimal::from(mt940.debit_count),
            pdf_info.declared_debits_count.map(Decimal::from),
        ),
    ] {
        if let Some(pdf_value) = pdf_value {
            report.totals_check.insert(
                label.to_string(),
                ValueCheck {
                    mt940: mt940_value,
                    pdf: pdf_value,
                    matches: (pdf_value - mt940_value).abs() < tolerance,
                },
            );
        }
    }

    let mut pdf_used = vec![false; pdf_transactions.len()];
    for mt_tx in &mt940.transactions {
        let mt_amount = mt_tx.signed_amount();
        let mut found = false;
        for (j, pdf_tx) in pdf_transactions.iter().enumerate() {
            if pdf_used[j] {
                continue;
            }
            if Some(pdf_tx.booking_date) == mt_tx.entry_date
                && (pdf_tx.amount - mt_amount).abs() < tolerance
            {
                report.matches.push(TxMatch {
                    mt940_idx: mt_tx.row_index,
                    pdf_idx: j,
                    date: pdf_tx.booking_date,
                    amount: mt_amount,
                    mt940_counterparty: mt_tx.counterparty.clone(),
                    pdf_counterparty: pdf_tx.counterparty.clone(),
                });
                pdf_used[j] = true;
                found = true;
                break;
            }
        }
        if !found {
            report.mt940_only.push(UnmatchedTx {
                idx: mt_tx.row_index,
                date: mt_tx.entry_date,
                amount: mt_amount,
                counterparty: mt_tx.counterparty.clone(),
            });
        }
    }

    for (j, pdf_tx) in pdf_transactions.iter().enumerate() {
        if !pdf_used[j] {
            report.pdf_only.push(UnmatchedTx {
                idx: j,
                date: Some(pdf_tx.booking_date),
                amount: pdf_tx.amount,
                counterparty: pdf_tx.counterparty.clone(),
            });
        }
    }

    report.match_rate =
        report.matches.len() as f64 / mt940.transactions.len().max(1) as f64 * 100.0;
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const SAMPLE: &str = "\
:20:MT940
:25:/PL12345678901234567890123456
:28C:9/1
:60F:C240101PLN1000,00
:61:2401050105D150,00S073REF001
:86:073~00073~20Zakup kartą~21BIEDRONKA~32BIEDRONKA SP Z O O~33WARSZAWA~38PL987654~30INGB
:61:2401100110C5000,00S041REF002
:86:041~00041~20Wynagrodzenie~25za styczeń~32FIRMA XYZ~30BPKO
:62F:C240131PLN5850,00
:64:C240131PLN5850,00
:86:NAME ACCOUNT OWNER:JAN KOWALSKI
";

    #[test]
    fn test_parse_sample_statement() {
        let stmt = parse_mt940_text(SAMPLE);
        assert_eq!(stmt.account_number, "PL12345678901234567890123456");
        assert_eq!(stmt.statement_number, "9/1");
        assert_eq!(stmt.opening_balance, dec!(1000.00));
        assert_eq!(stmt.closing_balance, dec!(5850.00));
        assert_eq!(stmt.available_balance, Some(dec!(5850.00)));
        assert_eq!(stmt.currency, "PLN");
        assert_eq!(stmt.account_holder, "JAN KOWALSKI");
        assert_eq!(stmt.transactions.len(), 2);
        assert_eq!(stmt.debit_count, 1);
        assert_eq!(stmt.credit_count, 1);
        assert_eq!(stmt.total_debits, dec!(150.00));
        assert_eq!(stmt.total_credits, dec!(5000.00));
    }

    #[test]
    fn test_transaction_fields() {
        let stmt = parse_mt940_text(SAMPLE);
        let tx = &stmt.transactions[0];
        assert_eq!(tx.value_date, Some("2024-01-05".parse().unwrap()));
        assert_eq!(tx.entry_date, Some("2024-01-05".parse().unwrap()));
        assert_eq!(tx.direction, Direction::Debit);
        assert_eq!(tx.amount, dec!(150.00));
        assert_eq!(tx.signed_amount(), dec!(-150.00));
        assert_eq!(tx.swift_code, "073");
        assert_eq!(tx.reference, "REF001");
        assert_eq!(tx.counterparty, "BIEDRONKA SP Z O O WARSZAWA");
        assert_eq!(tx.title, "Zakup kartą BIEDRONKA");
        assert_eq!(tx.counterparty_account, "PL987654");
        assert_eq!(tx.counterparty_bank, "INGB");

        let tx2 = &stmt.transactions[1];
        assert_eq!(tx2.direction, Direction::Credit);
        assert_eq!(tx2.title, "Wynagrodzenie za styczeń");
    }

    #[test]
    fn test_reversal_directions() {
        let text = ":25:/PL1\n:60F:C240101PLN0,00\n\
                    :61:2401050105RD100,00S073R1\n:86:073~20zwrot\n\
                    :61:2401060106RC200,00S073R2\n:86:073~20korekta\n\
                    :62F:C240131PLN0,00\n";
        let stmt = parse_mt940_text(text);
        // RD = reversal of debit → credit; RC = reversal of credit → debit.
        assert_eq!(stmt.transactions[0].direction, Direction::Credit);
        assert_eq!(stmt.transactions[1].direction, Direction::Debit);
    }

    #[test]
    fn test_entry_year_from_value_date_across_boundary() {
        // Value date 2024-01-02, entry date 1230 → December of 2023.
        let entry = infer_entry_date("1230", Some("2024-01-02".parse().unwrap()), None);
        assert_eq!(entry, Some("2023-12-30".parse().unwrap()));
        // Value date 2023-12-30, entry date 0102 → January of 2024.
        let entry = infer_entry_date("0102", Some("2023-12-30".parse().unwrap()), None);
        assert_eq!(entry, Some("2024-01-02".parse().unwrap()));
        // Fallback to period end year when the value date is missing.
        let entry = infer_entry_date("0615", None, Some("2025-06-30".parse().unwrap()));
        assert_eq!(entry, Some("2025-06-15".parse().unwrap()));
        assert_eq!(infer_entry_date("0615", None, None), None);
    }

    #[test]
    fn test_encoding_detection_cp1250() {
        // "Opłata" in CP1250: ł = 0xB3.
        let mut bytes = b":25:/PL1\n:61:2401050105D10,00S073R\n:86:073~20Op".to_vec();
        bytes.push(0xB3);
        bytes.extend_from_slice(b"ata\n:62F:C240131PLN0,00\n");
        let stmt = parse_mt940_bytes(&bytes).unwrap();
        assert_eq!(stmt.transactions[0].title, "Opłata");
    }

    #[test]
    fn test_not_mt940_rejected() {
        let err = parse_mt940_bytes(b"not a swift file at all").unwrap_err();
        assert!(matches!(err, AmlError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_cross_validate() {
        let stmt = parse_mt940_text(SAMPLE);
        let pdf = vec![
            RawTransaction::new("2024-01-05".parse().unwrap(), dec!(-150.00))
                .with_counterparty("BIEDRONKA"),
            RawTransaction::new("2024-01-20".parse().unwrap(), dec!(-42.00))
                .with_counterparty("INNA FIRMA"),
        ];
        let mut info = StatementInfo::new("ing", "ING");
        info.opening_balance = Some(dec!(1000.00));
        info.closing_balance = Some(dec!(5000.00));
        info.declared_credits_sum = Some(dec!(5000.00));

        let report = cross_validate(&stmt, &pdf, &info);
        assert_eq!(report.matches.len(), 1);
        assert_eq!(report.mt940_only.len(), 1);
        assert_eq!(report.pdf_only.len(), 1);
        assert!(report.balance_check["opening_balance"].matches);
        assert!(!report.balance_check["closing_balance"].matches);
        assert!(report.totals_check["total_credits"].matches);
        assert_eq!(report.match_rate, 50.0);
    }

    #[test]
    fn test_to_parse_outcome() {
        let stmt = parse_mt940_text(SAMPLE);
        let outcome = to_parse_outcome(&stmt);
        assert_eq!(outcome.transactions.len(), 2);
        assert_eq!(outcome.transactions[0].amount, dec!(-150.00));
        assert_eq!(outcome.info.declared_credits_count, Some(1));
        assert_eq!(outcome.parse_method, ParseMethod::Mt940);
    }
}
