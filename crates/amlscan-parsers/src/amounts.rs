//! Polish amount and date parsing primitives.

use std::str::FromStr;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;

static NON_AMOUNT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\d,.\-+]").expect("static regex"));
static ISO_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})").expect("static regex"));
static DMY_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})[.\-/](\d{1,2})[.\-/](\d{4})").expect("static regex"));
static DMY2_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})[.\-/](\d{1,2})[.\-/](\d{2})$").expect("static regex"));
static DM_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})[.\-/](\d{1,2})$").expect("static regex"));

/// Parse a Polish-format amount: `1 234,56`, `-1234.56`, `1.234,56`.
///
/// Non-breaking spaces and currency suffixes are tolerated. Returns `None`
/// for empty or non-numeric input.
pub fn parse_amount(text: &str) -> Option<Decimal> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let compact: String = trimmed
        .replace('\u{a0}', " ")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let mut s = NON_AMOUNT_RE.replace_all(&compact, "").into_owned();

    if s.contains(',') && s.contains('.') {
        // 1.234,56 -> 1234.56
        s = s.replace('.', "").replace(',', ".");
    } else if s.contains(',') {
        s = s.replace(',', ".");
    }
    Decimal::from_str(&s).ok()
}

/// Century pivot for two-digit years: `26` → 2026, `95` → 1995.
pub fn expand_two_digit_year(yy: i32) -> i32 {
    if yy < 80 {
        2000 + yy
    } else {
        1900 + yy
    }
}

/// Parse a date in the formats Polish banks print:
/// `YYYY-MM-DD`, `DD.MM.YYYY`, `DD.MM.YY`, and `DD.MM` with a year hint.
pub fn parse_date(text: &str, year_hint: Option<i32>) -> Option<NaiveDate> {
    let s = text.trim();
    if s.is_empty() {
        return None;
    }

    if let Some(m) = ISO_DATE_RE.captures(s) {
        return NaiveDate::from_ymd_opt(
            m[1].parse().ok()?,
            m[2].parse().ok()?,
            m[3].parse().ok()?,
        );
    }
    if let Some(m) = DMY_DATE_RE.captures(s) {
        return NaiveDate::from_ymd_opt(
            m[3].parse().ok()?,
            m[2].parse().ok()?,
            m[1].parse().ok()?,
        );
    }
    if let Some(m) = DMY2_DATE_RE.captures(s) {
        let year = expand_two_digit_year(m[3].parse().ok()?);
        return NaiveDate::from_ymd_opt(year, m[2].parse().ok()?, m[1].parse().ok()?);
    }
    if let Some(m) = DM_DATE_RE.captures(s) {
        let year = year_hint?;
        return NaiveDate::from_ymd_opt(year, m[2].parse().ok()?, m[1].parse().ok()?);
    }
    None
}
