//! Common statement header extraction.
//!
//! Broad patterns that work across Polish banks' statement headers. The
//! closing-balance patterns must not swallow "saldo końcowe poprzedniego
//! wyciągu", which is the opening balance.

use amlscan_core::StatementInfo;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::amounts::{parse_amount, parse_date};

static IBAN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{2}\s?\d{4}\s?\d{4}\s?\d{4}\s?\d{4}\s?\d{4}\s?\d{4})").expect("static regex")
});

static PERIOD_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // "Nr X / DD.MM.YYYY - DD.MM.YYYY" (ING style)
        r"(?i)Nr\s*\d+\s*/\s*(\d{2}[.\-/]\d{2}[.\-/]\d{4})\s*[-–]\s*(\d{2}[.\-/]\d{2}[.\-/]\d{4})",
        // "okres: DD.MM.YYYY - DD.MM.YYYY" / "za okres DD.MM.YYYY do DD.MM.YYYY"
        r"(?i)(?:okres|za\s*okres|od)\s*:?\s*(\d{2}[.\-/]\d{2}[.\-/]\d{4})\s*(?:[-–]|do)\s*(\d{2}[.\-/]\d{2}[.\-/]\d{4})",
        // "wyciąg za DD.MM.YYYY - DD.MM.YYYY"
        r"(?i)wyci[ąa]g\s*(?:za|nr[^/]*/)?\s*(\d{2}[.\-/]\d{2}[.\-/]\d{4})\s*[-–]\s*(\d{2}[.\-/]\d{2}[.\-/]\d{4})",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static regex"))
    .collect()
});

static OPENING_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // "Saldo początkowe: 5 000,00" (amount may sit on the next line)
        r"(?i)saldo\s*(?:pocz[ąa]tkowe|otwarcia)\s*:?\s*([\d\s,.\-]+)",
        // ING prints the opening as the previous statement's closing.
        r"(?i)saldo\s*ko[ńn]cowe\s*poprzedniego\s*wyci[ąa]gu[^\n\d]*(?:\n[^\n\d]*){0,2}?\s*([\d\s]+[,.]\d{2})\s*(?:PLN|EUR|USD)?",
        // Label on one line, amount 1-2 lines later.
        r"(?i)saldo\s*pocz[ąa]tkowe[^\n\d]*(?:\n[^\n\d]*){0,2}?\s*([\d\s]+[,.]\d{2})\s*(?:PLN|EUR|USD)?",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static regex"))
    .collect()
});

// The optional "poprzedniego" group lets the code reject matches that are
// actually the opening balance (the regex crate has no lookahead).
static CLOSING_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)saldo\s*(?:ko[ńn]cowe|zamkni[ęe]cia)(\s*poprzedniego)?\s*:?\s*([\d\s,.\-]+)",
        r"(?i)saldo\s*ko[ńn]cowe(\s*poprzedniego)?[^\n\d]*(?:\n[^\n\d]*){0,2}?\s*([\d\s]+[,.]\d{2})\s*(?:PLN|EUR|USD)?",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static regex"))
    .collect()
});

static AVAILABLE_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)saldo\s*dost[ęe]pn[eay]\s*:?\s*([\d\s,.\-]+)",
        r"(?i)dost[ęe]pne\s*[śs]rodki\s*:?\s*([\d\s,.\-]+)",
        r"(?i)kwota\s*dost[ęe]pna\s*:?\s*([\d\s,.\-]+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static regex"))
    .collect()
});

static CREDITS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)suma\s*uzna[ńn]\s*\((\d+)\)\s*:?\s*([\d\s,.\-]+)").expect("static regex")
});
static DEBITS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)suma\s*obci[ąa][żz]e[ńn]\s*\((\d+)\)\s*:?\s*([\d\s,.\-]+)")
        .expect("static regex")
});
static CURRENCY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)waluta\s*(?:rachunku)?\s*:?\s*([A-Za-z]{3})\b").expect("static regex")
});
static DEBT_LIMIT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)limit\s*zad[łl]u[żz]enia\s*:?\s*([\d\s,.\-]+)").expect("static regex")
});
static BLOCKED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)kwota\s*zablokowana\s*:?\s*([\d\s,.\-]+)").expect("static regex")
});
static OVERDUE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)kwota\s*prowizji\s*zaleg[łl]ej\s*:?\s*([\d\s,.\-]+)").expect("static regex")
});

static HOLDER_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)(?:w[łl]a[śs]ciciel|posiadacz)\s*(?:rachunku)?\s*:?\s*([A-ZĄĆĘŁŃÓŚŹŻ][a-ząćęłńóśźż]+(?:\s+[A-ZĄĆĘŁŃÓŚŹŻ][a-ząćęłńóśźż\-]+){1,3})",
        // "Dane posiadacza\nIMIĘ NAZWISKO\n..." — first line after the label.
        r"(?i)dane\s*posiadacza[^\n]*\n\s*([^\n]+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static regex"))
    .collect()
});

static POSTAL_TAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\d{2}[-\s]?\d{3}\s*.*$").expect("static regex"));

/// Identify the issuing bank from statement text.
pub fn detect_bank(text: &str) -> (String, String) {
    let lower = text.to_lowercase();
    if lower.contains("ingbplpw") || lower.contains("ing bank") || lower.contains("ing bank śląski")
    {
        return ("ing".into(), "ING Bank Śląski".into());
    }
    if lower.contains("mbank") || lower.contains("brexplpw") {
        return ("mbank".into(), "mBank".into());
    }
    if lower.contains("pekao") {
        return ("pekao".into(), "Bank Pekao SA".into());
    }
    if lower.contains("santander") {
        return ("santander".into(), "Santander Bank Polska".into());
    }
    if lower.contains("pko bank polski") || lower.contains("pko bp") {
        return ("pko".into(), "PKO Bank Polski".into());
    }
    ("generic".into(), "Nieznany bank".into())
}

/// Extract statement metadata with patterns that work across Polish banks.
///
/// Handles the period in four printed formats, multi-line balance labels,
/// and declared credit/debit sums with counts for cross-validation.
pub fn extract_info_common(text: &str) -> StatementInfo {
    let mut info = StatementInfo::default();
    info.currency = "PLN".to_string();

    if let Some(m) = IBAN_RE.captures(text) {
        info.account_number = m[1].chars().filter(|c| !c.is_whitespace()).collect();
    }

    for re in PERIOD_RES.iter() {
        if let Some(m) = re.captures(text) {
            info.period_from = parse_date(&m[1], None);
            info.period_to = parse_date(&m[2], None);
            break;
        }
    }

    for re in OPENING_RES.iter() {
        if let Some(m) = re.captures(text) {
            if let Some(value) = parse_amount(&m[1]) {
                info.opening_balance = Some(value);
                break;
            }
        }
    }

    'closing: for re in CLOSING_RES.iter() {
        for caps in re.captures_iter(text) {
            if caps.get(1).is_some() {
                // "saldo końcowe poprzedniego wyciągu" is the opening balance.
                continue;
            }
            if let Some(value) = caps.get(2).and_then(|m| parse_amount(m.as_str())) {
                info.closing_balance = Some(value);
                break 'closing;
            }
        }
    }

    for re in AVAILABLE_RES.iter() {
        if let Some(m) = re.captures(text) {
            if let Some(value) = parse_amount(&m[1]) {
                info.available_balance = Some(value);
                break;
            }
        }
    }

    if let Some(m) = CREDITS_RE.captures(text) {
        info.declared_credits_count = m[1].parse().ok();
        info.declared_credits_sum = parse_amount(&m[2]);
    }
    if let Some(m) = DEBITS_RE.captures(text) {
        info.declared_debits_count = m[1].parse().ok();
        info.declared_debits_sum = parse_amount(&m[2]);
    }

    if let Some(m) = CURRENCY_RE.captures(text) {
        info.currency = m[1].to_uppercase();
    }

    if let Some(m) = DEBT_LIMIT_RE.captures(text) {
        info.debt_limit = parse_amount(&m[1]);
    }
    if let Some(m) = BLOCKED_RE.captures(text) {
        info.blocked_amount = parse_amount(&m[1]);
    }
    if let Some(m) = OVERDUE_RE.captures(text) {
        info.overdue_commission = parse_amount(&m[1]);
    }

    for re in HOLDER_RES.iter() {
        if let Some(m) = re.captures(text) {
            // Keep the first captured line only; greedy matches can run
            // into the address block below the name.
            let first_line = m[1].lines().next().unwrap_or("").trim();
            let name = POSTAL_TAIL_RE.replace(first_line, "").trim().to_string();
            let words: Vec<&str> = name.split_whitespace().collect();
            let looks_like_name = (2..=4).contains(&words.len())
                && name.chars().count() < 60
                && words
                    .iter()
                    .all(|w| w.chars().next().is_some_and(char::is_uppercase));
            if looks_like_name {
                info.account_holder = name;
                break;
            }
        }
    }

    info
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const ING_HEADER: &str = "\
ING Bank Śląski SA
Wyciąg z rachunku
Nr 9 / 01.09.2025 - 30.09.2025
Dane posiadacza
JAN KOWALSKI
UL. PRZYKŁADOWA 1 00-001 WARSZAWA
Nr rachunku IBAN:
12 3456 7890 1234 5678 9012 3456
Waluta rachunku:
PLN
Saldo końcowe poprzedniego wyciągu:
1 053,83 PLN
Saldo końcowe:
138,49
Saldo dostępne:
138,49
Suma uznań (11): 20 934,74 PLN
Suma obciążeń (182): 21 850,08 PLN
";

    #[test]
    fn test_ing_header_extraction() {
        let info = extract_info_common(ING_HEADER);
        assert_eq!(info.account_number, "12345678901234567890123456");
        assert_eq!(info.period_from, Some("2025-09-01".parse().unwrap()));
        assert_eq!(info.period_to, Some("2025-09-30".parse().unwrap()));
        // Previous statement's closing balance is this period's opening.
        assert_eq!(info.opening_balance, Some(dec!(1053.83)));
        assert_eq!(info.closing_balance, Some(dec!(138.49)));
        assert_eq!(info.available_balance, Some(dec!(138.49)));
        assert_eq!(info.declared_credits_count, Some(11));
        assert_eq!(info.declared_credits_sum, Some(dec!(20934.74)));
        assert_eq!(info.declared_debits_count, Some(182));
        assert_eq!(info.declared_debits_sum, Some(dec!(21850.08)));
        assert_eq!(info.currency, "PLN");
        assert_eq!(info.account_holder, "JAN KOWALSKI");
    }

    #[test]
    fn test_simple_labels() {
        let text = "Okres: 01.01.2024 - 31.01.2024\n\
                    Saldo początkowe: 5 000,00\n\
                    Saldo końcowe: 3 245,50 PLN\n\
                    Właściciel rachunku: Anna Nowak";
        let info = extract_info_common(text);
        assert_eq!(info.opening_balance, Some(dec!(5000.00)));
        assert_eq!(info.closing_balance, Some(dec!(3245.50)));
        assert_eq!(info.period_from, Some("2024-01-01".parse().unwrap()));
        assert_eq!(info.account_holder, "Anna Nowak");
    }

    #[test]
    fn test_closing_rejects_previous_statement() {
        let text = "Saldo końcowe poprzedniego wyciągu: 100,00";
        let info = extract_info_common(text);
        assert_eq!(info.closing_balance, None);
        assert_eq!(info.opening_balance, Some(dec!(100.00)));
    }

    #[test]
    fn test_detect_bank() {
        assert_eq!(detect_bank("wyciąg ... ING Bank Śląski").0, "ing");
        assert_eq!(detect_bank("mBank S.A.").0, "mbank");
        assert_eq!(detect_bank("Santander Bank Polska").0, "santander");
        assert_eq!(detect_bank("jakiś inny bank").0, "generic");
    }
}
