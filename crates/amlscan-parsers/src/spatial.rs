//! Spatial (coordinate-based) PDF statement parsing.
//!
//! Instead of running regexes over extracted text lines, the parser works
//! on positioned words:
//!
//! 1. Detect the column header row by keyword matching on a single Y band
//! 2. Derive column boundaries from the header cells
//! 3. Segment transactions by date markers inside the date column
//! 4. Collect the words of each column zone for each transaction band
//!
//! This reassembles cells that wrap across multiple PDF lines, which
//! line-based table extraction breaks on.

use std::collections::BTreeMap;

use amlscan_core::{AmlError, AmlResult, ParseMethod, ParseOutcome, RawTransaction};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::amounts::{parse_amount, parse_date};
use crate::columns::{detect_header_columns, ColumnType, ColumnZone};
use crate::header::{detect_bank, extract_info_common};
use crate::words::{PageData, WordBox};

/// Date marker that starts a new transaction band.
static BAND_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{2}[.\-/]\d{2}[.\-/]\d{2,4}").expect("static regex"));

/// Vertical margin added below the header row before body words start.
const HEADER_BODY_MARGIN: f64 = 4.0;

/// A horizontal band spanning one transaction (may cover multiple lines).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransactionBand {
    pub page: usize,
    pub y_start: f64,
    pub y_end: f64,
}

/// Result of spatially parsing one document, kept cached for re-parses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpatialParseResult {
    pub pages: Vec<PageData>,
    pub columns: Vec<ColumnZone>,
    /// Y below which body words start on the header page.
    pub header_y_end: f64,
    /// Page index the header row was found on.
    pub header_page: usize,
    pub outcome: ParseOutcome,
}

impl SpatialParseResult {
    /// Header cell labels, used for template matching.
    pub fn header_cells(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.label.clone()).collect()
    }
}

/// Reconstruct reading-order text lines from positioned words.
///
/// Header metadata patterns (balances, period, holder) work on text lines,
/// so the word boxes are regrouped into Y bands per page.
pub fn pages_to_text(pages: &[PageData]) -> String {
    let mut lines: Vec<String> = Vec::new();
    for page in pages {
        let mut sorted: Vec<&WordBox> = page.words.iter().collect();
        sorted.sort_by(|a, b| a.cy().total_cmp(&b.cy()).then(a.x0.total_cmp(&b.x0)));

        let mut current_y = f64::MIN;
        let mut current: Vec<&str> = Vec::new();
        for word in sorted {
            if (word.cy() - current_y).abs() > 3.0 && !current.is_empty() {
                lines.push(current.join(" "));
                current.clear();
            }
            current_y = word.cy();
            current.push(&word.text);
        }
        if !current.is_empty() {
            lines.push(current.join(" "));
        }
    }
    lines.join("\n")
}

/// Parse a document from its extracted pages.
///
/// Fails with [`AmlError::NoHeaderDetected`] when no page contains a
/// recognizable column header row.
pub fn spatial_parse(pages: Vec<PageData>) -> AmlResult<SpatialParseResult> {
    let mut columns: Option<Vec<ColumnZone>> = None;
    let mut header_page = 0;

    for page in &pages {
        if let Some(found) = detect_header_columns(&page.words) {
            header_page = page.page_num;
            columns = Some(found);
            break;
        }
    }

    let Some(columns) = columns else {
        let y_end = pages
            .first()
            .map(|p| p.height)
            .unwrap_or(842.0);
        return Err(AmlError::NoHeaderDetected {
            y_start: 0.0,
            y_end,
        });
    };

    let header_y_end = columns
        .iter()
        .map(|c| c.header_y)
        .fold(0.0_f64, f64::max)
        + HEADER_BODY_MARGIN;

    let text = pages_to_text(&pages);
    let (bank_id, bank_name) = detect_bank(&text);
    let mut info = extract_info_common(&text);
    info.bank_id = bank_id;
    info.bank_name = bank_name;

    let mut outcome = ParseOutcome::new(info, ParseMethod::Spatial);
    outcome.page_count = pages.len();

    let bands = segment_bands(&pages, &columns, header_page, header_y_end);
    let (transactions, warnings) = extract_transactions(&pages, &columns, &bands);
    info!(
        bands = bands.len(),
        transactions = transactions.len(),
        columns = columns.len(),
        "spatial parse finished"
    );
    outcome.transactions = transactions;
    outcome.warnings = warnings;

    Ok(SpatialParseResult {
        pages,
        columns,
        header_y_end,
        header_page,
        outcome,
    })
}

/// Segment body words into transaction bands.
///
/// A new band starts at every word that falls inside the date column and
/// matches the date pattern. A band ends where the next one starts (or at
/// the page end).
pub fn segment_bands(
    pages: &[PageData],
    columns: &[ColumnZone],
    header_page: usize,
    header_y_end: f64,
) -> Vec<TransactionBand> {
    let Some(date_col) = columns.iter().find(|c| c.col_type == ColumnType::Date) else {
        return Vec::new();
    };

    let mut bands: Vec<TransactionBand> = Vec::new();
    for page in pages {
        if page.page_num < header_page {
            continue;
        }
        let mut starts: Vec<f64> = page
            .words
            .iter()
            .filter(|w| {
                (page.page_num != header_page || w.top > header_y_end)
                    && date_col.contains_x(w.cx())
                    && BAND_DATE_RE.is_match(&w.text)
            })
            .map(|w| w.top)
            .collect();
        starts.sort_by(f64::total_cmp);
        starts.dedup_by(|a, b| (*a - *b).abs() < 1.0);

        for (i, y_start) in starts.iter().enumerate() {
            let y_end = starts
                .get(i + 1)
                .copied()
                .unwrap_or(page.height);
            bands.push(TransactionBand {
                page: page.page_num,
                y_start: *y_start - 1.0,
                y_end: y_end - 1.0,
            });
        }
    }
    bands
}

/// Concatenated cell text for one column within one band, Y-ordered.
fn band_cell(page: &PageData, band: &TransactionBand, column: &ColumnZone) -> String {
    let mut members: Vec<&WordBox> = page
        .words
        .iter()
        .filter(|w| w.top >= band.y_start && w.top < band.y_end && column.contains_x(w.cx()))
        .collect();
    members.sort_by(|a, b| a.top.total_cmp(&b.top).then(a.x0.total_cmp(&b.x0)));
    members
        .iter()
        .map(|w| w.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolve the signed amount for a band from its cells.
///
/// Separate debit/credit columns win over a single amount column; a
/// populated credit is positive, a populated debit negated. When both are
/// empty the single amount column is the fallback.
fn resolve_amount(cells: &BTreeMap<ColumnType, String>) -> Option<Decimal> {
    let debit = cells.get(&ColumnType::Debit).and_then(|s| parse_amount(s));
    let credit = cells.get(&ColumnType::Credit).and_then(|s| parse_amount(s));

    if cells.contains_key(&ColumnType::Debit) || cells.contains_key(&ColumnType::Credit) {
        if let Some(c) = credit {
            if !c.is_zero() {
                return Some(c.abs());
            }
        }
        if let Some(d) = debit {
            if !d.is_zero() {
                return Some(-d.abs());
            }
        }
    }
    cells.get(&ColumnType::Amount).and_then(|s| parse_amount(s))
}

/// Map band cells onto raw transactions; bands without a parsable date are
/// dropped silently, bands without a resolvable amount drop with a warning.
pub fn extract_transactions(
    pages: &[PageData],
    columns: &[ColumnZone],
    bands: &[TransactionBand],
) -> (Vec<RawTransaction>, Vec<String>) {
    let mut transactions = Vec::new();
    let mut warnings = Vec::new();

    for band in bands {
        let Some(page) = pages.iter().find(|p| p.page_num == band.page) else {
            continue;
        };

        let mut cells: BTreeMap<ColumnType, String> = BTreeMap::new();
        for column in columns {
            if column.col_type == ColumnType::Skip {
                continue;
            }
            let text = band_cell(page, band, column);
            if text.is_empty() {
                continue;
            }
            cells
                .entry(column.col_type)
                .and_modify(|existing| {
                    existing.push(' ');
                    existing.push_str(&text);
                })
                .or_insert(text);
        }

        let Some(date) = cells
            .get(&ColumnType::Date)
            .and_then(|s| s.split_whitespace().next().map(str::to_string))
            .and_then(|s| parse_date(&s, None))
        else {
            continue;
        };

        let Some(amount) = resolve_amount(&cells) else {
            warnings.push(format!(
                "Pominięto wiersz z datą {date}: nie udało się odczytać kwoty"
            ));
            warn!(%date, page = band.page, "band discarded, amount unresolvable");
            continue;
        };

        let raw_text: String = cells
            .values()
            .cloned()
            .collect::<Vec<_>>()
            .join(" | ");

        let mut tx = RawTransaction::new(date, amount);
        tx.value_date = cells
            .get(&ColumnType::ValueDate)
            .and_then(|s| s.split_whitespace().next().map(str::to_string))
            .and_then(|s| parse_date(&s, None));
        tx.counterparty = cells
            .get(&ColumnType::Counterparty)
            .cloned()
            .unwrap_or_default();
        tx.title = cells
            .get(&ColumnType::Description)
            .cloned()
            .unwrap_or_default();
        tx.bank_category = cells.get(&ColumnType::BankType).cloned().unwrap_or_default();
        tx.balance_after = cells.get(&ColumnType::Balance).and_then(|s| parse_amount(s));
        tx.raw_text = raw_text.chars().take(500).collect();
        transactions.push(tx);
    }

    (transactions, warnings)
}

/// User-supplied column boundary override.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnBounds {
    pub x_min: f64,
    pub x_max: f64,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub col_type: ColumnType,
}

/// Re-parse with a user-confirmed column mapping.
///
/// `column_bounds`, when given, replaces the column definitions entirely;
/// `column_mapping` then overrides column types by index. Banding and cell
/// extraction re-run with the updated columns; header metadata is reused
/// from the cached result.
pub fn parse_with_mapping(
    cached: &SpatialParseResult,
    column_mapping: &BTreeMap<usize, ColumnType>,
    column_bounds: Option<&[ColumnBounds]>,
) -> ParseOutcome {
    let default_header_y = cached
        .columns
        .first()
        .map(|c| c.header_y)
        .unwrap_or(50.0);

    let mut columns: Vec<ColumnZone> = match column_bounds {
        Some(bounds) if !bounds.is_empty() => bounds
            .iter()
            .enumerate()
            .map(|(i, b)| ColumnZone {
                label: if b.label.is_empty() {
                    format!("Kolumna {}", i + 1)
                } else {
                    b.label.clone()
                },
                col_type: b.col_type,
                x_min: b.x_min,
                x_max: b.x_max,
                header_y: default_header_y,
            })
            .collect(),
        _ => cached.columns.clone(),
    };

    for (idx, col_type) in column_mapping {
        if let Some(column) = columns.get_mut(*idx) {
            column.col_type = *col_type;
        }
    }

    let header_y_end = columns
        .iter()
        .map(|c| c.header_y)
        .fold(0.0_f64, f64::max)
        + HEADER_BODY_MARGIN;

    let bands = segment_bands(&cached.pages, &columns, cached.header_page, header_y_end);
    let (transactions, warnings) = extract_transactions(&cached.pages, &columns, &bands);

    let mut outcome = ParseOutcome::new(cached.outcome.info.clone(), ParseMethod::Spatial);
    outcome.page_count = cached.pages.len();
    outcome.transactions = transactions;
    outcome.warnings = warnings;
    outcome
}

/// A saved column mapping for one bank's statement layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseTemplate {
    pub id: String,
    pub bank_id: String,
    pub bank_name: String,
    pub name: String,
    /// Column index → type.
    pub column_mapping: BTreeMap<usize, ColumnType>,
    /// Header cell labels the template was saved from.
    pub sample_headers: Vec<String>,
    pub is_default: bool,
    pub times_used: i64,
}

fn normalize_headers(cells: &[String]) -> Vec<String> {
    cells.iter().map(|c| c.trim().to_lowercase()).collect()
}

/// Pick the template to suggest for a statement.
///
/// Exact header match wins; otherwise the bank's default template, then the
/// most-used one (callers pass templates pre-sorted by `is_default DESC,
/// times_used DESC`). The bool is true when the match is only partial.
pub fn find_matching_template<'a>(
    templates: &'a [ParseTemplate],
    header_cells: &[String],
) -> Option<(&'a ParseTemplate, bool)> {
    let normalized = normalize_headers(header_cells);
    for template in templates {
        if normalize_headers(&template.sample_headers) == normalized {
            return Some((template, false));
        }
    }
    if let Some(default) = templates.iter().find(|t| t.is_default) {
        return Some((default, true));
    }
    templates.first().map(|t| (t, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    /// Build a synthetic statement page:
    /// header row + two transactions, one with a two-line title.
    fn statement_page() -> PageData {
        let mut words = Vec::new();
        let mut add = |text: &str, x0: f64, x1: f64, top: f64| {
            words.push(WordBox {
                text: text.into(),
                x0,
                x1,
                top,
                bottom: top + 10.0,
                page: 0,
            });
        };

        // Header region.
        add("Saldo", 40.0, 70.0, 40.0);
        add("początkowe:", 72.0, 130.0, 40.0);
        add("1", 140.0, 145.0, 40.0);
        add("000,00", 147.0, 180.0, 40.0);

        // Table header.
        add("Data", 40.0, 65.0, 100.0);
        add("księgowania", 67.0, 130.0, 100.0);
        add("Opis", 160.0, 185.0, 100.0);
        add("Kontrahent", 260.0, 320.0, 100.0);
        add("Kwota", 400.0, 435.0, 100.0);
        add("Saldo", 480.0, 510.0, 100.0);

        // Transaction 1: title wraps over two lines.
        add("05.01.2024", 40.0, 95.0, 130.0);
        add("Zakup", 160.0, 190.0, 130.0);
        add("kartą", 160.0, 188.0, 142.0);
        add("BIEDRONKA", 260.0, 330.0, 130.0);
        add("-150,00", 400.0, 440.0, 130.0);
        add("850,00", 480.0, 515.0, 130.0);

        // Transaction 2.
        add("10.01.2024", 40.0, 95.0, 170.0);
        add("Wynagrodzenie", 160.0, 240.0, 170.0);
        add("FIRMA", 260.0, 295.0, 170.0);
        add("XYZ", 297.0, 317.0, 170.0);
        add("5", 398.0, 403.0, 170.0);
        add("000,00", 405.0, 440.0, 170.0);
        add("5", 478.0, 483.0, 170.0);
        add("850,00", 485.0, 520.0, 170.0);

        PageData {
            page_num: 0,
            width: 595.0,
            height: 842.0,
            words,
        }
    }

    #[test]
    fn test_spatial_parse_end_to_end() {
        let result = spatial_parse(vec![statement_page()]).unwrap();
        assert_eq!(result.outcome.transactions.len(), 2);

        let tx1 = &result.outcome.transactions[0];
        assert_eq!(tx1.booking_date, "2024-01-05".parse().unwrap());
        assert_eq!(tx1.amount, dec!(-150.00));
        assert_eq!(tx1.title, "Zakup kartą");
        assert_eq!(tx1.counterparty, "BIEDRONKA");
        assert_eq!(tx1.balance_after, Some(dec!(850.00)));

        let tx2 = &result.outcome.transactions[1];
        assert_eq!(tx2.amount, dec!(5000.00));
        assert_eq!(tx2.counterparty, "FIRMA XYZ");
        assert_eq!(tx2.balance_after, Some(dec!(5850.00)));

        // Header metadata was picked up from the region above the table.
        assert_eq!(result.outcome.info.opening_balance, Some(dec!(1000.00)));
    }

    #[test]
    fn test_no_header_is_error() {
        let page = PageData {
            page_num: 0,
            width: 595.0,
            height: 842.0,
            words: vec![WordBox {
                text: "pusty".into(),
                x0: 10.0,
                x1: 40.0,
                top: 10.0,
                bottom: 20.0,
                page: 0,
            }],
        };
        let err = spatial_parse(vec![page]).unwrap_err();
        assert!(matches!(err, AmlError::NoHeaderDetected { .. }));
    }

    #[test]
    fn test_remap_column_changes_extraction() {
        let result = spatial_parse(vec![statement_page()]).unwrap();
        // Reassign the counterparty column as description.
        let cp_index = result
            .columns
            .iter()
            .position(|c| c.col_type == ColumnType::Counterparty)
            .unwrap();
        let mut mapping = BTreeMap::new();
        mapping.insert(cp_index, ColumnType::Description);
        let outcome = parse_with_mapping(&result, &mapping, None);
        assert_eq!(outcome.transactions.len(), 2);
        assert!(outcome.transactions[0].counterparty.is_empty());
        assert!(outcome.transactions[0].title.contains("BIEDRONKA"));
    }

    #[test]
    fn test_debit_credit_resolution() {
        let mut cells = BTreeMap::new();
        cells.insert(ColumnType::Debit, "150,00".to_string());
        cells.insert(ColumnType::Credit, String::new());
        assert_eq!(resolve_amount(&cells), Some(dec!(-150.00)));

        // Populated credit wins and is positive.
        cells.insert(ColumnType::Credit, "200,00".to_string());
        assert_eq!(resolve_amount(&cells), Some(dec!(200.00)));

        // Both empty: fall back to the single amount column.
        let mut cells = BTreeMap::new();
        cells.insert(ColumnType::Debit, "0,00".to_string());
        cells.insert(ColumnType::Credit, "0,00".to_string());
        cells.insert(ColumnType::Amount, "-75,50".to_string());
        assert_eq!(resolve_amount(&cells), Some(dec!(-75.50)));
    }

    #[test]
    fn test_template_matching_precedence() {
        let t = |id: &str, headers: &[&str], default: bool, used: i64| ParseTemplate {
            id: id.into(),
            bank_id: "ing".into(),
            bank_name: "ING".into(),
            name: id.into(),
            column_mapping: BTreeMap::new(),
            sample_headers: headers.iter().map(|s| s.to_string()).collect(),
            is_default: default,
            times_used: used,
        };
        let templates = vec![
            t("default", &["Data", "Kwota"], true, 1),
            t("exact", &["Data księgowania", "Opis", "Kwota"], false, 5),
        ];
        let headers: Vec<String> = ["data księgowania", "OPIS", "Kwota"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let (found, partial) = find_matching_template(&templates, &headers).unwrap();
        assert_eq!(found.id, "exact");
        assert!(!partial);

        let (fallback, partial) =
            find_matching_template(&templates, &["inne".to_string()]).unwrap();
        assert_eq!(fallback.id, "default");
        assert!(partial);

        assert!(find_matching_template(&[], &headers).is_none());
    }
}
