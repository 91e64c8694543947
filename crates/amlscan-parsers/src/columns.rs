//! Column detection from the transaction table header row.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::words::WordBox;

/// Detected or user-assigned column type.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Date,
    ValueDate,
    Description,
    Counterparty,
    Amount,
    Debit,
    Credit,
    Balance,
    BankType,
    Reference,
    #[default]
    Skip,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Date => "date",
            ColumnType::ValueDate => "value_date",
            ColumnType::Description => "description",
            ColumnType::Counterparty => "counterparty",
            ColumnType::Amount => "amount",
            ColumnType::Debit => "debit",
            ColumnType::Credit => "credit",
            ColumnType::Balance => "balance",
            ColumnType::BankType => "bank_type",
            ColumnType::Reference => "reference",
            ColumnType::Skip => "skip",
        }
    }

    /// Parse from the persisted string form; unknown values skip the column.
    pub fn parse(s: &str) -> Self {
        match s {
            "date" => ColumnType::Date,
            "value_date" => ColumnType::ValueDate,
            "description" => ColumnType::Description,
            "counterparty" => ColumnType::Counterparty,
            "amount" => ColumnType::Amount,
            "debit" => ColumnType::Debit,
            "credit" => ColumnType::Credit,
            "balance" => ColumnType::Balance,
            "bank_type" => ColumnType::BankType,
            "reference" => ColumnType::Reference,
            _ => ColumnType::Skip,
        }
    }
}

/// A detected column with its horizontal boundaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnZone {
    /// Original header cell text.
    pub label: String,
    pub col_type: ColumnType,
    pub x_min: f64,
    pub x_max: f64,
    /// Y position of the header cell.
    pub header_y: f64,
}

/// Horizontal tolerance when assigning body words to a column.
pub const COLUMN_X_TOLERANCE: f64 = 2.0;

impl ColumnZone {
    /// Whether an X coordinate falls inside this column's zone.
    pub fn contains_x(&self, x: f64) -> bool {
        self.x_min - COLUMN_X_TOLERANCE <= x && x <= self.x_max + COLUMN_X_TOLERANCE
    }
}

/// Header keywords (lowercase, diacritics optional) that identify the
/// transaction table's header row.
const HEADER_KEYWORDS: &[&str] = &[
    "data",
    "księgowania",
    "ksiegowania",
    "transakcji",
    "kontrahent",
    "kontrahenta",
    "tytuł",
    "tytul",
    "kwota",
    "saldo",
    "szczegóły",
    "szczegoly",
    "opis",
    "operacji",
    "obciążeni",
    "obciazeni",
    "uznani",
    "nadawca",
    "odbiorca",
    "walut",
    "numer",
];

/// Minimum keyword hits for a Y band to qualify as the header row.
const HEADER_MIN_HITS: usize = 3;

/// Vertical tolerance when grouping words into a single Y band.
const HEADER_Y_BAND: f64 = 3.0;

/// Maximum X gap between header words merged into one cell.
const HEADER_CELL_GAP: f64 = 14.0;

fn compile_all(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(&format!("(?i){p}")).expect("static regex"))
        .collect()
}

/// Detection patterns per column type, in priority order. Mirrors the
/// labels Polish banks print above their transaction tables.
static TYPE_PATTERNS: Lazy<Vec<(ColumnType, Vec<Regex>)>> = Lazy::new(|| {
    vec![
        (
            ColumnType::ValueDate,
            compile_all(&[r"data\s*walut", r"waluta\s*data", r"data\s*wart"]),
        ),
        (
            ColumnType::Date,
            compile_all(&[r"data\s*(operacji|księg|ksieg|trans|zlec)", r"^data$", r"data\s*ob"]),
        ),
        (
            ColumnType::Counterparty,
            compile_all(&[
                r"nadawca|odbiorca",
                r"kontrahent",
                r"nazwa\s*(nadawcy|odbiorcy)",
                r"strona\s*transakcji",
            ]),
        ),
        (
            ColumnType::Description,
            compile_all(&[r"opis(\s*operacji)?", r"tytu[łl]", r"tre[śs][ćc]", r"szczeg[óo][łl]"]),
        ),
        (
            ColumnType::Debit,
            compile_all(&[
                r"obci[ąa][żz]eni[ae]",
                r"wydatk",
                r"wyp[łl]at",
                r"debet",
                r"kwota\s*obci",
                r"^ma$",
            ]),
        ),
        (
            ColumnType::Credit,
            compile_all(&[
                r"uznani[ae]",
                r"wp[łl]y(w|at)",
                r"przych",
                r"kredyt",
                r"kwota\s*uzna",
                r"^wn$",
            ]),
        ),
        (
            ColumnType::Amount,
            compile_all(&[r"^kwota$", r"kwota\s*(operacji|transakcji|pln|eur)"]),
        ),
        (
            ColumnType::Balance,
            compile_all(&[r"saldo", r"stan\s*rachunku", r"balance"]),
        ),
        (
            ColumnType::BankType,
            compile_all(&[r"typ\s*(operacji|transakcji)", r"rodzaj", r"kod\s*operacji"]),
        ),
        (
            ColumnType::Reference,
            compile_all(&[r"referen", r"nr\s*(operacji|transakcji)", r"numer"]),
        ),
    ]
});

/// Classify a header cell into a column type by its label.
pub fn classify_column(label: &str) -> ColumnType {
    let normalized = label.trim().to_lowercase();
    if normalized.is_empty() {
        return ColumnType::Skip;
    }
    for (col_type, patterns) in TYPE_PATTERNS.iter() {
        if patterns.iter().any(|re| re.is_match(&normalized)) {
            return *col_type;
        }
    }
    ColumnType::Skip
}

/// Locate the header row on a page's words and derive column zones.
///
/// Words are grouped into Y bands; the topmost band on the first page that
/// collects at least [`HEADER_MIN_HITS`] keyword hits wins. Returns `None`
/// when no band qualifies.
pub fn detect_header_columns(words: &[WordBox]) -> Option<Vec<ColumnZone>> {
    let mut bands: Vec<(f64, Vec<&WordBox>)> = Vec::new();
    let mut sorted: Vec<&WordBox> = words.iter().collect();
    sorted.sort_by(|a, b| a.cy().total_cmp(&b.cy()).then(a.x0.total_cmp(&b.x0)));

    for word in sorted {
        match bands
            .iter_mut()
            .find(|(y, _)| (word.cy() - *y).abs() <= HEADER_Y_BAND)
        {
            Some((_, members)) => members.push(word),
            None => bands.push((word.cy(), vec![word])),
        }
    }

    for (_, members) in &bands {
        let joined = members
            .iter()
            .map(|w| w.text.to_lowercase())
            .collect::<Vec<_>>()
            .join(" ");
        let hits = HEADER_KEYWORDS
            .iter()
            .filter(|kw| joined.contains(*kw))
            .count();
        if hits >= HEADER_MIN_HITS {
            return Some(columns_from_header_words(members));
        }
    }
    None
}

/// Merge adjacent header words into cells and derive column boundaries.
///
/// Boundaries extend to the midpoint between neighbouring cells so body
/// words that overhang their header still land in the right column.
fn columns_from_header_words(words: &[&WordBox]) -> Vec<ColumnZone> {
    let mut cells: Vec<(String, f64, f64, f64)> = Vec::new(); // label, x0, x1, y

    for word in words {
        match cells.last_mut() {
            Some((label, _, x1, _)) if word.x0 - *x1 <= HEADER_CELL_GAP => {
                label.push(' ');
                label.push_str(&word.text);
                *x1 = word.x1;
            }
            _ => cells.push((word.text.clone(), word.x0, word.x1, word.cy())),
        }
    }

    let count = cells.len();
    let mut zones = Vec::with_capacity(count);
    for i in 0..count {
        let (label, x0, x1, y) = &cells[i];
        let x_min = if i == 0 {
            0.0
        } else {
            (cells[i - 1].2 + x0) / 2.0
        };
        let x_max = if i + 1 == count {
            x1 + 200.0
        } else {
            (x1 + cells[i + 1].1) / 2.0
        };
        zones.push(ColumnZone {
            label: label.clone(),
            col_type: classify_column(label),
            x_min,
            x_max,
            header_y: *y,
        });
    }
    zones
}
