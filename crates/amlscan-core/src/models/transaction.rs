//! Raw parser output: transactions and statement metadata.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Money flow direction, derived from the amount sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    /// Inflow, amount >= 0.
    Credit,
    /// Outflow, amount < 0.
    Debit,
}

impl Direction {
    /// Derive direction from a signed amount. Zero counts as credit.
    pub fn from_amount(amount: Decimal) -> Self {
        if amount >= Decimal::ZERO {
            Direction::Credit
        } else {
            Direction::Debit
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Credit => "CREDIT",
            Direction::Debit => "DEBIT",
        }
    }
}

/// Single transaction as emitted by a statement parser.
///
/// Signed amount: negative = debit (outflow), positive = credit (inflow).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTransaction {
    /// Booking date.
    pub booking_date: NaiveDate,
    /// Value date (data waluty), when the bank reports one.
    pub value_date: Option<NaiveDate>,
    /// Signed amount, exact decimal.
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Account balance after this transaction, when printed on the statement.
    pub balance_after: Option<Decimal>,
    /// Counterparty name/address as printed.
    pub counterparty: String,
    /// Transfer title / description.
    pub title: String,
    /// Original row text kept for debugging and rule matching.
    pub raw_text: String,
    /// Bank's own operation code (TR.KART, P.BLIK, PRZELEW, ST.ZLEC, ...).
    pub bank_category: String,
}

impl RawTransaction {
    /// Create a transaction with the given date and amount; remaining fields
    /// default to empty.
    pub fn new(booking_date: NaiveDate, amount: Decimal) -> Self {
        Self {
            booking_date,
            value_date: None,
            amount,
            currency: "PLN".to_string(),
            balance_after: None,
            counterparty: String::new(),
            title: String::new(),
            raw_text: String::new(),
            bank_category: String::new(),
        }
    }

    /// Sets the counterparty.
    pub fn with_counterparty(mut self, counterparty: &str) -> Self {
        self.counterparty = counterparty.to_string();
        self
    }

    /// Sets the title.
    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    /// Sets the bank operation code.
    pub fn with_bank_category(mut self, code: &str) -> Self {
        self.bank_category = code.to_string();
        self
    }

    /// Sets the balance after the transaction.
    pub fn with_balance_after(mut self, balance: Decimal) -> Self {
        self.balance_after = Some(balance);
        self
    }

    /// Sets the raw row text.
    pub fn with_raw_text(mut self, raw: &str) -> Self {
        self.raw_text = raw.to_string();
        self
    }

    /// Direction derived from the amount sign.
    pub fn direction(&self) -> Direction {
        Direction::from_amount(self.amount)
    }
}

/// Statement header metadata extracted from the document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatementInfo {
    /// Short bank identifier (e.g. "ing").
    pub bank_id: String,
    /// Full bank name.
    pub bank_name: String,
    /// Account number, 26 digits with whitespace stripped.
    pub account_number: String,
    /// Account holder name.
    pub account_holder: String,
    /// Statement period start.
    pub period_from: Option<NaiveDate>,
    /// Statement period end.
    pub period_to: Option<NaiveDate>,
    pub opening_balance: Option<Decimal>,
    pub closing_balance: Option<Decimal>,
    pub available_balance: Option<Decimal>,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Declared sum of credits (Suma uznań).
    pub declared_credits_sum: Option<Decimal>,
    pub declared_credits_count: Option<u32>,
    /// Declared sum of debits (Suma obciążeń), absolute value.
    pub declared_debits_sum: Option<Decimal>,
    pub declared_debits_count: Option<u32>,
    /// Date of the previous statement, when printed.
    pub previous_statement_date: Option<NaiveDate>,
    /// Debt limit (Limit zadłużenia).
    pub debt_limit: Option<Decimal>,
    /// Overdue commission (Kwota prowizji zaległej).
    pub overdue_commission: Option<Decimal>,
    /// Blocked amount (Kwota zablokowana).
    pub blocked_amount: Option<Decimal>,
}

impl StatementInfo {
    pub fn new(bank_id: &str, bank_name: &str) -> Self {
        Self {
            bank_id: bank_id.to_string(),
            bank_name: bank_name.to_string(),
            currency: "PLN".to_string(),
            ..Default::default()
        }
    }
}

/// How the transactions were obtained from the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseMethod {
    /// Coordinate-based column extraction from the PDF text layer.
    Spatial,
    /// Line-oriented text fallback.
    Text,
    /// OCR-produced text layer.
    Ocr,
    /// SWIFT MT940 electronic export.
    Mt940,
}

impl ParseMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseMethod::Spatial => "spatial",
            ParseMethod::Text => "text",
            ParseMethod::Ocr => "ocr",
            ParseMethod::Mt940 => "mt940",
        }
    }
}

/// Complete result of parsing one statement document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseOutcome {
    pub info: StatementInfo,
    pub transactions: Vec<RawTransaction>,
    /// Non-fatal parser observations, surfaced in the audit trail.
    pub warnings: Vec<String>,
    pub page_count: usize,
    pub parse_method: ParseMethod,
}

impl ParseOutcome {
    pub fn new(info: StatementInfo, method: ParseMethod) -> Self {
        Self {
            info,
            transactions: Vec::new(),
            warnings: Vec::new(),
            page_count: 0,
            parse_method: method,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_direction_from_amount() {
        assert_eq!(Direction::from_amount(dec!(10)), Direction::Credit);
        assert_eq!(Direction::from_amount(dec!(0)), Direction::Credit);
        assert_eq!(Direction::from_amount(dec!(-0.01)), Direction::Debit);
    }

    #[test]
    fn test_builder() {
        let tx = RawTransaction::new("2024-01-05".parse().unwrap(), dec!(-150.00))
            .with_counterparty("BIEDRONKA")
            .with_bank_category("TR.KART");
        assert_eq!(tx.direction(), Direction::Debit);
        assert_eq!(tx.currency, "PLN");
        assert_eq!(tx.bank_category, "TR.KART");
    }
}
