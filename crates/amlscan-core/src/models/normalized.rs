//! Normalized transaction model: the contract every downstream stage
//! (rules, analytics, graph, scoring, persistence) consumes.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::transaction::Direction;
use crate::channel::Channel;

/// One entry in a transaction's rule-decision trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleExplain {
    /// Rule identifier, e.g. `category:crypto:exchange_polish` or
    /// `memory:blacklist`.
    pub rule: String,
    /// The pattern (or URL) that fired.
    pub pattern: String,
    /// What the pattern resolved to.
    pub matched: String,
}

impl RuleExplain {
    pub fn new(rule: impl Into<String>, pattern: impl Into<String>, matched: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            pattern: pattern.into(),
            matched: matched.into(),
        }
    }
}

/// Fully normalized transaction ready for the rule engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedTransaction {
    /// 32-hex record id.
    pub id: String,
    /// Owning statement record.
    pub statement_id: String,
    pub booking_date: NaiveDate,
    /// Value date; falls back to the booking date when the bank omits it.
    pub value_date: NaiveDate,
    /// Signed amount quantized to 2 decimal places.
    pub amount: Decimal,
    pub currency: String,
    pub direction: Direction,
    pub balance_after: Option<Decimal>,
    /// Counterparty as printed on the statement.
    pub counterparty_raw: String,
    /// Uppercased, whitespace-collapsed counterparty for matching.
    pub counterparty_clean: String,
    /// Link into the counterparty memory, when resolved.
    pub counterparty_id: Option<String>,
    pub title: String,
    pub title_clean: String,
    /// Bank's own operation code.
    pub bank_category: String,
    /// Original row text, truncated to 500 characters.
    pub raw_text: String,
    /// Detected payment rail.
    pub channel: Channel,
    /// Category assigned by the rule engine ("" until classified).
    pub category: String,
    /// `category:subcategory` pair assigned by the rule engine.
    pub subcategory: String,
    /// Ordered risk tags; each non-label tag has a matching rule explain.
    pub risk_tags: Vec<String>,
    /// Per-transaction risk score, clamped to 0..=100.
    pub risk_score: u8,
    /// Full ordered decision trail.
    pub rule_explains: Vec<RuleExplain>,
    pub is_recurring: bool,
    pub recurring_group: String,
    /// URLs extracted from counterparty + title + raw text.
    pub urls: Vec<String>,
    /// 16-hex dedup hash, unique within a statement.
    pub tx_hash: String,
}

impl NormalizedTransaction {
    /// Absolute amount, used for statistics and graph aggregation.
    pub fn abs_amount(&self) -> Decimal {
        self.amount.abs()
    }

    /// Month key `YYYY-MM` of the booking date.
    pub fn month_key(&self) -> String {
        self.booking_date.format("%Y-%m").to_string()
    }

    /// Whether the given tag is present.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.risk_tags.iter().any(|t| t == tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_explain_roundtrip() {
        let e = RuleExplain::new("category:crypto:exchange", r"\bzonda\b", "crypto");
        let json = serde_json::to_string(&e).unwrap();
        let back: RuleExplain = serde_json::from_str(&json).unwrap();
        assert_eq!(e, back);
    }
}
