//! Counterparty memory models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User-assigned counterparty label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CounterpartyLabel {
    #[default]
    Neutral,
    Whitelist,
    Blacklist,
}

impl CounterpartyLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            CounterpartyLabel::Neutral => "neutral",
            CounterpartyLabel::Whitelist => "whitelist",
            CounterpartyLabel::Blacklist => "blacklist",
        }
    }

    /// Parse from the persisted string form; unknown values are neutral.
    pub fn parse(s: &str) -> Self {
        match s {
            "whitelist" => CounterpartyLabel::Whitelist,
            "blacklist" => CounterpartyLabel::Blacklist,
            _ => CounterpartyLabel::Neutral,
        }
    }
}

/// Long-lived counterparty profile shared across statements and cases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CounterpartyProfile {
    /// 32-hex record id.
    pub id: String,
    /// Canonical display name, diacritics preserved.
    pub canonical_name: String,
    pub label: CounterpartyLabel,
    pub note: String,
    /// Alternate spellings that resolve to this profile.
    pub aliases: Vec<String>,
    /// Resolution confidence at creation/link time.
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_parse() {
        assert_eq!(CounterpartyLabel::parse("whitelist"), CounterpartyLabel::Whitelist);
        assert_eq!(CounterpartyLabel::parse("blacklist"), CounterpartyLabel::Blacklist);
        assert_eq!(CounterpartyLabel::parse("garbage"), CounterpartyLabel::Neutral);
    }
}
