//! Rules configuration schema.
//!
//! Categories, the risk dictionary, and URL-domain tables keep their config
//! file order: the first matching subcategory fixes a transaction's
//! category, so iteration order is part of the contract.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Root rules configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Config version string, recorded with every risk assessment.
    #[serde(default = "default_version")]
    pub version: String,
    /// Tag → score delta. Negative deltas are whitelist bonuses.
    #[serde(default)]
    pub scoring: IndexMap<String, i32>,
    /// category → subcategory → regex patterns.
    #[serde(default)]
    pub categories: IndexMap<String, IndexMap<String, Vec<String>>>,
    /// risk name → regex patterns; matches add a `RISK:<name>` tag.
    #[serde(default)]
    pub risk_dictionary: IndexMap<String, Vec<String>>,
    /// domain → category assignment for URLs found in transaction text.
    #[serde(default)]
    pub url_domains: IndexMap<String, UrlDomainRule>,
    /// Anomaly detector thresholds.
    #[serde(default)]
    pub anomaly: AnomalyThresholds,
    /// Unknown top-level keys, preserved so validation can warn about them.
    #[serde(flatten)]
    pub unknown: IndexMap<String, serde_yaml::Value>,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

/// Category assignment for a known URL domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlDomainRule {
    pub category: String,
    #[serde(default)]
    pub subcategory: String,
}

/// Thresholds for the anomaly detectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyThresholds {
    /// Z-score above which an amount is an outlier.
    #[serde(default = "default_outlier_zscore")]
    pub outlier_zscore: f64,
    /// New-counterparty amount threshold as a fraction of the monthly
    /// average debit.
    #[serde(default = "default_new_cp_large_pct")]
    pub new_cp_large_pct: f64,
    /// P2P transfers within a 7-day window that constitute a burst.
    #[serde(default = "default_p2p_burst_count")]
    pub p2p_burst_count: usize,
    /// Cash operations within a 3-day window that constitute a cluster.
    #[serde(default = "default_cash_cluster_count")]
    pub cash_cluster_count: usize,
    /// Monthly debit/credit ratio above which spending is flagged.
    #[serde(default = "default_spending_over_income_pct")]
    pub spending_over_income_pct: f64,
}

fn default_outlier_zscore() -> f64 {
    2.5
}
fn default_new_cp_large_pct() -> f64 {
    0.3
}
fn default_p2p_burst_count() -> usize {
    5
}
fn default_cash_cluster_count() -> usize {
    3
}
fn default_spending_over_income_pct() -> f64 {
    1.2
}

impl Default for AnomalyThresholds {
    fn default() -> Self {
        Self {
            outlier_zscore: default_outlier_zscore(),
            new_cp_large_pct: default_new_cp_large_pct(),
            p2p_burst_count: default_p2p_burst_count(),
            cash_cluster_count: default_cash_cluster_count(),
            spending_over_income_pct: default_spending_over_income_pct(),
        }
    }
}

impl RulesConfig {
    /// Look up the score weight for a risk tag.
    ///
    /// Lookup order: exact uppercased tag, then with `:` replaced by `_`,
    /// then with the `RISK_` prefix stripped. Returns `None` when the tag
    /// carries no weight.
    pub fn weight_for_tag(&self, tag: &str) -> Option<i32> {
        let upper = tag.to_uppercase();
        if let Some(w) = self.scoring.get(&upper) {
            return Some(*w);
        }
        let underscored = upper.replace(':', "_");
        if let Some(w) = self.scoring.get(&underscored) {
            return Some(*w);
        }
        let stripped = underscored
            .strip_prefix("RISK_")
            .unwrap_or(&underscored);
        self.scoring.get(stripped).copied()
    }

    /// Score delta applied for whitelisted counterparties (typically negative).
    pub fn whitelist_delta(&self) -> i32 {
        self.scoring.get("WHITELIST_MATCH").copied().unwrap_or(-10)
    }

    /// Score delta applied for blacklisted counterparties.
    pub fn blacklist_delta(&self) -> i32 {
        self.scoring.get("BLACKLIST_MATCH").copied().unwrap_or(30)
    }
}

/// Minimal built-in configuration used when no rules file is present.
///
/// Carries the standard scoring table plus the core Polish category
/// dictionaries so classification still works out of the box.
pub fn default_rules() -> RulesConfig {
    let yaml = include_str!("default_rules.yaml");
    serde_yaml::from_str(yaml).expect("built-in rules must parse")
}
