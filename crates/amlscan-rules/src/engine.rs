//! Classification engine.

use std::collections::HashMap;
use std::sync::Arc;

use amlscan_core::{
    strip_diacritics, CounterpartyLabel, NormalizedTransaction, RuleExplain,
};
use amlscan_config::RulesConfig;
use regex::Regex;
use tracing::warn;

/// A compiled category pattern.
struct CategoryPattern {
    category: String,
    subcategory: String,
    pattern: String,
    regex: Regex,
}

/// A compiled risk-dictionary entry.
struct RiskPattern {
    name: String,
    pattern: String,
    regex: Regex,
}

/// Result of applying all rules to a single transaction.
#[derive(Debug, Clone, Default)]
pub struct RuleOutcome {
    pub category: String,
    pub subcategory: String,
    pub risk_tags: Vec<String>,
    /// Clamped to 0..=100.
    pub risk_score: u8,
    pub explains: Vec<RuleExplain>,
    pub is_whitelisted: bool,
    pub is_blacklisted: bool,
}

/// Rule engine over a compiled config snapshot.
///
/// Compilation happens once per config load; malformed patterns are skipped
/// with a single warning each, per the config contract.
pub struct RuleEngine {
    rules: Arc<RulesConfig>,
    category_patterns: Vec<CategoryPattern>,
    risk_patterns: Vec<RiskPattern>,
}

impl RuleEngine {
    /// Compile the config into a ready engine.
    pub fn new(rules: Arc<RulesConfig>) -> Self {
        let mut category_patterns = Vec::new();
        for (cat, subcats) in &rules.categories {
            for (subcat, patterns) in subcats {
                for pattern in patterns {
                    match Regex::new(&format!("(?i){pattern}")) {
                        Ok(regex) => category_patterns.push(CategoryPattern {
                            category: cat.clone(),
                            subcategory: subcat.clone(),
                            pattern: pattern.clone(),
                            regex,
                        }),
                        Err(e) => {
                            warn!(category = %cat, subcategory = %subcat, pattern = %pattern,
                                  "skipping malformed pattern: {e}");
                        }
                    }
                }
            }
        }

        let mut risk_patterns = Vec::new();
        for (name, patterns) in &rules.risk_dictionary {
            for pattern in patterns {
                match Regex::new(&format!("(?i){pattern}")) {
                    Ok(regex) => risk_patterns.push(RiskPattern {
                        name: name.clone(),
                        pattern: pattern.clone(),
                        regex,
                    }),
                    Err(e) => {
                        warn!(risk = %name, pattern = %pattern, "skipping malformed pattern: {e}");
                    }
                }
            }
        }

        Self {
            rules,
            category_patterns,
            risk_patterns,
        }
    }

    /// The config snapshot this engine was compiled from.
    pub fn rules(&self) -> &RulesConfig {
        &self.rules
    }

    /// Apply all rules to a single transaction.
    pub fn classify(
        &self,
        tx: &NormalizedTransaction,
        counterparty_label: CounterpartyLabel,
        counterparty_note: &str,
    ) -> RuleOutcome {
        let mut outcome = RuleOutcome::default();
        let search = format!(
            "{} {} {}",
            tx.counterparty_clean, tx.title_clean, tx.raw_text
        )
        .to_lowercase();
        let search_ascii = strip_diacritics(&search);
        let mut score: i64 = 0;

        // Category dictionaries: the first matching pattern per subcategory
        // counts, and the first matching subcategory overall fixes the
        // category. Config order decides ties.
        let mut matched_subcats: Vec<(String, String)> = Vec::new();
        for cp in &self.category_patterns {
            let key = (cp.category.clone(), cp.subcategory.clone());
            if matched_subcats.contains(&key) {
                continue;
            }
            if cp.regex.is_match(&search) || cp.regex.is_match(&search_ascii) {
                if outcome.category.is_empty() {
                    outcome.category = cp.category.clone();
                }
                if outcome.subcategory.is_empty() {
                    outcome.subcategory = format!("{}:{}", cp.category, cp.subcategory);
                }
                if !outcome.risk_tags.contains(&cp.category) {
                    outcome.risk_tags.push(cp.category.clone());
                }
                outcome.explains.push(RuleExplain::new(
                    format!("category:{}:{}", cp.category, cp.subcategory),
                    cp.pattern.clone(),
                    cp.category.clone(),
                ));
                matched_subcats.push(key);
            }
        }

        // Risk dictionary: one tag per entry.
        let mut matched_risks: Vec<&str> = Vec::new();
        for rp in &self.risk_patterns {
            if matched_risks.contains(&rp.name.as_str()) {
                continue;
            }
            if rp.regex.is_match(&search) || rp.regex.is_match(&search_ascii) {
                let tag = format!("RISK:{}", rp.name);
                if !outcome.risk_tags.contains(&tag) {
                    outcome.risk_tags.push(tag);
                }
                outcome.explains.push(RuleExplain::new(
                    format!("risk:{}", rp.name),
                    rp.pattern.clone(),
                    rp.name.clone(),
                ));
                matched_risks.push(rp.name.as_str());
            }
        }

        // URL-domain table.
        for url in &tx.urls {
            let domain = extract_domain(url);
            if let Some(rule) = self.rules.url_domains.get(&domain) {
                if !rule.category.is_empty() && !outcome.risk_tags.contains(&rule.category) {
                    outcome.risk_tags.push(rule.category.clone());
                }
                if outcome.category.is_empty() {
                    outcome.category = rule.category.clone();
                }
                if outcome.subcategory.is_empty() {
                    outcome.subcategory = format!("{}:{}", rule.category, rule.subcategory);
                }
                outcome.explains.push(RuleExplain::new(
                    format!("url_domain:{domain}"),
                    url.clone(),
                    format!("{}:{}", rule.category, rule.subcategory),
                ));
            }
        }

        // Counterparty memory labels.
        match counterparty_label {
            CounterpartyLabel::Whitelist => {
                outcome.is_whitelisted = true;
                score += i64::from(self.rules.whitelist_delta());
                outcome
                    .explains
                    .push(RuleExplain::new("memory:whitelist", "", "whitelist"));
            }
            CounterpartyLabel::Blacklist => {
                outcome.is_blacklisted = true;
                score += i64::from(self.rules.blacklist_delta());
                outcome.risk_tags.push("BLACKLISTED".to_string());
                outcome.explains.push(RuleExplain::new(
                    "memory:blacklist",
                    counterparty_note,
                    "blacklist",
                ));
            }
            CounterpartyLabel::Neutral => {}
        }

        // Sum tag weights and clamp.
        for tag in &outcome.risk_tags {
            if let Some(weight) = self.rules.weight_for_tag(tag) {
                score += i64::from(weight);
            }
        }
        outcome.risk_score = score.clamp(0, 100) as u8;

        outcome
    }

    /// Classify all transactions in place, applying the outcome back onto
    /// each transaction.
    pub fn classify_all(
        &self,
        transactions: &mut [NormalizedTransaction],
        labels: &HashMap<String, CounterpartyLabel>,
        notes: &HashMap<String, String>,
    ) -> Vec<RuleOutcome> {
        let mut outcomes = Vec::with_capacity(transactions.len());
        for tx in transactions.iter_mut() {
            let key = tx.counterparty_clean.to_lowercase();
            let label = labels.get(&key).copied().unwrap_or_default();
            let note = notes.get(&key).map(String::as_str).unwrap_or("");
            let outcome = self.classify(tx, label, note);

            tx.category = outcome.category.clone();
            tx.subcategory = outcome.subcategory.clone();
            tx.risk_tags = outcome.risk_tags.clone();
            tx.risk_score = outcome.risk_score;
            tx.rule_explains = outcome.explains.clone();

            outcomes.push(outcome);
        }
        outcomes
    }
}

/// Extract the bare domain from a URL.
fn extract_domain(url: &str) -> String {
    let lower = url.to_lowercase();
    let trimmed = lower.trim_end_matches('/');
    let after_scheme = match trimmed.split_once("://") {
        Some((_, rest)) => rest,
        None => trimmed,
    };
    let host = after_scheme
        .split('/')
        .next()
        .unwrap_or("")
        .split(':')
        .next()
        .unwrap_or("");
    host.strip_prefix("www.").unwrap_or(host).to_string()
}
