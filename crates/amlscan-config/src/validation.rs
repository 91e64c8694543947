//! Rules config validation.
//!
//! Unknown keys and malformed regexes are warnings, never errors: a typo in
//! the config must not take the classifier down.

use regex::Regex;

use crate::schema::RulesConfig;

/// Validate a loaded config, returning human-readable warnings.
pub fn validate_rules(rules: &RulesConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    for key in rules.unknown.keys() {
        warnings.push(format!("unknown top-level key '{key}' ignored"));
    }

    for (cat, subcats) in &rules.categories {
        for (subcat, patterns) in subcats {
            if patterns.is_empty() {
                warnings.push(format!("category {cat}:{subcat} has no patterns"));
            }
            for pattern in patterns {
                if let Err(e) = Regex::new(&format!("(?i){pattern}")) {
                    warnings.push(format!(
                        "category {cat}:{subcat}: bad pattern '{pattern}': {e}"
                    ));
                }
            }
        }
    }

    for (name, patterns) in &rules.risk_dictionary {
        for pattern in patterns {
            if let Err(e) = Regex::new(&format!("(?i){pattern}")) {
                warnings.push(format!("risk_dictionary {name}: bad pattern '{pattern}': {e}"));
            }
        }
    }

    for (tag, weight) in &rules.scoring {
        if weight.abs() > 100 {
            warnings.push(format!("scoring {tag}: weight {weight} exceeds ±100"));
        }
    }

    if rules.anomaly.outlier_zscore <= 0.0 {
        warnings.push("anomaly.outlier_zscore must be positive".to_string());
    }

    warnings
}
