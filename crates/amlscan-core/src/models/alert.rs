//! Anomaly alert model.

use serde::{Deserialize, Serialize};

/// Alert severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

/// A detected anomaly, with a human-readable Polish explanation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// Alert type, e.g. `LARGE_OUTLIER`, `P2P_BURST`.
    pub alert_type: String,
    pub severity: Severity,
    /// Score contribution read from the scoring table.
    pub score_delta: i32,
    /// Explanation with interpolated values.
    pub explain: String,
    /// First ≤10 evidence transaction ids.
    pub evidence_tx_ids: Vec<String>,
}

impl Alert {
    pub fn new(alert_type: &str, severity: Severity, score_delta: i32, explain: String) -> Self {
        Self {
            alert_type: alert_type.to_string(),
            severity,
            score_delta,
            explain,
            evidence_tx_ids: Vec::new(),
        }
    }

    /// Attach evidence transaction ids, keeping at most 10.
    pub fn with_evidence(mut self, ids: impl IntoIterator<Item = String>) -> Self {
        self.evidence_tx_ids = ids.into_iter().take(10).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evidence_capped_at_ten() {
        let alert = Alert::new("P2P_BURST", Severity::Medium, 15, "test".into())
            .with_evidence((0..25).map(|i| format!("tx{i}")));
        assert_eq!(alert.evidence_tx_ids.len(), 10);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::High < Severity::Critical);
    }
}
