//! Aggregate statement risk scoring.

use std::collections::BTreeMap;

use amlscan_core::NormalizedTransaction;
use amlscan_config::RulesConfig;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One component of the aggregate risk score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskReason {
    /// Uppercased risk tag.
    pub tag: String,
    /// Number of transactions carrying the tag.
    pub count: usize,
    /// Sum of absolute amounts of those transactions.
    pub amount: Decimal,
    /// Share of the statement's total absolute volume, percent.
    pub pct_of_total: f64,
    /// Contribution added to the score.
    pub score_delta: f64,
    /// First ≤10 evidence transaction ids.
    pub evidence_tx_ids: Vec<String>,
}

#[derive(Default)]
struct TagAccumulator {
    count: usize,
    amount: Decimal,
    tx_ids: Vec<String>,
}

/// Compute the aggregate 0–100 risk score with per-tag reasons.
///
/// A tag's weight is scaled down when the tagged volume is under 10% of the
/// statement total: `effective = min(weight, weight * pct / 10)`. Reasons
/// are sorted by descending contribution (tag name breaks ties so output is
/// deterministic).
pub fn compute_risk_score(
    transactions: &[NormalizedTransaction],
    rules: &RulesConfig,
) -> (f64, Vec<RiskReason>) {
    let mut tags: BTreeMap<String, TagAccumulator> = BTreeMap::new();

    for tx in transactions {
        for tag in &tx.risk_tags {
            let acc = tags.entry(tag.to_uppercase()).or_default();
            acc.count += 1;
            acc.amount += tx.abs_amount();
            acc.tx_ids.push(tx.id.clone());
        }
    }

    let total_amount: Decimal = transactions.iter().map(|tx| tx.abs_amount()).sum();
    let total_f64 = total_amount.to_f64().unwrap_or(0.0);

    let mut score = 0.0;
    let mut reasons = Vec::new();

    for (tag, acc) in &tags {
        let weight = rules.weight_for_tag(tag).unwrap_or(0);
        if weight <= 0 {
            continue;
        }
        let tag_amount = acc.amount.to_f64().unwrap_or(0.0);
        let pct = if total_f64 > 0.0 {
            tag_amount / total_f64 * 100.0
        } else {
            0.0
        };
        let weight = f64::from(weight);
        let effective = if pct < 10.0 {
            (weight * pct / 10.0).min(weight)
        } else {
            weight
        };
        score += effective;
        reasons.push(RiskReason {
            tag: tag.clone(),
            count: acc.count,
            amount: acc.amount.round_dp(2),
            pct_of_total: (pct * 10.0).round() / 10.0,
            score_delta: (effective * 10.0).round() / 10.0,
            evidence_tx_ids: acc.tx_ids.iter().take(10).cloned().collect(),
        });
    }

    score = score.clamp(0.0, 100.0);
    reasons.sort_by(|a, b| {
        b.score_delta
            .total_cmp(&a.score_delta)
            .then_with(|| a.tag.cmp(&b.tag))
    });
    (score, reasons)
}
