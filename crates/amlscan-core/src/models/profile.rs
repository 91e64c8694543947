//! Monthly baseline profile.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::channel::Channel;

/// Monthly statistics used as the anomaly-detection baseline.
///
/// Accumulated per `YYYY-MM` key. Amounts are stored as absolutes for the
/// distribution statistics; credit/debit totals keep the split. Collections
/// are ordered so serialized profiles are byte-stable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonthlyProfile {
    pub tx_count: usize,
    pub total_credit: Decimal,
    pub total_debit: Decimal,
    /// Absolute amounts, in statement order, as f64 for statistics only.
    pub amounts: Vec<f64>,
    /// Unique counterparties, lowercased and truncated to 50 chars.
    pub counterparties: BTreeSet<String>,
    /// Transaction count per channel.
    pub channels: BTreeMap<Channel, usize>,
    /// Absolute amount per rule category.
    pub categories: BTreeMap<String, Decimal>,
}

impl MonthlyProfile {
    /// Median of absolute amounts.
    pub fn median(&self) -> f64 {
        if self.amounts.is_empty() {
            return 0.0;
        }
        let mut sorted = self.amounts.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let n = sorted.len();
        if n % 2 == 0 {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        } else {
            sorted[n / 2]
        }
    }

    /// Mean of absolute amounts.
    pub fn mean(&self) -> f64 {
        if self.amounts.is_empty() {
            return 0.0;
        }
        self.amounts.iter().sum::<f64>() / self.amounts.len() as f64
    }

    /// Sample standard deviation of absolute amounts.
    pub fn std(&self) -> f64 {
        if self.amounts.len() < 2 {
            return 0.0;
        }
        let m = self.mean();
        let var = self
            .amounts
            .iter()
            .map(|x| (x - m) * (x - m))
            .sum::<f64>()
            / (self.amounts.len() - 1) as f64;
        var.sqrt()
    }

    /// 95th percentile of absolute amounts (nearest-rank).
    pub fn p95(&self) -> f64 {
        if self.amounts.is_empty() {
            return 0.0;
        }
        let mut sorted = self.amounts.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let idx = ((0.95 * sorted.len() as f64) as usize).min(sorted.len() - 1);
        sorted[idx]
    }
}
