//! Anomaly detection against the monthly baseline.

use std::collections::{BTreeMap, HashSet};

use amlscan_core::{Alert, Channel, MonthlyProfile, NormalizedTransaction, Severity};
use amlscan_config::RulesConfig;
use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use tracing::debug;

use crate::baseline::{build_baseline, counterparty_key};

fn score_delta(rules: &RulesConfig, alert_type: &str, default: i32) -> i32 {
    rules.scoring.get(alert_type).copied().unwrap_or(default)
}

/// Detect anomalies in a transaction set.
///
/// `baseline` is the historical profile set; when absent the current
/// transactions serve as their own baseline (which disables the
/// new-counterparty detector by construction). `known_counterparties`
/// holds names already present in the counterparty memory.
pub fn detect_anomalies(
    transactions: &[NormalizedTransaction],
    baseline: Option<&BTreeMap<String, MonthlyProfile>>,
    known_counterparties: &HashSet<String>,
    rules: &RulesConfig,
) -> Vec<Alert> {
    let thresholds = &rules.anomaly;
    let mut alerts = Vec::new();

    let current = build_baseline(transactions);
    let baseline = match baseline {
        Some(b) if !b.is_empty() => b,
        _ => &current,
    };

    // Aggregate baseline statistics.
    let mut all_amounts: Vec<f64> = Vec::new();
    let mut total_debit = 0.0;
    let mut all_counterparties: HashSet<&str> = HashSet::new();
    for profile in baseline.values() {
        all_amounts.extend_from_slice(&profile.amounts);
        total_debit += profile.total_debit.to_f64().unwrap_or(0.0);
        all_counterparties.extend(profile.counterparties.iter().map(String::as_str));
    }
    if all_amounts.is_empty() {
        return alerts;
    }

    let mean = all_amounts.iter().sum::<f64>() / all_amounts.len() as f64;
    let variance = all_amounts
        .iter()
        .map(|x| (x - mean) * (x - mean))
        .sum::<f64>()
        / (all_amounts.len().saturating_sub(1).max(1)) as f64;
    let std = variance.sqrt();

    // 1. Amount outliers.
    if std > 0.0 {
        for tx in transactions {
            let amt = tx.abs_amount().to_f64().unwrap_or(0.0);
            let zscore = (amt - mean) / std;
            if zscore > thresholds.outlier_zscore {
                let severity = if zscore > 4.0 {
                    Severity::High
                } else {
                    Severity::Medium
                };
                alerts.push(
                    Alert::new(
                        "LARGE_OUTLIER",
                        severity,
                        score_delta(rules, "LARGE_OUTLIER", 20),
                        format!(
                            "Kwota {amt:.2} PLN znacząco odbiega od średniej \
                             ({mean:.2} ± {std:.2}), z-score={zscore:.1}"
                        ),
                    )
                    .with_evidence([tx.id.clone()]),
                );
            }
        }
    }

    // 2. New counterparty with a large amount.
    let monthly_avg = total_debit / baseline.len().max(1) as f64;
    if monthly_avg > 0.0 {
        for tx in transactions {
            if tx.counterparty_clean.is_empty() {
                continue;
            }
            let key = counterparty_key(&tx.counterparty_clean);
            if all_counterparties.contains(key.as_str()) || known_counterparties.contains(&key) {
                continue;
            }
            let amt = tx.abs_amount().to_f64().unwrap_or(0.0);
            if amt > monthly_avg * thresholds.new_cp_large_pct {
                let cp_short: String = tx.counterparty_raw.chars().take(40).collect();
                alerts.push(
                    Alert::new(
                        "NEW_COUNTERPARTY_LARGE",
                        Severity::Medium,
                        score_delta(rules, "NEW_COUNTERPARTY_LARGE", 15),
                        format!(
                            "Nowy kontrahent '{cp_short}' z kwotą {amt:.2} PLN \
                             ({:.0}% średnich miesięcznych wydatków)",
                            amt / monthly_avg * 100.0
                        ),
                    )
                    .with_evidence([tx.id.clone()]),
                );
            }
        }
    }

    // 3. P2P burst: ≥N BLIK P2P transfers inside any 7-day window.
    if let Some(alert) = detect_window_burst(
        transactions,
        Channel::BlikP2p,
        7,
        thresholds.p2p_burst_count,
        |count, total, start| {
            format!("{count} przelewów P2P w 7 dni (od {start}), łącznie {total:.2} PLN")
        },
        "P2P_BURST",
        score_delta(rules, "P2P_BURST", 15),
    ) {
        alerts.push(alert);
    }

    // 4. Cash cluster: ≥N cash operations inside any 3-day window.
    if let Some(alert) = detect_window_burst(
        transactions,
        Channel::Cash,
        3,
        thresholds.cash_cluster_count,
        |count, total, start| {
            format!("{count} operacji gotówkowych w 3 dni (od {start}), łącznie {total:.2} PLN")
        },
        "CASH_CLUSTER",
        score_delta(rules, "CASH_CLUSTER", 10),
    ) {
        alerts.push(alert);
    }

    // 5. Monthly spending over income.
    for (month, profile) in &current {
        let credit = profile.total_credit.to_f64().unwrap_or(0.0);
        let debit = profile.total_debit.to_f64().unwrap_or(0.0);
        if credit <= 0.0 {
            continue;
        }
        let ratio = debit / credit;
        if ratio > thresholds.spending_over_income_pct {
            let severity = if ratio > 1.5 {
                Severity::High
            } else {
                Severity::Medium
            };
            alerts.push(Alert::new(
                "SPENDING_OVER_INCOME",
                severity,
                score_delta(rules, "SPENDING_OVER_INCOME", 10),
                format!(
                    "Miesiąc {month}: wydatki ({debit:.2}) przekraczają wpływy \
                     ({credit:.2}) — stosunek {:.0}%",
                    ratio * 100.0
                ),
            ));
        }
    }

    debug!(alerts = alerts.len(), "anomaly detection finished");
    alerts
}

/// Slide a day-window over transactions of one channel; report the first
/// window reaching `min_count`, or nothing.
fn detect_window_burst(
    transactions: &[NormalizedTransaction],
    channel: Channel,
    window_days: i64,
    min_count: usize,
    explain: impl Fn(usize, f64, NaiveDate) -> String,
    alert_type: &str,
    delta: i32,
) -> Option<Alert> {
    let filtered: Vec<&NormalizedTransaction> = transactions
        .iter()
        .filter(|tx| tx.channel == channel)
        .collect();
    if filtered.len() < min_count || min_count == 0 {
        return None;
    }

    let mut by_date: BTreeMap<NaiveDate, Vec<&NormalizedTransaction>> = BTreeMap::new();
    for tx in &filtered {
        by_date.entry(tx.booking_date).or_default().push(tx);
    }

    let dates: Vec<NaiveDate> = by_date.keys().copied().collect();
    for (i, start) in dates.iter().enumerate() {
        let mut window: Vec<&NormalizedTransaction> = Vec::new();
        for date in &dates[i..] {
            if (*date - *start).num_days() <= window_days {
                window.extend(by_date[date].iter().copied());
            } else {
                break;
            }
        }
        if window.len() >= min_count {
            let total: f64 = window
                .iter()
                .map(|tx| tx.abs_amount().to_f64().unwrap_or(0.0))
                .sum();
            let alert = Alert::new(
                alert_type,
                Severity::Medium,
                delta,
                explain(window.len(), total, *start),
            )
            .with_evidence(window.iter().map(|tx| tx.id.clone()));
            return Some(alert);
        }
    }
    None
}
