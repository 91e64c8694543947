//! Monthly baseline construction.

use std::collections::BTreeMap;

use amlscan_core::{Direction, MonthlyProfile, NormalizedTransaction};
use rust_decimal::prelude::ToPrimitive;

/// Counterparty key as used in baselines: lowercased, truncated to 50 chars.
pub fn counterparty_key(counterparty_clean: &str) -> String {
    counterparty_clean.to_lowercase().chars().take(50).collect()
}

/// Build monthly profiles keyed by `YYYY-MM` of the booking date.
///
/// Order-independent: the same transaction set yields the same profiles
/// regardless of input order.
pub fn build_baseline(
    transactions: &[NormalizedTransaction],
) -> BTreeMap<String, MonthlyProfile> {
    let mut profiles: BTreeMap<String, MonthlyProfile> = BTreeMap::new();

    for tx in transactions {
        let profile = profiles.entry(tx.month_key()).or_default();
        profile.tx_count += 1;

        let abs = tx.abs_amount();
        profile.amounts.push(abs.to_f64().unwrap_or(0.0));

        match tx.direction {
            Direction::Credit => profile.total_credit += abs,
            Direction::Debit => profile.total_debit += abs,
        }

        if !tx.counterparty_clean.is_empty() {
            profile
                .counterparties
                .insert(counterparty_key(&tx.counterparty_clean));
        }
        *profile.channels.entry(tx.channel).or_insert(0) += 1;
        if !tx.category.is_empty() {
            *profile.categories.entry(tx.category.clone()).or_default() += abs;
        }
    }

    profiles
}
