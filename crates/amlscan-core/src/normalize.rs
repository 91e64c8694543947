//! Raw-to-normalized transaction conversion with deduplication.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use tracing::debug;

use crate::channel::detect_channel;
use crate::hash::compute_tx_hash;
use crate::ids::new_id;
use crate::models::{Direction, NormalizedTransaction, RawTransaction};
use crate::text::{clean_text, truncate_chars};

/// Maximum stored length of the original row text.
pub const RAW_TEXT_LIMIT: usize = 500;

static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)https?://[^\s,;"'<>]+"#).expect("static regex"));

/// Extract all HTTP/HTTPS URLs from transaction text.
pub fn extract_urls(text: &str) -> Vec<String> {
    URL_RE.find_iter(text).map(|m| m.as_str().to_string()).collect()
}

/// Quantize a signed amount to 2 decimal places.
pub fn quantize(amount: Decimal) -> Decimal {
    amount.round_dp(2)
}

/// Convert raw parser output into normalized transactions.
///
/// Per transaction: quantize the amount, derive direction, clean the
/// counterparty and title, compute the dedup hash, detect the channel,
/// extract URLs, and truncate the raw text. Duplicates (same hash within
/// this statement) are dropped, first occurrence wins; parser order is
/// preserved otherwise.
pub fn normalize_transactions(
    raw_transactions: &[RawTransaction],
    statement_id: &str,
) -> Vec<NormalizedTransaction> {
    let mut results = Vec::with_capacity(raw_transactions.len());
    let mut seen_hashes: HashSet<String> = HashSet::new();

    for raw in raw_transactions {
        let amount = quantize(raw.amount);
        let direction = Direction::from_amount(amount);

        let cp_clean = clean_text(&raw.counterparty);
        let title_clean = clean_text(&raw.title);

        let tx_hash = compute_tx_hash(raw.booking_date, amount, &cp_clean, &title_clean);
        if !seen_hashes.insert(tx_hash.clone()) {
            debug!(tx_hash = %tx_hash, date = %raw.booking_date, "dropping duplicate transaction");
            continue;
        }

        let channel = detect_channel(&raw.bank_category, &raw.title, &raw.counterparty);
        let urls = extract_urls(&format!(
            "{} {} {}",
            raw.counterparty, raw.title, raw.raw_text
        ));

        results.push(NormalizedTransaction {
            id: new_id(),
            statement_id: statement_id.to_string(),
            booking_date: raw.booking_date,
            value_date: raw.value_date.unwrap_or(raw.booking_date),
            amount,
            currency: raw.currency.clone(),
            direction,
            balance_after: raw.balance_after.map(quantize),
            counterparty_raw: raw.counterparty.clone(),
            counterparty_clean: cp_clean,
            counterparty_id: None,
            title: raw.title.clone(),
            title_clean,
            bank_category: raw.bank_category.clone(),
            raw_text: truncate_chars(&raw.raw_text, RAW_TEXT_LIMIT),
            channel,
            category: String::new(),
            subcategory: String::new(),
            risk_tags: Vec::new(),
            risk_score: 0,
            rule_explains: Vec::new(),
            is_recurring: false,
            recurring_group: String::new(),
            urls,
            tx_hash,
        });
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Channel;
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn sample_raw() -> Vec<RawTransaction> {
        vec![
            RawTransaction::new(d("2024-01-05"), dec!(-150.00))
                .with_counterparty("BIEDRONKA WARSZAWA")
                .with_title("Zakup kartą")
                .with_bank_category("TR.KART"),
            RawTransaction::new(d("2024-01-07"), dec!(-500.00))
                .with_counterparty("ZONDA SP Z O O")
                .with_title("Przelew na giełdę kryptowalut")
                .with_bank_category("PRZELEW"),
            RawTransaction::new(d("2024-01-10"), dec!(5000.00))
                .with_counterparty("FIRMA XYZ SP Z O O")
                .with_title("Wynagrodzenie za styczeń")
                .with_bank_category("PRZELEW"),
            RawTransaction::new(d("2024-01-15"), dec!(-30.00))
                .with_counterparty("JAN KOWALSKI")
                .with_title("Przelew na telefon")
                .with_bank_category("P.BLIK"),
        ]
    }

    #[test]
    fn test_normalize_basic() {
        let normalized = normalize_transactions(&sample_raw(), "stmt_001");
        assert_eq!(normalized.len(), 4);
        assert!(normalized.iter().all(|n| n.tx_hash.len() == 16));
        assert!(normalized.iter().all(|n| n.statement_id == "stmt_001"));
        assert_eq!(normalized[0].channel, Channel::Card);
        assert_eq!(normalized[0].counterparty_clean, "BIEDRONKA WARSZAWA");
        assert_eq!(normalized[3].channel, Channel::BlikP2p);
    }

    #[test]
    fn test_dedup_first_wins() {
        let tx = RawTransaction::new(d("2024-01-05"), dec!(-100.00))
            .with_counterparty("TEST")
            .with_title("DUP");
        let normalized = normalize_transactions(&[tx.clone(), tx.clone(), tx], "s");
        assert_eq!(normalized.len(), 1);
    }

    #[test]
    fn test_value_date_fallback() {
        let mut tx = RawTransaction::new(d("2024-01-05"), dec!(-10.00));
        tx.value_date = Some(d("2024-01-06"));
        let normalized = normalize_transactions(&[tx], "s");
        assert_eq!(normalized[0].value_date, d("2024-01-06"));

        let tx2 = RawTransaction::new(d("2024-01-05"), dec!(-10.50));
        let normalized2 = normalize_transactions(&[tx2], "s");
        assert_eq!(normalized2[0].value_date, d("2024-01-05"));
    }

    #[test]
    fn test_url_extraction() {
        let urls = extract_urls("Płatność BLIK https://www.lotto.pl/ za los");
        assert_eq!(urls, vec!["https://www.lotto.pl/"]);
        assert!(extract_urls("no urls here").is_empty());
        // Quote and angle-bracket delimiters stop the match.
        let urls = extract_urls(r#"see "https://x.pl/a",next"#);
        assert_eq!(urls, vec!["https://x.pl/a"]);
    }

    #[test]
    fn test_raw_text_truncated() {
        let long = "x".repeat(800);
        let tx = RawTransaction::new(d("2024-01-05"), dec!(-1.00)).with_raw_text(&long);
        let normalized = normalize_transactions(&[tx], "s");
        assert_eq!(normalized[0].raw_text.chars().count(), RAW_TEXT_LIMIT);
    }

    /// Re-normalizing the projection of normalized output must be a fixpoint:
    /// same hashes, same count, same cleaned fields.
    #[test]
    fn test_normalize_idempotent() {
        let first = normalize_transactions(&sample_raw(), "s");
        let reprojected: Vec<RawTransaction> = first
            .iter()
            .map(|n| {
                let mut raw = RawTransaction::new(n.booking_date, n.amount);
                raw.value_date = Some(n.value_date);
                raw.counterparty = n.counterparty_raw.clone();
                raw.title = n.title.clone();
                raw.raw_text = n.raw_text.clone();
                raw.bank_category = n.bank_category.clone();
                raw.balance_after = n.balance_after;
                raw
            })
            .collect();
        let second = normalize_transactions(&reprojected, "s");
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.tx_hash, b.tx_hash);
            assert_eq!(a.counterparty_clean, b.counterparty_clean);
            assert_eq!(a.channel, b.channel);
            assert_eq!(a.amount, b.amount);
        }
    }

    proptest! {
        #[test]
        fn prop_direction_matches_sign(cents in -10_000_000i64..10_000_000i64) {
            let amount = Decimal::new(cents, 2);
            let tx = RawTransaction::new(d("2024-03-01"), amount);
            let normalized = normalize_transactions(&[tx], "s");
            let n = &normalized[0];
            prop_assert_eq!(
                n.direction == Direction::Credit,
                n.amount >= Decimal::ZERO
            );
        }

        #[test]
        fn prop_dedup_yields_unique_hashes(
            amounts in proptest::collection::vec(-100_000i64..100_000i64, 1..40)
        ) {
            let raw: Vec<RawTransaction> = amounts
                .iter()
                .map(|c| RawTransaction::new(d("2024-03-01"), Decimal::new(*c, 2)))
                .collect();
            let normalized = normalize_transactions(&raw, "s");
            let hashes: HashSet<&str> =
                normalized.iter().map(|n| n.tx_hash.as_str()).collect();
            prop_assert_eq!(hashes.len(), normalized.len());
        }
    }
}
