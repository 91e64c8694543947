//! Deterministic hashing for deduplication and document identity.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

use crate::text::truncate_chars;

/// Compute the dedup hash for a transaction.
///
/// The key is `date|amount|counterparty[:50]|title[:100]` and the hash is
/// the first 16 hex characters of its SHA-256. The amount is rendered with
/// exactly two decimal places so that `150`, `150.0` and `150.00` collide.
pub fn compute_tx_hash(
    date: NaiveDate,
    amount: Decimal,
    counterparty_clean: &str,
    title_clean: &str,
) -> String {
    let key = format!(
        "{}|{}|{}|{}",
        date.format("%Y-%m-%d"),
        amount.round_dp(2),
        truncate_chars(counterparty_clean, 50),
        truncate_chars(title_clean, 100),
    );
    let digest = Sha256::digest(key.as_bytes());
    hex::encode(digest)[..16].to_string()
}

/// SHA-256 of document bytes, hex encoded.
///
/// Used as the idempotency key for re-uploads of the same PDF.
pub fn compute_doc_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
