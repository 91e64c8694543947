//! Balance reconciliation.
//!
//! Verifies parsed transactions against the statement's declared values.
//! Every check produces a warning on failure; a failed reconciliation
//! never blocks downstream stages, it is surfaced in the audit trail.

use amlscan_core::{RawTransaction, StatementInfo};
use rust_decimal::Decimal;

/// Allowed rounding slack for all balance checks.
pub const BALANCE_TOLERANCE: &str = "0.02";

/// Number of chain breaks reported in detail; the rest aggregate.
const CHAIN_BREAK_DETAIL_LIMIT: usize = 5;

/// Result of reconciling one statement.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub valid: bool,
    pub warnings: Vec<String>,
}

/// Verify parsed data against declared statement values.
///
/// Checks:
/// 1. `opening + Σamount ≈ closing` (±0.02)
/// 2. Per-transaction `balance_after` chain consistency
/// 3. Credit/debit sums vs the declared suma uznań / suma obciążeń
/// 4. Credit/debit counts vs the declared counts
pub fn validate_balance_chain(
    transactions: &[RawTransaction],
    info: &StatementInfo,
) -> Reconciliation {
    let tolerance: Decimal = BALANCE_TOLERANCE.parse().expect("static decimal");
    let mut warnings = Vec::new();
    let mut valid = true;

    let (Some(opening), Some(closing)) = (info.opening_balance, info.closing_balance) else {
        warnings.push("Brak salda początkowego lub końcowego — walidacja niemożliwa".to_string());
        return Reconciliation { valid: true, warnings };
    };

    let total: Decimal = transactions.iter().map(|t| t.amount).sum();
    let computed_closing = opening + total;
    let diff = (computed_closing - closing).abs();
    if diff > tolerance {
        warnings.push(format!(
            "ROZBIEŻNOŚĆ SALD: obliczone saldo końcowe = {computed_closing:.2}, \
             deklarowane = {closing:.2}, różnica = {diff:.2} PLN"
        ));
        valid = false;
    }

    // Per-transaction balance chain.
    let mut prev_balance = Some(opening);
    let mut chain_breaks = 0usize;
    let mut chain_warnings = Vec::new();
    for (i, tx) in transactions.iter().enumerate() {
        match (tx.balance_after, prev_balance) {
            (Some(actual), Some(prev)) => {
                let expected = prev + tx.amount;
                let tx_diff = (expected - actual).abs();
                if tx_diff > tolerance {
                    chain_breaks += 1;
                    if chain_breaks <= CHAIN_BREAK_DETAIL_LIMIT {
                        chain_warnings.push(format!(
                            "Transakcja #{} ({}): oczekiwane saldo {expected:.2}, \
                             odczytane {actual:.2} (różnica {tx_diff:.2})",
                            i + 1,
                            tx.booking_date,
                        ));
                    }
                }
                prev_balance = Some(actual);
            }
            (Some(actual), None) => prev_balance = Some(actual),
            (None, _) => {}
        }
    }
    if chain_breaks > CHAIN_BREAK_DETAIL_LIMIT {
        chain_warnings.push(format!(
            "...i {} kolejnych rozbieżności w łańcuchu sald",
            chain_breaks - CHAIN_BREAK_DETAIL_LIMIT
        ));
    }
    if chain_breaks > 0 {
        valid = false;
        warnings.push(format!(
            "Wykryto {chain_breaks} przerwań w łańcuchu sald transakcji"
        ));
    }
    warnings.extend(chain_warnings);

    // Declared sums and counts.
    let parsed_credits: Decimal = transactions
        .iter()
        .filter(|t| t.amount > Decimal::ZERO)
        .map(|t| t.amount)
        .sum();
    let parsed_debits: Decimal = transactions
        .iter()
        .filter(|t| t.amount < Decimal::ZERO)
        .map(|t| t.amount.abs())
        .sum();
    let parsed_credits_count = transactions
        .iter()
        .filter(|t| t.amount > Decimal::ZERO)
        .count() as u32;
    let parsed_debits_count = transactions
        .iter()
        .filter(|t| t.amount < Decimal::ZERO)
        .count() as u32;

    if let Some(declared) = info.declared_credits_sum {
        let diff = (parsed_credits - declared).abs();
        if diff > tolerance {
            warnings.push(format!(
                "SUMA UZNAŃ: sparsowano {parsed_credits:.2}, deklarowane {declared:.2}, \
                 różnica {diff:.2} PLN"
            ));
            valid = false;
        } else {
            warnings.push(format!("Suma uznań: OK ({parsed_credits:.2} ✓)"));
        }
    }
    if let Some(declared) = info.declared_debits_sum {
        let diff = (parsed_debits - declared).abs();
        if diff > tolerance {
            warnings.push(format!(
                "SUMA OBCIĄŻEŃ: sparsowano {parsed_debits:.2}, deklarowane {declared:.2}, \
                 różnica {diff:.2} PLN"
            ));
            valid = false;
        } else {
            warnings.push(format!("Suma obciążeń: OK ({parsed_debits:.2} ✓)"));
        }
    }
    if let Some(declared) = info.declared_credits_count {
        if parsed_credits_count != declared {
            warnings.push(format!(
                "LICZBA UZNAŃ: sparsowano {parsed_credits_count}, deklarowane {declared}"
            ));
            valid = false;
        }
    }
    if let Some(declared) = info.declared_debits_count {
        if parsed_debits_count != declared {
            warnings.push(format!(
                "LICZBA OBCIĄŻEŃ: sparsowano {parsed_debits_count}, deklarowane {declared}"
            ));
            valid = false;
        }
    }

    Reconciliation { valid, warnings }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn info(opening: Decimal, closing: Decimal) -> StatementInfo {
        let mut info = StatementInfo::new("test", "Test Bank");
        info.opening_balance = Some(opening);
        info.closing_balance = Some(closing);
        info
    }

    #[test]
    fn test_valid_chain() {
        let txns = vec![
            RawTransaction::new(d("2024-01-01"), dec!(-100.00)).with_balance_after(dec!(900.00)),
            RawTransaction::new(d("2024-01-02"), dec!(200.00)).with_balance_after(dec!(1100.00)),
            RawTransaction::new(d("2024-01-03"), dec!(-50.00)).with_balance_after(dec!(1050.00)),
        ];
        let result = validate_balance_chain(&txns, &info(dec!(1000.00), dec!(1050.00)));
        assert!(result.valid);
        assert!(!result.warnings.iter().any(|w| w.contains("ROZBIEŻNOŚĆ")));
    }

    #[test]
    fn test_closing_mismatch() {
        let txns = vec![
            RawTransaction::new(d("2024-01-01"), dec!(-100.00)),
            RawTransaction::new(d("2024-01-02"), dec!(200.00)),
        ];
        let result = validate_balance_chain(&txns, &info(dec!(1000.00), dec!(2000.00)));
        assert!(!result.valid);
        assert!(result.warnings.iter().any(|w| w.contains("ROZBIEŻNOŚĆ SALD")));
    }

    #[test]
    fn test_chain_break_mentions_index() {
        // Middle transaction's balance is off by 100.00.
        let txns = vec![
            RawTransaction::new(d("2024-01-05"), dec!(-150.00)).with_balance_after(dec!(850.00)),
            RawTransaction::new(d("2024-01-10"), dec!(5000.00)).with_balance_after(dec!(5950.00)),
            RawTransaction::new(d("2024-01-15"), dec!(-800.00)).with_balance_after(dec!(5150.00)),
        ];
        let result = validate_balance_chain(&txns, &info(dec!(1000.00), dec!(5050.00)));
        assert!(!result.valid);
        assert!(result.warnings.iter().any(|w| w.contains("Transakcja #2")));
    }

    #[test]
    fn test_chain_breaks_aggregate_after_five() {
        let txns: Vec<RawTransaction> = (0..8)
            .map(|i| {
                RawTransaction::new(d("2024-01-01"), dec!(-10.00))
                    .with_balance_after(Decimal::from(5000 + i))
            })
            .collect();
        let result = validate_balance_chain(&txns, &info(dec!(1000.00), dec!(920.00)));
        let detail_count = result
            .warnings
            .iter()
            .filter(|w| w.starts_with("Transakcja #"))
            .count();
        assert_eq!(detail_count, 5);
        assert!(result.warnings.iter().any(|w| w.contains("kolejnych rozbieżności")));
    }

    #[test]
    fn test_declared_sums_and_counts() {
        let txns = vec![
            RawTransaction::new(d("2024-01-01"), dec!(500.00)),
            RawTransaction::new(d("2024-01-02"), dec!(-200.00)),
        ];
        let mut info = info(dec!(1000.00), dec!(1300.00));
        info.declared_credits_sum = Some(dec!(500.00));
        info.declared_debits_sum = Some(dec!(200.00));
        info.declared_credits_count = Some(1);
        info.declared_debits_count = Some(1);
        let result = validate_balance_chain(&txns, &info);
        assert!(result.valid);
        assert!(result.warnings.iter().any(|w| w.contains("Suma uznań: OK")));

        info.declared_debits_count = Some(3);
        let result = validate_balance_chain(&txns, &info);
        assert!(!result.valid);
        assert!(result.warnings.iter().any(|w| w.contains("LICZBA OBCIĄŻEŃ")));
    }

    #[test]
    fn test_missing_balances_is_soft_pass() {
        let txns = vec![RawTransaction::new(d("2024-01-01"), dec!(-10.00))];
        let result = validate_balance_chain(&txns, &StatementInfo::new("t", "T"));
        assert!(result.valid);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_tolerance_boundary() {
        let txns = vec![RawTransaction::new(d("2024-01-01"), dec!(-100.00))];
        // Off by exactly 0.02: inside tolerance.
        let result = validate_balance_chain(&txns, &info(dec!(1000.00), dec!(899.98)));
        assert!(result.valid);
        // Off by 0.03: outside.
        let result = validate_balance_chain(&txns, &info(dec!(1000.00), dec!(899.97)));
        assert!(!result.valid);
    }
}
