//! End-to-end pipeline tests over hand-built parse outcomes.

use amlscan_config::SharedRules;
use amlscan_core::{CounterpartyLabel, ParseMethod, ParseOutcome, RawTransaction, StatementInfo};
use amlscan_pipeline::{CancellationToken, Pipeline, PipelineOptions, StageGuard};
use amlscan_store::Store;
use chrono::NaiveDate;
use rust_decimal_macros::dec;

fn d(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn pipeline() -> (Pipeline, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Store::open(dir.path().join("pipeline.db")).expect("store");
    (Pipeline::new(store, SharedRules::default()), dir)
}

fn analyze(pipeline: &Pipeline, outcome: ParseOutcome, pdf_hash: &str) -> amlscan_pipeline::PipelineResult {
    analyze_with(pipeline, outcome, pdf_hash, &PipelineOptions::default())
}

fn analyze_with(
    pipeline: &Pipeline,
    outcome: ParseOutcome,
    pdf_hash: &str,
    options: &PipelineOptions,
) -> amlscan_pipeline::PipelineResult {
    let guard = StageGuard::new(options.cancellation.clone(), options.stage_timeout_ms);
    let mut warnings = Vec::new();
    match pipeline.analyze(outcome, pdf_hash, false, 0.0, options, &guard, &mut warnings) {
        Ok(result) => result,
        Err(err) => panic!("pipeline failed: {err}"),
    }
}

/// Statement with opening 1000.00, three transactions, closing 4050.00.
fn happy_path_outcome() -> ParseOutcome {
    let mut info = StatementInfo::new("ing", "ING Bank Śląski");
    info.opening_balance = Some(dec!(1000.00));
    info.closing_balance = Some(dec!(4050.00));
    info.period_from = Some(d("2024-01-01"));
    info.period_to = Some(d("2024-01-31"));
    info.account_holder = "JAN KOWALSKI".to_string();

    let mut outcome = ParseOutcome::new(info, ParseMethod::Spatial);
    outcome.transactions = vec![
        RawTransaction::new(d("2024-01-05"), dec!(-150.00))
            .with_counterparty("BIEDRONKA WARSZAWA")
            .with_title("Zakup kartą")
            .with_bank_category("TR.KART"),
        RawTransaction::new(d("2024-01-10"), dec!(5000.00))
            .with_counterparty("PRACODAWCA SP Z O O")
            .with_title("Wynagrodzenie")
            .with_bank_category("PRZELEW"),
        RawTransaction::new(d("2024-01-15"), dec!(-800.00))
            .with_counterparty("WSPÓLNOTA MIESZKANIOWA")
            .with_title("Czynsz")
            .with_bank_category("ST.ZLEC"),
    ];
    outcome.page_count = 1;
    outcome
}

#[test]
fn test_happy_path() {
    let (pipeline, _dir) = pipeline();
    let result = analyze(&pipeline, happy_path_outcome(), "hash-s1");

    assert_eq!(result.status, "ok");
    assert_eq!(result.transaction_count, 3);
    assert!(result.balance_valid);
    assert_eq!(result.risk_score, 0.0);
    assert!(result.risk_reasons.is_empty());
    assert_eq!(result.bank, "ing");
    assert!(!result.statement_id.is_empty());
    assert!(result.report_html.contains("<!DOCTYPE html>"));
    assert!(result.pipeline_time_sec >= 0.0);

    // Channels were derived from the bank codes.
    let stored = pipeline
        .resolver()
        .store()
        .load_transactions(&result.statement_id)
        .unwrap();
    assert_eq!(stored[0].channel, amlscan_core::Channel::Card);
    assert_eq!(stored[1].channel, amlscan_core::Channel::Transfer);
    assert_eq!(stored[2].channel, amlscan_core::Channel::Transfer);
}

#[test]
fn test_duplicates_dropped_before_persistence() {
    let (pipeline, _dir) = pipeline();
    let mut outcome = happy_path_outcome();
    let duplicate = outcome.transactions[0].clone();
    outcome.transactions.push(duplicate.clone());
    outcome.transactions.push(duplicate);
    outcome.info.closing_balance = Some(dec!(3750.00));

    let result = analyze(&pipeline, outcome, "hash-dup");
    // Five raw rows, three distinct hashes.
    assert_eq!(result.transaction_count, 3);
}

#[test]
fn test_crypto_counterparty_flagged_and_scored() {
    let (pipeline, _dir) = pipeline();
    let mut outcome = happy_path_outcome();
    outcome.transactions.push(
        RawTransaction::new(d("2024-01-20"), dec!(-500.00))
            .with_counterparty("ZONDA SP Z O O")
            .with_title("Przelew na giełdę")
            .with_bank_category("PRZELEW"),
    );
    outcome.info.closing_balance = Some(dec!(3550.00));

    let result = analyze(&pipeline, outcome, "hash-crypto");
    assert!(result.risk_score > 0.0);
    assert!(result.risk_reasons.iter().any(|r| r.tag == "CRYPTO"));

    let stored = pipeline
        .resolver()
        .store()
        .load_transactions(&result.statement_id)
        .unwrap();
    let crypto_tx = stored
        .iter()
        .find(|t| t.counterparty_raw.contains("ZONDA"))
        .unwrap();
    assert!(crypto_tx.risk_tags.contains(&"crypto".to_string()));
    assert!(crypto_tx
        .rule_explains
        .iter()
        .any(|e| e.rule.starts_with("category:crypto:")));
    // The counterparty was learned into memory.
    assert!(crypto_tx.counterparty_id.is_some());
}

#[test]
fn test_blacklisted_memory_label_applies() {
    let (pipeline, _dir) = pipeline();
    pipeline
        .resolver()
        .store()
        .insert_counterparty("PODEJRZANA FIRMA", CounterpartyLabel::Blacklist, "uwaga", 1.0)
        .unwrap();

    let mut outcome = happy_path_outcome();
    outcome.transactions.push(
        RawTransaction::new(d("2024-01-21"), dec!(-100.00))
            .with_counterparty("PODEJRZANA FIRMA")
            .with_title("Przelew")
            .with_bank_category("PRZELEW"),
    );
    outcome.info.closing_balance = Some(dec!(3950.00));

    let result = analyze(&pipeline, outcome, "hash-blacklist");
    let stored = pipeline
        .resolver()
        .store()
        .load_transactions(&result.statement_id)
        .unwrap();
    let flagged = stored
        .iter()
        .find(|t| t.counterparty_raw == "PODEJRZANA FIRMA")
        .unwrap();
    assert!(flagged.risk_tags.contains(&"BLACKLISTED".to_string()));
    assert!(flagged.risk_score > 0);
}

#[test]
fn test_balance_chain_break_is_warning_not_failure() {
    let (pipeline, _dir) = pipeline();
    let mut outcome = happy_path_outcome();
    outcome.transactions[0].balance_after = Some(dec!(850.00));
    // Off by 100: expected 5850.00.
    outcome.transactions[1].balance_after = Some(dec!(5950.00));
    outcome.transactions[2].balance_after = Some(dec!(5150.00));

    let result = analyze(&pipeline, outcome, "hash-chain");
    assert_eq!(result.status, "ok");
    assert!(!result.balance_valid);
    assert!(result
        .warnings
        .iter()
        .any(|w| w.contains("Transakcja #2")));
    // Full outputs still produced.
    assert_eq!(result.transaction_count, 3);
    assert!(result.graph_stats.is_some());
}

#[test]
fn test_empty_statement_is_error_result() {
    let (pipeline, _dir) = pipeline();
    let outcome = ParseOutcome::new(StatementInfo::new("ing", "ING"), ParseMethod::Spatial);
    let guard = StageGuard::new(CancellationToken::new(), None);
    let mut warnings = Vec::new();
    let err = pipeline
        .analyze(
            outcome,
            "hash-empty",
            false,
            0.0,
            &PipelineOptions::default(),
            &guard,
            &mut warnings,
        )
        .unwrap_err();
    assert!(err.to_string().contains("no_transactions"));
}

#[test]
fn test_rerun_without_overwrite_creates_new_statement() {
    let (pipeline, _dir) = pipeline();
    let first = analyze(&pipeline, happy_path_outcome(), "hash-same");
    let second = analyze(&pipeline, happy_path_outcome(), "hash-same");
    assert_ne!(first.statement_id, second.statement_id);

    // Overwrite re-uses an existing statement id instead of minting a
    // third one.
    let third = analyze_with(
        &pipeline,
        happy_path_outcome(),
        "hash-same",
        &PipelineOptions {
            overwrite: true,
            ..Default::default()
        },
    );
    assert!(
        third.statement_id == first.statement_id || third.statement_id == second.statement_id
    );
}

#[test]
fn test_cancellation_before_stage() {
    let (pipeline, _dir) = pipeline();
    let token = CancellationToken::new();
    token.cancel();
    let guard = StageGuard::new(token, None);
    let mut warnings = Vec::new();
    let err = pipeline
        .analyze(
            happy_path_outcome(),
            "hash-cancel",
            false,
            0.0,
            &PipelineOptions::default(),
            &guard,
            &mut warnings,
        )
        .unwrap_err();
    assert!(err.to_string().contains("Cancelled"));
}

#[test]
fn test_deterministic_analysis_outputs() {
    let (pipeline_a, _dir_a) = pipeline();
    let (pipeline_b, _dir_b) = pipeline();

    let mut outcome = happy_path_outcome();
    outcome.transactions.push(
        RawTransaction::new(d("2024-01-20"), dec!(-500.00))
            .with_counterparty("ZONDA SP Z O O")
            .with_title("Przelew na giełdę")
            .with_bank_category("PRZELEW"),
    );
    outcome.info.closing_balance = Some(dec!(3550.00));

    let a = analyze(&pipeline_a, outcome.clone(), "hash-det");
    let b = analyze(&pipeline_b, outcome, "hash-det");

    assert_eq!(a.risk_score, b.risk_score);
    assert_eq!(
        serde_json::to_string(&a.alerts).unwrap(),
        serde_json::to_string(&b.alerts).unwrap()
    );
    assert_eq!(
        serde_json::to_string(&a.graph_stats).unwrap(),
        serde_json::to_string(&b.graph_stats).unwrap()
    );
    // Same tx hashes in the same order.
    let hashes = |p: &Pipeline, id: &str| -> Vec<String> {
        p.resolver()
            .store()
            .load_transactions(id)
            .unwrap()
            .into_iter()
            .map(|t| t.tx_hash)
            .collect()
    };
    assert_eq!(
        hashes(&pipeline_a, &a.statement_id),
        hashes(&pipeline_b, &b.statement_id)
    );
}

#[test]
fn test_audit_trail_written() {
    let (pipeline, _dir) = pipeline();
    let result = analyze(&pipeline, happy_path_outcome(), "hash-audit");
    let trail = pipeline
        .resolver()
        .store()
        .audit_for_case(&result.case_id)
        .unwrap();
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].0, "aml_analysis");
    assert_eq!(trail[0].1["pdf_hash"], "hash-audit");
    assert_eq!(trail[0].1["transactions"], 3);
}
