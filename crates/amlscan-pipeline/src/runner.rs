//! Pipeline orchestration.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use amlscan_analytics::{build_baseline, detect_anomalies};
use amlscan_config::SharedRules;
use amlscan_core::{
    compute_doc_hash, normalize_name, normalize_transactions, Alert, AmlError, CounterpartyLabel,
    ParseMethod, ParseOutcome,
};
use amlscan_graph::{build_graph, GraphStats};
use amlscan_memory::EntityResolver;
use amlscan_parsers::{
    extract_words_from_bytes, pages_to_text, parse_text_statement, spatial_parse,
    validate_balance_chain, ParseCache,
};
use amlscan_rules::{compute_risk_score, RiskReason, RuleEngine};
use amlscan_store::{StatementAudit, Store, StoreError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::cancel::{CancellationToken, StageGuard};
use crate::collaborators::{needs_ocr, OcrEngine};
use crate::report::{HtmlReport, ReportInput, ReportRenderer};

/// Pipeline failure; never leaves [`Pipeline::run`] unwrapped.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Aml(#[from] AmlError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Options for one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Existing case to attach the statement to; a new case is created
    /// when absent.
    pub case_id: Option<String>,
    /// Project for a newly created case; the default AML project when
    /// absent.
    pub project_id: Option<String>,
    /// Re-use the statement id when the same document was analyzed
    /// before (deletes the previous statement data first).
    pub overwrite: bool,
    /// Per-run deadline checked at stage boundaries.
    pub stage_timeout_ms: Option<u64>,
    /// Cooperative cancellation flag.
    pub cancellation: CancellationToken,
}

/// Everything a pipeline run produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    /// "ok" or "error".
    pub status: String,
    pub error: Option<String>,
    pub case_id: String,
    pub statement_id: String,
    pub bank: String,
    pub bank_name: String,
    pub transaction_count: usize,
    pub risk_score: f64,
    pub risk_reasons: Vec<RiskReason>,
    pub alerts: Vec<Alert>,
    pub graph_stats: Option<GraphStats>,
    pub balance_valid: bool,
    pub ocr_used: bool,
    pub warnings: Vec<String>,
    pub report_html: String,
    pub pipeline_time_sec: f64,
}

impl PipelineResult {
    fn error(error: String, warnings: Vec<String>, elapsed: f64) -> Self {
        Self {
            status: "error".to_string(),
            error: Some(error),
            case_id: String::new(),
            statement_id: String::new(),
            bank: String::new(),
            bank_name: String::new(),
            transaction_count: 0,
            risk_score: 0.0,
            risk_reasons: Vec::new(),
            alerts: Vec::new(),
            graph_stats: None,
            balance_valid: false,
            ocr_used: false,
            warnings,
            report_html: String::new(),
            pipeline_time_sec: elapsed,
        }
    }
}

/// The analysis pipeline.
pub struct Pipeline {
    store: Store,
    resolver: EntityResolver,
    rules: SharedRules,
    ocr: Option<Box<dyn OcrEngine>>,
    renderer: Box<dyn ReportRenderer>,
    parse_cache: ParseCache,
}

impl Pipeline {
    pub fn new(store: Store, rules: SharedRules) -> Self {
        let resolver = EntityResolver::new(store.clone());
        Self {
            store,
            resolver,
            rules,
            ocr: None,
            renderer: Box::new(HtmlReport),
            parse_cache: ParseCache::new(),
        }
    }

    /// Attach an OCR collaborator.
    pub fn with_ocr(mut self, ocr: Box<dyn OcrEngine>) -> Self {
        self.ocr = Some(ocr);
        self
    }

    /// Replace the report renderer.
    pub fn with_renderer(mut self, renderer: Box<dyn ReportRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Entity resolver (for label management around runs).
    pub fn resolver(&self) -> &EntityResolver {
        &self.resolver
    }

    /// Cached spatial parse results, for user-confirmed re-parses.
    pub fn parse_cache(&self) -> &ParseCache {
        &self.parse_cache
    }

    /// Run the full pipeline on a statement PDF.
    ///
    /// Never panics and never returns a raw error: failures come back as
    /// `status = "error"` with the warnings collected so far.
    pub fn run(&self, pdf_path: &Path, options: &PipelineOptions) -> PipelineResult {
        let guard = StageGuard::new(options.cancellation.clone(), options.stage_timeout_ms);
        let mut warnings = Vec::new();
        match self.try_run(pdf_path, options, &guard, &mut warnings) {
            Ok(result) => result,
            Err(err) => {
                warn!(error = %err, "pipeline failed");
                PipelineResult::error(err.to_string(), warnings, guard.elapsed_secs())
            }
        }
    }

    fn try_run(
        &self,
        pdf_path: &Path,
        options: &PipelineOptions,
        guard: &StageGuard,
        warnings: &mut Vec<String>,
    ) -> Result<PipelineResult, PipelineError> {
        guard.checkpoint("parse")?;
        let bytes = std::fs::read(pdf_path).map_err(AmlError::from)?;
        let pdf_hash = compute_doc_hash(&bytes);

        let pages = extract_words_from_bytes(&bytes)?;
        let page_count = pages.len();
        let extracted_chars: usize = pages.iter().map(|p| p.char_count()).sum();
        let text = pages_to_text(&pages);

        let mut ocr_used = false;
        let mut ocr_confidence = 0.0;
        let outcome = if needs_ocr(extracted_chars, page_count) {
            match &self.ocr {
                Some(engine) => match engine.ocr(&bytes) {
                    Ok((ocr_text, confidence)) if !ocr_text.trim().is_empty() => {
                        info!(confidence, "text layer empty, OCR text used");
                        ocr_used = true;
                        ocr_confidence = confidence;
                        parse_text_statement(&ocr_text, ParseMethod::Ocr)
                    }
                    Ok(_) => {
                        warnings.push("OCR nie zwrócił tekstu — analiza ograniczona".to_string());
                        self.parse_pages(pdf_path, pages, &text, warnings)
                    }
                    Err(err) => {
                        warnings.push(format!("OCR nie powiódł się: {err}"));
                        self.parse_pages(pdf_path, pages, &text, warnings)
                    }
                },
                None => {
                    warnings
                        .push("Brak warstwy tekstowej, OCR niedostępny".to_string());
                    self.parse_pages(pdf_path, pages, &text, warnings)
                }
            }
        } else {
            self.parse_pages(pdf_path, pages, &text, warnings)
        };

        let mut outcome = outcome;
        outcome.page_count = page_count;

        self.analyze(outcome, &pdf_hash, ocr_used, ocr_confidence, options, guard, warnings)
    }

    /// Spatial parse with text fallback when no header row is found.
    fn parse_pages(
        &self,
        pdf_path: &Path,
        pages: Vec<amlscan_parsers::PageData>,
        text: &str,
        warnings: &mut Vec<String>,
    ) -> ParseOutcome {
        match spatial_parse(pages) {
            Ok(result) => {
                let cached = self.parse_cache.insert(pdf_path.to_path_buf(), result);
                cached.outcome.clone()
            }
            Err(err) => {
                warnings.push(format!(
                    "Parser przestrzenny nie znalazł tabeli ({err}) — użyto analizy tekstowej"
                ));
                parse_text_statement(text, ParseMethod::Text)
            }
        }
    }

    /// Run every stage after parsing. Public so callers with an existing
    /// parse (MT940 import, confirmed re-parse) enter the same path.
    #[allow(clippy::too_many_arguments)]
    pub fn analyze(
        &self,
        outcome: ParseOutcome,
        pdf_hash: &str,
        ocr_used: bool,
        ocr_confidence: f64,
        options: &PipelineOptions,
        guard: &StageGuard,
        warnings: &mut Vec<String>,
    ) -> Result<PipelineResult, PipelineError> {
        let rules = self.rules.get();
        let info = outcome.info.clone();
        warnings.extend(outcome.warnings.iter().cloned());

        if outcome.transactions.is_empty() {
            return Err(AmlError::invalid_data("no_transactions").into());
        }
        info!(
            bank = %info.bank_id,
            transactions = outcome.transactions.len(),
            "statement parsed"
        );

        // Reconciliation: diagnostic, never a gate.
        guard.checkpoint("reconcile")?;
        let reconciliation = validate_balance_chain(&outcome.transactions, &info);
        let balance_valid = reconciliation.valid;
        warnings.extend(reconciliation.warnings);

        // Case + statement records.
        guard.checkpoint("persist")?;
        let case_id = match &options.case_id {
            Some(id) => id.clone(),
            None => {
                let project_id = match &options.project_id {
                    Some(id) => id.clone(),
                    None => self.store.default_aml_project_id()?,
                };
                let name = format!(
                    "{} {} — {}",
                    info.bank_name,
                    info.period_from.map(|d| d.to_string()).unwrap_or_default(),
                    info.period_to.map(|d| d.to_string()).unwrap_or_default(),
                );
                self.store.create_case(&project_id, name.trim(), "aml")?
            }
        };

        let audit = StatementAudit {
            ocr_used,
            ocr_confidence,
            parser_version: format!("{}_v1", info.bank_id),
            pdf_hash: pdf_hash.to_string(),
            balance_valid,
            warnings: warnings.clone(),
        };
        let previous = self.store.find_statement_by_pdf_hash(pdf_hash)?;
        let statement_id = match previous {
            Some(existing) if options.overwrite => {
                self.store.delete_statement(&existing)?;
                self.store.save_statement_as(
                    &existing,
                    &case_id,
                    &info,
                    outcome.parse_method,
                    &audit,
                )?
            }
            _ => self
                .store
                .save_statement(&case_id, &info, outcome.parse_method, &audit)?,
        };
        self.store
            .upsert_account_profile(&info.account_number, &info.account_holder, &info.bank_id)?;

        // Normalize + dedup.
        guard.checkpoint("normalize")?;
        let mut transactions = normalize_transactions(&outcome.transactions, &statement_id);

        // Entity resolution against counterparty memory.
        guard.checkpoint("resolve")?;
        for tx in transactions.iter_mut() {
            if tx.counterparty_clean.is_empty() {
                continue;
            }
            let (cp_id, _confidence) = self.resolver.get_or_create(
                &tx.counterparty_raw,
                &info.bank_id,
                tx.amount,
                tx.booking_date,
            )?;
            tx.counterparty_id = Some(cp_id);
        }

        // Rule classification with memory labels.
        guard.checkpoint("classify")?;
        let memory_labels = self.resolver.labels()?;
        let memory_notes = self.resolver.notes()?;
        let mut labels: HashMap<String, CounterpartyLabel> = HashMap::new();
        let mut notes: HashMap<String, String> = HashMap::new();
        for tx in &transactions {
            let engine_key = tx.counterparty_clean.to_lowercase();
            let memory_key = normalize_name(&tx.counterparty_clean);
            if let Some(label) = memory_labels.get(&memory_key) {
                labels.insert(engine_key.clone(), *label);
            }
            if let Some(note) = memory_notes.get(&memory_key) {
                notes.insert(engine_key, note.clone());
            }
        }
        let engine = RuleEngine::new(rules.clone());
        let outcomes = engine.classify_all(&mut transactions, &labels, &notes);
        let tagged = outcomes.iter().filter(|o| !o.risk_tags.is_empty()).count();
        info!(tagged, total = transactions.len(), "rules applied");

        // Baseline + anomaly detection.
        guard.checkpoint("anomalies")?;
        let baseline = build_baseline(&transactions);
        let known: HashSet<String> = memory_labels
            .keys()
            .map(|k| k.chars().take(50).collect())
            .collect();
        let alerts = detect_anomalies(&transactions, Some(&baseline), &known, &rules);

        // Aggregate score.
        guard.checkpoint("score")?;
        let (risk_score, risk_reasons) = compute_risk_score(&transactions, &rules);

        // Flow graph.
        guard.checkpoint("graph")?;
        let account_label = if !info.account_holder.is_empty() {
            info.account_holder.clone()
        } else if !info.account_number.is_empty() {
            info.account_number.clone()
        } else {
            "Moje konto".to_string()
        };
        let graph = build_graph(&transactions, &account_label);
        self.store.save_graph(&case_id, &graph)?;

        // Persist transactions, assessment, audit trail.
        guard.checkpoint("save")?;
        self.store.save_transactions(&transactions)?;
        self.store.save_assessment(
            &statement_id,
            risk_score,
            &alerts,
            &risk_reasons,
            &rules.version,
        )?;
        let user_id = self.store.default_user_id()?;
        self.store.audit(
            &user_id,
            &case_id,
            "aml_analysis",
            &serde_json::json!({
                "statement_id": statement_id,
                "pdf_hash": pdf_hash,
                "ocr_used": ocr_used,
                "parser": info.bank_id,
                "transactions": transactions.len(),
                "alerts": alerts.len(),
                "risk_score": risk_score,
                "rules_version": rules.version,
            }),
        )?;

        // Report.
        guard.checkpoint("report")?;
        let report_input = ReportInput {
            title: format!(
                "Raport AML — {} {}",
                info.bank_name,
                info.period_from.map(|d| d.to_string()).unwrap_or_default()
            ),
            bank_name: info.bank_name.clone(),
            period_from: info.period_from.map(|d| d.to_string()).unwrap_or_default(),
            period_to: info.period_to.map(|d| d.to_string()).unwrap_or_default(),
            transactions: &transactions,
            alerts: &alerts,
            risk_score,
            risk_reasons: &risk_reasons,
            graph_stats: Some(&graph.stats),
            balance_valid,
            warnings: warnings.as_slice(),
            pdf_hash: pdf_hash.to_string(),
            rules_version: rules.version.clone(),
            ocr_used,
        };
        let report_html = self.renderer.render(&report_input);

        let elapsed = guard.elapsed_secs();
        info!(
            statement_id = %statement_id,
            risk_score,
            alerts = alerts.len(),
            elapsed_sec = elapsed,
            "pipeline finished"
        );

        Ok(PipelineResult {
            status: "ok".to_string(),
            error: None,
            case_id,
            statement_id,
            bank: info.bank_id,
            bank_name: info.bank_name,
            transaction_count: transactions.len(),
            risk_score,
            risk_reasons,
            alerts,
            graph_stats: Some(graph.stats),
            balance_valid,
            ocr_used,
            warnings: warnings.clone(),
            report_html,
            pipeline_time_sec: elapsed,
        })
    }
}
