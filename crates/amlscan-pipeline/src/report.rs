//! HTML report rendering.
//!
//! A pure function over core outputs. The built-in renderer produces a
//! self-contained audit-friendly document; richer rendering lives in the
//! hosting application behind the same trait.

use amlscan_core::{Alert, NormalizedTransaction};
use amlscan_graph::GraphStats;
use amlscan_rules::RiskReason;

/// Everything a report is rendered from.
#[derive(Debug, Clone, Default)]
pub struct ReportInput<'a> {
    pub title: String,
    pub bank_name: String,
    pub period_from: String,
    pub period_to: String,
    pub transactions: &'a [NormalizedTransaction],
    pub alerts: &'a [Alert],
    pub risk_score: f64,
    pub risk_reasons: &'a [RiskReason],
    pub graph_stats: Option<&'a GraphStats>,
    pub balance_valid: bool,
    pub warnings: &'a [String],
    pub pdf_hash: String,
    pub rules_version: String,
    pub ocr_used: bool,
}

/// Report renderer collaborator.
pub trait ReportRenderer: Send + Sync {
    fn render(&self, input: &ReportInput<'_>) -> String;
}

/// Built-in minimal HTML renderer.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlReport;

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

impl ReportRenderer for HtmlReport {
    fn render(&self, input: &ReportInput<'_>) -> String {
        let mut html = String::with_capacity(16 * 1024);
        html.push_str("<!DOCTYPE html>\n<html lang=\"pl\">\n<head>\n<meta charset=\"utf-8\">\n");
        html.push_str(&format!("<title>{}</title>\n", escape(&input.title)));
        html.push_str("</head>\n<body>\n");

        html.push_str(&format!("<h1>{}</h1>\n", escape(&input.title)));
        html.push_str(&format!(
            "<p>{} | okres: {} – {}</p>\n",
            escape(&input.bank_name),
            escape(&input.period_from),
            escape(&input.period_to),
        ));
        html.push_str(&format!(
            "<h2>Wynik ryzyka: {:.0}/100</h2>\n",
            input.risk_score
        ));
        if !input.balance_valid {
            html.push_str("<p><strong>Uwaga: rekoncyliacja sald wykazała rozbieżności.</strong></p>\n");
        }

        if !input.risk_reasons.is_empty() {
            html.push_str("<h3>Składowe wyniku</h3>\n<ul>\n");
            for reason in input.risk_reasons {
                html.push_str(&format!(
                    "<li>{}: {} transakcji, {} PLN ({:.1}%), +{:.1} pkt</li>\n",
                    escape(&reason.tag),
                    reason.count,
                    reason.amount,
                    reason.pct_of_total,
                    reason.score_delta,
                ));
            }
            html.push_str("</ul>\n");
        }

        if !input.alerts.is_empty() {
            html.push_str("<h3>Alerty</h3>\n<ul>\n");
            for alert in input.alerts {
                html.push_str(&format!(
                    "<li>[{}] {}: {}</li>\n",
                    alert.severity.as_str(),
                    escape(&alert.alert_type),
                    escape(&alert.explain),
                ));
            }
            html.push_str("</ul>\n");
        }

        if let Some(stats) = input.graph_stats {
            html.push_str(&format!(
                "<p>Graf przepływów: {} węzłów, {} krawędzi.</p>\n",
                stats.total_nodes, stats.total_edges
            ));
        }

        html.push_str("<h3>Transakcje</h3>\n<table border=\"1\">\n");
        html.push_str(
            "<tr><th>Data</th><th>Kwota</th><th>Kontrahent</th><th>Tytuł</th>\
             <th>Kanał</th><th>Kategoria</th><th>Ryzyko</th></tr>\n",
        );
        for tx in input.transactions {
            html.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                tx.booking_date,
                tx.amount,
                escape(&tx.counterparty_raw),
                escape(&tx.title),
                tx.channel.as_str(),
                escape(&tx.category),
                tx.risk_score,
            ));
        }
        html.push_str("</table>\n");

        if !input.warnings.is_empty() {
            html.push_str("<h3>Ostrzeżenia</h3>\n<ul>\n");
            for warning in input.warnings {
                html.push_str(&format!("<li>{}</li>\n", escape(warning)));
            }
            html.push_str("</ul>\n");
        }

        html.push_str(&format!(
            "<footer><p>SHA-256: {} | reguły v{} | OCR: {}</p></footer>\n",
            escape(&input.pdf_hash),
            escape(&input.rules_version),
            if input.ocr_used { "tak" } else { "nie" },
        ));
        html.push_str("</body>\n</html>\n");
        html
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use amlscan_core::{normalize_transactions, RawTransaction, Severity};
    use rust_decimal_macros::dec;

    #[test]
    fn test_report_contains_key_facts() {
        let raw = vec![RawTransaction::new("2024-01-05".parse().unwrap(), dec!(-150.00))
            .with_counterparty("BIEDRONKA WARSZAWA")
            .with_title("Zakup")];
        let transactions = normalize_transactions(&raw, "s");
        let alerts = vec![Alert::new(
            "LARGE_OUTLIER",
            Severity::High,
            20,
            "Duża kwota".into(),
        )];

        let input = ReportInput {
            title: "Raport AML — ING Bank Śląski".into(),
            bank_name: "ING Bank Śląski".into(),
            risk_score: 45.0,
            transactions: &transactions,
            alerts: &alerts,
            pdf_hash: "abc123def456".into(),
            rules_version: "1.0.0".into(),
            balance_valid: true,
            ..Default::default()
        };
        let html = HtmlReport.render(&input);

        assert!(html.contains("<!DOCTYPE html>"));
        assert!(html.contains("ING Bank"));
        assert!(html.contains("LARGE_OUTLIER"));
        assert!(html.contains("45"));
        assert!(html.contains("BIEDRONKA"));
        assert!(html.contains("abc123def456"));
        assert!(html.contains("1.0.0"));
    }

    #[test]
    fn test_html_escaping() {
        let input = ReportInput {
            title: "<script>alert(1)</script>".into(),
            ..Default::default()
        };
        let html = HtmlReport.render(&input);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }
}
