//! Risk assessments and the audit log. Both are append-only.

use amlscan_core::{new_id, Alert};
use amlscan_rules::RiskReason;
use rusqlite::params;
use serde::{Deserialize, Serialize};

use crate::db::Store;
use crate::error::StoreResult;

/// A persisted risk assessment row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub id: String,
    pub statement_id: String,
    pub total_score: f64,
    pub alerts: Vec<Alert>,
    pub risk_reasons: Vec<RiskReason>,
    pub rules_version: String,
}

impl Store {
    /// Append a risk assessment for a statement.
    pub fn save_assessment(
        &self,
        statement_id: &str,
        total_score: f64,
        alerts: &[Alert],
        risk_reasons: &[RiskReason],
        rules_version: &str,
    ) -> StoreResult<String> {
        let id = new_id();
        let breakdown = serde_json::json!({ "alerts": alerts });
        self.conn()?.execute(
            "INSERT INTO risk_assessments
               (id, statement_id, total_score, score_breakdown, risk_reasons, rules_version)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                id,
                statement_id,
                total_score,
                serde_json::to_string(&breakdown)?,
                serde_json::to_string(risk_reasons)?,
                rules_version
            ],
        )?;
        Ok(id)
    }

    /// All assessments for a statement, newest first.
    pub fn assessments_for_statement(
        &self,
        statement_id: &str,
    ) -> StoreResult<Vec<RiskAssessment>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, statement_id, total_score, score_breakdown, risk_reasons, rules_version
             FROM risk_assessments WHERE statement_id = ?1
             ORDER BY created_at DESC, id",
        )?;
        let rows = stmt.query_map([statement_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut result = Vec::new();
        for row in rows {
            let (id, statement_id, total_score, breakdown, reasons, rules_version) = row?;
            let breakdown: serde_json::Value = serde_json::from_str(&breakdown)?;
            let alerts: Vec<Alert> =
                serde_json::from_value(breakdown["alerts"].clone()).unwrap_or_default();
            result.push(RiskAssessment {
                id,
                statement_id,
                total_score,
                alerts,
                risk_reasons: serde_json::from_str(&reasons)?,
                rules_version,
            });
        }
        Ok(result)
    }

    /// Append an audit log entry.
    pub fn audit(
        &self,
        user_id: &str,
        case_id: &str,
        action: &str,
        details: &serde_json::Value,
    ) -> StoreResult<()> {
        self.conn()?.execute(
            "INSERT INTO audit_log (user_id, case_id, action, details)
             VALUES (?1, ?2, ?3, ?4)",
            params![user_id, case_id, action, serde_json::to_string(details)?],
        )?;
        Ok(())
    }

    /// Audit entries for a case, oldest first: (action, details).
    pub fn audit_for_case(&self, case_id: &str) -> StoreResult<Vec<(String, serde_json::Value)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT action, details FROM audit_log WHERE case_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map([case_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut result = Vec::new();
        for row in rows {
            let (action, details) = row?;
            result.push((action, serde_json::from_str(&details)?));
        }
        Ok(result)
    }
}
