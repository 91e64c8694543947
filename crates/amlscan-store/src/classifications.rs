//! User transaction classifications and per-bank field rules.
//!
//! Classifications are a user's opinion on a transaction (distinct from
//! the rule engine's risk tags). They feed back into counterparty memory:
//! suspicious → blacklist, legitimate → whitelist, monitoring → note only.

use std::collections::HashMap;

use amlscan_core::{new_id, CounterpartyLabel};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::db::Store;
use crate::error::StoreResult;

/// User classification of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxClassification {
    Neutral,
    Legitimate,
    Suspicious,
    Monitoring,
}

impl TxClassification {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxClassification::Neutral => "neutral",
            TxClassification::Legitimate => "legitimate",
            TxClassification::Suspicious => "suspicious",
            TxClassification::Monitoring => "monitoring",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "neutral" => Some(TxClassification::Neutral),
            "legitimate" => Some(TxClassification::Legitimate),
            "suspicious" => Some(TxClassification::Suspicious),
            "monitoring" => Some(TxClassification::Monitoring),
            _ => None,
        }
    }

    /// The counterparty label this classification propagates to, if any.
    pub fn propagated_label(&self) -> Option<CounterpartyLabel> {
        match self {
            TxClassification::Suspicious => Some(CounterpartyLabel::Blacklist),
            TxClassification::Legitimate => Some(CounterpartyLabel::Whitelist),
            TxClassification::Monitoring | TxClassification::Neutral => None,
        }
    }
}

/// A saved field mapping rule for one bank's format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldRule {
    pub id: String,
    pub bank_id: String,
    pub rule_type: String,
    pub source_field: String,
    pub target_field: String,
    pub condition: serde_json::Value,
    pub note: String,
    pub priority: i64,
}

impl Store {
    /// Classify a transaction (upsert: one classification per tx), then
    /// propagate the decision into counterparty memory.
    pub fn classify_transaction(
        &self,
        tx_id: &str,
        statement_id: &str,
        classification: TxClassification,
        note: &str,
        user_id: &str,
    ) -> StoreResult<()> {
        self.conn()?.execute(
            "INSERT INTO tx_classifications (id, tx_id, statement_id, classification, note, created_by)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(tx_id) DO UPDATE SET
               classification = excluded.classification,
               note = excluded.note,
               updated_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now')",
            params![
                new_id(),
                tx_id,
                statement_id,
                classification.as_str(),
                note,
                user_id
            ],
        )?;
        self.propagate_classification(tx_id, classification, note)?;
        Ok(())
    }

    /// Feed a classification back into counterparty memory.
    fn propagate_classification(
        &self,
        tx_id: &str,
        classification: TxClassification,
        note: &str,
    ) -> StoreResult<()> {
        let Some(label) = classification.propagated_label() else {
            // Monitoring keeps the label but records the note.
            if classification == TxClassification::Monitoring && !note.is_empty() {
                if let Some(cp_id) = self.tx_counterparty_id(tx_id)? {
                    self.conn()?.execute(
                        "UPDATE counterparties SET note = ?1,
                         updated_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now')
                         WHERE id = ?2",
                        params![note, cp_id],
                    )?;
                }
            }
            return Ok(());
        };

        let Some(cp_id) = self.tx_counterparty_id(tx_id)? else {
            return Ok(());
        };
        self.set_counterparty_label(&cp_id, label, note)?;
        info!(tx_id, counterparty_id = %cp_id, label = label.as_str(),
              "classification propagated to counterparty memory");
        Ok(())
    }

    fn tx_counterparty_id(&self, tx_id: &str) -> StoreResult<Option<String>> {
        let conn = self.conn()?;
        let cp: Option<Option<String>> = conn
            .query_row(
                "SELECT counterparty_id FROM transactions WHERE id = ?1",
                [tx_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(cp.flatten())
    }

    /// Classifications for a statement: tx_id → (classification, note).
    pub fn classifications_for_statement(
        &self,
        statement_id: &str,
    ) -> StoreResult<HashMap<String, (TxClassification, String)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT tx_id, classification, note FROM tx_classifications WHERE statement_id = ?1",
        )?;
        let rows = stmt.query_map([statement_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;
        let mut result = HashMap::new();
        for row in rows {
            let (tx_id, classification, note) = row?;
            if let Some(parsed) = TxClassification::parse(&classification) {
                result.insert(tx_id, (parsed, note));
            }
        }
        Ok(result)
    }

    /// Save a field mapping rule for a bank format.
    pub fn save_field_rule(
        &self,
        bank_id: &str,
        rule_type: &str,
        source_field: &str,
        target_field: &str,
        condition: &serde_json::Value,
        note: &str,
    ) -> StoreResult<String> {
        let id = new_id();
        self.conn()?.execute(
            "INSERT INTO field_rules
               (id, bank_id, rule_type, source_field, target_field, condition_json, note)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id,
                bank_id,
                rule_type,
                source_field,
                target_field,
                serde_json::to_string(condition)?,
                note
            ],
        )?;
        Ok(id)
    }

    /// Active field rules, optionally for one bank, by priority.
    pub fn field_rules(&self, bank_id: Option<&str>) -> StoreResult<Vec<FieldRule>> {
        let conn = self.conn()?;
        let sql = match bank_id {
            Some(_) => {
                "SELECT id, bank_id, rule_type, source_field, target_field, condition_json, note, priority
                 FROM field_rules WHERE bank_id = ?1 AND is_active = 1
                 ORDER BY priority DESC, created_at"
            }
            None => {
                "SELECT id, bank_id, rule_type, source_field, target_field, condition_json, note, priority
                 FROM field_rules WHERE is_active = 1 ORDER BY bank_id, priority DESC"
            }
        };
        let mut stmt = conn.prepare(sql)?;
        let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<(String, String, String, String, String, String, String, i64)> {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
                row.get(7)?,
            ))
        };
        let rows = match bank_id {
            Some(b) => stmt.query_map([b], map_row)?.collect::<Result<Vec<_>, _>>()?,
            None => stmt.query_map([], map_row)?.collect::<Result<Vec<_>, _>>()?,
        };

        let mut rules = Vec::with_capacity(rows.len());
        for (id, bank_id, rule_type, source_field, target_field, condition, note, priority) in rows
        {
            rules.push(FieldRule {
                id,
                bank_id,
                rule_type,
                source_field,
                target_field,
                condition: serde_json::from_str(&condition)?,
                note,
                priority,
            });
        }
        Ok(rules)
    }

    /// Deactivate a field rule.
    pub fn delete_field_rule(&self, rule_id: &str) -> StoreResult<()> {
        self.conn()?.execute(
            "UPDATE field_rules SET is_active = 0 WHERE id = ?1",
            [rule_id],
        )?;
        Ok(())
    }
}
