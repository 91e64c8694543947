//! Counterparty memory tables: profiles, aliases, labels, learning queue.
//!
//! These tables are shared across all cases and survive case deletion.
//! Resolution logic (exact/fuzzy matching) lives in `amlscan-memory`; this
//! module is the raw storage layer it builds on.

use std::collections::HashMap;

use amlscan_core::{new_id, normalize_name, CounterpartyLabel};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::db::Store;
use crate::error::StoreResult;

/// A stored counterparty profile row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CounterpartyRow {
    pub id: String,
    pub canonical_name: String,
    pub name_normalized: String,
    pub label: CounterpartyLabel,
    pub note: String,
    pub confidence: f64,
    pub created_at: String,
    pub updated_at: String,
}

/// A pending learning-queue item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningItem {
    pub id: String,
    pub suggested_name: String,
    pub suggested_label: String,
    pub evidence_tx_ids: Vec<String>,
    pub status: String,
}

fn row_to_counterparty(row: &rusqlite::Row<'_>) -> rusqlite::Result<CounterpartyRow> {
    Ok(CounterpartyRow {
        id: row.get(0)?,
        canonical_name: row.get(1)?,
        name_normalized: row.get(2)?,
        label: CounterpartyLabel::parse(&row.get::<_, String>(3)?),
        note: row.get(4)?,
        confidence: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

const COUNTERPARTY_COLS: &str =
    "id, canonical_name, name_normalized, label, note, confidence, created_at, updated_at";
// Qualified variant for joins with the alias table.
const COUNTERPARTY_COLS_Q: &str = "c.id, c.canonical_name, c.name_normalized, c.label, c.note, \
                                   c.confidence, c.created_at, c.updated_at";

impl Store {
    /// Insert a new counterparty profile. The canonical name keeps its
    /// diacritics; the normalized form is the resolution key.
    pub fn insert_counterparty(
        &self,
        canonical_name: &str,
        label: CounterpartyLabel,
        note: &str,
        confidence: f64,
    ) -> StoreResult<CounterpartyRow> {
        let id = new_id();
        let normalized = normalize_name(canonical_name);
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO counterparties (id, canonical_name, name_normalized, label, note, confidence)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![id, canonical_name, normalized, label.as_str(), note, confidence],
        )?;
        let row = conn.query_row(
            &format!("SELECT {COUNTERPARTY_COLS} FROM counterparties WHERE id = ?1"),
            [&id],
            |row| row_to_counterparty(row),
        )?;
        Ok(row)
    }

    /// Load one profile by id.
    pub fn get_counterparty(&self, id: &str) -> StoreResult<Option<CounterpartyRow>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                &format!("SELECT {COUNTERPARTY_COLS} FROM counterparties WHERE id = ?1"),
                [id],
                |row| row_to_counterparty(row),
            )
            .optional()?;
        Ok(row)
    }

    /// Exact lookup by normalized name (canonical or alias).
    pub fn find_counterparty_by_name(&self, name: &str) -> StoreResult<Option<CounterpartyRow>> {
        let normalized = normalize_name(name);
        let conn = self.conn()?;
        let direct = conn
            .query_row(
                &format!(
                    "SELECT {COUNTERPARTY_COLS} FROM counterparties WHERE name_normalized = ?1"
                ),
                [&normalized],
                |row| row_to_counterparty(row),
            )
            .optional()?;
        if direct.is_some() {
            return Ok(direct);
        }
        let via_alias = conn
            .query_row(
                &format!(
                    "SELECT {COUNTERPARTY_COLS_Q} FROM counterparties c
                     JOIN counterparty_aliases a ON a.counterparty_id = c.id
                     WHERE a.alias_normalized = ?1"
                ),
                [&normalized],
                |row| row_to_counterparty(row),
            )
            .optional()?;
        Ok(via_alias)
    }

    /// All profiles, for fuzzy matching sweeps.
    pub fn list_counterparties(&self) -> StoreResult<Vec<CounterpartyRow>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {COUNTERPARTY_COLS} FROM counterparties ORDER BY canonical_name"
        ))?;
        let rows = stmt.query_map([], |row| row_to_counterparty(row))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Substring search on canonical names and aliases.
    pub fn search_counterparties(&self, query: &str) -> StoreResult<Vec<CounterpartyRow>> {
        let like = format!("%{}%", normalize_name(query));
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT DISTINCT {COUNTERPARTY_COLS_Q} FROM counterparties c
             LEFT JOIN counterparty_aliases a ON a.counterparty_id = c.id
             WHERE c.name_normalized LIKE ?1 OR a.alias_normalized LIKE ?1
             ORDER BY c.canonical_name"
        ))?;
        let rows = stmt.query_map([&like], |row| row_to_counterparty(row))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Set a profile's label and note.
    pub fn set_counterparty_label(
        &self,
        id: &str,
        label: CounterpartyLabel,
        note: &str,
    ) -> StoreResult<()> {
        self.conn()?.execute(
            "UPDATE counterparties
             SET label = ?1, note = ?2,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now')
             WHERE id = ?3",
            params![label.as_str(), note, id],
        )?;
        Ok(())
    }

    /// Add an alias to a profile. Idempotent: re-adding the same alias is a
    /// no-op.
    pub fn add_counterparty_alias(&self, counterparty_id: &str, alias: &str) -> StoreResult<()> {
        let normalized = normalize_name(alias);
        self.conn()?.execute(
            "INSERT OR IGNORE INTO counterparty_aliases
               (id, counterparty_id, alias, alias_normalized)
             VALUES (?1, ?2, ?3, ?4)",
            params![new_id(), counterparty_id, alias, normalized],
        )?;
        Ok(())
    }

    /// Aliases of a profile.
    pub fn list_aliases(&self, counterparty_id: &str) -> StoreResult<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT alias FROM counterparty_aliases WHERE counterparty_id = ?1 ORDER BY alias",
        )?;
        let rows = stmt.query_map([counterparty_id], |row| row.get(0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Bulk label snapshot for the rule engine: normalized name → label.
    /// Aliases map to their profile's label.
    pub fn counterparty_labels(&self) -> StoreResult<HashMap<String, CounterpartyLabel>> {
        let conn = self.conn()?;
        let mut labels = HashMap::new();

        let mut stmt =
            conn.prepare("SELECT name_normalized, label FROM counterparties")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (name, label) = row?;
            labels.insert(name, CounterpartyLabel::parse(&label));
        }

        let mut stmt = conn.prepare(
            "SELECT a.alias_normalized, c.label
             FROM counterparty_aliases a JOIN counterparties c ON c.id = a.counterparty_id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (name, label) = row?;
            labels.entry(name).or_insert(CounterpartyLabel::parse(&label));
        }

        Ok(labels)
    }

    /// Bulk note snapshot: normalized name → note (non-empty only).
    pub fn counterparty_notes(&self) -> StoreResult<HashMap<String, String>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT name_normalized, note FROM counterparties WHERE note != ''")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        Ok(rows.collect::<Result<HashMap<_, _>, _>>()?)
    }

    /// Queue a counterparty suggestion for human review.
    pub fn add_to_learning_queue(
        &self,
        suggested_name: &str,
        suggested_label: &str,
        evidence_tx_ids: &[String],
    ) -> StoreResult<String> {
        let id = new_id();
        self.conn()?.execute(
            "INSERT INTO learning_queue (id, suggested_name, suggested_label, evidence_tx_ids)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                id,
                suggested_name,
                suggested_label,
                serde_json::to_string(evidence_tx_ids)?
            ],
        )?;
        Ok(id)
    }

    /// Pending (or all) learning-queue items, oldest first.
    pub fn learning_queue(&self, status: Option<&str>) -> StoreResult<Vec<LearningItem>> {
        let conn = self.conn()?;
        let sql = match status {
            Some(_) => {
                "SELECT id, suggested_name, suggested_label, evidence_tx_ids, status
                 FROM learning_queue WHERE status = ?1 ORDER BY created_at"
            }
            None => {
                "SELECT id, suggested_name, suggested_label, evidence_tx_ids, status
                 FROM learning_queue ORDER BY created_at"
            }
        };
        let mut stmt = conn.prepare(sql)?;
        let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<(String, String, String, String, String)> {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
            ))
        };
        let rows = match status {
            Some(s) => stmt.query_map([s], map_row)?.collect::<Result<Vec<_>, _>>()?,
            None => stmt.query_map([], map_row)?.collect::<Result<Vec<_>, _>>()?,
        };

        let mut items = Vec::with_capacity(rows.len());
        for (id, suggested_name, suggested_label, evidence, status) in rows {
            items.push(LearningItem {
                id,
                suggested_name,
                suggested_label,
                evidence_tx_ids: serde_json::from_str(&evidence)?,
                status,
            });
        }
        Ok(items)
    }

    /// Apply a reviewer decision to a queue item.
    pub fn resolve_learning_item(
        &self,
        item_id: &str,
        decision: &str,
        label: &str,
        note: &str,
    ) -> StoreResult<()> {
        self.conn()?.execute(
            "UPDATE learning_queue
             SET status = 'resolved', decision = ?1, label = ?2, note = ?3,
                 resolved_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now')
             WHERE id = ?4",
            params![decision, label, note, item_id],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::temp_store;

    #[test]
    fn test_insert_and_find() {
        let (store, _dir) = temp_store();
        let cp = store
            .insert_counterparty("BIEDRONKA SP Z O O", CounterpartyLabel::Whitelist, "Sklep", 1.0)
            .unwrap();
        assert_eq!(cp.label, CounterpartyLabel::Whitelist);

        // Case-insensitive, whitespace-insensitive lookup.
        let found = store
            .find_counterparty_by_name("biedronka  sp z o o")
            .unwrap()
            .unwrap();
        assert_eq!(found.id, cp.id);
        assert_eq!(found.canonical_name, "BIEDRONKA SP Z O O");
    }

    #[test]
    fn test_alias_resolution_and_idempotence() {
        let (store, _dir) = temp_store();
        let cp = store
            .insert_counterparty("ORLEN S.A.", CounterpartyLabel::Neutral, "", 1.0)
            .unwrap();
        store.add_counterparty_alias(&cp.id, "PKN ORLEN").unwrap();
        store.add_counterparty_alias(&cp.id, "PKN ORLEN").unwrap();
        assert_eq!(store.list_aliases(&cp.id).unwrap().len(), 1);

        let found = store.find_counterparty_by_name("PKN Orlen").unwrap().unwrap();
        assert_eq!(found.id, cp.id);
    }

    #[test]
    fn test_labels_snapshot_includes_aliases() {
        let (store, _dir) = temp_store();
        let cp = store
            .insert_counterparty("PODEJRZANA FIRMA", CounterpartyLabel::Blacklist, "uwaga", 1.0)
            .unwrap();
        store.add_counterparty_alias(&cp.id, "PODEJRZANA F.").unwrap();

        let labels = store.counterparty_labels().unwrap();
        assert_eq!(
            labels.get("podejrzana firma"),
            Some(&CounterpartyLabel::Blacklist)
        );
        assert_eq!(
            labels.get("podejrzana f."),
            Some(&CounterpartyLabel::Blacklist)
        );
        let notes = store.counterparty_notes().unwrap();
        assert_eq!(notes.get("podejrzana firma").map(String::as_str), Some("uwaga"));
    }

    #[test]
    fn test_set_label() {
        let (store, _dir) = temp_store();
        let cp = store
            .insert_counterparty("TEST FIRMA", CounterpartyLabel::Neutral, "", 0.5)
            .unwrap();
        store
            .set_counterparty_label(&cp.id, CounterpartyLabel::Blacklist, "Podejrzana")
            .unwrap();
        let updated = store.get_counterparty(&cp.id).unwrap().unwrap();
        assert_eq!(updated.label, CounterpartyLabel::Blacklist);
        assert_eq!(updated.note, "Podejrzana");
    }

    #[test]
    fn test_learning_queue_flow() {
        let (store, _dir) = temp_store();
        let item_id = store
            .add_to_learning_queue(
                "NIEZNANA FIRMA",
                "risky",
                &["tx1".to_string(), "tx2".to_string()],
            )
            .unwrap();

        let queue = store.learning_queue(Some("pending")).unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].suggested_name, "NIEZNANA FIRMA");
        assert_eq!(queue[0].evidence_tx_ids.len(), 2);

        store
            .resolve_learning_item(&item_id, "approved", "blacklist", "Potwierdzone")
            .unwrap();
        assert!(store.learning_queue(Some("pending")).unwrap().is_empty());
        assert_eq!(store.learning_queue(None).unwrap().len(), 1);
    }
}
