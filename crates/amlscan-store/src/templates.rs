//! Parse template persistence.
//!
//! Templates remember a user-confirmed column mapping per bank layout so
//! future statements from the same bank get the mapping suggested
//! automatically.

use std::collections::BTreeMap;

use amlscan_core::new_id;
use amlscan_parsers::{ColumnType, ParseTemplate};
use rusqlite::params;

use crate::db::Store;
use crate::error::StoreResult;

fn mapping_to_json(mapping: &BTreeMap<usize, ColumnType>) -> StoreResult<String> {
    // Stored as {"0": "date", ...} for stable, human-readable JSON.
    let as_strings: BTreeMap<String, &str> = mapping
        .iter()
        .map(|(k, v)| (k.to_string(), v.as_str()))
        .collect();
    Ok(serde_json::to_string(&as_strings)?)
}

fn mapping_from_json(json: &str) -> StoreResult<BTreeMap<usize, ColumnType>> {
    let as_strings: BTreeMap<String, String> = serde_json::from_str(json)?;
    Ok(as_strings
        .into_iter()
        .filter_map(|(k, v)| k.parse::<usize>().ok().map(|k| (k, ColumnType::parse(&v))))
        .collect())
}

impl Store {
    /// Save a user-confirmed template.
    pub fn save_template(
        &self,
        bank_id: &str,
        bank_name: &str,
        name: &str,
        mapping: &BTreeMap<usize, ColumnType>,
        sample_headers: &[String],
        is_default: bool,
    ) -> StoreResult<String> {
        let id = new_id();
        self.conn()?.execute(
            "INSERT INTO parse_templates
               (id, bank_id, bank_name, name, column_mapping, sample_headers, is_default)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id,
                bank_id,
                bank_name,
                name,
                mapping_to_json(mapping)?,
                serde_json::to_string(sample_headers)?,
                is_default,
            ],
        )?;
        Ok(id)
    }

    /// Active templates for a bank, default first, then by usage.
    ///
    /// This is the order [`amlscan_parsers::find_matching_template`]
    /// expects.
    pub fn templates_for_bank(&self, bank_id: &str) -> StoreResult<Vec<ParseTemplate>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, bank_id, bank_name, name, column_mapping, sample_headers,
                    is_default, times_used
             FROM parse_templates
             WHERE bank_id = ?1 AND is_active != 0
             ORDER BY is_default DESC, times_used DESC, created_at",
        )?;
        let rows = stmt.query_map([bank_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, bool>(6)?,
                row.get::<_, i64>(7)?,
            ))
        })?;

        let mut templates = Vec::new();
        for row in rows {
            let (id, bank_id, bank_name, name, mapping, headers, is_default, times_used) = row?;
            templates.push(ParseTemplate {
                id,
                bank_id,
                bank_name,
                name,
                column_mapping: mapping_from_json(&mapping)?,
                sample_headers: serde_json::from_str(&headers)?,
                is_default,
                times_used,
            });
        }
        Ok(templates)
    }

    /// Record one more use of a template.
    pub fn bump_template_usage(&self, template_id: &str) -> StoreResult<()> {
        self.conn()?.execute(
            "UPDATE parse_templates SET times_used = times_used + 1 WHERE id = ?1",
            [template_id],
        )?;
        Ok(())
    }

    /// Deactivate a template (kept for history, never suggested again).
    pub fn deactivate_template(&self, template_id: &str) -> StoreResult<()> {
        self.conn()?.execute(
            "UPDATE parse_templates SET is_active = 0 WHERE id = ?1",
            [template_id],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::temp_store;
    use amlscan_parsers::find_matching_template;

    fn mapping() -> BTreeMap<usize, ColumnType> {
        let mut m = BTreeMap::new();
        m.insert(0, ColumnType::Date);
        m.insert(1, ColumnType::Description);
        m.insert(2, ColumnType::Amount);
        m
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let (store, _dir) = temp_store();
        let headers = vec!["Data".to_string(), "Opis".to_string(), "Kwota".to_string()];
        store
            .save_template("ing", "ING", "standardowy", &mapping(), &headers, true)
            .unwrap();

        let templates = store.templates_for_bank("ing").unwrap();
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].column_mapping[&0], ColumnType::Date);
        assert_eq!(templates[0].sample_headers, headers);
        assert!(templates[0].is_default);
        assert!(store.templates_for_bank("mbank").unwrap().is_empty());
    }

    #[test]
    fn test_suggestion_via_matcher() {
        let (store, _dir) = temp_store();
        let headers = vec!["Data".to_string(), "Opis".to_string(), "Kwota".to_string()];
        store
            .save_template("ing", "ING", "standardowy", &mapping(), &headers, false)
            .unwrap();

        let templates = store.templates_for_bank("ing").unwrap();
        let (found, partial) = find_matching_template(&templates, &headers).unwrap();
        assert_eq!(found.name, "standardowy");
        assert!(!partial);
    }

    #[test]
    fn test_usage_ordering_and_deactivation() {
        let (store, _dir) = temp_store();
        let headers: Vec<String> = vec!["Data".into(), "Kwota".into()];
        let a = store
            .save_template("ing", "ING", "a", &mapping(), &headers, false)
            .unwrap();
        let b = store
            .save_template("ing", "ING", "b", &mapping(), &headers, false)
            .unwrap();
        store.bump_template_usage(&b).unwrap();
        store.bump_template_usage(&b).unwrap();

        let templates = store.templates_for_bank("ing").unwrap();
        assert_eq!(templates[0].id, b);

        store.deactivate_template(&b).unwrap();
        let templates = store.templates_for_bank("ing").unwrap();
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].id, a);
    }
}
