//! Users, projects, cases, and case files.

use amlscan_core::new_id;
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::db::Store;
use crate::error::StoreResult;

/// Default user that owns automatically created projects.
pub const DEFAULT_USERNAME: &str = "system";

/// Name of the project new AML cases land in when none is given.
pub const DEFAULT_AML_PROJECT: &str = "Analizy AML";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseRecord {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub case_type: String,
    pub status: String,
}

impl Store {
    /// Id of the default user, creating it on first use.
    pub fn default_user_id(&self) -> StoreResult<String> {
        let conn = self.conn()?;
        let existing: Option<String> = conn
            .query_row(
                "SELECT id FROM users WHERE username = ?1",
                [DEFAULT_USERNAME],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(id) = existing {
            return Ok(id);
        }
        let id = new_id();
        conn.execute(
            "INSERT INTO users (id, username, display_name) VALUES (?1, ?2, ?3)",
            params![id, DEFAULT_USERNAME, "System"],
        )?;
        Ok(id)
    }

    /// Create a project.
    pub fn create_project(
        &self,
        owner_id: &str,
        name: &str,
        description: &str,
    ) -> StoreResult<String> {
        let id = new_id();
        self.conn()?.execute(
            "INSERT INTO projects (id, owner_id, name, description) VALUES (?1, ?2, ?3, ?4)",
            params![id, owner_id, name, description],
        )?;
        Ok(id)
    }

    /// Id of the active default AML project, creating it on first use.
    pub fn default_aml_project_id(&self) -> StoreResult<String> {
        let conn = self.conn()?;
        let existing: Option<String> = conn
            .query_row(
                "SELECT id FROM projects WHERE name = ?1 AND status = 'active' LIMIT 1",
                [DEFAULT_AML_PROJECT],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(id) = existing {
            return Ok(id);
        }
        drop(conn);
        let owner = self.default_user_id()?;
        self.create_project(
            &owner,
            DEFAULT_AML_PROJECT,
            "Automatyczne analizy wyciągów bankowych",
        )
    }

    /// Create a case inside a project.
    pub fn create_case(&self, project_id: &str, name: &str, case_type: &str) -> StoreResult<String> {
        let id = new_id();
        self.conn()?.execute(
            "INSERT INTO cases (id, project_id, name, case_type) VALUES (?1, ?2, ?3, ?4)",
            params![id, project_id, name, case_type],
        )?;
        Ok(id)
    }

    /// Load a case.
    pub fn get_case(&self, case_id: &str) -> StoreResult<Option<CaseRecord>> {
        let conn = self.conn()?;
        let record = conn
            .query_row(
                "SELECT id, project_id, name, case_type, status FROM cases WHERE id = ?1",
                [case_id],
                |row| {
                    Ok(CaseRecord {
                        id: row.get(0)?,
                        project_id: row.get(1)?,
                        name: row.get(2)?,
                        case_type: row.get(3)?,
                        status: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    /// Register a file (source PDF, generated report) under a case.
    pub fn add_case_file(
        &self,
        case_id: &str,
        file_type: &str,
        file_name: &str,
        file_path: &str,
        mime_type: &str,
        size_bytes: u64,
    ) -> StoreResult<String> {
        let id = new_id();
        self.conn()?.execute(
            "INSERT INTO case_files (id, case_id, file_type, file_name, file_path, mime_type, size_bytes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![id, case_id, file_type, file_name, file_path, mime_type, size_bytes as i64],
        )?;
        Ok(id)
    }

    /// Delete a case.
    ///
    /// Cascades to statements, transactions, classifications, assessments,
    /// graph rows, and case files. Counterparty memory is shared across
    /// cases and is never touched.
    pub fn delete_case(&self, case_id: &str) -> StoreResult<()> {
        let affected = self
            .conn()?
            .execute("DELETE FROM cases WHERE id = ?1", [case_id])?;
        info!(case_id, affected, "case deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::db::test_support::temp_store;

    #[test]
    fn test_default_user_and_project_are_stable() {
        let (store, _dir) = temp_store();
        let u1 = store.default_user_id().unwrap();
        let u2 = store.default_user_id().unwrap();
        assert_eq!(u1, u2);

        let p1 = store.default_aml_project_id().unwrap();
        let p2 = store.default_aml_project_id().unwrap();
        assert_eq!(p1, p2);
    }

    #[test]
    fn test_case_lifecycle() {
        let (store, _dir) = temp_store();
        let project = store.default_aml_project_id().unwrap();
        let case = store.create_case(&project, "ING 2024-01", "aml").unwrap();

        let loaded = store.get_case(&case).unwrap().unwrap();
        assert_eq!(loaded.name, "ING 2024-01");
        assert_eq!(loaded.case_type, "aml");

        store
            .add_case_file(&case, "report", "r.html", "/tmp/r.html", "text/html", 123)
            .unwrap();

        store.delete_case(&case).unwrap();
        assert!(store.get_case(&case).unwrap().is_none());
    }
}
