use anyhow::{Context, Result, anyhow};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::models::{ApplicationDraft, ApplicationRecord, Status};

const RECORD_COLUMNS: &str = "id, company_name, role, ctc, requirements, status, \
     last_date_to_apply, applied_date, exam_date, created_at, user_id";

/// Application records of one user. Every statement is scoped to `user_id`.
pub struct Database {
    conn: Connection,
    path: PathBuf,
    user_id: String,
}

impl Database {
    pub fn open(path: &Path, user_id: &str) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        debug!(path = %path.display(), user = user_id, "opened database");
        Ok(Self {
            conn,
            path: path.to_path_buf(),
            user_id: user_id.to_string(),
        })
    }

    #[cfg(test)]
    pub fn open_in_memory(user_id: &str) -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
            path: PathBuf::from(":memory:"),
            user_id: user_id.to_string(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS job_applications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                company_name TEXT NOT NULL,
                role TEXT NOT NULL,
                ctc TEXT NOT NULL DEFAULT '',
                requirements TEXT,
                status TEXT DEFAULT 'to-apply',
                last_date_to_apply TEXT,
                applied_date TEXT,
                exam_date TEXT,
                created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                user_id TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_applications_user ON job_applications(user_id);
            CREATE INDEX IF NOT EXISTS idx_applications_status ON job_applications(status);
            "#,
        )?;
        Ok(())
    }

    pub fn ensure_initialized(&self) -> Result<()> {
        let tables: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='job_applications'",
            [],
            |row| row.get(0),
        )?;
        if tables == 0 {
            return Err(anyhow!("Database not initialized. Run 'intrack init' first."));
        }
        Ok(())
    }

    pub fn insert(&self, draft: &ApplicationDraft) -> Result<i64> {
        validate(draft)?;
        self.conn.execute(
            "INSERT INTO job_applications
                (company_name, role, ctc, requirements, status,
                 last_date_to_apply, applied_date, exam_date, user_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                draft.company_name,
                draft.role,
                draft.ctc,
                draft.requirements,
                draft.status.map(|s| s.as_str()),
                draft.last_date_to_apply,
                draft.applied_date,
                draft.exam_date,
                self.user_id,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        info!(id, company = %draft.company_name, "added application");
        Ok(id)
    }

    /// Newest first.
    pub fn list(&self) -> Result<Vec<ApplicationRecord>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM job_applications
             WHERE user_id = ?1
             ORDER BY created_at DESC, id DESC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([&self.user_id], Self::row_to_record)?;
        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to list applications")
    }

    pub fn get(&self, id: i64) -> Result<Option<ApplicationRecord>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM job_applications WHERE id = ?1 AND user_id = ?2"
        );
        self.conn
            .query_row(&sql, params![id, self.user_id], Self::row_to_record)
            .optional()
            .with_context(|| format!("Failed to load application #{}", id))
    }

    /// Overwrites every editable field. Returns false when no such record.
    pub fn update(&self, id: i64, draft: &ApplicationDraft) -> Result<bool> {
        validate(draft)?;
        let changed = self.conn.execute(
            "UPDATE job_applications
             SET company_name = ?1, role = ?2, ctc = ?3, requirements = ?4, status = ?5,
                 last_date_to_apply = ?6, applied_date = ?7, exam_date = ?8
             WHERE id = ?9 AND user_id = ?10",
            params![
                draft.company_name,
                draft.role,
                draft.ctc,
                draft.requirements,
                draft.status.map(|s| s.as_str()),
                draft.last_date_to_apply,
                draft.applied_date,
                draft.exam_date,
                id,
                self.user_id,
            ],
        )?;
        debug!(id, changed, "updated application");
        Ok(changed > 0)
    }

    pub fn update_status(&self, id: i64, status: Status) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE job_applications SET status = ?1 WHERE id = ?2 AND user_id = ?3",
            params![status.as_str(), id, self.user_id],
        )?;
        info!(id, %status, changed, "status changed");
        Ok(changed > 0)
    }

    /// Copies a record under a new id and creation time, back at `to-apply`.
    pub fn duplicate(&self, id: i64) -> Result<Option<i64>> {
        let changed = self.conn.execute(
            "INSERT INTO job_applications
                (company_name, role, ctc, requirements, status,
                 last_date_to_apply, applied_date, exam_date, user_id)
             SELECT company_name, role, ctc, requirements, 'to-apply',
                    last_date_to_apply, applied_date, exam_date, user_id
             FROM job_applications WHERE id = ?1 AND user_id = ?2",
            params![id, self.user_id],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        let new_id = self.conn.last_insert_rowid();
        info!(source = id, id = new_id, "duplicated application");
        Ok(Some(new_id))
    }

    pub fn delete(&self, id: i64) -> Result<bool> {
        let changed = self.conn.execute(
            "DELETE FROM job_applications WHERE id = ?1 AND user_id = ?2",
            params![id, self.user_id],
        )?;
        info!(id, changed, "deleted application");
        Ok(changed > 0)
    }

    /// Inserts exported records for the current user in one transaction.
    /// Incoming ids and owners are ignored; creation times are kept.
    pub fn import(&mut self, records: &[ApplicationRecord]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let mut imported = 0;
        for record in records {
            if record.company_name.trim().is_empty() || record.role.trim().is_empty() {
                warn!(id = record.id, "skipping record without company or role");
                continue;
            }
            let created_at = Some(record.created_at.trim()).filter(|s| !s.is_empty());
            tx.execute(
                "INSERT INTO job_applications
                    (company_name, role, ctc, requirements, status,
                     last_date_to_apply, applied_date, exam_date, user_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9,
                         COALESCE(?10, strftime('%Y-%m-%dT%H:%M:%fZ', 'now')))",
                params![
                    record.company_name,
                    record.role,
                    record.ctc,
                    record.requirements,
                    record.status.map(|s| s.as_str()),
                    record.last_date_to_apply,
                    record.applied_date,
                    record.exam_date,
                    self.user_id,
                    created_at,
                ],
            )?;
            imported += 1;
        }
        tx.commit()?;
        info!(imported, "imported applications");
        Ok(imported)
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<ApplicationRecord> {
        let status: Option<String> = row.get(5)?;
        Ok(ApplicationRecord {
            id: row.get(0)?,
            company_name: row.get(1)?,
            role: row.get(2)?,
            ctc: row.get(3)?,
            requirements: row.get(4)?,
            status: status.and_then(|s| s.parse().ok()),
            last_date_to_apply: row.get(6)?,
            applied_date: row.get(7)?,
            exam_date: row.get(8)?,
            created_at: row.get(9)?,
            user_id: row.get(10)?,
        })
    }
}

fn validate(draft: &ApplicationDraft) -> Result<()> {
    if draft.company_name.trim().is_empty() {
        return Err(anyhow!("Company name is required"));
    }
    if draft.role.trim().is_empty() {
        return Err(anyhow!("Role is required"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(user: &str) -> Database {
        let db = Database::open_in_memory(user).unwrap();
        db.init().unwrap();
        db
    }

    fn draft(company: &str) -> ApplicationDraft {
        let mut d = ApplicationDraft::new(company, "SDE Intern");
        d.ctc = "10 LPA".to_string();
        d.requirements = Some("DSA, OS".to_string());
        d.last_date_to_apply = Some("2025-03-05".to_string());
        d
    }

    #[test]
    fn test_uninitialized_database_is_reported() {
        let db = Database::open_in_memory("u1").unwrap();
        assert!(db.ensure_initialized().is_err());
        db.init().unwrap();
        db.init().unwrap();
        assert!(db.ensure_initialized().is_ok());
    }

    #[test]
    fn test_insert_and_list_newest_first() {
        let db = setup("u1");
        let a = db.insert(&draft("Acme")).unwrap();
        let b = db.insert(&draft("Globex")).unwrap();

        let records = db.list().unwrap();
        let ids: Vec<_> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![b, a]);
        assert_eq!(records[1].status, Some(Status::ToApply));
        assert_eq!(records[1].user_id, "u1");
        assert!(!records[1].created_at.is_empty());
    }

    #[test]
    fn test_blank_company_is_rejected() {
        let db = setup("u1");
        assert!(db.insert(&ApplicationDraft::new("  ", "Intern")).is_err());
        assert!(db.list().unwrap().is_empty());
    }

    #[test]
    fn test_queries_are_scoped_to_user() {
        let mut db = setup("alice");
        let id = db.insert(&draft("Acme")).unwrap();
        db.user_id = "bob".to_string();

        assert!(db.list().unwrap().is_empty());
        assert!(db.get(id).unwrap().is_none());
        assert!(!db.update_status(id, Status::Applied).unwrap());
        assert!(!db.update(id, &draft("Initech")).unwrap());
        assert!(!db.delete(id).unwrap());
        assert!(db.duplicate(id).unwrap().is_none());

        db.user_id = "alice".to_string();
        let record = db.get(id).unwrap().unwrap();
        assert_eq!(record.status, Some(Status::ToApply));
        assert_eq!(record.company_name, "Acme");
    }

    #[test]
    fn test_update_replaces_fields() {
        let db = setup("u1");
        let id = db.insert(&draft("Acme")).unwrap();
        let mut edit = ApplicationDraft::from(&db.get(id).unwrap().unwrap());
        edit.status = Some(Status::Waiting);
        edit.last_date_to_apply = None;
        edit.exam_date = Some("2025-04-01".to_string());
        assert!(db.update(id, &edit).unwrap());

        let record = db.get(id).unwrap().unwrap();
        assert_eq!(record.status, Some(Status::Waiting));
        assert_eq!(record.last_date_to_apply, None);
        assert_eq!(record.exam_date.as_deref(), Some("2025-04-01"));
        assert!(!db.update(id + 100, &edit).unwrap());
    }

    #[test]
    fn test_duplicate_resets_status() {
        let db = setup("u1");
        let id = db.insert(&draft("Acme")).unwrap();
        db.update_status(id, Status::Rejected).unwrap();

        let copy_id = db.duplicate(id).unwrap().unwrap();
        assert_ne!(copy_id, id);
        let original = db.get(id).unwrap().unwrap();
        let copy = db.get(copy_id).unwrap().unwrap();
        assert_eq!(copy.status, Some(Status::ToApply));
        assert_eq!(copy.company_name, original.company_name);
        assert_eq!(copy.requirements, original.requirements);
        assert_eq!(copy.last_date_to_apply, original.last_date_to_apply);
    }

    #[test]
    fn test_delete() {
        let db = setup("u1");
        let id = db.insert(&draft("Acme")).unwrap();
        assert!(db.delete(id).unwrap());
        assert!(!db.delete(id).unwrap());
        assert!(db.get(id).unwrap().is_none());
    }

    #[test]
    fn test_import_keeps_legacy_status_and_created_at() {
        let mut db = setup("u1");
        let json = r#"[
            {"id": 77, "company_name": "Acme", "role": "Intern", "ctc": "5 LPA",
             "status": "-9", "created_at": "2024-01-01T00:00:00.000Z", "user_id": "other"},
            {"company_name": "Globex", "role": "Intern", "status": "approved",
             "created_at": "2024-02-01T00:00:00.000Z"},
            {"company_name": "", "role": "Intern"}
        ]"#;
        let records: Vec<ApplicationRecord> = serde_json::from_str(json).unwrap();
        assert_eq!(db.import(&records).unwrap(), 2);

        let listed = db.list().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].company_name, "Globex");
        assert_eq!(listed[1].status, None);
        assert_eq!(listed[1].created_at, "2024-01-01T00:00:00.000Z");
        assert!(listed.iter().all(|r| r.user_id == "u1"));
    }
}
