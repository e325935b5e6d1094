//! Statement executor for gigstore
//!
//! This module runs parsed statements against the store and persists
//! after every recognised mutation.

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::mutation;
use super::select::execute_select;
use crate::error::Result;
use crate::sql::ast::*;
use crate::storage::{Record, Store, SystemTimeSource, TimeSource};

/// Query result
#[derive(Debug, Default, Serialize)]
pub struct QueryResult {
    /// Result rows (SELECT only)
    pub rows: Vec<Record>,
    /// Number of affected records (INSERT/UPDATE/DELETE)
    pub affected_rows: usize,
    /// Message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl QueryResult {
    /// Create a new empty result
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a result carrying rows
    pub fn with_rows(rows: Vec<Record>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    /// Create a result with affected rows count
    pub fn with_affected_rows(count: usize, message: impl Into<String>) -> Self {
        Self {
            rows: Vec::new(),
            affected_rows: count,
            message: Some(message.into()),
        }
    }
}

/// Execution Engine
pub struct ExecutionEngine {
    /// The document and its backing file
    store: Store,
    /// Clock used to stamp `created_at`
    clock: Box<dyn TimeSource>,
}

impl ExecutionEngine {
    /// Create an engine over a store, stamping from the system clock
    pub fn new(store: Store) -> Self {
        Self::with_time_source(store, Box::new(SystemTimeSource))
    }

    pub fn with_time_source(store: Store, clock: Box<dyn TimeSource>) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    /// Run a SELECT without touching the file
    pub fn query(&self, stmt: &SelectStatement, params: &[Value]) -> Vec<Record> {
        execute_select(self.store.document(), stmt, params)
    }

    /// Execute a statement
    ///
    /// The only error is a failed write of the document; the in-memory
    /// change has already been applied when that happens.
    pub fn execute(&mut self, stmt: &Statement, params: &[Value]) -> Result<QueryResult> {
        match stmt {
            Statement::Select(select) => Ok(QueryResult::with_rows(self.query(select, params))),
            Statement::Insert(insert) => {
                let count = mutation::insert(
                    self.store.document_mut(),
                    insert,
                    params,
                    self.clock.as_ref(),
                );
                self.store.persist()?;
                Ok(QueryResult::with_affected_rows(
                    count,
                    format!("{} row(s) inserted", count),
                ))
            }
            Statement::Update(update) => {
                match mutation::update(self.store.document_mut(), update, params) {
                    Some(count) => {
                        self.store.persist()?;
                        Ok(QueryResult::with_affected_rows(
                            count,
                            format!("{} row(s) updated", count),
                        ))
                    }
                    None => {
                        debug!(table = %update.table_name, "update without key filter ignored");
                        Ok(QueryResult::empty())
                    }
                }
            }
            Statement::Delete(delete) => {
                match mutation::delete(self.store.document_mut(), delete, params) {
                    Some(count) => {
                        self.store.persist()?;
                        Ok(QueryResult::with_affected_rows(
                            count,
                            format!("{} row(s) deleted", count),
                        ))
                    }
                    None => {
                        debug!(table = %delete.table_name, "delete without key filter ignored");
                        Ok(QueryResult::empty())
                    }
                }
            }
            Statement::CreateTable(create) => {
                if mutation::create_table(self.store.document_mut(), create) {
                    self.store.persist()?;
                    Ok(QueryResult::with_affected_rows(
                        0,
                        format!("Collection '{}' created", create.table_name),
                    ))
                } else {
                    Ok(QueryResult::with_affected_rows(
                        0,
                        format!("Collection '{}' already exists", create.table_name),
                    ))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::Parser;
    use crate::storage::{Document, DocumentFile, FixedTimeSource};
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use tempfile::tempdir;

    fn parse(sql: &str) -> Statement {
        Parser::new(sql).unwrap().parse().unwrap()
    }

    fn engine() -> ExecutionEngine {
        ExecutionEngine::with_time_source(
            Store::in_memory(Document::with_default_collections()),
            Box::new(FixedTimeSource(
                Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
            )),
        )
    }

    #[test]
    fn test_insert_then_select() {
        let mut engine = engine();
        let result = engine
            .execute(
                &parse("INSERT INTO users (id, email) VALUES (?, ?)"),
                &[json!("u1"), json!("a@b.edu")],
            )
            .unwrap();
        assert_eq!(result.affected_rows, 1);

        let result = engine
            .execute(&parse("SELECT * FROM users WHERE email = ?"), &[json!("a@b.edu")])
            .unwrap();
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0]["created_at"], json!("2024-01-02T03:04:05.000Z"));
    }

    #[test]
    fn test_update_without_key_changes_nothing() {
        let mut engine = engine();
        engine
            .execute(
                &parse("INSERT INTO projects (id, status) VALUES (?, ?)"),
                &[json!("p1"), json!("open")],
            )
            .unwrap();

        let result = engine
            .execute(&parse("UPDATE projects SET status = ?"), &[json!("closed")])
            .unwrap();

        assert_eq!(result.affected_rows, 0);
        assert_eq!(
            engine.store().document().collection("projects")[0]["status"],
            json!("open")
        );
    }

    #[test]
    fn test_mutations_persist() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.json");
        let mut engine = ExecutionEngine::new(Store::open(DocumentFile::new(&path)));

        engine
            .execute(
                &parse("INSERT INTO reviews (id, rating) VALUES (?, ?)"),
                &[json!("r1"), json!(5)],
            )
            .unwrap();
        engine
            .execute(&parse("DELETE FROM reviews WHERE id = ?"), &[json!("nope")])
            .unwrap();

        let reloaded = DocumentFile::new(&path).load().unwrap().unwrap();
        assert_eq!(reloaded.collection("reviews")[0]["rating"], json!(5));
    }

    #[test]
    fn test_create_table_reports_existing() {
        let mut engine = engine();
        let result = engine
            .execute(&parse("CREATE TABLE IF NOT EXISTS users (id TEXT)"), &[])
            .unwrap();
        assert_eq!(result.message.as_deref(), Some("Collection 'users' already exists"));

        engine
            .execute(&parse("CREATE TABLE messages (id TEXT)"), &[])
            .unwrap();
        assert!(engine.store().document().contains("messages"));
    }
}
