//! The statement surface: `prepare` / `get` / `all` / `run` / `exec`
//!
//! A `Database` owns the process's single store. Statements are parsed once
//! by [`Database::prepare`] and may then be run any number of times with
//! different positional parameters. Parsing never fails from the caller's
//! point of view: a statement the parser cannot make sense of becomes a
//! handle whose reads come back empty and whose mutations report zero
//! changes.
//!
//! Every call takes the store lock for the duration of one statement, so a
//! single statement is never observed half-applied. Nothing spans two
//! statements: a business operation that reads, decides and then writes
//! needs its own lock around the whole sequence (see
//! [`Marketplace`](crate::marketplace::Marketplace)).

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::Result;
use crate::executor::ExecutionEngine;
use crate::sql::ast::{SelectStatement, Statement};
use crate::sql::Parser;
use crate::storage::{Document, DocumentFile, Record, Store, TimeSource};

/// Outcome of a mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunResult {
    pub changes: usize,
}

/// Handle to the document store
pub struct Database {
    engine: Mutex<ExecutionEngine>,
}

impl Database {
    /// Open the document at `path`, falling back to empty default collections
    /// when it is missing or unreadable
    pub fn open(path: impl AsRef<Path>) -> Self {
        let file = DocumentFile::new(path);
        info!(path = %file.path().display(), "opening document store");
        Self::from_engine(ExecutionEngine::new(Store::open(file)))
    }

    /// Store that lives only in memory, starting from the default collections
    pub fn in_memory() -> Self {
        Self::from_engine(ExecutionEngine::new(Store::in_memory(
            Document::with_default_collections(),
        )))
    }

    /// Open with a caller-supplied clock for `created_at` stamps
    pub fn open_with_time_source(path: impl AsRef<Path>, clock: Box<dyn TimeSource>) -> Self {
        let store = Store::open(DocumentFile::new(path));
        Self::from_engine(ExecutionEngine::with_time_source(store, clock))
    }

    /// In-memory store with a caller-supplied clock
    pub fn in_memory_with_time_source(clock: Box<dyn TimeSource>) -> Self {
        let store = Store::in_memory(Document::with_default_collections());
        Self::from_engine(ExecutionEngine::with_time_source(store, clock))
    }

    fn from_engine(engine: ExecutionEngine) -> Self {
        Self {
            engine: Mutex::new(engine),
        }
    }

    fn engine(&self) -> MutexGuard<'_, ExecutionEngine> {
        // A panic mid-statement leaves the document as it was last written
        // to memory; keep serving it.
        self.engine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Parse a statement once for repeated execution
    pub fn prepare(&self, sql: &str) -> Prepared<'_> {
        let statement = match Parser::new(sql).and_then(|mut parser| parser.parse()) {
            Ok(statement) => Some(statement),
            Err(e) => {
                debug!(sql, error = %e, "statement not recognised");
                None
            }
        };
        Prepared {
            database: self,
            statement,
        }
    }

    /// Execute a script of schema declarations
    ///
    /// Every `CREATE TABLE` in the script declares its collection; anything
    /// else is skipped. The document is written once at the end.
    pub fn exec(&self, sql: &str) -> Result<()> {
        let statements = match Parser::new(sql) {
            Ok(mut parser) => parser.parse_script(),
            Err(e) => {
                debug!(error = %e, "script not recognised");
                return Ok(());
            }
        };

        let mut engine = self.engine();
        let mut created = Vec::new();
        for statement in &statements {
            match statement {
                Statement::CreateTable(create) => {
                    if engine
                        .store_mut()
                        .document_mut()
                        .ensure_collection(&create.table_name)
                    {
                        created.push(create.table_name.as_str());
                    }
                }
                other => debug!(kind = other.kind(), "exec ignores non-schema statement"),
            }
        }

        if !created.is_empty() {
            info!(collections = ?created, "declared collections");
        }
        engine.store().persist()
    }

    /// Run an already-built statement; the typed counterpart of `prepare`
    pub fn execute(&self, statement: &Statement, params: &[Value]) -> Result<RunResult> {
        let result = self.engine().execute(statement, params)?;
        Ok(RunResult {
            changes: result.affected_rows,
        })
    }

    /// Run an already-built SELECT
    pub fn query(&self, statement: &SelectStatement, params: &[Value]) -> Vec<Record> {
        self.engine().query(statement, params)
    }

    /// Names of every collection, in document order
    pub fn collection_names(&self) -> Vec<String> {
        self.engine()
            .store()
            .document()
            .collection_names()
            .map(str::to_string)
            .collect()
    }

    /// Copy of a collection's records; empty when it does not exist
    pub fn snapshot(&self, collection: &str) -> Vec<Record> {
        self.engine().store().document().collection(collection).to_vec()
    }

    /// Total number of records across all collections
    pub fn record_count(&self) -> usize {
        self.engine().store().document().record_count()
    }
}

/// A parsed statement bound to its database
pub struct Prepared<'db> {
    database: &'db Database,
    statement: Option<Statement>,
}

impl Prepared<'_> {
    /// Whether the statement text was recognised
    pub fn is_recognised(&self) -> bool {
        self.statement.is_some()
    }

    pub fn statement(&self) -> Option<&Statement> {
        self.statement.as_ref()
    }

    /// First matching record, if any
    pub fn get(&self, params: &[Value]) -> Option<Record> {
        self.all(params).into_iter().next()
    }

    /// Every matching record in result order
    pub fn all(&self, params: &[Value]) -> Vec<Record> {
        match &self.statement {
            Some(Statement::Select(select)) => self.database.query(select, params),
            Some(other) => {
                debug!(kind = other.kind(), "read on a non-select statement");
                Vec::new()
            }
            None => Vec::new(),
        }
    }

    /// Execute a mutation; only a failed write of the document is an error
    pub fn run(&self, params: &[Value]) -> Result<RunResult> {
        match &self.statement {
            Some(Statement::Select(_)) | None => Ok(RunResult { changes: 0 }),
            Some(statement) => {
                let result = self.database.execute(statement, params)?;
                debug!(
                    kind = statement.kind(),
                    table = statement.table_name(),
                    changes = result.changes,
                    "statement applied"
                );
                Ok(result)
            }
        }
    }
}
