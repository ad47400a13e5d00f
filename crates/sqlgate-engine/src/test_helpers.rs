//! Instrumented mock connection shared by the engine and dispatch tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use sqlgate_core::{
    ColumnMeta, Connection, QueryResult, Result, Row, SqlGateError, Value,
};
use sqlgate_registry::DialectRegistry;

/// A connection that records every call and can be told to fail.
pub struct MockConnection {
    dialect: &'static str,
    pub query_count: AtomicUsize,
    pub execute_count: AtomicUsize,
    pub commit_count: AtomicUsize,
    pub rollback_count: AtomicUsize,
    auto_commit: AtomicBool,
    fail_on_commit: AtomicBool,
    /// Statements containing this substring fail at the driver
    fail_matching: Mutex<Option<String>>,
    /// Total reported by COUNT(*) wrapper queries
    total_rows: AtomicUsize,
    /// Rows returned by ordinary queries
    rows: Mutex<Vec<Vec<Value>>>,
    columns: Mutex<Vec<String>>,
    /// Every statement sent to the driver, in order
    pub statement_log: Mutex<Vec<String>>,
    /// Queries block on a permit from this semaphore when set
    gate: Mutex<Option<Arc<tokio::sync::Semaphore>>>,
}

impl MockConnection {
    pub fn new() -> Self {
        Self {
            dialect: "mysql",
            query_count: AtomicUsize::new(0),
            execute_count: AtomicUsize::new(0),
            commit_count: AtomicUsize::new(0),
            rollback_count: AtomicUsize::new(0),
            auto_commit: AtomicBool::new(true),
            fail_on_commit: AtomicBool::new(false),
            fail_matching: Mutex::new(None),
            total_rows: AtomicUsize::new(0),
            rows: Mutex::new(vec![vec![Value::Int64(1)]]),
            columns: Mutex::new(vec!["id".to_string()]),
            statement_log: Mutex::new(Vec::new()),
            gate: Mutex::new(None),
        }
    }

    /// Make every query wait for one permit before completing.
    pub fn gated(self, semaphore: Arc<tokio::sync::Semaphore>) -> Self {
        *self.gate.lock() = Some(semaphore);
        self
    }

    pub fn fail_when(self, pattern: &str) -> Self {
        *self.fail_matching.lock() = Some(pattern.to_string());
        self
    }

    pub fn with_total_rows(self, total: usize) -> Self {
        self.total_rows.store(total, Ordering::SeqCst);
        self
    }

    pub fn with_rows(self, columns: Vec<&str>, rows: Vec<Vec<Value>>) -> Self {
        *self.columns.lock() = columns.into_iter().map(String::from).collect();
        *self.rows.lock() = rows;
        self
    }

    pub fn fail_on_commit(self) -> Self {
        self.fail_on_commit.store(true, Ordering::SeqCst);
        self
    }

    pub fn queries(&self) -> usize {
        self.query_count.load(Ordering::SeqCst)
    }

    pub fn executes(&self) -> usize {
        self.execute_count.load(Ordering::SeqCst)
    }

    pub fn log(&self) -> Vec<String> {
        self.statement_log.lock().clone()
    }

    fn check_failure(&self, sql: &str) -> Result<()> {
        if let Some(pattern) = self.fail_matching.lock().as_deref() {
            if sql.contains(pattern) {
                return Err(SqlGateError::Execution(format!(
                    "mock failure on '{pattern}'"
                )));
            }
        }
        Ok(())
    }
}

impl Default for MockConnection {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connection for MockConnection {
    fn dialect(&self) -> &str {
        self.dialect
    }

    async fn query(&self, sql: &str, _params: &[Value]) -> Result<QueryResult> {
        let gate = self.gate.lock().clone();
        if let Some(semaphore) = gate {
            semaphore
                .acquire()
                .await
                .map_err(|_| SqlGateError::Other("query gate closed".to_string()))?
                .forget();
        }
        self.statement_log.lock().push(sql.to_string());
        self.query_count.fetch_add(1, Ordering::SeqCst);
        self.check_failure(sql)?;

        let mut result = QueryResult::empty();
        if sql.starts_with("SELECT COUNT(*) FROM (") {
            result.columns = vec![ColumnMeta {
                name: "count".to_string(),
                ..ColumnMeta::default()
            }];
            result.rows = vec![Row::new(
                vec!["count".to_string()],
                vec![Value::Int64(self.total_rows.load(Ordering::SeqCst) as i64)],
            )];
            return Ok(result);
        }

        let columns = self.columns.lock().clone();
        result.columns = columns
            .iter()
            .map(|name| ColumnMeta {
                name: name.clone(),
                ..ColumnMeta::default()
            })
            .collect();
        result.rows = self
            .rows
            .lock()
            .iter()
            .map(|values| Row::new(columns.clone(), values.clone()))
            .collect();
        Ok(result)
    }

    async fn execute(&self, sql: &str, _params: &[Value]) -> Result<u64> {
        self.statement_log.lock().push(sql.to_string());
        self.execute_count.fetch_add(1, Ordering::SeqCst);
        self.check_failure(sql)?;
        Ok(1)
    }

    fn auto_commit(&self) -> bool {
        self.auto_commit.load(Ordering::SeqCst)
    }

    async fn set_auto_commit(&self, enabled: bool) -> Result<()> {
        self.auto_commit.store(enabled, Ordering::SeqCst);
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        self.commit_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_on_commit.load(Ordering::SeqCst) {
            return Err(SqlGateError::Execution("mock commit failure".to_string()));
        }
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        self.rollback_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    fn is_closed(&self) -> bool {
        false
    }
}

/// Builtin-dialect registry for engine tests.
pub fn test_registry() -> Arc<DialectRegistry> {
    Arc::new(DialectRegistry::with_builtins())
}
