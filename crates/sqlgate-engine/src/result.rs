//! Execution result and textual materialization

use std::time::Duration;

use sqlgate_core::{ColumnMeta, QueryResult};

/// The value returned by `execute_advanced` and consumed by batch/async
/// callers.
///
/// Driver-level statement failures are captured here (success flag plus
/// message) rather than surfaced as `Err`; only setup failures propagate.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// Identifier of the metrics entry recorded for this call
    pub query_id: String,
    /// Original statement text as submitted (cache key)
    pub sql: String,
    /// Statement actually sent to the driver, after any optimizer rewrites
    pub executed_sql: String,
    pub success: bool,
    /// Driver error message when `success` is false
    pub error: Option<String>,
    pub columns: Vec<ColumnMeta>,
    /// Rows materialized to text; NULL renders as the empty string
    pub rows: Vec<Vec<String>>,
    pub affected_rows: u64,
    /// True when materialization stopped at the row cap
    pub truncated: bool,
    /// True when the result was served from the query cache
    pub from_cache: bool,
    pub duration: Duration,
}

impl ExecutionResult {
    /// Materialize a driver result into text.
    ///
    /// Every value converts via its display form, NULL becoming the empty
    /// string; at most `max_rows` rows are kept and the remainder is dropped
    /// with the truncated flag set.
    pub fn from_query_result(
        query_id: String,
        sql: &str,
        executed_sql: &str,
        result: &QueryResult,
        max_rows: usize,
        duration: Duration,
    ) -> Self {
        let truncated = result.truncated || result.rows.len() > max_rows;
        let rows: Vec<Vec<String>> = result
            .rows
            .iter()
            .take(max_rows)
            .map(|row| row.values.iter().map(|v| v.to_display_string()).collect())
            .collect();
        Self {
            query_id,
            sql: sql.to_string(),
            executed_sql: executed_sql.to_string(),
            success: true,
            error: None,
            columns: result.columns.clone(),
            rows,
            affected_rows: result.affected_rows,
            truncated,
            from_cache: false,
            duration,
        }
    }

    /// Capture a driver failure as a value.
    pub fn failure(
        query_id: String,
        sql: &str,
        executed_sql: &str,
        error: String,
        duration: Duration,
    ) -> Self {
        Self {
            query_id,
            sql: sql.to_string(),
            executed_sql: executed_sql.to_string(),
            success: false,
            error: Some(error),
            columns: Vec::new(),
            rows: Vec::new(),
            affected_rows: 0,
            truncated: false,
            from_cache: false,
            duration,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// One page of a paginated query.
#[derive(Debug, Clone)]
pub struct PageResult {
    /// 1-based page number as requested
    pub page: u64,
    pub page_size: u64,
    pub total_rows: u64,
    /// `ceil(total_rows / page_size)`
    pub total_pages: u64,
    pub columns: Vec<ColumnMeta>,
    pub rows: Vec<Vec<String>>,
}

/// Outcome of one statement within a batch.
#[derive(Debug, Clone)]
pub struct BatchStatementResult {
    pub sql: String,
    pub success: bool,
    pub affected_rows: u64,
    pub error: Option<String>,
}

/// Outcome of a whole batch.
#[derive(Debug, Clone)]
pub struct BatchResult {
    /// Per-statement outcomes, in submission order; in transactional mode
    /// statements after the first failure are absent, never attempted
    pub statements: Vec<BatchStatementResult>,
    /// Index of the first failed statement, if any
    pub failed_index: Option<usize>,
    /// A transactional batch that completed cleanly
    pub committed: bool,
    /// A transactional batch that hit a failure and was rolled back
    pub rolled_back: bool,
    /// Error from the commit or rollback call itself, if it failed
    pub transaction_error: Option<String>,
}

impl BatchResult {
    pub fn success(&self) -> bool {
        self.failed_index.is_none() && self.transaction_error.is_none()
    }
}

/// A pagination request. Page numbers are 1-based.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub page: u64,
    pub page_size: u64,
}

impl PageRequest {
    pub fn new(page: u64, page_size: u64) -> Self {
        Self { page, page_size }
    }

    pub fn offset(&self) -> u64 {
        (self.page.saturating_sub(1)) * self.page_size
    }
}
