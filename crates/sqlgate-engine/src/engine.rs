//! Execution engine
//!
//! Layers caching, optimization, batching, pagination and metrics around
//! raw statement execution. Statement failures at the driver come back as
//! result values so batch and async callers always have something to
//! inspect; only setup failures surface as `Err`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use sqlgate_core::{Connection, DialectCapabilities, Result, SqlGateError};
use sqlgate_registry::DialectRegistry;

use crate::cache::QueryCache;
use crate::metrics::{generate_query_id, MetricsStore, QueryMetric};
use crate::optimizer::OptimizerChain;
use crate::options::ExecutionOptions;
use crate::result::{
    BatchResult, BatchStatementResult, ExecutionResult, PageRequest, PageResult,
};

/// Engine-wide tuning knobs.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Query cache time-to-live
    pub cache_ttl: Duration,
    /// Query cache entry bound; least-recently-used eviction at the bound
    pub cache_capacity: usize,
    /// Async dispatch worker count
    pub worker_count: usize,
    /// Async dispatch queue bound; saturation blocks submitters
    pub queue_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(30 * 60),
            cache_capacity: 1000,
            worker_count: 10,
            queue_depth: 32,
        }
    }
}

impl EngineConfig {
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn with_worker_count(mut self, workers: usize) -> Self {
        self.worker_count = workers;
        self
    }

    pub fn with_queue_depth(mut self, depth: usize) -> Self {
        self.queue_depth = depth;
        self
    }
}

pub struct ExecutionEngine {
    registry: Arc<DialectRegistry>,
    cache: QueryCache,
    metrics: MetricsStore,
    optimizers: OptimizerChain,
    config: EngineConfig,
}

impl ExecutionEngine {
    pub fn new(registry: Arc<DialectRegistry>) -> Self {
        Self::with_config(registry, EngineConfig::default())
    }

    pub fn with_config(registry: Arc<DialectRegistry>, config: EngineConfig) -> Self {
        Self {
            registry,
            cache: QueryCache::new(config.cache_ttl, config.cache_capacity),
            metrics: MetricsStore::new(),
            optimizers: OptimizerChain::standard(),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Whether the statement produces a result set.
    pub fn is_query(sql: &str) -> bool {
        let trimmed = sql.trim_start().to_uppercase();
        trimmed.starts_with("SELECT")
            || trimmed.starts_with("WITH")
            || trimmed.starts_with("SHOW")
            || trimmed.starts_with("DESCRIBE")
            || trimmed.starts_with("EXPLAIN")
    }

    /// Execute one statement with the full feature stack.
    ///
    /// With caching enabled, an unexpired entry for the exact submitted text
    /// short-circuits execution entirely. Results are cached keyed by the
    /// pre-optimization text, and only on success. A metrics entry is
    /// recorded for every call, cache hits and failures included.
    #[tracing::instrument(skip(self, conn, sql, options), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    pub async fn execute_advanced(
        &self,
        sql: &str,
        conn: &Arc<dyn Connection>,
        options: &ExecutionOptions,
    ) -> Result<ExecutionResult> {
        let query_id = generate_query_id(sql);
        let started = Instant::now();

        if options.cache_enabled {
            if let Some(mut hit) = self.cache.get(sql) {
                hit.query_id = query_id.clone();
                self.record_metric(&query_id, sql, started.elapsed(), true, None);
                return Ok(hit);
            }
        }

        if let Some(timeout) = options.query_timeout {
            conn.set_statement_timeout(timeout).await?;
        }

        let executed_sql = if options.optimize {
            self.optimizers
                .optimize(sql, &self.capabilities_for(conn.dialect()), options)
        } else {
            sql.to_string()
        };

        let result = if Self::is_query(&executed_sql) {
            match conn.query(&executed_sql, &[]).await {
                Ok(driver_result) => ExecutionResult::from_query_result(
                    query_id.clone(),
                    sql,
                    &executed_sql,
                    &driver_result,
                    options.max_rows,
                    started.elapsed(),
                ),
                Err(e) => {
                    tracing::warn!(error = %e, "query execution failed");
                    ExecutionResult::failure(
                        query_id.clone(),
                        sql,
                        &executed_sql,
                        e.to_string(),
                        started.elapsed(),
                    )
                }
            }
        } else {
            match conn.execute(&executed_sql, &[]).await {
                Ok(affected) => {
                    let mut statement_result = ExecutionResult::from_query_result(
                        query_id.clone(),
                        sql,
                        &executed_sql,
                        &sqlgate_core::QueryResult::empty(),
                        options.max_rows,
                        started.elapsed(),
                    );
                    statement_result.affected_rows = affected;
                    statement_result
                }
                Err(e) => {
                    tracing::warn!(error = %e, "statement execution failed");
                    ExecutionResult::failure(
                        query_id.clone(),
                        sql,
                        &executed_sql,
                        e.to_string(),
                        started.elapsed(),
                    )
                }
            }
        };

        if result.success && options.cache_enabled && Self::is_query(&executed_sql) {
            self.cache.put(sql, result.clone());
        }
        self.record_metric(
            &query_id,
            sql,
            result.duration,
            result.success,
            result.error.clone(),
        );
        Ok(result)
    }

    /// Execute statements in submission order.
    ///
    /// In transactional mode auto-commit is disabled for the duration, the
    /// first failure triggers a rollback and stops the batch, and the
    /// original auto-commit setting is restored on every path, commit and
    /// rollback failures included. Non-transactional batches run every
    /// statement and report per-statement outcomes.
    #[tracing::instrument(skip(self, conn, statements, options), fields(statements = statements.len(), transactional = options.transactional))]
    pub async fn execute_batch(
        &self,
        statements: &[String],
        conn: &Arc<dyn Connection>,
        options: &ExecutionOptions,
    ) -> Result<BatchResult> {
        if options.transactional {
            self.execute_batch_transactional(statements, conn).await
        } else {
            Ok(self.execute_batch_plain(statements, conn).await)
        }
    }

    async fn execute_batch_transactional(
        &self,
        statements: &[String],
        conn: &Arc<dyn Connection>,
    ) -> Result<BatchResult> {
        let original_auto_commit = conn.auto_commit();
        conn.set_auto_commit(false).await?;

        let mut results = Vec::with_capacity(statements.len());
        let mut failed_index = None;
        for (index, sql) in statements.iter().enumerate() {
            match self.run_batch_statement(sql, conn).await {
                outcome if outcome.success => results.push(outcome),
                outcome => {
                    tracing::warn!(
                        index = index,
                        error = outcome.error.as_deref().unwrap_or(""),
                        "batch statement failed, rolling back"
                    );
                    results.push(outcome);
                    failed_index = Some(index);
                    break;
                }
            }
        }

        let finish = if failed_index.is_some() {
            conn.rollback().await
        } else {
            conn.commit().await
        };

        // Restore before inspecting the commit/rollback outcome; the caller
        // gets the connection back in its original mode no matter what.
        if let Err(e) = conn.set_auto_commit(original_auto_commit).await {
            tracing::error!(error = %e, "failed to restore auto-commit after batch");
        }

        let (committed, rolled_back, transaction_error) = match (&finish, failed_index) {
            (Ok(()), None) => (true, false, None),
            (Ok(()), Some(_)) => (false, true, None),
            (Err(e), _) => {
                tracing::error!(error = %e, "transaction finish failed");
                (false, false, Some(e.to_string()))
            }
        };

        Ok(BatchResult {
            statements: results,
            failed_index,
            committed,
            rolled_back,
            transaction_error,
        })
    }

    async fn execute_batch_plain(
        &self,
        statements: &[String],
        conn: &Arc<dyn Connection>,
    ) -> BatchResult {
        let mut results = Vec::with_capacity(statements.len());
        let mut failed_index = None;
        for (index, sql) in statements.iter().enumerate() {
            let outcome = self.run_batch_statement(sql, conn).await;
            if !outcome.success && failed_index.is_none() {
                failed_index = Some(index);
            }
            results.push(outcome);
        }
        BatchResult {
            statements: results,
            failed_index,
            committed: false,
            rolled_back: false,
            transaction_error: None,
        }
    }

    async fn run_batch_statement(
        &self,
        sql: &str,
        conn: &Arc<dyn Connection>,
    ) -> BatchStatementResult {
        let query_id = generate_query_id(sql);
        let started = Instant::now();
        match conn.execute(sql, &[]).await {
            Ok(affected) => {
                self.record_metric(&query_id, sql, started.elapsed(), true, None);
                BatchStatementResult {
                    sql: sql.to_string(),
                    success: true,
                    affected_rows: affected,
                    error: None,
                }
            }
            Err(e) => {
                self.record_metric(&query_id, sql, started.elapsed(), false, Some(e.to_string()));
                BatchStatementResult {
                    sql: sql.to_string(),
                    success: false,
                    affected_rows: 0,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Execute one page of a query.
    ///
    /// The total is computed by wrapping the statement in a counting
    /// subquery; the page itself re-executes the statement with the
    /// dialect's limit/offset syntax. Zero matching rows yields an empty
    /// page with zero total pages, not an error.
    #[tracing::instrument(skip(self, conn, sql, request), fields(page = request.page, page_size = request.page_size))]
    pub async fn execute_paginated(
        &self,
        sql: &str,
        conn: &Arc<dyn Connection>,
        request: PageRequest,
    ) -> Result<PageResult> {
        if request.page == 0 {
            return Err(SqlGateError::Execution(
                "page numbers are 1-based".to_string(),
            ));
        }
        if request.page_size == 0 {
            return Err(SqlGateError::Execution(
                "page size must be positive".to_string(),
            ));
        }

        let base = sql.trim_end().trim_end_matches(';').trim_end();
        let count_sql = format!("SELECT COUNT(*) FROM ({}) AS sqlgate_count", base);
        let count_result = conn.query(&count_sql, &[]).await?;
        let total_rows = count_result
            .rows
            .first()
            .and_then(|row| row.get(0))
            .and_then(|value| value.as_i64())
            .unwrap_or(0)
            .max(0) as u64;

        let total_pages = total_rows.div_ceil(request.page_size);
        if total_rows == 0 {
            return Ok(PageResult {
                page: request.page,
                page_size: request.page_size,
                total_rows: 0,
                total_pages: 0,
                columns: Vec::new(),
                rows: Vec::new(),
            });
        }

        let paged_sql = match self.registry.resolve(conn.dialect()) {
            Ok(plugin) => plugin.paginate(base, request.page_size, request.offset()),
            Err(_) => format!(
                "{} LIMIT {} OFFSET {}",
                base,
                request.page_size,
                request.offset()
            ),
        };
        let page_result = conn.query(&paged_sql, &[]).await?;

        Ok(PageResult {
            page: request.page,
            page_size: request.page_size,
            total_rows,
            total_pages,
            columns: page_result.columns.clone(),
            rows: page_result
                .rows
                .iter()
                .map(|row| row.values.iter().map(|v| v.to_display_string()).collect())
                .collect(),
        })
    }

    /// Point-in-time copy of all recorded metrics.
    pub fn metrics(&self) -> Vec<QueryMetric> {
        self.metrics.all()
    }

    pub fn metric(&self, query_id: &str) -> Option<QueryMetric> {
        self.metrics.get(query_id)
    }

    /// Drop every cached result.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Drop every recorded metric.
    pub fn clear_metrics(&self) {
        self.metrics.clear();
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    fn capabilities_for(&self, dialect: &str) -> DialectCapabilities {
        match self.registry.resolve(dialect) {
            Ok(plugin) => plugin.capabilities(),
            Err(_) => {
                tracing::debug!(dialect = %dialect, "unknown dialect, optimizing with no capabilities");
                DialectCapabilities::default()
            }
        }
    }

    fn record_metric(
        &self,
        query_id: &str,
        sql: &str,
        duration: Duration,
        success: bool,
        error: Option<String>,
    ) {
        self.metrics.record(QueryMetric {
            query_id: query_id.to_string(),
            sql: sql.to_string(),
            duration,
            success,
            error,
            recorded_at: Utc::now(),
        });
    }
}
