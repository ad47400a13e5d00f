//! Per-call execution options

use std::collections::HashMap;
use std::time::Duration;

/// Options governing a single execution call.
///
/// Immutable once constructed; use the `with_*` builder methods. Defaults:
/// caching off, optimization off, non-transactional, no statement timeout,
/// 10 000 row materialization cap.
#[derive(Debug, Clone)]
pub struct ExecutionOptions {
    /// Consult and populate the query cache
    pub cache_enabled: bool,
    /// Run the statement through the optimizer chain before execution
    pub optimize: bool,
    /// Batch execution wraps the statements in a transaction
    pub transactional: bool,
    /// Per-statement timeout passed to the driver; `None` leaves the driver
    /// default in place
    pub query_timeout: Option<Duration>,
    /// Materialization stops after this many rows and flags truncation
    pub max_rows: usize,
    /// Driver fetch-size hint; 0 leaves the driver default
    pub fetch_size: usize,
    /// Table name to index name, consumed by the index-hint optimizer
    pub index_hints: HashMap<String, String>,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            cache_enabled: false,
            optimize: false,
            transactional: false,
            query_timeout: None,
            max_rows: 10_000,
            fetch_size: 0,
            index_hints: HashMap::new(),
        }
    }
}

impl ExecutionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    pub fn with_optimization(mut self, enabled: bool) -> Self {
        self.optimize = enabled;
        self
    }

    pub fn with_transactional(mut self, enabled: bool) -> Self {
        self.transactional = enabled;
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows;
        self
    }

    pub fn with_fetch_size(mut self, fetch_size: usize) -> Self {
        self.fetch_size = fetch_size;
        self
    }

    pub fn with_index_hint(mut self, table: &str, index: &str) -> Self {
        self.index_hints.insert(table.to_string(), index.to_string());
        self
    }
}
