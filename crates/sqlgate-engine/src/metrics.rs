//! Per-statement execution metrics

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

/// One recorded execution, success or failure.
#[derive(Debug, Clone)]
pub struct QueryMetric {
    pub query_id: String,
    pub sql: String,
    pub duration: Duration,
    pub success: bool,
    pub error: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Derive a query identifier from the SQL text and submission time.
///
/// Two submissions of the same text get distinct identifiers.
pub fn generate_query_id(sql: &str) -> String {
    let mut hasher = DefaultHasher::new();
    sql.hash(&mut hasher);
    Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_default()
        .hash(&mut hasher);
    format!("q{:016x}", hasher.finish())
}

/// Append-only store of execution metrics, keyed by query identifier and
/// retained until explicitly cleared.
pub struct MetricsStore {
    entries: RwLock<HashMap<String, QueryMetric>>,
}

impl MetricsStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn record(&self, metric: QueryMetric) {
        tracing::trace!(
            query_id = %metric.query_id,
            success = metric.success,
            duration_ms = metric.duration.as_millis() as u64,
            "recorded query metric"
        );
        self.entries.write().insert(metric.query_id.clone(), metric);
    }

    pub fn get(&self, query_id: &str) -> Option<QueryMetric> {
        self.entries.read().get(query_id).cloned()
    }

    /// Point-in-time copy of every recorded metric.
    pub fn all(&self) -> Vec<QueryMetric> {
        self.entries.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        let removed = {
            let mut entries = self.entries.write();
            let n = entries.len();
            entries.clear();
            n
        };
        tracing::debug!(removed = removed, "cleared query metrics");
    }
}

impl Default for MetricsStore {
    fn default() -> Self {
        Self::new()
    }
}
