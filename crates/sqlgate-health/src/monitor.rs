//! Health monitor: probing, rolling records, background sweeps, recovery

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use sqlgate_core::{Connection, ConnectionDescriptor, ConnectionPool, SqlGateError};
use sqlgate_registry::DialectRegistry;

use crate::record::{HealthCheckResult, HealthRecord, HealthSnapshot};
use crate::status::HealthStatus;

/// Health monitoring configuration
#[derive(Debug, Clone)]
pub struct HealthConfig {
    /// Latency above which a responsive connection is classified SLOW
    pub slow_threshold: Duration,
    /// Fixed connect/socket timeout per probe, independent of caller options
    pub probe_timeout: Duration,
    /// Period of the monitored-connection sweep
    pub sweep_interval: Duration,
    /// Aggregate wait budget for one sweep's fan-out
    pub sweep_budget: Duration,
    /// Period of the stale-record cleanup job
    pub cleanup_interval: Duration,
    /// Unmonitored records unchecked for this long are dropped
    pub retention: Duration,
    /// Bounded recovery attempts
    pub recovery_attempts: u32,
    /// Linear backoff unit: attempt N sleeps N x this before probing
    pub recovery_backoff_unit: Duration,
}

impl HealthConfig {
    pub fn with_slow_threshold(mut self, threshold: Duration) -> Self {
        self.slow_threshold = threshold;
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_recovery_backoff_unit(mut self, unit: Duration) -> Self {
        self.recovery_backoff_unit = unit;
        self
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            slow_threshold: Duration::from_millis(5000),
            probe_timeout: Duration::from_secs(10),
            sweep_interval: Duration::from_secs(300),
            sweep_budget: Duration::from_secs(30),
            cleanup_interval: Duration::from_secs(3600),
            retention: Duration::from_secs(24 * 3600),
            recovery_attempts: 3,
            recovery_backoff_unit: Duration::from_millis(1000),
        }
    }
}

/// Future handle for an async probe; a failed task yields an error value.
pub struct HealthProbeHandle {
    handle: tokio::task::JoinHandle<HealthCheckResult>,
}

impl HealthProbeHandle {
    pub async fn wait(self) -> Result<HealthCheckResult, SqlGateError> {
        self.handle
            .await
            .map_err(|e| SqlGateError::Other(format!("health probe task failed: {e}")))
    }
}

/// Handles for the periodic sweep and cleanup jobs.
pub struct HealthMonitorJobs {
    sweep: tokio::task::JoinHandle<()>,
    cleanup: tokio::task::JoinHandle<()>,
}

impl HealthMonitorJobs {
    pub fn stop(self) {
        self.sweep.abort();
        self.cleanup.abort();
    }
}

/// Continuously assesses whether connections are usable and drives bounded
/// automatic recovery.
///
/// The record map is a concurrent key→record store; per-key counters are
/// atomic increments and `last_result` is last-writer-wins, so racing probes
/// for one key stay internally consistent.
pub struct HealthMonitor {
    registry: Arc<DialectRegistry>,
    pool: Arc<dyn ConnectionPool>,
    records: DashMap<String, Arc<HealthRecord>>,
    config: HealthConfig,
}

impl HealthMonitor {
    pub fn new(registry: Arc<DialectRegistry>, pool: Arc<dyn ConnectionPool>) -> Self {
        Self::with_config(registry, pool, HealthConfig::default())
    }

    pub fn with_config(
        registry: Arc<DialectRegistry>,
        pool: Arc<dyn ConnectionPool>,
        config: HealthConfig,
    ) -> Self {
        Self {
            registry,
            pool,
            records: DashMap::new(),
            config,
        }
    }

    /// Synchronously probe a connection and fold the outcome into its record.
    ///
    /// Status is derived fresh: connect failure → UNHEALTHY; probe failure
    /// with an open connection → DEGRADED; latency past the threshold → SLOW;
    /// otherwise HEALTHY. The rolling record and aggregate statistics are
    /// always updated before returning.
    #[tracing::instrument(skip(self, descriptor), fields(target = %descriptor.display_name()))]
    pub async fn check_connection_health(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> HealthCheckResult {
        let started = Instant::now();
        let result = self.probe(descriptor, started).await;

        tracing::debug!(
            status = ?result.status,
            latency_ms = result.latency.as_millis() as u64,
            errors = result.errors.len(),
            "health probe completed"
        );

        self.record_for(descriptor).observe(result.clone());
        result
    }

    async fn probe(&self, descriptor: &ConnectionDescriptor, started: Instant) -> HealthCheckResult {
        let conn = match tokio::time::timeout(
            self.config.probe_timeout,
            self.pool.acquire(descriptor),
        )
        .await
        {
            Ok(Ok(conn)) => conn,
            Ok(Err(e)) => {
                return HealthCheckResult::connect_failure(e.to_string(), started.elapsed());
            }
            Err(_) => {
                return HealthCheckResult::connect_failure(
                    format!(
                        "connect timed out after {} ms",
                        self.config.probe_timeout.as_millis()
                    ),
                    started.elapsed(),
                );
            }
        };

        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        let probe_sql = self
            .registry
            .resolve(&descriptor.dialect)
            .map(|plugin| plugin.probe_statement().to_string())
            .unwrap_or_else(|_| "SELECT 1".to_string());

        let query_ok = match tokio::time::timeout(
            self.config.probe_timeout,
            conn.query(&probe_sql, &[]),
        )
        .await
        {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                errors.push(format!("probe query failed: {e}"));
                false
            }
            Err(_) => {
                errors.push("probe query timed out".to_string());
                false
            }
        };

        // A connection without an introspection surface cannot fail the
        // metadata probe; it is reported as a capability gap, not degradation.
        let (metadata_ok, metadata_probe_failed) = match conn.as_introspection() {
            Some(introspection) => {
                match tokio::time::timeout(self.config.probe_timeout, introspection.list_schemas(None))
                    .await
                {
                    Ok(Ok(_)) => (true, false),
                    Ok(Err(e)) => {
                        errors.push(format!("metadata probe failed: {e}"));
                        (false, true)
                    }
                    Err(_) => {
                        errors.push("metadata probe timed out".to_string());
                        (false, true)
                    }
                }
            }
            None => {
                warnings.push("metadata probe unavailable on this connection".to_string());
                (false, false)
            }
        };

        let latency = started.elapsed();
        let status = HealthStatus::classify(
            true,
            query_ok,
            !metadata_probe_failed,
            latency,
            self.config.slow_threshold,
        );
        if status == HealthStatus::Slow {
            warnings.push(format!(
                "latency {} ms exceeds slow threshold {} ms",
                latency.as_millis(),
                self.config.slow_threshold.as_millis()
            ));
        }

        self.pool.release(conn).await;

        HealthCheckResult {
            status,
            connect_ok: true,
            query_ok,
            metadata_ok,
            latency,
            errors,
            warnings,
            checked_at: Utc::now(),
        }
    }

    /// Non-blocking wrapper around `check_connection_health`.
    pub fn check_health_async(self: &Arc<Self>, descriptor: ConnectionDescriptor) -> HealthProbeHandle {
        let monitor = self.clone();
        let handle =
            tokio::spawn(async move { monitor.check_connection_health(&descriptor).await });
        HealthProbeHandle { handle }
    }

    /// Mark a connection for the periodic sweep. The record is created
    /// lazily on first monitoring request.
    pub fn start_monitoring(&self, descriptor: &ConnectionDescriptor) {
        let record = self.record_for(descriptor);
        record.set_monitored(true);
        tracing::info!(key = %descriptor.cache_key(), "started health monitoring");
    }

    /// Unmark a connection; its record lingers until the retention cleanup.
    pub fn stop_monitoring(&self, key: &str) {
        if let Some(record) = self.records.get(key) {
            record.set_monitored(false);
            tracing::info!(key = %key, "stopped health monitoring");
        }
    }

    /// Last known usability of a connection, for pre-flight gating.
    pub fn is_connection_healthy(&self, key: &str) -> bool {
        self.records
            .get(key)
            .map(|record| record.last_status().is_usable())
            .unwrap_or(false)
    }

    /// Snapshot of one record, if present.
    pub fn snapshot(&self, key: &str) -> Option<HealthSnapshot> {
        self.records.get(key).map(|record| record.snapshot(key))
    }

    /// Point-in-time snapshots over all records.
    pub fn health_summary(&self) -> Vec<HealthSnapshot> {
        self.records
            .iter()
            .map(|entry| entry.value().snapshot(entry.key()))
            .collect()
    }

    /// Probe every monitored connection concurrently, waiting at most the
    /// sweep budget in aggregate. Individual probe failures are logged, never
    /// escalated; a single slow connection cannot stall the sweep for others.
    pub async fn sweep_once(&self) {
        let monitored: Vec<ConnectionDescriptor> = self
            .records
            .iter()
            .filter(|entry| entry.value().is_monitored())
            .map(|entry| entry.value().descriptor.clone())
            .collect();

        if monitored.is_empty() {
            return;
        }
        tracing::debug!(connections = monitored.len(), "health sweep starting");

        let probes = monitored
            .iter()
            .map(|descriptor| self.check_connection_health(descriptor));
        match tokio::time::timeout(self.config.sweep_budget, futures::future::join_all(probes))
            .await
        {
            Ok(results) => {
                let unhealthy = results
                    .iter()
                    .filter(|r| r.status == HealthStatus::Unhealthy)
                    .count();
                tracing::info!(
                    probed = results.len(),
                    unhealthy = unhealthy,
                    "health sweep completed"
                );
            }
            Err(_) => {
                tracing::warn!(
                    budget_ms = self.config.sweep_budget.as_millis() as u64,
                    "health sweep exceeded its aggregate budget"
                );
            }
        }
    }

    /// Remove records that are unmonitored and unchecked past the retention
    /// window. Bounds memory for abandoned connections.
    pub fn cleanup_stale_once(&self) {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(self.config.retention)
                .unwrap_or_else(|_| chrono::Duration::hours(24));
        // Counted inside the closure: probes may insert records concurrently,
        // so a before/after length diff is not a removal count.
        let mut removed = 0usize;
        self.records.retain(|_, record| {
            let keep = record.is_monitored()
                || record
                    .last_checked()
                    .map(|checked| checked > cutoff)
                    .unwrap_or(false);
            if !keep {
                removed += 1;
            }
            keep
        });
        if removed > 0 {
            tracing::info!(removed = removed, "dropped stale health records");
        }
    }

    /// Probe with bounded retries and linear backoff until a probe reports
    /// HEALTHY or the attempt budget is exhausted.
    ///
    /// Attempt N sleeps N x the backoff unit before probing.
    pub async fn attempt_connection_recovery(&self, descriptor: &ConnectionDescriptor) -> bool {
        for attempt in 1..=self.config.recovery_attempts {
            tokio::time::sleep(self.config.recovery_backoff_unit * attempt).await;
            let result = self.check_connection_health(descriptor).await;
            if result.status.is_healthy() {
                tracing::info!(
                    key = %descriptor.cache_key(),
                    attempt = attempt,
                    "connection recovered"
                );
                return true;
            }
            tracing::debug!(
                key = %descriptor.cache_key(),
                attempt = attempt,
                status = ?result.status,
                "recovery attempt failed"
            );
        }
        tracing::warn!(
            key = %descriptor.cache_key(),
            attempts = self.config.recovery_attempts,
            "connection recovery exhausted its attempts"
        );
        false
    }

    /// Spawn the periodic sweep and cleanup jobs on the current runtime.
    pub fn spawn_background_jobs(self: &Arc<Self>) -> HealthMonitorJobs {
        let sweep_monitor = self.clone();
        let sweep = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_monitor.config.sweep_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            ticker.tick().await; // immediate first tick
            loop {
                ticker.tick().await;
                sweep_monitor.sweep_once().await;
            }
        });

        let cleanup_monitor = self.clone();
        let cleanup = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(cleanup_monitor.config.cleanup_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                cleanup_monitor.cleanup_stale_once();
            }
        });

        HealthMonitorJobs { sweep, cleanup }
    }

    fn record_for(&self, descriptor: &ConnectionDescriptor) -> Arc<HealthRecord> {
        self.records
            .entry(descriptor.cache_key())
            .or_insert_with(|| Arc::new(HealthRecord::new(descriptor.clone())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sqlgate_core::{
        ColumnInfo, QueryResult, Result, SchemaIntrospection, TableInfo, Value,
    };
    use sqlgate_registry::{PluginProvider, RegistryConfig};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Copy, PartialEq)]
    enum FailureMode {
        None,
        Connect,
        Query,
        Metadata,
        /// Connection exposes no introspection surface at all
        WithoutIntrospection,
    }

    struct ProbeIntrospection {
        fail: bool,
    }

    #[async_trait]
    impl SchemaIntrospection for ProbeIntrospection {
        async fn list_catalogs(&self) -> Result<Vec<String>> {
            Ok(vec![])
        }

        async fn list_schemas(&self, _catalog: Option<&str>) -> Result<Vec<String>> {
            if self.fail {
                Err(SqlGateError::Schema("metadata unavailable".into()))
            } else {
                Ok(vec!["public".to_string()])
            }
        }

        async fn list_tables(
            &self,
            _catalog: Option<&str>,
            _schema: Option<&str>,
        ) -> Result<Vec<TableInfo>> {
            Ok(vec![])
        }

        async fn list_columns(
            &self,
            _catalog: Option<&str>,
            _schema: Option<&str>,
            _table: &str,
        ) -> Result<Vec<ColumnInfo>> {
            Ok(vec![])
        }

        async fn primary_key_columns(
            &self,
            _catalog: Option<&str>,
            _schema: Option<&str>,
            _table: &str,
        ) -> Result<Vec<String>> {
            Ok(vec![])
        }
    }

    struct ProbeConnection {
        mode: FailureMode,
        introspection: ProbeIntrospection,
    }

    #[async_trait]
    impl Connection for ProbeConnection {
        fn dialect(&self) -> &str {
            "mysql"
        }

        async fn query(&self, _sql: &str, _params: &[Value]) -> Result<QueryResult> {
            if self.mode == FailureMode::Query {
                Err(SqlGateError::Execution("probe rejected".into()))
            } else {
                Ok(QueryResult::empty())
            }
        }

        async fn execute(&self, _sql: &str, _params: &[Value]) -> Result<u64> {
            Ok(0)
        }

        fn auto_commit(&self) -> bool {
            true
        }

        async fn set_auto_commit(&self, _enabled: bool) -> Result<()> {
            Ok(())
        }

        async fn commit(&self) -> Result<()> {
            Ok(())
        }

        async fn rollback(&self) -> Result<()> {
            Ok(())
        }

        async fn close(&self) -> Result<()> {
            Ok(())
        }

        fn is_closed(&self) -> bool {
            false
        }

        fn as_introspection(&self) -> Option<&dyn SchemaIntrospection> {
            if self.mode == FailureMode::WithoutIntrospection {
                None
            } else {
                Some(&self.introspection)
            }
        }
    }

    struct ProbePool {
        mode: parking_lot::Mutex<FailureMode>,
        acquires: AtomicUsize,
        /// Connect failures remaining before the pool heals (for recovery tests)
        failures_before_success: AtomicUsize,
    }

    impl ProbePool {
        fn new(mode: FailureMode) -> Self {
            Self {
                mode: parking_lot::Mutex::new(mode),
                acquires: AtomicUsize::new(0),
                failures_before_success: AtomicUsize::new(usize::MAX),
            }
        }

        fn healing_after(failures: usize) -> Self {
            let pool = Self::new(FailureMode::Connect);
            pool.failures_before_success.store(failures, Ordering::SeqCst);
            pool
        }

        fn acquire_count(&self) -> usize {
            self.acquires.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ConnectionPool for ProbePool {
        async fn acquire(
            &self,
            _descriptor: &ConnectionDescriptor,
        ) -> Result<Arc<dyn Connection>> {
            let n = self.acquires.fetch_add(1, Ordering::SeqCst);
            let mode = *self.mode.lock();
            if mode == FailureMode::Connect {
                if n < self.failures_before_success.load(Ordering::SeqCst) {
                    return Err(SqlGateError::Connection("connection refused".into()));
                }
                // Healed: behave like a clean connection
                return Ok(Arc::new(ProbeConnection {
                    mode: FailureMode::None,
                    introspection: ProbeIntrospection { fail: false },
                }));
            }
            Ok(Arc::new(ProbeConnection {
                mode,
                introspection: ProbeIntrospection {
                    fail: mode == FailureMode::Metadata,
                },
            }))
        }

        async fn release(&self, _connection: Arc<dyn Connection>) {}
    }

    struct MySqlOnlyProvider;

    impl PluginProvider for MySqlOnlyProvider {
        fn plugins(&self) -> Vec<Arc<dyn sqlgate_core::DialectPlugin>> {
            vec![Arc::new(sqlgate_registry::builtin::MySqlPlugin)]
        }
    }

    fn registry() -> Arc<DialectRegistry> {
        let registry = DialectRegistry::new(
            vec![Arc::new(MySqlOnlyProvider)],
            RegistryConfig {
                essential_dialects: vec![],
            },
        );
        registry.load();
        Arc::new(registry)
    }

    fn fast_config() -> HealthConfig {
        HealthConfig::default().with_recovery_backoff_unit(Duration::from_millis(1))
    }

    fn descriptor() -> ConnectionDescriptor {
        ConnectionDescriptor::new("mysql", "db1", 3306, "app")
    }

    fn monitor_with(pool: Arc<ProbePool>, config: HealthConfig) -> HealthMonitor {
        HealthMonitor::with_config(registry(), pool, config)
    }

    #[tokio::test]
    async fn test_clean_probe_is_healthy() {
        let pool = Arc::new(ProbePool::new(FailureMode::None));
        let monitor = monitor_with(pool, fast_config());

        let result = monitor.check_connection_health(&descriptor()).await;
        assert_eq!(result.status, HealthStatus::Healthy);
        assert!(result.connect_ok && result.query_ok && result.metadata_ok);
        assert!(result.errors.is_empty());
    }

    #[tokio::test]
    async fn test_connect_failure_is_unhealthy_with_errors() {
        let pool = Arc::new(ProbePool::new(FailureMode::Connect));
        let monitor = monitor_with(pool, fast_config());

        let result = monitor.check_connection_health(&descriptor()).await;
        assert_eq!(result.status, HealthStatus::Unhealthy);
        assert!(!result.connect_ok);
        assert!(!result.errors.is_empty());
    }

    #[tokio::test]
    async fn test_metadata_only_failure_is_degraded() {
        let pool = Arc::new(ProbePool::new(FailureMode::Metadata));
        let monitor = monitor_with(pool, fast_config());

        let result = monitor.check_connection_health(&descriptor()).await;
        assert_eq!(result.status, HealthStatus::Degraded);
        assert!(result.connect_ok);
        assert!(result.query_ok);
        assert!(!result.metadata_ok);
    }

    #[tokio::test]
    async fn test_missing_introspection_surface_is_not_degraded() {
        let pool = Arc::new(ProbePool::new(FailureMode::WithoutIntrospection));
        let monitor = monitor_with(pool, fast_config());
        let desc = descriptor();

        let result = monitor.check_connection_health(&desc).await;
        assert_eq!(result.status, HealthStatus::Healthy);
        assert!(!result.metadata_ok, "capability gap is still reported");
        assert!(!result.warnings.is_empty());
        assert!(result.errors.is_empty());
        assert!(monitor.is_connection_healthy(&desc.cache_key()));
    }

    #[tokio::test]
    async fn test_query_failure_is_degraded() {
        let pool = Arc::new(ProbePool::new(FailureMode::Query));
        let monitor = monitor_with(pool, fast_config());

        let result = monitor.check_connection_health(&descriptor()).await;
        assert_eq!(result.status, HealthStatus::Degraded);
    }

    #[tokio::test]
    async fn test_zero_slow_threshold_classifies_slow() {
        let pool = Arc::new(ProbePool::new(FailureMode::None));
        let monitor = monitor_with(
            pool,
            fast_config().with_slow_threshold(Duration::ZERO),
        );

        let result = monitor.check_connection_health(&descriptor()).await;
        assert_eq!(result.status, HealthStatus::Slow);
        assert!(!result.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_probe_always_updates_record() {
        let pool = Arc::new(ProbePool::new(FailureMode::Connect));
        let monitor = monitor_with(pool, fast_config());
        let desc = descriptor();

        monitor.check_connection_health(&desc).await;
        monitor.check_connection_health(&desc).await;

        let snap = monitor.snapshot(&desc.cache_key()).unwrap();
        assert_eq!(snap.total_checks, 2);
        assert_eq!(snap.successful_checks, 0);
        assert_eq!(snap.last_status, HealthStatus::Unhealthy);
        assert_eq!(snap.history.len(), 2);
    }

    #[tokio::test]
    async fn test_check_health_async_returns_value() {
        let pool = Arc::new(ProbePool::new(FailureMode::None));
        let monitor = Arc::new(monitor_with(pool, fast_config()));

        let result = monitor.check_health_async(descriptor()).wait().await.unwrap();
        assert_eq!(result.status, HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn test_recovery_succeeds_on_second_attempt_with_two_probes() {
        // First acquire fails, second succeeds
        let pool = Arc::new(ProbePool::healing_after(1));
        let monitor = monitor_with(pool.clone(), fast_config());

        let recovered = monitor.attempt_connection_recovery(&descriptor()).await;
        assert!(recovered);
        assert_eq!(pool.acquire_count(), 2, "exactly 2 probe attempts expected");
    }

    #[tokio::test]
    async fn test_recovery_exhausts_attempts_and_fails() {
        let pool = Arc::new(ProbePool::new(FailureMode::Connect));
        let monitor = monitor_with(pool.clone(), fast_config());

        let recovered = monitor.attempt_connection_recovery(&descriptor()).await;
        assert!(!recovered);
        assert_eq!(pool.acquire_count(), 3);
    }

    #[tokio::test]
    async fn test_sweep_probes_only_monitored_connections() {
        let pool = Arc::new(ProbePool::new(FailureMode::None));
        let monitor = monitor_with(pool.clone(), fast_config());

        let watched = descriptor();
        let unwatched = ConnectionDescriptor::new("mysql", "db2", 3306, "other");
        monitor.start_monitoring(&watched);
        // Probe the unwatched one once so a record exists, then leave it unmonitored
        monitor.check_connection_health(&unwatched).await;

        let before = pool.acquire_count();
        monitor.sweep_once().await;
        assert_eq!(pool.acquire_count(), before + 1);
    }

    #[tokio::test]
    async fn test_stop_monitoring_excludes_from_sweep() {
        let pool = Arc::new(ProbePool::new(FailureMode::None));
        let monitor = monitor_with(pool.clone(), fast_config());
        let desc = descriptor();

        monitor.start_monitoring(&desc);
        monitor.stop_monitoring(&desc.cache_key());
        monitor.sweep_once().await;
        assert_eq!(pool.acquire_count(), 0);
    }

    #[tokio::test]
    async fn test_cleanup_drops_unmonitored_stale_records() {
        let pool = Arc::new(ProbePool::new(FailureMode::None));
        let monitor = monitor_with(
            pool,
            fast_config().with_retention(Duration::ZERO),
        );
        let desc = descriptor();

        monitor.start_monitoring(&desc);
        monitor.check_connection_health(&desc).await;

        // Monitored records survive regardless of age
        monitor.cleanup_stale_once();
        assert!(monitor.snapshot(&desc.cache_key()).is_some());

        monitor.stop_monitoring(&desc.cache_key());
        monitor.cleanup_stale_once();
        assert!(monitor.snapshot(&desc.cache_key()).is_none());
    }

    #[tokio::test]
    async fn test_cleanup_tolerates_concurrent_record_insertion() {
        let pool = Arc::new(ProbePool::new(FailureMode::None));
        // Zero retention: every unmonitored record is stale the moment it
        // is written, so cleanup and the probe loop contend on the map.
        let monitor = Arc::new(monitor_with(
            pool,
            fast_config().with_retention(Duration::ZERO),
        ));

        let prober = {
            let monitor = monitor.clone();
            tokio::spawn(async move {
                for port in 0..50u16 {
                    let desc = ConnectionDescriptor::new("mysql", "db1", port, "app");
                    monitor.check_connection_health(&desc).await;
                }
            })
        };
        for _ in 0..50 {
            monitor.cleanup_stale_once();
            tokio::task::yield_now().await;
        }
        prober.await.unwrap();

        monitor.cleanup_stale_once();
        assert!(monitor.health_summary().is_empty());
    }

    #[tokio::test]
    async fn test_is_connection_healthy_pre_flight_gate() {
        let pool = Arc::new(ProbePool::new(FailureMode::None));
        let monitor = monitor_with(pool, fast_config());
        let desc = descriptor();

        // Unknown connections are not assumed healthy
        assert!(!monitor.is_connection_healthy(&desc.cache_key()));

        monitor.check_connection_health(&desc).await;
        assert!(monitor.is_connection_healthy(&desc.cache_key()));
    }

    #[tokio::test]
    async fn test_health_summary_covers_all_records() {
        let pool = Arc::new(ProbePool::new(FailureMode::None));
        let monitor = monitor_with(pool, fast_config());

        monitor
            .check_connection_health(&ConnectionDescriptor::new("mysql", "a", 1, "x"))
            .await;
        monitor
            .check_connection_health(&ConnectionDescriptor::new("mysql", "b", 2, "y"))
            .await;
        assert_eq!(monitor.health_summary().len(), 2);
    }
}
