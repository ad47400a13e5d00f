//! Rolling per-connection health records

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use sqlgate_core::ConnectionDescriptor;

use crate::status::HealthStatus;

/// History entries kept per connection; oldest evicted first.
pub const HISTORY_CAP: usize = 10;

/// Outcome of a single probe round. Created once per probe, immutable after.
#[derive(Debug, Clone)]
pub struct HealthCheckResult {
    pub status: HealthStatus,
    pub connect_ok: bool,
    pub query_ok: bool,
    pub metadata_ok: bool,
    pub latency: Duration,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub checked_at: DateTime<Utc>,
}

impl HealthCheckResult {
    /// Result for a connection that could not be opened.
    pub fn connect_failure(error: String, latency: Duration) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            connect_ok: false,
            query_ok: false,
            metadata_ok: false,
            latency,
            errors: vec![error],
            warnings: Vec::new(),
            checked_at: Utc::now(),
        }
    }
}

/// Mutable interior of a record's non-atomic fields.
///
/// History append, last-result replacement, and the incremental latency mean
/// move together under one lock so a racing pair of probes for the same key
/// cannot interleave them.
struct RecordInner {
    last_result: Option<HealthCheckResult>,
    last_checked: Option<DateTime<Utc>>,
    history: VecDeque<HealthStatus>,
    mean_latency_ms: f64,
    mean_samples: u64,
}

/// Rolling health state for one connection key.
///
/// Mutated only by the health monitor; read by any caller. Counters are
/// atomic increments, `last_result` is last-writer-wins.
pub struct HealthRecord {
    pub descriptor: ConnectionDescriptor,
    monitored: AtomicBool,
    total_checks: AtomicU64,
    successful_checks: AtomicU64,
    inner: Mutex<RecordInner>,
}

impl HealthRecord {
    pub fn new(descriptor: ConnectionDescriptor) -> Self {
        Self {
            descriptor,
            monitored: AtomicBool::new(false),
            total_checks: AtomicU64::new(0),
            successful_checks: AtomicU64::new(0),
            inner: Mutex::new(RecordInner {
                last_result: None,
                last_checked: None,
                history: VecDeque::with_capacity(HISTORY_CAP),
                mean_latency_ms: 0.0,
                mean_samples: 0,
            }),
        }
    }

    pub fn is_monitored(&self) -> bool {
        self.monitored.load(Ordering::SeqCst)
    }

    pub fn set_monitored(&self, monitored: bool) {
        self.monitored.store(monitored, Ordering::SeqCst);
    }

    /// Fold a probe result into the record: history append (capped), atomic
    /// counter increments, incremental mean latency.
    pub fn observe(&self, result: HealthCheckResult) {
        self.total_checks.fetch_add(1, Ordering::SeqCst);
        if result.status.is_healthy() {
            self.successful_checks.fetch_add(1, Ordering::SeqCst);
        }

        let mut inner = self.inner.lock();
        inner.history.push_back(result.status);
        while inner.history.len() > HISTORY_CAP {
            inner.history.pop_front();
        }
        inner.mean_samples += 1;
        let latency_ms = result.latency.as_secs_f64() * 1000.0;
        inner.mean_latency_ms += (latency_ms - inner.mean_latency_ms) / inner.mean_samples as f64;
        inner.last_checked = Some(result.checked_at);
        inner.last_result = Some(result);
    }

    pub fn last_status(&self) -> HealthStatus {
        self.inner
            .lock()
            .last_result
            .as_ref()
            .map(|r| r.status)
            .unwrap_or_default()
    }

    pub fn last_checked(&self) -> Option<DateTime<Utc>> {
        self.inner.lock().last_checked
    }

    pub fn total_checks(&self) -> u64 {
        self.total_checks.load(Ordering::SeqCst)
    }

    pub fn successful_checks(&self) -> u64 {
        self.successful_checks.load(Ordering::SeqCst)
    }

    /// Read-only snapshot for callers.
    pub fn snapshot(&self, key: &str) -> HealthSnapshot {
        let inner = self.inner.lock();
        let total = self.total_checks();
        let successful = self.successful_checks();
        HealthSnapshot {
            key: key.to_string(),
            monitored: self.is_monitored(),
            last_status: inner
                .last_result
                .as_ref()
                .map(|r| r.status)
                .unwrap_or_default(),
            last_checked: inner.last_checked,
            history: inner.history.iter().copied().collect(),
            total_checks: total,
            successful_checks: successful,
            success_rate: if total == 0 {
                0.0
            } else {
                successful as f64 / total as f64
            },
            average_latency_ms: inner.mean_latency_ms,
        }
    }
}

/// Point-in-time view of a health record
#[derive(Debug, Clone)]
pub struct HealthSnapshot {
    pub key: String,
    pub monitored: bool,
    pub last_status: HealthStatus,
    pub last_checked: Option<DateTime<Utc>>,
    pub history: Vec<HealthStatus>,
    pub total_checks: u64,
    pub successful_checks: u64,
    pub success_rate: f64,
    pub average_latency_ms: f64,
}
