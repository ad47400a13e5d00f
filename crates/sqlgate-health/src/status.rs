//! Health status classification
//!
//! Status is derived fresh on every probe, never sticky.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Health status of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Never probed
    Unknown,
    /// Connection opened and both probes succeeded within the latency budget
    Healthy,
    /// Connection opened but a probe failed
    Degraded,
    /// Probes finished but latency exceeded the slow threshold
    Slow,
    /// Connection could not be opened
    Unhealthy,
}

impl HealthStatus {
    /// Derive a status from one probe round.
    ///
    /// Slow wins over degraded: a connection past the latency threshold is
    /// reported SLOW even when a probe also failed.
    pub fn classify(
        connect_ok: bool,
        query_ok: bool,
        metadata_ok: bool,
        latency: Duration,
        slow_threshold: Duration,
    ) -> Self {
        if !connect_ok {
            HealthStatus::Unhealthy
        } else if latency > slow_threshold {
            HealthStatus::Slow
        } else if !(query_ok && metadata_ok) {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }

    /// Whether a pre-flight gate should allow execution.
    ///
    /// HEALTHY and SLOW both count as usable; SLOW is a latency warning, not
    /// an outage.
    pub fn is_usable(&self) -> bool {
        matches!(self, HealthStatus::Healthy | HealthStatus::Slow)
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }
}

impl Default for HealthStatus {
    fn default() -> Self {
        HealthStatus::Unknown
    }
}
