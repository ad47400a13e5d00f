//! sqlgate-health - Connection health assessment
//!
//! Probes connections (connect, dialect-specific probe query, metadata),
//! keeps rolling per-connection records, periodically sweeps monitored
//! connections on a budget, and drives bounded automatic recovery with
//! linear backoff.

pub mod monitor;
pub mod record;
pub mod status;

pub use monitor::{HealthConfig, HealthMonitor, HealthMonitorJobs, HealthProbeHandle};
pub use record::{HealthCheckResult, HealthRecord, HealthSnapshot};
pub use status::HealthStatus;
