//! sqlgate-engine - SQL execution with cross-cutting features
//!
//! Wraps raw statement execution with:
//! - a bounded, TTL-limited result cache keyed by statement text
//! - a fixed optimizer chain (index hints, limit, join ordering)
//! - transactional batches with rollback on first failure
//! - count-wrapped pagination
//! - a fixed worker pool for asynchronous dispatch
//! - per-statement metrics, successes and failures alike

pub mod cache;
pub mod dispatch;
pub mod engine;
pub mod metrics;
pub mod optimizer;
pub mod options;
pub mod result;

#[cfg(test)]
mod test_helpers;

pub use dispatch::{AsyncExecutor, ExecutionHandle};
pub use engine::{EngineConfig, ExecutionEngine};
pub use metrics::{MetricsStore, QueryMetric};
pub use optimizer::{OptimizerChain, QueryOptimizer};
pub use options::ExecutionOptions;
pub use result::{BatchResult, BatchStatementResult, ExecutionResult, PageRequest, PageResult};
