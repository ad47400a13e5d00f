//! Connection pool collaborator contract

use crate::{Connection, ConnectionDescriptor, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Hands out authenticated connections for a descriptor.
///
/// Implemented by an external collaborator; this layer only consumes it.
/// Pool exhaustion must surface as `SqlGateError::PoolExhausted`, which the
/// execution engine propagates unmodified.
#[async_trait]
pub trait ConnectionPool: Send + Sync {
    /// Acquire a connection the caller owns until `release`.
    async fn acquire(&self, descriptor: &ConnectionDescriptor) -> Result<Arc<dyn Connection>>;

    /// Return a connection to the pool.
    async fn release(&self, connection: Arc<dyn Connection>);
}
