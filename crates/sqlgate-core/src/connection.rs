//! Connection trait

use crate::{QueryResult, Result, SchemaIntrospection, Value};
use async_trait::async_trait;
use std::time::Duration;

/// A live database connection.
///
/// A connection is never shared across concurrent operations by this layer:
/// each call is handed a connection it owns for the duration of that call
/// only (the pool collaborator enforces this).
#[async_trait]
pub trait Connection: Send + Sync {
    /// Get the dialect identifier (e.g., "mysql", "postgresql")
    fn dialect(&self) -> &str;

    /// Execute SQL and return the result.
    ///
    /// Used for both queries and DML; drivers populate `affected_rows` for
    /// statements that return no rows.
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult>;

    /// Execute a statement that modifies data, returning rows affected.
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64>;

    /// Whether the connection currently auto-commits each statement.
    fn auto_commit(&self) -> bool;

    /// Toggle auto-commit mode.
    async fn set_auto_commit(&self, enabled: bool) -> Result<()>;

    /// Commit the open transaction.
    async fn commit(&self) -> Result<()>;

    /// Roll back the open transaction.
    async fn rollback(&self) -> Result<()>;

    /// Set the driver-side statement timeout for subsequent statements.
    ///
    /// A zero duration clears the timeout. Drivers that cannot honor this
    /// may ignore it.
    async fn set_statement_timeout(&self, _timeout: Duration) -> Result<()> {
        Ok(())
    }

    /// Close the connection
    async fn close(&self) -> Result<()>;

    /// Check if the connection is closed
    fn is_closed(&self) -> bool;

    /// Get schema introspection interface if supported
    fn as_introspection(&self) -> Option<&dyn SchemaIntrospection> {
        None
    }
}
