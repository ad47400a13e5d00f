//! Dialect-aware schema discovery
//!
//! Schema visibility is best-effort: every discovery call absorbs failures,
//! logs the cause, and returns an empty list so navigation consumers stay
//! usable when introspection partially fails.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use sqlgate_core::{
    ColumnInfo, Connection, ConnectionDescriptor, ConnectionPool, EnumerationStrategy,
    SqlGateError, TableInfo,
};
use sqlgate_registry::DialectRegistry;

use crate::cache::SchemaCache;

/// Discovery limits and cache lifetime
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Schema cache TTL
    pub cache_ttl: Duration,
    /// Per-schema table enumeration cap
    pub max_tables_per_schema: usize,
    /// Per-table column enumeration cap
    pub max_columns_per_table: usize,
    /// Databases covered by a single async discovery run
    pub async_database_limit: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(3600),
            max_tables_per_schema: 1000,
            max_columns_per_table: 500,
            async_database_limit: 5,
        }
    }
}

/// Aggregate produced by `discover_database_async`
#[derive(Debug, Clone, Default)]
pub struct DatabaseDiscovery {
    pub databases: Vec<String>,
    /// Schemas per database, covering at most the configured database limit
    pub schemas_by_database: HashMap<String, Vec<String>>,
}

/// Future handle for an async discovery run.
///
/// A failed task comes back as an error value; nothing propagates into the
/// scheduler.
pub struct DiscoveryHandle {
    handle: tokio::task::JoinHandle<DatabaseDiscovery>,
}

impl DiscoveryHandle {
    pub async fn wait(self) -> Result<DatabaseDiscovery, SqlGateError> {
        self.handle
            .await
            .map_err(|e| SqlGateError::Other(format!("discovery task failed: {e}")))
    }
}

/// Enumerates databases, schemas, tables, and columns for a connection.
pub struct SchemaDiscovery {
    registry: Arc<DialectRegistry>,
    pool: Arc<dyn ConnectionPool>,
    cache: SchemaCache,
    config: DiscoveryConfig,
}

impl SchemaDiscovery {
    pub fn new(registry: Arc<DialectRegistry>, pool: Arc<dyn ConnectionPool>) -> Self {
        Self::with_config(registry, pool, DiscoveryConfig::default())
    }

    pub fn with_config(
        registry: Arc<DialectRegistry>,
        pool: Arc<dyn ConnectionPool>,
        config: DiscoveryConfig,
    ) -> Self {
        Self {
            registry,
            pool,
            cache: SchemaCache::new(config.cache_ttl),
            config,
        }
    }

    /// Enumerate databases reachable through the descriptor.
    ///
    /// Dispatches on the dialect's enumeration strategy; the generic strategy
    /// tries catalogs first and falls back to schemas.
    pub async fn discover_databases(&self, descriptor: &ConnectionDescriptor) -> Vec<String> {
        let strategy = match self.registry.resolve(&descriptor.dialect) {
            Ok(plugin) => plugin.enumeration_strategy(),
            Err(e) => {
                tracing::warn!(error = %e, "database discovery skipped, dialect unresolved");
                return Vec::new();
            }
        };

        let conn = match self.pool.acquire(descriptor).await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(target = %descriptor.display_name(), error = %e, "database discovery failed to connect");
                return Vec::new();
            }
        };

        let databases = match Self::introspect(&conn) {
            Some(introspection) => match strategy {
                EnumerationStrategy::Catalog => introspection
                    .list_catalogs()
                    .await
                    .unwrap_or_else(|e| Self::absorb("catalog enumeration", &e)),
                EnumerationStrategy::Schema => introspection
                    .list_schemas(None)
                    .await
                    .unwrap_or_else(|e| Self::absorb("schema enumeration", &e)),
                EnumerationStrategy::Generic => match introspection.list_catalogs().await {
                    Ok(catalogs) if !catalogs.is_empty() => catalogs,
                    Ok(_) | Err(_) => introspection
                        .list_schemas(None)
                        .await
                        .unwrap_or_else(|e| Self::absorb("generic enumeration", &e)),
                },
            },
            None => {
                tracing::debug!(target = %descriptor.display_name(), "connection does not support introspection");
                Vec::new()
            }
        };

        self.pool.release(conn).await;
        databases
    }

    /// Enumerate schemas within a database, consulting the cache first.
    ///
    /// On a hit within the TTL the backing connection is never touched.
    /// On a miss, an empty schema listing falls back to catalogs-as-schemas,
    /// and the result is written back to the cache even when empty.
    pub async fn discover_schemas(
        &self,
        descriptor: &ConnectionDescriptor,
        database: &str,
    ) -> Vec<String> {
        let key = Self::database_cache_key(descriptor, database);
        if let Some(cached) = self.cache.get(&key) {
            return cached;
        }

        let conn = match self.pool.acquire(descriptor).await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(target = %descriptor.display_name(), error = %e, "schema discovery failed to connect");
                return Vec::new();
            }
        };

        let Some(introspection) = Self::introspect(&conn) else {
            self.pool.release(conn).await;
            return Vec::new();
        };

        let mut schemas = match introspection.list_schemas(Some(database)).await {
            Ok(schemas) => schemas,
            Err(e) => {
                tracing::warn!(database = %database, error = %e, "schema enumeration failed");
                self.pool.release(conn).await;
                return Vec::new();
            }
        };

        if schemas.is_empty() {
            // Catalog-only engines report no schemas; treat catalogs as schemas
            schemas = introspection
                .list_catalogs()
                .await
                .unwrap_or_else(|e| Self::absorb("catalogs-as-schemas fallback", &e));
        }

        self.pool.release(conn).await;
        self.cache.put(&key, schemas.clone());
        schemas
    }

    /// Enumerate tables, views, and materialized views in a schema, stopping
    /// at the configured cap.
    pub async fn discover_tables(
        &self,
        descriptor: &ConnectionDescriptor,
        database: &str,
        schema: &str,
    ) -> Vec<TableInfo> {
        let conn = match self.pool.acquire(descriptor).await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(target = %descriptor.display_name(), error = %e, "table discovery failed to connect");
                return Vec::new();
            }
        };

        let Some(introspection) = Self::introspect(&conn) else {
            self.pool.release(conn).await;
            return Vec::new();
        };

        let mut tables = introspection
            .list_tables(Some(database), Some(schema))
            .await
            .unwrap_or_else(|e| Self::absorb("table enumeration", &e));

        if tables.len() > self.config.max_tables_per_schema {
            tracing::warn!(
                schema = %schema,
                reported = tables.len(),
                cap = self.config.max_tables_per_schema,
                "table enumeration truncated at cap"
            );
            tables.truncate(self.config.max_tables_per_schema);
        }

        self.pool.release(conn).await;
        tables
    }

    /// Enumerate columns of a table, cross-referencing the primary-key
    /// enumeration to set primary-key flags.
    ///
    /// A primary-key enumeration failure degrades to "no flags set" rather
    /// than failing the call.
    pub async fn discover_columns(
        &self,
        descriptor: &ConnectionDescriptor,
        database: &str,
        schema: &str,
        table: &str,
    ) -> Vec<ColumnInfo> {
        let conn = match self.pool.acquire(descriptor).await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(target = %descriptor.display_name(), error = %e, "column discovery failed to connect");
                return Vec::new();
            }
        };

        let Some(introspection) = Self::introspect(&conn) else {
            self.pool.release(conn).await;
            return Vec::new();
        };

        let mut columns = introspection
            .list_columns(Some(database), Some(schema), table)
            .await
            .unwrap_or_else(|e| Self::absorb("column enumeration", &e));

        if columns.len() > self.config.max_columns_per_table {
            tracing::warn!(
                table = %table,
                reported = columns.len(),
                cap = self.config.max_columns_per_table,
                "column enumeration truncated at cap"
            );
            columns.truncate(self.config.max_columns_per_table);
        }

        match introspection
            .primary_key_columns(Some(database), Some(schema), table)
            .await
        {
            Ok(pk_columns) => {
                for column in &mut columns {
                    column.primary_key = pk_columns.contains(&column.name);
                }
            }
            Err(e) => {
                tracing::warn!(table = %table, error = %e, "primary key enumeration failed, leaving flags unset");
            }
        }

        self.pool.release(conn).await;
        columns
    }

    /// Orchestrate database and schema discovery without blocking the caller.
    ///
    /// Schema discovery covers only the first `async_database_limit`
    /// databases to bound total work.
    pub fn discover_database_async(self: &Arc<Self>, descriptor: ConnectionDescriptor) -> DiscoveryHandle {
        let discovery = self.clone();
        let handle = tokio::spawn(async move {
            let databases = discovery.discover_databases(&descriptor).await;
            let mut schemas_by_database = HashMap::new();
            for database in databases.iter().take(discovery.config.async_database_limit) {
                let schemas = discovery.discover_schemas(&descriptor, database).await;
                schemas_by_database.insert(database.clone(), schemas);
            }
            tracing::info!(
                target = %descriptor.display_name(),
                databases = databases.len(),
                covered = schemas_by_database.len(),
                "async discovery completed"
            );
            DatabaseDiscovery {
                databases,
                schemas_by_database,
            }
        });
        DiscoveryHandle { handle }
    }

    /// Sweep expired cache entries.
    pub fn clean_expired_cache(&self) {
        self.cache.clean_expired();
    }

    /// Number of entries currently held by the cache.
    pub fn cached_entry_count(&self) -> usize {
        self.cache.len()
    }

    fn database_cache_key(descriptor: &ConnectionDescriptor, database: &str) -> String {
        format!(
            "{}:{}:{}:{}",
            descriptor.dialect.to_uppercase(),
            descriptor.host,
            descriptor.port,
            database
        )
    }

    fn introspect(conn: &Arc<dyn Connection>) -> Option<&dyn sqlgate_core::SchemaIntrospection> {
        conn.as_introspection()
    }

    fn absorb<T>(step: &str, error: &SqlGateError) -> Vec<T> {
        tracing::warn!(step = %step, error = %error, "discovery step failed, returning empty");
        Vec::new()
    }
}
