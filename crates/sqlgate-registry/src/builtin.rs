//! Built-in dialect plugins
//!
//! Linked-in plugin set registered by the default provider. Each plugin
//! carries the probe statement, enumeration strategy, and capability flags
//! the rest of the system dispatches on.

use sqlgate_core::{
    DialectCapabilities, DialectPlugin, DriverConfig, EnumerationStrategy,
};

/// MySQL and MySQL-compatible engines
pub struct MySqlPlugin;

impl DialectPlugin for MySqlPlugin {
    fn id(&self) -> &str {
        "mysql"
    }

    fn display_name(&self) -> &str {
        "MySQL"
    }

    fn driver_configs(&self) -> Vec<DriverConfig> {
        vec![
            DriverConfig::new("mysql", "mysql://{host}:{port}/{database}")
                .with_param("connectTimeout", "10000"),
            DriverConfig::new("mariadb", "mariadb://{host}:{port}/{database}"),
        ]
    }

    fn enumeration_strategy(&self) -> EnumerationStrategy {
        EnumerationStrategy::Catalog
    }

    fn capabilities(&self) -> DialectCapabilities {
        DialectCapabilities {
            supports_limit_clause: true,
            supports_index_hints: true,
            supports_straight_join: true,
            supports_schemas: false,
            supports_catalogs: true,
        }
    }
}

/// PostgreSQL and Postgres-compatible engines
pub struct PostgresPlugin;

impl DialectPlugin for PostgresPlugin {
    fn id(&self) -> &str {
        "postgresql"
    }

    fn display_name(&self) -> &str {
        "PostgreSQL"
    }

    fn driver_configs(&self) -> Vec<DriverConfig> {
        vec![
            DriverConfig::new("postgresql", "postgresql://{host}:{port}/{database}")
                .with_param("connect_timeout", "10"),
        ]
    }

    fn enumeration_strategy(&self) -> EnumerationStrategy {
        EnumerationStrategy::Schema
    }

    fn capabilities(&self) -> DialectCapabilities {
        DialectCapabilities {
            supports_limit_clause: true,
            supports_index_hints: false,
            supports_straight_join: false,
            supports_schemas: true,
            supports_catalogs: true,
        }
    }
}

/// SQLite file-based databases
pub struct SqlitePlugin;

impl DialectPlugin for SqlitePlugin {
    fn id(&self) -> &str {
        "sqlite"
    }

    fn display_name(&self) -> &str {
        "SQLite"
    }

    fn driver_configs(&self) -> Vec<DriverConfig> {
        vec![DriverConfig::new("sqlite", "sqlite://{database}")]
    }

    fn enumeration_strategy(&self) -> EnumerationStrategy {
        EnumerationStrategy::Generic
    }

    fn capabilities(&self) -> DialectCapabilities {
        DialectCapabilities {
            supports_limit_clause: true,
            ..DialectCapabilities::default()
        }
    }
}

/// H2 embedded databases
pub struct H2Plugin;

impl DialectPlugin for H2Plugin {
    fn id(&self) -> &str {
        "h2"
    }

    fn display_name(&self) -> &str {
        "H2"
    }

    fn driver_configs(&self) -> Vec<DriverConfig> {
        vec![
            DriverConfig::new("h2-tcp", "h2:tcp://{host}:{port}/{database}"),
            DriverConfig::new("h2-mem", "h2:mem:{database}"),
        ]
    }

    fn enumeration_strategy(&self) -> EnumerationStrategy {
        EnumerationStrategy::Schema
    }

    fn capabilities(&self) -> DialectCapabilities {
        DialectCapabilities {
            supports_limit_clause: true,
            supports_schemas: true,
            supports_catalogs: true,
            ..DialectCapabilities::default()
        }
    }
}

/// Microsoft SQL Server
pub struct MssqlPlugin;

impl DialectPlugin for MssqlPlugin {
    fn id(&self) -> &str {
        "mssql"
    }

    fn display_name(&self) -> &str {
        "SQL Server"
    }

    fn driver_configs(&self) -> Vec<DriverConfig> {
        vec![DriverConfig::new(
            "mssql",
            "mssql://{host}:{port}/{database}",
        )]
    }

    fn probe_statement(&self) -> &str {
        "SELECT 1"
    }

    fn enumeration_strategy(&self) -> EnumerationStrategy {
        EnumerationStrategy::Catalog
    }

    fn capabilities(&self) -> DialectCapabilities {
        DialectCapabilities {
            supports_schemas: true,
            supports_catalogs: true,
            ..DialectCapabilities::default()
        }
    }

    // OFFSET/FETCH syntax; requires an ORDER BY upstream, which the engine's
    // pagination contract leaves to the caller's statement.
    fn paginate(&self, sql: &str, limit: u64, offset: u64) -> String {
        format!(
            "{} OFFSET {} ROWS FETCH NEXT {} ROWS ONLY",
            sql, offset, limit
        )
    }
}
