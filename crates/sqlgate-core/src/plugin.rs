//! Dialect plugin trait definition

use std::borrow::Cow;
use std::collections::HashMap;

/// How a dialect enumerates its namespaces during schema discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumerationStrategy {
    /// Databases are catalogs, schemas live under them (MySQL family)
    Catalog,
    /// Databases are schemas at the top level (Oracle-ish engines)
    Schema,
    /// Try catalogs first, fall back to schemas
    Generic,
}

/// A single driver configuration carried by a plugin.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Driver name shown to callers (e.g., "MySQL Connector/J compatible")
    pub name: Cow<'static, str>,
    /// Connection URL template with `{host}`/`{port}`/`{database}` slots
    pub url_template: Cow<'static, str>,
    /// Default parameters merged under caller-supplied ones
    pub default_params: HashMap<String, String>,
}

impl DriverConfig {
    pub fn new(name: &'static str, url_template: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            url_template: Cow::Borrowed(url_template),
            default_params: HashMap::new(),
        }
    }

    pub fn with_param(mut self, key: &str, value: &str) -> Self {
        self.default_params
            .insert(key.to_string(), value.to_string());
        self
    }
}

/// Capabilities a dialect may support.
///
/// Consulted by the optimizer chain and schema discovery; a capability left
/// false simply skips the feature rather than failing.
#[derive(Debug, Clone, Default)]
pub struct DialectCapabilities {
    /// Supports a trailing LIMIT clause on SELECT
    pub supports_limit_clause: bool,
    /// Supports USE INDEX style hints after a table name
    pub supports_index_hints: bool,
    /// Supports a STRAIGHT_JOIN join-order directive
    pub supports_straight_join: bool,
    /// Has schemas (namespaces) below the database level
    pub supports_schemas: bool,
    /// Has catalogs above the schema level
    pub supports_catalogs: bool,
}

/// A per-database-type plugin: everything the engine needs to connect to and
/// introspect one kind of database.
///
/// Plugins are immutable after registry load and looked up by identifier.
pub trait DialectPlugin: Send + Sync {
    /// Unique identifier; the registry indexes the upper-cased form.
    fn id(&self) -> &str;

    /// Human-readable name
    fn display_name(&self) -> &str {
        self.id()
    }

    /// Driver configurations available for this dialect
    fn driver_configs(&self) -> Vec<DriverConfig>;

    /// The configuration used when the caller does not pick one.
    /// Defaults to the first entry of `driver_configs`.
    fn default_driver_config(&self) -> Option<DriverConfig> {
        self.driver_configs().into_iter().next()
    }

    /// Trivial liveness-probe statement for health checking
    fn probe_statement(&self) -> &str {
        "SELECT 1"
    }

    /// Namespace enumeration strategy used by schema discovery
    fn enumeration_strategy(&self) -> EnumerationStrategy {
        EnumerationStrategy::Generic
    }

    /// Feature support flags
    fn capabilities(&self) -> DialectCapabilities {
        DialectCapabilities::default()
    }

    /// Wrap a statement with limit/offset for pagination.
    ///
    /// The default covers LIMIT/OFFSET engines; dialects with other syntax
    /// override this.
    fn paginate(&self, sql: &str, limit: u64, offset: u64) -> String {
        format!("{} LIMIT {} OFFSET {}", sql, limit, offset)
    }
}

impl std::fmt::Debug for dyn DialectPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialectPlugin")
            .field("id", &self.id())
            .finish()
    }
}
