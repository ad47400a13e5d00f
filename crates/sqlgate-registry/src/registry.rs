//! Dialect registry: maps dialect identifiers to plugin behavior

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use sqlgate_core::{DialectPlugin, Result, SqlGateError};

/// A source of dialect plugins.
///
/// Discovery is an explicit registration step: providers are handed to the
/// registry at construction and enumerated on every `load`/`reload`.
pub trait PluginProvider: Send + Sync {
    fn plugins(&self) -> Vec<Arc<dyn DialectPlugin>>;
}

/// Provider wrapping the linked-in builtin plugin set.
pub struct BuiltinProvider;

impl PluginProvider for BuiltinProvider {
    fn plugins(&self) -> Vec<Arc<dyn DialectPlugin>> {
        vec![
            Arc::new(crate::builtin::MySqlPlugin),
            Arc::new(crate::builtin::PostgresPlugin),
            Arc::new(crate::builtin::SqlitePlugin),
            Arc::new(crate::builtin::H2Plugin),
            Arc::new(crate::builtin::MssqlPlugin),
        ]
    }
}

/// Registry configuration
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Dialects whose absence after load is logged as a warning
    pub essential_dialects: Vec<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            essential_dialects: vec!["MYSQL".to_string(), "POSTGRESQL".to_string()],
        }
    }
}

/// Point-in-time registry counts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryStatistics {
    pub plugin_count: usize,
    pub dialect_count: usize,
    pub driver_config_count: usize,
}

type PluginIndex = HashMap<String, Arc<dyn DialectPlugin>>;

/// Registry of dialect plugins.
///
/// The index is built once at `load` and rebuilt wholesale on `reload`:
/// a new index is constructed off to the side and swapped in atomically, so
/// concurrent readers observe either the old or the new fully-built index.
pub struct DialectRegistry {
    providers: Vec<Arc<dyn PluginProvider>>,
    config: RegistryConfig,
    index: RwLock<Arc<PluginIndex>>,
}

impl DialectRegistry {
    /// Create an unloaded registry over the given providers.
    pub fn new(providers: Vec<Arc<dyn PluginProvider>>, config: RegistryConfig) -> Self {
        Self {
            providers,
            config,
            index: RwLock::new(Arc::new(HashMap::new())),
        }
    }

    /// Create a registry over the builtin plugin set and load it.
    pub fn with_builtins() -> Self {
        let registry = Self::new(vec![Arc::new(BuiltinProvider)], RegistryConfig::default());
        registry.load();
        registry
    }

    /// Discover plugins from all providers and build the identifier index.
    ///
    /// A malformed plugin (empty identifier, duplicate identifier) is logged
    /// and skipped; load itself never fails. Missing essential dialects are
    /// warned about, not errors.
    pub fn load(&self) {
        let mut index: PluginIndex = HashMap::new();

        for provider in &self.providers {
            for plugin in provider.plugins() {
                let id = plugin.id().trim().to_uppercase();
                if id.is_empty() {
                    tracing::warn!("skipping dialect plugin with empty identifier");
                    continue;
                }
                if index.contains_key(&id) {
                    tracing::warn!(dialect = %id, "skipping duplicate dialect plugin");
                    continue;
                }
                tracing::info!(dialect = %id, name = %plugin.display_name(), "registering dialect plugin");
                index.insert(id, plugin);
            }
        }

        for essential in &self.config.essential_dialects {
            if !index.contains_key(&essential.to_uppercase()) {
                tracing::warn!(dialect = %essential, "essential dialect is not registered");
            }
        }

        tracing::info!(dialects = index.len(), "dialect registry loaded");
        *self.index.write() = Arc::new(index);
    }

    /// Clear and rebuild the index. Safe to call while other tasks resolve.
    pub fn reload(&self) {
        tracing::info!("reloading dialect registry");
        self.load();
    }

    /// Resolve a dialect identifier, case-insensitively.
    ///
    /// Returns the same plugin instance on every call until `reload`.
    pub fn resolve(&self, dialect: &str) -> Result<Arc<dyn DialectPlugin>> {
        let index = self.snapshot();
        match index.get(&dialect.to_uppercase()) {
            Some(plugin) => Ok(plugin.clone()),
            None => {
                let mut supported: Vec<String> = index.keys().cloned().collect();
                supported.sort();
                tracing::warn!(dialect = %dialect, "dialect not found in registry");
                Err(SqlGateError::UnsupportedDialect {
                    dialect: dialect.to_string(),
                    supported,
                })
            }
        }
    }

    /// Boolean probe; never fails.
    pub fn is_supported(&self, dialect: &str) -> bool {
        self.snapshot().contains_key(&dialect.to_uppercase())
    }

    /// List registered dialect identifiers, sorted.
    pub fn supported_dialects(&self) -> Vec<String> {
        let mut dialects: Vec<String> = self.snapshot().keys().cloned().collect();
        dialects.sort();
        dialects
    }

    /// Point-in-time counts over the current index.
    pub fn statistics(&self) -> RegistryStatistics {
        let index = self.snapshot();
        let driver_config_count = index
            .values()
            .map(|plugin| plugin.driver_configs().len())
            .sum();
        RegistryStatistics {
            plugin_count: index.len(),
            dialect_count: index.len(),
            driver_config_count,
        }
    }

    fn snapshot(&self) -> Arc<PluginIndex> {
        self.index.read().clone()
    }
}
