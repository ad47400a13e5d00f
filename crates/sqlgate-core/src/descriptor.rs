//! Connection descriptors and cache keys

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The set of fields identifying a logical connection target.
///
/// Descriptors are supplied by the caller per operation; this layer only
/// derives cache and health keys from them and never stores the decrypted
/// credential beyond the call stack of a single operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionDescriptor {
    /// Dialect identifier (matched case-insensitively against the registry)
    pub dialect: String,
    /// Host address (empty for file-based databases)
    pub host: String,
    /// Port number (0 for default or file-based)
    pub port: u16,
    /// Database name or file path
    pub database: Option<String>,
    /// Username
    pub user: Option<String>,
    /// Credential, opaque/encrypted at rest
    pub credential: Option<String>,
    /// Display alias
    pub alias: Option<String>,
    /// Additional driver parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

impl ConnectionDescriptor {
    /// Create a descriptor for a server-based database.
    pub fn new(dialect: &str, host: &str, port: u16, database: &str) -> Self {
        Self {
            dialect: dialect.to_string(),
            host: host.to_string(),
            port,
            database: Some(database.to_string()),
            user: None,
            credential: None,
            alias: None,
            params: HashMap::new(),
        }
    }

    pub fn with_user(mut self, user: &str) -> Self {
        self.user = Some(user.to_string());
        self
    }

    pub fn with_credential(mut self, credential: &str) -> Self {
        self.credential = Some(credential.to_string());
        self
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.to_string());
        self
    }

    /// Deterministic composite key shared by the schema cache and health map.
    ///
    /// Keyed at database level: `DIALECT:host:port:database`. The schema name
    /// is deliberately not part of the key.
    pub fn cache_key(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.dialect.to_uppercase(),
            self.host,
            self.port,
            self.database.as_deref().unwrap_or("")
        )
    }

    /// Name used in log lines: the alias when set, otherwise the cache key.
    pub fn display_name(&self) -> String {
        self.alias.clone().unwrap_or_else(|| self.cache_key())
    }
}
