//! Dialect plugin registry for sqlgate
//!
//! Resolves a database-type identifier to the driver behavior needed to
//! connect to and introspect that kind of database. Plugins are registered
//! through `PluginProvider` implementations at construction; `load` builds
//! the index and `reload` rebuilds it with an atomic swap.

pub mod builtin;
mod registry;

pub use registry::{
    BuiltinProvider, DialectRegistry, PluginProvider, RegistryConfig, RegistryStatistics,
};
