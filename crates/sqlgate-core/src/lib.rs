//! sqlgate-core - Core abstractions for the sqlgate connectivity layer
//!
//! This crate provides the traits and types the other sqlgate crates depend
//! on:
//!
//! - `DialectPlugin` - Per-database-type driver behavior
//! - `Connection` - Trait for live database connections
//! - `ConnectionPool` - Collaborator contract that hands out connections
//! - `SchemaIntrospection` - Trait for catalog/schema/table/column listing
//! - Common types like `Value`, `Row`, `QueryResult`, `ConnectionDescriptor`

mod cache;
mod connection;
mod descriptor;
mod error;
mod introspect;
mod plugin;
mod pool;
mod types;

pub use cache::*;
pub use connection::*;
pub use descriptor::*;
pub use error::*;
pub use introspect::*;
pub use plugin::*;
pub use pool::*;
pub use types::*;
