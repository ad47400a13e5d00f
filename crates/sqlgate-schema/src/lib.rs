//! Schema discovery with time-bounded caching
//!
//! Produces the list of databases, schemas, tables, and columns reachable
//! through a connection, bounding resource use with enumeration caps and
//! reusing recent results through a TTL cache keyed at database level.

mod cache;
mod discovery;

pub use cache::SchemaCache;
pub use discovery::{
    DatabaseDiscovery, DiscoveryConfig, DiscoveryHandle, SchemaDiscovery,
};
