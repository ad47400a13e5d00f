//! Schema introspection trait and info types

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Schema introspection interface exposed by connections that support it.
#[async_trait]
pub trait SchemaIntrospection: Send + Sync {
    /// List catalogs (databases) visible to the connection
    async fn list_catalogs(&self) -> Result<Vec<String>>;

    /// List schemas, optionally within a catalog
    async fn list_schemas(&self, catalog: Option<&str>) -> Result<Vec<String>>;

    /// List tables, views, and materialized views in a schema
    async fn list_tables(
        &self,
        catalog: Option<&str>,
        schema: Option<&str>,
    ) -> Result<Vec<TableInfo>>;

    /// Get columns for a table
    async fn list_columns(
        &self,
        catalog: Option<&str>,
        schema: Option<&str>,
        table: &str,
    ) -> Result<Vec<ColumnInfo>>;

    /// Get the names of the primary-key columns of a table
    async fn primary_key_columns(
        &self,
        catalog: Option<&str>,
        schema: Option<&str>,
        table: &str,
    ) -> Result<Vec<String>>;
}

/// Table type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableType {
    Table,
    View,
    MaterializedView,
    System,
}

/// Table information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableInfo {
    pub schema: Option<String>,
    pub name: String,
    pub table_type: TableType,
    pub comment: Option<String>,
}

/// Column information as reported by the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    /// 1-based position within the table
    pub ordinal: usize,
    pub auto_increment: bool,
    pub default_value: Option<String>,
    /// Set by discovery after cross-referencing the primary-key enumeration
    #[serde(default)]
    pub primary_key: bool,
}
