//! Catalog reading
//!
//! A [`CatalogReader`] answers one query per kind of catalog row. The rows
//! are gathered into a [`Catalog`] that the generator renders from.

use std::fs;
use std::path::Path;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::schema::types::{
    Catalog, Column, ForeignKeyColumn, IndexColumn, KeyColumn, SchemaObject, TableData,
};

/// Source of catalog metadata
#[async_trait]
pub trait CatalogReader: Send + Sync {
    /// User schema names
    async fn schemas(&self) -> Result<Vec<String>>;

    /// Tables, views, routines, triggers and table types
    async fn objects(&self) -> Result<Vec<SchemaObject>>;

    async fn columns(&self) -> Result<Vec<Column>>;

    async fn primary_keys(&self) -> Result<Vec<KeyColumn>>;

    async fn foreign_keys(&self) -> Result<Vec<ForeignKeyColumn>>;

    async fn indexes(&self) -> Result<Vec<IndexColumn>>;

    /// Rows of the named tables (`schema.name`)
    async fn table_data(&self, tables: &[String]) -> Result<Vec<TableData>>;

    /// Run every query concurrently and collect the results
    async fn read_catalog(&self, data_tables: &[String]) -> Result<Catalog> {
        let (schemas, objects, columns, primary_keys, foreign_keys, indexes, data) = futures::try_join!(
            self.schemas(),
            self.objects(),
            self.columns(),
            self.primary_keys(),
            self.foreign_keys(),
            self.indexes(),
            self.table_data(data_tables),
        )?;

        tracing::debug!(
            schemas = schemas.len(),
            objects = objects.len(),
            columns = columns.len(),
            tables_with_data = data.len(),
            "Read catalog"
        );

        Ok(Catalog {
            schemas,
            objects,
            columns,
            primary_keys,
            foreign_keys,
            indexes,
            data,
        })
    }
}

/// Catalog served from a JSON snapshot
#[derive(Debug, Clone, Default)]
pub struct SnapshotCatalog {
    catalog: Catalog,
}

impl SnapshotCatalog {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    /// Load a snapshot file written in the shape of [`Catalog`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!("Failed to read snapshot {}: {}", path.display(), e))
        })?;

        let catalog: Catalog = serde_json::from_str(&content).map_err(|e| {
            Error::ConfigError(format!("Failed to parse snapshot {}: {}", path.display(), e))
        })?;

        Ok(Self::new(catalog))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }
}

#[async_trait]
impl CatalogReader for SnapshotCatalog {
    async fn schemas(&self) -> Result<Vec<String>> {
        Ok(self.catalog.schemas.clone())
    }

    async fn objects(&self) -> Result<Vec<SchemaObject>> {
        Ok(self.catalog.objects.clone())
    }

    async fn columns(&self) -> Result<Vec<Column>> {
        Ok(self.catalog.columns.clone())
    }

    async fn primary_keys(&self) -> Result<Vec<KeyColumn>> {
        Ok(self.catalog.primary_keys.clone())
    }

    async fn foreign_keys(&self) -> Result<Vec<ForeignKeyColumn>> {
        Ok(self.catalog.foreign_keys.clone())
    }

    async fn indexes(&self) -> Result<Vec<IndexColumn>> {
        Ok(self.catalog.indexes.clone())
    }

    async fn table_data(&self, tables: &[String]) -> Result<Vec<TableData>> {
        Ok(self
            .catalog
            .data
            .iter()
            .filter(|data| {
                let name = data.dotted_name();
                tables.iter().any(|table| table.eq_ignore_ascii_case(&name))
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::{DataValue, ObjectKind};
    use tempfile::tempdir;

    fn snapshot() -> SnapshotCatalog {
        SnapshotCatalog::new(Catalog {
            schemas: vec!["dbo".to_string()],
            objects: vec![SchemaObject::new(1, ObjectKind::Table, "dbo", "Users")],
            columns: vec![Column::new(1, "Id", "int")],
            data: vec![
                TableData {
                    schema: "dbo".to_string(),
                    name: "Users".to_string(),
                    columns: vec!["Id".to_string()],
                    rows: vec![vec![DataValue::Int(1)]],
                },
                TableData {
                    schema: "dbo".to_string(),
                    name: "Audit".to_string(),
                    columns: vec!["Id".to_string()],
                    rows: vec![],
                },
            ],
            ..Catalog::default()
        })
    }

    #[tokio::test]
    async fn test_read_catalog_keeps_only_requested_data() {
        let catalog = snapshot()
            .read_catalog(&["DBO.users".to_string()])
            .await
            .unwrap();

        assert_eq!(catalog.schemas, vec!["dbo".to_string()]);
        assert_eq!(catalog.objects.len(), 1);
        assert_eq!(catalog.columns.len(), 1);
        assert_eq!(catalog.data.len(), 1);
        assert_eq!(catalog.data[0].name, "Users");
    }

    #[test]
    fn test_load_rejects_malformed_snapshot() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        fs::write(&path, "[1, 2").unwrap();

        let err = SnapshotCatalog::load(&path).unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }
}
