use crudgen_codegen::{ColumnInfo, TableInfo};

use crate::error::SchemaError;

/// SchemaCatalog introspects the business database.
pub trait SchemaCatalog: Send + Sync {
    /// All user tables, sorted by name.
    fn list_tables(&self) -> Result<Vec<TableInfo>, SchemaError>;

    /// Columns of `table` in declaration order. Returns
    /// SchemaError::TableNotFound if the table does not exist.
    fn list_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, SchemaError>;

    /// Drop `table`. Returns SchemaError::TableNotFound if it does not exist.
    fn drop_table(&self, table: &str) -> Result<(), SchemaError>;
}
