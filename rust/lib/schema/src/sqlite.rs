use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;

use crudgen_codegen::{ColumnInfo, TableInfo};

use crate::error::SchemaError;
use crate::traits::SchemaCatalog;

/// SqliteCatalog is a SchemaCatalog backed by rusqlite (bundled SQLite).
///
/// SQLite has no table or column comments; those fields are left empty.
pub struct SqliteCatalog {
    conn: Mutex<Connection>,
}

impl SqliteCatalog {
    /// Open or create a SQLite database at the given path.
    pub fn open(path: &Path) -> Result<Self, SchemaError> {
        let conn = Connection::open(path).map_err(|e| SchemaError::Connection(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite database (useful for tests).
    pub fn open_in_memory() -> Result<Self, SchemaError> {
        let conn =
            Connection::open_in_memory().map_err(|e| SchemaError::Connection(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run raw DDL/DML. Used to seed databases in tests and tooling.
    pub fn execute_batch(&self, sql: &str) -> Result<(), SchemaError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| SchemaError::Execution(e.to_string()))?;
        conn.execute_batch(sql)
            .map_err(|e| SchemaError::Execution(e.to_string()))
    }

    fn table_exists(conn: &Connection, table: &str) -> Result<bool, SchemaError> {
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [table],
                |row| row.get(0),
            )
            .map_err(|e| SchemaError::Query(e.to_string()))?;
        Ok(count > 0)
    }
}

/// Quote an identifier for interpolation into SQL.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

impl SchemaCatalog for SqliteCatalog {
    fn list_tables(&self) -> Result<Vec<TableInfo>, SchemaError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| SchemaError::Query(e.to_string()))?;
        let mut stmt = conn
            .prepare(
                "SELECT name FROM sqlite_master \
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
            )
            .map_err(|e| SchemaError::Query(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| SchemaError::Query(e.to_string()))?;

        let mut tables = Vec::new();
        for row in rows {
            tables.push(TableInfo {
                table_name: row.map_err(|e| SchemaError::Query(e.to_string()))?,
                table_comment: String::new(),
            });
        }
        Ok(tables)
    }

    fn list_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, SchemaError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| SchemaError::Query(e.to_string()))?;
        if !Self::table_exists(&conn, table)? {
            return Err(SchemaError::TableNotFound(table.to_string()));
        }

        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({})", quote_ident(table)))
            .map_err(|e| SchemaError::Query(e.to_string()))?;
        // cid, name, type, notnull, dflt_value, pk
        let rows = stmt
            .query_map([], |row| {
                let name: String = row.get(1)?;
                let data_type: String = row.get(2)?;
                let not_null: i64 = row.get(3)?;
                let pk: i64 = row.get(5)?;
                Ok(ColumnInfo {
                    column_name: name,
                    data_type: data_type.to_ascii_lowercase(),
                    comment: String::new(),
                    nullable: not_null == 0 && pk == 0,
                    key_flag: if pk > 0 { "PRI".to_string() } else { String::new() },
                })
            })
            .map_err(|e| SchemaError::Query(e.to_string()))?;

        let mut columns = Vec::new();
        for row in rows {
            columns.push(row.map_err(|e| SchemaError::Query(e.to_string()))?);
        }
        Ok(columns)
    }

    fn drop_table(&self, table: &str) -> Result<(), SchemaError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| SchemaError::Execution(e.to_string()))?;
        if !Self::table_exists(&conn, table)? {
            return Err(SchemaError::TableNotFound(table.to_string()));
        }
        conn.execute_batch(&format!("DROP TABLE {}", quote_ident(table)))
            .map_err(|e| SchemaError::Execution(e.to_string()))?;
        tracing::info!(table, "dropped table");
        Ok(())
    }
}
