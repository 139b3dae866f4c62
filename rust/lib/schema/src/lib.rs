pub mod error;
pub mod sqlite;
pub mod traits;

pub use error::SchemaError;
pub use sqlite::SqliteCatalog;
pub use traits::SchemaCatalog;
