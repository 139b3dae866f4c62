pub mod generate;
pub mod history;
pub mod schema;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;

use crudgen_engine::{FsWorkspace, Generator, GeneratorConfig};
use crudgen_history::RedbHistory;
use crudgen_schema::{SchemaCatalog, SqliteCatalog};

/// Everything a command needs, opened from the config file.
pub struct App {
    pub generator: Generator,
}

impl App {
    pub fn open(config_path: &Path) -> Result<Self> {
        let config = GeneratorConfig::load(config_path)?;
        tracing::debug!(config = %config_path.display(), root = %config.root.display(), "config loaded");

        let workspace = Arc::new(FsWorkspace::new(&config.root).with_trash(config.trash_dir()));

        let db_path = config.history_db_path();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let history = Arc::new(
            RedbHistory::open(&db_path)
                .map_err(|e| anyhow::anyhow!("failed to open history store: {}", e))?,
        );

        let sqlite_path = config.sqlite_path();
        let mut generator = Generator::new(config, workspace, history);
        if sqlite_path.exists() {
            let catalog = SqliteCatalog::open(&sqlite_path)
                .map_err(|e| anyhow::anyhow!("failed to open database: {}", e))?;
            generator = generator.with_catalog(Arc::new(catalog));
        }

        Ok(Self { generator })
    }

    pub fn catalog(&self) -> Result<&Arc<dyn SchemaCatalog>> {
        self.generator.catalog().ok_or_else(|| {
            anyhow::anyhow!(
                "No database found at {}. Set storage.sqlite in the config.",
                self.generator.config().sqlite_path().display()
            )
        })
    }
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
