//! `crudgend`: the code generator server.
//!
//! Usage:
//!   crudgend [--config crudgen.toml] [--listen 0.0.0.0:8080]

mod error;
mod routes;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use crudgen_engine::{FsWorkspace, Generator, GeneratorConfig};
use crudgen_history::RedbHistory;
use crudgen_schema::SqliteCatalog;

use routes::AppState;

/// Code generator server.
#[derive(Parser, Debug)]
#[command(name = "crudgend", about = "CRUD code generator server")]
struct Cli {
    /// Path to the generator config file.
    #[arg(short = 'c', long = "config", default_value = "crudgen.toml")]
    config: PathBuf,

    /// Listen address.
    #[arg(long = "listen", default_value = "0.0.0.0:8080")]
    listen: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    info!("Loading configuration from {}", cli.config.display());
    let config = GeneratorConfig::load(&cli.config)?;
    info!("Project root: {}", config.root.display());

    let workspace = Arc::new(FsWorkspace::new(&config.root).with_trash(config.trash_dir()));

    let db_path = config.history_db_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let history = Arc::new(
        RedbHistory::open(&db_path)
            .map_err(|e| anyhow::anyhow!("failed to open history store: {}", e))?,
    );
    info!("History store at {}", db_path.display());

    let sqlite_path = config.sqlite_path();
    let mut generator = Generator::new(config, workspace, history);
    if sqlite_path.exists() {
        let catalog = SqliteCatalog::open(&sqlite_path)
            .map_err(|e| anyhow::anyhow!("failed to open database: {}", e))?;
        generator = generator.with_catalog(Arc::new(catalog));
        info!("Schema catalog at {}", sqlite_path.display());
    } else {
        info!(
            "No database at {}; table introspection disabled",
            sqlite_path.display()
        );
    }

    let app = routes::build_router(AppState {
        generator: Arc::new(generator),
    });

    let listener = tokio::net::TcpListener::bind(&cli.listen).await?;
    info!("crudgend listening on {}", cli.listen);
    axum::serve(listener, app).await?;

    Ok(())
}
