//! `crudgen`: the code generator CLI.
//!
//! Runs generations, lists and rolls back history, and inspects the
//! business database, all against the project described by a
//! `crudgen.toml`.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// CRUD code generator.
#[derive(Parser, Debug)]
#[command(name = "crudgen", about = "Schema-driven CRUD code generator")]
struct Cli {
    /// Path to the generator config file.
    #[arg(long = "config", global = true, default_value = "crudgen.toml")]
    config: PathBuf,

    /// Output format: table or json.
    #[arg(long = "output", short = 'o', global = true, default_value = "table")]
    output: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate artifacts from a request file (JSON).
    Generate {
        /// Request file; `-` reads stdin.
        #[arg(short = 'f', long = "file")]
        file: String,
    },

    /// List generation history, newest first.
    History {
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long = "page-size", default_value_t = 10)]
        page_size: usize,
    },

    /// Delete a history record. Generated files are kept.
    #[command(name = "delete-history")]
    DeleteHistory { id: u64 },

    /// Roll back a recorded generation.
    Rollback {
        id: u64,
        /// Delete the generated files.
        #[arg(long)]
        files: bool,
        /// Remove the route registration.
        #[arg(long)]
        api: bool,
        /// Remove the menu entry.
        #[arg(long)]
        menu: bool,
        /// Drop the database table (requires --confirm-table).
        #[arg(long)]
        table: bool,
        /// Table name, repeated to confirm --table.
        #[arg(long = "confirm-table")]
        confirm_table: Option<String>,
    },

    /// List database tables.
    Tables,

    /// List the columns of a table.
    Columns { table: String },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let json = match cli.output.as_str() {
        "json" => true,
        "table" => false,
        other => anyhow::bail!("Unknown output format: {} (expected table or json)", other),
    };
    let app = commands::App::open(&cli.config)?;

    match cli.command {
        Commands::Generate { file } => commands::generate::generate(&app, &file, json)?,
        Commands::History { page, page_size } => {
            commands::history::list(&app, page, page_size, json)?
        }
        Commands::DeleteHistory { id } => commands::history::delete(&app, id)?,
        Commands::Rollback {
            id,
            files,
            api,
            menu,
            table,
            confirm_table,
        } => {
            let flags = crudgen_engine::RollbackFlags {
                delete_files: files,
                delete_api: api,
                delete_menu: menu,
                delete_table: table,
                confirm_table,
            };
            commands::history::rollback(&app, id, &flags, json)?
        }
        Commands::Tables => commands::schema::tables(&app, json)?,
        Commands::Columns { table } => commands::schema::columns(&app, &table, json)?,
    }

    Ok(())
}
