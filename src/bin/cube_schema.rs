//! Cube Schema CLI
//!
//! List, show, create, update and delete the cubes of a schema file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use cube_schemas::{CubeSummary, SchemaDocumentStore, SchemaError, StoreConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cube-schema")]
#[command(about = "Manage the cubes of a Mondrian schema file")]
struct Cli {
    /// Schema file (overrides the configured path)
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Config file to load (optional)
    #[arg(short, long)]
    config: Option<String>,

    /// Write even if the file changed since it was read
    #[arg(long)]
    force: bool,

    /// Print listings and summaries as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all cubes in document order
    List,

    /// Print the whole schema file in canonical form
    Show,

    /// Print one cube's XML
    Get {
        /// Cube name (case-sensitive)
        name: String,
    },

    /// Create a cube from a JSON payload
    Create {
        /// JSON file with the cube definition
        payload: PathBuf,
    },

    /// Replace an existing cube with a JSON payload
    Update {
        /// Name of the cube to replace
        name: String,
        /// JSON file with the new cube definition
        payload: PathBuf,
    },

    /// Delete a cube
    Delete {
        /// Cube name (case-sensitive)
        name: String,
    },

    /// Replace the whole schema file with another XML file
    Replace {
        /// XML file to install
        source: PathBuf,
    },

    /// Show the effective configuration as TOML
    Config {
        /// Write the defaults to this path instead
        #[arg(long)]
        init: Option<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = StoreConfig::load_from(cli.config.as_deref()).context("loading configuration")?;
    let mut store = SchemaDocumentStore::from_config(&config);
    if let Some(file) = cli.file {
        store = SchemaDocumentStore::new(file).with_verify_unchanged(config.document.verify_unchanged);
    }
    if cli.force {
        store = store.with_verify_unchanged(false);
    }

    match cli.command {
        Commands::List => {
            let cubes = store.list_cubes()?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&cubes)?);
            } else {
                println!("Found {} cube(s) in {}", cubes.len(), store.path().display());
                for name in cubes {
                    println!("  {}", name);
                }
            }
        }

        Commands::Show => {
            print!("{}", store.read_document()?);
        }

        Commands::Get { name } => {
            println!("{}", store.get_cube(&name)?);
        }

        Commands::Create { payload } => {
            let payload = read_payload(&payload)?;
            let summary = store.create_cube(&payload)?;
            report("created", &summary, cli.json)?;
        }

        Commands::Update { name, payload } => {
            let payload = read_payload(&payload)?;
            let summary = store.update_cube(&name, &payload)?;
            report("updated", &summary, cli.json)?;
        }

        Commands::Delete { name } => {
            store.delete_cube(&name)?;
            println!("Cube '{}' deleted", name);
        }

        Commands::Replace { source } => {
            let text = fs::read_to_string(&source)
                .with_context(|| format!("reading {}", source.display()))?;
            let cubes = store.replace_document(&text)?;
            println!("Installed {} with {} cube(s)", source.display(), cubes.len());
        }

        Commands::Config { init } => match init {
            Some(path) => {
                StoreConfig::default().save(&path)?;
                println!("Wrote default configuration to {}", path);
            }
            None => print!("{}", toml::to_string_pretty(&config)?),
        },
    }

    Ok(())
}

fn read_payload(path: &Path) -> anyhow::Result<serde_json::Value> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&text).map_err(|e| SchemaError::ValidationError {
        field_path: "$".to_string(),
        reason: format!("not valid JSON: {}", e),
    })?;
    Ok(value)
}

fn report(action: &str, summary: &CubeSummary, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }
    println!(
        "Cube '{}' {} (table {}, {} dimension(s), {} measure(s))",
        summary.cube_name,
        action,
        summary.table_name,
        summary.dimensions_count,
        summary.measures_count
    );
    Ok(())
}
