//! Stowage CLI: compute storage paths, store files with their variants and
//! remove stored files.
//!
//! Configuration comes from `.env` and the `STOWAGE_*` environment variables
//! (`STOWAGE_CONFIG` points at a JSON configuration file).

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use stowage_cli::{init_tracing, FileOptions, Stowage};
use stowage_core::StowageConfig;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "stowage", about = "File storage with derived variants")]
struct Cli {
    /// Adapter to store to / remove from
    #[arg(long, global = true, default_value = "local")]
    adapter: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct FileArgs {
    /// UUID of the file, random when omitted
    #[arg(long)]
    uuid: Option<Uuid>,
    /// Owning model name
    #[arg(long)]
    model: Option<String>,
    /// Owning model id
    #[arg(long)]
    model_id: Option<String>,
    /// Collection name
    #[arg(long)]
    collection: Option<String>,
}

impl From<FileArgs> for FileOptions {
    fn from(args: FileArgs) -> Self {
        FileOptions {
            uuid: args.uuid,
            model: args.model,
            model_id: args.model_id,
            collection: args.collection,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print the storage path a file would get
    Path {
        /// File name or path
        file: String,
        #[command(flatten)]
        options: FileArgs,
        /// Print the path of this variant instead
        #[arg(long)]
        variant: Option<String>,
    },
    /// Store a local file and materialize its variants
    Store {
        /// Path to the file to store
        file: PathBuf,
        #[command(flatten)]
        options: FileArgs,
        /// Variant declarations as JSON:
        /// {"thumb": {"operations": [{"name": "resize", "arguments": {...}}], "optimize": true}}
        #[arg(long)]
        variants: Option<String>,
        /// Only process these variants
        #[arg(long)]
        only: Vec<String>,
    },
    /// Remove a stored file and its variants
    Remove {
        /// Storage path of the file
        #[arg(long)]
        path: String,
        /// Storage paths of the file's variants
        #[arg(long)]
        variant_path: Vec<String>,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = StowageConfig::from_env().context("Failed to load configuration")?;
    let stowage = Stowage::from_config(config)?;

    match cli.command {
        Commands::Path {
            file,
            options,
            variant,
        } => {
            let path = stowage.path(&file, &cli.adapter, &options.into(), variant.as_deref())?;
            print_json(&serde_json::json!({ "path": path }))?;
        }
        Commands::Store {
            file,
            options,
            variants,
            only,
        } => {
            let stored = stowage
                .store(&file, &cli.adapter, &options.into(), variants.as_deref(), &only)
                .await?;
            print_json(&stored.to_json())?;
        }
        Commands::Remove { path, variant_path } => {
            let removed = stowage.remove(&cli.adapter, &path, &variant_path).await?;
            print_json(&removed.to_json())?;
        }
    }

    Ok(())
}
