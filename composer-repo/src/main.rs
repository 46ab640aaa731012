//! Standalone composer repository CLI
//!
//! Operates on a file-backed store: upload package documents, fold stored
//! documents into the indices, and print indices.

use anyhow::{Context, Result};
use bytes::Bytes;
use clap::{Parser, Subcommand};
use composer_repo::{FileStorage, Key, Name, Package, RepoConfig, Repository};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

#[derive(Parser)]
#[command(name = "composer-repo")]
#[command(about = "Composer repository index maintenance")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file
    #[arg(long, default_value = "composer-repo.json", global = true)]
    config: PathBuf,

    /// Data directory, overrides storage.data_dir from the configuration
    #[arg(long, global = true)]
    data: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a package document and add it to the indices
    Upload {
        /// Path to the package JSON document
        file: PathBuf,

        /// Storage key for the raw document (default: uploads/<name>-<version>.json)
        #[arg(long)]
        key: Option<String>,
    },

    /// Add a document already in the store to the indices
    Add {
        /// Storage key of the raw document
        key: String,
    },

    /// Print the global index, or one package's index
    Show {
        /// Package name (vendor/package)
        name: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _guard = composer_logging::init_subscriber();

    let cli = Cli::parse();

    let mut config = RepoConfig::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    if let Some(data) = cli.data {
        config.storage.data_dir = data;
    }
    debug!(data_dir = %config.storage.data_dir.display(), "Using data directory");

    let storage = Arc::new(FileStorage::new(&config.storage.data_dir));
    let repo = Repository::with_config(storage, &config)?;

    match cli.command {
        Commands::Upload { file, key } => {
            let content = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let key = match key {
                Some(key) => parse_key(&key)?,
                None => upload_key(&content, config.limits.max_document_size)?,
            };
            let added = repo.publish(&key, Bytes::from(content)).await?;
            println!(
                "Added {} {} ({} -> {}, {})",
                added.name,
                added.version.as_deref().unwrap_or("(no version)"),
                key,
                added.global_key,
                added.package_key
            );
        }

        Commands::Add { key } => {
            let key = parse_key(&key)?;
            let added = repo.add(&key).await?;
            println!(
                "Added {} {} ({}, {})",
                added.name,
                added.version.as_deref().unwrap_or("(no version)"),
                added.global_key,
                added.package_key
            );
        }

        Commands::Show { name } => {
            let packages = match name {
                Some(name) => repo.packages_of(&Name::new(name)?).await?,
                None => repo.packages().await?,
            };
            let bytes = packages.to_bytes()?;
            println!("{}", String::from_utf8_lossy(&bytes));
        }
    }

    Ok(())
}

fn parse_key(key: &str) -> Result<Key> {
    Key::new(key).with_context(|| format!("Invalid storage key '{key}'"))
}

/// Default upload key derived from the document's name and version
fn upload_key(content: &[u8], max_document_size: usize) -> Result<Key> {
    let pack = Package::from_slice_with_limit(content, max_document_size)?;
    let key = match pack.version() {
        Some(version) => format!("uploads/{}-{version}.json", pack.name()),
        None => format!("uploads/{}.json", pack.name()),
    };
    parse_key(&key)
}
