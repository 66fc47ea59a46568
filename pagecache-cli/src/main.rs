//! PAGECACHE CLI
//!
//! Fetches pages through the tracked cache and reports request counts.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pagecache_service::{ServiceConfig, StoreBackend};

/// PAGECACHE - tracked, short-lived page caching
#[derive(Parser)]
#[command(name = "pagecache")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Store backend (memory, file, redis)
    #[arg(long, global = true, env = "PAGECACHE_STORE")]
    store: Option<StoreBackend>,

    /// Snapshot file for the file store
    #[arg(long, global = true, env = "PAGECACHE_STORE_PATH")]
    store_path: Option<PathBuf>,

    /// Redis server URL for the redis store
    #[arg(long, global = true, env = "REDIS_URL")]
    redis_url: Option<String>,

    /// Fetch timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Cached page lifetime in seconds
    #[arg(long, global = true)]
    ttl: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a page through the cache and print it
    Fetch {
        /// Resource identifier (URL)
        resource: String,
    },

    /// Print how many times a resource has been requested
    Count {
        /// Resource identifier (URL)
        resource: String,
    },
}

impl Cli {
    fn service_config(&self) -> Result<ServiceConfig> {
        let mut config = ServiceConfig::from_env().context("Invalid environment configuration")?;

        if let Some(store) = self.store {
            config.store = store;
        }
        if let Some(path) = &self.store_path {
            config.store_path = path.clone();
        }
        if let Some(url) = &self.redis_url {
            config.redis_url = url.clone();
        }
        if let Some(timeout) = self.timeout {
            config.http.timeout_seconds = timeout;
        }
        if let Some(ttl) = self.ttl {
            config.cache.result_ttl_seconds = ttl;
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; stdout is reserved for page content
    let filter = if cli.verbose {
        "pagecache=debug,info"
    } else {
        "pagecache=info,warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = cli.service_config()?;

    match &cli.command {
        Commands::Fetch { resource } => cmd_fetch(&config, resource).await,
        Commands::Count { resource } => cmd_count(&config, resource).await,
    }
}

/// Fetch a page and print it
async fn cmd_fetch(config: &ServiceConfig, resource: &str) -> Result<()> {
    let service = config.build().await.context("Failed to start page service")?;

    let page = service
        .fetch(resource)
        .await
        .with_context(|| format!("Failed to fetch {}", resource))?;

    print!("{}", page);
    Ok(())
}

/// Print the request count for a resource
async fn cmd_count(config: &ServiceConfig, resource: &str) -> Result<()> {
    let service = config.build().await.context("Failed to start page service")?;

    let count = service
        .request_count(resource)
        .await
        .with_context(|| format!("Failed to read count for {}", resource))?;

    if config.store == StoreBackend::Memory {
        eprintln!(
            "{}",
            "Note: the memory store starts empty on every run; use --store file or redis.".yellow()
        );
    }
    println!("{} {}", count.to_string().green().bold(), resource.dimmed());
    Ok(())
}
