pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::watcher::parse_interval;

/// One ingestion pass.
#[derive(Parser)]
#[command(name = "shelfsync")]
#[command(about = "Copy reading-list articles into the tablet's document store", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/shelfsync/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Document store directory for this run
    #[arg(long)]
    pub store_dir: Option<PathBuf>,

    /// Articles to convert (default: max_articles from the config)
    #[arg(short = 'n', long)]
    pub max_articles: Option<usize>,
}

/// Watches the reload marker.
#[derive(Parser)]
#[command(name = "shelfsync-reload")]
#[command(about = "Restart shelfsync once the reload marker is removed", long_about = None)]
pub struct ReloadCli {
    /// Config file (default: ~/.config/shelfsync/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Document store directory to watch
    #[arg(long, global = true)]
    pub store_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<ReloadAction>,
}

#[derive(Subcommand)]
pub enum ReloadAction {
    /// Start watching (the default)
    Start {
        /// Check interval (e.g., "10s", "1m")
        #[arg(short, long, value_parser = parse_interval)]
        interval: Option<u64>,
    },
    /// Stop the running watcher
    Stop,
    /// Check watcher status
    Status,
}
