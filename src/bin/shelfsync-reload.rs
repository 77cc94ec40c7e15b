use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use shelfsync::cli::{ReloadAction, ReloadCli};
use shelfsync::config::Config;
use shelfsync::watcher::{self, Watcher};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = ReloadCli::parse();

    match cli.command.unwrap_or(ReloadAction::Start { interval: None }) {
        ReloadAction::Start { interval } => {
            let config_path = match cli.config {
                Some(path) => path,
                None => Config::default_config_path()?,
            };
            Watcher::new(config_path, cli.store_dir, interval).run().await?;
        }
        ReloadAction::Stop => {
            watcher::stop_watcher()?;
            println!("Watcher stopped");
        }
        ReloadAction::Status => {
            println!("{}", watcher::watcher_status());
        }
    }

    Ok(())
}
