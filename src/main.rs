use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use shelfsync::app::AppContext;
use shelfsync::cli::{commands, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut ctx = AppContext::load(cli.config, cli.store_dir)?;
    let quota = cli.max_articles.unwrap_or(ctx.config.max_articles);

    match commands::sync(&mut ctx, quota).await? {
        commands::SyncOutcome::ReloadPending => {
            println!("Reload marker still on the tablet, nothing to do");
        }
        commands::SyncOutcome::Completed(report) => {
            println!(
                "Done: {} added, {} skipped as unreadable, {} failed",
                report.processed, report.unrenderable, report.failed
            );
        }
    }

    Ok(())
}
