use tracing::info;

use crate::app::{AppContext, Result};
use crate::ingest::{IngestReport, IngestionPipeline};
use crate::sentinel::SentinelController;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The previous reload marker is still on the tablet; nothing was done.
    ReloadPending,
    Completed(IngestReport),
}

/// Run one pass: check the marker, make sure the folder exists, write a new
/// marker, then ingest up to `quota` articles.
pub async fn sync(ctx: &mut AppContext, quota: usize) -> Result<SyncOutcome> {
    let store = ctx.store.clone();
    let mut sentinel = SentinelController::new(store.as_ref(), &mut ctx.config, &ctx.config_path);

    if sentinel.reload_pending()? {
        info!("Reload marker still present, skipping this pass");
        return Ok(SyncOutcome::ReloadPending);
    }

    let folder = sentinel.ensure_target_folder()?;
    sentinel.write_sentinel()?;

    let report = IngestionPipeline::new(store.as_ref(), ctx.source.as_ref(), &ctx.renderer, &folder)
        .run(quota)
        .await?;
    Ok(SyncOutcome::Completed(report))
}
