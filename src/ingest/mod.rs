//! One ingestion pass: list, filter, render, store, mark.

use tracing::{debug, info, warn};

use crate::app::Result;
use crate::domain::ArticleItem;
use crate::render::ContentRenderer;
use crate::source::ArticleSource;
use crate::store::Store;

/// Counters of a finished pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestReport {
    /// Items returned by the provider.
    pub listed: usize,
    /// Items skipped because they were handled before.
    pub skipped_handled: usize,
    /// Documents written and marked handled.
    pub processed: usize,
    /// Items that could not be rendered and were marked skipped.
    pub unrenderable: usize,
    /// Items rendered but not stored; left unmarked for the next pass.
    pub failed: usize,
}

enum Outcome {
    Processed,
    Unrenderable,
    Failed,
}

pub struct IngestionPipeline<'a, S: Store> {
    store: &'a S,
    source: &'a dyn ArticleSource,
    renderer: &'a ContentRenderer,
    target_folder: &'a str,
}

impl<'a, S: Store> IngestionPipeline<'a, S> {
    pub fn new(
        store: &'a S,
        source: &'a dyn ArticleSource,
        renderer: &'a ContentRenderer,
        target_folder: &'a str,
    ) -> Self {
        Self {
            store,
            source,
            renderer,
            target_folder,
        }
    }

    /// Process up to `quota` unhandled items.
    ///
    /// A failed listing aborts the pass. Per-item failures are recorded in
    /// the report and the pass moves on.
    pub async fn run(&self, quota: usize) -> Result<IngestReport> {
        let mut report = IngestReport::default();
        if quota == 0 {
            return Ok(report);
        }

        let items = self.source.list().await?;
        report.listed = items.len();
        info!("{} listed {} candidates", self.source.name(), items.len());

        for item in &items {
            if self.source.is_handled(item) {
                debug!("Skipping handled item {}", item.id);
                report.skipped_handled += 1;
                continue;
            }

            match self.ingest_one(item).await {
                Outcome::Processed => {
                    report.processed += 1;
                    println!("progress: {}/{}", report.processed, quota);
                    if report.processed >= quota {
                        break;
                    }
                }
                Outcome::Unrenderable => report.unrenderable += 1,
                Outcome::Failed => report.failed += 1,
            }
        }

        info!(
            "Pass finished: {} processed, {} unrenderable, {} failed",
            report.processed, report.unrenderable, report.failed
        );
        Ok(report)
    }

    async fn ingest_one(&self, item: &ArticleItem) -> Outcome {
        let rendered = match self.renderer.render(item, self.source).await {
            Ok(rendered) => rendered,
            Err(e) => {
                warn!("Cannot render {} ({}): {}", item.id, item.url, e);
                if let Err(e) = self.source.mark_skipped(item).await {
                    warn!("Failed to mark {} as skipped: {}", item.id, e);
                }
                return Outcome::Unrenderable;
            }
        };

        let name = item.file_name();
        let uuid = match self.store.create_document(
            &name,
            self.target_folder,
            rendered.file_type,
            &rendered.bytes,
        ) {
            Ok(uuid) => uuid,
            Err(e) => {
                warn!("Failed to store {}: {}", item.id, e);
                return Outcome::Failed;
            }
        };
        info!("Stored '{}' as {}", name, uuid);

        // The document exists now, so a failed mark only risks a duplicate later.
        if let Err(e) = self.source.mark_handled(item).await {
            warn!("Stored {} but failed to mark it handled: {}", item.id, e);
        }
        Outcome::Processed
    }
}
