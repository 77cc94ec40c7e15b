//! Reading-list providers.
//!
//! A provider lists candidate articles, says which ones were already sent to
//! the tablet, hands out their content and records that they were handled.
//! The active provider is picked once from the settings by [`from_config`].

pub mod omnivore;
pub mod pocket;

use std::sync::Arc;

use async_trait::async_trait;

use crate::app::Result;
use crate::config::{Config, Provider};
use crate::domain::{Article, ArticleItem};
use crate::extract::ReadableExtractor;
use crate::fetcher::Fetcher;

pub use omnivore::OmnivoreSource;
pub use pocket::PocketSource;

/// Content of one item, either readable HTML or a PDF file.
#[derive(Debug, Clone)]
pub enum Renderable {
    Html(Article),
    Pdf(Vec<u8>),
}

#[async_trait]
pub trait ArticleSource: Send + Sync {
    /// Provider name, also used as the target folder name.
    fn name(&self) -> &str;

    /// One page of candidates, in the provider's order.
    async fn list(&self) -> Result<Vec<ArticleItem>>;

    fn is_handled(&self, item: &ArticleItem) -> bool;

    /// Record that the item is on the tablet. Marking twice is not an error.
    async fn mark_handled(&self, item: &ArticleItem) -> Result<()>;

    /// Record that the item could not be rendered and should not be retried.
    async fn mark_skipped(&self, item: &ArticleItem) -> Result<()> {
        self.mark_handled(item).await
    }

    async fn fetch_renderable(&self, item: &ArticleItem) -> Result<Renderable>;
}

/// Build the provider selected in `config`.
///
/// Fails before any network access when the provider is unknown or its
/// credentials are missing.
pub fn from_config(
    config: &Config,
    fetcher: Arc<dyn Fetcher + Send + Sync>,
) -> Result<Arc<dyn ArticleSource>> {
    let source: Arc<dyn ArticleSource> = match config.validate()? {
        Provider::Pocket => {
            let extractor = ReadableExtractor::new(fetcher, &config.extract);
            Arc::new(PocketSource::new(config.pocket.clone(), extractor)?)
        }
        Provider::Omnivore => Arc::new(OmnivoreSource::new(config.omnivore.clone())?),
    };
    Ok(source)
}
