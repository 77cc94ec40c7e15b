//! Readable-article extraction for providers that only hand out a URL.
//!
//! ```text
//! URL → Fetcher → raw HTML → ContentExtractor → Article
//! ```
//!
//! Pages served as PDF are passed through untouched so they can be stored as
//! PDF documents.

mod extractor;
mod xhtml;

pub use extractor::{body_fragment, ContentExtractor};

use std::sync::Arc;

use url::Url;

use crate::app::Result;
use crate::config::ExtractConfig;
use crate::fetcher::Fetcher;
use crate::source::Renderable;

/// Downloads a page and extracts its readable content.
pub struct ReadableExtractor {
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    extractor: ContentExtractor,
}

impl ReadableExtractor {
    pub fn new(fetcher: Arc<dyn Fetcher + Send + Sync>, config: &ExtractConfig) -> Self {
        Self {
            fetcher,
            extractor: ContentExtractor::new(config),
        }
    }

    pub async fn extract(&self, url: &Url, fallback_title: &str) -> Result<Renderable> {
        let fetched = self.fetcher.fetch(url.as_str()).await?;

        if fetched.is_pdf() {
            tracing::debug!("{} is served as PDF, skipping extraction", url);
            return Ok(Renderable::Pdf(fetched.body));
        }

        let html = String::from_utf8_lossy(&fetched.body);
        let article = self.extractor.extract(&html, url, fallback_title)?;
        Ok(Renderable::Html(article))
    }
}
