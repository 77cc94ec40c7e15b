//! Turns an item into the payload of a store document.
//!
//! Direct PDF links are downloaded as they are. Everything else goes through
//! the provider's content path and is packed into an EPUB.

mod epub;
mod pdf;

pub use epub::build_epub;
pub use pdf::reload_marker_pdf;

use std::sync::Arc;

use tracing::debug;

use crate::app::{Result, ShelfError};
use crate::domain::{ArticleItem, FileType};
use crate::fetcher::Fetcher;
use crate::source::{ArticleSource, Renderable};

const PDF_MAGIC: &[u8] = b"%PDF";

/// Store-ready bytes of one document.
#[derive(Debug, Clone)]
pub struct Rendered {
    pub file_type: FileType,
    pub bytes: Vec<u8>,
}

pub struct ContentRenderer {
    fetcher: Arc<dyn Fetcher + Send + Sync>,
}

impl ContentRenderer {
    pub fn new(fetcher: Arc<dyn Fetcher + Send + Sync>) -> Self {
        Self { fetcher }
    }

    pub async fn render(&self, item: &ArticleItem, source: &dyn ArticleSource) -> Result<Rendered> {
        if item.is_pdf() {
            debug!("Downloading {} as PDF", item.url);
            let fetched = self.fetcher.fetch(item.url.as_str()).await?;
            return pdf_payload(fetched.body, item);
        }

        match source.fetch_renderable(item).await? {
            Renderable::Html(article) => Ok(Rendered {
                file_type: FileType::Epub,
                bytes: build_epub(&article)?,
            }),
            Renderable::Pdf(bytes) => pdf_payload(bytes, item),
        }
    }
}

fn pdf_payload(bytes: Vec<u8>, item: &ArticleItem) -> Result<Rendered> {
    if !bytes.starts_with(PDF_MAGIC) {
        return Err(ShelfError::Render(format!("{} is not a PDF file", item.url)));
    }
    Ok(Rendered {
        file_type: FileType::Pdf,
        bytes,
    })
}
