pub mod http_fetcher;

use async_trait::async_trait;

use crate::app::Result;

pub use http_fetcher::HttpFetcher;

/// A downloaded resource.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub body: Vec<u8>,
    /// Value of the `Content-Type` header, if any.
    pub content_type: Option<String>,
}

impl Fetched {
    pub fn is_pdf(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with("application/pdf"))
            || self.body.starts_with(b"%PDF")
    }
}

#[async_trait]
pub trait Fetcher {
    async fn fetch(&self, url: &str) -> Result<Fetched>;
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::app::ShelfError;

    /// Serves canned bodies by URL and counts requests.
    #[derive(Default)]
    pub struct MockFetcher {
        responses: HashMap<String, Fetched>,
        pub calls: AtomicUsize,
    }

    impl MockFetcher {
        pub fn with(mut self, url: &str, content_type: &str, body: &[u8]) -> Self {
            self.responses.insert(
                url.to_string(),
                Fetched {
                    body: body.to_vec(),
                    content_type: Some(content_type.to_string()),
                },
            );
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Fetcher for MockFetcher {
        async fn fetch(&self, url: &str) -> Result<Fetched> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .get(url)
                .cloned()
                .ok_or_else(|| ShelfError::Other(format!("no canned response for {}", url)))
        }
    }
}
