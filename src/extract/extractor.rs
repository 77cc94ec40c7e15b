use scraper::{ElementRef, Html, Selector};
use tracing::warn;
use url::Url;

use crate::app::{Result, ShelfError};
use crate::config::ExtractConfig;
use crate::domain::Article;

use super::xhtml::inner_xhtml;

/// Content extractor for cleaning and extracting article content from HTML
pub struct ContentExtractor {
    min_text_length: usize,
    content_selectors: Vec<Selector>,
    remove_selectors: Vec<Selector>,
    title_selectors: Vec<Selector>,
    body: Option<Selector>,
}

fn parse_selectors<'a>(selectors: impl IntoIterator<Item = &'a str>) -> Vec<Selector> {
    selectors
        .into_iter()
        .filter_map(|s| match Selector::parse(s) {
            Ok(selector) => Some(selector),
            Err(e) => {
                warn!("Ignoring invalid selector {:?}: {:?}", s, e);
                None
            }
        })
        .collect()
}

fn text_len(element: &ElementRef<'_>) -> usize {
    element.text().collect::<String>().trim().chars().count()
}

/// Contents of `<body>` as XHTML.
///
/// Used for content that a provider already cleaned up but still wraps in a
/// full document.
pub fn body_fragment(html: &str) -> String {
    let document = Html::parse_document(html);
    parse_selectors(["body"])
        .first()
        .and_then(|body| document.select(body).next())
        .map(|el| inner_xhtml(el).trim().to_string())
        .unwrap_or_default()
}

impl ContentExtractor {
    pub fn new(config: &ExtractConfig) -> Self {
        Self {
            min_text_length: config.min_text_length,
            content_selectors: parse_selectors(config.content_selectors.iter().map(String::as_str)),
            remove_selectors: parse_selectors(config.remove_selectors.iter().map(String::as_str)),
            title_selectors: parse_selectors(["meta[property=\"og:title\"]", "title", "h1"]),
            body: parse_selectors(["body"]).into_iter().next(),
        }
    }

    /// Extract the readable part of `html`.
    ///
    /// 1. Reads the title (og:title, `<title>`, first `<h1>`, then `fallback_title`)
    /// 2. Removes unwanted elements (ads, nav, etc.)
    /// 3. Takes the first content selector match with enough text, else `<body>`
    ///
    /// The content is written back as XHTML. Re-serializing also drops
    /// duplicate attributes, which EPUB readers reject.
    pub fn extract(&self, html: &str, source: &Url, fallback_title: &str) -> Result<Article> {
        let mut document = Html::parse_document(html);

        let title = self
            .find_title(&document)
            .unwrap_or_else(|| fallback_title.trim().to_string());

        let doomed: Vec<_> = self
            .remove_selectors
            .iter()
            .flat_map(|selector| document.select(selector).map(|el| el.id()))
            .collect();
        for id in doomed {
            if let Some(mut node) = document.tree.get_mut(id) {
                node.detach();
            }
        }

        let content = self
            .content_selectors
            .iter()
            .find_map(|selector| {
                document
                    .select(selector)
                    .find(|el| text_len(el) > self.min_text_length)
            })
            .or_else(|| {
                self.body
                    .as_ref()
                    .and_then(|body| document.select(body).next())
                    .filter(|el| text_len(el) > 0)
            })
            .map(inner_xhtml)
            .ok_or_else(|| ShelfError::Extract(format!("no readable content at {}", source)))?;

        Ok(Article::with_header(&title, source, content.trim()))
    }

    fn find_title(&self, document: &Html) -> Option<String> {
        self.title_selectors.iter().find_map(|selector| {
            let el = document.select(selector).next()?;
            let text = match el.value().attr("content") {
                Some(content) => content.to_string(),
                None => el.text().collect::<String>(),
            };
            let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
            (!text.is_empty()).then_some(text)
        })
    }
}
