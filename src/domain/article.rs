use chrono::{DateTime, Utc};
use url::Url;

/// A tag or label attached to an item by its provider.
///
/// Pocket tags only have a name, so `id` repeats it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub id: String,
    pub name: String,
}

impl Marker {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A candidate article listed by a provider.
#[derive(Debug, Clone)]
pub struct ArticleItem {
    /// Provider-assigned id. Pocket ids overflow 32-bit integers, so this is
    /// never parsed.
    pub id: String,
    pub url: Url,
    pub title: String,
    pub added_at: DateTime<Utc>,
    pub markers: Vec<Marker>,
    /// Provider handle for fetching content, when it differs from `id`.
    pub slug: Option<String>,
}

impl ArticleItem {
    pub fn new(id: impl Into<String>, url: Url, title: impl Into<String>, added_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            url,
            title: title.into(),
            added_at,
            markers: Vec::new(),
            slug: None,
        }
    }

    pub fn has_marker(&self, name: &str) -> bool {
        self.markers.iter().any(|m| m.name == name)
    }

    /// Whether the item links straight to a PDF file.
    pub fn is_pdf(&self) -> bool {
        self.url
            .path()
            .rsplit('/')
            .next()
            .and_then(|segment| segment.rsplit_once('.'))
            .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case("pdf"))
    }

    /// Visible name of the document created for this item.
    ///
    /// The date prefix keeps documents sorted by when they were saved.
    pub fn file_name(&self) -> String {
        let title = self.title.split_whitespace().collect::<Vec<_>>().join(" ");
        let title = title.replace('/', "_");
        let title = if title.is_empty() {
            self.url.as_str().to_string()
        } else {
            title
        };
        format!("{} :: {}", self.added_at.format("%Y%m%d-%H%M"), title)
    }
}

/// Readable content for one item, ready to be packed into an EPUB.
#[derive(Debug, Clone)]
pub struct Article {
    pub title: String,
    pub author: Option<String>,
    /// XHTML body fragment, starting with the title heading and source link.
    pub content: String,
}

impl Article {
    /// Build an article from extracted body HTML, prefixed with the title and
    /// a link back to the source.
    pub fn with_header(title: &str, source: &Url, body_html: &str) -> Self {
        let link = html_escape::encode_double_quoted_attribute(source.as_str());
        let content = format!(
            "<h1> {} </h1>\n<a href=\"{}\">{}</a>\n{}",
            html_escape::encode_text(title),
            link,
            html_escape::encode_text(source.as_str()),
            body_html
        );
        Self {
            title: title.to_string(),
            author: None,
            content,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(url: &str, title: &str) -> ArticleItem {
        let added = Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap();
        ArticleItem::new("1", Url::parse(url).unwrap(), title, added)
    }

    #[test]
    fn test_file_name_embeds_date_and_title() {
        let item = item("https://example.com/a", "Hello World");
        assert_eq!(item.file_name(), "20240305-0000 :: Hello World");
        assert_eq!(item.file_name(), item.file_name());
    }

    #[test]
    fn test_file_name_sanitizes_title() {
        let item = item("https://example.com/a", "  Either/Or \n\t notes ");
        assert_eq!(item.file_name(), "20240305-0000 :: Either_Or notes");
    }

    #[test]
    fn test_file_name_without_title_uses_url() {
        let item = item("https://example.com/a", "   ");
        assert_eq!(item.file_name(), "20240305-0000 :: https://example.com/a");
    }

    #[test]
    fn test_is_pdf() {
        assert!(item("https://example.com/paper.pdf", "").is_pdf());
        assert!(item("https://example.com/paper.PDF?dl=1", "").is_pdf());
        assert!(!item("https://example.com/pdf/article", "").is_pdf());
        assert!(!item("https://example.com/post.html", "").is_pdf());
    }

    #[test]
    fn test_has_marker() {
        let mut item = item("https://example.com/a", "t");
        item.markers.push(Marker::new("42", "remarkable"));
        assert!(item.has_marker("remarkable"));
        assert!(!item.has_marker("later"));
    }

    #[test]
    fn test_with_header_escapes_title() {
        let url = Url::parse("https://example.com/a?x=1&y=2").unwrap();
        let article = Article::with_header("Fish & Chips", &url, "<p>body</p>");
        assert!(article.content.starts_with("<h1> Fish &amp; Chips </h1>"));
        assert!(article.content.contains("href=\"https://example.com/a?x=1&amp;y=2\""));
        assert!(article.content.ends_with("<p>body</p>"));
        assert_eq!(article.title, "Fish & Chips");
    }
}
