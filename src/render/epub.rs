use std::io::{Cursor, Write};

use chrono::Utc;
use html_escape::{encode_double_quoted_attribute, encode_text};
use uuid::Uuid;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::app::{Result, ShelfError};
use crate::domain::Article;

const DEFAULT_AUTHOR: &str = "shelfsync";
const SECTION_FILE: &str = "section0001.xhtml";

const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="EPUB/package.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>
"#;

/// Pack an article into a single-section EPUB 3 file.
pub fn build_epub(article: &Article) -> Result<Vec<u8>> {
    let id = Uuid::new_v4();
    let title = encode_text(&article.title).to_string();
    let author = encode_text(article.author.as_deref().unwrap_or(DEFAULT_AUTHOR)).to_string();

    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let entries: [(&str, String, SimpleFileOptions); 6] = [
        ("mimetype", "application/epub+zip".to_string(), stored),
        ("META-INF/container.xml", CONTAINER_XML.to_string(), deflated),
        ("EPUB/package.opf", package_opf(&id, &title, &author), deflated),
        ("EPUB/nav.xhtml", nav_xhtml(&title), deflated),
        ("EPUB/toc.ncx", toc_ncx(&id, &title), deflated),
        (
            "EPUB/section0001.xhtml",
            section_xhtml(&title, &article.content),
            deflated,
        ),
    ];

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, body, options) in entries {
        zip.start_file(name, options).map_err(zip_error)?;
        zip.write_all(body.as_bytes())?;
    }

    Ok(zip.finish().map_err(zip_error)?.into_inner())
}

fn zip_error(e: zip::result::ZipError) -> ShelfError {
    ShelfError::Render(format!("epub: {}", e))
}

fn package_opf(id: &Uuid, title: &str, author: &str) -> String {
    let modified = Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package version="3.0" unique-identifier="pub-id" xmlns="http://www.idpf.org/2007/opf">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:identifier id="pub-id">urn:uuid:{id}</dc:identifier>
    <dc:title>{title}</dc:title>
    <dc:creator>{author}</dc:creator>
    <dc:language>en</dc:language>
    <meta property="dcterms:modified">{modified}</meta>
  </metadata>
  <manifest>
    <item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>
    <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
    <item id="section0001" href="{section}" media-type="application/xhtml+xml"/>
  </manifest>
  <spine toc="ncx">
    <itemref idref="section0001"/>
  </spine>
</package>
"#,
        section = SECTION_FILE,
    )
}

fn nav_xhtml(title: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<head><title>{title}</title></head>
<body>
  <nav epub:type="toc">
    <ol><li><a href="{section}">{title}</a></li></ol>
  </nav>
</body>
</html>
"#,
        section = encode_double_quoted_attribute(SECTION_FILE),
    )
}

fn toc_ncx(id: &Uuid, title: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx version="2005-1" xmlns="http://www.daisy.org/z3986/2005/ncx/">
  <head><meta name="dtb:uid" content="urn:uuid:{id}"/></head>
  <docTitle><text>{title}</text></docTitle>
  <navMap>
    <navPoint id="navPoint-1" playOrder="1">
      <navLabel><text>{title}</text></navLabel>
      <content src="{section}"/>
    </navPoint>
  </navMap>
</ncx>
"#,
        section = SECTION_FILE,
    )
}

fn section_xhtml(title: &str, content: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml">
<head><title>{title}</title></head>
<body>
{content}
</body>
</html>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use url::Url;
    use zip::ZipArchive;

    use crate::config::ExtractConfig;
    use crate::extract::ContentExtractor;

    fn article() -> Article {
        let url = Url::parse("https://example.com/post").unwrap();
        Article::with_header("Fish & Chips", &url, "<p>Batter</p>")
    }

    fn read_entry(bytes: &[u8], name: &str) -> String {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name(name).unwrap();
        let mut out = String::new();
        file.read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn test_mimetype_is_first_and_stored() {
        let bytes = build_epub(&article()).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();

        let first = archive.by_index(0).unwrap();
        assert_eq!(first.name(), "mimetype");
        assert_eq!(first.compression(), CompressionMethod::Stored);
        drop(first);

        assert_eq!(archive.len(), 6);
        assert_eq!(read_entry(&bytes, "mimetype"), "application/epub+zip");
    }

    #[test]
    fn test_package_carries_escaped_metadata() {
        let bytes = build_epub(&article()).unwrap();
        let opf = read_entry(&bytes, "EPUB/package.opf");

        assert!(opf.contains("<dc:title>Fish &amp; Chips</dc:title>"));
        assert!(opf.contains("<dc:creator>shelfsync</dc:creator>"));
        assert!(read_entry(&bytes, "META-INF/container.xml").contains("EPUB/package.opf"));
    }

    #[test]
    fn test_section_holds_article_body() {
        let mut article = article();
        article.author = Some("Ada".into());
        let bytes = build_epub(&article).unwrap();

        let section = read_entry(&bytes, "EPUB/section0001.xhtml");
        assert!(section.contains("<p>Batter</p>"));
        assert!(section.contains("<h1> Fish &amp; Chips </h1>"));
        assert!(read_entry(&bytes, "EPUB/package.opf").contains("<dc:creator>Ada</dc:creator>"));
    }

    #[test]
    fn test_section_from_extracted_page_is_xhtml() {
        let html = format!(
            r#"<html><body><article><p>{}a&nbsp;b<br>line<img src="x.png"><hr></p></article></body></html>"#,
            "word ".repeat(40)
        );
        let url = Url::parse("https://example.com/post").unwrap();
        let article = ContentExtractor::new(&ExtractConfig::default())
            .extract(&html, &url, "t")
            .unwrap();
        let section = read_entry(&build_epub(&article).unwrap(), "EPUB/section0001.xhtml");

        assert!(!section.contains("&nbsp;"));
        assert!(section.contains("a\u{00A0}b"));
        assert_eq!(section.matches("<br").count(), section.matches("<br/>").count());
        assert!(section.contains(r#"<img src="x.png"/>"#));
        assert!(section.contains("<hr/>"));
    }
}
