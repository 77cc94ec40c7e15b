//! XML serialization of parsed HTML for EPUB sections.
//!
//! The HTML5 serializer writes `&nbsp;` and leaves void elements open, both
//! of which are errors in an `application/xhtml+xml` document.

use html_escape::{encode_double_quoted_attribute, encode_text};
use scraper::{ElementRef, Node};

const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Children of `element` as well-formed XHTML.
pub(crate) fn inner_xhtml(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    write_children(element, &mut out);
    out
}

fn write_children(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(&encode_text(&xml_chars(text))),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    write_element(child, out);
                }
            }
            // Comments may hold "--", which XML forbids.
            _ => {}
        }
    }
}

fn write_element(element: ElementRef<'_>, out: &mut String) {
    let name = element.value().name();
    out.push('<');
    out.push_str(name);
    for (attr, value) in element.value().attrs() {
        if !is_xml_name(attr) {
            continue;
        }
        out.push(' ');
        out.push_str(attr);
        out.push_str("=\"");
        out.push_str(&encode_double_quoted_attribute(&xml_chars(value)));
        out.push('"');
    }

    if VOID_ELEMENTS.contains(&name) {
        out.push_str("/>");
        return;
    }

    out.push('>');
    write_children(element, out);
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

/// Drop characters XML 1.0 does not allow.
fn xml_chars(s: &str) -> String {
    s.chars()
        .filter(|&c| matches!(c, '\t' | '\n' | '\r') || c >= ' ')
        .filter(|&c| !matches!(c, '\u{FFFE}' | '\u{FFFF}'))
        .collect()
}

fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == ':')
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | ':' | '-' | '.'))
}
