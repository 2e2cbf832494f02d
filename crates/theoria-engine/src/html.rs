//! C2: single-pass HTML extraction into (title, text, links).

use html_scraper::{ElementRef, Html, Node, Selector};
use url::Url;

const SKIP_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "svg", "path", "iframe", "nav", "footer", "header",
];
const BLOCK_ELEMENTS: &[&str] = &[
    "p",
    "div",
    "br",
    "li",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "tr",
    "blockquote",
    "section",
    "article",
];

#[derive(Debug, Clone, Default)]
pub struct ExtractedPage {
    pub title: String,
    pub text: String,
    pub links: Vec<String>,
}

/// Parse `html` once into title, visible text, and outbound links. `base_url`
/// resolves relative hrefs; links that don't resolve to `http`/`https` are
/// dropped.
pub fn extract(html: &str, base_url: Option<&str>) -> ExtractedPage {
    let document = Html::parse_document(html);
    ExtractedPage {
        title: extract_title(&document),
        text: extract_text(&document),
        links: extract_links(&document, base_url),
    }
}

fn extract_title(document: &Html) -> String {
    if let Ok(selector) = Selector::parse("title") {
        if let Some(el) = document.select(&selector).next() {
            let text: String = el.text().collect();
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                return trimmed.to_string();
            }
        }
    }
    if let Ok(selector) = Selector::parse("h1") {
        if let Some(el) = document.select(&selector).next() {
            return el.text().collect::<String>().trim().to_string();
        }
    }
    String::new()
}

/// Depth-first traversal of the document, skipping `SKIP_ELEMENTS` subtrees
/// entirely and emitting a space after each text node and after each
/// `BLOCK_ELEMENTS` close. Walks from `<body>` so `<head>`/`<title>` text
/// never leaks into the extracted page text; falls back to the document
/// root for fragments with no `<body>`.
fn extract_text(document: &Html) -> String {
    let mut out = String::new();
    let start = Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next())
        .unwrap_or_else(|| document.root_element());
    walk(start, &mut out);
    collapse_whitespace(&out)
}

fn walk(node: ElementRef, out: &mut String) {
    let name = node.value().name();
    if SKIP_ELEMENTS.contains(&name) {
        return;
    }
    for child in node.children() {
        match child.value() {
            Node::Text(text) => {
                out.push_str(text);
                out.push(' ');
            }
            Node::Element(_) => {
                if let Some(el) = ElementRef::wrap(child) {
                    walk(el, out);
                }
            }
            _ => {}
        }
    }
    if BLOCK_ELEMENTS.contains(&name) {
        out.push(' ');
    }
}

fn collapse_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_was_space = false;
    for c in s.chars() {
        if c.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(c);
            last_was_space = false;
        }
    }
    out.trim().to_string()
}

fn extract_links(document: &Html, base_url: Option<&str>) -> Vec<String> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    let base = base_url.and_then(|u| Url::parse(u).ok());

    let mut links = Vec::new();
    for el in document.select(&selector) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') {
            continue;
        }
        let lower = href.to_ascii_lowercase();
        if lower.starts_with("javascript:") || lower.starts_with("mailto:") {
            continue;
        }

        let resolved = if let Ok(u) = Url::parse(href) {
            Some(u)
        } else {
            base.as_ref().and_then(|b| b.join(href).ok())
        };

        let Some(mut url) = resolved else { continue };
        if url.scheme() != "http" && url.scheme() != "https" {
            continue;
        }
        url.set_fragment(None);
        links.push(url.to_string());
    }
    links
}
