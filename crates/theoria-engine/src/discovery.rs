//! C3: discovery scraper over the DuckDuckGo HTML results endpoint.
//!
//! Two pages maximum: page 1 via GET, page 2 (if needed and a "Next" form is
//! present) via POST carrying that form's hidden fields. Any network or
//! parse failure terminates pagination silently, returning whatever was
//! collected so far.

use html_scraper::{Html, Selector};
use std::collections::BTreeSet;
use std::time::Duration;
use theoria_core::{DiscoveryHit, DiscoveryProvider, Result};

const ENDPOINT: &str = "https://html.duckduckgo.com/html/";
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

pub struct DuckDuckGoDiscovery {
    client: reqwest::Client,
    endpoint: String,
}

impl DuckDuckGoDiscovery {
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::with_endpoint(ENDPOINT.to_string(), timeout)
    }

    /// Points at an arbitrary endpoint instead of the real DuckDuckGo host;
    /// used in tests to stub discovery with `wiremock`.
    pub fn with_endpoint(endpoint: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| theoria_core::Error::Discovery(e.to_string()))?;
        Ok(Self { client, endpoint })
    }

    async fn fetch_page1(&self, query: &str) -> Option<String> {
        self.client
            .get(&self.endpoint)
            .query(&[("q", query)])
            .header(reqwest::header::ACCEPT, "text/html")
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .await
            .ok()?
            .text()
            .await
            .ok()
    }

    async fn fetch_page2(&self, fields: &[(String, String)]) -> Option<String> {
        self.client
            .post(&self.endpoint)
            .header(reqwest::header::ACCEPT, "text/html")
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .form(fields)
            .send()
            .await
            .ok()?
            .text()
            .await
            .ok()
    }
}

#[async_trait::async_trait]
impl DiscoveryProvider for DuckDuckGoDiscovery {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<DiscoveryHit>> {
        let mut hits = Vec::new();
        let mut seen = BTreeSet::new();

        let Some(page1) = self.fetch_page1(query).await else {
            return Ok(hits);
        };
        let next_fields = collect_result_hits(&page1, &mut hits, &mut seen, max_results);

        if hits.len() < max_results {
            if let Some(fields) = next_fields {
                if let Some(page2) = self.fetch_page2(&fields).await {
                    collect_result_hits(&page2, &mut hits, &mut seen, max_results);
                }
            }
        }

        hits.truncate(max_results);
        Ok(hits)
    }
}

/// Parses one results page, appending new hits (deduped by url) to `hits`,
/// and returns the "Next" form's hidden fields if the page has more than
/// `max_results` already collected and such a form exists.
fn collect_result_hits(
    html: &str,
    hits: &mut Vec<DiscoveryHit>,
    seen: &mut BTreeSet<String>,
    max_results: usize,
) -> Option<Vec<(String, String)>> {
    let document = Html::parse_document(html);

    for node in select_result_nodes(&document) {
        if hits.len() >= max_results {
            break;
        }
        let Some((url, title)) = extract_link(node) else {
            continue;
        };
        if !seen.insert(url.clone()) {
            continue;
        }
        let snippet = extract_snippet(node);
        hits.push(DiscoveryHit { url, title, snippet });
    }

    extract_next_form(&document)
}

fn select_result_nodes<'a>(document: &'a Html) -> Vec<html_scraper::ElementRef<'a>> {
    if let Ok(selector) = Selector::parse("div") {
        let primary: Vec<_> = document
            .select(&selector)
            .filter(|el| class_contains(el, "result__body"))
            .collect();
        if !primary.is_empty() {
            return primary;
        }
        return document
            .select(&selector)
            .filter(|el| class_contains(el, "result"))
            .collect();
    }
    Vec::new()
}

fn class_contains(el: &html_scraper::ElementRef, needle: &str) -> bool {
    el.value()
        .attr("class")
        .map(|c| c.contains(needle))
        .unwrap_or(false)
}

fn extract_link(node: html_scraper::ElementRef) -> Option<(String, String)> {
    let selector = Selector::parse("a").ok()?;
    let anchor = node
        .select(&selector)
        .find(|a| class_contains(a, "result__a"))
        .or_else(|| node.select(&selector).find(|a| a.value().attr("href").is_some()))?;
    let href = anchor.value().attr("href")?;
    let url = extract_uddg(href)?;
    let title = anchor.text().collect::<String>().trim().to_string();
    Some((url, title))
}

fn extract_snippet(node: html_scraper::ElementRef) -> String {
    let candidates = ["a", "div"];
    for tag in candidates {
        if let Ok(selector) = Selector::parse(tag) {
            if let Some(el) = node.select(&selector).find(|el| class_contains(el, "result__snippet")) {
                return el.text().collect::<String>().trim().to_string();
            }
        }
    }
    String::new()
}

/// DuckDuckGo's html endpoint embeds the real destination in a `uddg` query
/// parameter of a `/l/?...` redirect link.
fn extract_uddg(href: &str) -> Option<String> {
    let query = href.split_once('?').map(|(_, q)| q).unwrap_or(href);
    for pair in query.split('&') {
        if let Some(value) = pair.strip_prefix("uddg=") {
            let decoded = percent_decode(value);
            if decoded.starts_with("http://") || decoded.starts_with("https://") {
                return Some(decoded);
            }
        }
    }
    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href.to_string());
    }
    None
}

/// Decodes `%XX`/`+` escapes into raw bytes first, then re-assembles them as
/// UTF-8 at the end — a non-ASCII character is usually spread across
/// several consecutive `%XX` escapes, so decoding each one to a `char`
/// independently would corrupt it.
fn percent_decode(s: &str) -> String {
    let mut out: Vec<u8> = Vec::with_capacity(s.len());
    let mut bytes = s.bytes().peekable();
    while let Some(b) = bytes.next() {
        match b {
            b'%' => {
                let hi = bytes.next();
                let lo = bytes.next();
                if let (Some(hi), Some(lo)) = (hi, lo) {
                    if let Ok(byte) = u8::from_str_radix(&format!("{}{}", hi as char, lo as char), 16) {
                        out.push(byte);
                        continue;
                    }
                }
            }
            b'+' => out.push(b' '),
            _ => out.push(b),
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn extract_next_form(document: &Html) -> Option<Vec<(String, String)>> {
    let form_selector = Selector::parse("form").ok()?;
    let input_selector = Selector::parse("input").ok()?;

    for form in document.select(&form_selector) {
        let looks_like_next = form
            .select(&input_selector)
            .any(|input| {
                let value = input.value().attr("value").unwrap_or("");
                let name = input.value().attr("name").unwrap_or("");
                value.eq_ignore_ascii_case("next") || name.eq_ignore_ascii_case("next")
            });
        if !looks_like_next {
            continue;
        }
        let fields: Vec<(String, String)> = form
            .select(&input_selector)
            .filter_map(|input| {
                let name = input.value().attr("name")?.to_string();
                let value = input.value().attr("value").unwrap_or("").to_string();
                Some((name, value))
            })
            .collect();
        if !fields.is_empty() {
            return Some(fields);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results_page(entries: &[(&str, &str, &str)]) -> String {
        let mut body = String::from("<html><body>");
        for (url, title, snippet) in entries {
            body.push_str(&format!(
                r#"<div class="result results_links result__body">
                    <a class="result__a" href="/l/?uddg={url}">{title}</a>
                    <a class="result__snippet">{snippet}</a>
                </div>"#,
                url = urlencode(url),
                title = title,
                snippet = snippet
            ));
        }
        body.push_str("</body></html>");
        body
    }

    fn urlencode(s: &str) -> String {
        s.replace(':', "%3A").replace('/', "%2F")
    }

    #[test]
    fn extracts_url_title_and_snippet_from_a_result_page() {
        let html = results_page(&[("https://plato.stanford.edu/entries/aquinas", "Aquinas", "A summary of his thought")]);
        let mut hits = Vec::new();
        let mut seen = BTreeSet::new();
        collect_result_hits(&html, &mut hits, &mut seen, 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].url, "https://plato.stanford.edu/entries/aquinas");
        assert_eq!(hits[0].title, "Aquinas");
        assert_eq!(hits[0].snippet, "A summary of his thought");
    }

    #[test]
    fn deduplicates_repeated_result_urls_within_a_page() {
        let html = results_page(&[
            ("https://example.com/a", "A", "first"),
            ("https://example.com/a", "A again", "second"),
        ]);
        let mut hits = Vec::new();
        let mut seen = BTreeSet::new();
        collect_result_hits(&html, &mut hits, &mut seen, 10);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn stops_collecting_once_max_results_reached() {
        let html = results_page(&[
            ("https://example.com/a", "A", "x"),
            ("https://example.com/b", "B", "y"),
        ]);
        let mut hits = Vec::new();
        let mut seen = BTreeSet::new();
        collect_result_hits(&html, &mut hits, &mut seen, 1);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn no_next_form_means_no_pagination() {
        let html = results_page(&[("https://example.com/a", "A", "x")]);
        assert!(extract_next_form(&Html::parse_document(&html)).is_none());
    }

    #[test]
    fn next_form_hidden_fields_are_collected() {
        let html = r#"<html><body>
            <form method="post" action="/html/">
                <input type="hidden" name="q" value="aquinas">
                <input type="submit" name="next" value="Next">
            </form>
        </body></html>"#;
        let fields = extract_next_form(&Html::parse_document(html)).unwrap();
        assert!(fields.contains(&("q".to_string(), "aquinas".to_string())));
    }

    #[test]
    fn percent_decode_handles_encoded_scheme_and_slashes() {
        assert_eq!(percent_decode("https%3A%2F%2Fexample.com%2Fx"), "https://example.com/x");
    }

    #[test]
    fn percent_decode_reassembles_multibyte_utf8_sequences() {
        assert_eq!(percent_decode("caf%C3%A9"), "café");
    }
}
