//! Per-page fetch client: HTTPS GET, single-pass HTML extraction, and the
//! failed-page-record error model (fetch failures never bubble as `Error`).

use std::time::Duration;
use theoria_core::{PageFetch, PageFetcher};

use crate::html;

const USER_AGENT: &str =
    "Mozilla/5.0 (compatible; Theoria/0.1; +https://theoria.example/bot) reqwest";
const MAX_REDIRECTS: usize = 5;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

pub struct HttpPageFetcher {
    client: reqwest::Client,
}

impl HttpPageFetcher {
    pub fn new() -> theoria_core::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| theoria_core::Error::Fetch(e.to_string()))?;
        Ok(Self { client })
    }

    fn failed(url: &str, error: impl Into<String>) -> PageFetch {
        PageFetch {
            url: url.to_string(),
            final_url: url.to_string(),
            success: false,
            title: None,
            text: None,
            error: Some(error.into()),
        }
    }

    fn is_acceptable_content_type(content_type: &str) -> bool {
        let lower = content_type.to_ascii_lowercase();
        lower.starts_with("text/") || lower.contains("html")
    }
}

impl Default for HttpPageFetcher {
    fn default() -> Self {
        Self::new().expect("reqwest client construction should not fail with fixed settings")
    }
}

#[async_trait::async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_page(&self, url: &str) -> PageFetch {
        let request = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "text/html,application/xhtml+xml");

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return Self::failed(url, format!("request failed: {e}")),
        };

        let final_url = response.url().to_string();
        let status = response.status();
        if !status.is_success() {
            return Self::failed(url, format!("non-2xx status: {status}"));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !content_type.is_empty() && !Self::is_acceptable_content_type(&content_type) {
            return Self::failed(url, format!("unsupported content-type: {content_type}"));
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return Self::failed(url, format!("body read failed: {e}")),
        };

        let extracted = html::extract(&body, Some(&final_url));
        PageFetch {
            url: url.to_string(),
            final_url,
            success: true,
            title: Some(extracted.title),
            text: Some(extracted.text),
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_html_content_types() {
        assert!(!HttpPageFetcher::is_acceptable_content_type("application/pdf"));
        assert!(!HttpPageFetcher::is_acceptable_content_type("image/png"));
    }

    #[test]
    fn accepts_html_and_generic_text_content_types() {
        assert!(HttpPageFetcher::is_acceptable_content_type("text/html; charset=utf-8"));
        assert!(HttpPageFetcher::is_acceptable_content_type("application/xhtml+xml"));
        assert!(HttpPageFetcher::is_acceptable_content_type("text/plain"));
    }

    #[test]
    fn classifier_rejects_an_empty_content_type() {
        // fetch_page special-cases an absent header separately, upstream of this check.
        assert!(!HttpPageFetcher::is_acceptable_content_type(""));
    }
}
