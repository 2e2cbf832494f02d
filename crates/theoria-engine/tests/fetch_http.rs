//! Exercises `HttpPageFetcher` against a stubbed HTTP endpoint (C2's fetch
//! companion): successful extraction, non-2xx handling, and content-type
//! gating, all over real requests.

use theoria_core::PageFetcher;
use theoria_engine::fetch::HttpPageFetcher;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn fetches_and_extracts_title_and_text_from_a_successful_page() {
    let server = MockServer::start().await;
    let body = "<html><head><title>Aquinas</title></head><body><p>On the natural law.</p></body></html>";
    Mock::given(method("GET"))
        .and(path("/entry"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body).insert_header("content-type", "text/html"))
        .mount(&server)
        .await;

    let fetcher = HttpPageFetcher::new().unwrap();
    let page = fetcher.fetch_page(&format!("{}/entry", server.uri())).await;

    assert!(page.success);
    assert_eq!(page.title.as_deref(), Some("Aquinas"));
    assert_eq!(page.text.as_deref(), Some("On the natural law."));
    assert!(page.error.is_none());
}

#[tokio::test]
async fn a_non_2xx_status_produces_a_failed_page_record() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = HttpPageFetcher::new().unwrap();
    let page = fetcher.fetch_page(&format!("{}/missing", server.uri())).await;

    assert!(!page.success);
    assert!(page.text.is_none());
    assert!(page.error.is_some());
}

#[tokio::test]
async fn an_unsupported_content_type_is_rejected_without_parsing_the_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/report.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("%PDF-1.4 binary stand-in")
                .insert_header("content-type", "application/pdf"),
        )
        .mount(&server)
        .await;

    let fetcher = HttpPageFetcher::new().unwrap();
    let page = fetcher.fetch_page(&format!("{}/report.pdf", server.uri())).await;

    assert!(!page.success);
    assert!(page.error.unwrap().contains("content-type"));
}
