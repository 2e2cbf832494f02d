//! Exercises `DuckDuckGoDiscovery` against a stubbed HTTP endpoint (C3),
//! covering result extraction and two-page pagination over real requests.

use theoria_core::DiscoveryProvider;
use theoria_engine::discovery::DuckDuckGoDiscovery;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn result_page(entries: &[(&str, &str, &str)], next_form: bool) -> String {
    let mut body = String::from("<html><body>");
    for (url, title, snippet) in entries {
        let encoded = url.replace(':', "%3A").replace('/', "%2F");
        body.push_str(&format!(
            r#"<div class="result results_links result__body">
                <a class="result__a" href="/l/?uddg={encoded}">{title}</a>
                <a class="result__snippet">{snippet}</a>
            </div>"#,
        ));
    }
    if next_form {
        body.push_str(
            r#"<form method="post" action="/html/">
                <input type="hidden" name="q" value="aquinas">
                <input type="hidden" name="s" value="10">
                <input type="submit" name="next" value="Next">
            </form>"#,
        );
    }
    body.push_str("</body></html>");
    body
}

#[tokio::test]
async fn fetches_and_parses_a_single_results_page() {
    let server = MockServer::start().await;
    let page = result_page(
        &[("https://plato.stanford.edu/entries/aquinas", "Aquinas", "Medieval philosopher and theologian")],
        false,
    );
    Mock::given(method("GET"))
        .and(path("/html/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page))
        .mount(&server)
        .await;

    let discovery = DuckDuckGoDiscovery::with_endpoint(format!("{}/html/", server.uri()), std::time::Duration::from_secs(5)).unwrap();
    let hits = discovery.search("aquinas", 10).await.unwrap();

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].url, "https://plato.stanford.edu/entries/aquinas");
    assert_eq!(hits[0].title, "Aquinas");
    assert_eq!(hits[0].snippet, "Medieval philosopher and theologian");
}

#[tokio::test]
async fn follows_pagination_via_post_when_a_next_form_is_present() {
    let server = MockServer::start().await;
    let page1 = result_page(&[("https://example.com/a", "A", "first page hit")], true);
    let page2 = result_page(&[("https://example.com/b", "B", "second page hit")], false);

    Mock::given(method("GET"))
        .and(path("/html/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page1))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/html/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page2))
        .mount(&server)
        .await;

    let discovery = DuckDuckGoDiscovery::with_endpoint(format!("{}/html/", server.uri()), std::time::Duration::from_secs(5)).unwrap();
    let hits = discovery.search("aquinas", 10).await.unwrap();

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].url, "https://example.com/a");
    assert_eq!(hits[1].url, "https://example.com/b");
}

#[tokio::test]
async fn stops_after_one_page_once_max_results_is_already_reached() {
    let server = MockServer::start().await;
    let page1 = result_page(
        &[
            ("https://example.com/a", "A", "x"),
            ("https://example.com/b", "B", "y"),
        ],
        true,
    );

    Mock::given(method("GET"))
        .and(path("/html/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page1))
        .mount(&server)
        .await;
    // No POST mock registered: a second request would fail the test.

    let discovery = DuckDuckGoDiscovery::with_endpoint(format!("{}/html/", server.uri()), std::time::Duration::from_secs(5)).unwrap();
    let hits = discovery.search("aquinas", 2).await.unwrap();

    assert_eq!(hits.len(), 2);
}

#[tokio::test]
async fn a_failed_request_yields_an_empty_result_rather_than_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/html/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let discovery = DuckDuckGoDiscovery::with_endpoint(format!("{}/html/", server.uri()), std::time::Duration::from_secs(5)).unwrap();
    let hits = discovery.search("aquinas", 10).await.unwrap();

    assert!(hits.is_empty());
}
