//! Origin API client, response schemas, and URL templates.
//!
//! This crate provides:
//! - [`OriginClient`]: paginated title search, page fetch, image probes
//! - [`schema`]: strict record shapes for every origin response
//! - [`OriginUrls`]: re-exported browse/icon URL templates
//! - [`RequestKey`]: content-addressable request identities for caching

pub mod client;
pub mod request;
pub mod schema;

pub use client::{FOLLOWING_ID_HEADER, ImageHead, OriginClient};
pub use request::{OriginRequest, RequestKey};
pub use schema::{LineRecord, PageRecord, RelatedPagesRecord, RelatedRecord, TitleRecord};
pub use wikimirror_shared::OriginUrls;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use url::Url;
    use wikimirror_shared::{SiteConfig, WikiMirrorError};
    use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn site(server: &MockServer) -> SiteConfig {
        SiteConfig::new("proj", "Home", Url::parse(&server.uri()).unwrap())
    }

    fn title(id: &str) -> serde_json::Value {
        json!({ "id": id, "title": format!("T{id}"), "links": [], "updated": 100 })
    }

    fn page_json(title: &str) -> serde_json::Value {
        json!({
            "id": format!("id-{title}"),
            "title": title,
            "image": null,
            "descriptions": ["first line"],
            "created": 1_700_000_000,
            "updated": 1_700_000_100,
            "persistent": true,
            "lines": [{ "id": "l0", "text": title }, { "id": "l1", "text": "first line" }],
            "links": [],
            "relatedPages": { "links1hop": [], "links2hop": [] }
        })
    }

    // -----------------------------------------------------------------------
    // Title search
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn search_titles_follows_cursors_without_duplicates() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/pages/proj/search/titles"))
            .and(query_param_is_missing("followingId"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("X-Following-Id", "2")
                    .set_body_json(json!([title("1"), title("2")])),
            )
            .expect(1)
            .mount(&server)
            .await;

        // Continuation batches start with the previous boundary record.
        Mock::given(method("GET"))
            .and(path("/api/pages/proj/search/titles"))
            .and(query_param("followingId", "2"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("X-Following-Id", "4")
                    .set_body_json(json!([title("2"), title("3"), title("4")])),
            )
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/pages/proj/search/titles"))
            .and(query_param("followingId", "4"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("X-Following-Id", "")
                    .set_body_json(json!([title("4"), title("5")])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = OriginClient::new(&site(&server)).unwrap();
        let records = client.search_titles().await.unwrap();

        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3", "4", "5"]);
    }

    #[tokio::test]
    async fn search_titles_single_batch() {
        let server = MockServer::start().await;
        Mock::given(path("/api/pages/proj/search/titles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([title("1")])))
            .mount(&server)
            .await;

        let client = OriginClient::new(&site(&server)).unwrap();
        assert_eq!(client.search_titles().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn search_titles_stuck_cursor_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(path("/api/pages/proj/search/titles"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("X-Following-Id", "1")
                    .set_body_json(json!([title("1")])),
            )
            .mount(&server)
            .await;

        let client = OriginClient::new(&site(&server)).unwrap();
        let err = client.search_titles().await.unwrap_err();
        assert!(matches!(err, WikiMirrorError::SchemaViolation { .. }));
    }

    #[tokio::test]
    async fn search_titles_error_body_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(path("/api/pages/proj/search/titles"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "name": "NotMemberError",
                "message": "You are not a member of this project."
            })))
            .mount(&server)
            .await;

        let client = OriginClient::new(&site(&server)).unwrap();
        let err = client.search_titles().await.unwrap_err();
        assert!(matches!(err, WikiMirrorError::SchemaViolation { .. }));
        assert!(err.to_string().contains("NotMemberError"));
    }

    // -----------------------------------------------------------------------
    // Page fetch
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn fetch_page_encodes_slash_in_title() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/pages/proj/Top%2FTitle"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_json("Top/Title")))
            .expect(1)
            .mount(&server)
            .await;

        let client = OriginClient::new(&site(&server)).unwrap();
        let page = client.fetch_page("Top/Title").await.unwrap().expect("page");
        assert_eq!(page.title, "Top/Title");
        assert_eq!(page.descriptions, vec!["first line".to_string()]);
    }

    #[tokio::test]
    async fn fetch_page_not_found_is_none() {
        let server = MockServer::start().await;
        Mock::given(path("/api/pages/proj/Missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "name": "NotFoundError",
                "message": "Page not found."
            })))
            .mount(&server)
            .await;

        let client = OriginClient::new(&site(&server)).unwrap();
        assert!(client.fetch_page("Missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn fetch_page_server_error_is_transient() {
        let server = MockServer::start().await;
        Mock::given(path("/api/pages/proj/Flaky"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = OriginClient::new(&site(&server)).unwrap();
        let err = client.fetch_page("Flaky").await.unwrap_err();
        assert!(matches!(err, WikiMirrorError::Network(_)));
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn fetch_page_malformed_is_schema_violation() {
        let server = MockServer::start().await;
        Mock::given(path("/api/pages/proj/Broken"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "x" })))
            .mount(&server)
            .await;

        let client = OriginClient::new(&site(&server)).unwrap();
        let err = client.fetch_page("Broken").await.unwrap_err();
        assert!(matches!(err, WikiMirrorError::SchemaViolation { .. }));
    }

    #[tokio::test]
    async fn session_cookie_is_sent() {
        let server = MockServer::start().await;
        Mock::given(path("/api/pages/proj/Private"))
            .and(header("cookie", "connect.sid=s3cret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_json("Private")))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = site(&server);
        config.connect_sid = Some("s3cret".into());
        let client = OriginClient::new(&config).unwrap();
        assert!(client.fetch_page("Private").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn proxy_url_replaces_api_base_only() {
        let proxy = MockServer::start().await;
        Mock::given(path("/api/pages/proj/A"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_json("A")))
            .expect(1)
            .mount(&proxy)
            .await;

        let mut config =
            SiteConfig::new("proj", "Home", Url::parse("https://scrapbox.io/").unwrap());
        config.proxy_url = Some(Url::parse(&format!("{}/", proxy.uri())).unwrap());
        let client = OriginClient::new(&config).unwrap();

        assert!(client.fetch_page("A").await.unwrap().is_some());
        assert_eq!(client.urls().browse("A"), "https://scrapbox.io/proj/A");
    }

    #[test]
    fn page_request_keys_are_stable() {
        let config = SiteConfig::new("proj", "Home", Url::parse("https://scrapbox.io/").unwrap());
        let client = OriginClient::new(&config).unwrap();
        let a = client.page_request("A").unwrap();
        let again = client.page_request("A").unwrap();
        let b = client.page_request("B").unwrap();
        assert_eq!(a.key, again.key);
        assert_ne!(a.key, b.key);
        assert_eq!(a.url.as_str(), "https://scrapbox.io/api/pages/proj/A");
    }

    // -----------------------------------------------------------------------
    // Images
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn head_image_reports_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/files/abc.png"))
            .respond_with(ResponseTemplate::new(200).insert_header("Content-Type", "image/png"))
            .mount(&server)
            .await;

        let config = site(&server);
        let client = OriginClient::new(&config).unwrap();
        let url = format!("{}files/abc.png", config.origin_base_url);
        let head = client.head_image(&url).await.unwrap().expect("head");
        assert_eq!(head.content_type.as_deref(), Some("image/png"));
        assert!(head.final_url.ends_with("/files/abc.png"));
    }

    #[tokio::test]
    async fn image_outside_origin_is_rejected() {
        let server = MockServer::start().await;
        let client = OriginClient::new(&site(&server)).unwrap();
        let err = client.head_image("https://gyazo.com/a.png").await.unwrap_err();
        assert!(matches!(err, WikiMirrorError::Validation { .. }));
    }
}
