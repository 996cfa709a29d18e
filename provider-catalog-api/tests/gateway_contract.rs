use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bytes::Bytes;
use core_catalog::{CatalogGateway, VideoLookup};
use mockall::mock;
use provider_catalog_api::HttpCatalogGateway;
use std::collections::HashMap;
use std::sync::Arc;

mock! {
    HttpClient {}

    #[async_trait]
    impl HttpClient for HttpClient {
        async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
    }
}

#[tokio::test]
async fn test_empty_lookup_fails_before_any_request() {
    let mut mock_http = MockHttpClient::new();
    mock_http.expect_execute().times(0);

    let gateway = HttpCatalogGateway::new(Arc::new(mock_http), "http://localhost:8000/api");

    let err = gateway
        .fetch_video_detail(&VideoLookup::default())
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert_eq!(err.to_string(), "Validation failed: bvid或aid至少需要提供一个");

    let blank = VideoLookup {
        bvid: Some("   ".to_string()),
        aid: Some(0),
    };
    assert!(gateway.fetch_video_detail(&blank).await.unwrap_err().is_validation());
}

#[tokio::test]
async fn test_server_error_without_json_detail_uses_body_text() {
    let mut mock_http = MockHttpClient::new();
    mock_http.expect_execute().times(1).returning(|_| {
        Ok(HttpResponse {
            status: 502,
            headers: HashMap::new(),
            body: Bytes::from("Bad Gateway"),
        })
    });

    let gateway = HttpCatalogGateway::new(Arc::new(mock_http), "http://localhost:8000/api");
    let err = gateway.crawl_status().await.unwrap_err();

    assert_eq!(err.status(), Some(502));
    assert_eq!(err.to_string(), "Bad Gateway");
}
