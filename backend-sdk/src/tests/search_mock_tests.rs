//! Mock tests for the tool-search client

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use config_rs::Secret;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::core::CallContext;
    use crate::services::search::{SearchTool, ToolSearchClient};

    fn create_test_client(mock_server: &MockServer) -> ToolSearchClient {
        ToolSearchClient::builder()
            .base_url(format!("{}/tools", mock_server.uri()))
            .api_key(Secret::new("tools-key"))
            .timeout(Duration::from_secs(5))
            .build()
            .expect("Failed to build tool-search client")
    }

    #[tokio::test]
    async fn test_web_search_forwards_arguments() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/tools/web_search"))
            .and(header("authorization", "Bearer tools-key"))
            .and(header("X-Request-ID", "session-1"))
            .and(body_json(json!({"query": "rust async runtimes"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{"title": "Tokio", "url": "https://tokio.rs"}]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let result = client
            .web_search(json!({"query": "rust async runtimes"}), &CallContext::new("session-1"))
            .await
            .unwrap();

        assert_eq!(result["results"][0]["title"], "Tokio");
    }

    #[tokio::test]
    async fn test_keyword_search_single_attempt() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/tools/keyword_search"))
            .and(header_exists("X-Request-ID"))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({"error": "down"})))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let err = client
            .call(SearchTool::KeywordSearch, json!({"keywords": ["a"]}), &CallContext::new("s"))
            .await
            .unwrap_err();

        assert_eq!(err.status, 503);
        assert_eq!(err.body, Some(json!({"error": "down"})));
    }
}
