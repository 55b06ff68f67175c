//! Mock tests for the local chat backend
//!
//! WireMock stands in for the self-hosted chat API.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::core::{BackendKind, CallContext, ChatBackend};
    use crate::models::{ChatMessage, ChatRequest};
    use crate::services::local::LocalChatClient;

    fn create_test_client(mock_server: &MockServer) -> LocalChatClient {
        LocalChatClient::builder()
            .base_url(mock_server.uri())
            .default_model("llama3.1:8b")
            .alias("local")
            .timeout(Duration::from_secs(5))
            .build()
            .expect("Failed to build local client")
    }

    #[tokio::test]
    async fn test_chat_resolves_alias_and_maps_options() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(json!({
                "model": "llama3.1:8b",
                "stream": false,
                "messages": [{"role": "user", "content": "hello"}],
                "options": {"num_predict": 32, "temperature": 0.1}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "llama3.1:8b",
                "message": {"role": "assistant", "content": "hi there"},
                "done": true,
                "done_reason": "stop",
                "prompt_eval_count": 4,
                "eval_count": 3
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let mut request = ChatRequest::new("local", vec![ChatMessage::user("hello")]);
        request.stream = true;
        request.extra.insert("max_tokens".into(), json!(32));
        request.extra.insert("temperature".into(), json!(0.1));

        let reply = client.chat(request, &CallContext::new("req-1")).await.unwrap();
        assert_eq!(reply.kind, BackendKind::Local);
        assert_eq!(reply.model, "llama3.1:8b");
        assert_eq!(reply.body["message"]["content"], "hi there");
    }

    #[tokio::test]
    async fn test_chat_error_is_enveloped() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"error": "model not found"})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let request = ChatRequest::new("mistral:7b", vec![ChatMessage::user("hello")]);

        let err = client.chat(request, &CallContext::new("req-2")).await.unwrap_err();
        assert_eq!(err.status, 404);
        assert_eq!(err.body, Some(json!({"error": "model not found"})));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_502() {
        let client = LocalChatClient::builder()
            .base_url("http://127.0.0.1:9")
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap();
        let request = ChatRequest::new("", vec![ChatMessage::user("hello")]);

        let err = client.chat(request, &CallContext::new("req-3")).await.unwrap_err();
        assert!(err.status == 502 || err.status == 504);
        assert!(err.message.is_some());
    }

    #[tokio::test]
    async fn test_list_models_from_tags() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "models": [
                    {"name": "llama3.1:8b", "modified_at": "2024-05-01T10:00:00Z"},
                    {"name": "mistral:7b"}
                ]
            })))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let models = client.list_models().await.unwrap();

        assert_eq!(models.len(), 2);
        assert_eq!(models[0].id, "llama3.1:8b");
        assert_eq!(models[0].owned_by, "local");
        assert_eq!(models[0].created, 1714557600);
        assert_eq!(models[1].created, 0);
    }

    #[test]
    fn test_resolve_model() {
        let client = LocalChatClient::builder()
            .base_url("http://localhost:11434")
            .build()
            .unwrap();
        assert_eq!(client.resolve_model("local"), "llama3.1:8b");
        assert_eq!(client.resolve_model(""), "llama3.1:8b");
        assert_eq!(client.resolve_model("ollama/mistral:7b"), "mistral:7b");
        assert_eq!(client.resolve_model("local/local"), "llama3.1:8b");
    }
}
