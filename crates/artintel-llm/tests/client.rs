//! Integration tests for the model-server client using wiremock HTTP mocks.

use std::collections::BTreeMap;

use artintel_core::{AggregateReport, EMBEDDING_DIM};
use artintel_llm::{
    embed_for_storage, sql, ChatMessage, LlmError, OllamaClient, Summariser, EMPTY_SUMMARY,
};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(base_url: &str) -> OllamaClient {
    OllamaClient::with_base_url(base_url, "all-minilm:l12-v2", "llama3.1", 5)
        .expect("client construction should not fail")
}

fn chat_reply(content: &str) -> serde_json::Value {
    serde_json::json!({
        "model": "llama3.1",
        "message": { "role": "assistant", "content": content },
        "done": true
    })
}

fn sample_report() -> AggregateReport {
    AggregateReport {
        total_articles: Some(12),
        company_impact_field: Some("PwCTotalImpact".to_string()),
        avg_impact: Some(1.5),
        impact_distribution: Some(BTreeMap::from([("1_3".to_string(), 12)])),
        ..AggregateReport::default()
    }
}

#[tokio::test]
async fn embed_returns_first_vector() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(serde_json::json!({
            "model": "all-minilm:l12-v2",
            "input": "Rates on hold"
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "all-minilm:l12-v2",
                "embeddings": [[0.1, 0.2, 0.3]]
            })),
        )
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let vector = client.embed("Rates on hold").await.expect("should embed");

    assert_eq!(vector, vec![0.1_f32, 0.2, 0.3]);
}

#[tokio::test]
async fn embed_accepts_single_embedding_field() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "embedding": [1.0, -1.0] })),
        )
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let vector = client.embed("text").await.expect("should embed");

    assert_eq!(vector, vec![1.0_f32, -1.0]);
}

#[tokio::test]
async fn embed_without_vector_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "embeddings": []
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.embed("text").await.unwrap_err();

    assert!(matches!(err, LlmError::EmptyResponse(_)));
}

#[tokio::test]
async fn embed_for_storage_pads_to_column_width() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "embeddings": [[0.5, 0.5]]
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let vector = embed_for_storage(&client, "text").await.expect("should embed");

    assert_eq!(vector.len(), EMBEDDING_DIM);
    assert!((vector[1] - 0.5).abs() < f32::EPSILON);
    assert!(vector[2..].iter().all(|v| *v == 0.0));
}

#[tokio::test]
async fn chat_sends_non_streaming_request_and_trims_reply() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(serde_json::json!({
            "model": "llama3.1",
            "stream": false,
            "options": { "temperature": 0.0 },
            "messages": [{ "role": "user", "content": "hello" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply("  hi there \n")))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let reply = client
        .chat(&[ChatMessage::user("hello")], 0.0)
        .await
        .expect("should chat");

    assert_eq!(reply, "hi there");
}

#[tokio::test]
async fn chat_server_error_surfaces_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.chat(&[ChatMessage::user("x")], 0.0).await.unwrap_err();

    match err {
        LlmError::Api { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "model not loaded");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn chat_with_malformed_body_is_a_deserialize_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.chat(&[ChatMessage::user("x")], 0.0).await.unwrap_err();

    assert!(matches!(err, LlmError::Deserialize { .. }));
}

#[tokio::test]
async fn unreachable_server_is_classified() {
    // Port 1 on loopback refuses connections.
    let client = test_client("http://127.0.0.1:1");
    let err = client.embed("text").await.unwrap_err();

    assert!(matches!(err, LlmError::Unreachable(_)), "got {err:?}");
}

#[tokio::test]
async fn summariser_returns_model_reply() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(chat_reply("A quiet month for PwC.")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let summary = Summariser::new(&client).summarise(&sample_report()).await;

    assert_eq!(summary, "A quiet month for PwC.");
}

#[tokio::test]
async fn summariser_falls_back_when_model_fails() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let summary = Summariser::new(&client).summarise(&sample_report()).await;

    assert_eq!(summary, "Total articles: 12. Average impact: 1.50. Dist 1_3:12");
}

#[tokio::test]
async fn summariser_skips_model_for_empty_report() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply("unused")))
        .expect(0)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let report = AggregateReport::unreachable("aggregate connect: refused");
    let summary = Summariser::new(&client).summarise(&report).await;

    assert_eq!(summary, EMPTY_SUMMARY);
}

#[tokio::test]
async fn write_query_returns_cleaned_sql() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply(
            "```sql\nSELECT issue, COUNT(*) FROM articles GROUP BY issue;\n```",
        )))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let query = sql::write_query(&client, "Which issues come up most?")
        .await
        .expect("should write query");

    assert_eq!(query, "SELECT issue, COUNT(*) FROM articles GROUP BY issue");
}
