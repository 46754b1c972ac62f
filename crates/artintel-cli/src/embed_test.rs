use artintel_core::NewArticle;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;

fn commented(id: &str, comments: &str) -> NewArticle {
    NewArticle {
        article_id: id.to_string(),
        art_date: None,
        month: None,
        year: None,
        compet_name: None,
        kpmg_total_impact: None,
        deloitte_total_impact: None,
        ey_total_impact: None,
        pwc_total_impact: None,
        issue: None,
        industry: None,
        comments: Some(comments.to_string()),
        spokesperson_name: None,
    }
}

async fn seed(pool: &sqlx::PgPool, count: usize) {
    for n in 0..count {
        artintel_db::upsert_article(pool, &commented(&format!("A-{n}"), "Rates held steady"))
            .await
            .unwrap_or_else(|e| panic!("seed failed for A-{n}: {e}"));
    }
}

fn client_for(server: &MockServer) -> OllamaClient {
    OllamaClient::with_base_url(&server.uri(), "all-minilm:l12-v2", "llama3.1", 5)
        .expect("client construction should not fail")
}

async fn embedded_count(pool: &sqlx::PgPool) -> i64 {
    artintel_db::embedding_status(pool)
        .await
        .expect("status failed")
        .embedded
}

#[test]
fn snippet_flattens_newlines() {
    assert_eq!(snippet(Some("rates\non hold")), "rates on hold");
}

#[test]
fn snippet_truncates_on_char_boundary() {
    let long = "é".repeat(100);
    assert_eq!(snippet(Some(&long)).chars().count(), SNIPPET_CHARS);
}

#[test]
fn snippet_of_missing_comment_is_empty() {
    assert_eq!(snippet(None), "");
}

#[sqlx::test(migrations = "../../migrations")]
async fn embed_pending_stops_at_limit(pool: sqlx::PgPool) {
    seed(&pool, 5).await;

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embeddings": [[0.1, 0.2, 0.3]]
            })),
        )
        .expect(3)
        .mount(&server)
        .await;

    let stored = embed_pending(&pool, &client_for(&server), 2, Some(3))
        .await
        .expect("embed loop failed");

    assert_eq!(stored, 3);
    assert_eq!(embedded_count(&pool).await, 3);
}

#[sqlx::test(migrations = "../../migrations")]
async fn embed_pending_stops_when_a_whole_batch_fails(pool: sqlx::PgPool) {
    seed(&pool, 3).await;

    let server = MockServer::start().await;
    // Only the first batch of two is attempted; its rows stay pending.
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
        .expect(2)
        .mount(&server)
        .await;

    let stored = embed_pending(&pool, &client_for(&server), 2, None)
        .await
        .expect("embed loop should end, not fail");

    assert_eq!(stored, 0);
    assert_eq!(embedded_count(&pool).await, 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn embed_pending_with_nothing_pending_makes_no_requests(pool: sqlx::PgPool) {
    artintel_db::upsert_article(&pool, &commented("A-short", "ok"))
        .await
        .expect("seed failed");

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let stored = embed_pending(&pool, &client_for(&server), 50, None)
        .await
        .expect("embed loop failed");

    assert_eq!(stored, 0);
}
