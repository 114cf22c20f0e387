//! HTTP backend tests against wiremock servers.

use std::time::Duration;

use serde_json::json;
use sift_core::{EmbeddingBackend, Error, RerankBackend};
use sift_inference::{HttpRerankBackend, OllamaBackend};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn ollama(server: &MockServer, dimension: usize) -> OllamaBackend {
    OllamaBackend::with_config(server.uri(), "nomic-embed-text".to_string(), dimension).unwrap()
}

#[tokio::test]
async fn test_ollama_embed_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({
            "model": "nomic-embed-text",
            "input": ["first", "second"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embeddings": [[0.1, 0.2, 0.3], [0.4, 0.5, 0.6]]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = ollama(&server, 3);
    let vectors = backend
        .embed_texts(&["first".to_string(), "second".to_string()])
        .await
        .unwrap();

    assert_eq!(vectors.len(), 2);
    assert_eq!(vectors[1].as_slice(), &[0.4, 0.5, 0.6]);
}

#[tokio::test]
async fn test_ollama_server_error_maps_to_embedding_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
        .mount(&server)
        .await;

    let err = ollama(&server, 3).embed("hello").await.unwrap_err();
    match err {
        Error::Embedding(msg) => assert!(msg.contains("model not loaded")),
        other => panic!("expected Embedding error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_ollama_dimension_mismatch_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "embeddings": [[0.1, 0.2]] })),
        )
        .mount(&server)
        .await;

    let err = ollama(&server, 3).embed("hello").await.unwrap_err();
    assert!(err.to_string().contains("dimension"));
}

#[tokio::test]
async fn test_ollama_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "embeddings": [[0.1, 0.2, 0.3]] }))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let backend = ollama(&server, 3).with_timeout(Duration::from_millis(50));
    assert!(matches!(
        backend.embed("hello").await,
        Err(Error::Embedding(_))
    ));
}

#[tokio::test]
async fn test_rerank_scores_reassembled_in_input_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rerank"))
        .and(body_partial_json(json!({
            "query": "postgres tuning",
            "texts": ["a", "b", "c"],
            "model": "bge"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "index": 2, "score": 0.95 },
            { "index": 0, "score": 0.40 },
            { "index": 1, "score": 0.05 }
        ])))
        .mount(&server)
        .await;

    let backend = HttpRerankBackend::new(server.uri(), "bge").unwrap();
    let scores = backend
        .score_pairs(
            "postgres tuning",
            &["a".to_string(), "b".to_string(), "c".to_string()],
        )
        .await
        .unwrap();

    assert_eq!(scores, vec![0.40, 0.05, 0.95]);
}

#[tokio::test]
async fn test_rerank_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rerank"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let backend = HttpRerankBackend::new(server.uri(), "bge").unwrap();
    let err = backend
        .score_pairs("q", &["a".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Rerank(_)));
}

#[tokio::test]
async fn test_rerank_health_check() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let backend = HttpRerankBackend::new(server.uri(), "bge").unwrap();
    assert!(backend.health_check().await.unwrap());
}

#[tokio::test]
async fn test_rerank_health_check_unhealthy_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let backend = HttpRerankBackend::new(server.uri(), "bge").unwrap();
    assert!(!backend.health_check().await.unwrap());
}

#[tokio::test]
async fn test_rerank_health_check_unreachable() {
    let backend = HttpRerankBackend::new("http://127.0.0.1:1", "bge")
        .unwrap()
        .with_timeout(Duration::from_millis(200));
    assert!(!backend.health_check().await.unwrap());
}
