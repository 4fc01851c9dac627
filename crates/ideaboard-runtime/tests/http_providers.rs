#![cfg(all(feature = "openai", feature = "gemini"))]

use std::sync::Arc;
use std::time::Duration;

use ideaboard_core::{Dimension, IdeaRecord};
use ideaboard_runtime::{
    CredentialStore, EvaluationOrchestrator, ProviderClient, ProviderContext, ProviderError,
    ProviderRegistry,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RATING_JSON: &str = r#"{"novelty": {"score": 8, "remark": "fresh"}, "feasibility": {"score": 6, "remark": "doable"}, "overall_impression": "Solid."}"#;

fn openai_compatible(server: &MockServer, store: &CredentialStore) -> Arc<dyn ProviderClient> {
    let ctx = ProviderContext::new(store, Duration::from_secs(5));
    ProviderRegistry::with_defaults()
        .create(
            "openai-compatible",
            &json!({
                "base_url": server.uri(),
                "model": "test-model",
                "api_key": "sk-test",
                "system_prompt": "You are a helpful assistant.",
                "max_tokens": 500
            }),
            &ctx,
        )
        .unwrap()
}

fn gemini(server: &MockServer, store: &CredentialStore) -> Arc<dyn ProviderClient> {
    let ctx = ProviderContext::new(store, Duration::from_secs(5));
    ProviderRegistry::with_defaults()
        .create("gemini", &json!({ "base_url": server.uri() }), &ctx)
        .unwrap()
}

fn chat_completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}

#[tokio::test]
async fn chat_completion_returns_message_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "test-model",
            "max_tokens": 500,
            "messages": [
                { "role": "system", "content": "You are a helpful assistant." },
                { "role": "user", "content": "Rate E1" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion("  rated  ")))
        .expect(1)
        .mount(&server)
        .await;

    let provider = openai_compatible(&server, &CredentialStore::new());
    let text = provider.generate("Rate E1").await.unwrap();

    assert_eq!(text, "rated");
    assert_eq!(provider.kind(), "openai-compatible");
}

#[tokio::test]
async fn unauthorized_maps_to_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "message": "Incorrect API key provided" }
        })))
        .mount(&server)
        .await;

    let err = openai_compatible(&server, &CredentialStore::new())
        .generate("Rate E1")
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::AuthError));
}

#[tokio::test]
async fn rate_limit_reports_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
        .mount(&server)
        .await;

    let err = openai_compatible(&server, &CredentialStore::new())
        .generate("Rate E1")
        .await
        .unwrap_err();

    match err {
        ProviderError::RateLimited { retry_after } => {
            assert_eq!(retry_after, Some(Duration::from_secs(7)))
        }
        other => panic!("expected rate limit, got {other}"),
    }
}

#[tokio::test]
async fn server_error_carries_provider_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": { "message": "The server had an error" }
        })))
        .mount(&server)
        .await;

    let err = openai_compatible(&server, &CredentialStore::new())
        .generate("Rate E1")
        .await
        .unwrap_err();

    match err {
        ProviderError::ApiError { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "The server had an error");
        }
        other => panic!("expected API error, got {other}"),
    }
}

#[tokio::test]
async fn empty_choices_is_a_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let err = openai_compatible(&server, &CredentialStore::new())
        .generate("Rate E1")
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::ParseError(_)));
}

#[tokio::test]
async fn gemini_joins_candidate_parts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-1.5-flash:generateContent"))
        .and(header("x-goog-api-key", "g-key"))
        .and(body_partial_json(json!({
            "contents": [{ "role": "user", "parts": [{ "text": "Rate E1" }] }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "{\"novelty\": " }, { "text": "{\"score\": 8}}\n" }] }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = CredentialStore::new().with("GOOGLE_API_KEY", "g-key");
    let text = gemini(&server, &store).generate("Rate E1").await.unwrap();

    assert_eq!(text, r#"{"novelty": {"score": 8}}"#);
}

#[tokio::test]
async fn orchestrator_isolates_http_failures() {
    let healthy = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion(RATING_JSON)))
        .mount(&healthy)
        .await;

    let broken = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-1.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&broken)
        .await;

    let store = CredentialStore::new().with("GOOGLE_API_KEY", "g-key");
    let orchestrator = EvaluationOrchestrator::builder()
        .provider("Compatible", openai_compatible(&healthy, &store))
        .provider("Gemini", gemini(&broken, &store))
        .build()
        .unwrap();

    let idea = IdeaRecord::new("E1", "Energy Coach", "Schedules appliances.");
    let evaluations = orchestrator.evaluate(&idea).await;

    let ratings = evaluations.get("Compatible").unwrap().ratings().unwrap();
    assert_eq!(ratings.get(Dimension::Novelty).unwrap().score, 8);
    assert_eq!(ratings.overall_impression.as_deref(), Some("Solid."));

    let failure = evaluations.get("Gemini").unwrap().failure().unwrap();
    assert!(failure.error.contains("503"));
    assert!(failure.error.contains("upstream unavailable"));
}
