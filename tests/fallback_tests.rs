use std::sync::Arc;
use std::time::Duration;

use chatsum::ai::{
    FallbackChain, GeminiClient, HttpTextProvider, MockProvider, Provider, ProviderRegistry,
    ResponseEnvelope,
};
use chatsum::core::config::AppConfig;
use chatsum::errors::SummarizerError;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn http(server: &MockServer, name: &str, endpoint: &str, envelope: ResponseEnvelope) -> Arc<dyn Provider> {
    Arc::new(HttpTextProvider::new(
        name,
        format!("{}{}", server.uri(), endpoint),
        envelope,
    ))
}

#[tokio::test]
async fn test_chain_skips_failing_http_backends() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gpt5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": false})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/copilot"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/alisia"))
        .and(query_param("text", "ringkas"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": true,
            "result": {"status": 200, "data": {"refined_results": " X "}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let chain = FallbackChain::new(vec![
        http(&server, "A", "/gpt5", ResponseEnvelope::Flat),
        http(&server, "B", "/copilot", ResponseEnvelope::Flat),
        http(&server, "C", "/alisia", ResponseEnvelope::RefinedResults),
    ]);

    let generation = chain.generate_detailed("ringkas").await.unwrap();

    assert_eq!(generation.text, "X");
    assert_eq!(generation.provider, "C");
    assert_eq!(generation.attempts.len(), 3);
    assert_eq!(
        generation.attempts[0].error.as_deref(),
        Some("A failed: returned status false")
    );
    assert_eq!(
        generation.attempts[1].error.as_deref(),
        Some("B failed: API error: status 500")
    );
}

#[tokio::test]
async fn test_gemini_retries_before_chain_moves_on() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/gemini-test:generateContent"))
        .respond_with(ResponseTemplate::new(429))
        .expect(3)
        .mount(&server)
        .await;

    let gemini = GeminiClient::new("key".to_string(), "gemini-test".to_string())
        .with_base_url(server.uri())
        .with_retry_delay(Duration::from_millis(1));
    let backup = Arc::new(MockProvider::replying("backup", "from backup"));
    let chain = FallbackChain::new(vec![
        Arc::new(gemini) as Arc<dyn Provider>,
        backup.clone() as Arc<dyn Provider>,
    ]);

    assert_eq!(chain.generate("p").await.unwrap(), "from backup");
    assert_eq!(backup.calls(), 1);
}

#[tokio::test]
async fn test_all_failing_names_attempt_count() {
    let chain = FallbackChain::new(
        [("A", "down"), ("B", "down"), ("C", "rate limited")]
            .into_iter()
            .map(|(name, reason)| Arc::new(MockProvider::failing(name, reason)) as Arc<dyn Provider>)
            .collect(),
    );

    let err = chain.generate("p").await.unwrap_err();
    assert_eq!(err.attempts(), Some(3));
    match err {
        SummarizerError::AllProvidersFailed { last, .. } => {
            assert_eq!(last.to_string(), "C failed: rate limited");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_registry_chain_runs_against_local_backends() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ai/copilot-think"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ai/openai"))
        .and(query_param("prompt", "be brief"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": true, "result": "<think>hmm</think>done"})),
        )
        .mount(&server)
        .await;

    let registry_json = json!([
        {"kind": "gemini"},
        {"kind": "http", "name": "Think", "base_url": server.uri(), "endpoint": "/ai/copilot-think",
         "envelope": "nested_text"},
        {"kind": "http", "name": "OpenAI", "base_url": server.uri(), "endpoint": "/ai/openai",
         "strip_think_tags": true, "query": {"prompt": "be brief"}, "timeout_secs": 5}
    ])
    .to_string();
    let config = AppConfig {
        provider_registry: Some(registry_json),
        ..AppConfig::default()
    };

    let chain = ProviderRegistry::from_config(&config)
        .unwrap()
        .build_chain(&config);

    // No GEMINI_API_KEY: the gemini entry is skipped.
    assert_eq!(chain.provider_names(), vec!["Think", "OpenAI"]);
    assert_eq!(chain.generate("hello").await.unwrap(), "done");
}
