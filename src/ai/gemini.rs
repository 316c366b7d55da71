//! Primary backend: Google Gemini `generateContent`.
//!
//! Unlike the alternates, this provider retries on its own (3 attempts, fixed
//! delay) before the fallback chain sees a failure.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio_retry::Retry;
use tokio_retry::strategy::FixedInterval;
use tracing::{debug, info, warn};

use super::provider::Provider;
use crate::errors::SummarizerError;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const MAX_ATTEMPTS: usize = 3;
const RETRY_DELAY: Duration = Duration::from_secs(2);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
    #[serde(default)]
    total_token_count: u64,
}

pub struct GeminiClient {
    api_key: String,
    model: String,
    base_url: String,
    retry_delay: Duration,
    http: Client,
}

impl GeminiClient {
    #[must_use]
    pub fn new(api_key: String, model: String) -> Self {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            api_key,
            model,
            base_url: GEMINI_BASE_URL.to_string(),
            retry_delay: RETRY_DELAY,
            http,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    async fn call_api(&self, prompt: &str) -> Result<String, String> {
        info!("Calling Gemini API...");
        debug!("Prompt length: {} characters", prompt.chars().count());

        let url = format!("{}/{}:generateContent", self.base_url, self.model);
        let body = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: prompt }],
            }],
        };

        let started = Instant::now();
        let response = self
            .http
            .post(&url)
            .header("X-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("failed to send request: {e}"))?;
        debug!("API response received in {:?}", started.elapsed());

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!("Gemini API error (status {}): {}", status, error_text);
            return Err(format!("API error: status {}", status.as_u16()));
        }

        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(|e| format!("failed to parse response: {e}"))?;

        if let Some(usage) = &parsed.usage_metadata {
            debug!(
                "Tokens used: Prompt={}, Response={}, Total={}",
                usage.prompt_token_count, usage.candidates_token_count, usage.total_token_count
            );
        }

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| "no content in response".to_string())?;

        debug!("Summary length: {} characters", text.chars().count());
        Ok(text)
    }
}

#[async_trait]
impl Provider for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, SummarizerError> {
        let strategy = FixedInterval::new(self.retry_delay).take(MAX_ATTEMPTS - 1);
        let mut attempt = 0usize;

        Retry::spawn(strategy, || {
            attempt += 1;
            let current = attempt;
            async move {
                debug!("Gemini API call attempt {}/{}", current, MAX_ATTEMPTS);
                self.call_api(prompt).await.inspect_err(|e| {
                    warn!("Attempt {} failed: {}", current, e);
                })
            }
        })
        .await
        .map_err(|e| {
            SummarizerError::backend(
                self.name(),
                format!("failed after {MAX_ATTEMPTS} attempts: {e}"),
            )
        })
    }

    fn name(&self) -> String {
        format!("Gemini {}", self.model)
    }

    async fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }
}
