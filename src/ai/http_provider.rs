//! Query-string text generators (`GET ...?text=<prompt>`).
//!
//! These services all wrap their answer in a small JSON envelope with a
//! boolean `status`; the shapes differ per endpoint, see [`ResponseEnvelope`].

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::provider::Provider;
use crate::errors::SummarizerError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Where the generated text lives in the response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseEnvelope {
    /// `{"status": true, "result": "..."}`
    #[default]
    Flat,
    /// `{"status": true, "result": {"text": "..."}}`
    NestedText,
    /// `{"status": true, "result": {"status": 200, "data": {"refined_results": "..."}}}`
    RefinedResults,
}

impl ResponseEnvelope {
    /// Pull the text out of a decoded body, honoring the `status` flags.
    pub fn extract(self, body: &Value) -> Result<String, String> {
        if !body.get("status").and_then(Value::as_bool).unwrap_or(false) {
            return Err("returned status false".to_string());
        }
        let result = body.get("result");

        let text = match self {
            ResponseEnvelope::Flat => result.and_then(Value::as_str),
            ResponseEnvelope::NestedText => result
                .and_then(|r| r.get("text"))
                .and_then(Value::as_str),
            ResponseEnvelope::RefinedResults => {
                let inner_status = result
                    .and_then(|r| r.get("status"))
                    .and_then(Value::as_i64)
                    .unwrap_or_default();
                if inner_status != 200 {
                    return Err(format!("returned status {inner_status}"));
                }
                result
                    .and_then(|r| r.get("data"))
                    .and_then(|d| d.get("refined_results"))
                    .and_then(Value::as_str)
            }
        };

        text.map(ToString::to_string)
            .ok_or_else(|| "no text in response".to_string())
    }
}

/// Remove `<think>...</think>` reasoning blocks some models prepend.
#[must_use]
pub fn strip_think_tags(text: &str) -> String {
    static THINK_RE: std::sync::LazyLock<Regex> = std::sync::LazyLock::new(|| {
        Regex::new(r"(?s)<think>.*?</think>")
            .unwrap_or_else(|_| Regex::new(r"$^").expect("fallback regex compiles"))
    });
    THINK_RE.replace_all(text, "").into_owned()
}

pub struct HttpTextProvider {
    name: String,
    url: String,
    extra_query: Vec<(String, String)>,
    envelope: ResponseEnvelope,
    strip_think: bool,
    http: Client,
}

impl HttpTextProvider {
    #[must_use]
    pub fn new(name: impl Into<String>, url: impl Into<String>, envelope: ResponseEnvelope) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            extra_query: Vec::new(),
            envelope,
            strip_think: false,
            http: build_client(DEFAULT_TIMEOUT),
        }
    }

    /// Additional fixed query parameter sent with every call.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_query.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_think_stripping(mut self, strip: bool) -> Self {
        self.strip_think = strip;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http = build_client(timeout);
        self
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call(&self, prompt: &str) -> Result<String, String> {
        let mut query: Vec<(&str, &str)> = vec![("text", prompt)];
        query.extend(self.extra_query.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        let response = self
            .http
            .get(&self.url)
            .query(&query)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("API error: status {}", status.as_u16()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| format!("failed to parse response: {e}"))?;

        let raw = self.envelope.extract(&body)?;
        let cleaned = if self.strip_think {
            strip_think_tags(&raw)
        } else {
            raw
        };

        let text = cleaned.trim();
        if text.is_empty() {
            return Err("empty result".to_string());
        }
        Ok(text.to_string())
    }
}

fn build_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| Client::new())
}

#[async_trait]
impl Provider for HttpTextProvider {
    async fn generate(&self, prompt: &str) -> Result<String, SummarizerError> {
        debug!("Calling {} ({} chars)", self.name, prompt.chars().count());
        self.call(prompt)
            .await
            .map_err(|reason| SummarizerError::backend(&self.name, reason))
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    /// Sends `text=test` to the configured endpoint; any 2xx counts.
    async fn is_available(&self) -> bool {
        self.http
            .get(&self.url)
            .query(&[("text", "test")])
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}
