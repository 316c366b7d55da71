//! Declarative, ordered provider registry.
//!
//! The chain itself knows nothing about concrete backends; this module turns
//! an ordered list of [`ProviderSpec`] entries (built in, or JSON from
//! configuration) into a [`FallbackChain`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

use super::fallback::FallbackChain;
use super::gemini::GeminiClient;
use super::http_provider::{HttpTextProvider, ResponseEnvelope};
use super::provider::Provider;
use crate::core::config::AppConfig;
use crate::errors::SummarizerError;

const YUPRA_BASE: &str = "https://api.yupra.my.id/api/ai";
const DELINE_BASE: &str = "https://api.deline.web.id";
const ELRAYY_BASE: &str = "https://api.elrayyxml.web.id";
const DELINE_SYSTEM_PROMPT: &str =
    "You are a helpful AI assistant that creates concise summaries of conversations.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProviderSpec {
    /// The primary API. Key comes from `GEMINI_API_KEY`, never from the registry.
    Gemini {
        #[serde(default)]
        model: Option<String>,
        #[serde(default)]
        base_url: Option<String>,
    },
    Http {
        name: String,
        base_url: String,
        #[serde(default)]
        endpoint: String,
        #[serde(default)]
        envelope: ResponseEnvelope,
        #[serde(default)]
        strip_think_tags: bool,
        #[serde(default)]
        query: BTreeMap<String, String>,
        #[serde(default)]
        timeout_secs: Option<u64>,
    },
}

impl ProviderSpec {
    fn http(name: &str, base_url: &str, endpoint: &str, envelope: ResponseEnvelope) -> Self {
        ProviderSpec::Http {
            name: name.to_string(),
            base_url: base_url.to_string(),
            endpoint: endpoint.to_string(),
            envelope,
            strip_think_tags: false,
            query: BTreeMap::new(),
            timeout_secs: None,
        }
    }

    fn validate(&self) -> Result<(), SummarizerError> {
        match self {
            ProviderSpec::Gemini { base_url, .. } => {
                if let Some(base) = base_url {
                    Url::parse(base).map_err(|e| {
                        SummarizerError::Registry(format!("gemini base_url {base}: {e}"))
                    })?;
                }
                Ok(())
            }
            ProviderSpec::Http {
                name,
                base_url,
                endpoint,
                ..
            } => {
                if name.trim().is_empty() {
                    return Err(SummarizerError::Registry(
                        "http provider without a name".to_string(),
                    ));
                }
                if !endpoint.is_empty() && !endpoint.starts_with('/') {
                    return Err(SummarizerError::Registry(format!(
                        "{name}: endpoint must start with '/'"
                    )));
                }
                Url::parse(base_url)
                    .map_err(|e| SummarizerError::Registry(format!("{name}: base_url: {e}")))?;
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderRegistry {
    entries: Vec<ProviderSpec>,
}

impl Default for ProviderRegistry {
    /// Gemini first, then the Yupra, Deline and ElrayyXml alternates in
    /// descending quality order.
    fn default() -> Self {
        use ResponseEnvelope::{Flat, NestedText, RefinedResults};

        let mut ypai = ProviderSpec::http("YP AI", YUPRA_BASE, "/ypai", Flat);
        if let ProviderSpec::Http {
            strip_think_tags, ..
        } = &mut ypai
        {
            *strip_think_tags = true;
        }

        let mut deline_openai =
            ProviderSpec::http("OpenAI (Deline)", DELINE_BASE, "/ai/openai", Flat);
        if let ProviderSpec::Http { query, .. } = &mut deline_openai {
            query.insert("prompt".to_string(), DELINE_SYSTEM_PROMPT.to_string());
        }

        let entries = vec![
            ProviderSpec::Gemini {
                model: None,
                base_url: None,
            },
            ProviderSpec::http("Copilot Think Deeper", YUPRA_BASE, "/copilot-think", Flat),
            ProviderSpec::http("GPT-5 Smart", YUPRA_BASE, "/gpt5", Flat),
            ProviderSpec::http("Copilot Default", YUPRA_BASE, "/copilot", Flat),
            ypai,
            ProviderSpec::http(
                "Copilot Think (Deline)",
                DELINE_BASE,
                "/ai/copilot-think",
                NestedText,
            ),
            ProviderSpec::http("Copilot (Deline)", DELINE_BASE, "/ai/copilot", Flat),
            deline_openai,
            ProviderSpec::http("Venice AI (ElrayyXml)", ELRAYY_BASE, "/api/ai/veniceai", Flat),
            ProviderSpec::http(
                "PowerBrain AI (ElrayyXml)",
                ELRAYY_BASE,
                "/api/ai/powerbrainai",
                Flat,
            ),
            ProviderSpec::http("Lumin AI (ElrayyXml)", ELRAYY_BASE, "/api/ai/luminai", Flat),
            ProviderSpec::http("ChatGPT (ElrayyXml)", ELRAYY_BASE, "/api/ai/chatgpt", Flat),
            ProviderSpec::http(
                "Perplexity AI (ElrayyXml)",
                ELRAYY_BASE,
                "/api/ai/perplexityai",
                Flat,
            ),
            ProviderSpec::http("Felo AI (ElrayyXml)", ELRAYY_BASE, "/api/ai/feloai", Flat),
            ProviderSpec::http("Gemini (ElrayyXml)", ELRAYY_BASE, "/api/ai/gemini", Flat),
            ProviderSpec::http("Copilot (ElrayyXml)", ELRAYY_BASE, "/api/ai/copilot", Flat),
            ProviderSpec::http(
                "Alisia AI (ElrayyXml)",
                ELRAYY_BASE,
                "/api/ai/alisia",
                RefinedResults,
            ),
            ProviderSpec::http("BibleGPT (ElrayyXml)", ELRAYY_BASE, "/api/ai/biblegpt", Flat),
        ];

        Self { entries }
    }
}

impl ProviderRegistry {
    /// # Errors
    ///
    /// Returns `Registry` if any entry is malformed.
    pub fn new(entries: Vec<ProviderSpec>) -> Result<Self, SummarizerError> {
        for entry in &entries {
            entry.validate()?;
        }
        Ok(Self { entries })
    }

    /// Parse a JSON array of provider specs.
    ///
    /// # Errors
    ///
    /// Returns `Registry` for invalid JSON or invalid entries.
    pub fn from_json(raw: &str) -> Result<Self, SummarizerError> {
        let entries: Vec<ProviderSpec> =
            serde_json::from_str(raw).map_err(|e| SummarizerError::Registry(e.to_string()))?;
        Self::new(entries)
    }

    /// The configured registry, or the built-in one.
    ///
    /// # Errors
    ///
    /// Returns `Registry` if `PROVIDER_REGISTRY` is set but invalid.
    pub fn from_config(config: &AppConfig) -> Result<Self, SummarizerError> {
        match config.provider_registry.as_deref() {
            Some(raw) => Self::from_json(raw),
            None => Ok(Self::default()),
        }
    }

    #[must_use]
    pub fn entries(&self) -> &[ProviderSpec] {
        &self.entries
    }

    /// Instantiate every entry, in order. A Gemini entry without an API key
    /// is skipped.
    #[must_use]
    pub fn build_providers(&self, config: &AppConfig) -> Vec<Arc<dyn Provider>> {
        let mut providers: Vec<Arc<dyn Provider>> = Vec::with_capacity(self.entries.len());

        for entry in &self.entries {
            match entry {
                ProviderSpec::Gemini { model, base_url } => {
                    let Some(api_key) = config.gemini_api_key.clone() else {
                        warn!("GEMINI_API_KEY not set, skipping primary provider");
                        continue;
                    };
                    let model = model
                        .clone()
                        .unwrap_or_else(|| config.gemini_model.clone());
                    let mut client = GeminiClient::new(api_key, model);
                    if let Some(base) = base_url {
                        client = client.with_base_url(base.clone());
                    }
                    providers.push(Arc::new(client));
                }
                ProviderSpec::Http {
                    name,
                    base_url,
                    endpoint,
                    envelope,
                    strip_think_tags,
                    query,
                    timeout_secs,
                } => {
                    let url = format!("{}{}", base_url.trim_end_matches('/'), endpoint);
                    let mut provider = HttpTextProvider::new(name.clone(), url, *envelope)
                        .with_think_stripping(*strip_think_tags);
                    for (key, value) in query {
                        provider = provider.with_query(key.clone(), value.clone());
                    }
                    if let Some(secs) = timeout_secs {
                        provider = provider.with_timeout(Duration::from_secs(*secs));
                    }
                    providers.push(Arc::new(provider));
                }
            }
        }

        providers
    }

    #[must_use]
    pub fn build_chain(&self, config: &AppConfig) -> FallbackChain {
        let chain = FallbackChain::new(self.build_providers(config));
        info!("AI provider chain configured with {} providers", chain.len());
        chain
    }
}
