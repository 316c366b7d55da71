//! Ordered retry across interchangeable backends.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use super::provider::Provider;
use crate::errors::SummarizerError;

/// One provider call made by the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub provider: String,
    /// `None` when the call succeeded.
    pub error: Option<String>,
}

/// Successful chain call with the trail of attempts that led to it.
#[derive(Debug, Clone)]
pub struct Generation {
    pub text: String,
    pub provider: String,
    pub attempts: Vec<Attempt>,
}

/// Providers tried in a fixed order until one succeeds. The order encodes a
/// quality/cost preference; it is not load balancing.
#[derive(Clone)]
pub struct FallbackChain {
    providers: Vec<Arc<dyn Provider>>,
}

impl FallbackChain {
    #[must_use]
    pub fn new(providers: Vec<Arc<dyn Provider>>) -> Self {
        Self { providers }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    #[must_use]
    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// # Errors
    ///
    /// `NoProviders` for an empty chain, `AllProvidersFailed` carrying the
    /// attempt count and the last provider error when nobody succeeds.
    pub async fn generate_detailed(&self, prompt: &str) -> Result<Generation, SummarizerError> {
        if self.providers.is_empty() {
            return Err(SummarizerError::NoProviders);
        }

        let total = self.providers.len();
        let mut attempts = Vec::with_capacity(total);
        let mut last_error = None;

        for (i, provider) in self.providers.iter().enumerate() {
            let provider_name = provider.name();
            info!("Trying provider {}/{}: {}", i + 1, total, provider_name);

            match provider.generate(prompt).await {
                Ok(text) => {
                    info!("Success with {}", provider_name);
                    attempts.push(Attempt {
                        provider: provider_name.clone(),
                        error: None,
                    });
                    return Ok(Generation {
                        text,
                        provider: provider_name,
                        attempts,
                    });
                }
                Err(e) => {
                    warn!("{} failed: {}", provider_name, e);
                    attempts.push(Attempt {
                        provider: provider_name,
                        error: Some(e.to_string()),
                    });
                    last_error = Some(e);
                }
            }
        }

        Err(SummarizerError::AllProvidersFailed {
            attempts: attempts.len(),
            last: Box::new(last_error.unwrap_or(SummarizerError::NoProviders)),
        })
    }
}

#[async_trait]
impl Provider for FallbackChain {
    async fn generate(&self, prompt: &str) -> Result<String, SummarizerError> {
        self.generate_detailed(prompt).await.map(|g| g.text)
    }

    fn name(&self) -> String {
        format!("Fallback Chain: {}", self.provider_names().join(" → "))
    }

    async fn is_available(&self) -> bool {
        for provider in &self.providers {
            if provider.is_available().await {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::mock::MockProvider;

    fn chain_of(providers: Vec<Arc<MockProvider>>) -> FallbackChain {
        FallbackChain::new(
            providers
                .into_iter()
                .map(|p| p as Arc<dyn Provider>)
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_returns_first_success_after_failures() {
        let a = Arc::new(MockProvider::failing("A", "rate limited"));
        let b = Arc::new(MockProvider::failing("B", "status 500"));
        let c = Arc::new(MockProvider::replying("C", "X"));
        let chain = chain_of(vec![a.clone(), b.clone(), c.clone()]);

        let generation = chain.generate_detailed("prompt").await.unwrap();

        assert_eq!(generation.text, "X");
        assert_eq!(generation.provider, "C");
        assert_eq!(generation.attempts.len(), 3);
        assert!(generation.attempts[0].error.is_some());
        assert!(generation.attempts[2].error.is_none());
        assert_eq!((a.calls(), b.calls(), c.calls()), (1, 1, 1));
    }

    #[tokio::test]
    async fn test_stops_at_first_success() {
        let a = Arc::new(MockProvider::replying("A", "first"));
        let b = Arc::new(MockProvider::replying("B", "second"));
        let chain = chain_of(vec![a, b.clone()]);

        assert_eq!(chain.generate("p").await.unwrap(), "first");
        assert_eq!(b.calls(), 0);
    }

    #[tokio::test]
    async fn test_all_failing_reports_attempts_and_last_error() {
        let chain = chain_of(vec![
            Arc::new(MockProvider::failing("A", "a down")),
            Arc::new(MockProvider::failing("B", "b down")),
            Arc::new(MockProvider::failing("C", "c down")),
        ]);

        let err = chain.generate("p").await.unwrap_err();

        assert_eq!(err.attempts(), Some(3));
        let msg = err.to_string();
        assert!(msg.contains("all 3 providers failed"), "{msg}");
        assert!(msg.contains("c down"), "{msg}");
    }

    #[tokio::test]
    async fn test_empty_chain_is_an_error() {
        let chain = FallbackChain::new(Vec::new());
        assert!(matches!(
            chain.generate("p").await,
            Err(SummarizerError::NoProviders)
        ));
        assert!(!chain.is_available().await);
    }

    #[tokio::test]
    async fn test_available_if_any_member_available() {
        let chain = chain_of(vec![
            Arc::new(MockProvider::failing("A", "x").with_available(false)),
            Arc::new(MockProvider::replying("B", "y")),
        ]);
        assert!(chain.is_available().await);
        assert_eq!(chain.name(), "Fallback Chain: A → B");
    }
}
