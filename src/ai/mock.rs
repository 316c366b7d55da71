use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::provider::Provider;
use crate::errors::SummarizerError;

type Responder = dyn Fn(&str, usize) -> Result<String, String> + Send + Sync;

/// Deterministic in-process provider for tests and dry runs.
///
/// The responder receives the prompt and the zero-based call index. Every
/// prompt is recorded so callers can assert on what was sent.
pub struct MockProvider {
    name: String,
    available: bool,
    responder: Box<Responder>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockProvider {
    pub fn new<F>(name: impl Into<String>, responder: F) -> Self
    where
        F: Fn(&str, usize) -> Result<String, String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            available: true,
            responder: Box::new(responder),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(name: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new(name, move |_, _| Ok(text.clone()))
    }

    pub fn failing(name: impl Into<String>, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self::new(name, move |_, _| Err(reason.clone()))
    }

    #[must_use]
    pub fn with_available(mut self, available: bool) -> Self {
        self.available = available;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn generate(&self, prompt: &str) -> Result<String, SummarizerError> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        (self.responder)(prompt, index).map_err(|reason| SummarizerError::backend(&self.name, reason))
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    async fn is_available(&self) -> bool {
        self.available
    }
}
