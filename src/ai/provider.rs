use async_trait::async_trait;

use crate::errors::SummarizerError;

/// A text-generation backend.
///
/// Implementations perform one outbound call per `generate`, normalize their
/// own response envelope to plain trimmed text, and collapse every failure
/// (transport, status, payload, explicit "not ok" flag) into an error the
/// caller treats as retryable on the next backend.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, SummarizerError>;

    fn name(&self) -> String;

    /// Advisory health check. Never consulted before a real call.
    async fn is_available(&self) -> bool;
}
