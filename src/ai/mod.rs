//! Text-generation backends and the fallback chain over them.

pub mod fallback;
pub mod gemini;
pub mod http_provider;
pub mod mock;
pub mod provider;
pub mod registry;

pub use fallback::{Attempt, FallbackChain, Generation};
pub use gemini::GeminiClient;
pub use http_provider::{HttpTextProvider, ResponseEnvelope};
pub use mock::MockProvider;
pub use provider::Provider;
pub use registry::{ProviderRegistry, ProviderSpec};
