//! chatsum - hierarchical summarization of group-chat message windows.
//!
//! Message windows of any size are cut into backend-sized chunks, summarized
//! through an ordered fallback chain of text-generation backends, merged back
//! into one narrative (streamed batch by batch for large windows), and parsed
//! into typed metadata for storage.
//!
//! # Architecture
//!
//! - `ai`: the `Provider` trait, the Gemini and query-string HTTP backends,
//!   the `FallbackChain` and the declarative `ProviderRegistry`
//! - `summarizer`: partitioner, prompt contract, streaming/recursive engine
//!   and the metadata extractor
//! - `service`: storage ports and the request-level `SummaryService`
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use chatsum::ai::ProviderRegistry;
//! use chatsum::core::config::AppConfig;
//! use chatsum::summarizer::{HierarchicalSummarizer, NoopSink};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     chatsum::setup_logging();
//!
//!     let config = AppConfig::from_env()?;
//!     let chain = ProviderRegistry::from_config(&config)?.build_chain(&config);
//!     let engine =
//!         HierarchicalSummarizer::new(Arc::new(chain), config.chunking.clone(), config.timezone);
//!
//!     let messages: Vec<chatsum::core::models::Message> = Vec::new(); // from your message store
//!     let end = chrono::Utc::now();
//!     let start = end - chrono::Duration::hours(24);
//!     let outcome = engine
//!         .summarize(&messages, "My Group", start, end, &NoopSink, &CancellationToken::new())
//!         .await?;
//!     println!("{}", outcome.text());
//!     Ok(())
//! }
//! ```

pub mod ai;
pub mod core;
pub mod errors;
pub mod service;
pub mod summarizer;

pub use errors::SummarizerError;

/// Configure structured JSON logging.
///
/// Honors `RUST_LOG` (default `info`). Calling it more than once is harmless;
/// later calls leave the first subscriber in place.
///
/// # Example
///
/// ```
/// chatsum::setup_logging();
/// ```
pub fn setup_logging() {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().json().with_target(true);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
