#![allow(clippy::missing_errors_doc)]
//! Request-level orchestration: load a window, summarize it, extract
//! metadata, persist.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::ai::provider::Provider;
use crate::ai::registry::ProviderRegistry;
use crate::core::config::AppConfig;
use crate::core::models::{Message, ProductMention, Summary, SummaryType};
use crate::errors::SummarizerError;
use crate::summarizer::hierarchical::{HierarchicalSummarizer, SummaryOutcome};
use crate::summarizer::parser::MetadataExtractor;
use crate::summarizer::sink::{PartialSummary, SummarySink};

/// Read side of the message store.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Messages of `chat_id` with `start <= timestamp <= end`, oldest first.
    async fn messages_in_range(
        &self,
        chat_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Message>>;
}

/// Write side for finished summaries.
#[async_trait]
pub trait SummaryStore: Send + Sync {
    /// Returns the id of the stored summary.
    async fn save_summary(&self, summary: &Summary) -> anyhow::Result<i64>;

    async fn save_product_mention(
        &self,
        summary_id: i64,
        product: &ProductMention,
    ) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRequest {
    pub chat_id: i64,
    pub group_name: String,
    pub summary_type: SummaryType,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreatedSummary {
    pub id: i64,
    pub summary: Summary,
    /// What the engine returned: the full text, or the completion notice
    /// when the text was streamed.
    pub outcome: SummaryOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChatStats {
    pub total_messages: usize,
    pub user_counts: BTreeMap<String, usize>,
    /// Highest count; ties go to the alphabetically first name.
    pub most_active_user: Option<String>,
}

/// Forwards to the caller's sink and keeps the raw partial texts.
struct TeeSink<'a> {
    inner: &'a dyn SummarySink,
    parts: Mutex<Vec<String>>,
}

impl SummarySink for TeeSink<'_> {
    fn on_progress(&self, message: &str) {
        self.inner.on_progress(message);
    }

    fn on_partial_result(&self, partial: &PartialSummary) {
        if let Ok(mut parts) = self.parts.lock() {
            parts.push(partial.text.clone());
        }
        self.inner.on_partial_result(partial);
    }
}

pub struct SummaryService {
    source: Arc<dyn MessageSource>,
    store: Arc<dyn SummaryStore>,
    engine: HierarchicalSummarizer,
    extractor: MetadataExtractor,
    min_messages: usize,
}

impl SummaryService {
    #[must_use]
    pub fn new(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        source: Arc<dyn MessageSource>,
        store: Arc<dyn SummaryStore>,
    ) -> Self {
        Self {
            source,
            store,
            engine: HierarchicalSummarizer::new(provider, config.chunking.clone(), config.timezone),
            extractor: MetadataExtractor::new(),
            min_messages: config.min_messages,
        }
    }

    /// Service backed by the configured (or built-in) provider registry.
    pub fn from_config(
        config: &AppConfig,
        source: Arc<dyn MessageSource>,
        store: Arc<dyn SummaryStore>,
    ) -> Result<Self, SummarizerError> {
        config.chunking.validate().map_err(SummarizerError::Config)?;
        let chain = ProviderRegistry::from_config(config)?.build_chain(config);
        if chain.is_empty() {
            return Err(SummarizerError::NoProviders);
        }
        Ok(Self::new(config, Arc::new(chain), source, store))
    }

    #[must_use]
    pub fn engine(&self) -> &HierarchicalSummarizer {
        &self.engine
    }

    /// Summarize one window and persist the result with its metadata.
    ///
    /// Streamed windows are stored as the partial texts joined in order.
    /// Failing to store a product mention is logged and skipped.
    pub async fn create_summary(
        &self,
        request: &SummaryRequest,
        sink: &dyn SummarySink,
        cancel: &CancellationToken,
    ) -> Result<CreatedSummary, SummarizerError> {
        info!(
            "Creating {} summary for chat {}",
            request.summary_type, request.chat_id
        );

        let messages = self
            .source
            .messages_in_range(request.chat_id, request.start, request.end)
            .await?;
        info!("Found {} messages in time range", messages.len());

        if messages.is_empty() {
            warn!("No messages to summarize");
            return Err(SummarizerError::NoMessages);
        }
        if messages.len() < self.min_messages {
            warn!("Too few messages to summarize ({})", messages.len());
            return Err(SummarizerError::InsufficientMessages {
                found: messages.len(),
                minimum: self.min_messages,
            });
        }

        let tee = TeeSink {
            inner: sink,
            parts: Mutex::new(Vec::new()),
        };
        let outcome = self
            .engine
            .summarize(
                &messages,
                &request.group_name,
                request.start,
                request.end,
                &tee,
                cancel,
            )
            .await?;

        let text = match &outcome {
            SummaryOutcome::Direct(text) => text.clone(),
            SummaryOutcome::Streamed { .. } => tee
                .parts
                .into_inner()
                .unwrap_or_default()
                .join("\n\n"),
        };

        let metadata = self.extractor.extract(&text);
        let summary = Summary {
            chat_id: request.chat_id,
            summary_type: request.summary_type,
            period_start: request.start,
            period_end: request.end,
            text,
            message_count: messages.len(),
            sentiment: metadata.sentiment,
            credibility_score: metadata.credibility_score,
            products: metadata.products,
            products_json: metadata.products_json,
            red_flags_count: metadata.red_flags_count,
            validation_status: metadata.validation_status,
        };

        let id = self.store.save_summary(&summary).await?;
        for product in &summary.products {
            if let Err(e) = self.store.save_product_mention(id, product).await {
                error!("Failed to save product mention {}: {}", product.name, e);
            }
        }

        info!(
            "Summary created (ID: {}, {} messages, {} products)",
            id,
            summary.message_count,
            summary.products.len()
        );
        Ok(CreatedSummary {
            id,
            summary,
            outcome,
        })
    }

    pub async fn chat_stats(
        &self,
        chat_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<ChatStats, SummarizerError> {
        let messages = self.source.messages_in_range(chat_id, start, end).await?;
        Ok(compute_stats(&messages))
    }
}

fn compute_stats(messages: &[Message]) -> ChatStats {
    let mut user_counts: BTreeMap<String, usize> = BTreeMap::new();
    for msg in messages {
        *user_counts.entry(msg.username.clone()).or_default() += 1;
    }

    let most_active_user = user_counts
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(name, _)| name.clone());

    ChatStats {
        total_messages: messages.len(),
        user_counts,
        most_active_user,
    }
}
