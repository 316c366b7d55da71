//! Chunk, summarize, merge and stream.
//!
//! Small windows go to the backend in one call. Larger windows are cut into
//! chunks; chunks are processed in batches, each batch's chunk summaries are
//! merged into one text and streamed to the caller before the next batch
//! starts. Merges that would not fit one prompt are split and merged level by
//! level, up to `max_recursion_depth`.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use futures::{StreamExt, TryStreamExt, stream};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use super::chunker::{Chunk, Chunker};
use super::formatter::SummaryFormatter;
use super::prompts::{DefaultPrompts, PromptTemplates};
use super::sink::{PartialSummary, SummarySink};
use crate::ai::provider::Provider;
use crate::core::config::ChunkingConfig;
use crate::core::models::Message;
use crate::errors::SummarizerError;

/// What a `summarize` call produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryOutcome {
    /// The window fit one call; this is the whole summary.
    Direct(String),
    /// The summary went out through `on_partial_result`; `notice` is the
    /// completion marker.
    Streamed { parts: usize, notice: String },
}

impl SummaryOutcome {
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            SummaryOutcome::Direct(text) => text,
            SummaryOutcome::Streamed { notice, .. } => notice,
        }
    }

    #[must_use]
    pub fn is_streamed(&self) -> bool {
        matches!(self, SummaryOutcome::Streamed { .. })
    }
}

/// Per-request state threaded through the pipeline.
struct Run<'a> {
    group_name: &'a str,
    sink: &'a dyn SummarySink,
    cancel: &'a CancellationToken,
}

impl Run<'_> {
    fn progress(&self, message: &str) {
        self.sink.on_progress(message);
        info!("Progress: {}", message);
    }

    fn ensure_active(&self) -> Result<(), SummarizerError> {
        if self.cancel.is_cancelled() {
            return Err(SummarizerError::Cancelled);
        }
        Ok(())
    }
}

pub struct HierarchicalSummarizer {
    provider: Arc<dyn Provider>,
    prompts: Arc<dyn PromptTemplates>,
    chunker: Chunker,
    formatter: SummaryFormatter,
    tz: Tz,
}

impl HierarchicalSummarizer {
    /// Engine with the built-in prompts.
    #[must_use]
    pub fn new(provider: Arc<dyn Provider>, config: ChunkingConfig, tz: Tz) -> Self {
        Self {
            provider,
            prompts: Arc::new(DefaultPrompts),
            chunker: Chunker::new(config, tz),
            formatter: SummaryFormatter::new(tz),
            tz,
        }
    }

    #[must_use]
    pub fn with_prompts(mut self, prompts: Arc<dyn PromptTemplates>) -> Self {
        self.prompts = prompts;
        self
    }

    #[must_use]
    pub fn chunker(&self) -> &Chunker {
        &self.chunker
    }

    fn config(&self) -> &ChunkingConfig {
        self.chunker.config()
    }

    /// Summarize a message window, streaming merged batches for large ones.
    ///
    /// # Errors
    ///
    /// `NoMessages` for an empty window. Any chunk or merge failure aborts the
    /// request and comes back annotated with the failing chunk, batch or
    /// group; partials already delivered stay delivered. `Cancelled` once
    /// `cancel` fires.
    pub async fn summarize(
        &self,
        messages: &[Message],
        group_name: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        sink: &dyn SummarySink,
        cancel: &CancellationToken,
    ) -> Result<SummaryOutcome, SummarizerError> {
        let span = info_span!(
            "summarize",
            request_id = %Uuid::new_v4(),
            group = group_name,
            messages = messages.len()
        );

        async move {
            if messages.is_empty() {
                return Err(SummarizerError::NoMessages);
            }
            info!(
                "Starting hierarchical summarization for {} messages from {}",
                messages.len(),
                group_name
            );

            let run = Run {
                group_name,
                sink,
                cancel,
            };

            if !self.chunker.should_split_messages(messages) {
                info!("Messages small enough for direct summarization");
                run.progress("Generating summary...");
                let text = self.summarize_direct(&run, messages, start, end).await?;
                return Ok(SummaryOutcome::Direct(text));
            }

            info!("Messages too large, using streaming summarization");
            run.progress("Chat is large, using streaming multi-part summarization...");
            self.summarize_streaming(&run, messages).await
        }
        .instrument(span)
        .await
    }

    /// Summarize a window into one final text, however large, without
    /// streaming partials.
    ///
    /// # Errors
    ///
    /// As [`summarize`](Self::summarize), plus `RecursionLimitExceeded` when
    /// the chunk summaries cannot be merged within the depth bound.
    pub async fn summarize_complete(
        &self,
        messages: &[Message],
        group_name: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        sink: &dyn SummarySink,
        cancel: &CancellationToken,
    ) -> Result<String, SummarizerError> {
        let span = info_span!(
            "summarize_complete",
            request_id = %Uuid::new_v4(),
            group = group_name,
            messages = messages.len()
        );

        async move {
            if messages.is_empty() {
                return Err(SummarizerError::NoMessages);
            }
            let run = Run {
                group_name,
                sink,
                cancel,
            };

            if !self.chunker.should_split_messages(messages) {
                run.progress("Generating summary...");
                return self.summarize_direct(&run, messages, start, end).await;
            }

            let chunks = self.chunker.split_messages(messages);
            let summaries = self.summarize_chunks(&run, &chunks, chunks.len()).await?;

            run.progress(&format!("🔄 Merging {} summaries...", summaries.len()));
            self.merge_levels(&run, summaries, start, end).await
        }
        .instrument(span)
        .await
    }

    /// Merge summaries into one, splitting into groups and merging level by
    /// level while the input does not fit one prompt.
    ///
    /// # Errors
    ///
    /// `RecursionLimitExceeded` past `max_recursion_depth` levels, otherwise
    /// the first failing merge annotated with its group.
    pub async fn merge_recursive(
        &self,
        summaries: &[String],
        group_name: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        sink: &dyn SummarySink,
        cancel: &CancellationToken,
    ) -> Result<String, SummarizerError> {
        let run = Run {
            group_name,
            sink,
            cancel,
        };
        self.merge_levels(&run, summaries.to_vec(), start, end).await
    }

    async fn summarize_streaming(
        &self,
        run: &Run<'_>,
        messages: &[Message],
    ) -> Result<SummaryOutcome, SummarizerError> {
        let chunks = self.chunker.split_messages(messages);
        let total_chunks = chunks.len();
        let per_batch = self.config().chunks_per_batch.max(1);
        let total_batches = total_chunks.div_ceil(per_batch);

        info!(
            "Will process {} chunks in {} batches ({} chunks per batch)",
            total_chunks, total_batches, per_batch
        );

        for (batch_idx, batch) in chunks.chunks(per_batch).enumerate() {
            let part = batch_idx + 1;
            let (Some(first), Some(last)) = (batch.first(), batch.last()) else {
                continue;
            };
            let batch_messages: usize = batch.iter().map(Chunk::len).sum();

            run.progress(&format!(
                "📦 Processing batch {}/{} ({} chunks, {} messages)...",
                part,
                total_batches,
                batch.len(),
                batch_messages
            ));

            let summaries = self.summarize_chunks(run, batch, total_chunks).await?;

            run.progress(&format!(
                "🔄 Merging batch {}/{} ({} summaries)...",
                part,
                total_batches,
                summaries.len()
            ));
            let merged = self
                .merge_levels(run, summaries, first.start, last.end)
                .await
                .map_err(|e| {
                    error!("Failed to merge batch {}: {}", part, e);
                    SummarizerError::BatchMergeFailed {
                        batch: part,
                        total: total_batches,
                        source: Box::new(e),
                    }
                })?;
            info!(
                "Batch {}/{} merged ({} chars)",
                part,
                total_batches,
                merged.chars().count()
            );

            run.ensure_active()?;
            let rendered = self.formatter.format_partial_summary(
                &merged,
                part,
                total_batches,
                run.group_name,
                first.start,
                last.end,
                batch_messages,
            );
            run.sink.on_partial_result(&PartialSummary {
                part,
                total: total_batches,
                text: merged,
                rendered,
                period_start: first.start,
                period_end: last.end,
                message_count: batch_messages,
            });
            info!("Sent partial summary {}/{}", part, total_batches);
        }

        Ok(SummaryOutcome::Streamed {
            parts: total_batches,
            notice: self.formatter.format_completion_message(total_batches),
        })
    }

    /// Summarize chunks with at most `chunk_concurrency` calls in flight.
    /// Results come back in chunk order; the first failure stops the rest.
    async fn summarize_chunks(
        &self,
        run: &Run<'_>,
        chunks: &[Chunk<'_>],
        total_chunks: usize,
    ) -> Result<Vec<String>, SummarizerError> {
        let concurrency = self.config().chunk_concurrency.max(1);

        stream::iter(chunks.iter().map(|chunk| async move {
            let number = chunk.index + 1;
            run.progress(&format!(
                "📝 Processing chunk {}/{} ({} messages)...",
                number,
                total_chunks,
                chunk.len()
            ));

            let summary = self
                .summarize_direct(run, chunk.messages, chunk.start, chunk.end)
                .await
                .map_err(|e| {
                    error!("Failed to summarize chunk {}: {}", number, e);
                    SummarizerError::ChunkFailed {
                        chunk: number,
                        total: total_chunks,
                        source: Box::new(e),
                    }
                })?;

            info!(
                "Chunk {}/{} completed ({} chars)",
                number,
                total_chunks,
                summary.chars().count()
            );
            Ok::<_, SummarizerError>(summary)
        }))
        .buffered(concurrency)
        .try_collect()
        .await
    }

    /// Levels are numbered from 1; at most `max_recursion_depth` of them run.
    async fn merge_levels(
        &self,
        run: &Run<'_>,
        summaries: Vec<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<String, SummarizerError> {
        let max_depth = self.config().max_recursion_depth;
        let mut current = summaries;
        let mut depth = 1;

        loop {
            if depth > max_depth {
                return Err(SummarizerError::RecursionLimitExceeded { max_depth });
            }
            info!("Merging {} summaries at depth {}", current.len(), depth);

            if !self.chunker.should_split_summaries(&current) {
                return self.merge_direct(run, &current, start, end).await;
            }
            if current.len() == 1 {
                warn!("Single summary exceeds the merge budget, merging it as is");
                return self.merge_direct(run, &current, start, end).await;
            }

            run.progress("⚙️ Summaries too large, doing multi-level merge...");
            let groups = self.chunker.split_summaries(&current);
            let total = groups.len();
            let mut merged = Vec::with_capacity(total);

            for (i, group) in groups.iter().enumerate() {
                run.progress(&format!(
                    "🔄 Merging group {}/{} ({} summaries)...",
                    i + 1,
                    total,
                    group.len()
                ));
                let text = self
                    .merge_direct(run, group, start, end)
                    .await
                    .map_err(|e| SummarizerError::GroupMergeFailed {
                        group: i + 1,
                        total,
                        depth,
                        source: Box::new(e),
                    })?;
                merged.push(text);
            }

            current = merged;
            depth += 1;
        }
    }

    async fn summarize_direct(
        &self,
        run: &Run<'_>,
        messages: &[Message],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<String, SummarizerError> {
        let formatted = self.chunker.format_messages(messages);
        let prompt = self.prompts.render_chunk_prompt(
            &formatted,
            run.group_name,
            start.with_timezone(&self.tz),
            end.with_timezone(&self.tz),
        );
        debug!(
            "Direct summarization of {} messages, prompt size {} chars",
            messages.len(),
            prompt.chars().count()
        );
        self.generate(run, &prompt).await
    }

    async fn merge_direct(
        &self,
        run: &Run<'_>,
        summaries: &[String],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<String, SummarizerError> {
        let count = summaries.len();
        let combined: String = summaries
            .iter()
            .enumerate()
            .map(|(i, s)| format!("\n## Part {}/{}:\n{}\n", i + 1, count, s))
            .collect();

        let prompt = self.prompts.render_merge_prompt(
            &combined,
            run.group_name,
            start.with_timezone(&self.tz),
            end.with_timezone(&self.tz),
        );
        debug!(
            "Direct merge of {} summaries, prompt size {} chars",
            count,
            prompt.chars().count()
        );
        self.generate(run, &prompt).await
    }

    /// One backend call. Refused once cancelled; a result that arrives after
    /// cancellation is dropped.
    async fn generate(&self, run: &Run<'_>, prompt: &str) -> Result<String, SummarizerError> {
        run.ensure_active()?;

        #[cfg(feature = "debug-logs")]
        debug!(prompt = %prompt, "Backend prompt");

        let text = tokio::select! {
            biased;
            () = run.cancel.cancelled() => {
                warn!("Summarization cancelled during backend call");
                return Err(SummarizerError::Cancelled);
            }
            result = self.provider.generate(prompt) => result?,
        };

        info!("Summary generated: {} chars", text.chars().count());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::mock::MockProvider;
    use crate::summarizer::sink::{CallbackSink, NoopSink};
    use chrono::{Duration, TimeZone};
    use std::sync::Mutex;

    fn messages(n: usize) -> Vec<Message> {
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 1, 0, 0).unwrap();
        (0..n)
            .map(|i| {
                Message::new(
                    -42,
                    (i % 5) as i64,
                    format!("user{}", i % 5),
                    format!("message number {i}"),
                    base + Duration::minutes(i as i64),
                )
            })
            .collect()
    }

    fn engine(provider: Arc<MockProvider>, config: ChunkingConfig) -> HierarchicalSummarizer {
        HierarchicalSummarizer::new(provider, config, chrono_tz::Asia::Jakarta)
    }

    fn window() -> (DateTime<Utc>, DateTime<Utc>) {
        (
            Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_direct_mode_single_call() {
        let provider = Arc::new(MockProvider::replying("mock", "full summary"));
        let summarizer = engine(provider.clone(), ChunkingConfig::default());
        let (start, end) = window();

        let outcome = summarizer
            .summarize(&messages(30), "G", start, end, &NoopSink, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome, SummaryOutcome::Direct("full summary".to_string()));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_window_rejected() {
        let provider = Arc::new(MockProvider::replying("mock", "x"));
        let summarizer = engine(provider.clone(), ChunkingConfig::default());
        let (start, end) = window();

        let err = summarizer
            .summarize(&[], "G", start, end, &NoopSink, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SummarizerError::NoMessages));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_streaming_75_messages_one_batch() {
        let provider = Arc::new(MockProvider::new("mock", |prompt, i| {
            if prompt.starts_with("Combine") {
                Ok("merged".to_string())
            } else {
                Ok(format!("chunk summary {i}"))
            }
        }));
        let summarizer = engine(provider.clone(), ChunkingConfig::default());
        let partials = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&partials);
        let sink = CallbackSink::new().with_partial(move |p| recorded.lock().unwrap().push(p.clone()));
        let (start, end) = window();
        let msgs = messages(75);

        let outcome = summarizer
            .summarize(&msgs, "G", start, end, &sink, &CancellationToken::new())
            .await
            .unwrap();

        // 3 chunk calls + 1 merge call.
        assert_eq!(provider.calls(), 4);
        let partials = partials.lock().unwrap();
        assert_eq!(partials.len(), 1);
        assert_eq!(partials[0].text, "merged");
        assert_eq!(partials[0].message_count, 75);
        assert_eq!(partials[0].period_start, msgs[0].timestamp);
        assert_eq!(partials[0].period_end, msgs[74].timestamp);
        assert_eq!(
            outcome,
            SummaryOutcome::Streamed {
                parts: 1,
                notice: "✅ Summary complete: 1 part delivered".to_string()
            }
        );

        let prompts = provider.prompts();
        assert!(prompts[3].contains("## Part 1/3:\nchunk summary 0"));
        assert!(prompts[3].contains("## Part 3/3:\nchunk summary 2"));
    }

    #[tokio::test]
    async fn test_chunk_failure_aborts_with_index() {
        let provider = Arc::new(MockProvider::new("mock", |_, i| {
            if i == 1 {
                Err("boom".to_string())
            } else {
                Ok("ok".to_string())
            }
        }));
        let summarizer = engine(provider.clone(), ChunkingConfig::default());
        let (start, end) = window();

        let err = summarizer
            .summarize(&messages(75), "G", start, end, &NoopSink, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(
            matches!(err, SummarizerError::ChunkFailed { chunk: 2, total: 3, .. }),
            "{err}"
        );
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_recursive_merge_forces_pairs() {
        let provider = Arc::new(MockProvider::replying("mock", "short merge"));
        let summarizer = engine(provider.clone(), ChunkingConfig::default());
        let (start, end) = window();
        let summaries: Vec<String> = (0..10).map(|_| "s".repeat(5400)).collect();

        let text = summarizer
            .merge_recursive(&summaries, "G", start, end, &NoopSink, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(text, "short merge");
        // 5 forced pairs, then one merge of the 5 results.
        assert_eq!(provider.calls(), 6);
    }

    #[tokio::test]
    async fn test_recursive_merge_depth_limit() {
        let provider = Arc::new(MockProvider::replying("mock", "still too long"));
        let config = ChunkingConfig {
            max_chars_per_prompt: 100,
            ..ChunkingConfig::default()
        };
        let summarizer = engine(provider.clone(), config);
        let (start, end) = window();
        let summaries: Vec<String> = (0..10).map(|i| format!("summary {i}")).collect();
        let levels = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&levels);
        let sink = CallbackSink::new().with_progress(move |m| {
            if m.starts_with("⚙️") {
                recorded.lock().unwrap().push(m.to_string());
            }
        });

        let err = summarizer
            .merge_recursive(&summaries, "G", start, end, &sink, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SummarizerError::RecursionLimitExceeded { max_depth: 3 }
        ));
        // Three levels of 5, 2 and 1 group merges, none past the bound.
        assert_eq!(levels.lock().unwrap().len(), 3);
        assert_eq!(provider.calls(), 8);
    }

    #[tokio::test]
    async fn test_depth_bound_is_shared_by_entry_points() {
        let config = ChunkingConfig {
            max_chars_per_prompt: 100,
            max_messages_per_chunk: 10,
            ..ChunkingConfig::default()
        };
        let (start, end) = window();

        let merged = Arc::new(MockProvider::replying("mock", "still too long"));
        let err = engine(merged.clone(), config.clone())
            .merge_recursive(
                &vec!["s".to_string(); 10],
                "G",
                start,
                end,
                &NoopSink,
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SummarizerError::RecursionLimitExceeded { .. }));

        // 100 messages make 10 chunk summaries, then the same merge levels.
        let complete = Arc::new(MockProvider::replying("mock", "still too long"));
        let err = engine(complete.clone(), config)
            .summarize_complete(&messages(100), "G", start, end, &NoopSink, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SummarizerError::RecursionLimitExceeded { .. }));

        assert_eq!(complete.calls(), 10 + merged.calls());
    }

    #[tokio::test]
    async fn test_single_oversized_summary_merged_once() {
        let provider = Arc::new(MockProvider::replying("mock", "condensed"));
        let config = ChunkingConfig {
            max_chars_per_prompt: 100,
            ..ChunkingConfig::default()
        };
        let summarizer = engine(provider.clone(), config);
        let (start, end) = window();

        let text = summarizer
            .merge_recursive(&["x".repeat(500)], "G", start, end, &NoopSink, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(text, "condensed");
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let provider = Arc::new(MockProvider::replying("mock", "x"));
        let summarizer = engine(provider.clone(), ChunkingConfig::default());
        let (start, end) = window();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = summarizer
            .summarize(&messages(75), "G", start, end, &NoopSink, &cancel)
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_summarize_complete_merges_everything() {
        let provider = Arc::new(MockProvider::new("mock", |prompt, _| {
            Ok(if prompt.starts_with("Combine") {
                "final".to_string()
            } else {
                "part".to_string()
            })
        }));
        let summarizer = engine(provider.clone(), ChunkingConfig::default());
        let (start, end) = window();

        let text = summarizer
            .summarize_complete(&messages(200), "G", start, end, &NoopSink, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(text, "final");
        // 7 chunks + 1 merge.
        assert_eq!(provider.calls(), 8);
    }

    #[tokio::test]
    async fn test_parallel_chunks_keep_order() {
        let provider = Arc::new(MockProvider::new("mock", |prompt, _| {
            if prompt.starts_with("Combine") {
                return Ok("merged".to_string());
            }
            let first = prompt
                .lines()
                .find(|l| l.contains("message number"))
                .unwrap_or_default()
                .to_string();
            Ok(first)
        }));
        let config = ChunkingConfig {
            chunk_concurrency: 3,
            ..ChunkingConfig::default()
        };
        let summarizer = engine(provider.clone(), config);
        let (start, end) = window();

        summarizer
            .summarize(&messages(90), "G", start, end, &NoopSink, &CancellationToken::new())
            .await
            .unwrap();

        let merge_prompt = provider.prompts().pop().unwrap();
        let p1 = merge_prompt.find("message number 0").unwrap();
        let p2 = merge_prompt.find("message number 30").unwrap();
        let p3 = merge_prompt.find("message number 60").unwrap();
        assert!(p1 < p2 && p2 < p3);
    }
}
