//! Size- and count-bounded partitioning of messages and of intermediate
//! summaries.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::fmt::Write as _;
use std::ops::Range;
use tracing::{debug, info, warn};

use crate::core::config::ChunkingConfig;
use crate::core::models::Message;

/// A contiguous run of messages sized for one backend call.
#[derive(Debug, Clone, Copy)]
pub struct Chunk<'a> {
    /// Zero-based position in the partition.
    pub index: usize,
    pub messages: &'a [Message],
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Chunk<'_> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkingConfig,
    tz: Tz,
}

impl Chunker {
    #[must_use]
    pub fn new(config: ChunkingConfig, tz: Tz) -> Self {
        Self { config, tz }
    }

    #[must_use]
    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// One `[HH:MM] username: text` line per message, in the configured zone.
    #[must_use]
    pub fn format_messages(&self, messages: &[Message]) -> String {
        let mut out = String::new();
        for msg in messages {
            let local = msg.timestamp.with_timezone(&self.tz);
            let _ = writeln!(
                out,
                "[{}] {}: {}",
                local.format("%H:%M"),
                msg.username,
                msg.text
            );
        }
        out
    }

    #[must_use]
    pub fn estimate_prompt_size(&self, messages: &[Message]) -> usize {
        let messages_size = self.format_messages(messages).chars().count();
        let total = self.config.chunk_template_overhead + messages_size;
        debug!(
            "Estimated prompt size: {} chars (template: {}, messages: {})",
            total, self.config.chunk_template_overhead, messages_size
        );
        total
    }

    #[must_use]
    pub fn should_split_messages(&self, messages: &[Message]) -> bool {
        if messages.len() > self.config.max_messages_per_chunk {
            debug!(
                "Should split: message count {} > threshold {}",
                messages.len(),
                self.config.max_messages_per_chunk
            );
            return true;
        }

        let estimated = self.estimate_prompt_size(messages);
        if estimated > self.config.max_chars_per_prompt {
            debug!(
                "Should split: estimated size {} > threshold {}",
                estimated, self.config.max_chars_per_prompt
            );
            return true;
        }

        false
    }

    /// Fixed-count partition. A single oversized message still gets its own
    /// chunk; sizes are not adapted.
    #[must_use]
    pub fn split_messages<'a>(&self, messages: &'a [Message]) -> Vec<Chunk<'a>> {
        let per_chunk = self.config.max_messages_per_chunk.max(1);

        let chunks: Vec<Chunk<'a>> = messages
            .chunks(per_chunk)
            .enumerate()
            .filter_map(|(index, slice)| {
                Some(Chunk {
                    index,
                    messages: slice,
                    start: slice.first()?.timestamp,
                    end: slice.last()?.timestamp,
                })
            })
            .collect();

        info!(
            "Split {} messages into {} chunks (max {} per chunk)",
            messages.len(),
            chunks.len(),
            per_chunk
        );
        chunks
    }

    #[must_use]
    pub fn estimate_merge_size(&self, summaries: &[String]) -> usize {
        let summaries_size: usize = summaries.iter().map(|s| s.chars().count()).sum();
        self.config.merge_template_overhead + summaries_size
    }

    #[must_use]
    pub fn should_split_summaries(&self, summaries: &[String]) -> bool {
        let estimated = self.estimate_merge_size(summaries);
        if estimated > self.config.max_chars_per_prompt {
            debug!(
                "Should split summaries: estimated size {} > threshold {}",
                estimated, self.config.max_chars_per_prompt
            );
            return true;
        }
        false
    }

    /// Group consecutive summaries for merging.
    ///
    /// Groups hold at most `max_group_size` members and stay within the merge
    /// budget. The one exception: when each summary alone fills the budget,
    /// the singletons are paired up (the odd one joins the last pair). A
    /// stray singleton after a full group borrows that group's last member
    /// if the pair fits; otherwise it is merged on its own.
    #[must_use]
    pub fn split_summaries<'a>(&self, summaries: &'a [String]) -> Vec<&'a [String]> {
        if summaries.is_empty() {
            return Vec::new();
        }
        if summaries.len() == 1 {
            return vec![summaries];
        }

        let budget = self.config.merge_group_budget();
        let max_group = self.config.max_group_size.max(2);

        let sizes: Vec<usize> = summaries.iter().map(|s| s.chars().count()).collect();
        let mut groups: Vec<Range<usize>> = Vec::new();
        let mut start = 0;
        let mut size = 0;

        for (i, &len) in sizes.iter().enumerate() {
            let members = i - start;
            if members > 0 && (size + len > budget || members >= max_group) {
                groups.push(start..i);
                start = i;
                size = len;
            } else {
                size += len;
            }
        }
        groups.push(start..summaries.len());

        if groups.len() > 1 && groups.iter().all(|g| g.len() == 1) {
            warn!("All groups have only 1 summary, forcing pairs");
            groups = pair_singletons(&groups);
        } else {
            rebalance_singletons(&mut groups, &sizes, budget);
        }

        info!(
            "Split {} summaries into {} groups",
            summaries.len(),
            groups.len()
        );
        groups.into_iter().map(|range| &summaries[range]).collect()
    }
}

fn pair_singletons(groups: &[Range<usize>]) -> Vec<Range<usize>> {
    let mut paired: Vec<Range<usize>> = Vec::with_capacity(groups.len() / 2 + 1);
    for pair in groups.chunks(2) {
        match pair {
            [first, second] => paired.push(first.start..second.end),
            [odd] => match paired.last_mut() {
                Some(last) => last.end = odd.end,
                None => paired.push(odd.clone()),
            },
            _ => {}
        }
    }
    paired
}

/// Turn `[.., k>=3][1]` into `[.., k-1][2]` when the new pair fits the budget.
/// The donor keeps at least two members and only shrinks.
fn rebalance_singletons(groups: &mut [Range<usize>], sizes: &[usize], budget: usize) {
    for i in 1..groups.len() {
        let (prev, rest) = groups.split_at_mut(i);
        let (Some(donor), Some(single)) = (prev.last_mut(), rest.first_mut()) else {
            continue;
        };
        if single.len() != 1 || donor.len() < 3 {
            continue;
        }
        let pair_size = sizes[donor.end - 1] + sizes[single.start];
        if pair_size <= budget {
            debug!("Rebalancing merge groups to avoid a single-summary group");
            donor.end -= 1;
            single.start -= 1;
        }
    }
}
