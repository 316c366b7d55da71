use chrono_tz::Tz;
use std::env;
use std::str::FromStr;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash-exp";
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Asia::Jakarta;
pub const DEFAULT_MIN_MESSAGES: usize = 5;

/// Size and count budgets for partitioning. Defaults are tuned for the
/// query-string backends, whose URLs break somewhere past ~10K encoded chars.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub max_messages_per_chunk: usize,
    pub max_chars_per_prompt: usize,
    /// Estimated size of the chunk prompt without messages.
    pub chunk_template_overhead: usize,
    /// Estimated size of the merge prompt without summaries.
    pub merge_template_overhead: usize,
    pub max_group_size: usize,
    pub chunks_per_batch: usize,
    pub max_recursion_depth: usize,
    /// Chunk summaries in flight at once. 1 keeps the sequential behavior.
    pub chunk_concurrency: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_messages_per_chunk: 30,
            max_chars_per_prompt: 8000,
            chunk_template_overhead: 3500,
            merge_template_overhead: 2000,
            max_group_size: 3,
            chunks_per_batch: 3,
            max_recursion_depth: 3,
            chunk_concurrency: 1,
        }
    }
}

impl ChunkingConfig {
    /// Defaults overridden by `CHUNK_*` style environment variables.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            max_messages_per_chunk: parse_or(
                &lookup,
                "CHUNK_MAX_MESSAGES",
                defaults.max_messages_per_chunk,
            )?,
            max_chars_per_prompt: parse_or(
                &lookup,
                "CHUNK_MAX_CHARS",
                defaults.max_chars_per_prompt,
            )?,
            chunk_template_overhead: parse_or(
                &lookup,
                "CHUNK_TEMPLATE_OVERHEAD",
                defaults.chunk_template_overhead,
            )?,
            merge_template_overhead: parse_or(
                &lookup,
                "MERGE_TEMPLATE_OVERHEAD",
                defaults.merge_template_overhead,
            )?,
            max_group_size: parse_or(&lookup, "MERGE_MAX_GROUP_SIZE", defaults.max_group_size)?,
            chunks_per_batch: parse_or(&lookup, "CHUNKS_PER_BATCH", defaults.chunks_per_batch)?,
            max_recursion_depth: parse_or(
                &lookup,
                "MAX_RECURSION_DEPTH",
                defaults.max_recursion_depth,
            )?,
            chunk_concurrency: parse_or(
                &lookup,
                "CHUNK_CONCURRENCY",
                defaults.chunk_concurrency,
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_messages_per_chunk == 0 {
            return Err("CHUNK_MAX_MESSAGES must be at least 1".to_string());
        }
        if self.chunks_per_batch == 0 {
            return Err("CHUNKS_PER_BATCH must be at least 1".to_string());
        }
        if self.max_group_size < 2 {
            return Err("MERGE_MAX_GROUP_SIZE must be at least 2".to_string());
        }
        if self.chunk_concurrency == 0 {
            return Err("CHUNK_CONCURRENCY must be at least 1".to_string());
        }
        Ok(())
    }

    /// Character budget for the summaries of one merge group.
    #[must_use]
    pub fn merge_group_budget(&self) -> usize {
        self.max_chars_per_prompt
            .saturating_sub(self.merge_template_overhead)
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    /// Zone used when rendering timestamps into prompts.
    pub timezone: Tz,
    /// JSON provider registry replacing the built-in alternates.
    pub provider_registry: Option<String>,
    pub min_messages: usize,
    pub chunking: ChunkingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            timezone: DEFAULT_TIMEZONE,
            provider_registry: None,
            min_messages: DEFAULT_MIN_MESSAGES,
            chunking: ChunkingConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let timezone = match non_empty(&lookup, "SUMMARY_TIMEZONE") {
            Some(name) => Tz::from_str(&name).map_err(|e| format!("SUMMARY_TIMEZONE: {}", e))?,
            None => DEFAULT_TIMEZONE,
        };

        Ok(Self {
            gemini_api_key: non_empty(&lookup, "GEMINI_API_KEY"),
            gemini_model: non_empty(&lookup, "GEMINI_MODEL")
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            timezone,
            provider_registry: non_empty(&lookup, "PROVIDER_REGISTRY"),
            min_messages: parse_or(&lookup, "MIN_MESSAGES", DEFAULT_MIN_MESSAGES)?,
            chunking: ChunkingConfig::from_lookup(&lookup)?,
        })
    }
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, String>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty(lookup, key) {
        Some(raw) => raw.parse().map_err(|e| format!("{}: {}", key, e)),
        None => Ok(default),
    }
}
