use thiserror::Error;

#[derive(Debug, Error)]
pub enum SummarizerError {
    #[error("{provider} failed: {reason}")]
    BackendUnavailable { provider: String, reason: String },

    #[error("all {attempts} providers failed, last error: {last}")]
    AllProvidersFailed {
        attempts: usize,
        last: Box<SummarizerError>,
    },

    #[error("no AI providers configured")]
    NoProviders,

    #[error("maximum recursion depth ({max_depth}) reached during merge")]
    RecursionLimitExceeded { max_depth: usize },

    #[error("failed to summarize chunk {chunk}/{total}: {source}")]
    ChunkFailed {
        chunk: usize,
        total: usize,
        source: Box<SummarizerError>,
    },

    #[error("failed to merge batch {batch}/{total}: {source}")]
    BatchMergeFailed {
        batch: usize,
        total: usize,
        source: Box<SummarizerError>,
    },

    #[error("failed to merge group {group}/{total} at depth {depth}: {source}")]
    GroupMergeFailed {
        group: usize,
        total: usize,
        depth: usize,
        source: Box<SummarizerError>,
    },

    #[error("summarization cancelled")]
    Cancelled,

    #[error("no messages in time range")]
    NoMessages,

    #[error("insufficient messages for summary: found {found}, minimum {minimum}")]
    InsufficientMessages { found: usize, minimum: usize },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid provider registry: {0}")]
    Registry(String),

    #[error("Failed to parse JSON: {0}")]
    ParseError(String),

    #[error("Failed to access storage: {0}")]
    Storage(String),

    #[error("Failed to send HTTP request: {0}")]
    HttpError(String),
}

impl SummarizerError {
    /// Shorthand for a single-provider failure.
    pub fn backend(provider: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        SummarizerError::BackendUnavailable {
            provider: provider.into(),
            reason: reason.to_string(),
        }
    }

    /// Number of providers tried before giving up, looking through the
    /// chunk/batch/group annotations.
    #[must_use]
    pub fn attempts(&self) -> Option<usize> {
        match self {
            SummarizerError::AllProvidersFailed { attempts, .. } => Some(*attempts),
            SummarizerError::ChunkFailed { source, .. }
            | SummarizerError::BatchMergeFailed { source, .. }
            | SummarizerError::GroupMergeFailed { source, .. } => source.attempts(),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        match self {
            SummarizerError::Cancelled => true,
            SummarizerError::ChunkFailed { source, .. }
            | SummarizerError::BatchMergeFailed { source, .. }
            | SummarizerError::GroupMergeFailed { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for SummarizerError {
    fn from(error: reqwest::Error) -> Self {
        SummarizerError::HttpError(error.to_string())
    }
}

impl From<serde_json::Error> for SummarizerError {
    fn from(error: serde_json::Error) -> Self {
        SummarizerError::ParseError(error.to_string())
    }
}

impl From<anyhow::Error> for SummarizerError {
    fn from(error: anyhow::Error) -> Self {
        SummarizerError::Storage(error.to_string())
    }
}
