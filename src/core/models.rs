use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A chat message as stored by the ingestion side. Read-only here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub chat_id: i64,
    pub user_id: i64,
    pub username: String,
    pub text: String,
    pub length: usize,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    #[must_use]
    pub fn new(
        chat_id: i64,
        user_id: i64,
        username: impl Into<String>,
        text: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let text = text.into();
        Self {
            chat_id,
            user_id,
            username: username.into(),
            length: text.chars().count(),
            text,
            timestamp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SummaryType {
    #[serde(rename = "1h")]
    Hourly,
    #[serde(rename = "4h")]
    FourHour,
    #[serde(rename = "daily")]
    Daily,
    #[serde(rename = "manual-24h")]
    Manual24h,
    #[serde(rename = "incremental")]
    Incremental,
}

impl SummaryType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hourly => "1h",
            Self::FourHour => "4h",
            Self::Daily => "daily",
            Self::Manual24h => "manual-24h",
            Self::Incremental => "incremental",
        }
    }
}

impl fmt::Display for SummaryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    #[default]
    Neutral,
    Negative,
}

impl Sentiment {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Valid,
    #[default]
    Mixed,
    Suspicious,
}

impl ValidationStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::Mixed => "mixed",
            Self::Suspicious => "suspicious",
        }
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named entity (product, package, config) recognized in a summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductMention {
    pub name: String,
    pub mention_count: u32,
    /// 1..=5
    pub credibility_score: u8,
    pub sentiment: Sentiment,
    pub validation_status: ValidationStatus,
    pub price_mentioned: Option<String>,
}

/// One completed summarization run, ready to hand to persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub chat_id: i64,
    pub summary_type: SummaryType,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub text: String,
    pub message_count: usize,
    pub sentiment: Sentiment,
    /// 1..=5
    pub credibility_score: u8,
    pub products: Vec<ProductMention>,
    /// JSON array of product names, stored next to the typed fields.
    pub products_json: String,
    pub red_flags_count: usize,
    pub validation_status: ValidationStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_message_length_counts_chars() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let msg = Message::new(1, 2, "budi", "harga 30rb 👍", ts);
        assert_eq!(msg.length, 12);
    }

    #[test]
    fn test_enums_serialize_lowercase() {
        assert_eq!(
            serde_json::to_string(&ValidationStatus::Suspicious).unwrap(),
            "\"suspicious\""
        );
        assert_eq!(serde_json::to_string(&Sentiment::Positive).unwrap(), "\"positive\"");
        assert_eq!(
            serde_json::to_string(&SummaryType::Manual24h).unwrap(),
            "\"manual-24h\""
        );
    }
}
