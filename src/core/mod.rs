//! Configuration and shared data types

pub mod config;
pub mod models;

pub use config::{AppConfig, ChunkingConfig};
pub use models::{Message, ProductMention, Sentiment, Summary, SummaryType, ValidationStatus};
