//! Rule-based extraction of typed facts from generated summary text.
//!
//! The grammar follows the section layout of the built-in prompts (and the
//! Indonesian headers older summaries use):
//!
//! - `Sentiment: X` / `Sentiment umum: X` line
//! - `## 📦 PRODUCTS` (or `PRODUK/PAKET`) with `**Name**` entries
//! - `## ✅ VALIDATION` (or `VALIDASI`)
//! - `## 🚩 RED FLAGS`
//!
//! Every rule tolerates a missing section and falls back to a default, so
//! [`MetadataExtractor::extract`] never fails.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::{debug, info};

use crate::core::models::{ProductMention, Sentiment, ValidationStatus};

const DEFAULT_CREDIBILITY: u8 = 3;

const HEADER_WORDS: &[&str] = &[
    "Testimoni",
    "Konsensus",
    "Analisa",
    "Testimonial",
    "Consensus",
    "Analysis",
];
const POSITIVE_WORDS: &[&str] = &[
    "positif",
    "positive",
    "bagus",
    "recommended",
    "mantap",
    "oke",
    "good",
];
const NEGATIVE_WORDS: &[&str] = &[
    "negatif",
    "negative",
    "jelek",
    "buruk",
    "tidak",
    "bad",
    "komplain",
    "complaint",
];
const NO_RED_FLAGS: &[&str] = &[
    "tidak ada red flags",
    "tidak ada propaganda",
    "no red flags",
    "none detected",
    "tidak terdeteksi",
];

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|_| Regex::new(r"$^").expect("fallback regex compiles"))
}

static SENTIMENT_LABELED: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)Sentiment\s+(?:umum|harian|overall|daily):\s*(\w+)"));
static SENTIMENT_PLAIN: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)Sentiment\s*:\s*(\w+)"));
static PRODUCT_SECTION: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"(?s)##\s*📦\s*(?:PAKET/PRODUK|PRODUK/PAKET|PRODUCTS?|PACKAGES?).*?(?:##|$)")
});
static EMPHASIS: LazyLock<Regex> = LazyLock::new(|| compile(r"\*\*([^*]+)\*\*"));
static MENTION_COUNT: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)(?:Jumlah\s+)?mention:\s*(\d+)\s*(?:kali|times?)"));
static PRICE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)(?:Harga|Price):\s*((?:Rp\s*)?[\d.,]+)"));
static VALIDATION_SECTION: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?s)##\s*✅\s*(?:VALIDASI|VALIDATION).*?(?:##|$)"));
static RED_FLAGS_SECTION: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?s)##\s*🚩\s*RED FLAGS.*?(?:##|$)"));
static VALID_MARKER: LazyLock<Regex> = LazyLock::new(|| compile(r"✅ VALID\b"));
static SUSPICIOUS_MARKER: LazyLock<Regex> = LazyLock::new(|| compile(r"❌ SUSPICIOUS\b"));
static MIXED_MARKER: LazyLock<Regex> = LazyLock::new(|| compile(r"⚠\x{FE0F}? MIXED\b"));

/// Facts recovered from one summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryMetadata {
    pub sentiment: Sentiment,
    /// 1..=5
    pub credibility_score: u8,
    pub products: Vec<ProductMention>,
    /// JSON array of product names.
    pub products_json: String,
    pub red_flags_count: usize,
    pub validation_status: ValidationStatus,
}

impl Default for SummaryMetadata {
    fn default() -> Self {
        Self {
            sentiment: Sentiment::Neutral,
            credibility_score: DEFAULT_CREDIBILITY,
            products: Vec::new(),
            products_json: "[]".to_string(),
            red_flags_count: 0,
            validation_status: ValidationStatus::Mixed,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataExtractor;

impl MetadataExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    #[must_use]
    pub fn extract(&self, text: &str) -> SummaryMetadata {
        let sentiment = extract_sentiment(text);
        let products = extract_products(text);
        let names: Vec<&str> = products.iter().map(|p| p.name.as_str()).collect();
        let products_json = serde_json::to_string(&names).unwrap_or_else(|_| "[]".to_string());
        let credibility_score = calculate_credibility(&products, text);
        let red_flags_count = count_red_flags(text);
        let validation_status = determine_status(credibility_score, red_flags_count);

        info!(
            "Metadata parsed: sentiment={}, credibility={}/5, products={}, red_flags={}, status={}",
            sentiment,
            credibility_score,
            products.len(),
            red_flags_count,
            validation_status
        );

        SummaryMetadata {
            sentiment,
            credibility_score,
            products,
            products_json,
            red_flags_count,
            validation_status,
        }
    }
}

/// Shorthand for `MetadataExtractor::new().extract(text)`.
#[must_use]
pub fn extract_metadata(text: &str) -> SummaryMetadata {
    MetadataExtractor.extract(text)
}

/// Unrecognized words count as neutral.
fn normalize_sentiment(word: &str) -> Sentiment {
    let word = word.trim().to_lowercase();
    if word.contains("positif") || word.contains("positive") {
        Sentiment::Positive
    } else if word.contains("negatif") || word.contains("negative") {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}

fn extract_sentiment(text: &str) -> Sentiment {
    [&*SENTIMENT_LABELED, &*SENTIMENT_PLAIN]
        .iter()
        .find_map(|re| re.captures(text))
        .and_then(|caps| caps.get(1))
        .map_or_else(
            || {
                debug!("Sentiment not found in text, defaulting to neutral");
                Sentiment::Neutral
            },
            |m| normalize_sentiment(m.as_str()),
        )
}

fn extract_products(text: &str) -> Vec<ProductMention> {
    let Some(section) = PRODUCT_SECTION.find(text) else {
        debug!("No product section found in summary");
        return Vec::new();
    };

    let validation = VALIDATION_SECTION.find(text).map(|m| m.as_str());
    let mut seen = HashSet::new();
    let mut products = Vec::new();

    for caps in EMPHASIS.captures_iter(section.as_str()) {
        let Some(name) = caps.get(1).map(|m| m.as_str().trim()) else {
            continue;
        };
        if name.is_empty() || HEADER_WORDS.iter().any(|w| name.contains(w)) {
            continue;
        }
        if !seen.insert(name.to_string()) {
            continue;
        }
        products.push(extract_product_details(name, text, validation));
    }

    debug!("Extracted {} products from summary", products.len());
    products
}

fn extract_product_details(name: &str, text: &str, validation: Option<&str>) -> ProductMention {
    let mut product = ProductMention {
        name: name.to_string(),
        mention_count: 1,
        credibility_score: DEFAULT_CREDIBILITY,
        sentiment: Sentiment::Neutral,
        validation_status: ValidationStatus::Mixed,
        price_mentioned: None,
    };

    // Details run from the name to the next emphasized name or section.
    let pattern = format!(
        r"(?s)\*\*{}\*\*\s*(.*?)(?:\*\*[^*]+\*\*|##|$)",
        regex::escape(name)
    );
    let Ok(detail_re) = Regex::new(&pattern) else {
        return product;
    };
    let Some(details) = detail_re
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
    else {
        return product;
    };

    if let Some(count) = MENTION_COUNT
        .captures(details)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .filter(|c| *c > 0)
    {
        product.mention_count = count;
    }

    product.price_mentioned = PRICE
        .captures(details)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string());
    product.credibility_score = credibility_from_text(details);
    product.sentiment = product_sentiment(details);
    product.validation_status = validation.map_or(ValidationStatus::Mixed, |section| {
        validation_for(name, section)
    });

    product
}

/// Star count (1..=5) first, then high/medium/low keywords.
fn credibility_from_text(text: &str) -> u8 {
    let stars = text.matches('⭐').count();
    if (1..=5).contains(&stars) {
        return u8::try_from(stars).unwrap_or(DEFAULT_CREDIBILITY);
    }

    let lower = text.to_lowercase();
    if lower.contains("high") || lower.contains("tinggi") {
        5
    } else if lower.contains("medium") || lower.contains("sedang") {
        3
    } else if lower.contains("low") || lower.contains("rendah") {
        1
    } else {
        DEFAULT_CREDIBILITY
    }
}

fn product_sentiment(text: &str) -> Sentiment {
    let lower = text.to_lowercase();
    if POSITIVE_WORDS.iter().any(|w| lower.contains(w)) {
        Sentiment::Positive
    } else if NEGATIVE_WORDS.iter().any(|w| lower.contains(w)) {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}

fn validation_for(name: &str, section: &str) -> ValidationStatus {
    if !section.contains(name) {
        return ValidationStatus::Mixed;
    }
    if section.contains("Valid") || section.contains("Trustworthy") {
        ValidationStatus::Valid
    } else if section.contains("Meragukan") || section.contains("Suspicious") {
        ValidationStatus::Suspicious
    } else {
        ValidationStatus::Mixed
    }
}

/// Overall verdict markers anywhere in the text: more valid than suspicious
/// gives 5, the reverse gives 1, anything else 3.
fn overall_credibility(text: &str) -> u8 {
    let valid = VALID_MARKER.find_iter(text).count();
    let suspicious = SUSPICIOUS_MARKER.find_iter(text).count();
    let mixed = MIXED_MARKER.find_iter(text).count();
    debug!(
        "Verdict markers: valid={}, suspicious={}, mixed={}",
        valid, suspicious, mixed
    );

    match valid.cmp(&suspicious) {
        std::cmp::Ordering::Greater => 5,
        std::cmp::Ordering::Less => 1,
        std::cmp::Ordering::Equal => 3,
    }
}

fn calculate_credibility(products: &[ProductMention], text: &str) -> u8 {
    let overall = u32::from(overall_credibility(text));
    if products.is_empty() {
        return clamp_score(overall);
    }

    let total: u32 = products.iter().map(|p| u32::from(p.credibility_score)).sum();
    let count = u32::try_from(products.len()).unwrap_or(u32::MAX);
    let average = total / count;

    clamp_score((average * 7 + overall * 3) / 10)
}

fn clamp_score(score: u32) -> u8 {
    u8::try_from(score.clamp(1, 5)).unwrap_or(DEFAULT_CREDIBILITY)
}

fn count_red_flags(text: &str) -> usize {
    let Some(section) = RED_FLAGS_SECTION.find(text).map(|m| m.as_str()) else {
        return 0;
    };

    let lower = section.to_lowercase();
    if NO_RED_FLAGS.iter().any(|p| lower.contains(p)) {
        return 0;
    }

    let bullets = section.matches("- ").count()
        + section.matches("* ").count()
        + section.matches("• ").count();
    let numbered = (1..=10)
        .filter(|i| section.contains(&format!("{i}. ")))
        .count();

    bullets + numbered
}

/// Verdict from credibility and red-flag count. Red flags dominate.
#[must_use]
pub fn determine_status(credibility: u8, red_flags: usize) -> ValidationStatus {
    if red_flags >= 3 {
        ValidationStatus::Suspicious
    } else if credibility >= 4 && red_flags <= 1 {
        ValidationStatus::Valid
    } else if credibility <= 2 {
        ValidationStatus::Suspicious
    } else {
        ValidationStatus::Mixed
    }
}
