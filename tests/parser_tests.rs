use chatsum::core::models::{Sentiment, ValidationStatus};
use chatsum::summarizer::parser::{MetadataExtractor, extract_metadata};

const ID_MANUAL_24H: &str = include_str!("fixtures/id_manual_24h.md");
const EN_DEFAULT: &str = include_str!("fixtures/en_default.md");
const ID_SUSPICIOUS: &str = include_str!("fixtures/id_suspicious.md");

#[test]
fn test_indonesian_24h_summary() {
    let meta = MetadataExtractor::new().extract(ID_MANUAL_24H);

    assert_eq!(meta.sentiment, Sentiment::Positive);
    assert_eq!(meta.products.len(), 2, "section headers must not count as products");

    let xtra = &meta.products[0];
    assert_eq!(xtra.name, "Xtra Combo Flex");
    assert_eq!(xtra.mention_count, 12);
    assert_eq!(xtra.price_mentioned.as_deref(), Some("Rp 30.000"));
    assert_eq!(xtra.credibility_score, 4);
    assert_eq!(xtra.sentiment, Sentiment::Positive);
    assert_eq!(xtra.validation_status, ValidationStatus::Valid);

    let akrab = &meta.products[1];
    assert_eq!(akrab.name, "Akrab Jumbo");
    assert_eq!(akrab.mention_count, 3);
    assert_eq!(akrab.credibility_score, 1);
    assert_eq!(akrab.sentiment, Sentiment::Negative);
    assert_eq!(akrab.validation_status, ValidationStatus::Mixed);

    // avg(4, 1) = 2, blended with the overall ✅ VALID score of 5.
    assert_eq!(meta.credibility_score, 2);
    assert_eq!(meta.red_flags_count, 2);
    assert_eq!(meta.validation_status, ValidationStatus::Suspicious);
    assert_eq!(meta.products_json, r#"["Xtra Combo Flex","Akrab Jumbo"]"#);
}

#[test]
fn test_english_default_template_summary() {
    let meta = extract_metadata(EN_DEFAULT);

    assert_eq!(meta.sentiment, Sentiment::Neutral);
    assert_eq!(meta.products.len(), 1);

    let bundle = &meta.products[0];
    assert_eq!(bundle.name, "OpenWrt Bundle");
    assert_eq!(bundle.mention_count, 6);
    assert_eq!(bundle.price_mentioned.as_deref(), Some("150,000"));
    assert_eq!(bundle.credibility_score, 5);
    assert_eq!(bundle.validation_status, ValidationStatus::Valid);

    assert_eq!(meta.credibility_score, 5);
    assert_eq!(meta.red_flags_count, 0);
    assert_eq!(meta.validation_status, ValidationStatus::Valid);
}

#[test]
fn test_suspicious_summary_with_numbered_red_flags() {
    let meta = extract_metadata(ID_SUSPICIOUS);

    assert_eq!(meta.sentiment, Sentiment::Negative);
    assert_eq!(meta.products.len(), 1);
    assert_eq!(meta.products[0].mention_count, 20);
    assert_eq!(meta.products[0].credibility_score, 1);
    assert_eq!(
        meta.products[0].validation_status,
        ValidationStatus::Suspicious
    );

    assert_eq!(meta.credibility_score, 1);
    assert_eq!(meta.red_flags_count, 3);
    assert_eq!(meta.validation_status, ValidationStatus::Suspicious);
}

#[test]
fn test_arbitrary_text_stays_in_range() {
    let inputs = [
        "",
        "just a plain paragraph without any structure",
        "## 📦 PRODUCTS\n**",
        "## 🚩 RED FLAGS\n- - - - - -",
        "✅ VALID ✅ VALID ❌ SUSPICIOUS ⚠️ MIXED",
        "## 📦 PRODUK/PAKET\n**(weird [regex] name?)**\n- Credibility: ⭐⭐⭐⭐⭐⭐⭐",
    ];

    for input in inputs {
        let meta = extract_metadata(input);
        assert!(
            (1..=5).contains(&meta.credibility_score),
            "{input:?} gave {}",
            meta.credibility_score
        );
        for product in &meta.products {
            assert!((1..=5).contains(&product.credibility_score));
            assert!(product.mention_count >= 1);
        }
    }

    let empty = extract_metadata("");
    assert_eq!(empty.sentiment, Sentiment::Neutral);
    assert_eq!(empty.credibility_score, 3);
    assert_eq!(empty.red_flags_count, 0);
    assert_eq!(empty.validation_status, ValidationStatus::Mixed);
    assert_eq!(empty.products_json, "[]");
}

#[test]
fn test_duplicate_product_names_collapse() {
    let text = "## 📦 PRODUCTS\n**Paket A**\n- Mention: 2 times\n**Paket A**\n- Mention: 9 times\n## END";
    let meta = extract_metadata(text);
    assert_eq!(meta.products.len(), 1);
    assert_eq!(meta.products[0].mention_count, 2);
}
