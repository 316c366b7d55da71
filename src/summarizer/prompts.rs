use chrono::DateTime;
use chrono_tz::Tz;

/// Renders backend instructions around already-formatted chat text.
///
/// Implementations must keep their fixed text within the overheads configured
/// in [`ChunkingConfig`](crate::core::config::ChunkingConfig), otherwise the
/// partitioner's size estimates are wrong.
pub trait PromptTemplates: Send + Sync {
    fn render_chunk_prompt(
        &self,
        formatted_messages: &str,
        group_name: &str,
        start: DateTime<Tz>,
        end: DateTime<Tz>,
    ) -> String;

    fn render_merge_prompt(
        &self,
        formatted_summaries: &str,
        group_name: &str,
        start: DateTime<Tz>,
        end: DateTime<Tz>,
    ) -> String;
}

/// Built-in templates. Their section headers are the ones
/// [`MetadataExtractor`](super::parser::MetadataExtractor) understands.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPrompts;

impl PromptTemplates for DefaultPrompts {
    fn render_chunk_prompt(
        &self,
        formatted_messages: &str,
        group_name: &str,
        start: DateTime<Tz>,
        end: DateTime<Tz>,
    ) -> String {
        let start = start.format("%Y-%m-%d %H:%M");
        let end = end.format("%Y-%m-%d %H:%M");
        format!(
            r#"You are an analyst for an online community chat. Summarize this chat segment using ONLY the facts present in the messages.

Group: "{group_name}"
Period: {start} to {end}

Messages:
{formatted_messages}

RULES:
1. Only report what the messages actually say; never add outside knowledge
2. If information is missing write "No info yet" instead of guessing
3. Plain text only, no tables and no extra sections
4. Follow exactly the structure below

## 📅 SUMMARY
- Period: {start} - {end}
- Total messages: [count]
- Active users: [count of unique users]
- Sentiment: [positive/neutral/negative]

## 🔥 MAIN TOPICS
1. [Topic] - [short description]

## 📦 PRODUCTS
For every product, package or offer that is discussed:

**[Product name]**
- Mention: [X] times
- Context: [discussion/recommendation/complaint]
- Price: [only if stated]
- Credibility: [High/Medium/Low]

## ✅ VALIDATION
For every product: [Product name]: Valid, Mixed or Suspicious, with the evidence from the chat.
Mark the overall verdict as ✅ VALID, ⚠️ MIXED or ❌ SUSPICIOUS.

## 🚩 RED FLAGS
[Bullet list of spam or propaganda patterns, or "No red flags"]

## 💡 CONCLUSION
[2-3 short paragraphs]
"#
        )
    }

    fn render_merge_prompt(
        &self,
        formatted_summaries: &str,
        group_name: &str,
        start: DateTime<Tz>,
        end: DateTime<Tz>,
    ) -> String {
        format!(
            r#"Combine the following partial summaries into ONE complete and coherent summary.

Group: "{group_name}" | Period: {} - {}

Partial summaries:
{formatted_summaries}

Instructions:
1. Merge all information into a single summary
2. Remove duplicates and combine identical topics
3. Keep important details: products, prices, testimonials, credibility
4. Keep the section structure of the partial summaries (SUMMARY, MAIN TOPICS, PRODUCTS, VALIDATION, RED FLAGS, CONCLUSION)
5. Coherent, detailed and easy to read

Final summary:"#,
            start.format("%Y-%m-%d %H:%M"),
            end.format("%H:%M"),
        )
    }
}
