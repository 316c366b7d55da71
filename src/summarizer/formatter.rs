//! Headers and notices shown to chat users around generated text.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

const DIVIDER: &str = "━━━━━━━━━━━━━━━━━━━━";

#[derive(Debug, Clone, Copy)]
pub struct SummaryFormatter {
    tz: Tz,
}

impl SummaryFormatter {
    #[must_use]
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn format_partial_summary(
        &self,
        summary: &str,
        part: usize,
        total: usize,
        group_name: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        message_count: usize,
    ) -> String {
        let start = start.with_timezone(&self.tz);
        let end = end.with_timezone(&self.tz);
        let range = if start.date_naive() == end.date_naive() {
            format!("{} - {}", start.format("%Y-%m-%d %H:%M"), end.format("%H:%M"))
        } else {
            format!(
                "{} - {}",
                start.format("%Y-%m-%d %H:%M"),
                end.format("%Y-%m-%d %H:%M")
            )
        };

        format!(
            "📊 {group_name} · Part {part}/{total}\n🕐 {range} · {message_count} messages\n{DIVIDER}\n\n{}",
            summary.trim()
        )
    }

    #[must_use]
    pub fn format_completion_message(&self, parts: usize) -> String {
        let noun = if parts == 1 { "part" } else { "parts" };
        format!("✅ Summary complete: {parts} {noun} delivered")
    }
}
