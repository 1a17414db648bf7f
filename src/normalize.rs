//! Document normalization: derives the text that gets embedded from a
//! possibly-incomplete meeting record.
//!
//! Records arrive with placeholder titles ("Untitled Meeting - 1699...")
//! and summaries that are often empty or truncated. The rules here are
//! deterministic so re-indexing an unchanged record produces the same
//! embedding text:
//!
//! 1. Title: kept unless empty or containing "untitled" (case-insensitive);
//!    otherwise the first 6 whitespace tokens of the body plus `...`.
//! 2. Summary: kept if at least 20 characters; otherwise the first 50
//!    whitespace tokens of the body plus `...`.
//! 3. Embedding text: resolved title, resolved summary, and the full body,
//!    one per line. The duplication upweights title/summary terms against
//!    a long transcript.
//! 4. An empty or whitespace-only body rejects the document outright.

use crate::models::MeetingRecord;

/// Case-insensitive marker for placeholder titles.
const TITLE_PLACEHOLDER: &str = "untitled";
/// Body tokens used for a fallback title.
const TITLE_FALLBACK_TOKENS: usize = 6;
/// Body tokens used for a fallback summary.
const SUMMARY_FALLBACK_TOKENS: usize = 50;
/// Summaries shorter than this are replaced by the fallback.
const SUMMARY_MIN_CHARS: usize = 20;

/// A record reduced to the pieces the indexer stores and embeds.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedDocument {
    pub title: String,
    pub summary: String,
    pub embed_text: String,
}

/// Normalize a record for indexing. Returns `None` when the body is empty
/// or whitespace-only; such records are skipped, never embedded.
pub fn normalize(record: &MeetingRecord) -> Option<NormalizedDocument> {
    if record.body.trim().is_empty() {
        return None;
    }

    let title = resolve_title(&record.title, &record.body);
    let summary = resolve_summary(&record.summary, &record.body);
    let embed_text = format!("{}\n{}\n{}", title, summary, record.body);

    Some(NormalizedDocument {
        title,
        summary,
        embed_text,
    })
}

/// Apply the title fallback rule. The placeholder check is a substring
/// match, so "Untitled Meeting - 1699999999" and "copy of untitled" both
/// fall back.
pub fn resolve_title(title: &str, body: &str) -> String {
    let trimmed = title.trim();
    if trimmed.is_empty() || trimmed.to_lowercase().contains(TITLE_PLACEHOLDER) {
        return lead_tokens(body, TITLE_FALLBACK_TOKENS);
    }
    trimmed.to_string()
}

/// Apply the summary fallback rule.
pub fn resolve_summary(summary: &str, body: &str) -> String {
    let trimmed = summary.trim();
    if trimmed.chars().count() < SUMMARY_MIN_CHARS {
        return lead_tokens(body, SUMMARY_FALLBACK_TOKENS);
    }
    trimmed.to_string()
}

/// First `count` whitespace-delimited tokens of `text`, joined by single
/// spaces, with a trailing ellipsis. The ellipsis is appended even when the
/// text has fewer tokens, marking the value as derived.
fn lead_tokens(text: &str, count: usize) -> String {
    let tokens: Vec<&str> = text.split_whitespace().take(count).collect();
    format!("{}...", tokens.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(title: &str, summary: &str, body: &str) -> MeetingRecord {
        MeetingRecord {
            id: "m1".to_string(),
            title: title.to_string(),
            summary: summary.to_string(),
            body: body.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_title_kept_when_real() {
        let title = resolve_title("Q3 planning", "alpha beta gamma");
        assert_eq!(title, "Q3 planning");
    }

    #[test]
    fn test_title_fallback_when_empty() {
        let body = "one two three four five six seven eight";
        assert_eq!(resolve_title("", body), "one two three four five six...");
        assert_eq!(resolve_title("   ", body), "one two three four five six...");
    }

    #[test]
    fn test_title_fallback_on_placeholder() {
        let body = "alpha beta gamma delta epsilon zeta eta";
        assert_eq!(
            resolve_title("Untitled Meeting - 1699999999", body),
            "alpha beta gamma delta epsilon zeta..."
        );
        // Substring match, any casing, anywhere in the title
        assert_eq!(
            resolve_title("copy of UNTITLED notes", body),
            "alpha beta gamma delta epsilon zeta..."
        );
    }

    #[test]
    fn test_title_fallback_short_body_still_gets_ellipsis() {
        assert_eq!(resolve_title("", "only three tokens"), "only three tokens...");
    }

    #[test]
    fn test_title_fallback_collapses_whitespace() {
        assert_eq!(
            resolve_title("", "one  two\tthree\nfour five six seven"),
            "one two three four five six..."
        );
    }

    #[test]
    fn test_summary_kept_when_long_enough() {
        // Exactly 20 chars is kept
        let kept = "a".repeat(20);
        assert_eq!(resolve_summary(&kept, "body text"), kept);
    }

    #[test]
    fn test_summary_fallback_when_short() {
        assert_eq!(
            resolve_summary("too short", "alpha beta gamma"),
            "alpha beta gamma..."
        );
        assert_eq!(resolve_summary("", "alpha beta"), "alpha beta...");
    }

    #[test]
    fn test_summary_fallback_takes_fifty_tokens() {
        let body: String = (0..80)
            .map(|i| format!("w{}", i))
            .collect::<Vec<_>>()
            .join(" ");
        let summary = resolve_summary("", &body);
        assert!(summary.ends_with("..."));
        let token_count = summary.trim_end_matches("...").split_whitespace().count();
        assert_eq!(token_count, 50);
    }

    #[test]
    fn test_summary_whitespace_only_counts_as_empty() {
        assert_eq!(
            resolve_summary("                         ", "alpha beta"),
            "alpha beta..."
        );
    }

    #[test]
    fn test_normalize_rejects_empty_body() {
        assert!(normalize(&record("Title", "A perfectly good summary", "")).is_none());
        assert!(normalize(&record("Title", "A perfectly good summary", "   \n\t")).is_none());
    }

    #[test]
    fn test_normalize_embed_text_layout() {
        let rec = record(
            "Sprint retro",
            "We discussed the release cadence at length.",
            "Full transcript goes here.",
        );
        let doc = normalize(&rec).unwrap();
        assert_eq!(
            doc.embed_text,
            "Sprint retro\nWe discussed the release cadence at length.\nFull transcript goes here."
        );
    }

    #[test]
    fn test_normalize_applies_both_fallbacks() {
        let rec = record("untitled", "short", "budget review for the next quarter");
        let doc = normalize(&rec).unwrap();
        assert_eq!(doc.title, "budget review for the next quarter...");
        assert_eq!(doc.summary, "budget review for the next quarter...");
        let lines: Vec<&str> = doc.embed_text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2], "budget review for the next quarter");
    }

    #[test]
    fn test_normalize_deterministic() {
        let rec = record("", "", "alpha beta gamma delta epsilon zeta eta theta");
        assert_eq!(normalize(&rec), normalize(&rec));
    }
}
