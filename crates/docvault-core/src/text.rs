//! Text helpers: word counting, summaries and content-derived ids.

pub const SENTENCE_TERMINATORS: [&str; 3] = [". ", "! ", "? "];
pub const DEFAULT_SUMMARY_CHARS: usize = 200;

pub fn word_count(content: &str) -> usize { content.split_whitespace().count() }

/// Leading `max_chars` characters of the content with whitespace collapsed.
///
/// When the content is longer than the limit, the summary is cut after the
/// last sentence terminator that lies past half the limit, or gets a `...`
/// suffix when no such terminator exists.
pub fn summarize(content: &str, max_chars: usize) -> String {
    let trimmed = content.trim();
    let head: String = trimmed.chars().take(max_chars).collect();
    let mut summary = head.split_whitespace().collect::<Vec<_>>().join(" ");
    if trimmed.chars().count() <= max_chars {
        return summary;
    }
    let min_cut = max_chars / 2;
    for punct in SENTENCE_TERMINATORS {
        if let Some(pos) = summary.rfind(punct) {
            if summary[..pos].chars().count() > min_cut {
                summary.truncate(pos + 1);
                return summary;
            }
        }
    }
    summary.push_str("...");
    summary
}

/// `blake3:` followed by the first 16 hex chars of the content hash.
pub fn content_id(content: &str) -> String {
    let hex = blake3::hash(content.as_bytes()).to_hex();
    format!("blake3:{}", &hex[..16])
}
