use chrono::{Local, Utc};

// ============== Timestamp Helpers ==============

/// RFC3339 timestamp in UTC, used for every persisted timestamp.
pub fn iso_timestamp_utc() -> String {
    Utc::now().to_rfc3339()
}

/// Wall-clock time of day for human-facing replies.
pub fn clock_time_local() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

// ============== Text Helpers ==============

/// Truncate to at most `max_chars` characters, marking the cut with `...`.
pub fn truncate_text(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut out = s.chars().take(keep).collect::<String>();
    out.push_str("...");
    out
}
