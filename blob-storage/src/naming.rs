use chrono::{DateTime, Utc};
use sanitize_filename::sanitize;

pub const FALLBACK_NAME: &str = "upload.bin";

/// How finely the uniqueness token slices time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenResolution {
    Seconds,
    Nanos,
}

impl TokenResolution {
    pub fn token_at(self, now: DateTime<Utc>) -> i64 {
        match self {
            TokenResolution::Seconds => now.timestamp(),
            // Out of range only past the year 2262.
            TokenResolution::Nanos => now
                .timestamp_nanos_opt()
                .unwrap_or_else(|| now.timestamp().saturating_mul(1_000_000_000)),
        }
    }
}

pub fn stored_name(token: i64, original: &str) -> String {
    format!("{token}_{original}")
}

/// Reduces a client supplied filename to something safe to put on disk:
/// the last path component, run through `sanitize_filename`.
pub fn clean_original_name(original: &str) -> String {
    let last = original
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();
    let cleaned = sanitize(last.trim());

    if cleaned.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        cleaned
    }
}

/// Whether `name` may be joined onto the storage directory as-is.
pub fn is_valid_stored_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(|c: char| c == '/' || c == '\\' || c == '\0')
}
