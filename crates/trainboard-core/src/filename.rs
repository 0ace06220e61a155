//! Canonical names of exported report files.

use chrono::{DateTime, Utc};

/// Make `raw` safe to embed in a file name.
///
/// Whitespace runs become a single `-`; path separators, reserved
/// punctuation and control characters are dropped. Letters (including
/// accented ones), digits, `-`, `_` and `.` are kept.
pub fn slugify(raw: &str) -> String {
    let mut slug = String::with_capacity(raw.len());
    let mut pending_dash = false;
    for c in raw.trim().chars() {
        if c.is_whitespace() {
            pending_dash = true;
            continue;
        }
        if !(c.is_alphanumeric() || matches!(c, '-' | '_' | '.')) {
            continue;
        }
        if pending_dash && !slug.is_empty() {
            slug.push('-');
        }
        pending_dash = false;
        slug.push(c);
    }
    // A leading dot would hide the file; `..` would escape the directory.
    slug.trim_start_matches('.').to_string()
}

/// `YYYY-MM-DD-HH-MM-SS`: an ISO timestamp with `:` and `T` replaced by `-`.
pub fn file_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d-%H-%M-%S").to_string()
}

/// `relatorio-<subject>-<slug>-<timestamp>.<ext>`, or
/// `relatorio-<subject>-<timestamp>.<ext>` when there is no slug.
pub fn export_filename(
    subject: &str,
    slug_source: Option<&str>,
    generated_at: DateTime<Utc>,
    extension: &str,
) -> String {
    let timestamp = file_timestamp(generated_at);
    match slug_source.map(slugify).filter(|s| !s.is_empty()) {
        Some(slug) => format!("relatorio-{subject}-{slug}-{timestamp}.{extension}"),
        None => format!("relatorio-{subject}-{timestamp}.{extension}"),
    }
}
