//! Timestamp parsing and pt-BR display formatting.

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, Locale, Offset, Utc};

/// Posts are displayed in Brasília time (UTC−03:00, no daylight saving).
const DISPLAY_OFFSET_SECS: i32 = -3 * 3600;

const PUBLISHED_PATTERN: &str = "%d %b %Y";
const EDITED_PATTERN: &str = "%d %b %Y, às %H:%M";

/// Parses a CMS timestamp.
///
/// Prismic sends `2021-03-25T19:25:28+0000`; RFC 3339 is accepted as well.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z"))
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("Malformed timestamp: {:?}", raw))
}

/// `25 mar 2021`
pub fn format_published(at: &DateTime<Utc>) -> String {
    display(at, PUBLISHED_PATTERN)
}

/// `25 mar 2021, às 16:25`
pub fn format_edited(at: &DateTime<Utc>) -> String {
    display(at, EDITED_PATTERN)
}

fn display(at: &DateTime<Utc>, pattern: &str) -> String {
    // Constant offset, always in range
    let offset = FixedOffset::east_opt(DISPLAY_OFFSET_SECS).unwrap_or_else(|| Utc.fix());
    at.with_timezone(&offset)
        .format_localized(pattern, Locale::pt_BR)
        .to_string()
}
