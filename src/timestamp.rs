//! Name stamping and creation-date parsing.

use chrono::{DateTime, SecondsFormat, Utc};

/// Suffix format appended to the base name, e.g. `20240131235959`.
pub const NAME_STAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Separator between base name and stamp.
pub const NAME_STAMP_SEPARATOR: char = '.';

/// `<base>.<YYYYMMDDHHMMSS>` in UTC.
pub fn stamp_name(base: &str, now: DateTime<Utc>) -> String {
    format!(
        "{}{}{}",
        base,
        NAME_STAMP_SEPARATOR,
        now.format(NAME_STAMP_FORMAT)
    )
}

/// Parse a provider creation date (RFC 3339).
pub fn parse_creation_date(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value).map(|t| t.with_timezone(&Utc))
}

/// Inverse of [`parse_creation_date`], second precision with a `Z` offset.
pub fn format_creation_date(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}
