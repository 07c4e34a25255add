//! Time related utils.

use crate::{Error, Result};
use chrono::NaiveDateTime;
use chrono::Utc;

/// UTC timestamp used everywhere in signing.
pub type DateTime = chrono::DateTime<Utc>;

const DATE: &str = "%Y%m%d";
const ISO8601: &str = "%Y%m%dT%H%M%SZ";

/// Current UTC time.
#[inline]
pub fn now() -> DateTime {
    Utc::now()
}

/// Format time into date: `20220301`
pub fn format_date(t: DateTime) -> String {
    t.format(DATE).to_string()
}

/// Format time into ISO8601 basic format: `20220313T072004Z`
pub fn format_iso8601(t: DateTime) -> String {
    t.format(ISO8601).to_string()
}

/// Parse ISO8601 basic format time: `20220313T072004Z`
pub fn parse_iso8601(s: &str) -> Result<DateTime> {
    NaiveDateTime::parse_from_str(s, ISO8601)
        .map(|t| t.and_utc())
        .map_err(|e| Error::unexpected(format!("invalid iso8601 time: {s}")).with_source(e))
}
