use std::sync::LazyLock;

use chrono::{FixedOffset, NaiveDate, Utc};
use regex::Regex;

/// Years below 1900 are Republic-of-China years, offset from Gregorian by this.
pub const ROC_YEAR_OFFSET: i32 = 1911;

const TAIPEI_UTC_OFFSET_SECS: i32 = 8 * 3600;

static NUMERIC_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

/// Parse a loosely formatted date string into a calendar date.
///
/// Takes up to three numeric groups as (year, month, day), month and day
/// defaulting to 1. A leading group of 1900 or more is a Gregorian year;
/// anything smaller is an ROC year ("113/5/1" → 2024-05-01). Returns `None`
/// when no numeric group is present or calendar validation fails.
pub fn resolve_date(raw: &str) -> Option<NaiveDate> {
    let mut groups = NUMERIC_RE.find_iter(raw).map(|m| m.as_str());
    let year: i32 = groups.next()?.parse().ok()?;
    let month: u32 = groups.next().and_then(|g| g.parse().ok()).unwrap_or(1);
    let day: u32 = groups.next().and_then(|g| g.parse().ok()).unwrap_or(1);

    let year = if year >= 1900 {
        year
    } else {
        year + ROC_YEAR_OFFSET
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Current calendar day in Taipei (UTC+8, no DST), so urgency buckets do not
/// drift between server and viewer timezones.
pub fn taipei_today() -> NaiveDate {
    let offset = FixedOffset::east_opt(TAIPEI_UTC_OFFSET_SECS).unwrap();
    Utc::now().with_timezone(&offset).date_naive()
}

// ── Tests ──
