//! Lenient date parsing for backend date strings (Oracle `DD/MM/YYYY`, ISO dates and timestamps).

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use std::sync::OnceLock;

fn compiled(cell: &'static OnceLock<Result<Regex, regex::Error>>, pattern: &str) -> Option<&'static Regex> {
    match cell.get_or_init(|| Regex::new(pattern)) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::error!(pattern, error = %e, "date pattern failed to compile");
            None
        }
    }
}

fn slash_dmy() -> Option<&'static Regex> {
    static RE: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    compiled(&RE, SLASH_DMY)
}

fn iso_prefix() -> Option<&'static Regex> {
    static RE: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    compiled(&RE, ISO_PREFIX)
}

const SLASH_DMY: &str = r"^(\d{2})/(\d{2})/(\d{4})$";
const ISO_PREFIX: &str = r"^(\d{4})-(\d{2})-(\d{2})";

const DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%Y/%m/%d", "%d-%m-%Y", "%B %d, %Y", "%d %B %Y", "%b %d, %Y"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

fn ymd(y: &str, m: &str, d: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y.parse().ok()?, m.parse().ok()?, d.parse().ok()?)
}

/// Calendar date of a backend value. `DD/MM/YYYY` and `YYYY-MM-DD[...]` are read
/// literally (the date part of an ISO timestamp is taken as written); anything else
/// goes through RFC 3339 / RFC 2822 and a few common layouts. Unparseable is `None`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(caps) = slash_dmy().and_then(|re| re.captures(s)) {
        return ymd(&caps[3], &caps[2], &caps[1]);
    }
    if let Some(caps) = iso_prefix().and_then(|re| re.captures(s)) {
        return ymd(&caps[1], &caps[2], &caps[3]);
    }
    parse_timestamp_fallback(s).map(|dt| dt.date())
}

/// Point in time used to order temporal collections. Dates without a time sort at midnight.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(caps) = slash_dmy().and_then(|re| re.captures(s)) {
        return ymd(&caps[3], &caps[2], &caps[1]).map(|d| d.and_time(NaiveTime::MIN));
    }
    if let Some(dt) = parse_timestamp_fallback(s) {
        return Some(dt);
    }
    if let Some(caps) = iso_prefix().and_then(|re| re.captures(s)) {
        return ymd(&caps[1], &caps[2], &caps[3]).map(|d| d.and_time(NaiveTime::MIN));
    }
    None
}

/// Offset-carrying timestamps are converted to local time.
fn parse_timestamp_fallback(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Local).naive_local());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Local).naive_local());
    }
    for f in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, f) {
            return Some(dt);
        }
    }
    for f in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, f) {
            return Some(d.and_time(NaiveTime::MIN));
        }
    }
    None
}

/// Unparseable dates are never "today".
pub fn is_on(raw: Option<&str>, day: NaiveDate) -> bool {
    raw.and_then(parse_date) == Some(day)
}
