// src/coerce/date.rs

use chrono::NaiveDate;
use tracing::debug;

/// Split on `-`, `/` or `.` into exactly three parts.
fn split3(s: &str) -> Option<(&str, &str, &str)> {
    let mut parts = s.split(['-', '/', '.']);
    let a = parts.next()?;
    let b = parts.next()?;
    let c = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    Some((a, b, c))
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// `DD[-/.]MM[-/.]YYYY`
fn parse_dmy(s: &str) -> Option<NaiveDate> {
    let (d, m, y) = split3(s)?;
    if !(all_digits(d) && all_digits(m) && all_digits(y)) || y.len() != 4 || d.len() > 2 {
        return None;
    }
    NaiveDate::from_ymd_opt(y.parse().ok()?, m.parse().ok()?, d.parse().ok()?)
}

/// `YYYY[-/.]MM[-/.]DD`
fn parse_ymd(s: &str) -> Option<NaiveDate> {
    let (y, m, d) = split3(s)?;
    if !(all_digits(y) && all_digits(m) && all_digits(d)) || y.len() != 4 {
        return None;
    }
    NaiveDate::from_ymd_opt(y.parse().ok()?, m.parse().ok()?, d.parse().ok()?)
}

/// Last-resort formats before giving up.
fn parse_generic(s: &str) -> Option<NaiveDate> {
    const FORMATS: [&str; 5] = ["%Y%m%d", "%d %b %Y", "%d %B %Y", "%B %d %Y", "%B %d, %Y"];
    for fmt in FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    // Timestamps: keep the date part.
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    None
}

/// Parse a raw cell into a date, trying day-first, then year-first, then
/// the generic formats.
pub fn to_iso(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    parse_dmy(s).or_else(|| parse_ymd(s)).or_else(|| parse_generic(s))
}

/// Total date coercion: ISO `YYYY-MM-DD` on success, the trimmed original
/// string unchanged on failure. Never errors.
pub fn coerce_date(raw: &str) -> String {
    let s = raw.trim();
    if s.is_empty() {
        return String::new();
    }
    match to_iso(s) {
        Some(d) => d.format("%Y-%m-%d").to_string(),
        None => {
            debug!(raw = s, "unparseable date kept verbatim");
            s.to_string()
        }
    }
}

/// Human-readable `DD-MM-YYYY` form of an ISO date, used by the
/// cross-field derivation pass. `None` when the input is not ISO.
pub fn to_display(iso: &str) -> Option<String> {
    NaiveDate::parse_from_str(iso.trim(), "%Y-%m-%d")
        .ok()
        .map(|d| d.format("%d-%m-%Y").to_string())
}
