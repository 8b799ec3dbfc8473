use std::sync::LazyLock;

use chrono::{Local, NaiveDate, NaiveTime, Timelike};
use regex::Regex;

/// Deadline shown for tasks without a usable date.
pub const NO_DATE: &str = "No date";

/// Persisted `time` value for all-day tasks.
pub const ALL_DAY_TIME: &str = "N/A";

static TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d{1,2}):(\d{2})\s*(am|pm)?$").expect("time pattern is valid")
});

/// Today's date in local time.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Parse a date in either ISO (`YYYY-MM-DD`) or `MM/DD/YYYY` form.
/// Blank or unparseable input yields `None`.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if s.contains('/') {
        let mut parts = s.split('/');
        let month: u32 = parts.next()?.trim().parse().ok()?;
        let day: u32 = parts.next()?.trim().parse().ok()?;
        let year: i32 = parts.next()?.trim().parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// `Mon, Mar 10` style deadline, or `No date`.
pub fn format_deadline(date: Option<NaiveDate>) -> String {
    match date {
        Some(d) => d.format("%a, %b %-d").to_string(),
        None => NO_DATE.to_string(),
    }
}

/// `MM/DD/YYYY`, the persisted `dueDate` form.
pub fn format_due_date(date: NaiveDate) -> String {
    date.format("%m/%d/%Y").to_string()
}

/// `YYYY-MM-DD`, the form used by edit forms.
pub fn format_iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parse a time of day written as `HH:MM` or `h:mm am/pm`.
/// Blank input and the all-day marker yield `None`.
pub fn parse_time(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    if s.is_empty() || s == ALL_DAY_TIME {
        return None;
    }
    let caps = TIME_RE.captures(s)?;
    let mut hours: u32 = caps[1].parse().ok()?;
    let minutes: u32 = caps[2].parse().ok()?;
    match caps.get(3).map(|m| m.as_str().to_ascii_lowercase()) {
        Some(p) if p == "pm" && hours != 12 => hours += 12,
        Some(p) if p == "am" && hours == 12 => hours = 0,
        _ => {}
    }
    NaiveTime::from_hms_opt(hours, minutes, 0)
}

/// 24-hour `HH:MM`.
pub fn format_time_24h(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// 12-hour `h:mmam` / `h:mmpm` as shown next to a deadline.
pub fn format_time_12h(time: NaiveTime) -> String {
    let (pm, hour) = time.hour12();
    format!("{}:{:02}{}", hour, time.minute(), if pm { "pm" } else { "am" })
}
