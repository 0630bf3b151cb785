use chrono::{Days, NaiveDate};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Every calendar day from `from` to `to`, both included, as `YYYY-MM-DD`.
/// Empty when `from > to`.
pub fn date_range(from: NaiveDate, to: NaiveDate) -> Vec<String> {
    from.iter_days()
        .take_while(|day| *day <= to)
        .map(|day| day.format(DATE_FORMAT).to_string())
        .collect()
}

/// The `days`-long window starting at `start`
pub fn fetch_window(start: NaiveDate, days: u32) -> Vec<String> {
    if days == 0 {
        return Vec::new();
    }
    match start.checked_add_days(Days::new(u64::from(days) - 1)) {
        Some(end) => date_range(start, end),
        None => Vec::new(),
    }
}

/// Parse a `YYYY-MM-DD` string
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok()
}
