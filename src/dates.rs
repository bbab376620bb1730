use chrono::{Duration, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

static LEADING_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9]{4})-([0-9]{2})-([0-9]{2})").expect("valid date regex"));

const RANGE_SEPARATOR: char = '~';
const OUTPUT_FORMAT: &str = "%Y/%m/%d";

/// Normalized form of a scraped date range such as `2024-01-01(一)~2024-01-03(三)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub days: Vec<String>,
}

/// Parse a free-text date range. Never fails: unparsable input yields an empty range.
pub fn parse_date_range(raw: &str) -> DateRange {
    match try_parse(raw) {
        Ok(range) => range,
        Err(e) => {
            warn!("Failed to parse date range '{}': {}", raw, e);
            DateRange::default()
        }
    }
}

fn try_parse(raw: &str) -> Result<DateRange, String> {
    let mut segments = raw.trim().splitn(2, RANGE_SEPARATOR).map(str::trim);
    let start_segment = segments.next().unwrap_or_default();
    let end_segment = segments.next().unwrap_or(start_segment);

    let start = leading_date(start_segment)?;
    let end = leading_date(end_segment)?;

    let days = match (start, end) {
        (Some(start), Some(end)) => enumerate_days(start, end),
        _ => Vec::new(),
    };

    Ok(DateRange {
        start_date: start.map(format_day),
        end_date: end.map(format_day),
        days,
    })
}

/// `Ok(None)` when the segment doesn't start with `YYYY-MM-DD`;
/// `Err` when it does but the digits are not a real calendar date.
fn leading_date(segment: &str) -> Result<Option<NaiveDate>, String> {
    let Some(caps) = LEADING_DATE.captures(segment) else {
        return Ok(None);
    };
    let year: i32 = caps[1].parse().map_err(|e| format!("bad year: {e}"))?;
    let month: u32 = caps[2].parse().map_err(|e| format!("bad month: {e}"))?;
    let day: u32 = caps[3].parse().map_err(|e| format!("bad day: {e}"))?;
    NaiveDate::from_ymd_opt(year, month, day)
        .map(Some)
        .ok_or_else(|| format!("{}-{:02}-{:02} is not a calendar date", year, month, day))
}

/// Every day in `start..=end`; reversed ranges are empty.
fn enumerate_days(start: NaiveDate, end: NaiveDate) -> Vec<String> {
    if start > end {
        return Vec::new();
    }
    let mut days = Vec::with_capacity((end - start).num_days() as usize + 1);
    let mut current = start;
    while current <= end {
        days.push(format_day(current));
        current += Duration::days(1);
    }
    days
}

fn format_day(date: NaiveDate) -> String {
    date.format(OUTPUT_FORMAT).to_string()
}
