use crate::request::error::DateRangeError;
use chrono::{Datelike, Duration, Local, NaiveDate};
use serde::Serialize;
use std::collections::BTreeSet;

/// Days between a date and its publication in the reanalysis dataset.
pub const PUBLICATION_LAG_DAYS: i64 = 8;
/// Longest allowed distance between the start and end of a range, in days.
pub const MAX_SPAN_DAYS: i64 = 367;

/// One axis of a request: a single value or a sorted list of distinct values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DateAxis {
    Single(String),
    Many(Vec<String>),
}

impl DateAxis {
    pub fn single(value: impl Into<String>) -> Self {
        DateAxis::Single(value.into())
    }

    pub fn many<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        DateAxis::Many(values.into_iter().map(Into::into).collect())
    }

    pub fn values(&self) -> Vec<&str> {
        match self {
            DateAxis::Single(v) => vec![v.as_str()],
            DateAxis::Many(vs) => vs.iter().map(String::as_str).collect(),
        }
    }
}

/// The `year`, `month` and `day` parameters of a data request.
///
/// Each axis is requested independently upstream, so a range is expressed as the
/// sets of values it touches rather than as a list of dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateParams {
    pub year: DateAxis,
    pub month: DateAxis,
    pub day: DateAxis,
}

/// Validates dates against the publication lag of the dataset and turns them
/// into [`DateParams`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRangeResolver {
    today: NaiveDate,
}

impl Default for DateRangeResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl DateRangeResolver {
    /// A resolver anchored on the local current date.
    pub fn new() -> Self {
        Self::with_today(Local::now().date_naive())
    }

    pub fn with_today(today: NaiveDate) -> Self {
        Self { today }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// The most recent date the dataset is guaranteed to hold.
    pub fn latest(&self) -> NaiveDate {
        self.today - Duration::days(PUBLICATION_LAG_DAYS)
    }

    /// Request parameters for [`latest`](Self::latest).
    pub fn format_latest(&self) -> DateParams {
        single_day(self.latest())
    }

    /// Builds request parameters for `date`, or for the range `date..=date_end`.
    ///
    /// A single date yields three scalars. A range yields the sorted distinct years,
    /// months and days it touches; the year collapses to a scalar when the range
    /// stays within one year.
    ///
    /// # Errors
    ///
    /// - [`DateRangeError::InvalidDateFormat`] if either date is not a `YYYY-MM-DD` calendar date.
    /// - [`DateRangeError::DateTooRecent`] if `date` is later than [`latest`](Self::latest).
    /// - [`DateRangeError::InvalidDateRange`] if `date_end` precedes `date` or the
    ///   range spans more than [`MAX_SPAN_DAYS`].
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use reanalysis::{DateAxis, DateRangeResolver};
    ///
    /// let resolver = DateRangeResolver::with_today(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    /// let params = resolver.format("2023-01-01", Some("2023-01-31")).unwrap();
    /// assert_eq!(params.year, DateAxis::single("2023"));
    /// assert_eq!(params.month, DateAxis::many(["01"]));
    /// ```
    pub fn format(&self, date: &str, date_end: Option<&str>) -> Result<DateParams, DateRangeError> {
        let (start, end) = self.validate(date, date_end)?;
        Ok(match end {
            None => single_day(start),
            Some(end) => span(start, end),
        })
    }

    /// Parses and checks `date` and `date_end` without building parameters.
    pub fn validate(
        &self,
        date: &str,
        date_end: Option<&str>,
    ) -> Result<(NaiveDate, Option<NaiveDate>), DateRangeError> {
        let start = parse_iso_date(date)?;
        let latest = self.latest();
        if start > latest {
            return Err(DateRangeError::DateTooRecent {
                date: start,
                latest,
            });
        }

        let Some(date_end) = date_end else {
            return Ok((start, None));
        };
        let end = parse_iso_date(date_end)?;
        if end < start {
            return Err(DateRangeError::InvalidDateRange(format!(
                "end date {end} is before start date {start}"
            )));
        }
        let span = (end - start).num_days();
        if span > MAX_SPAN_DAYS {
            return Err(DateRangeError::InvalidDateRange(format!(
                "{span} days between {start} and {end}, at most {MAX_SPAN_DAYS} allowed"
            )));
        }
        Ok((start, Some(end)))
    }
}

fn single_day(date: NaiveDate) -> DateParams {
    DateParams {
        year: DateAxis::Single(format!("{:04}", date.year())),
        month: DateAxis::Single(format!("{:02}", date.month())),
        day: DateAxis::Single(format!("{:02}", date.day())),
    }
}

fn span(start: NaiveDate, end: NaiveDate) -> DateParams {
    let mut years = BTreeSet::new();
    let mut months = BTreeSet::new();
    let mut days = BTreeSet::new();
    for date in start.iter_days().take_while(|d| *d <= end) {
        years.insert(date.year());
        months.insert(date.month());
        days.insert(date.day());
    }

    let year = match years.len() {
        1 => DateAxis::Single(format!("{:04}", start.year())),
        _ => DateAxis::Many(years.iter().map(|y| format!("{y:04}")).collect()),
    };
    DateParams {
        year,
        month: DateAxis::Many(months.iter().map(|m| format!("{m:02}")).collect()),
        day: DateAxis::Many(days.iter().map(|d| format!("{d:02}")).collect()),
    }
}

/// Accepts exactly `YYYY-MM-DD` with a valid calendar date.
fn parse_iso_date(text: &str) -> Result<NaiveDate, DateRangeError> {
    let invalid = || DateRangeError::InvalidDateFormat(text.to_string());
    let shaped = text.len() == 10
        && text.bytes().enumerate().all(|(i, b)| match i {
            4 | 7 => b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !shaped {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> DateRangeResolver {
        DateRangeResolver::with_today(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
    }

    fn two_digits(range: std::ops::RangeInclusive<u32>) -> DateAxis {
        DateAxis::many(range.map(|v| format!("{v:02}")))
    }

    #[test]
    fn test_single_date() {
        let params = resolver().format("2023-01-01", None).unwrap();
        assert_eq!(
            params,
            DateParams {
                year: DateAxis::single("2023"),
                month: DateAxis::single("01"),
                day: DateAxis::single("01"),
            }
        );
    }

    #[test]
    fn test_range_within_one_month() {
        let params = resolver().format("2023-01-01", Some("2023-01-31")).unwrap();
        assert_eq!(params.year, DateAxis::single("2023"));
        assert_eq!(params.month, DateAxis::many(["01"]));
        assert_eq!(params.day, two_digits(1..=31));
    }

    #[test]
    fn test_range_over_several_months() {
        let params = resolver().format("2023-01-01", Some("2023-06-15")).unwrap();
        assert_eq!(params.year, DateAxis::single("2023"));
        assert_eq!(params.month, two_digits(1..=6));
        assert_eq!(params.day, two_digits(1..=31));
    }

    #[test]
    fn test_range_across_years_lists_years() {
        let params = resolver().format("2022-12-30", Some("2023-01-02")).unwrap();
        assert_eq!(params.year, DateAxis::many(["2022", "2023"]));
        assert_eq!(params.month, DateAxis::many(["01", "12"]));
        assert_eq!(params.day, DateAxis::many(["01", "02", "30", "31"]));
    }

    #[test]
    fn test_invalid_format() {
        for bad in ["2023-1-01", "01/01/2023", "2023-02-30", "20230101", ""] {
            assert!(
                matches!(
                    resolver().format(bad, None),
                    Err(DateRangeError::InvalidDateFormat(_))
                ),
                "{bad} should be rejected"
            );
        }
        assert!(matches!(
            resolver().format("2023-01-01", Some("2023/01/31")),
            Err(DateRangeError::InvalidDateFormat(_))
        ));
    }

    #[test]
    fn test_too_recent() {
        let r = resolver();
        // 2024-05-24 is exactly eight days back and still allowed.
        assert!(r.format("2024-05-24", None).is_ok());
        assert!(matches!(
            r.format("2024-05-25", None),
            Err(DateRangeError::DateTooRecent { .. })
        ));
    }

    #[test]
    fn test_invalid_ranges() {
        let r = resolver();
        assert!(matches!(
            r.format("2023-01-31", Some("2023-01-01")),
            Err(DateRangeError::InvalidDateRange(_))
        ));
        assert!(matches!(
            r.format("2022-01-01", Some("2023-01-04")),
            Err(DateRangeError::InvalidDateRange(_))
        ));
        // 367 days is the longest allowed span.
        assert!(r.format("2022-01-01", Some("2023-01-03")).is_ok());
    }

    #[test]
    fn test_latest() {
        let r = resolver();
        assert_eq!(r.latest(), NaiveDate::from_ymd_opt(2024, 5, 24).unwrap());
        assert_eq!(r.format_latest().day, DateAxis::single("24"));
    }

    #[test]
    fn test_axis_serializes_untagged() {
        let params = resolver().format("2023-01-01", Some("2023-01-02")).unwrap();
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"year": "2023", "month": ["01"], "day": ["01", "02"]})
        );
    }
}
