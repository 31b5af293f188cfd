//! Time granularity levels.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AugmentError;

/// Precision of a time value, ordered finest to coarsest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Second,
    Minute,
    Hour,
    Day,
    Month,
    Year,
}

impl Granularity {
    /// All levels, finest first.
    pub const ALL: [Granularity; 6] = [
        Granularity::Second,
        Granularity::Minute,
        Granularity::Hour,
        Granularity::Day,
        Granularity::Month,
        Granularity::Year,
    ];

    /// Numeric code used in catalog metadata (year = 9 ... second = 14).
    pub fn code(&self) -> u8 {
        match self {
            Granularity::Second => 14,
            Granularity::Minute => 13,
            Granularity::Hour => 12,
            Granularity::Day => 11,
            Granularity::Month => 10,
            Granularity::Year => 9,
        }
    }

    /// Inverse of [`Granularity::code`].
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.code() == code)
    }

    /// True if `self` is at least as fine as `other`.
    pub fn is_at_least_as_fine_as(&self, other: Granularity) -> bool {
        *self <= other
    }

    /// Infer the granularity of a set of values from their content.
    ///
    /// A column whose values are all at midnight is day-granular, one whose values all
    /// fall on the first of the month is month-granular, and so on. Returns `None`
    /// for an empty slice.
    pub fn detect(values: &[DateTime<Utc>]) -> Option<Granularity> {
        if values.is_empty() {
            return None;
        }
        let any = |f: fn(&DateTime<Utc>) -> bool| values.iter().any(f);

        let granularity = if any(|v| v.second() != 0) {
            Granularity::Second
        } else if any(|v| v.minute() != 0) {
            Granularity::Minute
        } else if any(|v| v.hour() != 0) {
            Granularity::Hour
        } else if any(|v| v.day() != 1) {
            Granularity::Day
        } else if any(|v| v.month() != 1) {
            Granularity::Month
        } else {
            Granularity::Year
        };
        Some(granularity)
    }

    /// Truncate a value to the start of its period at this granularity.
    pub fn truncate(&self, value: DateTime<Utc>) -> DateTime<Utc> {
        let date = value.date_naive();
        let start = match self {
            Granularity::Second => date.and_hms_opt(value.hour(), value.minute(), value.second()),
            Granularity::Minute => date.and_hms_opt(value.hour(), value.minute(), 0),
            Granularity::Hour => date.and_hms_opt(value.hour(), 0, 0),
            Granularity::Day => date.and_hms_opt(0, 0, 0),
            Granularity::Month => NaiveDate::from_ymd_opt(value.year(), value.month(), 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0)),
            Granularity::Year => {
                NaiveDate::from_ymd_opt(value.year(), 1, 1).and_then(|d| d.and_hms_opt(0, 0, 0))
            }
        };
        start.map(|naive| Utc.from_utc_datetime(&naive)).unwrap_or(value)
    }

    /// Last instant (to the second) of the period containing `value`.
    pub fn period_end(&self, value: DateTime<Utc>) -> DateTime<Utc> {
        let start = self.truncate(value);
        let next = match self {
            Granularity::Second => start.checked_add_signed(Duration::seconds(1)),
            Granularity::Minute => start.checked_add_signed(Duration::minutes(1)),
            Granularity::Hour => start.checked_add_signed(Duration::hours(1)),
            Granularity::Day => start.checked_add_signed(Duration::days(1)),
            Granularity::Month => start.checked_add_months(Months::new(1)),
            Granularity::Year => start.checked_add_months(Months::new(12)),
        };
        next.and_then(|n| n.checked_sub_signed(Duration::seconds(1)))
            .unwrap_or(start)
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Granularity::Second => "second",
            Granularity::Minute => "minute",
            Granularity::Hour => "hour",
            Granularity::Day => "day",
            Granularity::Month => "month",
            Granularity::Year => "year",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Granularity {
    type Err = AugmentError;

    /// Accepts a level name or its numeric catalog code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        if let Ok(code) = s.parse::<u8>() {
            return Self::from_code(code)
                .ok_or_else(|| AugmentError::InvalidInput(format!("unknown granularity code {}", code)));
        }
        Self::ALL
            .into_iter()
            .find(|g| g.to_string() == s)
            .ok_or_else(|| AugmentError::InvalidInput(format!("unknown granularity '{}'", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_ordering_is_fine_to_coarse() {
        assert!(Granularity::Second < Granularity::Minute);
        assert!(Granularity::Month < Granularity::Year);
        assert!(Granularity::Day.is_at_least_as_fine_as(Granularity::Day));
        assert!(!Granularity::Year.is_at_least_as_fine_as(Granularity::Month));
    }

    #[test]
    fn test_codes_round_trip() {
        for g in Granularity::ALL {
            assert_eq!(Granularity::from_code(g.code()), Some(g));
        }
        assert_eq!(Granularity::Year.code(), 9);
        assert_eq!(Granularity::Second.code(), 14);
    }

    #[test]
    fn test_parse_names_and_codes() {
        assert_eq!("Day".parse::<Granularity>().unwrap(), Granularity::Day);
        assert_eq!("10".parse::<Granularity>().unwrap(), Granularity::Month);
        assert!("fortnight".parse::<Granularity>().is_err());
    }

    #[test]
    fn test_detect_midnight_is_day() {
        let values = vec![ts("2020-03-04T00:00:00Z"), ts("2020-03-05T00:00:00Z")];
        assert_eq!(Granularity::detect(&values), Some(Granularity::Day));
    }

    #[test]
    fn test_detect_levels() {
        assert_eq!(
            Granularity::detect(&[ts("2020-01-01T10:30:00Z")]),
            Some(Granularity::Minute)
        );
        assert_eq!(
            Granularity::detect(&[ts("2019-01-01T00:00:00Z"), ts("2020-01-01T00:00:00Z")]),
            Some(Granularity::Year)
        );
        assert_eq!(Granularity::detect(&[]), None);
    }

    #[test]
    fn test_truncate_and_period_end() {
        let v = ts("2020-02-17T13:45:12Z");
        assert_eq!(Granularity::Month.truncate(v), ts("2020-02-01T00:00:00Z"));
        assert_eq!(Granularity::Month.period_end(v), ts("2020-02-29T23:59:59Z"));
        assert_eq!(Granularity::Year.period_end(v), ts("2020-12-31T23:59:59Z"));
        assert_eq!(Granularity::Second.period_end(v), v);
    }
}
