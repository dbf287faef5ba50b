//! Partial date value type.
//!
//! # Responsibility
//! - Parse year, year-month, full-date and date-time strings into one
//!   comparable value that remembers its own precision.
//! - Project every value onto the earliest and latest instants it may denote.
//!
//! # Invariants
//! - Components below the stated precision are never populated.
//! - Projections are UTC instants; date-times carrying an offset are shifted.
//! - Equality is structural: `2001` and `2001-01-01` are different values.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

static PARTIAL_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<year>\d{4})(?:-(?P<month>\d{2})(?:-(?P<day>\d{2})(?:[T ](?P<hour>\d{2})(?::(?P<minute>\d{2})(?::(?P<second>\d{2}))?)?(?P<offset>Z|[+-]\d{2}(?::?\d{2})?)?)?)?)?$",
    )
    .expect("valid partial date regex")
});

const MAX_OFFSET_MINUTES: i32 = 24 * 60;

/// Granularity a partial date was written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatePrecision {
    /// `YYYY`
    Year,
    /// `YYYY-MM`
    Month,
    /// `YYYY-MM-DD`
    Day,
    /// `YYYY-MM-DDThh[:mm[:ss]][offset]`
    DateTime,
}

impl DatePrecision {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Year => "year",
            Self::Month => "month",
            Self::Day => "day",
            Self::DateTime => "date_time",
        }
    }
}

/// Error raised when a string cannot be read as a partial date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartialDateError {
    /// Input matches none of the accepted shapes.
    Format { input: String },
    /// Input has the right shape but one component is out of range.
    Component {
        input: String,
        component: &'static str,
    },
}

impl Display for PartialDateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Format { input } => write!(
                f,
                "invalid date `{input}`; expected YYYY, YYYY-MM, YYYY-MM-DD or YYYY-MM-DDThh:mm:ss"
            ),
            Self::Component { input, component } => {
                write!(f, "invalid date `{input}`: {component} is out of range")
            }
        }
    }
}

impl Error for PartialDateError {}

/// A date known to year, month, day or sub-day precision.
///
/// Missing components are unknown rather than zero: as an interval bound a
/// year-only date spans the whole year. Ordering compares the earliest
/// projection first, then the latest one, so `2001` sorts before
/// `2001-06-01` and after `2000-12-31`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PartialDate {
    year: i32,
    month: Option<u32>,
    day: Option<u32>,
    hour: Option<u32>,
    minute: Option<u32>,
    second: Option<u32>,
    utc_offset: Option<i32>,
    precision: DatePrecision,
    earliest: NaiveDateTime,
    upper: NaiveDateTime,
}

#[derive(Debug, Default)]
struct Components {
    year: i32,
    month: Option<u32>,
    day: Option<u32>,
    hour: Option<u32>,
    minute: Option<u32>,
    second: Option<u32>,
    utc_offset: Option<i32>,
}

impl PartialDate {
    /// Parses one of the accepted partial date shapes.
    ///
    /// # Errors
    /// - `PartialDateError::Format` when the shape is not recognized.
    /// - `PartialDateError::Component` for impossible months, days, times
    ///   or offsets.
    pub fn parse(input: &str) -> Result<Self, PartialDateError> {
        let trimmed = input.trim();
        let format_error = || PartialDateError::Format {
            input: input.to_string(),
        };
        let caps = PARTIAL_DATE_RE.captures(trimmed).ok_or_else(format_error)?;

        let number = |name: &str| -> Result<Option<u32>, PartialDateError> {
            match caps.name(name) {
                Some(m) => m.as_str().parse::<u32>().map(Some).map_err(|_| format_error()),
                None => Ok(None),
            }
        };

        let year = number("year")?.ok_or_else(format_error)?;
        let components = Components {
            year: i32::try_from(year).map_err(|_| format_error())?,
            month: number("month")?,
            day: number("day")?,
            hour: number("hour")?,
            minute: number("minute")?,
            second: number("second")?,
            utc_offset: match caps.name("offset") {
                Some(m) => Some(parse_offset(m.as_str()).ok_or_else(|| {
                    PartialDateError::Component {
                        input: input.to_string(),
                        component: "utc offset",
                    }
                })?),
                None => None,
            },
        };

        Self::build(components).map_err(|component| PartialDateError::Component {
            input: input.to_string(),
            component,
        })
    }

    /// Year-only date.
    pub fn from_year(year: i32) -> Result<Self, PartialDateError> {
        Self::build(Components {
            year,
            ..Components::default()
        })
        .map_err(|component| PartialDateError::Component {
            input: year.to_string(),
            component,
        })
    }

    /// Year-month date.
    pub fn from_year_month(year: i32, month: u32) -> Result<Self, PartialDateError> {
        Self::build(Components {
            year,
            month: Some(month),
            ..Components::default()
        })
        .map_err(|component| PartialDateError::Component {
            input: format!("{year:04}-{month:02}"),
            component,
        })
    }

    /// Day-precision date from a calendar date.
    pub fn from_naive_date(date: NaiveDate) -> Self {
        let earliest = date.and_time(NaiveTime::MIN);
        Self {
            year: chrono::Datelike::year(&date),
            month: Some(chrono::Datelike::month(&date)),
            day: Some(chrono::Datelike::day(&date)),
            hour: None,
            minute: None,
            second: None,
            utc_offset: None,
            precision: DatePrecision::Day,
            earliest,
            upper: earliest + TimeDelta::days(1),
        }
    }

    /// Current UTC calendar day.
    pub fn today() -> Self {
        Self::from_naive_date(Utc::now().date_naive())
    }

    fn build(parts: Components) -> Result<Self, &'static str> {
        let precision = match (parts.month, parts.day, parts.hour) {
            (None, _, _) => DatePrecision::Year,
            (Some(_), None, _) => DatePrecision::Month,
            (Some(_), Some(_), None) => DatePrecision::Day,
            (Some(_), Some(_), Some(_)) => DatePrecision::DateTime,
        };

        let (earliest, upper) = match precision {
            DatePrecision::Year => {
                let first = NaiveDate::from_ymd_opt(parts.year, 1, 1).ok_or("year")?;
                let next = NaiveDate::from_ymd_opt(parts.year + 1, 1, 1).ok_or("year")?;
                (first.and_time(NaiveTime::MIN), next.and_time(NaiveTime::MIN))
            }
            DatePrecision::Month => {
                let month = parts.month.ok_or("month")?;
                let first = NaiveDate::from_ymd_opt(parts.year, month, 1).ok_or("month")?;
                let next = if month == 12 {
                    NaiveDate::from_ymd_opt(parts.year + 1, 1, 1)
                } else {
                    NaiveDate::from_ymd_opt(parts.year, month + 1, 1)
                }
                .ok_or("month")?;
                (first.and_time(NaiveTime::MIN), next.and_time(NaiveTime::MIN))
            }
            DatePrecision::Day => {
                let date = calendar_date(&parts)?;
                let next = date.succ_opt().ok_or("day")?;
                (date.and_time(NaiveTime::MIN), next.and_time(NaiveTime::MIN))
            }
            DatePrecision::DateTime => {
                let date = calendar_date(&parts)?;
                let hour = parts.hour.ok_or("hour")?;
                if hour > 23 {
                    return Err("hour");
                }
                if parts.minute.is_some_and(|minute| minute > 59) {
                    return Err("minute");
                }
                if parts.second.is_some_and(|second| second > 59) {
                    return Err("second");
                }
                let time = NaiveTime::from_hms_opt(
                    hour,
                    parts.minute.unwrap_or(0),
                    parts.second.unwrap_or(0),
                )
                .ok_or("time")?;
                let step = if parts.second.is_some() {
                    TimeDelta::seconds(1)
                } else if parts.minute.is_some() {
                    TimeDelta::minutes(1)
                } else {
                    TimeDelta::hours(1)
                };
                let offset = TimeDelta::minutes(i64::from(parts.utc_offset.unwrap_or(0)));
                let utc = date.and_time(time) - offset;
                (utc, utc + step)
            }
        };

        Ok(Self {
            year: parts.year,
            month: parts.month,
            day: parts.day,
            hour: parts.hour,
            minute: parts.minute,
            second: parts.second,
            utc_offset: parts.utc_offset,
            precision,
            earliest,
            upper,
        })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> Option<u32> {
        self.month
    }

    pub fn day(&self) -> Option<u32> {
        self.day
    }

    pub fn hour(&self) -> Option<u32> {
        self.hour
    }

    pub fn minute(&self) -> Option<u32> {
        self.minute
    }

    pub fn second(&self) -> Option<u32> {
        self.second
    }

    /// Signed offset from UTC in minutes, when one was written.
    pub fn utc_offset(&self) -> Option<i32> {
        self.utc_offset
    }

    pub fn precision(&self) -> DatePrecision {
        self.precision
    }

    /// First UTC instant this value may denote.
    pub fn earliest(&self) -> NaiveDateTime {
        self.earliest
    }

    /// Last whole UTC second this value may denote.
    pub fn latest(&self) -> NaiveDateTime {
        self.upper - TimeDelta::seconds(1)
    }

    /// First UTC instant after the span of this value.
    pub fn upper(&self) -> NaiveDateTime {
        self.upper
    }

    /// Whether the whole span of `other` lies inside this value's span.
    pub fn contains(&self, other: &PartialDate) -> bool {
        self.earliest <= other.earliest && other.upper <= self.upper
    }

    fn sort_key(&self) -> impl Ord {
        (
            self.year,
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.second,
            self.utc_offset,
            self.precision,
        )
    }
}

fn calendar_date(parts: &Components) -> Result<NaiveDate, &'static str> {
    let month = parts.month.ok_or("month")?;
    if !(1..=12).contains(&month) {
        return Err("month");
    }
    let day = parts.day.ok_or("day")?;
    NaiveDate::from_ymd_opt(parts.year, month, day).ok_or("day")
}

fn parse_offset(raw: &str) -> Option<i32> {
    if raw == "Z" {
        return Some(0);
    }
    let sign = match raw.as_bytes().first()? {
        b'+' => 1,
        b'-' => -1,
        _ => return None,
    };
    let digits: String = raw[1..].chars().filter(|c| *c != ':').collect();
    let hours: i32 = digits.get(0..2)?.parse().ok()?;
    let minutes: i32 = match digits.get(2..4) {
        Some(value) => value.parse().ok()?,
        None => 0,
    };
    if minutes > 59 {
        return None;
    }
    let total = hours * 60 + minutes;
    if total >= MAX_OFFSET_MINUTES {
        return None;
    }
    Some(sign * total)
}

impl Ord for PartialDate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.earliest
            .cmp(&other.earliest)
            .then_with(|| self.upper.cmp(&other.upper))
            .then_with(|| self.sort_key().cmp(&other.sort_key()))
    }
}

impl PartialOrd for PartialDate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for PartialDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}", self.year)?;
        if let Some(month) = self.month {
            write!(f, "-{month:02}")?;
        }
        if let Some(day) = self.day {
            write!(f, "-{day:02}")?;
        }
        if let Some(hour) = self.hour {
            write!(f, "T{hour:02}")?;
        }
        if let Some(minute) = self.minute {
            write!(f, ":{minute:02}")?;
        }
        if let Some(second) = self.second {
            write!(f, ":{second:02}")?;
        }
        match self.utc_offset {
            Some(0) => write!(f, "Z")?,
            Some(offset) => {
                let sign = if offset < 0 { '-' } else { '+' };
                let abs = offset.abs();
                write!(f, "{sign}{:02}:{:02}", abs / 60, abs % 60)?;
            }
            None => {}
        }
        Ok(())
    }
}

impl FromStr for PartialDate {
    type Err = PartialDateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<NaiveDate> for PartialDate {
    fn from(value: NaiveDate) -> Self {
        Self::from_naive_date(value)
    }
}

impl Serialize for PartialDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PartialDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(D::Error::custom)
    }
}
