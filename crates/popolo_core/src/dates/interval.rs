//! Validity windows bounded by partial dates.
//!
//! # Responsibility
//! - Represent a possibly open `[start, end]` window.
//! - Measure the signed overlap between two windows.
//!
//! # Invariants
//! - An unbounded start extends to -infinity, an unbounded end to +infinity.
//! - Overlap is symmetric in its two arguments.
//! - One window ending on the exact value the other starts on measures zero
//!   (touching), which callers treat as non-overlapping. This only holds for
//!   back-to-back windows; a window lying inside the other always crosses.

use super::partial_date::{PartialDate, PartialDateError};
use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

/// One side of a validity window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bound {
    /// The side is unknown and does not constrain the window.
    #[default]
    Unbounded,
    /// The side is a known partial date.
    Bounded(PartialDate),
}

impl Bound {
    /// Parses an optional raw value; `None` yields `Bound::Unbounded`.
    pub fn parse(raw: Option<&str>) -> Result<Self, PartialDateError> {
        match raw {
            Some(value) => PartialDate::parse(value).map(Self::Bounded),
            None => Ok(Self::Unbounded),
        }
    }

    pub fn as_date(&self) -> Option<&PartialDate> {
        match self {
            Self::Bounded(date) => Some(date),
            Self::Unbounded => None,
        }
    }
}

impl From<PartialDate> for Bound {
    fn from(value: PartialDate) -> Self {
        Self::Bounded(value)
    }
}

impl From<Option<PartialDate>> for Bound {
    fn from(value: Option<PartialDate>) -> Self {
        value.map_or(Self::Unbounded, Self::Bounded)
    }
}

/// Signed overlap between two validity windows.
///
/// `Finite` holds `overlap_end - overlap_start`; positive means crossing,
/// zero touching and negative disjoint. `Unbounded` is returned when the
/// shared window is open on at least one side and always counts as crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Overlap {
    Finite(TimeDelta),
    Unbounded,
}

impl Overlap {
    pub fn is_crossing(&self) -> bool {
        match self {
            Self::Finite(delta) => *delta > TimeDelta::zero(),
            Self::Unbounded => true,
        }
    }

    pub fn is_touching(&self) -> bool {
        matches!(self, Self::Finite(delta) if *delta == TimeDelta::zero())
    }

    pub fn is_disjoint(&self) -> bool {
        matches!(self, Self::Finite(delta) if *delta < TimeDelta::zero())
    }

    /// `1`, `0` or `-1` following the crossing/touching/disjoint split.
    pub fn signum(&self) -> i32 {
        if self.is_crossing() {
            1
        } else if self.is_touching() {
            0
        } else {
            -1
        }
    }

    pub fn as_delta(&self) -> Option<TimeDelta> {
        match self {
            Self::Finite(delta) => Some(*delta),
            Self::Unbounded => None,
        }
    }

    /// Whole days of overlap, truncated toward zero.
    pub fn num_days(&self) -> Option<i64> {
        self.as_delta().map(|delta| delta.num_days())
    }
}

impl Display for Overlap {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unbounded => write!(f, "unbounded"),
            Self::Finite(delta) if delta.num_seconds() % 86_400 == 0 => {
                write!(f, "{} days", delta.num_days())
            }
            Self::Finite(delta) => write!(f, "{} seconds", delta.num_seconds()),
        }
    }
}

/// A validity window with optional partial-date bounds.
///
/// Construction never checks ordering: an inverted window is still a valid
/// operand for overlap math. Use [`PartialDatesInterval::is_well_ordered`]
/// where ordering matters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartialDatesInterval {
    start: Bound,
    end: Bound,
}

impl PartialDatesInterval {
    pub fn new(start: impl Into<Bound>, end: impl Into<Bound>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Builds a window from two optional raw strings.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self, PartialDateError> {
        Ok(Self {
            start: Bound::parse(start)?,
            end: Bound::parse(end)?,
        })
    }

    /// Window open on both sides.
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn start(&self) -> &Bound {
        &self.start
    }

    pub fn end(&self) -> &Bound {
        &self.end
    }

    /// `false` only when both bounds are known and the start begins after
    /// the last instant of the end.
    pub fn is_well_ordered(&self) -> bool {
        match (self.start.as_date(), self.end.as_date()) {
            (Some(start), Some(end)) => start.earliest() <= end.latest(),
            _ => true,
        }
    }

    /// Whether the first instant of `moment` falls inside this window.
    pub fn covers(&self, moment: &PartialDate) -> bool {
        let after_start = self
            .start
            .as_date()
            .map_or(true, |start| start.earliest() <= moment.earliest());
        let before_end = self
            .end
            .as_date()
            .map_or(true, |end| moment.earliest() < end.upper());
        after_start && before_end
    }

    /// Signed overlap with `other`; see [`intervals_overlap`].
    pub fn overlap(&self, other: &PartialDatesInterval) -> Overlap {
        intervals_overlap(self, other)
    }

    /// Whether the two windows genuinely cross (touching does not count).
    pub fn overlaps(&self, other: &PartialDatesInterval) -> bool {
        self.overlap(other).is_crossing()
    }
}

impl Display for PartialDatesInterval {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let Some(start) = self.start.as_date() {
            write!(f, "{start}")?;
        }
        write!(f, "..")?;
        if let Some(end) = self.end.as_date() {
            write!(f, "{end}")?;
        }
        Ok(())
    }
}

/// Bounds sharing the most constraining instant on one side of the overlap.
struct Limit<'a> {
    instant: NaiveDateTime,
    bounds: Vec<(usize, &'a PartialDate)>,
}

fn limiting_bounds<'a>(
    pair: [&'a PartialDatesInterval; 2],
    side: fn(&PartialDatesInterval) -> &Bound,
    project: fn(&PartialDate) -> NaiveDateTime,
    prefer: Ordering,
) -> Option<Limit<'a>> {
    let mut limit: Option<Limit<'a>> = None;
    for (owner, interval) in pair.into_iter().enumerate() {
        let Some(date) = side(interval).as_date() else {
            continue;
        };
        let instant = project(date);
        let replace = match &limit {
            Some(current) => instant.cmp(&current.instant) == prefer,
            None => true,
        };
        if replace {
            limit = Some(Limit {
                instant,
                bounds: vec![(owner, date)],
            });
        } else if let Some(current) = limit.as_mut() {
            if current.instant == instant {
                current.bounds.push((owner, date));
            }
        }
    }
    limit
}

/// Measures how much two validity windows overlap.
///
/// The shared window runs from the latest known start (earliest projection)
/// to the earliest known end (exclusive upper projection). When the end that
/// closes the shared window and the start that opens it come from different
/// windows, are the same partial date, and the two windows sit back to back
/// (neither contained in the other), the windows touch and the result is
/// exactly zero.
pub fn intervals_overlap(a: &PartialDatesInterval, b: &PartialDatesInterval) -> Overlap {
    let pair = [a, b];
    let overlap_start = limiting_bounds(
        pair,
        PartialDatesInterval::start,
        PartialDate::earliest,
        Ordering::Greater,
    );
    let overlap_end = limiting_bounds(
        pair,
        PartialDatesInterval::end,
        PartialDate::upper,
        Ordering::Less,
    );

    let (Some(start), Some(end)) = (overlap_start, overlap_end) else {
        return Overlap::Unbounded;
    };

    // The window closing the overlap must open before it, and the window
    // opening the overlap must close after it.
    let back_to_back = |end_owner: usize, start_owner: usize| {
        let opens_before = pair[end_owner]
            .start
            .as_date()
            .map_or(true, |date| date.earliest() < start.instant);
        let closes_after = pair[start_owner]
            .end
            .as_date()
            .map_or(true, |date| date.upper() > end.instant);
        opens_before && closes_after
    };
    let touching = end.bounds.iter().any(|&(end_owner, end_date)| {
        start.bounds.iter().any(|&(start_owner, start_date)| {
            start_owner != end_owner
                && start_date == end_date
                && back_to_back(end_owner, start_owner)
        })
    });
    if touching {
        return Overlap::Finite(TimeDelta::zero());
    }

    Overlap::Finite(end.instant - start.instant)
}

#[cfg(test)]
mod tests {
    use super::{intervals_overlap, Bound, Overlap, PartialDatesInterval};
    use crate::dates::partial_date::PartialDate;
    use chrono::TimeDelta;

    fn window(start: Option<&str>, end: Option<&str>) -> PartialDatesInterval {
        PartialDatesInterval::parse(start, end).unwrap()
    }

    #[test]
    fn shared_year_bound_is_touching() {
        let a = window(Some("2001"), Some("2005"));
        let b = window(Some("2005"), Some("2010"));
        assert_eq!(intervals_overlap(&a, &b), Overlap::Finite(TimeDelta::zero()));
        assert!(intervals_overlap(&a, &b).is_touching());
    }

    #[test]
    fn consecutive_days_are_touching() {
        let a = window(Some("2010-01-01"), Some("2012-12-31"));
        let b = window(Some("2013-01-01"), None);
        assert!(intervals_overlap(&a, &b).is_touching());
    }

    #[test]
    fn day_level_crossing_is_positive() {
        let a = window(Some("2001-01-01"), Some("2001-06-30"));
        let b = window(Some("2001-03-01"), Some("2001-12-31"));
        let overlap = intervals_overlap(&a, &b);
        assert!(overlap.is_crossing());
        assert_eq!(overlap.num_days(), Some(122));
    }

    #[test]
    fn open_sides_do_not_invent_overlap() {
        let a = window(None, Some("2001-06-01"));
        let b = window(Some("2001-07-01"), None);
        let overlap = intervals_overlap(&a, &b);
        assert!(overlap.is_disjoint());
        assert_eq!(overlap.num_days(), Some(-29));
    }

    #[test]
    fn shared_open_side_is_unbounded() {
        let a = window(None, Some("2001"));
        let b = window(None, Some("1990"));
        assert_eq!(intervals_overlap(&a, &b), Overlap::Unbounded);
        assert!(intervals_overlap(&a, &b).is_crossing());
        assert_eq!(
            intervals_overlap(&PartialDatesInterval::unbounded(), &a),
            Overlap::Unbounded
        );
    }

    #[test]
    fn year_bound_contains_more_precise_dates() {
        let a = window(Some("2001"), Some("2005"));
        let b = window(Some("2005-06-01"), Some("2008"));
        assert!(intervals_overlap(&a, &b).is_crossing());
    }

    #[test]
    fn degenerate_window_inside_another_is_crossing() {
        let single = window(Some("2005"), Some("2005"));
        let wide = window(Some("2001"), Some("2010"));
        assert!(intervals_overlap(&single, &wide).is_crossing());
        assert!(intervals_overlap(&wide, &single).is_crossing());
    }

    #[test]
    fn single_year_window_sharing_a_bound_is_crossing() {
        let single = window(Some("2005"), Some("2005"));
        let later = window(Some("2005"), Some("2010"));
        let earlier = window(Some("2001"), Some("2005"));

        assert_eq!(intervals_overlap(&single, &later).num_days(), Some(365));
        assert!(intervals_overlap(&later, &single).is_crossing());
        assert!(intervals_overlap(&earlier, &single).is_crossing());
        assert!(intervals_overlap(&single, &earlier).is_crossing());
    }

    #[test]
    fn identical_windows_are_crossing() {
        let day = window(Some("2010-03-01"), Some("2010-03-01"));
        assert_eq!(intervals_overlap(&day, &day).num_days(), Some(1));

        let span = window(Some("2001"), Some("2005"));
        assert!(intervals_overlap(&span, &span).is_crossing());
    }

    #[test]
    fn overlap_is_symmetric() {
        let samples = [
            window(None, None),
            window(Some("2001"), Some("2005")),
            window(Some("2005"), Some("2010")),
            window(Some("2005-12-31"), None),
            window(None, Some("2004-12")),
            window(Some("2003-02-01T10:00Z"), Some("2003-02-01T11:00+01:00")),
            window(Some("2009"), Some("2002")),
            window(Some("2005"), Some("2005")),
        ];
        for a in &samples {
            for b in &samples {
                assert_eq!(intervals_overlap(a, b), intervals_overlap(b, a), "{a} vs {b}");
            }
        }
    }

    #[test]
    fn well_ordered_uses_maximal_range() {
        assert!(window(Some("2005-06"), Some("2005")).is_well_ordered());
        assert!(window(None, Some("2005")).is_well_ordered());
        assert!(!window(Some("2006"), Some("2005-12-31")).is_well_ordered());
    }

    #[test]
    fn covers_checks_first_instant_of_moment() {
        let w = window(Some("2001"), Some("2005"));
        let inside = PartialDate::parse("2005-12-31").unwrap();
        let after = PartialDate::parse("2006-01-01").unwrap();
        let before = PartialDate::parse("2000-12").unwrap();
        assert!(w.covers(&inside));
        assert!(!w.covers(&after));
        assert!(!w.covers(&before));
        assert!(PartialDatesInterval::unbounded().covers(&before));
    }

    #[test]
    fn bound_conversions() {
        let date = PartialDate::parse("2001").unwrap();
        assert_eq!(Bound::from(Some(date)), Bound::Bounded(date));
        assert_eq!(Bound::from(None::<PartialDate>), Bound::Unbounded);
        assert_eq!(Bound::parse(None).unwrap(), Bound::Unbounded);
        assert!(Bound::parse(Some("20-01")).is_err());
        assert_eq!(window(Some("2001"), None).to_string(), "2001..");
    }
}
