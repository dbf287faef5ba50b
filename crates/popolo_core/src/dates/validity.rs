//! Overlap gate for records carrying a validity window.
//!
//! # Responsibility
//! - Expose a common view (`Dateframeable`) over dated records.
//! - Select sibling records whose window crosses a candidate window.
//! - Turn the selection into a decision under an `OverlapPolicy`.
//!
//! # Invariants
//! - Touching windows never count as conflicts.
//! - The gate only decides; persisting (or not) is the caller's job.

use super::interval::PartialDatesInterval;
use super::partial_date::PartialDate;
use serde::{Deserialize, Serialize};

/// A record that is valid between two optional partial dates.
pub trait Dateframeable {
    fn start_date(&self) -> Option<&PartialDate>;
    fn end_date(&self) -> Option<&PartialDate>;

    /// Validity window built from the record's own bounds.
    fn validity(&self) -> PartialDatesInterval {
        PartialDatesInterval::new(self.start_date().copied(), self.end_date().copied())
    }

    /// Whether the record is valid at the first instant of `moment`.
    fn is_valid_at(&self, moment: &PartialDate) -> bool {
        self.validity().covers(moment)
    }
}

/// Overlap handling option carried by creation requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlapPolicy {
    /// Create the record even when siblings cross its window.
    pub allow_overlap: bool,
}

impl OverlapPolicy {
    pub fn allowing_overlap() -> Self {
        Self {
            allow_overlap: true,
        }
    }

    /// Maps the conflicting sibling ids to a decision.
    pub fn decide<Id>(&self, conflicting: Vec<Id>) -> OverlapDecision<Id> {
        if conflicting.is_empty() {
            OverlapDecision::Clear
        } else if self.allow_overlap {
            OverlapDecision::Overridden { conflicting }
        } else {
            OverlapDecision::Refused { conflicting }
        }
    }
}

/// Outcome of running the overlap gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlapDecision<Id> {
    /// No sibling crosses the candidate window.
    Clear,
    /// Siblings cross the candidate window; the policy lets it through.
    Overridden { conflicting: Vec<Id> },
    /// Siblings cross the candidate window.
    Refused { conflicting: Vec<Id> },
}

impl<Id> OverlapDecision<Id> {
    pub fn may_proceed(&self) -> bool {
        !matches!(self, Self::Refused { .. })
    }

    pub fn conflicting(&self) -> &[Id] {
        match self {
            Self::Clear => &[],
            Self::Overridden { conflicting } | Self::Refused { conflicting } => conflicting,
        }
    }
}

/// Returns the siblings whose window crosses `candidate`.
pub fn find_overlapping<'a, T, I>(candidate: &PartialDatesInterval, siblings: I) -> Vec<&'a T>
where
    T: Dateframeable + 'a,
    I: IntoIterator<Item = &'a T>,
{
    siblings
        .into_iter()
        .filter(|sibling| candidate.overlaps(&sibling.validity()))
        .collect()
}
