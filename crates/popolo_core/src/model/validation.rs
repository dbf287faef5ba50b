//! Explicit entity validation rules.
//!
//! # Responsibility
//! - Hold the checks every dated entity runs before persistence.
//!
//! # Invariants
//! - Known start and end must be ordered (maximal-range comparison).
//! - Checks are pure and invoked explicitly by `validate()` methods.

use crate::dates::partial_date::PartialDate;
use crate::dates::validity::Dateframeable;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Entity-level validation failure.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Both dates are known and the start comes after the end.
    InvertedDates { start: PartialDate, end: PartialDate },
    /// A required text field is empty after trim.
    BlankField(&'static str),
    /// Ownership share outside `[0, 1]`.
    PercentageOutOfRange(f64),
    /// A relation points back at the record it starts from.
    SelfReference(&'static str),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvertedDates { start, end } => {
                write!(f, "initial date must precede end date ({start} > {end})")
            }
            Self::BlankField(field) => write!(f, "{field} must not be blank"),
            Self::PercentageOutOfRange(value) => {
                write!(f, "percentage must be between 0 and 1, got {value}")
            }
            Self::SelfReference(relation) => write!(f, "{relation} cannot point to itself"),
        }
    }
}

impl Error for ValidationError {}

/// Rejects records whose known start comes after their known end.
pub fn validate_dateframe<T: Dateframeable + ?Sized>(record: &T) -> Result<(), ValidationError> {
    if record.validity().is_well_ordered() {
        return Ok(());
    }
    match (record.start_date(), record.end_date()) {
        (Some(start), Some(end)) => Err(ValidationError::InvertedDates {
            start: *start,
            end: *end,
        }),
        _ => Ok(()),
    }
}

pub fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::BlankField(field));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{require_text, validate_dateframe, ValidationError};
    use crate::dates::partial_date::PartialDate;
    use crate::dates::validity::Dateframeable;

    struct Window(Option<PartialDate>, Option<PartialDate>);

    impl Dateframeable for Window {
        fn start_date(&self) -> Option<&PartialDate> {
            self.0.as_ref()
        }

        fn end_date(&self) -> Option<&PartialDate> {
            self.1.as_ref()
        }
    }

    fn date(raw: &str) -> Option<PartialDate> {
        Some(PartialDate::parse(raw).unwrap())
    }

    #[test]
    fn inverted_dates_are_rejected() {
        let err = validate_dateframe(&Window(date("2010-05-01"), date("2009"))).unwrap_err();
        assert!(matches!(err, ValidationError::InvertedDates { .. }));
        assert!(err.to_string().contains("initial date must precede end date"));
    }

    #[test]
    fn open_or_overlapping_precisions_pass() {
        validate_dateframe(&Window(None, date("2009"))).unwrap();
        validate_dateframe(&Window(date("2009-07"), date("2009"))).unwrap();
        validate_dateframe(&Window(date("2009-07-01"), date("2009-07-01"))).unwrap();
    }

    #[test]
    fn blank_text_is_rejected() {
        assert_eq!(
            require_text("name", "   "),
            Err(ValidationError::BlankField("name"))
        );
        require_text("name", "Ada").unwrap();
    }
}
