//! Event models.
//!
//! # Responsibility
//! - Define events people may attend, with timestamp-precision windows.
//! - Define key events (elections, legislatures) organizations refer to.
//!
//! # Invariants
//! - Event and key event windows are never inverted.
//! - A key event is unique per (start date, kind).

use crate::dates::partial_date::PartialDate;
use crate::dates::validity::Dateframeable;
use crate::model::area::AreaId;
use crate::model::validation::{require_text, validate_dateframe, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type EventId = Uuid;
pub type KeyEventId = Uuid;

/// An occurrence that people may attend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub name: String,
    pub description: Option<String>,
    /// Starting timestamp; any partial-date precision is accepted.
    pub start_date: Option<PartialDate>,
    pub end_date: Option<PartialDate>,
    /// Free-text address.
    pub location: Option<String>,
    pub area_id: Option<AreaId>,
    pub status: Option<String>,
}

impl Event {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            start_date: None,
            end_date: None,
            location: None,
            area_id: None,
            status: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("event name", &self.name)?;
        validate_dateframe(self)
    }
}

impl Dateframeable for Event {
    fn start_date(&self) -> Option<&PartialDate> {
        self.start_date.as_ref()
    }

    fn end_date(&self) -> Option<&PartialDate> {
        self.end_date.as_ref()
    }
}

/// Kind of key event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyEventKind {
    /// Generic election round.
    #[default]
    #[serde(rename = "ELE")]
    Election,
    #[serde(rename = "ELE-POL")]
    NationalElection,
    #[serde(rename = "ELE-EU")]
    EuropeanElection,
    #[serde(rename = "ELE-REG")]
    RegionalElection,
    #[serde(rename = "ELE-METRO")]
    MetropolitanElection,
    #[serde(rename = "ELE-PROV")]
    ProvincialElection,
    #[serde(rename = "ELE-COM")]
    MunicipalElection,
    #[serde(rename = "ITL")]
    ItalianLegislature,
    #[serde(rename = "EUL")]
    EuropeanLegislature,
    #[serde(rename = "XAD")]
    ExternalAdministration,
}

impl KeyEventKind {
    const ALL: [Self; 10] = [
        Self::Election,
        Self::NationalElection,
        Self::EuropeanElection,
        Self::RegionalElection,
        Self::MetropolitanElection,
        Self::ProvincialElection,
        Self::MunicipalElection,
        Self::ItalianLegislature,
        Self::EuropeanLegislature,
        Self::ExternalAdministration,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Self::Election => "ELE",
            Self::NationalElection => "ELE-POL",
            Self::EuropeanElection => "ELE-EU",
            Self::RegionalElection => "ELE-REG",
            Self::MetropolitanElection => "ELE-METRO",
            Self::ProvincialElection => "ELE-PROV",
            Self::MunicipalElection => "ELE-COM",
            Self::ItalianLegislature => "ITL",
            Self::EuropeanLegislature => "EUL",
            Self::ExternalAdministration => "XAD",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.code() == code)
    }

    pub fn is_election(self) -> bool {
        self.code().starts_with("ELE")
    }
}

/// An electoral session or legislature that groups other records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub id: KeyEventId,
    pub name: Option<String>,
    pub kind: KeyEventKind,
    pub identifier: Option<String>,
    pub start_date: Option<PartialDate>,
    pub end_date: Option<PartialDate>,
}

impl KeyEvent {
    pub fn new(kind: KeyEventKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: None,
            kind,
            identifier: None,
            start_date: None,
            end_date: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_dateframe(self)
    }
}

impl Dateframeable for KeyEvent {
    fn start_date(&self) -> Option<&PartialDate> {
        self.start_date.as_ref()
    }

    fn end_date(&self) -> Option<&PartialDate> {
        self.end_date.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::{Event, KeyEvent, KeyEventKind};
    use crate::dates::partial_date::PartialDate;
    use crate::dates::validity::Dateframeable;
    use crate::model::validation::ValidationError;

    #[test]
    fn event_window_accepts_timestamps() {
        let mut event = Event::new("Consiglio comunale, seduta");
        event.start_date = Some(PartialDate::parse("2018-03-01T18:00+01:00").unwrap());
        event.end_date = Some(PartialDate::parse("2018-03-01T21:30+01:00").unwrap());
        assert!(event.validate().is_ok());
        assert!(event.is_valid_at(&PartialDate::parse("2018-03-01T20:00+01:00").unwrap()));

        event.end_date = Some(PartialDate::parse("2018-02-28").unwrap());
        assert!(matches!(
            event.validate(),
            Err(ValidationError::InvertedDates { .. })
        ));
    }

    #[test]
    fn event_needs_a_name() {
        assert_eq!(
            Event::new(" ").validate(),
            Err(ValidationError::BlankField("event name"))
        );
    }

    #[test]
    fn key_event_codes_round_trip() {
        for code in ["ELE", "ELE-COM", "ITL", "XAD"] {
            assert_eq!(KeyEventKind::from_code(code).unwrap().code(), code);
        }
        assert_eq!(KeyEventKind::from_code("ELE-XX"), None);
        assert!(KeyEventKind::MunicipalElection.is_election());
        assert!(!KeyEventKind::ItalianLegislature.is_election());
        assert_eq!(KeyEvent::new(KeyEventKind::default()).kind, KeyEventKind::Election);
    }
}
