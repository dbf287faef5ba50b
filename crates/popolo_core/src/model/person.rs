//! Person domain model.
//!
//! # Invariants
//! - `name` is never blank.
//! - Birth and death dates act as the person's validity window.

use crate::dates::partial_date::PartialDate;
use crate::dates::validity::Dateframeable;
use crate::model::validation::{require_text, validate_dateframe, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type PersonId = Uuid;

/// A real person, alive or dead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    /// Full display name.
    pub name: String,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub gender: Option<String>,
    pub birth_date: Option<PartialDate>,
    pub death_date: Option<PartialDate>,
}

impl Person {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), name)
    }

    /// Creates a person with a caller-provided identity (imports).
    pub fn with_id(id: PersonId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            given_name: None,
            family_name: None,
            gender: None,
            birth_date: None,
            death_date: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("person name", &self.name)?;
        validate_dateframe(self)
    }
}

impl Dateframeable for Person {
    fn start_date(&self) -> Option<&PartialDate> {
        self.birth_date.as_ref()
    }

    fn end_date(&self) -> Option<&PartialDate> {
        self.death_date.as_ref()
    }
}
