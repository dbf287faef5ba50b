//! Geographic area models.
//!
//! # Responsibility
//! - Define areas, their typed relationships and ISTAT levels.
//!
//! # Invariants
//! - An area is never its own parent nor related to itself.

use crate::dates::partial_date::PartialDate;
use crate::dates::validity::Dateframeable;
use crate::model::validation::{validate_dateframe, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type AreaId = Uuid;
pub type AreaRelationshipId = Uuid;

/// Administrative level according to ISTAT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IstatLevel {
    #[serde(rename = "NAZ")]
    Country,
    #[serde(rename = "RIP")]
    Partition,
    #[serde(rename = "REG")]
    Region,
    #[serde(rename = "PROV")]
    Province,
    #[serde(rename = "CM")]
    Metropolitan,
    #[serde(rename = "COM")]
    Municipality,
}

impl IstatLevel {
    pub fn code(self) -> &'static str {
        match self {
            Self::Country => "NAZ",
            Self::Partition => "RIP",
            Self::Region => "REG",
            Self::Province => "PROV",
            Self::Metropolitan => "CM",
            Self::Municipality => "COM",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "NAZ" => Some(Self::Country),
            "RIP" => Some(Self::Partition),
            "REG" => Some(Self::Region),
            "PROV" => Some(Self::Province),
            "CM" => Some(Self::Metropolitan),
            "COM" => Some(Self::Municipality),
            _ => None,
        }
    }
}

/// A geographic area whose extent and status may change over time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Area {
    pub id: AreaId,
    pub name: String,
    pub identifier: Option<String>,
    /// Free category, e.g. a GeoNames feature code.
    pub classification: Option<String>,
    pub istat_level: Option<IstatLevel>,
    pub parent_id: Option<AreaId>,
    pub inhabitants: Option<u32>,
    pub start_date: Option<PartialDate>,
    pub end_date: Option<PartialDate>,
    pub end_reason: Option<String>,
}

impl Area {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            identifier: None,
            classification: None,
            istat_level: None,
            parent_id: None,
            inhabitants: None,
            start_date: None,
            end_date: None,
            end_reason: None,
        }
    }

    pub fn close(&mut self, moment: PartialDate, reason: impl Into<String>) {
        self.end_date = Some(moment);
        self.end_reason = Some(reason.into());
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.parent_id == Some(self.id) {
            return Err(ValidationError::SelfReference("area parent"));
        }
        validate_dateframe(self)
    }
}

impl Dateframeable for Area {
    fn start_date(&self) -> Option<&PartialDate> {
        self.start_date.as_ref()
    }

    fn end_date(&self) -> Option<&PartialDate> {
        self.end_date.as_ref()
    }
}

/// Kind of relation between two areas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AreaRelationshipKind {
    #[serde(rename = "FIP")]
    FormerIstatParent,
    #[serde(rename = "AMP")]
    AlternateMountainCommunityParent,
    #[serde(rename = "ACP")]
    AlternateConsortiumParent,
}

impl AreaRelationshipKind {
    pub fn code(self) -> &'static str {
        match self {
            Self::FormerIstatParent => "FIP",
            Self::AlternateMountainCommunityParent => "AMP",
            Self::AlternateConsortiumParent => "ACP",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "FIP" => Some(Self::FormerIstatParent),
            "AMP" => Some(Self::AlternateMountainCommunityParent),
            "ACP" => Some(Self::AlternateConsortiumParent),
            _ => None,
        }
    }
}

/// Directed, dated relation from one area to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaRelationship {
    pub id: AreaRelationshipId,
    pub source_area_id: AreaId,
    pub dest_area_id: AreaId,
    pub classification: AreaRelationshipKind,
    pub note: Option<String>,
    pub start_date: Option<PartialDate>,
    pub end_date: Option<PartialDate>,
}

impl AreaRelationship {
    pub fn new(
        source_area_id: AreaId,
        dest_area_id: AreaId,
        classification: AreaRelationshipKind,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_area_id,
            dest_area_id,
            classification,
            note: None,
            start_date: None,
            end_date: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.source_area_id == self.dest_area_id {
            return Err(ValidationError::SelfReference("area relationship"));
        }
        validate_dateframe(self)
    }
}

impl Dateframeable for AreaRelationship {
    fn start_date(&self) -> Option<&PartialDate> {
        self.start_date.as_ref()
    }

    fn end_date(&self) -> Option<&PartialDate> {
        self.end_date.as_ref()
    }
}
