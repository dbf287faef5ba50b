//! Ownership and personal relationship models.
//!
//! # Invariants
//! - Ownership percentage lies in `[0, 1]`.
//! - Neither relation may point back at its own source.

use crate::dates::partial_date::PartialDate;
use crate::dates::validity::Dateframeable;
use crate::model::organization::OrganizationId;
use crate::model::person::PersonId;
use crate::model::validation::{require_text, validate_dateframe, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type OwnershipId = Uuid;
pub type PersonalRelationshipId = Uuid;

/// Who owns (a share of) an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Owner {
    Person(PersonId),
    Organization(OrganizationId),
}

impl Owner {
    pub fn id(&self) -> Uuid {
        match self {
            Self::Person(id) | Self::Organization(id) => *id,
        }
    }
}

/// Share of an organization held by a person or another organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ownership {
    pub id: OwnershipId,
    pub organization_id: OrganizationId,
    pub owner: Owner,
    /// Fraction owned, from 0 to 1.
    pub percentage: f64,
    pub start_date: Option<PartialDate>,
    pub end_date: Option<PartialDate>,
}

impl Ownership {
    pub fn new(organization_id: OrganizationId, owner: Owner, percentage: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            organization_id,
            owner,
            percentage,
            start_date: None,
            end_date: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(0.0..=1.0).contains(&self.percentage) {
            return Err(ValidationError::PercentageOutOfRange(self.percentage));
        }
        if self.owner == Owner::Organization(self.organization_id) {
            return Err(ValidationError::SelfReference("ownership"));
        }
        validate_dateframe(self)
    }
}

impl Dateframeable for Ownership {
    fn start_date(&self) -> Option<&PartialDate> {
        self.start_date.as_ref()
    }

    fn end_date(&self) -> Option<&PartialDate> {
        self.end_date.as_ref()
    }
}

/// Qualitative weight of a personal relationship.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipWeight {
    StronglyNegative,
    Negative,
    #[default]
    Neutral,
    Positive,
    StronglyPositive,
}

impl RelationshipWeight {
    pub fn as_i64(self) -> i64 {
        match self {
            Self::StronglyNegative => -2,
            Self::Negative => -1,
            Self::Neutral => 0,
            Self::Positive => 1,
            Self::StronglyPositive => 2,
        }
    }

    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            -2 => Some(Self::StronglyNegative),
            -1 => Some(Self::Negative),
            0 => Some(Self::Neutral),
            1 => Some(Self::Positive),
            2 => Some(Self::StronglyPositive),
            _ => None,
        }
    }
}

/// Directed relationship between two persons (family, friendship, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalRelationship {
    pub id: PersonalRelationshipId,
    pub source_person_id: PersonId,
    pub dest_person_id: PersonId,
    pub classification: String,
    pub weight: RelationshipWeight,
    pub start_date: Option<PartialDate>,
    pub end_date: Option<PartialDate>,
}

impl PersonalRelationship {
    pub fn new(
        source_person_id: PersonId,
        dest_person_id: PersonId,
        classification: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_person_id,
            dest_person_id,
            classification: classification.into(),
            weight: RelationshipWeight::Neutral,
            start_date: None,
            end_date: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("relationship classification", &self.classification)?;
        if self.source_person_id == self.dest_person_id {
            return Err(ValidationError::SelfReference("personal relationship"));
        }
        validate_dateframe(self)
    }
}

impl Dateframeable for PersonalRelationship {
    fn start_date(&self) -> Option<&PartialDate> {
        self.start_date.as_ref()
    }

    fn end_date(&self) -> Option<&PartialDate> {
        self.end_date.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::{Owner, Ownership, RelationshipWeight};
    use crate::model::validation::ValidationError;
    use uuid::Uuid;

    #[test]
    fn percentage_must_be_a_fraction() {
        let org = Uuid::new_v4();
        let owner = Owner::Person(Uuid::new_v4());
        assert!(Ownership::new(org, owner, 0.51).validate().is_ok());
        assert_eq!(
            Ownership::new(org, owner, 51.0).validate(),
            Err(ValidationError::PercentageOutOfRange(51.0))
        );
        assert!(Ownership::new(org, owner, f64::NAN).validate().is_err());
    }

    #[test]
    fn weight_round_trips_through_db_integer() {
        for value in -2..=2 {
            let weight = RelationshipWeight::from_i64(value).unwrap();
            assert_eq!(weight.as_i64(), value);
        }
        assert_eq!(RelationshipWeight::from_i64(3), None);
    }
}
