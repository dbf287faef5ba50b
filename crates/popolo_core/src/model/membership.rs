//! Membership domain model.
//!
//! # Responsibility
//! - Define the member/organization relation, optionally held through a post.
//!
//! # Invariants
//! - A membership always names exactly one member (person or organization)
//!   and one organization; the sum type makes "no member" unrepresentable.
//! - An organization is never a member of itself.

use crate::dates::partial_date::PartialDate;
use crate::dates::validity::Dateframeable;
use crate::model::area::AreaId;
use crate::model::organization::{OrganizationId, PostId};
use crate::model::person::PersonId;
use crate::model::validation::{validate_dateframe, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type MembershipId = Uuid;

/// Who holds a membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Member {
    Person(PersonId),
    Organization(OrganizationId),
}

impl Member {
    pub fn person_id(&self) -> Option<PersonId> {
        match self {
            Self::Person(id) => Some(*id),
            Self::Organization(_) => None,
        }
    }

    pub fn organization_id(&self) -> Option<OrganizationId> {
        match self {
            Self::Person(_) => None,
            Self::Organization(id) => Some(*id),
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Self::Person(id) | Self::Organization(id) => *id,
        }
    }
}

/// Relation between a member and an organization, optionally through a post.
///
/// A membership with a post is a *role*.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub id: MembershipId,
    pub member: Member,
    pub organization_id: OrganizationId,
    pub post_id: Option<PostId>,
    /// Organization on whose behalf the member holds the membership.
    pub on_behalf_of: Option<OrganizationId>,
    pub area_id: Option<AreaId>,
    pub label: Option<String>,
    pub role: Option<String>,
    pub start_date: Option<PartialDate>,
    pub end_date: Option<PartialDate>,
}

impl Membership {
    pub fn new(member: Member, organization_id: OrganizationId) -> Self {
        Self {
            id: Uuid::new_v4(),
            member,
            organization_id,
            post_id: None,
            on_behalf_of: None,
            area_id: None,
            label: None,
            role: None,
            start_date: None,
            end_date: None,
        }
    }

    pub fn is_role(&self) -> bool {
        self.post_id.is_some()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.member == Member::Organization(self.organization_id) {
            return Err(ValidationError::SelfReference("organization membership"));
        }
        validate_dateframe(self)
    }
}

impl Dateframeable for Membership {
    fn start_date(&self) -> Option<&PartialDate> {
        self.start_date.as_ref()
    }

    fn end_date(&self) -> Option<&PartialDate> {
        self.end_date.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::{Member, Membership};
    use crate::model::validation::ValidationError;
    use uuid::Uuid;

    #[test]
    fn member_serializes_as_tagged_reference() {
        let id = Uuid::nil();
        let json = serde_json::to_value(Member::Organization(id)).unwrap();
        assert_eq!(json["kind"], "organization");
        assert_eq!(json["id"], id.to_string());
    }

    #[test]
    fn organization_cannot_join_itself() {
        let org = Uuid::new_v4();
        let membership = Membership::new(Member::Organization(org), org);
        assert_eq!(
            membership.validate(),
            Err(ValidationError::SelfReference("organization membership"))
        );
    }
}
