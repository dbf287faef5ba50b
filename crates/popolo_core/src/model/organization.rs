//! Organization and post domain models.
//!
//! # Responsibility
//! - Define organizations (with founding/dissolution lifespan) and the posts
//!   they offer.
//! - Provide the closing helper shared by merge and split operations.
//!
//! # Invariants
//! - Organization `name` is never blank.
//! - A post with `organization_id == None` is generic: it can be held in any
//!   organization named at role-assignment time.

use crate::dates::partial_date::PartialDate;
use crate::dates::validity::Dateframeable;
use crate::model::area::AreaId;
use crate::model::validation::{require_text, validate_dateframe, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type OrganizationId = Uuid;
pub type PostId = Uuid;

/// A group with a common purpose: party, council, company, ...
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    /// Main issued identifier (tax code, registry number, ...).
    pub identifier: Option<String>,
    pub classification: Option<String>,
    pub parent_id: Option<OrganizationId>,
    pub founding_date: Option<PartialDate>,
    pub dissolution_date: Option<PartialDate>,
    /// Why the organization ended (merge, split, ...).
    pub end_reason: Option<String>,
}

impl Organization {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), name)
    }

    pub fn with_id(id: OrganizationId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            identifier: None,
            classification: None,
            parent_id: None,
            founding_date: None,
            dissolution_date: None,
            end_reason: None,
        }
    }

    /// Ends the organization at `moment` for `reason`.
    pub fn close(&mut self, moment: PartialDate, reason: impl Into<String>) {
        self.dissolution_date = Some(moment);
        self.end_reason = Some(reason.into());
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("organization name", &self.name)?;
        if self.parent_id == Some(self.id) {
            return Err(ValidationError::SelfReference("organization parent"));
        }
        validate_dateframe(self)
    }
}

impl Dateframeable for Organization {
    fn start_date(&self) -> Option<&PartialDate> {
        self.founding_date.as_ref()
    }

    fn end_date(&self) -> Option<&PartialDate> {
        self.dissolution_date.as_ref()
    }
}

/// A position that exists independently of whoever holds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub label: String,
    /// Alternate label, such as an abbreviation.
    pub other_label: Option<String>,
    /// Function the holder fulfills.
    pub role: Option<String>,
    pub organization_id: Option<OrganizationId>,
    pub area_id: Option<AreaId>,
    /// Post that officially appoints holders of this one.
    pub appointed_by: Option<PostId>,
    pub start_date: Option<PartialDate>,
    pub end_date: Option<PartialDate>,
}

impl Post {
    pub fn new(label: impl Into<String>, organization_id: Option<OrganizationId>) -> Self {
        Self {
            id: Uuid::new_v4(),
            label: label.into(),
            other_label: None,
            role: None,
            organization_id,
            area_id: None,
            appointed_by: None,
            start_date: None,
            end_date: None,
        }
    }

    /// A post not tied to any organization.
    pub fn is_generic(&self) -> bool {
        self.organization_id.is_none()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.appointed_by == Some(self.id) {
            return Err(ValidationError::SelfReference("post appointer"));
        }
        validate_dateframe(self)
    }
}

impl Dateframeable for Post {
    fn start_date(&self) -> Option<&PartialDate> {
        self.start_date.as_ref()
    }

    fn end_date(&self) -> Option<&PartialDate> {
        self.end_date.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::{Organization, Post};
    use crate::dates::partial_date::PartialDate;
    use crate::model::validation::ValidationError;

    #[test]
    fn closing_before_founding_fails_validation() {
        let mut org = Organization::new("Comune di Roma");
        org.founding_date = Some(PartialDate::parse("2001-05-01").unwrap());
        org.close(PartialDate::parse("2000").unwrap(), "merged");
        assert!(matches!(
            org.validate(),
            Err(ValidationError::InvertedDates { .. })
        ));
    }

    #[test]
    fn post_cannot_appoint_itself() {
        let mut post = Post::new("Sindaco", None);
        assert!(post.is_generic());
        post.appointed_by = Some(post.id);
        assert_eq!(
            post.validate(),
            Err(ValidationError::SelfReference("post appointer"))
        );
    }
}
