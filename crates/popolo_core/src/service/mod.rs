//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into popolo use-cases.
//! - Parse raw request dates and run the overlap gate before writes.
//!
//! # Invariants
//! - Services never bypass repository validation.
//! - Services stay storage-agnostic: they only see repository traits.

use crate::dates::partial_date::{PartialDate, PartialDateError};
use crate::model::event::KeyEventId;
use crate::model::membership::MembershipId;
use crate::model::organization::PostId;
use crate::model::validation::ValidationError;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod area_service;
pub mod event_service;
pub mod membership_service;
pub mod organization_service;
pub mod person_service;
pub mod relation_service;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service error for popolo use-cases.
#[derive(Debug)]
pub enum ServiceError {
    /// A raw date in the request is not a partial date.
    InvalidDate(PartialDateError),
    /// The resulting entity fails its own validation.
    Invalid(ValidationError),
    /// A referenced entity does not exist.
    NotFound { entity: &'static str, id: Uuid },
    /// The post is generic, so the role request must name an organization.
    PostMustBeSpecific(PostId),
    /// The post already belongs to an organization, so the role request
    /// must not name another one.
    PostMustBeGeneric(PostId),
    /// Existing memberships cross the requested window.
    OverlappingInterval { conflicting: Vec<MembershipId> },
    /// No area relationship matches the removal key.
    RelationshipNotFound,
    /// More than one area relationship matches the removal key.
    AmbiguousRelationship { matches: usize },
    /// A key event of the same kind already starts on the same date.
    DuplicateKeyEvent { existing: KeyEventId },
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidDate(err) => write!(f, "{err}"),
            Self::Invalid(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::PostMustBeSpecific(id) => {
                write!(f, "post {id} needs to be specific, i.e. linked to an organization")
            }
            Self::PostMustBeGeneric(id) => {
                write!(f, "post {id} needs to be generic, i.e. not linked to an organization")
            }
            Self::OverlappingInterval { conflicting } => write!(
                f,
                "requested dates overlap {} existing membership(s)",
                conflicting.len()
            ),
            Self::RelationshipNotFound => write!(f, "no relationships found"),
            Self::AmbiguousRelationship { matches } => {
                write!(f, "more than one relationship found ({matches})")
            }
            Self::DuplicateKeyEvent { existing } => {
                write!(f, "key event already exists: {existing}")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidDate(err) => Some(err),
            Self::Invalid(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity, id } => Self::NotFound { entity, id },
            RepoError::Validation(err) => Self::Invalid(err),
            other => Self::Repo(other),
        }
    }
}

impl From<PartialDateError> for ServiceError {
    fn from(value: PartialDateError) -> Self {
        Self::InvalidDate(value)
    }
}

impl From<ValidationError> for ServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Invalid(value)
    }
}

/// Parses an optional raw request date; blank strings count as absent.
pub(crate) fn parse_date(raw: Option<&str>) -> ServiceResult<Option<PartialDate>> {
    match raw.map(str::trim) {
        Some(text) if !text.is_empty() => Ok(Some(PartialDate::parse(text)?)),
        _ => Ok(None),
    }
}

/// Moment of a merge/split/close; today when not given.
pub(crate) fn resolve_moment(moment: Option<PartialDate>) -> PartialDate {
    moment.unwrap_or_else(PartialDate::today)
}

/// Turns a `get_*` miss into `ServiceError::NotFound`.
pub(crate) fn require<T>(found: Option<T>, entity: &'static str, id: Uuid) -> ServiceResult<T> {
    found.ok_or(ServiceError::NotFound { entity, id })
}

#[cfg(test)]
mod tests {
    use super::{parse_date, ServiceError};
    use crate::model::validation::ValidationError;
    use crate::repo::RepoError;
    use uuid::Uuid;

    #[test]
    fn blank_request_dates_are_absent() {
        assert_eq!(parse_date(None).unwrap(), None);
        assert_eq!(parse_date(Some("  ")).unwrap(), None);
        assert!(parse_date(Some("2010")).unwrap().is_some());
        assert!(matches!(
            parse_date(Some("12/2010")),
            Err(ServiceError::InvalidDate(_))
        ));
    }

    #[test]
    fn repo_errors_map_to_semantic_variants() {
        let id = Uuid::new_v4();
        let err = ServiceError::from(RepoError::NotFound {
            entity: "person",
            id,
        });
        assert!(matches!(err, ServiceError::NotFound { entity: "person", id: found } if found == id));

        let err = ServiceError::from(RepoError::Validation(ValidationError::BlankField("name")));
        assert!(matches!(err, ServiceError::Invalid(ValidationError::BlankField("name"))));
    }
}
