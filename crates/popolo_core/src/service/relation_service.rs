//! Ownership and personal relationship use-case service.

use crate::model::organization::OrganizationId;
use crate::model::person::PersonId;
use crate::model::relation::{Owner, Ownership, PersonalRelationship, RelationshipWeight};
use crate::repo::organization_repo::OrganizationRepository;
use crate::repo::person_repo::PersonRepository;
use crate::repo::relation_repo::RelationRepository;
use crate::service::{parse_date, require, ServiceResult};
use log::info;
use serde::Deserialize;

/// Request model for an ownership share.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct OwnershipRequest {
    /// Fraction owned, from 0 to 1.
    pub percentage: f64,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Request model for a personal relationship.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RelationshipRequest {
    pub classification: String,
    pub weight: RelationshipWeight,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Relation service facade over repository implementations.
pub struct RelationService<P, O, R>
where
    P: PersonRepository,
    O: OrganizationRepository,
    R: RelationRepository,
{
    persons: P,
    organizations: O,
    relations: R,
}

impl<P, O, R> RelationService<P, O, R>
where
    P: PersonRepository,
    O: OrganizationRepository,
    R: RelationRepository,
{
    pub fn new(persons: P, organizations: O, relations: R) -> Self {
        Self {
            persons,
            organizations,
            relations,
        }
    }

    /// Records that `owner` holds a share of `organization_id`.
    pub fn add_ownership(
        &self,
        organization_id: OrganizationId,
        owner: Owner,
        request: &OwnershipRequest,
    ) -> ServiceResult<Ownership> {
        self.organization_exists(organization_id)?;
        match owner {
            Owner::Person(id) => {
                require(self.persons.get_person(id)?, "person", id)?;
            }
            Owner::Organization(id) => self.organization_exists(id)?,
        }

        let mut ownership = Ownership::new(organization_id, owner, request.percentage);
        ownership.start_date = parse_date(request.start_date.as_deref())?;
        ownership.end_date = parse_date(request.end_date.as_deref())?;

        self.relations.create_ownership(&ownership)?;
        info!(
            "event=ownership_add module=service status=ok ownership_id={} organization_id={organization_id} owner_id={}",
            ownership.id,
            owner.id()
        );
        Ok(ownership)
    }

    pub fn owners(&self, organization_id: OrganizationId) -> ServiceResult<Vec<Ownership>> {
        self.organization_exists(organization_id)?;
        Ok(self.relations.list_ownerships(organization_id)?)
    }

    pub fn add_personal_relationship(
        &self,
        source_person_id: PersonId,
        dest_person_id: PersonId,
        request: &RelationshipRequest,
    ) -> ServiceResult<PersonalRelationship> {
        for id in [source_person_id, dest_person_id] {
            require(self.persons.get_person(id)?, "person", id)?;
        }

        let mut relationship = PersonalRelationship::new(
            source_person_id,
            dest_person_id,
            request.classification.trim(),
        );
        relationship.weight = request.weight;
        relationship.start_date = parse_date(request.start_date.as_deref())?;
        relationship.end_date = parse_date(request.end_date.as_deref())?;

        self.relations.create_personal_relationship(&relationship)?;
        info!(
            "event=relationship_add module=service status=ok relationship_id={} weight={}",
            relationship.id,
            relationship.weight.as_i64()
        );
        Ok(relationship)
    }

    /// Relationships in which the person appears at either end.
    pub fn personal_relationships(
        &self,
        person_id: PersonId,
    ) -> ServiceResult<Vec<PersonalRelationship>> {
        require(self.persons.get_person(person_id)?, "person", person_id)?;
        Ok(self.relations.list_personal_relationships(person_id)?)
    }

    fn organization_exists(&self, id: OrganizationId) -> ServiceResult<()> {
        require(self.organizations.get_organization(id)?, "organization", id)?;
        Ok(())
    }
}
