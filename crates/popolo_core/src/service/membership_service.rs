//! Membership and role use-case service.
//!
//! # Responsibility
//! - Add memberships and roles (memberships through a post) behind the
//!   overlap gate.
//! - Answer member and role listings.
//!
//! # Invariants
//! - A person's direct memberships in one organization never cross in time
//!   unless the request's `OverlapPolicy` allows it.
//! - A person's roles through one post in one organization never cross in
//!   time unless allowed; with `check_label` and a label, only roles with
//!   the same label are compared.
//! - Back-to-back windows (end of one == start of the next) never conflict;
//!   a window inside or equal to another always does.
//! - Organization members bypass the gate.

use crate::dates::validity::{find_overlapping, Dateframeable, OverlapDecision, OverlapPolicy};
use crate::model::area::AreaId;
use crate::model::membership::{Member, Membership, MembershipId};
use crate::model::organization::{Organization, OrganizationId, PostId};
use crate::model::person::PersonId;
use crate::repo::membership_repo::{MembershipQuery, MembershipRepository, PostScope};
use crate::repo::organization_repo::OrganizationRepository;
use crate::repo::person_repo::PersonRepository;
use crate::service::{parse_date, require, ServiceError, ServiceResult};
use log::{info, warn};
use serde::Deserialize;

/// Request model for a plain membership.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MembershipRequest {
    pub label: Option<String>,
    pub role: Option<String>,
    pub area_id: Option<AreaId>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[serde(flatten)]
    pub policy: OverlapPolicy,
}

/// Request model for a role, i.e. a membership through a post.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RoleRequest {
    /// Organization the role is held in; only for generic posts.
    pub organization_id: Option<OrganizationId>,
    pub on_behalf_of: Option<OrganizationId>,
    pub label: Option<String>,
    pub role: Option<String>,
    pub area_id: Option<AreaId>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// Only compare against roles carrying the same label.
    pub check_label: bool,
    #[serde(flatten)]
    pub policy: OverlapPolicy,
}

/// Membership service facade over repository implementations.
pub struct MembershipService<P, O, M>
where
    P: PersonRepository,
    O: OrganizationRepository,
    M: MembershipRepository,
{
    persons: P,
    organizations: O,
    memberships: M,
}

impl<P, O, M> MembershipService<P, O, M>
where
    P: PersonRepository,
    O: OrganizationRepository,
    M: MembershipRepository,
{
    pub fn new(persons: P, organizations: O, memberships: M) -> Self {
        Self {
            persons,
            organizations,
            memberships,
        }
    }

    /// Adds a direct membership of a person in an organization.
    ///
    /// # Contract
    /// - Refused with `OverlappingInterval` when one of the person's direct
    ///   memberships in the organization crosses the requested window and
    ///   `allow_overlap` is off.
    pub fn add_membership(
        &self,
        person_id: PersonId,
        organization_id: OrganizationId,
        request: &MembershipRequest,
    ) -> ServiceResult<Membership> {
        require(self.persons.get_person(person_id)?, "person", person_id)?;
        self.organization(organization_id)?;

        let mut membership = Membership::new(Member::Person(person_id), organization_id);
        membership.label = request.label.clone();
        membership.role = request.role.clone();
        membership.area_id = request.area_id;
        membership.start_date = parse_date(request.start_date.as_deref())?;
        membership.end_date = parse_date(request.end_date.as_deref())?;
        membership.validate()?;

        let siblings = self.memberships.list_memberships(&MembershipQuery {
            member: Some(Member::Person(person_id)),
            organization_id: Some(organization_id),
            post: PostScope::Direct,
            label: None,
        })?;
        self.pass_overlap_gate("membership_add", &membership, &siblings, request.policy)?;

        self.memberships.create_membership(&membership)?;
        info!(
            "event=membership_add module=service status=ok membership_id={} person_id={person_id} organization_id={organization_id}",
            membership.id
        );
        Ok(membership)
    }

    /// Adds several memberships for one person, stopping at the first error.
    pub fn add_memberships(
        &self,
        person_id: PersonId,
        requests: &[(OrganizationId, MembershipRequest)],
    ) -> ServiceResult<Vec<Membership>> {
        requests
            .iter()
            .map(|(organization_id, request)| {
                self.add_membership(person_id, *organization_id, request)
            })
            .collect()
    }

    /// Adds a role of a person through `post_id`.
    ///
    /// # Contract
    /// - A specific post takes its organization from the post; naming one in
    ///   the request fails with `PostMustBeGeneric`.
    /// - A generic post needs the request to name the organization, else
    ///   `PostMustBeSpecific`.
    /// - Refused with `OverlappingInterval` when a role through the same post
    ///   in the same organization crosses the requested window and
    ///   `allow_overlap` is off.
    pub fn add_role(
        &self,
        person_id: PersonId,
        post_id: PostId,
        request: &RoleRequest,
    ) -> ServiceResult<Membership> {
        require(self.persons.get_person(person_id)?, "person", person_id)?;
        let post = require(self.organizations.get_post(post_id)?, "post", post_id)?;

        let organization_id = match (post.organization_id, request.organization_id) {
            (Some(own), None) => own,
            (None, Some(requested)) => requested,
            (Some(_), Some(_)) => return Err(ServiceError::PostMustBeGeneric(post_id)),
            (None, None) => return Err(ServiceError::PostMustBeSpecific(post_id)),
        };
        self.organization(organization_id)?;
        if let Some(behalf_id) = request.on_behalf_of {
            self.organization(behalf_id)?;
        }

        let mut membership = Membership::new(Member::Person(person_id), organization_id);
        membership.post_id = Some(post_id);
        membership.on_behalf_of = request.on_behalf_of;
        membership.label = request.label.clone();
        membership.role = request.role.clone();
        membership.area_id = request.area_id;
        membership.start_date = parse_date(request.start_date.as_deref())?;
        membership.end_date = parse_date(request.end_date.as_deref())?;
        membership.validate()?;

        let label = match request.label.as_deref() {
            Some(label) if request.check_label && !label.is_empty() => Some(label.to_string()),
            _ => None,
        };
        let siblings = self.memberships.list_memberships(&MembershipQuery {
            member: Some(Member::Person(person_id)),
            organization_id: Some(organization_id),
            post: PostScope::Through(post_id),
            label,
        })?;
        self.pass_overlap_gate("role_add", &membership, &siblings, request.policy)?;

        self.memberships.create_membership(&membership)?;
        info!(
            "event=role_add module=service status=ok membership_id={} person_id={person_id} post_id={post_id} organization_id={organization_id}",
            membership.id
        );
        Ok(membership)
    }

    /// Adds a role held on behalf of `behalf_organization_id`.
    pub fn add_role_on_behalf_of(
        &self,
        person_id: PersonId,
        post_id: PostId,
        behalf_organization_id: OrganizationId,
        request: &RoleRequest,
    ) -> ServiceResult<Membership> {
        let request = RoleRequest {
            on_behalf_of: Some(behalf_organization_id),
            ..request.clone()
        };
        self.add_role(person_id, post_id, &request)
    }

    /// Adds several roles for one person, stopping at the first error.
    pub fn add_roles(
        &self,
        person_id: PersonId,
        requests: &[(PostId, RoleRequest)],
    ) -> ServiceResult<Vec<Membership>> {
        requests
            .iter()
            .map(|(post_id, request)| self.add_role(person_id, *post_id, request))
            .collect()
    }

    /// Post-side entry to [`Self::add_role`]: the post must be specific and
    /// the role is held in the post's organization.
    pub fn add_person(
        &self,
        post_id: PostId,
        person_id: PersonId,
        request: &RoleRequest,
    ) -> ServiceResult<Membership> {
        let post = require(self.organizations.get_post(post_id)?, "post", post_id)?;
        if post.organization_id.is_none() {
            return Err(ServiceError::PostMustBeSpecific(post_id));
        }
        self.add_role(person_id, post_id, request)
    }

    pub fn add_person_on_behalf_of(
        &self,
        post_id: PostId,
        person_id: PersonId,
        behalf_organization_id: OrganizationId,
        request: &RoleRequest,
    ) -> ServiceResult<Membership> {
        let request = RoleRequest {
            on_behalf_of: Some(behalf_organization_id),
            ..request.clone()
        };
        self.add_person(post_id, person_id, &request)
    }

    /// Adds a person or an organization as member of `organization_id`.
    ///
    /// Persons go through [`Self::add_membership`]; organizations are added
    /// without the overlap gate.
    pub fn add_member(
        &self,
        organization_id: OrganizationId,
        member: Member,
        request: &MembershipRequest,
    ) -> ServiceResult<Membership> {
        let member_organization_id = match member {
            Member::Person(person_id) => {
                return self.add_membership(person_id, organization_id, request);
            }
            Member::Organization(id) => id,
        };
        self.organization(organization_id)?;
        self.organization(member_organization_id)?;

        let mut membership = Membership::new(member, organization_id);
        membership.label = request.label.clone();
        membership.role = request.role.clone();
        membership.area_id = request.area_id;
        membership.start_date = parse_date(request.start_date.as_deref())?;
        membership.end_date = parse_date(request.end_date.as_deref())?;

        self.memberships.create_membership(&membership)?;
        info!(
            "event=membership_add module=service status=ok membership_id={} member_organization_id={member_organization_id} organization_id={organization_id}",
            membership.id
        );
        Ok(membership)
    }

    /// Adds several members to one organization, stopping at the first error.
    pub fn add_members(
        &self,
        organization_id: OrganizationId,
        requests: &[(Member, MembershipRequest)],
    ) -> ServiceResult<Vec<Membership>> {
        requests
            .iter()
            .map(|(member, request)| self.add_member(organization_id, *member, request))
            .collect()
    }

    /// Distinct members of an organization, in first-joined order.
    pub fn members(&self, organization_id: OrganizationId) -> ServiceResult<Vec<Member>> {
        self.organization(organization_id)?;
        let memberships = self.memberships.list_memberships(&MembershipQuery {
            organization_id: Some(organization_id),
            ..MembershipQuery::default()
        })?;

        let mut members: Vec<Member> = Vec::new();
        for membership in memberships {
            if !members.contains(&membership.member) {
                members.push(membership.member);
            }
        }
        Ok(members)
    }

    /// Organizations in which the person holds at least one role.
    pub fn organizations_with_roles(&self, person_id: PersonId) -> ServiceResult<Vec<Organization>> {
        require(self.persons.get_person(person_id)?, "person", person_id)?;
        let roles = self.memberships.list_memberships(&MembershipQuery {
            member: Some(Member::Person(person_id)),
            post: PostScope::AnyPost,
            ..MembershipQuery::default()
        })?;

        let mut organizations: Vec<Organization> = Vec::new();
        for role in roles {
            if organizations
                .iter()
                .any(|organization| organization.id == role.organization_id)
            {
                continue;
            }
            organizations.push(self.organization(role.organization_id)?);
        }
        Ok(organizations)
    }

    fn organization(&self, id: OrganizationId) -> ServiceResult<Organization> {
        require(self.organizations.get_organization(id)?, "organization", id)
    }

    fn pass_overlap_gate(
        &self,
        event: &str,
        candidate: &Membership,
        siblings: &[Membership],
        policy: OverlapPolicy,
    ) -> ServiceResult<()> {
        let conflicting: Vec<MembershipId> = find_overlapping(&candidate.validity(), siblings)
            .into_iter()
            .map(|sibling| sibling.id)
            .collect();

        match policy.decide(conflicting) {
            OverlapDecision::Clear => Ok(()),
            OverlapDecision::Overridden { conflicting } => {
                warn!(
                    "event=overlap_override module=service status=allowed op={event} membership_id={} conflicts={}",
                    candidate.id,
                    conflicting.len()
                );
                Ok(())
            }
            OverlapDecision::Refused { conflicting } => {
                info!(
                    "event={event} module=service status=refused reason=overlap conflicts={}",
                    conflicting.len()
                );
                Err(ServiceError::OverlappingInterval { conflicting })
            }
        }
    }
}
