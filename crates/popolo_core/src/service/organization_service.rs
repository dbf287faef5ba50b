//! Organization use-case service.
//!
//! # Responsibility
//! - Create organizations and their specific or generic posts.
//! - Close, merge and split organizations, recording successions.
//!
//! # Invariants
//! - Merge closes every source at `moment` and founds the target at
//!   `moment`; split does the reverse.
//! - Closing re-validates date ordering: a dissolution before the founding
//!   date is rejected and nothing is written.

use crate::dates::partial_date::PartialDate;
use crate::model::area::AreaId;
use crate::model::organization::{Organization, OrganizationId, Post, PostId};
use crate::repo::organization_repo::{OrganizationRepository, OrganizationSuccession};
use crate::service::{parse_date, require, resolve_moment, ServiceResult};
use log::info;
use serde::Deserialize;

pub const MERGED_REASON: &str = "merged into other organizations";
pub const SPLIT_REASON: &str = "split into other organizations";

/// Request model for creating an organization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NewOrganization {
    pub name: String,
    pub identifier: Option<String>,
    pub classification: Option<String>,
    pub parent_id: Option<OrganizationId>,
    pub founding_date: Option<String>,
    pub dissolution_date: Option<String>,
}

/// Request model for creating a post.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NewPost {
    pub label: String,
    pub other_label: Option<String>,
    pub role: Option<String>,
    pub area_id: Option<AreaId>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Organization service facade over repository implementations.
pub struct OrganizationService<R: OrganizationRepository> {
    repo: R,
}

impl<R: OrganizationRepository> OrganizationService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create_organization(&self, request: &NewOrganization) -> ServiceResult<Organization> {
        if let Some(parent_id) = request.parent_id {
            self.get_organization(parent_id)?;
        }

        let mut organization = Organization::new(request.name.trim());
        organization.identifier = request.identifier.clone();
        organization.classification = request.classification.clone();
        organization.parent_id = request.parent_id;
        organization.founding_date = parse_date(request.founding_date.as_deref())?;
        organization.dissolution_date = parse_date(request.dissolution_date.as_deref())?;

        self.repo.create_organization(&organization)?;
        info!(
            "event=organization_create module=service status=ok organization_id={}",
            organization.id
        );
        Ok(organization)
    }

    pub fn get_organization(&self, id: OrganizationId) -> ServiceResult<Organization> {
        require(self.repo.get_organization(id)?, "organization", id)
    }

    pub fn get_post(&self, id: PostId) -> ServiceResult<Post> {
        require(self.repo.get_post(id)?, "post", id)
    }

    /// Creates a post specific to `organization_id`.
    pub fn add_post(&self, organization_id: OrganizationId, request: &NewPost) -> ServiceResult<Post> {
        self.get_organization(organization_id)?;
        self.insert_post(Some(organization_id), request)
    }

    /// Creates several posts for one organization, stopping at the first error.
    pub fn add_posts(
        &self,
        organization_id: OrganizationId,
        requests: &[NewPost],
    ) -> ServiceResult<Vec<Post>> {
        self.get_organization(organization_id)?;
        requests
            .iter()
            .map(|request| self.insert_post(Some(organization_id), request))
            .collect()
    }

    /// Creates a generic post, holdable in any organization.
    pub fn create_generic_post(&self, request: &NewPost) -> ServiceResult<Post> {
        self.insert_post(None, request)
    }

    pub fn list_posts(&self, organization_id: OrganizationId) -> ServiceResult<Vec<Post>> {
        self.get_organization(organization_id)?;
        Ok(self.repo.list_posts(organization_id)?)
    }

    /// Records that holders of `post_id` are appointed by holders of
    /// `appointer_id`.
    pub fn set_post_appointer(&self, post_id: PostId, appointer_id: PostId) -> ServiceResult<Post> {
        let mut post = self.get_post(post_id)?;
        self.get_post(appointer_id)?;
        post.appointed_by = Some(appointer_id);
        self.repo.update_post(&post)?;
        Ok(post)
    }

    /// Dissolves the organization at `moment` (today when `None`).
    pub fn close(
        &self,
        id: OrganizationId,
        moment: Option<PartialDate>,
        reason: &str,
    ) -> ServiceResult<Organization> {
        let mut organization = self.get_organization(id)?;
        organization.close(resolve_moment(moment), reason);
        self.repo.update_organization(&organization)?;
        info!("event=organization_close module=service status=ok organization_id={id}");
        Ok(organization)
    }

    /// Merges `sources` into `target`: every source is closed and linked to
    /// the target, which is founded at `moment`.
    pub fn merge_from(
        &self,
        target_id: OrganizationId,
        source_ids: &[OrganizationId],
        moment: Option<PartialDate>,
    ) -> ServiceResult<Organization> {
        let moment = resolve_moment(moment);
        let mut target = self.get_organization(target_id)?;
        target.founding_date = Some(moment);

        let mut updated = Vec::with_capacity(source_ids.len() + 1);
        let mut links = Vec::with_capacity(source_ids.len());
        for &source_id in source_ids {
            let mut source = self.get_organization(source_id)?;
            source.close(moment, MERGED_REASON);
            updated.push(source);
            links.push(OrganizationSuccession {
                old: source_id,
                new: target_id,
            });
        }
        updated.push(target.clone());

        self.repo.record_succession(&updated, &links)?;
        info!(
            "event=organization_merge module=service status=ok organization_id={target_id} sources={} moment={moment}",
            source_ids.len()
        );
        Ok(target)
    }

    /// Splits `source` into `targets`: every target is founded at `moment`
    /// and linked from the source, which is closed.
    pub fn split_into(
        &self,
        source_id: OrganizationId,
        target_ids: &[OrganizationId],
        moment: Option<PartialDate>,
    ) -> ServiceResult<Organization> {
        let moment = resolve_moment(moment);
        let mut source = self.get_organization(source_id)?;

        let mut updated = Vec::with_capacity(target_ids.len() + 1);
        let mut links = Vec::with_capacity(target_ids.len());
        for &target_id in target_ids {
            let mut target = self.get_organization(target_id)?;
            target.founding_date = Some(moment);
            updated.push(target);
            links.push(OrganizationSuccession {
                old: source_id,
                new: target_id,
            });
        }
        source.close(moment, SPLIT_REASON);
        updated.push(source.clone());

        self.repo.record_succession(&updated, &links)?;
        info!(
            "event=organization_split module=service status=ok organization_id={source_id} targets={} moment={moment}",
            target_ids.len()
        );
        Ok(source)
    }

    pub fn successors(&self, id: OrganizationId) -> ServiceResult<Vec<Organization>> {
        self.get_organization(id)?;
        Ok(self.repo.list_successors(id)?)
    }

    fn insert_post(
        &self,
        organization_id: Option<OrganizationId>,
        request: &NewPost,
    ) -> ServiceResult<Post> {
        let mut post = Post::new(request.label.trim(), organization_id);
        post.other_label = request.other_label.clone();
        post.role = request.role.clone();
        post.area_id = request.area_id;
        post.start_date = parse_date(request.start_date.as_deref())?;
        post.end_date = parse_date(request.end_date.as_deref())?;

        self.repo.create_post(&post)?;
        info!(
            "event=post_create module=service status=ok post_id={} generic={}",
            post.id,
            post.is_generic()
        );
        Ok(post)
    }
}
