//! Area use-case service.
//!
//! # Responsibility
//! - Create areas and manage their typed relationships.
//! - Answer "former parent/children" questions at a given moment.
//! - Close, merge and split areas, recording successions.
//!
//! # Invariants
//! - `add_relationship` is get-or-create on (source, destination,
//!   classification, start, end); the note only applies on creation.
//! - `remove_relationship` deletes exactly one match or fails.
//! - Former parents/children are ordered by end date, most recent first,
//!   with still-open relationships last.

use crate::dates::partial_date::PartialDate;
use crate::dates::validity::Dateframeable;
use crate::model::area::{Area, AreaId, AreaRelationship, AreaRelationshipKind, IstatLevel};
use crate::repo::area_repo::{
    AreaRelationshipKey, AreaRelationshipQuery, AreaRepository, AreaSuccession,
};
use crate::service::{parse_date, require, resolve_moment, ServiceError, ServiceResult};
use log::info;
use serde::Deserialize;
use std::cmp::Ordering;

pub const MERGED_REASON: &str = "merged into other areas";
pub const SPLIT_REASON: &str = "split into other areas";

/// Request model for creating an area.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NewArea {
    pub name: String,
    pub identifier: Option<String>,
    pub classification: Option<String>,
    pub istat_level: Option<IstatLevel>,
    pub parent_id: Option<AreaId>,
    pub inhabitants: Option<u32>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Outcome of a get-or-create relationship request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipOutcome {
    pub relationship: AreaRelationship,
    /// `false` when an identical relationship already existed.
    pub created: bool,
}

/// Area service facade over repository implementations.
pub struct AreaService<R: AreaRepository> {
    repo: R,
}

impl<R: AreaRepository> AreaService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create_area(&self, request: &NewArea) -> ServiceResult<Area> {
        if let Some(parent_id) = request.parent_id {
            self.get_area(parent_id)?;
        }

        let mut area = Area::new(request.name.trim());
        area.identifier = request.identifier.clone();
        area.classification = request.classification.clone();
        area.istat_level = request.istat_level;
        area.parent_id = request.parent_id;
        area.inhabitants = request.inhabitants;
        area.start_date = parse_date(request.start_date.as_deref())?;
        area.end_date = parse_date(request.end_date.as_deref())?;

        self.repo.create_area(&area)?;
        info!("event=area_create module=service status=ok area_id={}", area.id);
        Ok(area)
    }

    pub fn get_area(&self, id: AreaId) -> ServiceResult<Area> {
        require(self.repo.get_area(id)?, "area", id)
    }

    /// Gets or creates the relationship identified by the given key.
    pub fn add_relationship(
        &self,
        source_id: AreaId,
        dest_id: AreaId,
        classification: AreaRelationshipKind,
        start_date: Option<&str>,
        end_date: Option<&str>,
        note: Option<&str>,
    ) -> ServiceResult<RelationshipOutcome> {
        self.get_area(source_id)?;
        self.get_area(dest_id)?;
        let key = AreaRelationshipKey {
            source_area_id: source_id,
            dest_area_id: dest_id,
            classification,
            start_date: parse_date(start_date)?,
            end_date: parse_date(end_date)?,
        };

        if let Some(existing) = self.repo.find_area_relationships(&key)?.into_iter().next() {
            return Ok(RelationshipOutcome {
                relationship: existing,
                created: false,
            });
        }

        let mut relationship = AreaRelationship::new(source_id, dest_id, classification);
        relationship.start_date = key.start_date;
        relationship.end_date = key.end_date;
        relationship.note = note.map(str::to_string);

        self.repo.create_area_relationship(&relationship)?;
        info!(
            "event=area_relationship_add module=service status=ok relationship_id={} classification={}",
            relationship.id,
            classification.code()
        );
        Ok(RelationshipOutcome {
            relationship,
            created: true,
        })
    }

    /// Removes the single relationship identified by the given key.
    pub fn remove_relationship(
        &self,
        source_id: AreaId,
        dest_id: AreaId,
        classification: AreaRelationshipKind,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> ServiceResult<()> {
        let key = AreaRelationshipKey {
            source_area_id: source_id,
            dest_area_id: dest_id,
            classification,
            start_date: parse_date(start_date)?,
            end_date: parse_date(end_date)?,
        };

        let matches = self.repo.find_area_relationships(&key)?;
        let relationship = match matches.as_slice() {
            [] => return Err(ServiceError::RelationshipNotFound),
            [single] => single,
            _ => {
                return Err(ServiceError::AmbiguousRelationship {
                    matches: matches.len(),
                })
            }
        };

        self.repo.delete_area_relationship(relationship.id)?;
        info!(
            "event=area_relationship_remove module=service status=ok relationship_id={}",
            relationship.id
        );
        Ok(())
    }

    /// Relationships of the given kind starting from `area_id`.
    pub fn relationships(
        &self,
        area_id: AreaId,
        classification: AreaRelationshipKind,
    ) -> ServiceResult<Vec<AreaRelationship>> {
        Ok(self.repo.list_area_relationships(&AreaRelationshipQuery {
            source_area_id: Some(area_id),
            classification: Some(classification),
            ..AreaRelationshipQuery::default()
        })?)
    }

    /// Relationships of the given kind pointing at `area_id`.
    pub fn inverse_relationships(
        &self,
        area_id: AreaId,
        classification: AreaRelationshipKind,
    ) -> ServiceResult<Vec<AreaRelationship>> {
        Ok(self.repo.list_area_relationships(&AreaRelationshipQuery {
            dest_area_id: Some(area_id),
            classification: Some(classification),
            ..AreaRelationshipQuery::default()
        })?)
    }

    /// Former ISTAT parents of `area_id`, valid at `moment` when given.
    pub fn former_parents(
        &self,
        area_id: AreaId,
        moment: Option<&PartialDate>,
    ) -> ServiceResult<Vec<AreaRelationship>> {
        let relationships =
            self.relationships(area_id, AreaRelationshipKind::FormerIstatParent)?;
        Ok(valid_by_end_date(relationships, moment))
    }

    /// Former ISTAT children of `area_id`, valid at `moment` when given.
    pub fn former_children(
        &self,
        area_id: AreaId,
        moment: Option<&PartialDate>,
    ) -> ServiceResult<Vec<AreaRelationship>> {
        let relationships =
            self.inverse_relationships(area_id, AreaRelationshipKind::FormerIstatParent)?;
        Ok(valid_by_end_date(relationships, moment))
    }

    /// Ends the area at `moment` (today when `None`).
    pub fn close(
        &self,
        id: AreaId,
        moment: Option<PartialDate>,
        reason: &str,
    ) -> ServiceResult<Area> {
        let mut area = self.get_area(id)?;
        area.close(resolve_moment(moment), reason);
        self.repo.update_area(&area)?;
        info!("event=area_close module=service status=ok area_id={id}");
        Ok(area)
    }

    /// Merges `sources` into `target`, which starts at `moment`.
    pub fn merge_from(
        &self,
        target_id: AreaId,
        source_ids: &[AreaId],
        moment: Option<PartialDate>,
    ) -> ServiceResult<Area> {
        let moment = resolve_moment(moment);
        let mut target = self.get_area(target_id)?;
        target.start_date = Some(moment);

        let mut updated = Vec::with_capacity(source_ids.len() + 1);
        let mut links = Vec::with_capacity(source_ids.len());
        for &source_id in source_ids {
            let mut source = self.get_area(source_id)?;
            source.close(moment, MERGED_REASON);
            updated.push(source);
            links.push(AreaSuccession {
                old: source_id,
                new: target_id,
            });
        }
        updated.push(target.clone());

        self.repo.record_succession(&updated, &links)?;
        info!(
            "event=area_merge module=service status=ok area_id={target_id} sources={} moment={moment}",
            source_ids.len()
        );
        Ok(target)
    }

    /// Splits `source` into `targets`, which start at `moment`.
    pub fn split_into(
        &self,
        source_id: AreaId,
        target_ids: &[AreaId],
        moment: Option<PartialDate>,
    ) -> ServiceResult<Area> {
        let moment = resolve_moment(moment);
        let mut source = self.get_area(source_id)?;

        let mut updated = Vec::with_capacity(target_ids.len() + 1);
        let mut links = Vec::with_capacity(target_ids.len());
        for &target_id in target_ids {
            let mut target = self.get_area(target_id)?;
            target.start_date = Some(moment);
            updated.push(target);
            links.push(AreaSuccession {
                old: source_id,
                new: target_id,
            });
        }
        source.close(moment, SPLIT_REASON);
        updated.push(source.clone());

        self.repo.record_succession(&updated, &links)?;
        info!(
            "event=area_split module=service status=ok area_id={source_id} targets={} moment={moment}",
            target_ids.len()
        );
        Ok(source)
    }

    pub fn successors(&self, id: AreaId) -> ServiceResult<Vec<Area>> {
        self.get_area(id)?;
        Ok(self.repo.list_successors(id)?)
    }
}

fn valid_by_end_date(
    mut relationships: Vec<AreaRelationship>,
    moment: Option<&PartialDate>,
) -> Vec<AreaRelationship> {
    if let Some(moment) = moment {
        relationships.retain(|relationship| relationship.is_valid_at(moment));
    }
    relationships.sort_by(|a, b| match (&a.end_date, &b.end_date) {
        (Some(a_end), Some(b_end)) => b_end.cmp(a_end),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    relationships
}

#[cfg(test)]
mod tests {
    use super::valid_by_end_date;
    use crate::dates::partial_date::PartialDate;
    use crate::model::area::{AreaRelationship, AreaRelationshipKind};
    use uuid::Uuid;

    fn relationship(start: Option<&str>, end: Option<&str>) -> AreaRelationship {
        let mut relationship = AreaRelationship::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            AreaRelationshipKind::FormerIstatParent,
        );
        relationship.start_date = start.map(|raw| PartialDate::parse(raw).unwrap());
        relationship.end_date = end.map(|raw| PartialDate::parse(raw).unwrap());
        relationship
    }

    #[test]
    fn open_relationships_sort_last() {
        let open = relationship(Some("2010"), None);
        let older = relationship(None, Some("1990"));
        let newer = relationship(Some("1991"), Some("2009-12-31"));

        let sorted = valid_by_end_date(vec![open.clone(), older.clone(), newer.clone()], None);
        assert_eq!(sorted, vec![newer, older, open]);
    }

    #[test]
    fn moment_keeps_only_covering_windows() {
        let open = relationship(Some("2010"), None);
        let older = relationship(None, Some("1990"));
        let moment = PartialDate::parse("1985-06-01").unwrap();

        let valid = valid_by_end_date(vec![open, older.clone()], Some(&moment));
        assert_eq!(valid, vec![older]);
    }
}
