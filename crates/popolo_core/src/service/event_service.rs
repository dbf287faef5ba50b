//! Event and key-event use-case service.
//!
//! # Responsibility
//! - Create events (timestamp windows) and key events (elections,
//!   legislatures).
//! - Maintain the key events an organization refers to.
//!
//! # Invariants
//! - At most one key event exists per (kind, start date).
//! - Adding a key event to an organization is get-or-create on the link.
//! - `update_key_events` leaves exactly the requested set linked.

use crate::model::area::AreaId;
use crate::model::event::{Event, EventId, KeyEvent, KeyEventId, KeyEventKind};
use crate::model::organization::OrganizationId;
use crate::repo::area_repo::AreaRepository;
use crate::repo::event_repo::EventRepository;
use crate::repo::organization_repo::OrganizationRepository;
use crate::service::{parse_date, require, ServiceError, ServiceResult};
use log::info;
use serde::Deserialize;

/// Request model for creating an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NewEvent {
    pub name: String,
    pub description: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub location: Option<String>,
    pub area_id: Option<AreaId>,
    pub status: Option<String>,
}

/// Request model for creating a key event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NewKeyEvent {
    pub name: Option<String>,
    #[serde(rename = "event_type")]
    pub kind: KeyEventKind,
    pub identifier: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Outcome of linking a key event to an organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEventLink {
    pub key_event: KeyEvent,
    /// `false` when the organization was already linked.
    pub created: bool,
}

/// Event service facade over repository implementations.
pub struct EventService<A, O, E>
where
    A: AreaRepository,
    O: OrganizationRepository,
    E: EventRepository,
{
    areas: A,
    organizations: O,
    events: E,
}

impl<A, O, E> EventService<A, O, E>
where
    A: AreaRepository,
    O: OrganizationRepository,
    E: EventRepository,
{
    pub fn new(areas: A, organizations: O, events: E) -> Self {
        Self {
            areas,
            organizations,
            events,
        }
    }

    pub fn create_event(&self, request: &NewEvent) -> ServiceResult<Event> {
        if let Some(area_id) = request.area_id {
            require(self.areas.get_area(area_id)?, "area", area_id)?;
        }

        let mut event = Event::new(request.name.trim());
        event.description = request.description.clone();
        event.start_date = parse_date(request.start_date.as_deref())?;
        event.end_date = parse_date(request.end_date.as_deref())?;
        event.location = request.location.clone();
        event.area_id = request.area_id;
        event.status = request.status.clone();

        self.events.create_event(&event)?;
        info!("event=event_create module=service status=ok event_id={}", event.id);
        Ok(event)
    }

    pub fn get_event(&self, id: EventId) -> ServiceResult<Event> {
        require(self.events.get_event(id)?, "event", id)
    }

    pub fn area_events(&self, area_id: AreaId) -> ServiceResult<Vec<Event>> {
        require(self.areas.get_area(area_id)?, "area", area_id)?;
        Ok(self.events.list_area_events(area_id)?)
    }

    /// Creates a key event; fails with `DuplicateKeyEvent` when one of the
    /// same kind already starts on the same date.
    pub fn create_key_event(&self, request: &NewKeyEvent) -> ServiceResult<KeyEvent> {
        let mut key_event = KeyEvent::new(request.kind);
        key_event.name = request.name.clone();
        key_event.identifier = request.identifier.clone();
        key_event.start_date = parse_date(request.start_date.as_deref())?;
        key_event.end_date = parse_date(request.end_date.as_deref())?;
        key_event.validate()?;

        if let Some(existing) = self
            .events
            .find_key_event(key_event.kind, key_event.start_date.as_ref())?
        {
            return Err(ServiceError::DuplicateKeyEvent {
                existing: existing.id,
            });
        }

        self.events.create_key_event(&key_event)?;
        info!(
            "event=key_event_create module=service status=ok key_event_id={} kind={}",
            key_event.id,
            key_event.kind.code()
        );
        Ok(key_event)
    }

    pub fn get_key_event(&self, id: KeyEventId) -> ServiceResult<KeyEvent> {
        require(self.events.get_key_event(id)?, "key event", id)
    }

    /// Links an existing key event to the organization, if not linked yet.
    pub fn add_key_event(
        &self,
        organization_id: OrganizationId,
        key_event_id: KeyEventId,
    ) -> ServiceResult<KeyEventLink> {
        self.organization_exists(organization_id)?;
        let key_event = self.get_key_event(key_event_id)?;

        let created = self.events.link_key_event(organization_id, key_event_id)?;
        info!(
            "event=key_event_link module=service status=ok organization_id={organization_id} key_event_id={key_event_id} created={created}"
        );
        Ok(KeyEventLink { key_event, created })
    }

    /// Links several key events, stopping at the first error.
    pub fn add_key_events(
        &self,
        organization_id: OrganizationId,
        key_event_ids: &[KeyEventId],
    ) -> ServiceResult<Vec<KeyEventLink>> {
        key_event_ids
            .iter()
            .map(|&key_event_id| self.add_key_event(organization_id, key_event_id))
            .collect()
    }

    /// Links exactly `key_event_ids` to the organization: missing links are
    /// added, links not in the list are removed.
    pub fn update_key_events(
        &self,
        organization_id: OrganizationId,
        key_event_ids: &[KeyEventId],
    ) -> ServiceResult<Vec<KeyEvent>> {
        self.organization_exists(organization_id)?;
        for &key_event_id in key_event_ids {
            self.get_key_event(key_event_id)?;
        }

        self.events
            .replace_key_events(organization_id, key_event_ids)?;
        info!(
            "event=key_event_update module=service status=ok organization_id={organization_id} count={}",
            key_event_ids.len()
        );
        self.key_events(organization_id)
    }

    pub fn key_events(&self, organization_id: OrganizationId) -> ServiceResult<Vec<KeyEvent>> {
        self.organization_exists(organization_id)?;
        Ok(self.events.list_key_events(organization_id)?)
    }

    fn organization_exists(&self, id: OrganizationId) -> ServiceResult<()> {
        require(self.organizations.get_organization(id)?, "organization", id).map(|_| ())
    }
}
