//! Event repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist events and key events.
//! - Maintain the set of key events each organization is linked to.
//!
//! # Invariants
//! - Linking is idempotent: an organization holds a key event at most once.
//! - Replacing an organization's key events is atomic.

use crate::dates::partial_date::PartialDate;
use crate::model::area::AreaId;
use crate::model::event::{Event, EventId, KeyEvent, KeyEventId, KeyEventKind};
use crate::model::organization::OrganizationId;
use crate::repo::{
    date_column, date_to_db, ensure_connection_ready, optional_uuid_column, optional_uuid_to_db,
    uuid_column, RepoError, RepoResult, RequiredTable,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};

const EVENT_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    description,
    start_date,
    end_date,
    location,
    area_uuid,
    status
FROM events";

const KEY_EVENT_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    event_type,
    identifier,
    start_date,
    end_date
FROM key_events";

const REQUIRED_TABLES: &[RequiredTable] = &[
    (
        "events",
        &[
            "uuid",
            "name",
            "description",
            "start_date",
            "end_date",
            "location",
            "area_uuid",
            "status",
        ],
    ),
    (
        "key_events",
        &["uuid", "name", "event_type", "identifier", "start_date", "end_date"],
    ),
    ("organization_key_events", &["organization_uuid", "key_event_uuid"]),
];

/// Repository interface for events and key events.
pub trait EventRepository {
    fn create_event(&self, event: &Event) -> RepoResult<EventId>;
    fn get_event(&self, id: EventId) -> RepoResult<Option<Event>>;
    /// Events located in `area_id`, by start date.
    fn list_area_events(&self, area_id: AreaId) -> RepoResult<Vec<Event>>;
    fn create_key_event(&self, key_event: &KeyEvent) -> RepoResult<KeyEventId>;
    fn get_key_event(&self, id: KeyEventId) -> RepoResult<Option<KeyEvent>>;
    /// The key event of `kind` starting at `start_date`, NULL included.
    fn find_key_event(
        &self,
        kind: KeyEventKind,
        start_date: Option<&PartialDate>,
    ) -> RepoResult<Option<KeyEvent>>;
    /// Links a key event to an organization; `false` when already linked.
    fn link_key_event(
        &self,
        organization_id: OrganizationId,
        key_event_id: KeyEventId,
    ) -> RepoResult<bool>;
    /// Makes `key_event_ids` the exact set linked to the organization.
    fn replace_key_events(
        &self,
        organization_id: OrganizationId,
        key_event_ids: &[KeyEventId],
    ) -> RepoResult<()>;
    fn list_key_events(&self, organization_id: OrganizationId) -> RepoResult<Vec<KeyEvent>>;
}

/// SQLite-backed event repository.
pub struct SqliteEventRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEventRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, REQUIRED_TABLES)?;
        Ok(Self { conn })
    }
}

impl EventRepository for SqliteEventRepository<'_> {
    fn create_event(&self, event: &Event) -> RepoResult<EventId> {
        event.validate()?;

        self.conn.execute(
            "INSERT INTO events (
                uuid,
                name,
                description,
                start_date,
                end_date,
                location,
                area_uuid,
                status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                event.id.to_string(),
                event.name.as_str(),
                event.description.as_deref(),
                date_to_db(event.start_date.as_ref()),
                date_to_db(event.end_date.as_ref()),
                event.location.as_deref(),
                optional_uuid_to_db(event.area_id),
                event.status.as_deref(),
            ],
        )?;

        Ok(event.id)
    }

    fn get_event(&self, id: EventId) -> RepoResult<Option<Event>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{EVENT_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_event_row(row)?));
        }

        Ok(None)
    }

    fn list_area_events(&self, area_id: AreaId) -> RepoResult<Vec<Event>> {
        let mut stmt = self.conn.prepare(&format!(
            "{EVENT_SELECT_SQL}
             WHERE area_uuid = ?1
             ORDER BY start_date ASC, created_at ASC, rowid ASC;"
        ))?;
        let mut rows = stmt.query([area_id.to_string()])?;
        let mut events = Vec::new();
        while let Some(row) = rows.next()? {
            events.push(parse_event_row(row)?);
        }

        Ok(events)
    }

    fn create_key_event(&self, key_event: &KeyEvent) -> RepoResult<KeyEventId> {
        key_event.validate()?;

        self.conn.execute(
            "INSERT INTO key_events (
                uuid,
                name,
                event_type,
                identifier,
                start_date,
                end_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                key_event.id.to_string(),
                key_event.name.as_deref(),
                key_event.kind.code(),
                key_event.identifier.as_deref(),
                date_to_db(key_event.start_date.as_ref()),
                date_to_db(key_event.end_date.as_ref()),
            ],
        )?;

        Ok(key_event.id)
    }

    fn get_key_event(&self, id: KeyEventId) -> RepoResult<Option<KeyEvent>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{KEY_EVENT_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_key_event_row(row)?));
        }

        Ok(None)
    }

    fn find_key_event(
        &self,
        kind: KeyEventKind,
        start_date: Option<&PartialDate>,
    ) -> RepoResult<Option<KeyEvent>> {
        let mut stmt = self.conn.prepare(&format!(
            "{KEY_EVENT_SELECT_SQL}
             WHERE event_type = ?1 AND start_date IS ?2
             ORDER BY created_at ASC, rowid ASC
             LIMIT 1;"
        ))?;
        let mut rows = stmt.query(params![kind.code(), date_to_db(start_date)])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_key_event_row(row)?));
        }

        Ok(None)
    }

    fn link_key_event(
        &self,
        organization_id: OrganizationId,
        key_event_id: KeyEventId,
    ) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO organization_key_events (organization_uuid, key_event_uuid)
             VALUES (?1, ?2);",
            params![organization_id.to_string(), key_event_id.to_string()],
        )?;
        Ok(changed == 1)
    }

    fn replace_key_events(
        &self,
        organization_id: OrganizationId,
        key_event_ids: &[KeyEventId],
    ) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let mut sql = "DELETE FROM organization_key_events WHERE organization_uuid = ?".to_string();
        let mut bind_values = vec![Value::Text(organization_id.to_string())];
        if !key_event_ids.is_empty() {
            let placeholders = vec!["?"; key_event_ids.len()].join(", ");
            sql.push_str(&format!(" AND key_event_uuid NOT IN ({placeholders})"));
            bind_values.extend(key_event_ids.iter().map(|id| Value::Text(id.to_string())));
        }
        tx.execute(&sql, params_from_iter(bind_values))?;

        for key_event_id in key_event_ids {
            tx.execute(
                "INSERT OR IGNORE INTO organization_key_events (organization_uuid, key_event_uuid)
                 VALUES (?1, ?2);",
                params![organization_id.to_string(), key_event_id.to_string()],
            )?;
        }
        tx.commit()?;

        Ok(())
    }

    fn list_key_events(&self, organization_id: OrganizationId) -> RepoResult<Vec<KeyEvent>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                ke.uuid,
                ke.name,
                ke.event_type,
                ke.identifier,
                ke.start_date,
                ke.end_date
             FROM key_events ke
             JOIN organization_key_events link ON link.key_event_uuid = ke.uuid
             WHERE link.organization_uuid = ?1
             ORDER BY ke.start_date ASC, ke.uuid ASC;",
        )?;
        let mut rows = stmt.query([organization_id.to_string()])?;
        let mut key_events = Vec::new();
        while let Some(row) = rows.next()? {
            key_events.push(parse_key_event_row(row)?);
        }

        Ok(key_events)
    }
}

fn parse_event_row(row: &Row<'_>) -> RepoResult<Event> {
    let event = Event {
        id: uuid_column(row, "events", "uuid")?,
        name: row.get("name")?,
        description: row.get("description")?,
        start_date: date_column(row, "events", "start_date")?,
        end_date: date_column(row, "events", "end_date")?,
        location: row.get("location")?,
        area_id: optional_uuid_column(row, "events", "area_uuid")?,
        status: row.get("status")?,
    };
    event.validate()?;
    Ok(event)
}

fn parse_key_event_row(row: &Row<'_>) -> RepoResult<KeyEvent> {
    let code: String = row.get("event_type")?;
    let kind = KeyEventKind::from_code(&code).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid event type `{code}` in key_events.event_type"))
    })?;

    let key_event = KeyEvent {
        id: uuid_column(row, "key_events", "uuid")?,
        name: row.get("name")?,
        kind,
        identifier: row.get("identifier")?,
        start_date: date_column(row, "key_events", "start_date")?,
        end_date: date_column(row, "key_events", "end_date")?,
    };
    key_event.validate()?;
    Ok(key_event)
}

#[cfg(test)]
mod tests {
    use super::{EventRepository, SqliteEventRepository};
    use crate::dates::partial_date::PartialDate;
    use crate::db::open_db_in_memory;
    use crate::model::event::{Event, KeyEvent, KeyEventKind};
    use crate::model::organization::Organization;
    use crate::repo::organization_repo::{OrganizationRepository, SqliteOrganizationRepository};

    fn election(start: &str) -> KeyEvent {
        let mut key_event = KeyEvent::new(KeyEventKind::MunicipalElection);
        key_event.start_date = Some(PartialDate::parse(start).unwrap());
        key_event
    }

    #[test]
    fn event_round_trips_with_timestamps() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteEventRepository::try_new(&conn).unwrap();

        let mut event = Event::new("Seduta del consiglio");
        event.start_date = Some(PartialDate::parse("2018-03-01T18:00+01:00").unwrap());
        event.end_date = Some(PartialDate::parse("2018-03-01T21:30+01:00").unwrap());
        event.status = Some("confirmed".to_string());
        repo.create_event(&event).unwrap();

        assert_eq!(repo.get_event(event.id).unwrap(), Some(event));
    }

    #[test]
    fn key_event_is_unique_per_kind_and_start() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteEventRepository::try_new(&conn).unwrap();

        let first = election("2016-06-05");
        repo.create_key_event(&first).unwrap();
        assert!(repo.create_key_event(&election("2016-06-05")).is_err());

        let found = repo
            .find_key_event(KeyEventKind::MunicipalElection, first.start_date.as_ref())
            .unwrap();
        assert_eq!(found, Some(first));
        assert!(repo
            .find_key_event(KeyEventKind::RegionalElection, None)
            .unwrap()
            .is_none());
    }

    #[test]
    fn replacing_links_keeps_only_the_given_set() {
        let conn = open_db_in_memory().unwrap();
        let organizations = SqliteOrganizationRepository::try_new(&conn).unwrap();
        let repo = SqliteEventRepository::try_new(&conn).unwrap();

        let council = Organization::new("Consiglio comunale");
        organizations.create_organization(&council).unwrap();
        let (a, b, c) = (election("2011"), election("2016"), election("2021"));
        for key_event in [&a, &b, &c] {
            repo.create_key_event(key_event).unwrap();
        }

        assert!(repo.link_key_event(council.id, a.id).unwrap());
        assert!(!repo.link_key_event(council.id, a.id).unwrap());
        repo.link_key_event(council.id, b.id).unwrap();

        repo.replace_key_events(council.id, &[b.id, c.id]).unwrap();
        assert_eq!(repo.list_key_events(council.id).unwrap(), vec![b, c]);

        repo.replace_key_events(council.id, &[]).unwrap();
        assert!(repo.list_key_events(council.id).unwrap().is_empty());
    }
}
