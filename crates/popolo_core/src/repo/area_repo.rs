//! Area repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist areas and their typed, dated relationships.
//! - Record succession links produced by area merge and split.
//!
//! # Invariants
//! - Relationship lookup by key matches NULL dates exactly (`IS`), so an
//!   open bound only matches an open bound.
//! - A succession is written atomically.

use crate::dates::partial_date::PartialDate;
use crate::model::area::{
    Area, AreaId, AreaRelationship, AreaRelationshipId, AreaRelationshipKind, IstatLevel,
};
use crate::repo::{
    date_column, date_to_db, ensure_connection_ready, optional_uuid_column, optional_uuid_to_db,
    uuid_column, RepoError, RepoResult, RequiredTable,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};

const AREA_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    identifier,
    classification,
    istat_level,
    parent_uuid,
    inhabitants,
    start_date,
    end_date,
    end_reason
FROM areas";

const RELATIONSHIP_SELECT_SQL: &str = "SELECT
    uuid,
    source_area_uuid,
    dest_area_uuid,
    classification,
    note,
    start_date,
    end_date
FROM area_relationships";

const REQUIRED_TABLES: &[RequiredTable] = &[
    (
        "areas",
        &[
            "uuid",
            "name",
            "identifier",
            "classification",
            "istat_level",
            "parent_uuid",
            "inhabitants",
            "start_date",
            "end_date",
            "end_reason",
        ],
    ),
    (
        "area_relationships",
        &[
            "uuid",
            "source_area_uuid",
            "dest_area_uuid",
            "classification",
            "note",
            "start_date",
            "end_date",
        ],
    ),
    ("area_successions", &["old_area_uuid", "new_area_uuid"]),
];

/// Identity of an area relationship apart from its id and note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AreaRelationshipKey {
    pub source_area_id: AreaId,
    pub dest_area_id: AreaId,
    pub classification: AreaRelationshipKind,
    pub start_date: Option<PartialDate>,
    pub end_date: Option<PartialDate>,
}

/// Filter for listing area relationships. Unset fields do not filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AreaRelationshipQuery {
    pub source_area_id: Option<AreaId>,
    pub dest_area_id: Option<AreaId>,
    pub classification: Option<AreaRelationshipKind>,
}

/// Predecessor/successor pair recorded by area merge and split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AreaSuccession {
    pub old: AreaId,
    pub new: AreaId,
}

/// Repository interface for areas and area relationships.
pub trait AreaRepository {
    fn create_area(&self, area: &Area) -> RepoResult<AreaId>;
    fn update_area(&self, area: &Area) -> RepoResult<()>;
    fn get_area(&self, id: AreaId) -> RepoResult<Option<Area>>;
    fn create_area_relationship(
        &self,
        relationship: &AreaRelationship,
    ) -> RepoResult<AreaRelationshipId>;
    /// Relationships matching `key` exactly, NULL dates included.
    fn find_area_relationships(
        &self,
        key: &AreaRelationshipKey,
    ) -> RepoResult<Vec<AreaRelationship>>;
    fn list_area_relationships(
        &self,
        query: &AreaRelationshipQuery,
    ) -> RepoResult<Vec<AreaRelationship>>;
    fn delete_area_relationship(&self, id: AreaRelationshipId) -> RepoResult<()>;
    /// Updates `areas` and inserts `links` in one transaction.
    fn record_succession(&self, areas: &[Area], links: &[AreaSuccession]) -> RepoResult<()>;
    fn list_successors(&self, id: AreaId) -> RepoResult<Vec<Area>>;
}

/// SQLite-backed area repository.
pub struct SqliteAreaRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAreaRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, REQUIRED_TABLES)?;
        Ok(Self { conn })
    }
}

impl AreaRepository for SqliteAreaRepository<'_> {
    fn create_area(&self, area: &Area) -> RepoResult<AreaId> {
        area.validate()?;

        self.conn.execute(
            "INSERT INTO areas (
                uuid,
                name,
                identifier,
                classification,
                istat_level,
                parent_uuid,
                inhabitants,
                start_date,
                end_date,
                end_reason
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
            params![
                area.id.to_string(),
                area.name.as_str(),
                area.identifier.as_deref(),
                area.classification.as_deref(),
                area.istat_level.map(IstatLevel::code),
                optional_uuid_to_db(area.parent_id),
                area.inhabitants,
                date_to_db(area.start_date.as_ref()),
                date_to_db(area.end_date.as_ref()),
                area.end_reason.as_deref(),
            ],
        )?;

        Ok(area.id)
    }

    fn update_area(&self, area: &Area) -> RepoResult<()> {
        update_area_row(self.conn, area)
    }

    fn get_area(&self, id: AreaId) -> RepoResult<Option<Area>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{AREA_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_area_row(row)?));
        }

        Ok(None)
    }

    fn create_area_relationship(
        &self,
        relationship: &AreaRelationship,
    ) -> RepoResult<AreaRelationshipId> {
        relationship.validate()?;

        self.conn.execute(
            "INSERT INTO area_relationships (
                uuid,
                source_area_uuid,
                dest_area_uuid,
                classification,
                note,
                start_date,
                end_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                relationship.id.to_string(),
                relationship.source_area_id.to_string(),
                relationship.dest_area_id.to_string(),
                relationship.classification.code(),
                relationship.note.as_deref(),
                date_to_db(relationship.start_date.as_ref()),
                date_to_db(relationship.end_date.as_ref()),
            ],
        )?;

        Ok(relationship.id)
    }

    fn find_area_relationships(
        &self,
        key: &AreaRelationshipKey,
    ) -> RepoResult<Vec<AreaRelationship>> {
        let mut stmt = self.conn.prepare(&format!(
            "{RELATIONSHIP_SELECT_SQL}
             WHERE source_area_uuid = ?1
               AND dest_area_uuid = ?2
               AND classification = ?3
               AND start_date IS ?4
               AND end_date IS ?5
             ORDER BY uuid ASC;"
        ))?;
        let mut rows = stmt.query(params![
            key.source_area_id.to_string(),
            key.dest_area_id.to_string(),
            key.classification.code(),
            date_to_db(key.start_date.as_ref()),
            date_to_db(key.end_date.as_ref()),
        ])?;
        let mut relationships = Vec::new();
        while let Some(row) = rows.next()? {
            relationships.push(parse_relationship_row(row)?);
        }

        Ok(relationships)
    }

    fn list_area_relationships(
        &self,
        query: &AreaRelationshipQuery,
    ) -> RepoResult<Vec<AreaRelationship>> {
        let mut sql = format!("{RELATIONSHIP_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(source) = query.source_area_id {
            sql.push_str(" AND source_area_uuid = ?");
            bind_values.push(Value::Text(source.to_string()));
        }
        if let Some(dest) = query.dest_area_id {
            sql.push_str(" AND dest_area_uuid = ?");
            bind_values.push(Value::Text(dest.to_string()));
        }
        if let Some(kind) = query.classification {
            sql.push_str(" AND classification = ?");
            bind_values.push(Value::Text(kind.code().to_string()));
        }
        sql.push_str(" ORDER BY created_at ASC, rowid ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut relationships = Vec::new();
        while let Some(row) = rows.next()? {
            relationships.push(parse_relationship_row(row)?);
        }

        Ok(relationships)
    }

    fn delete_area_relationship(&self, id: AreaRelationshipId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM area_relationships WHERE uuid = ?1;",
            [id.to_string()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "area relationship",
                id,
            });
        }

        Ok(())
    }

    fn record_succession(&self, areas: &[Area], links: &[AreaSuccession]) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        for area in areas {
            update_area_row(&tx, area)?;
        }
        for link in links {
            tx.execute(
                "INSERT OR IGNORE INTO area_successions (old_area_uuid, new_area_uuid)
                 VALUES (?1, ?2);",
                params![link.old.to_string(), link.new.to_string()],
            )?;
        }
        tx.commit()?;

        Ok(())
    }

    fn list_successors(&self, id: AreaId) -> RepoResult<Vec<Area>> {
        let mut stmt = self.conn.prepare(&format!(
            "{AREA_SELECT_SQL}
             WHERE uuid IN (
                SELECT new_area_uuid
                FROM area_successions
                WHERE old_area_uuid = ?1
             )
             ORDER BY name ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([id.to_string()])?;
        let mut areas = Vec::new();
        while let Some(row) = rows.next()? {
            areas.push(parse_area_row(row)?);
        }

        Ok(areas)
    }
}

fn update_area_row(conn: &Connection, area: &Area) -> RepoResult<()> {
    area.validate()?;

    let changed = conn.execute(
        "UPDATE areas
         SET
            name = ?1,
            identifier = ?2,
            classification = ?3,
            istat_level = ?4,
            parent_uuid = ?5,
            inhabitants = ?6,
            start_date = ?7,
            end_date = ?8,
            end_reason = ?9,
            updated_at = (strftime('%s', 'now') * 1000)
         WHERE uuid = ?10;",
        params![
            area.name.as_str(),
            area.identifier.as_deref(),
            area.classification.as_deref(),
            area.istat_level.map(IstatLevel::code),
            optional_uuid_to_db(area.parent_id),
            area.inhabitants,
            date_to_db(area.start_date.as_ref()),
            date_to_db(area.end_date.as_ref()),
            area.end_reason.as_deref(),
            area.id.to_string(),
        ],
    )?;

    if changed == 0 {
        return Err(RepoError::NotFound {
            entity: "area",
            id: area.id,
        });
    }

    Ok(())
}

fn parse_area_row(row: &Row<'_>) -> RepoResult<Area> {
    let istat_level = match row.get::<_, Option<String>>("istat_level")? {
        Some(code) => Some(IstatLevel::from_code(&code).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid istat level `{code}` in areas.istat_level"))
        })?),
        None => None,
    };

    let area = Area {
        id: uuid_column(row, "areas", "uuid")?,
        name: row.get("name")?,
        identifier: row.get("identifier")?,
        classification: row.get("classification")?,
        istat_level,
        parent_id: optional_uuid_column(row, "areas", "parent_uuid")?,
        inhabitants: row.get("inhabitants")?,
        start_date: date_column(row, "areas", "start_date")?,
        end_date: date_column(row, "areas", "end_date")?,
        end_reason: row.get("end_reason")?,
    };
    area.validate()?;
    Ok(area)
}

fn parse_relationship_row(row: &Row<'_>) -> RepoResult<AreaRelationship> {
    let code: String = row.get("classification")?;
    let classification = AreaRelationshipKind::from_code(&code).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid classification `{code}` in area_relationships.classification"
        ))
    })?;

    let relationship = AreaRelationship {
        id: uuid_column(row, "area_relationships", "uuid")?,
        source_area_id: uuid_column(row, "area_relationships", "source_area_uuid")?,
        dest_area_id: uuid_column(row, "area_relationships", "dest_area_uuid")?,
        classification,
        note: row.get("note")?,
        start_date: date_column(row, "area_relationships", "start_date")?,
        end_date: date_column(row, "area_relationships", "end_date")?,
    };
    relationship.validate()?;
    Ok(relationship)
}

#[cfg(test)]
mod tests {
    use super::{AreaRelationshipKey, AreaRepository, SqliteAreaRepository};
    use crate::dates::partial_date::PartialDate;
    use crate::db::open_db_in_memory;
    use crate::model::area::{Area, AreaRelationship, AreaRelationshipKind, IstatLevel};

    #[test]
    fn area_round_trips_with_istat_level() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteAreaRepository::try_new(&conn).unwrap();

        let mut area = Area::new("Roma");
        area.identifier = Some("058091".to_string());
        area.istat_level = Some(IstatLevel::Municipality);
        area.inhabitants = Some(2_749_031);
        area.start_date = Some(PartialDate::parse("1871").unwrap());
        repo.create_area(&area).unwrap();

        assert_eq!(repo.get_area(area.id).unwrap(), Some(area));
    }

    #[test]
    fn key_lookup_matches_open_bounds_only_with_open_bounds() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteAreaRepository::try_new(&conn).unwrap();
        let province = Area::new("Provincia");
        let town = Area::new("Comune");
        repo.create_area(&province).unwrap();
        repo.create_area(&town).unwrap();

        let mut relationship = AreaRelationship::new(
            town.id,
            province.id,
            AreaRelationshipKind::FormerIstatParent,
        );
        relationship.end_date = Some(PartialDate::parse("2009-06-30").unwrap());
        repo.create_area_relationship(&relationship).unwrap();

        let mut key = AreaRelationshipKey {
            source_area_id: town.id,
            dest_area_id: province.id,
            classification: AreaRelationshipKind::FormerIstatParent,
            start_date: None,
            end_date: None,
        };
        assert!(repo.find_area_relationships(&key).unwrap().is_empty());

        key.end_date = relationship.end_date;
        assert_eq!(
            repo.find_area_relationships(&key).unwrap(),
            vec![relationship]
        );
    }
}
