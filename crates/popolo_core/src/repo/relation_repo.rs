//! Ownership and personal relationship repository.
//!
//! # Invariants
//! - Exactly one of `owner_person_uuid` / `owner_organization_uuid` is set.
//! - Relationship weight is persisted as its integer value (-2..=2).

use crate::model::organization::OrganizationId;
use crate::model::person::PersonId;
use crate::model::relation::{
    Owner, Ownership, OwnershipId, PersonalRelationship, PersonalRelationshipId,
    RelationshipWeight,
};
use crate::repo::{
    date_column, date_to_db, ensure_connection_ready, optional_uuid_column, optional_uuid_to_db,
    uuid_column, RepoError, RepoResult, RequiredTable,
};
use rusqlite::{params, Connection, Row};

const OWNERSHIP_SELECT_SQL: &str = "SELECT
    uuid,
    organization_uuid,
    owner_person_uuid,
    owner_organization_uuid,
    percentage,
    start_date,
    end_date
FROM ownerships";

const RELATIONSHIP_SELECT_SQL: &str = "SELECT
    uuid,
    source_person_uuid,
    dest_person_uuid,
    classification,
    weight,
    start_date,
    end_date
FROM personal_relationships";

const REQUIRED_TABLES: &[RequiredTable] = &[
    (
        "ownerships",
        &[
            "uuid",
            "organization_uuid",
            "owner_person_uuid",
            "owner_organization_uuid",
            "percentage",
            "start_date",
            "end_date",
        ],
    ),
    (
        "personal_relationships",
        &[
            "uuid",
            "source_person_uuid",
            "dest_person_uuid",
            "classification",
            "weight",
            "start_date",
            "end_date",
        ],
    ),
];

/// Repository interface for ownerships and personal relationships.
pub trait RelationRepository {
    fn create_ownership(&self, ownership: &Ownership) -> RepoResult<OwnershipId>;
    /// Lists the ownership shares held in one organization.
    fn list_ownerships(&self, organization_id: OrganizationId) -> RepoResult<Vec<Ownership>>;
    fn create_personal_relationship(
        &self,
        relationship: &PersonalRelationship,
    ) -> RepoResult<PersonalRelationshipId>;
    /// Lists relationships where the person is either source or destination.
    fn list_personal_relationships(
        &self,
        person_id: PersonId,
    ) -> RepoResult<Vec<PersonalRelationship>>;
}

/// SQLite-backed relation repository.
pub struct SqliteRelationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRelationRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, REQUIRED_TABLES)?;
        Ok(Self { conn })
    }
}

impl RelationRepository for SqliteRelationRepository<'_> {
    fn create_ownership(&self, ownership: &Ownership) -> RepoResult<OwnershipId> {
        ownership.validate()?;

        let (person, organization) = match ownership.owner {
            Owner::Person(id) => (Some(id), None),
            Owner::Organization(id) => (None, Some(id)),
        };
        self.conn.execute(
            "INSERT INTO ownerships (
                uuid,
                organization_uuid,
                owner_person_uuid,
                owner_organization_uuid,
                percentage,
                start_date,
                end_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                ownership.id.to_string(),
                ownership.organization_id.to_string(),
                optional_uuid_to_db(person),
                optional_uuid_to_db(organization),
                ownership.percentage,
                date_to_db(ownership.start_date.as_ref()),
                date_to_db(ownership.end_date.as_ref()),
            ],
        )?;

        Ok(ownership.id)
    }

    fn list_ownerships(&self, organization_id: OrganizationId) -> RepoResult<Vec<Ownership>> {
        let mut stmt = self.conn.prepare(&format!(
            "{OWNERSHIP_SELECT_SQL}
             WHERE organization_uuid = ?1
             ORDER BY percentage DESC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([organization_id.to_string()])?;
        let mut ownerships = Vec::new();
        while let Some(row) = rows.next()? {
            ownerships.push(parse_ownership_row(row)?);
        }

        Ok(ownerships)
    }

    fn create_personal_relationship(
        &self,
        relationship: &PersonalRelationship,
    ) -> RepoResult<PersonalRelationshipId> {
        relationship.validate()?;

        self.conn.execute(
            "INSERT INTO personal_relationships (
                uuid,
                source_person_uuid,
                dest_person_uuid,
                classification,
                weight,
                start_date,
                end_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                relationship.id.to_string(),
                relationship.source_person_id.to_string(),
                relationship.dest_person_id.to_string(),
                relationship.classification.as_str(),
                relationship.weight.as_i64(),
                date_to_db(relationship.start_date.as_ref()),
                date_to_db(relationship.end_date.as_ref()),
            ],
        )?;

        Ok(relationship.id)
    }

    fn list_personal_relationships(
        &self,
        person_id: PersonId,
    ) -> RepoResult<Vec<PersonalRelationship>> {
        let mut stmt = self.conn.prepare(&format!(
            "{RELATIONSHIP_SELECT_SQL}
             WHERE source_person_uuid = ?1 OR dest_person_uuid = ?1
             ORDER BY classification ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([person_id.to_string()])?;
        let mut relationships = Vec::new();
        while let Some(row) = rows.next()? {
            relationships.push(parse_relationship_row(row)?);
        }

        Ok(relationships)
    }
}

fn parse_ownership_row(row: &Row<'_>) -> RepoResult<Ownership> {
    let person = optional_uuid_column(row, "ownerships", "owner_person_uuid")?;
    let organization = optional_uuid_column(row, "ownerships", "owner_organization_uuid")?;
    let owner = match (person, organization) {
        (Some(id), None) => Owner::Person(id),
        (None, Some(id)) => Owner::Organization(id),
        _ => {
            return Err(RepoError::InvalidData(
                "ownership must reference exactly one owner".to_string(),
            ));
        }
    };

    let ownership = Ownership {
        id: uuid_column(row, "ownerships", "uuid")?,
        organization_id: uuid_column(row, "ownerships", "organization_uuid")?,
        owner,
        percentage: row.get("percentage")?,
        start_date: date_column(row, "ownerships", "start_date")?,
        end_date: date_column(row, "ownerships", "end_date")?,
    };
    ownership.validate()?;
    Ok(ownership)
}

fn parse_relationship_row(row: &Row<'_>) -> RepoResult<PersonalRelationship> {
    let weight_value: i64 = row.get("weight")?;
    let weight = RelationshipWeight::from_i64(weight_value).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid weight `{weight_value}` in personal_relationships.weight"
        ))
    })?;

    let relationship = PersonalRelationship {
        id: uuid_column(row, "personal_relationships", "uuid")?,
        source_person_id: uuid_column(row, "personal_relationships", "source_person_uuid")?,
        dest_person_id: uuid_column(row, "personal_relationships", "dest_person_uuid")?,
        classification: row.get("classification")?,
        weight,
        start_date: date_column(row, "personal_relationships", "start_date")?,
        end_date: date_column(row, "personal_relationships", "end_date")?,
    };
    relationship.validate()?;
    Ok(relationship)
}
