//! Membership repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist memberships and roles.
//! - Answer the sibling queries the overlap gate is scoped by.
//!
//! # Invariants
//! - Exactly one of `member_person_uuid` / `member_organization_uuid` is set.
//! - Listing follows insertion order (`created_at ASC, rowid ASC`).

use crate::model::membership::{Member, Membership, MembershipId};
use crate::model::organization::{OrganizationId, PostId};
use crate::repo::{
    date_column, date_to_db, ensure_connection_ready, optional_uuid_column, optional_uuid_to_db,
    uuid_column, RepoError, RepoResult, RequiredTable,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const MEMBERSHIP_SELECT_SQL: &str = "SELECT
    uuid,
    member_person_uuid,
    member_organization_uuid,
    organization_uuid,
    post_uuid,
    on_behalf_of_uuid,
    area_uuid,
    label,
    role,
    start_date,
    end_date
FROM memberships";

const REQUIRED_TABLES: &[RequiredTable] = &[(
    "memberships",
    &[
        "uuid",
        "member_person_uuid",
        "member_organization_uuid",
        "organization_uuid",
        "post_uuid",
        "on_behalf_of_uuid",
        "area_uuid",
        "label",
        "role",
        "start_date",
        "end_date",
        "created_at",
    ],
)];

/// Which post a membership listing is restricted to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PostScope {
    #[default]
    Any,
    /// Plain memberships, held without a post.
    Direct,
    /// Roles, through whatever post.
    AnyPost,
    /// Roles through one post.
    Through(PostId),
}

/// Filter for listing memberships. Unset fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipQuery {
    pub member: Option<Member>,
    pub organization_id: Option<OrganizationId>,
    pub post: PostScope,
    pub label: Option<String>,
}

/// Repository interface for memberships.
pub trait MembershipRepository {
    fn create_membership(&self, membership: &Membership) -> RepoResult<MembershipId>;
    fn get_membership(&self, id: MembershipId) -> RepoResult<Option<Membership>>;
    fn list_memberships(&self, query: &MembershipQuery) -> RepoResult<Vec<Membership>>;
}

/// SQLite-backed membership repository.
pub struct SqliteMembershipRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMembershipRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, REQUIRED_TABLES)?;
        Ok(Self { conn })
    }
}

impl MembershipRepository for SqliteMembershipRepository<'_> {
    fn create_membership(&self, membership: &Membership) -> RepoResult<MembershipId> {
        membership.validate()?;

        self.conn.execute(
            "INSERT INTO memberships (
                uuid,
                member_person_uuid,
                member_organization_uuid,
                organization_uuid,
                post_uuid,
                on_behalf_of_uuid,
                area_uuid,
                label,
                role,
                start_date,
                end_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
            params![
                membership.id.to_string(),
                optional_uuid_to_db(membership.member.person_id()),
                optional_uuid_to_db(membership.member.organization_id()),
                membership.organization_id.to_string(),
                optional_uuid_to_db(membership.post_id),
                optional_uuid_to_db(membership.on_behalf_of),
                optional_uuid_to_db(membership.area_id),
                membership.label.as_deref(),
                membership.role.as_deref(),
                date_to_db(membership.start_date.as_ref()),
                date_to_db(membership.end_date.as_ref()),
            ],
        )?;

        Ok(membership.id)
    }

    fn get_membership(&self, id: MembershipId) -> RepoResult<Option<Membership>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{MEMBERSHIP_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_membership_row(row)?));
        }

        Ok(None)
    }

    fn list_memberships(&self, query: &MembershipQuery) -> RepoResult<Vec<Membership>> {
        let mut sql = format!("{MEMBERSHIP_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        match query.member {
            Some(Member::Person(id)) => {
                sql.push_str(" AND member_person_uuid = ?");
                bind_values.push(Value::Text(id.to_string()));
            }
            Some(Member::Organization(id)) => {
                sql.push_str(" AND member_organization_uuid = ?");
                bind_values.push(Value::Text(id.to_string()));
            }
            None => {}
        }

        if let Some(organization_id) = query.organization_id {
            sql.push_str(" AND organization_uuid = ?");
            bind_values.push(Value::Text(organization_id.to_string()));
        }

        match query.post {
            PostScope::Any => {}
            PostScope::Direct => sql.push_str(" AND post_uuid IS NULL"),
            PostScope::AnyPost => sql.push_str(" AND post_uuid IS NOT NULL"),
            PostScope::Through(post_id) => {
                sql.push_str(" AND post_uuid = ?");
                bind_values.push(Value::Text(post_id.to_string()));
            }
        }

        if let Some(label) = query.label.as_deref() {
            sql.push_str(" AND label = ?");
            bind_values.push(Value::Text(label.to_string()));
        }

        sql.push_str(" ORDER BY created_at ASC, rowid ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut memberships = Vec::new();
        while let Some(row) = rows.next()? {
            memberships.push(parse_membership_row(row)?);
        }

        Ok(memberships)
    }
}

fn parse_membership_row(row: &Row<'_>) -> RepoResult<Membership> {
    let person = optional_uuid_column(row, "memberships", "member_person_uuid")?;
    let organization = optional_uuid_column(row, "memberships", "member_organization_uuid")?;
    let member = match (person, organization) {
        (Some(id), None) => Member::Person(id),
        (None, Some(id)) => Member::Organization(id),
        _ => {
            return Err(RepoError::InvalidData(
                "membership must reference exactly one member".to_string(),
            ));
        }
    };

    let membership = Membership {
        id: uuid_column(row, "memberships", "uuid")?,
        member,
        organization_id: uuid_column(row, "memberships", "organization_uuid")?,
        post_id: optional_uuid_column(row, "memberships", "post_uuid")?,
        on_behalf_of: optional_uuid_column(row, "memberships", "on_behalf_of_uuid")?,
        area_id: optional_uuid_column(row, "memberships", "area_uuid")?,
        label: row.get("label")?,
        role: row.get("role")?,
        start_date: date_column(row, "memberships", "start_date")?,
        end_date: date_column(row, "memberships", "end_date")?,
    };
    membership.validate()?;
    Ok(membership)
}
