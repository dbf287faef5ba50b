//! Organization and post repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist organizations, the posts they offer and generic posts.
//! - Record succession links produced by merge and split operations.
//!
//! # Invariants
//! - A succession is written atomically: updated organizations and their
//!   links commit together or not at all.
//! - Post listing is deterministic: `label ASC, uuid ASC`.

use crate::model::organization::{Organization, OrganizationId, Post, PostId};
use crate::repo::{
    date_column, date_to_db, ensure_connection_ready, optional_uuid_column, optional_uuid_to_db,
    uuid_column, RepoError, RepoResult, RequiredTable,
};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};

const ORGANIZATION_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    identifier,
    classification,
    parent_uuid,
    founding_date,
    dissolution_date,
    end_reason
FROM organizations";

const POST_SELECT_SQL: &str = "SELECT
    uuid,
    label,
    other_label,
    role,
    organization_uuid,
    area_uuid,
    appointed_by_uuid,
    start_date,
    end_date
FROM posts";

const REQUIRED_TABLES: &[RequiredTable] = &[
    (
        "organizations",
        &[
            "uuid",
            "name",
            "identifier",
            "classification",
            "parent_uuid",
            "founding_date",
            "dissolution_date",
            "end_reason",
        ],
    ),
    (
        "posts",
        &[
            "uuid",
            "label",
            "other_label",
            "role",
            "organization_uuid",
            "area_uuid",
            "appointed_by_uuid",
            "start_date",
            "end_date",
        ],
    ),
    (
        "organization_successions",
        &["old_organization_uuid", "new_organization_uuid"],
    ),
];

/// Predecessor/successor pair recorded by merge and split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrganizationSuccession {
    pub old: OrganizationId,
    pub new: OrganizationId,
}

/// Repository interface for organizations and posts.
pub trait OrganizationRepository {
    fn create_organization(&self, organization: &Organization) -> RepoResult<OrganizationId>;
    fn update_organization(&self, organization: &Organization) -> RepoResult<()>;
    fn get_organization(&self, id: OrganizationId) -> RepoResult<Option<Organization>>;
    fn create_post(&self, post: &Post) -> RepoResult<PostId>;
    fn update_post(&self, post: &Post) -> RepoResult<()>;
    fn get_post(&self, id: PostId) -> RepoResult<Option<Post>>;
    /// Lists posts specific to one organization.
    fn list_posts(&self, organization_id: OrganizationId) -> RepoResult<Vec<Post>>;
    /// Updates `organizations` and inserts `links` in one transaction.
    fn record_succession(
        &self,
        organizations: &[Organization],
        links: &[OrganizationSuccession],
    ) -> RepoResult<()>;
    /// Lists organizations recorded as successors of `id`.
    fn list_successors(&self, id: OrganizationId) -> RepoResult<Vec<Organization>>;
}

/// SQLite-backed organization repository.
pub struct SqliteOrganizationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteOrganizationRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, REQUIRED_TABLES)?;
        Ok(Self { conn })
    }
}

impl OrganizationRepository for SqliteOrganizationRepository<'_> {
    fn create_organization(&self, organization: &Organization) -> RepoResult<OrganizationId> {
        organization.validate()?;

        self.conn.execute(
            "INSERT INTO organizations (
                uuid,
                name,
                identifier,
                classification,
                parent_uuid,
                founding_date,
                dissolution_date,
                end_reason
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                organization.id.to_string(),
                organization.name.as_str(),
                organization.identifier.as_deref(),
                organization.classification.as_deref(),
                optional_uuid_to_db(organization.parent_id),
                date_to_db(organization.founding_date.as_ref()),
                date_to_db(organization.dissolution_date.as_ref()),
                organization.end_reason.as_deref(),
            ],
        )?;

        Ok(organization.id)
    }

    fn update_organization(&self, organization: &Organization) -> RepoResult<()> {
        update_organization_row(self.conn, organization)
    }

    fn get_organization(&self, id: OrganizationId) -> RepoResult<Option<Organization>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ORGANIZATION_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_organization_row(row)?));
        }

        Ok(None)
    }

    fn create_post(&self, post: &Post) -> RepoResult<PostId> {
        post.validate()?;

        self.conn.execute(
            "INSERT INTO posts (
                uuid,
                label,
                other_label,
                role,
                organization_uuid,
                area_uuid,
                appointed_by_uuid,
                start_date,
                end_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                post.id.to_string(),
                post.label.as_str(),
                post.other_label.as_deref(),
                post.role.as_deref(),
                optional_uuid_to_db(post.organization_id),
                optional_uuid_to_db(post.area_id),
                optional_uuid_to_db(post.appointed_by),
                date_to_db(post.start_date.as_ref()),
                date_to_db(post.end_date.as_ref()),
            ],
        )?;

        Ok(post.id)
    }

    fn update_post(&self, post: &Post) -> RepoResult<()> {
        post.validate()?;

        let changed = self.conn.execute(
            "UPDATE posts
             SET
                label = ?1,
                other_label = ?2,
                role = ?3,
                organization_uuid = ?4,
                area_uuid = ?5,
                appointed_by_uuid = ?6,
                start_date = ?7,
                end_date = ?8,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?9;",
            params![
                post.label.as_str(),
                post.other_label.as_deref(),
                post.role.as_deref(),
                optional_uuid_to_db(post.organization_id),
                optional_uuid_to_db(post.area_id),
                optional_uuid_to_db(post.appointed_by),
                date_to_db(post.start_date.as_ref()),
                date_to_db(post.end_date.as_ref()),
                post.id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "post",
                id: post.id,
            });
        }

        Ok(())
    }

    fn get_post(&self, id: PostId) -> RepoResult<Option<Post>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{POST_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_post_row(row)?));
        }

        Ok(None)
    }

    fn list_posts(&self, organization_id: OrganizationId) -> RepoResult<Vec<Post>> {
        let mut stmt = self.conn.prepare(&format!(
            "{POST_SELECT_SQL}
             WHERE organization_uuid = ?1
             ORDER BY label ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([organization_id.to_string()])?;
        let mut posts = Vec::new();
        while let Some(row) = rows.next()? {
            posts.push(parse_post_row(row)?);
        }

        Ok(posts)
    }

    fn record_succession(
        &self,
        organizations: &[Organization],
        links: &[OrganizationSuccession],
    ) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        for organization in organizations {
            update_organization_row(&tx, organization)?;
        }
        for link in links {
            tx.execute(
                "INSERT OR IGNORE INTO organization_successions (
                    old_organization_uuid,
                    new_organization_uuid
                ) VALUES (?1, ?2);",
                params![link.old.to_string(), link.new.to_string()],
            )?;
        }
        tx.commit()?;

        Ok(())
    }

    fn list_successors(&self, id: OrganizationId) -> RepoResult<Vec<Organization>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ORGANIZATION_SELECT_SQL}
             WHERE uuid IN (
                SELECT new_organization_uuid
                FROM organization_successions
                WHERE old_organization_uuid = ?1
             )
             ORDER BY name ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([id.to_string()])?;
        let mut organizations = Vec::new();
        while let Some(row) = rows.next()? {
            organizations.push(parse_organization_row(row)?);
        }

        Ok(organizations)
    }
}

fn update_organization_row(conn: &Connection, organization: &Organization) -> RepoResult<()> {
    organization.validate()?;

    let changed = conn.execute(
        "UPDATE organizations
         SET
            name = ?1,
            identifier = ?2,
            classification = ?3,
            parent_uuid = ?4,
            founding_date = ?5,
            dissolution_date = ?6,
            end_reason = ?7,
            updated_at = (strftime('%s', 'now') * 1000)
         WHERE uuid = ?8;",
        params![
            organization.name.as_str(),
            organization.identifier.as_deref(),
            organization.classification.as_deref(),
            optional_uuid_to_db(organization.parent_id),
            date_to_db(organization.founding_date.as_ref()),
            date_to_db(organization.dissolution_date.as_ref()),
            organization.end_reason.as_deref(),
            organization.id.to_string(),
        ],
    )?;

    if changed == 0 {
        return Err(RepoError::NotFound {
            entity: "organization",
            id: organization.id,
        });
    }

    Ok(())
}

fn parse_organization_row(row: &Row<'_>) -> RepoResult<Organization> {
    let organization = Organization {
        id: uuid_column(row, "organizations", "uuid")?,
        name: row.get("name")?,
        identifier: row.get("identifier")?,
        classification: row.get("classification")?,
        parent_id: optional_uuid_column(row, "organizations", "parent_uuid")?,
        founding_date: date_column(row, "organizations", "founding_date")?,
        dissolution_date: date_column(row, "organizations", "dissolution_date")?,
        end_reason: row.get("end_reason")?,
    };
    organization.validate()?;
    Ok(organization)
}

fn parse_post_row(row: &Row<'_>) -> RepoResult<Post> {
    let post = Post {
        id: uuid_column(row, "posts", "uuid")?,
        label: row.get("label")?,
        other_label: row.get("other_label")?,
        role: row.get("role")?,
        organization_id: optional_uuid_column(row, "posts", "organization_uuid")?,
        area_id: optional_uuid_column(row, "posts", "area_uuid")?,
        appointed_by: optional_uuid_column(row, "posts", "appointed_by_uuid")?,
        start_date: date_column(row, "posts", "start_date")?,
        end_date: date_column(row, "posts", "end_date")?,
    };
    post.validate()?;
    Ok(post)
}
