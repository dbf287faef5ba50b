//! Person repository contract and SQLite implementation.
//!
//! # Invariants
//! - Listing is deterministic: `name ASC, uuid ASC`.

use crate::model::person::{Person, PersonId};
use crate::repo::{
    date_column, date_to_db, ensure_connection_ready, uuid_column, RepoError, RepoResult,
    RequiredTable,
};
use rusqlite::{params, Connection, Row};

const PERSON_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    given_name,
    family_name,
    gender,
    birth_date,
    death_date
FROM persons";

const REQUIRED_TABLES: &[RequiredTable] = &[(
    "persons",
    &[
        "uuid",
        "name",
        "given_name",
        "family_name",
        "gender",
        "birth_date",
        "death_date",
    ],
)];

/// Repository interface for persons.
pub trait PersonRepository {
    fn create_person(&self, person: &Person) -> RepoResult<PersonId>;
    fn update_person(&self, person: &Person) -> RepoResult<()>;
    fn get_person(&self, id: PersonId) -> RepoResult<Option<Person>>;
    fn list_persons(&self) -> RepoResult<Vec<Person>>;
}

/// SQLite-backed person repository.
pub struct SqlitePersonRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePersonRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, REQUIRED_TABLES)?;
        Ok(Self { conn })
    }
}

impl PersonRepository for SqlitePersonRepository<'_> {
    fn create_person(&self, person: &Person) -> RepoResult<PersonId> {
        person.validate()?;

        self.conn.execute(
            "INSERT INTO persons (
                uuid,
                name,
                given_name,
                family_name,
                gender,
                birth_date,
                death_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                person.id.to_string(),
                person.name.as_str(),
                person.given_name.as_deref(),
                person.family_name.as_deref(),
                person.gender.as_deref(),
                date_to_db(person.birth_date.as_ref()),
                date_to_db(person.death_date.as_ref()),
            ],
        )?;

        Ok(person.id)
    }

    fn update_person(&self, person: &Person) -> RepoResult<()> {
        person.validate()?;

        let changed = self.conn.execute(
            "UPDATE persons
             SET
                name = ?1,
                given_name = ?2,
                family_name = ?3,
                gender = ?4,
                birth_date = ?5,
                death_date = ?6,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?7;",
            params![
                person.name.as_str(),
                person.given_name.as_deref(),
                person.family_name.as_deref(),
                person.gender.as_deref(),
                date_to_db(person.birth_date.as_ref()),
                date_to_db(person.death_date.as_ref()),
                person.id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "person",
                id: person.id,
            });
        }

        Ok(())
    }

    fn get_person(&self, id: PersonId) -> RepoResult<Option<Person>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PERSON_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_person_row(row)?));
        }

        Ok(None)
    }

    fn list_persons(&self) -> RepoResult<Vec<Person>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PERSON_SELECT_SQL} ORDER BY name ASC, uuid ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut persons = Vec::new();
        while let Some(row) = rows.next()? {
            persons.push(parse_person_row(row)?);
        }

        Ok(persons)
    }
}

fn parse_person_row(row: &Row<'_>) -> RepoResult<Person> {
    let person = Person {
        id: uuid_column(row, "persons", "uuid")?,
        name: row.get("name")?,
        given_name: row.get("given_name")?,
        family_name: row.get("family_name")?,
        gender: row.get("gender")?,
        birth_date: date_column(row, "persons", "birth_date")?,
        death_date: date_column(row, "persons", "death_date")?,
    };
    person.validate()?;
    Ok(person)
}

#[cfg(test)]
mod tests {
    use super::{PersonRepository, SqlitePersonRepository};
    use crate::dates::partial_date::PartialDate;
    use crate::db::open_db_in_memory;
    use crate::model::person::Person;
    use crate::repo::RepoError;
    use uuid::Uuid;

    #[test]
    fn create_and_get_keeps_partial_dates() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqlitePersonRepository::try_new(&conn).unwrap();

        let mut person = Person::new("Ada Lovelace");
        person.birth_date = Some(PartialDate::parse("1815-12").unwrap());
        person.death_date = Some(PartialDate::parse("1852").unwrap());
        repo.create_person(&person).unwrap();

        let loaded = repo.get_person(person.id).unwrap().unwrap();
        assert_eq!(loaded, person);
    }

    #[test]
    fn update_of_unknown_person_is_not_found() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqlitePersonRepository::try_new(&conn).unwrap();

        let err = repo.update_person(&Person::new("Nobody")).unwrap_err();
        assert!(matches!(err, RepoError::NotFound { entity: "person", .. }));
    }

    #[test]
    fn corrupt_date_column_is_rejected_on_read() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqlitePersonRepository::try_new(&conn).unwrap();
        let id = Uuid::new_v4();
        conn.execute(
            "INSERT INTO persons (uuid, name, birth_date) VALUES (?1, 'X', 'yesterday');",
            [id.to_string()],
        )
        .unwrap();

        let err = repo.get_person(id).unwrap_err();
        assert!(matches!(err, RepoError::InvalidData(_)));
    }
}
