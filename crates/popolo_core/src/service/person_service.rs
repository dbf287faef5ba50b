//! Person use-case service.

use crate::model::person::{Person, PersonId};
use crate::repo::person_repo::PersonRepository;
use crate::service::{parse_date, require, ServiceResult};
use log::info;
use serde::Deserialize;

/// Request model for creating a person. Dates are raw partial-date strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NewPerson {
    pub name: String,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub gender: Option<String>,
    pub birth_date: Option<String>,
    pub death_date: Option<String>,
}

/// Person service facade over repository implementations.
pub struct PersonService<R: PersonRepository> {
    repo: R,
}

impl<R: PersonRepository> PersonService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create_person(&self, request: &NewPerson) -> ServiceResult<Person> {
        let mut person = Person::new(request.name.trim());
        person.given_name = request.given_name.clone();
        person.family_name = request.family_name.clone();
        person.gender = request.gender.clone();
        person.birth_date = parse_date(request.birth_date.as_deref())?;
        person.death_date = parse_date(request.death_date.as_deref())?;

        self.repo.create_person(&person)?;
        info!(
            "event=person_create module=service status=ok person_id={}",
            person.id
        );
        Ok(person)
    }

    pub fn get_person(&self, id: PersonId) -> ServiceResult<Person> {
        require(self.repo.get_person(id)?, "person", id)
    }

    pub fn list_persons(&self) -> ServiceResult<Vec<Person>> {
        Ok(self.repo.list_persons()?)
    }
}
