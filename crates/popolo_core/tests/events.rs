use popolo_core::db::open_db_in_memory;
use popolo_core::model::area::IstatLevel;
use popolo_core::model::event::KeyEventKind;
use popolo_core::repo::area_repo::SqliteAreaRepository;
use popolo_core::repo::event_repo::SqliteEventRepository;
use popolo_core::repo::organization_repo::SqliteOrganizationRepository;
use popolo_core::service::area_service::{AreaService, NewArea};
use popolo_core::service::event_service::{EventService, NewEvent, NewKeyEvent};
use popolo_core::service::organization_service::{NewOrganization, OrganizationService};
use popolo_core::{PartialDate, ServiceError, ValidationError};
use rusqlite::Connection;
use uuid::Uuid;

type Events<'conn> = EventService<
    SqliteAreaRepository<'conn>,
    SqliteOrganizationRepository<'conn>,
    SqliteEventRepository<'conn>,
>;

fn event_service(conn: &Connection) -> Events<'_> {
    EventService::new(
        SqliteAreaRepository::try_new(conn).unwrap(),
        SqliteOrganizationRepository::try_new(conn).unwrap(),
        SqliteEventRepository::try_new(conn).unwrap(),
    )
}

fn council(conn: &Connection) -> Uuid {
    OrganizationService::new(SqliteOrganizationRepository::try_new(conn).unwrap())
        .create_organization(&NewOrganization {
            name: "Consiglio comunale".to_string(),
            ..NewOrganization::default()
        })
        .unwrap()
        .id
}

fn election(kind: KeyEventKind, start: &str) -> NewKeyEvent {
    NewKeyEvent {
        kind,
        start_date: Some(start.to_string()),
        ..NewKeyEvent::default()
    }
}

#[test]
fn events_are_listed_per_area_in_start_order() {
    let conn = open_db_in_memory().unwrap();
    let town = AreaService::new(SqliteAreaRepository::try_new(&conn).unwrap())
        .create_area(&NewArea {
            name: "Bagheria".to_string(),
            istat_level: Some(IstatLevel::Municipality),
            ..NewArea::default()
        })
        .unwrap();
    let service = event_service(&conn);

    for (name, start) in [("Seduta 2", "2018-03-01T09:00"), ("Seduta 1", "2018-02-01T09:00")] {
        service
            .create_event(&NewEvent {
                name: name.to_string(),
                start_date: Some(start.to_string()),
                area_id: Some(town.id),
                ..NewEvent::default()
            })
            .unwrap();
    }

    let names: Vec<_> = service
        .area_events(town.id)
        .unwrap()
        .into_iter()
        .map(|event| event.name)
        .collect();
    assert_eq!(names, ["Seduta 1", "Seduta 2"]);
}

#[test]
fn event_rejects_inverted_window_and_unknown_area() {
    let conn = open_db_in_memory().unwrap();
    let service = event_service(&conn);

    let inverted = service.create_event(&NewEvent {
        name: "Seduta".to_string(),
        start_date: Some("2018-03-01".to_string()),
        end_date: Some("2018-02-28".to_string()),
        ..NewEvent::default()
    });
    assert!(matches!(
        inverted,
        Err(ServiceError::Invalid(ValidationError::InvertedDates { .. }))
    ));

    let missing_area = Uuid::new_v4();
    let orphan = service.create_event(&NewEvent {
        name: "Seduta".to_string(),
        area_id: Some(missing_area),
        ..NewEvent::default()
    });
    assert!(matches!(
        orphan,
        Err(ServiceError::NotFound { entity: "area", id }) if id == missing_area
    ));
}

#[test]
fn key_event_kind_and_start_are_unique() {
    let conn = open_db_in_memory().unwrap();
    let service = event_service(&conn);

    let first = service
        .create_key_event(&election(KeyEventKind::MunicipalElection, "2018-06-10"))
        .unwrap();
    let duplicate = service.create_key_event(&election(KeyEventKind::MunicipalElection, "2018-06-10"));
    assert!(matches!(
        duplicate,
        Err(ServiceError::DuplicateKeyEvent { existing }) if existing == first.id
    ));

    let other_kind = service
        .create_key_event(&election(KeyEventKind::RegionalElection, "2018-06-10"))
        .unwrap();
    assert_ne!(other_kind.id, first.id);
    assert_eq!(
        service.get_key_event(first.id).unwrap().start_date,
        Some(PartialDate::parse("2018-06-10").unwrap())
    );
}

#[test]
fn adding_a_key_event_twice_keeps_one_link() {
    let conn = open_db_in_memory().unwrap();
    let service = event_service(&conn);
    let organization_id = council(&conn);
    let vote = service
        .create_key_event(&election(KeyEventKind::MunicipalElection, "2013-06-09"))
        .unwrap();

    let links = service
        .add_key_events(organization_id, &[vote.id, vote.id])
        .unwrap();
    assert!(links[0].created);
    assert!(!links[1].created);
    assert_eq!(service.key_events(organization_id).unwrap(), vec![vote.clone()]);

    let unknown = service.add_key_event(organization_id, Uuid::new_v4());
    assert!(matches!(
        unknown,
        Err(ServiceError::NotFound { entity: "key event", .. })
    ));
}

#[test]
fn update_key_events_replaces_the_linked_set() {
    let conn = open_db_in_memory().unwrap();
    let service = event_service(&conn);
    let organization_id = council(&conn);
    let first = service
        .create_key_event(&election(KeyEventKind::MunicipalElection, "2013-06-09"))
        .unwrap();
    let second = service
        .create_key_event(&election(KeyEventKind::MunicipalElection, "2018-06-10"))
        .unwrap();
    let third = service
        .create_key_event(&election(KeyEventKind::ExternalAdministration, "2016-01-20"))
        .unwrap();

    service
        .add_key_events(organization_id, &[first.id, second.id])
        .unwrap();
    let linked = service
        .update_key_events(organization_id, &[second.id, third.id])
        .unwrap();
    let ids: Vec<_> = linked.iter().map(|key_event| key_event.id).collect();
    assert_eq!(ids, [third.id, second.id]);

    let cleared = service.update_key_events(organization_id, &[]).unwrap();
    assert!(cleared.is_empty());
}

#[test]
fn update_key_events_with_unknown_id_changes_nothing() {
    let conn = open_db_in_memory().unwrap();
    let service = event_service(&conn);
    let organization_id = council(&conn);
    let vote = service
        .create_key_event(&election(KeyEventKind::Election, "2013-06-09"))
        .unwrap();
    service.add_key_event(organization_id, vote.id).unwrap();

    let result = service.update_key_events(organization_id, &[Uuid::new_v4()]);
    assert!(matches!(result, Err(ServiceError::NotFound { .. })));
    assert_eq!(service.key_events(organization_id).unwrap().len(), 1);
}
