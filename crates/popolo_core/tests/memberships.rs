use popolo_core::db::open_db_in_memory;
use popolo_core::model::organization::Organization;
use popolo_core::model::person::Person;
use popolo_core::repo::membership_repo::SqliteMembershipRepository;
use popolo_core::repo::organization_repo::SqliteOrganizationRepository;
use popolo_core::repo::person_repo::SqlitePersonRepository;
use popolo_core::service::membership_service::{
    MembershipRequest, MembershipService, RoleRequest,
};
use popolo_core::service::organization_service::{NewOrganization, NewPost, OrganizationService};
use popolo_core::service::person_service::{NewPerson, PersonService};
use popolo_core::{Member, OverlapPolicy, ServiceError, ValidationError};
use rusqlite::Connection;

type Memberships<'conn> = MembershipService<
    SqlitePersonRepository<'conn>,
    SqliteOrganizationRepository<'conn>,
    SqliteMembershipRepository<'conn>,
>;

struct Fixture<'conn> {
    memberships: Memberships<'conn>,
    organizations: OrganizationService<SqliteOrganizationRepository<'conn>>,
    person: Person,
    org: Organization,
}

fn fixture(conn: &Connection) -> Fixture<'_> {
    let persons = PersonService::new(SqlitePersonRepository::try_new(conn).unwrap());
    let organizations =
        OrganizationService::new(SqliteOrganizationRepository::try_new(conn).unwrap());
    let memberships = MembershipService::new(
        SqlitePersonRepository::try_new(conn).unwrap(),
        SqliteOrganizationRepository::try_new(conn).unwrap(),
        SqliteMembershipRepository::try_new(conn).unwrap(),
    );

    let person = persons
        .create_person(&NewPerson {
            name: "Mario Rossi".to_string(),
            ..NewPerson::default()
        })
        .unwrap();
    let org = organizations
        .create_organization(&NewOrganization {
            name: "Consiglio comunale".to_string(),
            ..NewOrganization::default()
        })
        .unwrap();

    Fixture {
        memberships,
        organizations,
        person,
        org,
    }
}

fn membership(start: &str, end: &str) -> MembershipRequest {
    MembershipRequest {
        start_date: Some(start.to_string()),
        end_date: Some(end.to_string()),
        ..MembershipRequest::default()
    }
}

fn role(start: &str, end: Option<&str>) -> RoleRequest {
    RoleRequest {
        start_date: Some(start.to_string()),
        end_date: end.map(str::to_string),
        ..RoleRequest::default()
    }
}

#[test]
fn overlapping_membership_is_refused_unless_allowed() {
    let conn = open_db_in_memory().unwrap();
    let f = fixture(&conn);

    let first = f
        .memberships
        .add_membership(f.person.id, f.org.id, &membership("2010", "2015"))
        .unwrap();

    let err = f
        .memberships
        .add_membership(f.person.id, f.org.id, &membership("2012", "2013"))
        .unwrap_err();
    match err {
        ServiceError::OverlappingInterval { conflicting } => {
            assert_eq!(conflicting, vec![first.id]);
        }
        other => panic!("unexpected error: {other}"),
    }

    let allowed = MembershipRequest {
        policy: OverlapPolicy::allowing_overlap(),
        ..membership("2012", "2013")
    };
    f.memberships
        .add_membership(f.person.id, f.org.id, &allowed)
        .unwrap();

    assert_eq!(f.memberships.members(f.org.id).unwrap().len(), 1);
}

#[test]
fn touching_memberships_coexist() {
    let conn = open_db_in_memory().unwrap();
    let f = fixture(&conn);

    f.memberships
        .add_membership(f.person.id, f.org.id, &membership("2001", "2005"))
        .unwrap();
    f.memberships
        .add_membership(f.person.id, f.org.id, &membership("2005", "2010"))
        .unwrap();
}

#[test]
fn roles_do_not_block_direct_memberships() {
    let conn = open_db_in_memory().unwrap();
    let f = fixture(&conn);
    let post = f
        .organizations
        .add_post(
            f.org.id,
            &NewPost {
                label: "Consigliere".to_string(),
                ..NewPost::default()
            },
        )
        .unwrap();

    f.memberships
        .add_role(f.person.id, post.id, &role("2010", Some("2015")))
        .unwrap();
    f.memberships
        .add_membership(f.person.id, f.org.id, &membership("2012", "2013"))
        .unwrap();
}

#[test]
fn consecutive_roles_through_the_same_post_are_accepted() {
    let conn = open_db_in_memory().unwrap();
    let f = fixture(&conn);
    let post = f
        .organizations
        .add_post(
            f.org.id,
            &NewPost {
                label: "R1".to_string(),
                ..NewPost::default()
            },
        )
        .unwrap();

    f.memberships
        .add_role(f.person.id, post.id, &role("2010-01-01", Some("2012-12-31")))
        .unwrap();
    let second = f
        .memberships
        .add_role(f.person.id, post.id, &role("2013-01-01", None))
        .unwrap();
    assert_eq!(second.organization_id, f.org.id);

    let err = f
        .memberships
        .add_role(f.person.id, post.id, &role("2012-06", Some("2013-06")))
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::OverlappingInterval { ref conflicting } if conflicting.len() == 2
    ));
}

#[test]
fn role_post_kind_must_match_the_request() {
    let conn = open_db_in_memory().unwrap();
    let f = fixture(&conn);
    let specific = f
        .organizations
        .add_post(
            f.org.id,
            &NewPost {
                label: "Consigliere".to_string(),
                ..NewPost::default()
            },
        )
        .unwrap();
    let generic = f
        .organizations
        .create_generic_post(&NewPost {
            label: "Sindaco".to_string(),
            ..NewPost::default()
        })
        .unwrap();

    let naming_org = RoleRequest {
        organization_id: Some(f.org.id),
        ..role("2010", None)
    };
    assert!(matches!(
        f.memberships.add_role(f.person.id, specific.id, &naming_org),
        Err(ServiceError::PostMustBeGeneric(id)) if id == specific.id
    ));
    assert!(matches!(
        f.memberships.add_role(f.person.id, generic.id, &role("2010", None)),
        Err(ServiceError::PostMustBeSpecific(id)) if id == generic.id
    ));

    let held = f
        .memberships
        .add_role(f.person.id, generic.id, &naming_org)
        .unwrap();
    assert_eq!(held.organization_id, f.org.id);
    assert_eq!(held.post_id, Some(generic.id));
}

#[test]
fn check_label_narrows_the_overlap_scope() {
    let conn = open_db_in_memory().unwrap();
    let f = fixture(&conn);
    let post = f
        .organizations
        .add_post(
            f.org.id,
            &NewPost {
                label: "Assessore".to_string(),
                ..NewPost::default()
            },
        )
        .unwrap();

    let labeled = |label: &str, check_label: bool| RoleRequest {
        label: Some(label.to_string()),
        check_label,
        ..role("2015", Some("2020"))
    };

    f.memberships
        .add_role(f.person.id, post.id, &labeled("Assessore al bilancio", true))
        .unwrap();
    f.memberships
        .add_role(f.person.id, post.id, &labeled("Assessore alla cultura", true))
        .unwrap();

    assert!(matches!(
        f.memberships
            .add_role(f.person.id, post.id, &labeled("Assessore al turismo", false)),
        Err(ServiceError::OverlappingInterval { .. })
    ));
    assert!(matches!(
        f.memberships
            .add_role(f.person.id, post.id, &labeled("Assessore al bilancio", true)),
        Err(ServiceError::OverlappingInterval { .. })
    ));
}

#[test]
fn role_on_behalf_of_records_the_behalf_organization() {
    let conn = open_db_in_memory().unwrap();
    let f = fixture(&conn);
    let party = f
        .organizations
        .create_organization(&NewOrganization {
            name: "Partito".to_string(),
            ..NewOrganization::default()
        })
        .unwrap();
    let post = f
        .organizations
        .add_post(
            f.org.id,
            &NewPost {
                label: "Consigliere".to_string(),
                ..NewPost::default()
            },
        )
        .unwrap();

    let held = f
        .memberships
        .add_role_on_behalf_of(f.person.id, post.id, party.id, &role("2016", None))
        .unwrap();
    assert_eq!(held.on_behalf_of, Some(party.id));
    assert!(held.is_role());

    let organizations = f.memberships.organizations_with_roles(f.person.id).unwrap();
    assert_eq!(organizations.len(), 1);
    assert_eq!(organizations[0].id, f.org.id);
}

#[test]
fn inverted_dates_are_rejected_before_the_gate() {
    let conn = open_db_in_memory().unwrap();
    let f = fixture(&conn);

    let err = f
        .memberships
        .add_membership(f.person.id, f.org.id, &membership("2015", "2010"))
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Invalid(ValidationError::InvertedDates { .. })
    ));
}

#[test]
fn unparseable_request_date_is_an_error() {
    let conn = open_db_in_memory().unwrap();
    let f = fixture(&conn);

    let err = f
        .memberships
        .add_membership(f.person.id, f.org.id, &membership("March 2010", "2015"))
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidDate(_)));
}

#[test]
fn batch_stops_at_first_refusal() {
    let conn = open_db_in_memory().unwrap();
    let f = fixture(&conn);

    let err = f
        .memberships
        .add_memberships(
            f.person.id,
            &[
                (f.org.id, membership("2000", "2004")),
                (f.org.id, membership("2003", "2008")),
                (f.org.id, membership("2009", "2012")),
            ],
        )
        .unwrap_err();
    assert!(matches!(err, ServiceError::OverlappingInterval { .. }));
}

#[test]
fn organization_members_bypass_the_overlap_gate() {
    let conn = open_db_in_memory().unwrap();
    let f = fixture(&conn);
    let group = f
        .organizations
        .create_organization(&NewOrganization {
            name: "Gruppo".to_string(),
            ..NewOrganization::default()
        })
        .unwrap();

    for _ in 0..2 {
        f.memberships
            .add_member(
                f.org.id,
                Member::Organization(group.id),
                &membership("2010", "2015"),
            )
            .unwrap();
    }
    f.memberships
        .add_member(f.org.id, Member::Person(f.person.id), &membership("2010", "2015"))
        .unwrap();

    let members = f.memberships.members(f.org.id).unwrap();
    assert_eq!(
        members,
        vec![Member::Organization(group.id), Member::Person(f.person.id)]
    );
}

#[test]
fn allow_overlap_deserializes_from_a_flat_request() {
    let request: MembershipRequest = serde_json::from_str(
        r#"{"start_date": "2010", "end_date": "2015", "allow_overlap": true}"#,
    )
    .unwrap();
    assert!(request.policy.allow_overlap);
    assert_eq!(request.start_date.as_deref(), Some("2010"));
}

#[test]
fn unknown_person_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let f = fixture(&conn);
    let missing = uuid::Uuid::new_v4();

    assert!(matches!(
        f.memberships
            .add_membership(missing, f.org.id, &membership("2010", "2015")),
        Err(ServiceError::NotFound { entity: "person", .. })
    ));
}

#[test]
fn windows_inside_or_equal_to_an_existing_one_are_refused() {
    let conn = open_db_in_memory().unwrap();
    let f = fixture(&conn);
    let existing = f
        .memberships
        .add_membership(f.person.id, f.org.id, &membership("2001", "2005"))
        .unwrap();
    assert!(!existing.is_role());

    for (start, end) in [("2005", "2005"), ("2001", "2005")] {
        match f
            .memberships
            .add_membership(f.person.id, f.org.id, &membership(start, end))
        {
            Err(ServiceError::OverlappingInterval { conflicting }) => {
                assert_eq!(conflicting, vec![existing.id]);
            }
            other => panic!("[{start}, {end}] was not refused: {other:?}"),
        }
    }

    f.memberships
        .add_membership(f.person.id, f.org.id, &membership("2005", "2010"))
        .unwrap();
}

#[test]
fn add_roles_stops_at_first_refusal() {
    let conn = open_db_in_memory().unwrap();
    let f = fixture(&conn);
    let posts = f
        .organizations
        .add_posts(
            f.org.id,
            &[
                NewPost {
                    label: "Sindaco".to_string(),
                    ..NewPost::default()
                },
                NewPost {
                    label: "Assessore".to_string(),
                    ..NewPost::default()
                },
            ],
        )
        .unwrap();
    assert_eq!(f.organizations.list_posts(f.org.id).unwrap().len(), 2);

    let held = f
        .memberships
        .add_roles(
            f.person.id,
            &[
                (posts[0].id, role("2013", Some("2018"))),
                (posts[1].id, role("2013", Some("2018"))),
            ],
        )
        .unwrap();
    assert!(held.iter().all(|role| role.is_role()));

    let err = f
        .memberships
        .add_roles(
            f.person.id,
            &[
                (posts[0].id, role("2018", Some("2023"))),
                (posts[0].id, role("2020", Some("2021"))),
            ],
        )
        .unwrap_err();
    assert!(matches!(err, ServiceError::OverlappingInterval { .. }));
}

#[test]
fn add_person_needs_a_specific_post() {
    let conn = open_db_in_memory().unwrap();
    let f = fixture(&conn);
    let party = f
        .organizations
        .create_organization(&NewOrganization {
            name: "Lista civica".to_string(),
            ..NewOrganization::default()
        })
        .unwrap();
    let seat = f
        .organizations
        .add_post(
            f.org.id,
            &NewPost {
                label: "Consigliere".to_string(),
                ..NewPost::default()
            },
        )
        .unwrap();
    let generic = f
        .organizations
        .create_generic_post(&NewPost {
            label: "Presidente".to_string(),
            ..NewPost::default()
        })
        .unwrap();

    let held = f
        .memberships
        .add_person_on_behalf_of(seat.id, f.person.id, party.id, &role("2013", None))
        .unwrap();
    assert_eq!(held.organization_id, f.org.id);
    assert_eq!(held.post_id, Some(seat.id));
    assert_eq!(held.on_behalf_of, Some(party.id));

    let generic_request = RoleRequest {
        organization_id: Some(f.org.id),
        ..role("2013", None)
    };
    assert!(matches!(
        f.memberships.add_person(generic.id, f.person.id, &generic_request),
        Err(ServiceError::PostMustBeSpecific(id)) if id == generic.id
    ));
}

#[test]
fn add_members_accepts_persons_and_organizations() {
    let conn = open_db_in_memory().unwrap();
    let f = fixture(&conn);
    let group = f
        .organizations
        .create_organization(&NewOrganization {
            name: "Gruppo misto".to_string(),
            ..NewOrganization::default()
        })
        .unwrap();

    let added = f
        .memberships
        .add_members(
            f.org.id,
            &[
                (Member::Person(f.person.id), membership("2013", "2018")),
                (Member::Organization(group.id), membership("2013", "2018")),
            ],
        )
        .unwrap();
    assert_eq!(added.len(), 2);
    assert_eq!(
        f.memberships.members(f.org.id).unwrap(),
        vec![Member::Person(f.person.id), Member::Organization(group.id)]
    );
}
