use eventplan_core::db::open_db_in_memory;
use eventplan_core::{
    EntityKind, EventDetails, EventService, EventTypeService, LifecycleError, ListQuery,
    PublishState, RelationError, RepoError, ServiceError, SqliteEventRepository, SqliteEventTypeRepository,
    SqliteTaskDefinitionRepository, TaskDefinitionError, TaskDefinitionInput, SECONDS_PER_DAY,
};
use rusqlite::Connection;

type TypeService<'conn> =
    EventTypeService<SqliteEventTypeRepository<'conn>, SqliteTaskDefinitionRepository<'conn>>;
type Events<'conn> = EventService<
    SqliteEventRepository<'conn>,
    SqliteEventTypeRepository<'conn>,
    SqliteTaskDefinitionRepository<'conn>,
>;

fn type_service(conn: &Connection) -> TypeService<'_> {
    EventTypeService::new(
        SqliteEventTypeRepository::try_new(conn).unwrap(),
        SqliteTaskDefinitionRepository::try_new(conn).unwrap(),
    )
}

fn event_service(conn: &Connection) -> Events<'_> {
    EventService::new(
        SqliteEventRepository::try_new(conn).unwrap(),
        SqliteEventTypeRepository::try_new(conn).unwrap(),
        SqliteTaskDefinitionRepository::try_new(conn).unwrap(),
    )
}

fn task(title: &str, start: u32, finish: u32) -> TaskDefinitionInput {
    TaskDefinitionInput {
        title: title.to_string(),
        start_offset_in_days: start,
        finish_offset_in_days: finish,
        description: String::new(),
    }
}

fn fail_updates_of_event_type(conn: &Connection, id: i64) {
    conn.execute_batch(&format!(
        "CREATE TRIGGER reject_event_type_update
         BEFORE UPDATE ON event_types
         WHEN OLD.id = {id}
         BEGIN
            SELECT RAISE(ABORT, 'disk full');
         END;"
    ))
    .unwrap();
}

fn stored_task_definition_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM task_definitions;", [], |row| row.get(0))
        .unwrap()
}

#[test]
fn lifecycle_controls_catalogue_visibility() {
    let conn = open_db_in_memory().unwrap();
    let service = type_service(&conn);
    let wedding = service.create_event_type("Wedding", "").unwrap();

    assert!(service
        .list_event_types(&ListQuery::default())
        .unwrap()
        .is_empty());

    assert_eq!(
        service.publish_event_type(wedding.id()).unwrap(),
        PublishState::Published
    );
    assert_eq!(
        service.publish_event_type(wedding.id()).unwrap(),
        PublishState::Published
    );
    assert_eq!(
        service.list_event_types(&ListQuery::default()).unwrap().len(),
        1
    );

    service.delete_event_type(wedding.id()).unwrap();
    assert!(service
        .list_event_types(&ListQuery::default())
        .unwrap()
        .is_empty());
    assert_eq!(
        service.get_event_type(wedding.id()).unwrap().state(),
        PublishState::Deleted
    );

    let err = service.publish_event_type(wedding.id()).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Lifecycle(LifecycleError::AlreadyDeleted)
    ));
}

#[test]
fn missing_event_type_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = type_service(&conn);

    let err = service.get_event_type(9).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::NotFound {
            kind: EntityKind::EventType,
            id: 9
        }
    ));

    let err = service.publish_event_type(9).unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { .. }));
}

#[test]
fn subtype_flows_persist_and_reject_cycles() {
    let conn = open_db_in_memory().unwrap();
    let service = type_service(&conn);
    let a = service.create_event_type("A", "").unwrap();
    let b = service.create_event_type("B", "").unwrap();

    service.add_subtype(a.id(), b.id()).unwrap();
    assert_eq!(
        service.get_event_type(a.id()).unwrap().subtype_ids(),
        &[b.id()]
    );

    let err = service.add_subtype(b.id(), a.id()).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Relation(RelationError::CycleDetected { .. })
    ));
    assert!(service.get_event_type(b.id()).unwrap().subtype_ids().is_empty());

    assert!(service.remove_subtype(a.id(), b.id()).unwrap());
    assert!(!service.remove_subtype(a.id(), b.id()).unwrap());

    let replaced = service
        .replace_subtypes(a.id(), &b.id().to_string())
        .unwrap();
    assert_eq!(replaced.subtype_ids(), &[b.id()]);
    assert_eq!(service.subtypes(a.id()).unwrap().len(), 1);
}

#[test]
fn task_definition_create_attaches_and_edit_rewrites() {
    let conn = open_db_in_memory().unwrap();
    let service = type_service(&conn);
    let wedding = service.create_event_type("Wedding", "").unwrap();

    let venue = service
        .create_task_definition(wedding.id(), &task("Book venue", 30, 20))
        .unwrap();
    let venue_id = venue.id().unwrap();
    assert_eq!(
        service.get_event_type(wedding.id()).unwrap().task_definition_ids(),
        &[venue_id]
    );

    let edited = service
        .edit_task_definition(venue_id, &task("Book the venue", 45, 30))
        .unwrap();
    assert_eq!(edited.title(), "Book the venue");
    assert_eq!(
        service.task_definitions(wedding.id()).unwrap(),
        vec![edited]
    );

    let err = service
        .edit_task_definition(venue_id, &task("", 1, 0))
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::InvalidTaskDefinition(TaskDefinitionError::BlankTitle)
    ));
}

#[test]
fn task_definition_create_for_missing_type_leaves_no_orphan() {
    let conn = open_db_in_memory().unwrap();
    let service = type_service(&conn);

    let err = service
        .create_task_definition(404, &task("Orphan", 1, 0))
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { .. }));

    assert_eq!(stored_task_definition_count(&conn), 0);
}

#[test]
fn failed_attach_rolls_back_task_definition_insert() {
    let conn = open_db_in_memory().unwrap();
    let service = type_service(&conn);
    let wedding = service.create_event_type("Wedding", "").unwrap();
    fail_updates_of_event_type(&conn, wedding.id());

    let err = service
        .create_task_definition(wedding.id(), &task("Book venue", 30, 20))
        .unwrap_err();

    assert!(matches!(err, ServiceError::Repo(RepoError::Db(_))));
    assert_eq!(stored_task_definition_count(&conn), 0);
    assert!(service
        .get_event_type(wedding.id())
        .unwrap()
        .task_definition_ids()
        .is_empty());
}

#[test]
fn failed_cascade_delete_keeps_every_reference_and_the_definition() {
    let conn = open_db_in_memory().unwrap();
    let service = type_service(&conn);
    let wedding = service.create_event_type("Wedding", "").unwrap();
    let party = service.create_event_type("Party", "").unwrap();
    let cake_id = service
        .create_task_definition(wedding.id(), &task("Order cake", 10, 2))
        .unwrap()
        .id()
        .unwrap();
    service
        .replace_task_definitions(party.id(), &cake_id.to_string())
        .unwrap();
    fail_updates_of_event_type(&conn, party.id());

    let err = service.delete_task_definition(cake_id).unwrap_err();

    assert!(matches!(err, ServiceError::Repo(RepoError::Db(_))));
    for event_type_id in [wedding.id(), party.id()] {
        assert_eq!(
            service.get_event_type(event_type_id).unwrap().task_definition_ids(),
            &[cake_id]
        );
    }
    assert!(service.get_task_definition(cake_id).is_ok());
}

#[test]
fn mutations_on_missing_rows_are_not_found() {
    let conn = open_db_in_memory().unwrap();
    let types = type_service(&conn);
    let events = event_service(&conn);
    let wedding = types.create_event_type("Wedding", "").unwrap();

    let missing_type = |err: ServiceError| {
        matches!(
            err,
            ServiceError::NotFound {
                kind: EntityKind::EventType,
                id: 404
            }
        )
    };
    assert!(missing_type(types.update_details(404, "Gone", "").unwrap_err()));
    assert!(missing_type(types.remove_subtype(404, wedding.id()).unwrap_err()));
    assert!(missing_type(types.remove_task_definition(404, 1).unwrap_err()));
    assert!(missing_type(types.add_subtype(wedding.id(), 404).unwrap_err()));

    let missing_event = |err: ServiceError| {
        matches!(
            err,
            ServiceError::NotFound {
                kind: EntityKind::Event,
                id: 404
            }
        )
    };
    assert!(missing_event(events.detach_event_type(404, wedding.id()).unwrap_err()));
    assert!(missing_event(
        events.update_details(404, &EventDetails::default()).unwrap_err()
    ));
    assert!(missing_event(events.attach_event_type(404, wedding.id()).unwrap_err()));
}

#[test]
fn failed_create_allocates_no_event_type_row() {
    let conn = open_db_in_memory().unwrap();
    let service = type_service(&conn);
    conn.execute_batch(
        "CREATE TRIGGER reject_named_event_type
         BEFORE UPDATE OF display_name ON event_types
         BEGIN
            SELECT RAISE(ABORT, 'disk full');
         END;",
    )
    .unwrap();

    let err = service.create_event_type("Wedding", "").unwrap_err();

    assert!(matches!(err, ServiceError::Repo(RepoError::Db(_))));
    assert!(service.list_event_types(&ListQuery::all()).unwrap().is_empty());
}

#[test]
fn task_definition_delete_cascades_to_every_event_type() {
    let conn = open_db_in_memory().unwrap();
    let service = type_service(&conn);
    let wedding = service.create_event_type("Wedding", "").unwrap();
    let party = service.create_event_type("Party", "").unwrap();
    let cake = service
        .create_task_definition(wedding.id(), &task("Order cake", 10, 2))
        .unwrap();
    let cake_id = cake.id().unwrap();
    service
        .replace_task_definitions(party.id(), &cake_id.to_string())
        .unwrap();
    service.delete_event_type(party.id()).unwrap();

    let detached = service.delete_task_definition(cake_id).unwrap();

    assert_eq!(detached, vec![wedding.id(), party.id()]);
    assert!(service
        .get_event_type(wedding.id())
        .unwrap()
        .task_definition_ids()
        .is_empty());
    assert!(matches!(
        service.get_task_definition(cake_id).unwrap_err(),
        ServiceError::NotFound {
            kind: EntityKind::TaskDefinition,
            ..
        }
    ));
}

#[test]
fn replacing_task_definitions_requires_resolvable_ids() {
    let conn = open_db_in_memory().unwrap();
    let service = type_service(&conn);
    let wedding = service.create_event_type("Wedding", "").unwrap();

    let err = service.replace_task_definitions(wedding.id(), "12").unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Relation(RelationError::Unresolved {
            kind: EntityKind::TaskDefinition,
            id: 12
        })
    ));
    assert!(service
        .get_event_type(wedding.id())
        .unwrap()
        .task_definition_ids()
        .is_empty());
}

#[test]
fn event_flow_attaches_types_and_builds_checklist() {
    let conn = open_db_in_memory().unwrap();
    let types = type_service(&conn);
    let events = event_service(&conn);

    let wedding = types.create_event_type("Wedding", "").unwrap();
    let conference = types.create_event_type("Conference", "").unwrap();
    types.publish_event_type(wedding.id()).unwrap();
    types.publish_event_type(conference.id()).unwrap();
    let venue = types
        .create_task_definition(wedding.id(), &task("Book venue", 30, 20))
        .unwrap();

    let start = 1_770_000_000;
    let event = events
        .create_event(&EventDetails {
            name: "Ana & Ben".to_string(),
            location: "Lisbon".to_string(),
            start_time: start,
            end_time: start + 7_200,
        })
        .unwrap();

    events.attach_event_type(event.id(), wedding.id()).unwrap();
    let err = events
        .attach_event_type(event.id(), wedding.id())
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Relation(RelationError::DuplicateEventType { .. })
    ));

    let addable: Vec<i64> = events
        .addable_event_types(event.id())
        .unwrap()
        .iter()
        .map(|event_type| event_type.id())
        .collect();
    assert_eq!(addable, vec![conference.id()]);

    let checklist = events.checklist(event.id()).unwrap();
    assert_eq!(checklist.len(), 1);
    assert_eq!(checklist[0].task_definition_id, venue.id().unwrap());
    assert_eq!(checklist[0].starts_at, start - 30 * SECONDS_PER_DAY);
    assert_eq!(checklist[0].due_at, start - 20 * SECONDS_PER_DAY);

    assert!(events.detach_event_type(event.id(), wedding.id()).unwrap());
    assert!(events.checklist(event.id()).unwrap().is_empty());
}

#[test]
fn invalid_event_details_allocate_nothing() {
    let conn = open_db_in_memory().unwrap();
    let events = event_service(&conn);

    let err = events
        .create_event(&EventDetails {
            start_time: 100,
            end_time: 50,
            ..EventDetails::default()
        })
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidEvent(_)));
    assert!(events.list_events(&ListQuery::all()).unwrap().is_empty());
}

#[test]
fn events_list_by_state_and_start_time() {
    let conn = open_db_in_memory().unwrap();
    let events = event_service(&conn);
    let later = events
        .create_event(&EventDetails {
            start_time: 500,
            end_time: 600,
            ..EventDetails::default()
        })
        .unwrap();
    let earlier = events
        .create_event(&EventDetails {
            start_time: 100,
            end_time: 200,
            ..EventDetails::default()
        })
        .unwrap();
    events.publish_event(later.id()).unwrap();
    events.publish_event(earlier.id()).unwrap();

    let listed: Vec<i64> = events
        .list_events(&ListQuery::default())
        .unwrap()
        .iter()
        .map(|event| event.id())
        .collect();
    assert_eq!(listed, vec![earlier.id(), later.id()]);

    events.delete_event(later.id()).unwrap();
    assert_eq!(events.list_events(&ListQuery::default()).unwrap().len(), 1);
    assert_eq!(
        events.get_event(later.id()).unwrap().state(),
        PublishState::Deleted
    );
}
