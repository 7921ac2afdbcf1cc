use eventplan_core::db::open_db_in_memory;
use eventplan_core::{
    EntityKind, EventType, EventTypeRepository, IdListError, ListQuery, RelationError,
    RepoError, SqliteEventTypeRepository,
};
use rusqlite::Connection;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn create(repo: &SqliteEventTypeRepository<'_>, name: &str) -> EventType {
    let mut event_type = repo.create_event_type().unwrap();
    event_type.set_display_name(name);
    repo.update_event_type(&event_type).unwrap();
    event_type
}

fn publish(repo: &SqliteEventTypeRepository<'_>, event_type: &EventType) -> EventType {
    repo.publish_event_type(event_type.id()).unwrap();
    repo.get_event_type(event_type.id()).unwrap().unwrap()
}

fn ids(event_types: &[EventType]) -> Vec<i64> {
    event_types.iter().map(EventType::id).collect()
}

#[test]
fn adding_self_as_subtype_is_a_cycle() {
    let conn = setup();
    let repo = SqliteEventTypeRepository::try_new(&conn).unwrap();
    let mut a = create(&repo, "A");
    let snapshot = a.clone();

    let err = a.add_subtype(&snapshot, &repo).unwrap_err();
    assert!(matches!(
        err,
        RelationError::CycleDetected { parent, subtype } if parent == a.id() && subtype == a.id()
    ));
    assert!(a.subtype_ids().is_empty());
}

#[test]
fn added_subtype_sees_reverse_edge_as_cycle() {
    let conn = setup();
    let repo = SqliteEventTypeRepository::try_new(&conn).unwrap();
    let mut a = create(&repo, "A");
    let b = create(&repo, "B");

    a.add_subtype(&b, &repo).unwrap();

    assert!(b.append_causes_cycle(&a, &repo).unwrap());
    assert!(!a.append_causes_cycle(&b, &repo).unwrap());
}

#[test]
fn chain_allows_shortcut_but_rejects_back_edge() {
    let conn = setup();
    let repo = SqliteEventTypeRepository::try_new(&conn).unwrap();
    let mut a = create(&repo, "A");
    let mut b = create(&repo, "B");
    let mut c = create(&repo, "C");

    a.add_subtype(&b, &repo).unwrap();
    repo.update_event_type(&a).unwrap();
    b.add_subtype(&c, &repo).unwrap();
    repo.update_event_type(&b).unwrap();

    a.add_subtype(&c, &repo).unwrap();
    assert_eq!(a.subtype_ids(), &[b.id(), c.id()]);

    let err = c.add_subtype(&a, &repo).unwrap_err();
    assert!(matches!(err, RelationError::CycleDetected { .. }));
    assert!(c.subtype_ids().is_empty());
}

#[test]
fn duplicate_edge_is_rejected() {
    let conn = setup();
    let repo = SqliteEventTypeRepository::try_new(&conn).unwrap();
    let mut a = create(&repo, "A");
    let b = create(&repo, "B");

    a.add_subtype(&b, &repo).unwrap();
    let err = a.add_subtype(&b, &repo).unwrap_err();
    assert!(matches!(err, RelationError::DuplicateEdge { .. }));
    assert_eq!(a.subtype_ids(), &[b.id()]);
}

#[test]
fn remove_subtype_is_idempotent() {
    let conn = setup();
    let repo = SqliteEventTypeRepository::try_new(&conn).unwrap();
    let mut a = create(&repo, "A");
    let b = create(&repo, "B");
    let c = create(&repo, "C");
    a.add_subtype(&b, &repo).unwrap();
    a.add_subtype(&c, &repo).unwrap();

    assert!(a.remove_subtype(b.id()));
    let after_first = a.clone();
    assert!(!a.remove_subtype(b.id()));

    assert_eq!(a, after_first);
    assert_eq!(ids(a.subtypes(&repo).unwrap()), vec![c.id()]);
}

#[test]
fn cached_subtypes_follow_mutations() {
    let conn = setup();
    let repo = SqliteEventTypeRepository::try_new(&conn).unwrap();
    let mut a = create(&repo, "A");
    let b = create(&repo, "B");
    let c = create(&repo, "C");

    assert!(a.subtypes(&repo).unwrap().is_empty());
    a.add_subtype(&b, &repo).unwrap();
    assert_eq!(ids(a.subtypes(&repo).unwrap()), vec![b.id()]);

    a.set_subtype_ids(vec![c.id()], &repo).unwrap();
    assert_eq!(ids(a.subtypes(&repo).unwrap()), vec![c.id()]);
}

#[test]
fn csv_setter_round_trips_and_clears() {
    let conn = setup();
    let repo = SqliteEventTypeRepository::try_new(&conn).unwrap();
    let created: Vec<EventType> = (1..=6).map(|n| create(&repo, &format!("T{n}"))).collect();
    assert_eq!(ids(&created), vec![1, 2, 3, 4, 5, 6]);
    let mut parent = created[5].clone();

    parent.set_subtypes_csv("1,2,4,5", &repo).unwrap();
    assert_eq!(parent.subtype_ids(), &[1, 2, 4, 5]);
    assert_eq!(parent.subtype_ids_csv(), "1,2,4,5");

    parent.set_subtypes_csv("", &repo).unwrap();
    assert!(parent.subtype_ids().is_empty());
}

#[test]
fn csv_setter_rejects_repeats_and_garbage() {
    let conn = setup();
    let repo = SqliteEventTypeRepository::try_new(&conn).unwrap();
    let _one = create(&repo, "one");
    let _two = create(&repo, "two");
    let mut parent = create(&repo, "parent");

    let err = parent.set_subtypes_csv("1,1,2", &repo).unwrap_err();
    assert!(matches!(
        err,
        RelationError::IdList(IdListError::DuplicateIds(1))
    ));

    let err = parent.set_subtypes_csv("1,two", &repo).unwrap_err();
    assert!(matches!(err, RelationError::IdList(IdListError::Parse(token)) if token == "two"));
    assert!(parent.subtype_ids().is_empty());
}

#[test]
fn bulk_setter_checks_new_ids_against_stored_graph() {
    let conn = setup();
    let repo = SqliteEventTypeRepository::try_new(&conn).unwrap();
    let mut a = create(&repo, "A");
    let mut b = create(&repo, "B");
    a.add_subtype(&b, &repo).unwrap();
    repo.update_event_type(&a).unwrap();

    let err = b.set_subtype_ids(vec![a.id()], &repo).unwrap_err();
    assert!(matches!(err, RelationError::CycleDetected { .. }));

    let err = b.set_subtype_ids(vec![b.id()], &repo).unwrap_err();
    assert!(matches!(err, RelationError::CycleDetected { .. }));

    let err = b.set_subtype_ids(vec![999], &repo).unwrap_err();
    assert!(matches!(
        err,
        RelationError::Unresolved {
            kind: EntityKind::EventType,
            id: 999
        }
    ));
    assert!(b.subtype_ids().is_empty());
}

#[test]
fn bulk_setter_rejects_transitive_back_edge_and_keeps_old_ids() {
    let conn = setup();
    let repo = SqliteEventTypeRepository::try_new(&conn).unwrap();
    let mut a = create(&repo, "A");
    let mut b = create(&repo, "B");
    let mut c = create(&repo, "C");
    let d = create(&repo, "D");
    a.add_subtype(&b, &repo).unwrap();
    repo.update_event_type(&a).unwrap();
    b.add_subtype(&c, &repo).unwrap();
    repo.update_event_type(&b).unwrap();

    c.set_subtype_ids(vec![d.id()], &repo).unwrap();
    let err = c.set_subtype_ids(vec![d.id(), a.id()], &repo).unwrap_err();

    assert!(matches!(
        err,
        RelationError::CycleDetected { parent, subtype } if parent == c.id() && subtype == a.id()
    ));
    assert_eq!(c.subtype_ids(), &[d.id()]);
}

#[test]
fn unrelated_catalogue_types_are_mutually_addable() {
    let conn = setup();
    let repo = SqliteEventTypeRepository::try_new(&conn).unwrap();
    let one = publish(&repo, &create(&repo, "one"));
    let two = publish(&repo, &create(&repo, "two"));

    assert_eq!(ids(&one.addable_event_types(&repo).unwrap()), vec![two.id()]);
    assert_eq!(ids(&two.addable_event_types(&repo).unwrap()), vec![one.id()]);
}

#[test]
fn addable_subtypes_skip_related_drafts_and_deleted() {
    let conn = setup();
    let repo = SqliteEventTypeRepository::try_new(&conn).unwrap();
    let mut a = publish(&repo, &create(&repo, "A"));
    let b = publish(&repo, &create(&repo, "B"));
    let mut c = publish(&repo, &create(&repo, "C"));
    let d = publish(&repo, &create(&repo, "D"));
    let _draft = create(&repo, "draft");
    let gone = publish(&repo, &create(&repo, "gone"));
    repo.soft_delete_event_type(gone.id()).unwrap();

    // a -> c -> d
    c.add_subtype(&d, &repo).unwrap();
    repo.update_event_type(&c).unwrap();
    a.add_subtype(&c, &repo).unwrap();
    repo.update_event_type(&a).unwrap();

    assert_eq!(ids(&a.addable_event_types(&repo).unwrap()), vec![b.id()]);
    assert_eq!(ids(&d.addable_event_types(&repo).unwrap()), vec![b.id()]);
    assert!(!a.excludes_subtype(d.id(), &repo).unwrap());
    assert!(a.excludes_subtype(b.id(), &repo).unwrap());
}

#[test]
fn recursive_ids_walk_shared_subtypes_once() {
    let conn = setup();
    let repo = SqliteEventTypeRepository::try_new(&conn).unwrap();
    let mut top = create(&repo, "top");
    let mut left = create(&repo, "left");
    let mut right = create(&repo, "right");
    let shared = create(&repo, "shared");

    left.add_subtype(&shared, &repo).unwrap();
    repo.update_event_type(&left).unwrap();
    right.add_subtype(&shared, &repo).unwrap();
    repo.update_event_type(&right).unwrap();
    top.add_subtype(&left, &repo).unwrap();
    top.add_subtype(&right, &repo).unwrap();

    assert_eq!(
        top.subtype_ids_recursive(&repo).unwrap(),
        vec![left.id(), shared.id(), right.id()]
    );
}

#[test]
fn dangling_subtype_reference_fails_resolution() {
    let conn = setup();
    let repo = SqliteEventTypeRepository::try_new(&conn).unwrap();
    let a = create(&repo, "A");
    conn.execute(
        "UPDATE event_types SET subtype_ids = '404' WHERE id = ?1;",
        [a.id()],
    )
    .unwrap();

    let mut loaded = repo.get_event_type(a.id()).unwrap().unwrap();
    let err = loaded.subtypes(&repo).unwrap_err();
    assert!(matches!(
        err,
        RelationError::Unresolved {
            kind: EntityKind::EventType,
            id: 404
        }
    ));
}

#[test]
fn malformed_stored_id_list_is_invalid_data() {
    let conn = setup();
    let repo = SqliteEventTypeRepository::try_new(&conn).unwrap();
    let a = create(&repo, "A");
    conn.execute(
        "UPDATE event_types SET subtype_ids = '2,2' WHERE id = ?1;",
        [a.id()],
    )
    .unwrap();

    let err = repo.get_event_type(a.id()).unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
    assert!(repo.list_event_types(&ListQuery::all()).is_err());
}
