mod common;

use common::{seed_instance, seed_topology, RecordingStore, Write};
use exampleservice_core::db::open_db_in_memory;
use exampleservice_core::{
    ChangeEvent, ChangeKind, EventError, ExampleEventStep, ResourceStore, SaveOptions,
    ServiceInstance, SqliteResourceStore, EVENT_TOPIC,
};

fn payload(name: &str, message: &str) -> String {
    serde_json::json!({ "service_instance": name, "tenant_message": message }).to_string()
}

#[test]
fn event_updates_message_with_forced_timestamp_bump() {
    let conn = open_db_in_memory().unwrap();
    let (store, changes) = SqliteResourceStore::with_change_feed(&conn);
    let topology = seed_topology(&store);
    let instance = seed_instance(&store, &topology, "tenant-a", "world");
    let instance_id = instance.id.unwrap();
    assert_eq!(
        changes.try_recv().unwrap(),
        ChangeEvent {
            kind: ChangeKind::Created,
            instance_id,
        }
    );

    let step = ExampleEventStep::new(store.clone());
    assert_eq!(step.topic(), EVENT_TOPIC);
    let updated = step.process_event(&payload("tenant-a", "bonjour")).unwrap();

    assert_eq!(updated, 1);
    let stored = store.get_service_instance(instance_id, false).unwrap().unwrap();
    assert_eq!(stored.tenant_message, "bonjour");
    assert!(stored.updated_at > instance.updated_at);
    assert_eq!(
        changes.try_recv().unwrap(),
        ChangeEvent {
            kind: ChangeKind::Updated,
            instance_id,
        }
    );
}

#[test]
fn event_never_invokes_the_policy() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteResourceStore::new(&conn);
    let topology = seed_topology(&store);
    let instance = seed_instance(&store, &topology, "tenant-a", "world");

    let (recording, log) = RecordingStore::new(store.clone());
    ExampleEventStep::new(recording)
        .process_event(&payload("tenant-a", "bonjour"))
        .unwrap();

    assert_eq!(
        *log.borrow(),
        vec![Write::SaveServiceInstance {
            id: instance.id.unwrap(),
            options: SaveOptions {
                always_update_timestamp: true,
                update_fields: Some(vec![ServiceInstance::FIELD_TENANT_MESSAGE]),
            },
        }]
    );
    let stored = store
        .get_service_instance(instance.id.unwrap(), false)
        .unwrap()
        .unwrap();
    assert_eq!(stored.compute_instance_id, None);
}

#[test]
fn every_instance_sharing_the_name_is_updated() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteResourceStore::new(&conn);
    let topology = seed_topology(&store);
    let first = seed_instance(&store, &topology, "shared", "one");
    let second = seed_instance(&store, &topology, "shared", "two");
    seed_instance(&store, &topology, "other", "three");

    let updated = ExampleEventStep::new(store.clone())
        .process_event(&payload("shared", "same"))
        .unwrap();

    assert_eq!(updated, 2);
    for id in [first.id.unwrap(), second.id.unwrap()] {
        let stored = store.get_service_instance(id, false).unwrap().unwrap();
        assert_eq!(stored.tenant_message, "same");
    }
    let other = store.find_service_instances("other").unwrap();
    assert_eq!(other[0].tenant_message, "three");
}

#[test]
fn unknown_instance_name_is_reported() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteResourceStore::new(&conn);
    seed_topology(&store);

    let (recording, log) = RecordingStore::new(store);
    let err = ExampleEventStep::new(recording)
        .process_event(&payload("missing", "hello"))
        .unwrap_err();

    match err {
        EventError::NotFound(name) => assert_eq!(name, "missing"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(log.borrow().is_empty());
}

#[test]
fn tombstoned_instances_are_not_matched() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteResourceStore::new(&conn);
    let topology = seed_topology(&store);
    let instance = seed_instance(&store, &topology, "tenant-a", "world");
    store
        .mark_service_instance_deleted(instance.id.unwrap())
        .unwrap();

    let err = ExampleEventStep::new(store)
        .process_event(&payload("tenant-a", "hello"))
        .unwrap_err();
    assert!(matches!(err, EventError::NotFound(_)));
}

#[test]
fn malformed_payloads_are_rejected() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteResourceStore::new(&conn);
    let step = ExampleEventStep::new(store);

    for raw in [
        "not json",
        r#"{"service_instance": "tenant-a"}"#,
        r#"{"service_instance": 7, "tenant_message": "x"}"#,
    ] {
        let err = step.process_event(raw).unwrap_err();
        assert!(matches!(err, EventError::Malformed(_)), "accepted `{raw}`");
    }
}
