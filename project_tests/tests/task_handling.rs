use std::sync::Arc;

use lib_transit::core::DataSources;
use lib_transit::error::LoadError;
use lib_transit::handlers::TaskHandler;
use lib_transit::proto::Action;
use project_tests::*;
use serde_json::json;

#[test]
fn malformed_and_unknown_tasks_are_dropped() {
    let database = write_json(&small_dataset());
    let store = file_store();
    store.reload(&sources(&database)).unwrap();
    let before = store.get_current();
    let tasks = TaskHandler::new(Arc::clone(&store), sources(&database));

    tasks.handle(b"\xff\xff\xff");
    tasks.handle(&task_body(None));
    tasks.handle(&task_body(Some(Action::LoadRealtime)));

    assert!(Arc::ptr_eq(&before, &store.get_current()));

    // The handler is still usable afterwards.
    tasks.handle(&reload_body());
    assert_eq!(store.get_current().version, 2);
}

#[test]
fn failed_reload_keeps_serving_previous_snapshot() {
    let database = write_json(&small_dataset());
    let store = file_store();
    store.reload(&sources(&database)).unwrap();
    let before = store.get_current();

    let missing = DataSources {
        database_path: "/nonexistent/data.nav.json".into(),
        ..Default::default()
    };
    assert!(matches!(store.reload(&missing), Err(LoadError::Io { .. })));
    TaskHandler::new(Arc::clone(&store), missing).handle(&reload_body());

    let mut broken = small_dataset();
    broken["routes"][0]["stop_point_uris"] = json!(["stop_point:SP1", "stop_point:SP9"]);
    let broken = write_json(&broken);
    assert!(matches!(store.reload(&sources(&broken)), Err(LoadError::Invalid { .. })));

    assert!(Arc::ptr_eq(&before, &store.get_current()));
}

#[test]
fn reload_discards_realtime_changes() {
    use lib_transit::ChaosApplier;
    use lib_transit::handlers::RealtimeHandler;
    use lib_transit::proto::chaos::PtObjectType;

    let database = write_json(&small_dataset());
    let store = file_store();
    store.reload(&sources(&database)).unwrap();
    RealtimeHandler::new(Arc::clone(&store), Arc::new(ChaosApplier))
        .handle(&feed_body(vec![upsert(no_service("D1", PtObjectType::Network, "network:N1"))]));
    assert!(store.get_current().last_rt_update.is_some());

    TaskHandler::new(Arc::clone(&store), sources(&database)).handle(&reload_body());
    let reloaded = store.get_current();
    assert!(reloaded.pt_data.disruptions.is_empty());
    assert!(reloaded.last_rt_update.is_none());
}
