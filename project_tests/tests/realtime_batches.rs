use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use lib_transit::ChaosApplier;
use lib_transit::handlers::{BatchReport, RealtimeHandler};
use lib_transit::proto::chaos::PtObjectType;
use lib_transit::proto::gtfs_realtime::{FeedEntity, OpaqueBody};
use project_tests::*;

#[test]
fn nothing_applicable_means_no_publish() {
    let database = write_json(&small_dataset());
    let (store, builder) = counting_store();
    store.reload(&sources(&database)).unwrap();
    let realtime = RealtimeHandler::new(Arc::clone(&store), Arc::new(ChaosApplier));
    let before = store.get_current();
    let builds = builder.calls();

    assert_eq!(realtime.handle(&feed_body(vec![])), BatchReport::default());

    let vehicle = FeedEntity {
        id: "V1".into(),
        vehicle: Some(OpaqueBody {}),
        ..Default::default()
    };
    let report = realtime.handle(&feed_body(vec![
        delete("unknown"),
        upsert(no_service("D9", PtObjectType::Line, "line:missing")),
        vehicle,
    ]));
    assert_eq!(report.skipped, 3);
    assert_eq!(report.published_version, None);

    let after = store.get_current();
    assert!(Arc::ptr_eq(&before, &after));
    assert!(after.last_rt_update.is_none());
    assert_eq!(builder.calls(), builds);
}

#[test]
fn one_message_is_one_publish() {
    let database = write_json(&small_dataset());
    let (store, builder) = counting_store();
    store.reload(&sources(&database)).unwrap();
    let realtime = RealtimeHandler::new(Arc::clone(&store), Arc::new(ChaosApplier));

    realtime.handle(&feed_body(vec![upsert(no_service("D1", PtObjectType::Line, "line:L1"))]));
    let version = store.get_current().version;
    let builds = builder.calls();

    let report = realtime.handle(&feed_body(vec![
        delete("D1"),
        upsert(no_service("D2", PtObjectType::Route, "route:R1")),
    ]));

    assert_eq!(report.applied, 2);
    assert_eq!(report.published_version, Some(version + 1));
    assert_eq!(builder.calls(), builds + 1);

    let snapshot = store.get_current();
    assert_eq!(snapshot.version, version + 1);
    assert!(snapshot.pt_data.disruption("D1").is_none());
    assert!(snapshot.pt_data.disruption("D2").is_some());
}

#[test]
fn malformed_feed_changes_nothing() {
    let database = write_json(&small_dataset());
    let store = file_store();
    store.reload(&sources(&database)).unwrap();
    let realtime = RealtimeHandler::new(Arc::clone(&store), Arc::new(ChaosApplier));

    assert_eq!(realtime.handle(b"\x0a\xff\xff\xff"), BatchReport::default());
    assert_eq!(store.get_current().version, 1);
}

#[test]
fn readers_only_see_whole_snapshots() {
    let database = write_json(&small_dataset());
    let store = file_store();
    store.reload(&sources(&database)).unwrap();
    let realtime = RealtimeHandler::new(Arc::clone(&store), Arc::new(ChaosApplier));
    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut last_version = 0;
                let mut reads = 0usize;
                loop {
                    let finished = done.load(Ordering::SeqCst);
                    let snapshot = store.get_current();
                    assert!(snapshot.version >= last_version);
                    // Index and graph of one snapshot always agree.
                    assert_eq!(snapshot.routing.disruption_count, snapshot.pt_data.disruptions.len());
                    assert_eq!(
                        snapshot.routing.is_route_suspended("route:R1"),
                        snapshot.pt_data.disruption("D1").is_some()
                    );
                    last_version = snapshot.version;
                    reads += 1;
                    if finished {
                        break;
                    }
                }
                reads
            })
        })
        .collect();

    for _ in 0..200 {
        realtime.handle(&feed_body(vec![upsert(no_service("D1", PtObjectType::Line, "line:L1"))]));
        realtime.handle(&feed_body(vec![delete("D1")]));
    }
    done.store(true, Ordering::SeqCst);

    for reader in readers {
        assert!(reader.join().unwrap() > 0);
    }
    assert_eq!(store.get_current().version, 401);
}
