//! # Realtime Handler
//!
//! Applies one feed message as one batch. The current snapshot is only cloned
//! once an entity actually resolves, every later entity of the batch goes to
//! the same clone, and the result is published once with a single index
//! rebuild. A feed where nothing applies costs no clone and no publish.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::core::snapshot_store::{PendingMutation, SnapshotStore};
use crate::disruptions::DisruptionApplier;
use crate::error::ResolutionError;
use crate::messages::{decode_feed, Entity};

/// Outcome of one feed message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub applied: usize,
    pub skipped: usize,
    /// Version published for this batch, if anything changed.
    pub published_version: Option<u64>,
}

pub struct RealtimeHandler {
    store: Arc<SnapshotStore>,
    applier: Arc<dyn DisruptionApplier>,
}

impl RealtimeHandler {
    pub fn new(store: Arc<SnapshotStore>, applier: Arc<dyn DisruptionApplier>) -> Self {
        Self { store, applier }
    }

    pub fn handle(&self, body: &[u8]) -> BatchReport {
        let entities = match decode_feed(body) {
            Ok(entities) => entities,
            Err(e) => {
                warn!("Dropping malformed realtime feed: {}", e);
                return BatchReport::default();
            }
        };

        let current = self.store.get_current();
        let mut pending: Option<PendingMutation> = None;
        let mut report = BatchReport::default();

        for entity in entities {
            let (graph, meta) = match &pending {
                Some(p) => (&p.pt_data, &p.meta),
                None => (&current.pt_data, &current.meta),
            };

            match entity {
                Entity::Delete(id) => {
                    if graph.disruption(&id).is_none() {
                        debug!("Skipping delete: {}", ResolutionError::UnknownDisruption(id));
                        report.skipped += 1;
                        continue;
                    }
                    debug!("Deleting disruption {}", id);
                    let p = pending.get_or_insert_with(|| self.store.clone_for_mutation());
                    self.applier.apply_delete(&id, &mut p.pt_data, &p.meta);
                    report.applied += 1;
                }
                Entity::Upsert(payload) => {
                    let disruption = match self.applier.resolve(&payload, graph, meta) {
                        Ok(disruption) => disruption,
                        Err(e) => {
                            warn!("Skipping disruption '{}': {}", payload.id, e);
                            report.skipped += 1;
                            continue;
                        }
                    };
                    debug!("Applying disruption {}", disruption.uri);
                    let p = pending.get_or_insert_with(|| self.store.clone_for_mutation());
                    self.applier.apply_upsert(disruption, &mut p.pt_data, &p.meta);
                    report.applied += 1;
                }
                Entity::Unsupported { id, kind } => {
                    warn!("Unsupported realtime entity '{}' ({})", id, kind);
                    report.skipped += 1;
                }
            }
        }

        if let Some(mut p) = pending {
            p.rebuild_index(self.store.index_builder());
            p.touch_realtime(Utc::now());
            let snapshot = self.store.publish(p);
            info!(
                "Realtime batch published as version {} ({} applied, {} skipped)",
                snapshot.version, report.applied, report.skipped
            );
            report.published_version = Some(snapshot.version);
        } else if report.skipped > 0 {
            debug!("Realtime batch had nothing to apply ({} skipped)", report.skipped);
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::snapshot_store::{DataLoader, DataSources, LoadedData};
    use crate::disruptions::ChaosApplier;
    use crate::error::LoadError;
    use crate::model::{Network, PtData};
    use crate::proto::chaos;
    use crate::proto::gtfs_realtime::{FeedEntity, FeedHeader, FeedMessage, OpaqueBody};
    use crate::routing::DefaultIndexBuilder;
    use prost::Message;

    struct OneNetwork;

    impl DataLoader for OneNetwork {
        fn load(&self, _sources: &DataSources) -> Result<LoadedData, LoadError> {
            Ok(LoadedData {
                pt_data: PtData {
                    networks: vec![Network { uri: "N1".into(), name: "Metro".into() }],
                    ..Default::default()
                },
                ..Default::default()
            })
        }
    }

    fn handler() -> (RealtimeHandler, Arc<SnapshotStore>) {
        let store = Arc::new(SnapshotStore::new(Arc::new(OneNetwork), Arc::new(DefaultIndexBuilder)));
        store.reload(&DataSources::default()).unwrap();
        (RealtimeHandler::new(store.clone(), Arc::new(ChaosApplier)), store)
    }

    fn upsert(id: &str, network: &str) -> FeedEntity {
        FeedEntity {
            id: id.into(),
            disruption: Some(chaos::Disruption {
                id: id.into(),
                impacts: vec![chaos::Impact {
                    id: format!("{id}-I1"),
                    informed_entities: vec![chaos::PtObject {
                        uri: network.into(),
                        pt_object_type: chaos::PtObjectType::Network as i32,
                    }],
                    ..Default::default()
                }],
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn delete(id: &str) -> FeedEntity {
        FeedEntity {
            id: id.into(),
            is_deleted: Some(true),
            ..Default::default()
        }
    }

    fn feed(entity: Vec<FeedEntity>) -> Vec<u8> {
        let header = FeedHeader {
            gtfs_realtime_version: "2.0".into(),
            ..Default::default()
        };
        FeedMessage { header: Some(header), entity }.encode_to_vec()
    }

    #[test]
    fn upsert_then_delete() {
        let (handler, store) = handler();

        let report = handler.handle(&feed(vec![upsert("D1", "N1")]));
        assert_eq!(report.published_version, Some(2));
        let snap = store.get_current();
        assert!(snap.pt_data.disruption("D1").is_some());
        assert!(snap.last_rt_update.is_some());

        handler.handle(&feed(vec![delete("D1")]));
        assert!(store.get_current().pt_data.disruption("D1").is_none());
    }

    #[test]
    fn all_skipped_feed_publishes_nothing() {
        let (handler, store) = handler();
        let before = store.get_current();

        let trip = FeedEntity {
            id: "T1".into(),
            trip_update: Some(OpaqueBody {}),
            ..Default::default()
        };
        let report = handler.handle(&feed(vec![delete("D404"), upsert("D2", "N404"), trip]));

        assert_eq!(report, BatchReport { applied: 0, skipped: 3, published_version: None });
        assert!(Arc::ptr_eq(&before, &store.get_current()));
        assert!(handler.handle(&feed(vec![])).published_version.is_none());
    }

    #[test]
    fn malformed_feed_is_dropped() {
        let (handler, store) = handler();
        assert_eq!(handler.handle(&[0xff, 0xff]), BatchReport::default());

        let headerless = FeedMessage { header: None, entity: vec![upsert("D1", "N1")] };
        assert_eq!(handler.handle(&headerless.encode_to_vec()), BatchReport::default());
        assert_eq!(store.get_current().version, 1);
    }

    #[test]
    fn later_entities_see_earlier_ones() {
        let (handler, store) = handler();
        let report = handler.handle(&feed(vec![upsert("D1", "N1"), delete("D1"), upsert("D2", "N1")]));

        assert_eq!(report.applied, 3);
        assert_eq!(report.published_version, Some(2));
        let snap = store.get_current();
        assert!(snap.pt_data.disruption("D1").is_none());
        assert!(snap.pt_data.disruption("D2").is_some());
    }
}
