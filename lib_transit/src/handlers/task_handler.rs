//! Control commands from the task queue.

use std::sync::Arc;

use tracing::{error, info, trace, warn};

use crate::core::snapshot_store::{DataSources, SnapshotStore};
use crate::messages::Task;

pub struct TaskHandler {
    store: Arc<SnapshotStore>,
    sources: DataSources,
}

impl TaskHandler {
    pub fn new(store: Arc<SnapshotStore>, sources: DataSources) -> Self {
        Self { store, sources }
    }

    pub fn handle(&self, body: &[u8]) {
        let task = match Task::decode(body) {
            Ok(task) => task,
            Err(e) => {
                warn!("Dropping malformed task: {}", e);
                return;
            }
        };

        match task {
            Task::Reload => {
                info!("Task: reload");
                if let Err(e) = self.store.reload(&self.sources) {
                    error!("Reload task failed: {}", e);
                }
            }
            Task::Unknown(code) => trace!("Task ignored (action {})", code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::snapshot_store::{DataLoader, LoadedData};
    use crate::error::LoadError;
    use crate::proto::{Action, TaskMessage};
    use crate::routing::DefaultIndexBuilder;
    use prost::Message;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingLoader {
        calls: AtomicUsize,
    }

    impl DataLoader for CountingLoader {
        fn load(&self, _sources: &DataSources) -> Result<LoadedData, LoadError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(LoadedData::default())
        }
    }

    fn handler() -> (TaskHandler, Arc<SnapshotStore>, Arc<CountingLoader>) {
        let loader = Arc::new(CountingLoader::default());
        let store = Arc::new(SnapshotStore::new(loader.clone(), Arc::new(DefaultIndexBuilder)));
        (TaskHandler::new(store.clone(), DataSources::default()), store, loader)
    }

    fn body(action: Option<i32>) -> Vec<u8> {
        TaskMessage { action, load_realtime: None }.encode_to_vec()
    }

    #[test]
    fn reload_publishes_new_version() {
        let (handler, store, loader) = handler();
        handler.handle(&body(Some(Action::Reload as i32)));
        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.get_current().version, 1);
    }

    #[test]
    fn malformed_and_unknown_tasks_change_nothing() {
        let (handler, store, loader) = handler();
        handler.handle(&[0xff, 0x01]);
        handler.handle(&body(None));
        handler.handle(&body(Some(Action::LoadRealtime as i32)));
        assert_eq!(loader.calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.get_current().version, 0);
    }
}
