
use std::sync::Arc;

use crate::api::mock::{MockApi, MockNotifications};
use crate::cache::TagCache;
use crate::options::Options;
use crate::storage::{FileBackend, Store};

/// Wires up the full data layer against temp storage and a canned API.
pub(crate) struct TestHarness {
    pub _dir: tempfile::TempDir,
    pub api: Arc<MockApi>,
    pub notifier: Arc<MockNotifications>,
    pub options: Arc<Options>,
    pub tag_cache: TagCache,
}

impl TestHarness {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let main_backend = Arc::new(FileBackend::new(dir.path().join("main")).unwrap());
        let cache_backend = Arc::new(FileBackend::new(dir.path().join("cache")).unwrap());

        let store = Store::open(main_backend).unwrap();
        let options = Arc::new(Options::new(store));
        let api = Arc::new(MockApi::new());
        let notifier = Arc::new(MockNotifications::default());

        let tag_cache = TagCache::new(
            cache_backend,
            api.clone(),
            Some(notifier.clone()),
            options.clone(),
        );

        Self {
            _dir: dir,
            api,
            notifier,
            options,
            tag_cache,
        }
    }
}
