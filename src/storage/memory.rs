//! In-process backend, one `InMemory` store per bucket.

use object_store::memory::InMemory;
use object_store::ObjectStore;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub(super) struct MemoryBuckets {
    buckets: Mutex<HashMap<String, Arc<InMemory>>>,
}

impl MemoryBuckets {
    pub(super) fn store_for(&self, bucket: &str) -> Arc<dyn ObjectStore> {
        let mut buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());
        buckets
            .entry(bucket.to_string())
            .or_insert_with(|| Arc::new(InMemory::new()))
            .clone()
    }
}
