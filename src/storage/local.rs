//! Local filesystem backend.

use object_store::local::LocalFileSystem;
use object_store::ObjectStore;
use std::path::Path;
use std::sync::Arc;

pub(super) fn store_for(root: &Path, bucket: &str) -> object_store::Result<Arc<dyn ObjectStore>> {
    let dir = root.join(bucket);
    std::fs::create_dir_all(&dir).map_err(|e| object_store::Error::Generic {
        store: "LocalFileSystem",
        source: Box::new(e),
    })?;
    Ok(Arc::new(LocalFileSystem::new_with_prefix(dir)?))
}
