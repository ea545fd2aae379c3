//! Directory-backed object store.
//!
//! Layout: `{root}/{bucket}/{key}`. Used for offline runs and tests.

use super::{read_local, ObjectStore, ObjectUri, StoreError};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where an object lands on disk.
    pub fn object_path(&self, uri: &ObjectUri) -> PathBuf {
        uri.key
            .split('/')
            .fold(self.root.join(&uri.bucket), |path, segment| path.join(segment))
    }
}

impl ObjectStore for LocalStore {
    fn name(&self) -> &str {
        "local"
    }

    fn put(&self, local: &Path, uri: &ObjectUri) -> Result<(), StoreError> {
        let bytes = read_local(local)?;
        let dest = self.object_path(uri);
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| StoreError::Io { path, source }
        };

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(io_err(parent))?;
        }

        // Atomic replace: write to .tmp then rename.
        let tmp = dest.with_extension("tmp");
        fs::write(&tmp, &bytes).map_err(io_err(&tmp))?;
        fs::rename(&tmp, &dest).map_err(|source| {
            let _ = fs::remove_file(&tmp);
            StoreError::Io {
                path: dest.clone(),
                source,
            }
        })?;

        debug!(%uri, dest = %dest.display(), bytes = bytes.len(), "stored object locally");
        Ok(())
    }
}
