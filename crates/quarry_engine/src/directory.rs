//! Index storage directories.

use crate::error::EngineResult;
use crate::schema::EngineSchema;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tantivy::directory::MmapDirectory;

/// An opened on-disk index directory.
///
/// Opening is idempotent: an existing index is reopened, an empty
/// directory is initialized with the fixed schema.
pub struct EngineDirectory {
    path: PathBuf,
    index: tantivy::Index,
    schema: Arc<EngineSchema>,
}

impl EngineDirectory {
    /// Opens or creates the index stored at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created, or if it holds
    /// an index with an incompatible schema.
    pub fn open(path: &Path) -> EngineResult<Self> {
        fs::create_dir_all(path)?;
        let schema = Arc::new(EngineSchema::build());
        let directory = MmapDirectory::open(path)?;
        let index = tantivy::Index::open_or_create(directory, schema.schema().clone())?;
        tracing::debug!(path = %path.display(), "opened engine directory");
        Ok(Self {
            path: path.to_path_buf(),
            index,
            schema,
        })
    }

    /// Returns the directory path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lists the files in the directory with their sizes in bytes.
    pub fn list_files(&self) -> EngineResult<Vec<(PathBuf, u64)>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            let entry = entry?;
            let metadata = entry.metadata()?;
            if metadata.is_file() {
                files.push((entry.path(), metadata.len()));
            }
        }
        files.sort();
        Ok(files)
    }

    /// Returns the total size of the directory's files.
    pub fn size_in_bytes(&self) -> EngineResult<u64> {
        Ok(self.list_files()?.iter().map(|(_, len)| len).sum())
    }

    /// Returns the number of committed segments.
    pub fn segment_count(&self) -> EngineResult<usize> {
        Ok(self.index.searchable_segment_ids()?.len())
    }

    pub(crate) fn index(&self) -> &tantivy::Index {
        &self.index
    }

    pub(crate) fn schema(&self) -> &Arc<EngineSchema> {
        &self.schema
    }
}

impl std::fmt::Debug for EngineDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineDirectory")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn open_creates_and_reopens() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("idx");

        {
            let directory = EngineDirectory::open(&path).unwrap();
            assert_eq!(directory.segment_count().unwrap(), 0);
            assert!(directory.size_in_bytes().unwrap() > 0);
        }

        let reopened = EngineDirectory::open(&path).unwrap();
        assert_eq!(reopened.path(), path.as_path());
        assert!(reopened
            .list_files()
            .unwrap()
            .iter()
            .any(|(p, _)| p.ends_with("meta.json")));
    }
}
