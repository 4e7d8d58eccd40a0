use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::SnapshotError;
use crate::index::Index;

use super::metadata::{CacheMetadata, FileMetadata};
use super::schema::{CachedEdge, CachedFileData, CachedGlobalData};

/// Snapshot writer
pub struct CacheWriter {
    cache_dir: PathBuf,
}

impl CacheWriter {
    pub fn new(workspace_root: &Path) -> Self {
        Self {
            cache_dir: super::cache_dir(workspace_root),
        }
    }

    fn ensure_cache_dir(&self) -> std::io::Result<()> {
        if !self.cache_dir.exists() {
            fs::create_dir_all(&self.cache_dir)?;
        }
        Ok(())
    }

    /// Save the entire index to the snapshot directory
    pub fn save_full(&self, index: &Index) -> Result<(), SnapshotError> {
        self.ensure_cache_dir()?;

        let mut metadata = CacheMetadata::new();
        let mut cached_data = Vec::new();

        for (path, entry) in index.symbols.entries() {
            let path_str = path.to_string_lossy().to_string();
            if let Some(mtime) = entry.mtime {
                metadata
                    .files
                    .insert(path_str.clone(), FileMetadata { mtime });
            }
            cached_data.push(CachedFileData {
                path: path_str,
                content_hash: entry.content_hash,
                mtime: entry.mtime,
                table: (*entry.table).clone(),
            });
        }

        let metadata_path = self.cache_dir.join("metadata.json");
        let metadata_json = serde_json::to_string_pretty(&metadata)?;
        fs::write(&metadata_path, metadata_json)?;

        let data = bincode::serialize(&cached_data)?;
        let data_path = self.cache_dir.join("symbols.bin");
        fs::write(&data_path, &data)?;

        self.save_global_data(index)?;

        info!(
            "Saved snapshot: {} files, {} bytes",
            cached_data.len(),
            data.len()
        );

        Ok(())
    }

    fn save_global_data(&self, index: &Index) -> Result<(), SnapshotError> {
        let global_data = CachedGlobalData {
            edges: index
                .associations
                .export()
                .into_iter()
                .map(|(markup, script, origin)| CachedEdge {
                    markup: markup.to_string_lossy().to_string(),
                    script: script.to_string_lossy().to_string(),
                    origin,
                })
                .collect(),
        };

        let data = bincode::serialize(&global_data)?;
        let global_path = self.cache_dir.join("global.bin");
        fs::write(&global_path, data)?;

        debug!("Saved global snapshot: {} edges", global_data.edges.len());

        Ok(())
    }
}
