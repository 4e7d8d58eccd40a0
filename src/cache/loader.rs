use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::SnapshotError;
use crate::index::{CacheEntry, Index};

use super::metadata::{CacheMetadata, CACHE_VERSION};
use super::schema::{CachedFileData, CachedGlobalData};

/// スナップショット検証結果
pub struct CacheValidation {
    /// 更新時刻が一致したファイル（テーブルを再利用できる）
    pub valid_files: HashSet<PathBuf>,
    /// 変更された、またはスナップショットにないファイル
    pub invalid_files: HashSet<PathBuf>,
}

impl CacheValidation {
    fn is_known(&self, path: &Path) -> bool {
        self.valid_files.contains(path) || self.invalid_files.contains(path)
    }
}

/// スナップショットローダー
pub struct CacheLoader {
    cache_dir: PathBuf,
}

impl CacheLoader {
    pub fn new(workspace_root: &Path) -> Self {
        Self {
            cache_dir: super::cache_dir(workspace_root),
        }
    }

    /// キャッシュディレクトリのパスを取得
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// スナップショットの有効性を検証
    /// files: (path, mtime) のリスト
    pub fn validate(&self, files: &[(PathBuf, u64)]) -> Result<CacheValidation, SnapshotError> {
        let metadata_path = self.cache_dir.join("metadata.json");
        if !metadata_path.exists() {
            return Err(SnapshotError::NotFound);
        }

        let metadata_content = fs::read_to_string(&metadata_path)?;
        let metadata: CacheMetadata = serde_json::from_str(&metadata_content)?;

        // バージョン互換性チェック
        if !metadata.is_compatible() {
            warn!(
                "Snapshot version mismatch: {} (expected {})",
                metadata.version, CACHE_VERSION
            );
            return Err(SnapshotError::VersionMismatch);
        }

        let mut valid_files = HashSet::new();
        let mut invalid_files = HashSet::new();

        for (path, mtime) in files {
            let path_str = path.to_string_lossy().to_string();
            match metadata.files.get(&path_str) {
                Some(cached_meta) if cached_meta.mtime == *mtime => {
                    valid_files.insert(path.clone());
                }
                Some(_) => {
                    debug!("Snapshot invalid for {}: mtime changed", path_str);
                    invalid_files.insert(path.clone());
                }
                None => {
                    debug!("Snapshot miss for {}: not in snapshot", path_str);
                    invalid_files.insert(path.clone());
                }
            }
        }

        Ok(CacheValidation {
            valid_files,
            invalid_files,
        })
    }

    /// スナップショットからインデックスを復元し、復元したファイル数を返す
    pub fn load(&self, index: &Index, validation: &CacheValidation) -> Result<usize, SnapshotError> {
        let data_path = self.cache_dir.join("symbols.bin");
        if !data_path.exists() {
            return Err(SnapshotError::NotFound);
        }

        let data = fs::read(&data_path)?;
        let cached_data: Vec<CachedFileData> = bincode::deserialize(&data)?;

        let mut loaded = 0;
        let mut skipped = 0;
        for entry in cached_data {
            let path = PathBuf::from(&entry.path);
            if !validation.valid_files.contains(&path) {
                skipped += 1;
                continue;
            }
            index.symbols.insert(
                path,
                CacheEntry {
                    table: Arc::new(entry.table),
                    content_hash: entry.content_hash,
                    mtime: entry.mtime,
                },
            );
            loaded += 1;
        }

        self.load_global_data(index, validation)?;

        info!(
            "Loaded {} files from snapshot (skipped {}, valid_files: {})",
            loaded,
            skipped,
            validation.valid_files.len()
        );
        Ok(loaded)
    }

    /// 関連エッジを復元する
    ///
    /// 埋め込みエッジはマークアップが、templateUrl エッジはスクリプトが
    /// 未変更の場合のみ復元する（変更されたファイルは再解析で作り直される）。
    fn load_global_data(
        &self,
        index: &Index,
        validation: &CacheValidation,
    ) -> Result<(), SnapshotError> {
        let global_path = self.cache_dir.join("global.bin");
        if !global_path.exists() {
            debug!("No global snapshot file found");
            return Ok(());
        }

        let data = fs::read(&global_path)?;
        let global_data: CachedGlobalData = bincode::deserialize(&data)?;

        let mut restored = 0;
        for edge in global_data.edges {
            let markup = PathBuf::from(&edge.markup);
            let script = PathBuf::from(&edge.script);
            if !validation.is_known(&markup) || !validation.is_known(&script) {
                continue;
            }

            let mut origin = edge.origin;
            origin.embed &= validation.valid_files.contains(&markup);
            origin.template &= validation.valid_files.contains(&script);
            if origin.embed || origin.template {
                index.associations.restore(&markup, &script, origin);
                restored += 1;
            }
        }

        debug!("Restored {} association edges from snapshot", restored);
        Ok(())
    }
}
