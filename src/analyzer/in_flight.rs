use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashSet;

/// 解析中ファイルの集合
///
/// 同じパスの二重解析を防ぐ。登録済みのパスに対する `try_begin` は待たずに
/// `None` を返し、先行する解析の結果が優先される。
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    paths: Arc<DashSet<PathBuf>>,
}

/// ドロップ時に解析中フラグを外す
#[derive(Debug)]
pub struct InFlightGuard {
    paths: Arc<DashSet<PathBuf>>,
    path: PathBuf,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_begin(&self, path: &Path) -> Option<InFlightGuard> {
        if !self.paths.insert(path.to_path_buf()) {
            return None;
        }
        Some(InFlightGuard {
            paths: Arc::clone(&self.paths),
            path: path.to_path_buf(),
        })
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.paths.remove(&self.path);
    }
}
