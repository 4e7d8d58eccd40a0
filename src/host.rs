use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use globset::GlobSet;

use crate::config::PathMatcher;

/// インデクサが利用する外部環境（ファイル読み込み・列挙）
///
/// 呼び出しはブロッキングで、インデクサからは `spawn_blocking` 経由で使われる。
pub trait Host: Send + Sync {
    fn read_text(&self, path: &Path) -> io::Result<String>;

    /// 更新時刻（UNIXエポックからのミリ秒）
    fn stat_mtime(&self, path: &Path) -> Option<u64>;

    fn exists(&self, path: &Path) -> bool;

    /// `pattern` に一致し、`matcher` で除外されないファイルを列挙する
    fn find_files(&self, pattern: &GlobSet, matcher: &PathMatcher) -> Vec<PathBuf>;
}

pub fn to_millis(time: SystemTime) -> Option<u64> {
    time.duration_since(UNIX_EPOCH)
        .ok()
        .map(|d| d.as_millis() as u64)
}

/// 実ファイルシステム + エディタで開いているバッファのオーバーレイ
pub struct FsHost {
    root: PathBuf,
    overlay: DashMap<PathBuf, String>,
}

impl FsHost {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            overlay: DashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// エディタのバッファ内容でディスク上の内容を上書きする
    pub fn open_document(&self, path: PathBuf, text: String) {
        self.overlay.insert(path, text);
    }

    pub fn close_document(&self, path: &Path) {
        self.overlay.remove(path);
    }
}

impl Host for FsHost {
    fn read_text(&self, path: &Path) -> io::Result<String> {
        if let Some(text) = self.overlay.get(path) {
            return Ok(text.clone());
        }
        fs::read_to_string(path)
    }

    fn stat_mtime(&self, path: &Path) -> Option<u64> {
        fs::metadata(path)
            .and_then(|meta| meta.modified())
            .ok()
            .and_then(to_millis)
    }

    fn exists(&self, path: &Path) -> bool {
        self.overlay.contains_key(path) || path.is_file()
    }

    fn find_files(&self, pattern: &GlobSet, matcher: &PathMatcher) -> Vec<PathBuf> {
        let mut files = Vec::new();
        collect_files(&self.root, &self.root, pattern, matcher, &mut files);
        files.sort();
        files
    }
}

/// Collect files matching `pattern` from workspace directory
fn collect_files(
    dir: &Path,
    root: &Path,
    pattern: &GlobSet,
    matcher: &PathMatcher,
    files: &mut Vec<PathBuf>,
) {
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            let relative_path = path.strip_prefix(root).unwrap_or(&path);

            if path.is_dir() {
                if !matcher.should_traverse_dir(relative_path) {
                    continue;
                }
                collect_files(&path, root, pattern, matcher, files);
            } else if pattern.is_match(relative_path) && matcher.should_include(relative_path) {
                files.push(path);
            }
        }
    }
}
