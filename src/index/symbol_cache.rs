use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::cache::TtlCache;
use crate::model::{ContentHash, SymbolTable};

/// Symbol Cache の1エントリ（挿入時刻・最終アクセスは TtlCache 側で管理）
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub table: Arc<SymbolTable>,
    pub content_hash: ContentHash,
    /// 解析時点の更新時刻（UNIXエポックからのミリ秒）
    pub mtime: Option<u64>,
}

/// ファイルごとのシンボルテーブル置き場
///
/// 書き込みは常にエントリ単位の置き換えで、テーブルを部分更新しない。
pub struct SymbolCache {
    entries: TtlCache<PathBuf, CacheEntry>,
}

impl SymbolCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: TtlCache::new(capacity, ttl),
        }
    }

    pub fn get(&self, path: &Path) -> Option<CacheEntry> {
        self.entries.get(&path.to_path_buf())
    }

    /// 内容ハッシュが一致する場合のみテーブルを返す
    pub fn get_fresh(&self, path: &Path, hash: &ContentHash) -> Option<Arc<SymbolTable>> {
        self.get(path)
            .filter(|entry| &entry.content_hash == hash)
            .map(|entry| entry.table)
    }

    pub fn insert(&self, path: PathBuf, entry: CacheEntry) {
        self.entries.insert(path, entry);
    }

    pub fn remove(&self, path: &Path) -> Option<CacheEntry> {
        self.entries.remove(&path.to_path_buf())
    }

    /// パス順に並べた全エントリ
    pub fn entries(&self) -> Vec<(PathBuf, CacheEntry)> {
        let mut entries = self.entries.entries();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Symbol, SymbolKind};

    fn entry(text: &str) -> CacheEntry {
        let mut table = SymbolTable::new("/app/app.js");
        table.insert(Symbol::definition("mainCtrl", 16, SymbolKind::Controller));
        CacheEntry {
            table: Arc::new(table),
            content_hash: ContentHash::of(text),
            mtime: None,
        }
    }

    #[test]
    fn test_get_fresh_rejects_stale_hash() {
        let cache = SymbolCache::new(16, Duration::from_secs(60));
        let path = PathBuf::from("/app/app.js");
        cache.insert(path.clone(), entry("v1"));

        assert!(cache.get_fresh(&path, &ContentHash::of("v1")).is_some());
        assert!(cache.get_fresh(&path, &ContentHash::of("v2")).is_none());
        assert!(cache.get(&path).is_some());
    }

    #[test]
    fn test_entries_sorted_by_path() {
        let cache = SymbolCache::new(16, Duration::from_secs(60));
        cache.insert(PathBuf::from("/b.js"), entry("b"));
        cache.insert(PathBuf::from("/a.js"), entry("a"));
        let paths: Vec<_> = cache.entries().into_iter().map(|(p, _)| p).collect();
        assert_eq!(paths, vec![PathBuf::from("/a.js"), PathBuf::from("/b.js")]);
    }
}
