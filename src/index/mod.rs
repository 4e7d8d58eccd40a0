mod association;
mod symbol_cache;

pub use association::{AssociationGraph, EdgeOrigin};
pub use symbol_cache::{CacheEntry, SymbolCache};

use crate::config::AjsConfig;

/// 解析結果の共有状態（シンボルキャッシュ + 関連グラフ）
pub struct Index {
    pub symbols: SymbolCache,
    pub associations: AssociationGraph,
}

impl Index {
    pub fn new(config: &AjsConfig) -> Self {
        Self {
            symbols: SymbolCache::new(config.symbol_cache.capacity, config.symbol_cache.ttl()),
            associations: AssociationGraph::new(),
        }
    }

    pub fn clear(&self) {
        self.symbols.clear();
        self.associations.clear();
    }
}
