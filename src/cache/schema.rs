use serde::{Deserialize, Serialize};

use crate::index::EdgeOrigin;
use crate::model::{ContentHash, SymbolTable};

/// Cached per-file symbol table
#[derive(Serialize, Deserialize)]
pub struct CachedFileData {
    pub path: String,
    pub content_hash: ContentHash,
    pub mtime: Option<u64>,
    pub table: SymbolTable,
}

/// Cached association edge
#[derive(Serialize, Deserialize)]
pub struct CachedEdge {
    pub markup: String,
    pub script: String,
    pub origin: EdgeOrigin,
}

/// Cached global data (not file-specific)
#[derive(Serialize, Deserialize)]
pub struct CachedGlobalData {
    pub edges: Vec<CachedEdge>,
}
