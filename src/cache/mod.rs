pub mod loader;
pub mod metadata;
pub mod schema;
pub mod ttl;
pub mod writer;

pub use loader::{CacheLoader, CacheValidation};
pub use metadata::FileMetadata;
pub use ttl::TtlCache;
pub use writer::CacheWriter;

use std::path::{Path, PathBuf};

/// スナップショットの保存先（ワークスペース直下）
pub fn cache_dir(workspace_root: &Path) -> PathBuf {
    workspace_root.join(".angularjs-xref/cache/v1")
}
