use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// 1ファイル分の解析エラー（バッチ全体は止めない）
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Parse of {path} exceeded {budget_ms}ms")]
    Timeout { path: PathBuf, budget_ms: u64 },

    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// 起動時に致命的となる設定エラー
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid glob pattern '{pattern}': {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// スナップショット（永続キャッシュ）操作エラー
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Deserialization error: {0}")]
    Deserialize(String),

    #[error("Snapshot version mismatch")]
    VersionMismatch,

    #[error("Snapshot not found")]
    NotFound,
}

impl From<bincode::Error> for SnapshotError {
    fn from(e: bincode::Error) -> Self {
        SnapshotError::Deserialize(e.to_string())
    }
}

impl From<serde_json::Error> for SnapshotError {
    fn from(e: serde_json::Error) -> Self {
        SnapshotError::Deserialize(e.to_string())
    }
}
