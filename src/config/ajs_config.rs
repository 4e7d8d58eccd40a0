use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use super::path_matcher::PathMatcher;
use crate::error::ConfigError;

pub const CONFIG_FILE_NAME: &str = "ajsconfig.json";

/// ajsconfig.json の設定
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AjsConfig {
    #[serde(default)]
    pub interpolate: InterpolateConfig,
    /// 解析対象のglobパターン（空の場合は全ファイル対象）
    #[serde(default)]
    pub include: Vec<String>,
    /// 除外対象のglobパターン
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
    /// インデックスのスナップショット保存を有効にする（デフォルト: false）
    #[serde(default)]
    pub cache: bool,
    #[serde(default)]
    pub parse: ParseConfig,
    #[serde(default = "default_symbol_cache")]
    pub symbol_cache: CacheConfig,
    #[serde(default = "default_path_cache")]
    pub path_cache: CacheConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub conventions: ConventionsConfig,
    /// 関連ファイルで定義が見つからない場合にワークスペース全体を検索する
    #[serde(default = "default_true")]
    pub workspace_fallback: bool,
}

/// interpolate記号の設定
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterpolateConfig {
    #[serde(default = "default_start_symbol")]
    pub start_symbol: String,
    #[serde(default = "default_end_symbol")]
    pub end_symbol: String,
}

/// 並列解析の設定
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseConfig {
    /// 1バッチで同時に解析するファイル数
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    /// 1ファイルあたりの解析時間上限（ミリ秒）
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheConfig {
    pub capacity: usize,
    pub ttl_secs: u64,
}

/// `<script src>` / templateUrl のパス解決設定
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathsConfig {
    /// プレフィックス置換（例: `"@/": "src/"`）
    #[serde(default)]
    pub aliases: HashMap<String, String>,
    /// 解決しないソース（CDN等）のglobパターン
    #[serde(default = "default_path_ignore")]
    pub ignore: Vec<String>,
}

/// 命名規約の設定
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConventionsConfig {
    #[serde(default = "default_shared_state_roots")]
    pub shared_state_roots: Vec<String>,
    #[serde(default = "default_view_model_aliases")]
    pub view_model_aliases: Vec<String>,
    #[serde(default = "default_directive_prefixes")]
    pub directive_prefixes: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_exclude() -> Vec<String> {
    vec![
        "**/node_modules".to_string(),
        "**/node_modules/**".to_string(),
        "**/dist".to_string(),
        "**/dist/**".to_string(),
        "**/build".to_string(),
        "**/build/**".to_string(),
        "**/.*".to_string(),
        "**/.*/**".to_string(),
    ]
}

fn default_start_symbol() -> String {
    "{{".to_string()
}

fn default_end_symbol() -> String {
    "}}".to_string()
}

fn default_max_concurrent() -> usize {
    8
}

fn default_timeout_ms() -> u64 {
    2000
}

fn default_symbol_cache() -> CacheConfig {
    CacheConfig {
        capacity: 5000,
        ttl_secs: 3600,
    }
}

fn default_path_cache() -> CacheConfig {
    CacheConfig {
        capacity: 1024,
        ttl_secs: 300,
    }
}

fn default_path_ignore() -> Vec<String> {
    vec![
        "http:*".to_string(),
        "https:*".to_string(),
        "//*".to_string(),
        "data:*".to_string(),
        "*[{][{]*".to_string(),
    ]
}

fn default_shared_state_roots() -> Vec<String> {
    vec!["$scope".to_string(), "$rootScope".to_string(), "this".to_string()]
}

fn default_view_model_aliases() -> Vec<String> {
    vec!["vm".to_string(), "ctrl".to_string(), "$ctrl".to_string()]
}

fn default_directive_prefixes() -> Vec<String> {
    vec!["data-ng-".to_string(), "ng-".to_string()]
}

impl Default for InterpolateConfig {
    fn default() -> Self {
        Self {
            start_symbol: default_start_symbol(),
            end_symbol: default_end_symbol(),
        }
    }
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            aliases: HashMap::new(),
            ignore: default_path_ignore(),
        }
    }
}

impl Default for ConventionsConfig {
    fn default() -> Self {
        Self {
            shared_state_roots: default_shared_state_roots(),
            view_model_aliases: default_view_model_aliases(),
            directive_prefixes: default_directive_prefixes(),
        }
    }
}

impl Default for AjsConfig {
    fn default() -> Self {
        Self {
            interpolate: InterpolateConfig::default(),
            include: Vec::new(),
            exclude: default_exclude(),
            cache: false,
            parse: ParseConfig::default(),
            symbol_cache: default_symbol_cache(),
            path_cache: default_path_cache(),
            paths: PathsConfig::default(),
            conventions: ConventionsConfig::default(),
            workspace_fallback: true,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl ParseConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl ConventionsConfig {
    /// チェーン先頭から取り除く識別子（共有状態ルート + ビューモデル別名）
    pub fn roots(&self) -> impl Iterator<Item = &str> {
        self.shared_state_roots
            .iter()
            .chain(self.view_model_aliases.iter())
            .map(String::as_str)
    }
}

impl AjsConfig {
    /// 指定ディレクトリからajsconfig.jsonを読み込む
    pub fn load_from_dir(dir: &Path) -> Self {
        Self::load_from_path(&dir.join(CONFIG_FILE_NAME))
    }

    /// 指定パスからajsconfig.jsonを読み込む
    pub fn load_from_path(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}", CONFIG_FILE_NAME, e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", CONFIG_FILE_NAME, e);
                Self::default()
            }
        }
    }

    /// 起動前の検証（ここで失敗した場合のみ致命的）
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.parse.max_concurrent == 0 {
            return Err(ConfigError::Invalid(
                "parse.maxConcurrent must be at least 1".to_string(),
            ));
        }
        if self.symbol_cache.capacity == 0 || self.path_cache.capacity == 0 {
            return Err(ConfigError::Invalid(
                "cache capacity must be at least 1".to_string(),
            ));
        }
        if self.interpolate.start_symbol.is_empty() || self.interpolate.end_symbol.is_empty() {
            return Err(ConfigError::Invalid(
                "interpolate symbols must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// PathMatcherを作成
    pub fn create_path_matcher(&self) -> Result<PathMatcher, ConfigError> {
        PathMatcher::new(&self.include, &self.exclude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AjsConfig::default();
        assert_eq!(config.interpolate.start_symbol, "{{");
        assert_eq!(config.interpolate.end_symbol, "}}");
        assert_eq!(config.parse.max_concurrent, 8);
        assert!(config.workspace_fallback);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "interpolate": { "startSymbol": "[[", "endSymbol": "]]" },
            "parse": { "maxConcurrent": 4 },
            "symbolCache": { "capacity": 10, "ttlSecs": 5 },
            "paths": { "aliases": { "@/": "src/" } },
            "conventions": { "viewModelAliases": ["model"] }
        }"#;
        let config: AjsConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.interpolate.start_symbol, "[[");
        assert_eq!(config.parse.max_concurrent, 4);
        assert_eq!(config.parse.timeout_ms, 2000);
        assert_eq!(config.symbol_cache.ttl(), Duration::from_secs(5));
        assert_eq!(config.path_cache.capacity, 1024);
        assert_eq!(config.paths.aliases.get("@/").map(String::as_str), Some("src/"));
        assert!(!config.paths.ignore.is_empty());
        assert_eq!(config.conventions.view_model_aliases, vec!["model".to_string()]);
        assert_eq!(config.conventions.shared_state_roots[0], "$scope");
    }

    #[test]
    fn test_empty_config() {
        let config: AjsConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.interpolate.end_symbol, "}}");
        assert_eq!(config.exclude, default_exclude());
    }

    #[test]
    fn test_validate_rejects_zero_batch() {
        let mut config = AjsConfig::default();
        config.parse.max_concurrent = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = AjsConfig::load_from_dir(dir.path());
        assert!(!config.cache);
    }
}
