use std::path::{Path, PathBuf};
use std::sync::Arc;

use globset::GlobSet;
use tracing::debug;

use crate::cache::TtlCache;
use crate::config::{build_glob_set, AjsConfig};
use crate::error::ConfigError;
use crate::host::Host;
use crate::util::normalize_path;

/// `<script src>` / templateUrl の文字列を実在するファイルパスに解決する
pub struct PathResolver {
    root: PathBuf,
    host: Arc<dyn Host>,
    /// (prefix, replacement)、プレフィックスの長い順
    aliases: Vec<(String, String)>,
    ignore: GlobSet,
    cache: TtlCache<(PathBuf, String), Option<PathBuf>>,
}

impl PathResolver {
    pub fn new(root: PathBuf, host: Arc<dyn Host>, config: &AjsConfig) -> Result<Self, ConfigError> {
        let mut aliases: Vec<(String, String)> = config
            .paths
            .aliases
            .iter()
            .map(|(prefix, replacement)| (prefix.clone(), replacement.clone()))
            .collect();
        aliases.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));

        Ok(Self {
            root,
            host,
            aliases,
            ignore: build_glob_set(&config.paths.ignore)?,
            cache: TtlCache::new(config.path_cache.capacity, config.path_cache.ttl()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `referencing` ファイルから見た `raw` を解決する。解決できなければ `None`
    pub fn resolve(&self, referencing: &Path, raw: &str) -> Option<PathBuf> {
        let key = (referencing.to_path_buf(), raw.to_string());
        if let Some(cached) = self.cache.get(&key) {
            return cached;
        }

        let resolved = self.resolve_uncached(referencing, raw.trim());
        if resolved.is_none() {
            debug!("Unresolved source '{}' in {:?}", raw, referencing);
        }
        self.cache.insert(key, resolved.clone());
        resolved
    }

    fn resolve_uncached(&self, referencing: &Path, raw: &str) -> Option<PathBuf> {
        if raw.is_empty() || self.ignore.is_match(raw) {
            return None;
        }

        let aliased = self.apply_alias(raw);
        let source = strip_query(&aliased);
        if source.is_empty() {
            return None;
        }

        let dir = referencing.parent().unwrap_or(&self.root);
        let candidates: Vec<PathBuf> = if let Some(rooted) = source.strip_prefix('/') {
            vec![PathBuf::from(source), self.root.join(rooted)]
        } else {
            vec![dir.join(source), self.root.join(source)]
        };

        candidates
            .into_iter()
            .map(|candidate| normalize_path(&candidate))
            .find(|candidate| self.host.exists(candidate))
    }

    fn apply_alias(&self, raw: &str) -> String {
        for (prefix, replacement) in &self.aliases {
            if let Some(rest) = raw.strip_prefix(prefix.as_str()) {
                return format!("{}{}", replacement, rest);
            }
        }
        raw.to_string()
    }
}

fn strip_query(source: &str) -> &str {
    let end = source.find(['?', '#']).unwrap_or(source.len());
    &source[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::FsHost;
    use std::fs;

    fn setup() -> (tempfile::TempDir, PathResolver) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        fs::create_dir_all(root.join("views")).unwrap();
        fs::create_dir_all(root.join("js")).unwrap();
        fs::create_dir_all(root.join("src/shared")).unwrap();
        fs::write(root.join("views/local.js"), "").unwrap();
        fs::write(root.join("js/app.js"), "").unwrap();
        fs::write(root.join("src/shared/util.js"), "").unwrap();

        let mut config = AjsConfig::default();
        config
            .paths
            .aliases
            .insert("@/".to_string(), "src/".to_string());
        config
            .paths
            .aliases
            .insert("@/shared/".to_string(), "/src/shared/".to_string());

        let host: Arc<dyn Host> = Arc::new(FsHost::new(root.clone()));
        let resolver = PathResolver::new(root, host, &config).unwrap();
        (dir, resolver)
    }

    #[test]
    fn test_relative_to_referencing_dir() {
        let (dir, resolver) = setup();
        let markup = dir.path().join("views/index.html");
        assert_eq!(
            resolver.resolve(&markup, "./local.js"),
            Some(dir.path().join("views/local.js"))
        );
        assert_eq!(
            resolver.resolve(&markup, "local.js?v=3"),
            Some(dir.path().join("views/local.js"))
        );
    }

    #[test]
    fn test_falls_back_to_root() {
        let (dir, resolver) = setup();
        let markup = dir.path().join("views/index.html");
        assert_eq!(
            resolver.resolve(&markup, "js/app.js"),
            Some(dir.path().join("js/app.js"))
        );
        assert_eq!(
            resolver.resolve(&markup, "../js/app.js"),
            Some(dir.path().join("js/app.js"))
        );
        assert_eq!(
            resolver.resolve(&markup, "/js/app.js"),
            Some(dir.path().join("js/app.js"))
        );
    }

    #[test]
    fn test_longest_alias_wins() {
        let (dir, resolver) = setup();
        let markup = dir.path().join("index.html");
        assert_eq!(
            resolver.resolve(&markup, "@/shared/util.js"),
            Some(dir.path().join("src/shared/util.js"))
        );
    }

    #[test]
    fn test_ignored_and_missing_sources() {
        let (dir, resolver) = setup();
        let markup = dir.path().join("index.html");
        assert_eq!(resolver.resolve(&markup, "https://cdn.example.com/angular.js"), None);
        assert_eq!(resolver.resolve(&markup, "//cdn.example.com/angular.js"), None);
        assert_eq!(resolver.resolve(&markup, "{{base}}/app.js"), None);
        assert_eq!(resolver.resolve(&markup, "missing.js"), None);
        assert_eq!(resolver.resolve(&markup, ""), None);
    }
}
