use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::error::ConfigError;

/// globパターンの集合を構築する
pub fn build_glob_set(patterns: &[String]) -> Result<GlobSet, ConfigError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|source| ConfigError::InvalidGlob {
            pattern: pattern.clone(),
            source,
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| ConfigError::InvalidGlob {
        pattern: patterns.join(", "),
        source,
    })
}

/// パスマッチング用の構造体（include/exclude）
#[derive(Debug, Clone)]
pub struct PathMatcher {
    include: Option<GlobSet>,
    exclude: GlobSet,
}

impl PathMatcher {
    /// include/excludeパターンからPathMatcherを作成
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self, ConfigError> {
        let include = if include.is_empty() {
            None
        } else {
            Some(build_glob_set(include)?)
        };

        Ok(Self {
            include,
            exclude: build_glob_set(exclude)?,
        })
    }

    /// ファイルが解析対象かどうかを判定
    pub fn should_include(&self, relative_path: &Path) -> bool {
        if self.exclude.is_match(relative_path) {
            return false;
        }
        match &self.include {
            Some(include_set) => include_set.is_match(relative_path),
            None => true,
        }
    }

    /// ディレクトリを走査すべきかどうかを判定（excludeのみチェック）
    pub fn should_traverse_dir(&self, relative_path: &Path) -> bool {
        !self.exclude.is_match(relative_path)
    }
}

impl Default for PathMatcher {
    fn default() -> Self {
        Self {
            include: None,
            exclude: GlobSet::empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_include_means_all() {
        let matcher = PathMatcher::new(&[], &[]).unwrap();
        assert!(matcher.should_include(Path::new("src/app.js")));
        assert!(matcher.should_include(Path::new("views/index.html")));
    }

    #[test]
    fn test_include_filter() {
        let matcher = PathMatcher::new(&["src/**/*.js".to_string()], &[]).unwrap();
        assert!(matcher.should_include(Path::new("src/app.js")));
        assert!(!matcher.should_include(Path::new("lib/other.js")));
    }

    #[test]
    fn test_exclude_filter() {
        let matcher = PathMatcher::new(&[], &["**/vendor/**".to_string()]).unwrap();
        assert!(matcher.should_include(Path::new("src/app.js")));
        assert!(!matcher.should_include(Path::new("src/vendor/angular.js")));
    }

    #[test]
    fn test_should_traverse_dir() {
        let matcher = PathMatcher::new(
            &[],
            &["**/node_modules".to_string(), "**/node_modules/**".to_string()],
        )
        .unwrap();
        assert!(matcher.should_traverse_dir(Path::new("src")));
        assert!(!matcher.should_traverse_dir(Path::new("node_modules")));
    }

    #[test]
    fn test_invalid_glob_is_config_error() {
        let err = PathMatcher::new(&["src/[".to_string()], &[]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidGlob { .. }));
    }
}
