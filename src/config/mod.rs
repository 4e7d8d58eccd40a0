pub mod ajs_config;
pub mod path_matcher;

pub use ajs_config::{AjsConfig, CacheConfig, ConventionsConfig, InterpolateConfig, CONFIG_FILE_NAME};
pub use path_matcher::{build_glob_set, PathMatcher};
