use std::path::{Component, Path, PathBuf};

/// ファイルの種類（マークアップ / スクリプト）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    Markup,
    Script,
}

impl FileKind {
    pub fn of(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "html" | "htm" => Some(FileKind::Markup),
            "js" => Some(FileKind::Script),
            _ => None,
        }
    }
}

/// `.` と `..` を字句的に畳み込む（ファイルシステムには触れない）
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// JavaScript識別子を構成するバイトか
pub fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

/// 識別子の先頭になれるバイトか
pub fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$'
}

/// Check if string is a valid JavaScript identifier
pub fn is_valid_identifier(s: &str) -> bool {
    let bytes = s.as_bytes();
    match bytes.first() {
        Some(&first) if is_ident_start(first) => bytes.iter().all(|&b| is_ident_byte(b)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_kind() {
        assert_eq!(FileKind::of(Path::new("/a/index.HTML")), Some(FileKind::Markup));
        assert_eq!(FileKind::of(Path::new("/a/app.js")), Some(FileKind::Script));
        assert_eq!(FileKind::of(Path::new("/a/style.css")), None);
        assert_eq!(FileKind::of(Path::new("/a/Makefile")), None);
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path(Path::new("/app/views/../js/./main.js")),
            PathBuf::from("/app/js/main.js")
        );
        assert_eq!(normalize_path(Path::new("a/../../b")), PathBuf::from("../b"));
    }

    #[test]
    fn test_is_valid_identifier() {
        assert!(is_valid_identifier("foo"));
        assert!(is_valid_identifier("_bar"));
        assert!(is_valid_identifier("$scope"));
        assert!(is_valid_identifier("item1"));
        assert!(!is_valid_identifier("1item"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("foo.bar"));
    }
}
