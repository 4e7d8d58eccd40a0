//! カーソル位置のシンボル名の抽出

use std::collections::HashSet;

use crate::util::{is_ident_byte, is_ident_start};

/// カーソル位置の `.` 区切りチェーンとその開始オフセット
///
/// 左へは `.` で連結された識別子を辿り、右へは現在の識別子の終わりまで伸ばす。
/// 空白・クォート・括弧・演算子でチェーンは終わるため、`items[0].name` の
/// `name` 上では `name` だけが得られる。
/// カーソルが識別子の直後にある場合はその識別子を対象にする。
pub fn chain_at(text: &str, offset: usize) -> Option<(&str, usize)> {
    let bytes = text.as_bytes();
    let pos = if bytes.get(offset).is_some_and(|&b| is_ident_byte(b)) {
        offset
    } else if offset > 0 && bytes.get(offset - 1).is_some_and(|&b| is_ident_byte(b)) {
        offset - 1
    } else {
        return None;
    };

    let mut end = pos;
    while end < bytes.len() && is_ident_byte(bytes[end]) {
        end += 1;
    }

    let mut start = pos;
    loop {
        while start > 0 && is_ident_byte(bytes[start - 1]) {
            start -= 1;
        }
        if start >= 2 && bytes[start - 1] == b'.' && is_ident_byte(bytes[start - 2]) {
            start -= 1;
        } else {
            break;
        }
    }

    // `1.5` のような数値はチェーンではない
    let mut segments = text[start..end].split('.');
    if !segments.all(|segment| segment.bytes().next().is_some_and(is_ident_start)) {
        return None;
    }
    Some((&text[start..end], start))
}

/// チェーン先頭のルート（`$scope`, `vm` 等）を取り除く
///
/// チェーンがルートそのものの場合はそのまま返す（別名の定義を探すため）
pub fn normalize_chain(chain: &str, roots: &HashSet<String>) -> String {
    match chain.split_once('.') {
        Some((head, rest)) if roots.contains(head) => rest.to_string(),
        _ => chain.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn roots() -> HashSet<String> {
        ["$scope", "$rootScope", "this", "vm", "ctrl", "$ctrl"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    fn query_at(text: &str, needle: &str) -> Option<String> {
        let offset = text.find(needle).unwrap();
        chain_at(text, offset).map(|(chain, _)| normalize_chain(chain, &roots()))
    }

    #[test]
    fn test_scope_chain_is_normalized() {
        assert_eq!(query_at("$scope.user.name = 1;", "name").as_deref(), Some("user.name"));
    }

    #[test]
    fn test_view_model_alias_is_normalized() {
        assert_eq!(query_at("{{ vm.count }}", "count").as_deref(), Some("count"));
    }

    #[rstest]
    #[case("save(item)", "save", Some("save"))]
    #[case("save(item)", "item", Some("item"))]
    #[case("items[0].name", "name", Some("name"))]
    #[case("user.address.city | upper", "address", Some("user.address"))]
    #[case("a == b.c", "c", Some("b.c"))]
    #[case("count + 1.5", "5", None)]
    #[case("  ", " ", None)]
    fn test_chain_boundaries(#[case] text: &str, #[case] needle: &str, #[case] expected: Option<&str>) {
        assert_eq!(query_at(text, needle).as_deref(), expected);
    }

    #[test]
    fn test_cursor_right_after_identifier() {
        let text = "vm.save()";
        let (chain, start) = chain_at(text, text.find('(').unwrap()).unwrap();
        assert_eq!(chain, "vm.save");
        assert_eq!(start, 0);
    }

    #[test]
    fn test_bare_root_is_kept() {
        assert_eq!(query_at("vm = this", "vm").as_deref(), Some("vm"));
    }
}
