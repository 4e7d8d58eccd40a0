//! Angular式のトークン走査
//!
//! 式の文法は仮定せず、独立した走査関数がそれぞれ `(name, offset)` を返す。
//! 結果は呼び出し側で (name, offset) 単位に重複排除される。

use std::collections::HashSet;

use super::directives::is_ignored_identifier;
use crate::model::SymbolKind;
use crate::util::{is_ident_byte, is_ident_start};

/// 式から抽出した参照
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub name: String,
    /// 式の先頭からのバイトオフセット（`base` 加算済み）
    pub offset: usize,
    pub kind: SymbolKind,
}

/// `.` で連結された識別子の並び
#[derive(Debug, Clone)]
struct RawChain<'a> {
    segments: Vec<(&'a str, usize)>,
    /// 直後が `(`
    is_call: bool,
    /// `{ key: ... }` のキー
    is_key: bool,
    /// `| name` のフィルター名
    is_filter: bool,
}

impl RawChain<'_> {
    fn head(&self) -> &str {
        self.segments[0].0
    }

    fn join(&self, from: usize, to: usize) -> String {
        self.segments[from..=to]
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// 式中の識別子チェーンを字句的に切り出す
///
/// 文字列リテラル・数値は読み飛ばす。`)` や `]` の後の `.name` のように
/// 識別子から始まらないメンバーアクセスは対象外。
fn lex_chains(expr: &str) -> Vec<RawChain<'_>> {
    let bytes = expr.as_bytes();
    let mut chains = Vec::new();
    let mut i = 0;
    let mut brace_depth = 0usize;
    let mut after_pipe = false;

    while i < bytes.len() {
        let b = bytes[i];
        match b {
            b'\'' | b'"' => {
                i = skip_string(bytes, i);
                after_pipe = false;
                continue;
            }
            b'|' => {
                if bytes.get(i + 1) == Some(&b'|') {
                    i += 2;
                    after_pipe = false;
                } else {
                    i += 1;
                    after_pipe = true;
                }
                continue;
            }
            b'{' => brace_depth += 1,
            b'}' => brace_depth = brace_depth.saturating_sub(1),
            _ if b.is_ascii_digit() => {
                while i < bytes.len() && (is_ident_byte(bytes[i]) || bytes[i] == b'.') {
                    i += 1;
                }
                after_pipe = false;
                continue;
            }
            _ if is_ident_start(b) => {
                let preceded_by_dot = previous_non_space(bytes, i) == Some(b'.');
                let mut segments = Vec::new();
                loop {
                    let start = i;
                    while i < bytes.len() && is_ident_byte(bytes[i]) {
                        i += 1;
                    }
                    segments.push((&expr[start..i], start));
                    let continues = bytes.get(i) == Some(&b'.')
                        && bytes.get(i + 1).is_some_and(|&next| is_ident_start(next));
                    if !continues {
                        break;
                    }
                    i += 1;
                }

                let next = next_non_space(bytes, i);
                if !preceded_by_dot {
                    chains.push(RawChain {
                        segments,
                        is_call: next == Some(b'('),
                        is_key: brace_depth > 0 && next == Some(b':'),
                        is_filter: after_pipe,
                    });
                }
                after_pipe = false;
                continue;
            }
            _ => {}
        }

        if !b.is_ascii_whitespace() {
            after_pipe = false;
        }
        i += 1;
    }

    chains
}

fn skip_string(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

fn previous_non_space(bytes: &[u8], before: usize) -> Option<u8> {
    bytes[..before]
        .iter()
        .rev()
        .copied()
        .find(|b| !b.is_ascii_whitespace())
}

fn next_non_space(bytes: &[u8], from: usize) -> Option<u8> {
    bytes
        .get(from..)?
        .iter()
        .copied()
        .find(|b| !b.is_ascii_whitespace())
}

/// フィルターパイプ: `items | orderBy:'name'` → `orderBy`
pub fn scan_filters(expr: &str) -> Vec<(String, usize)> {
    lex_chains(expr)
        .into_iter()
        .filter(|chain| chain.is_filter)
        .map(|chain| (chain.head().to_string(), chain.segments[0].1))
        .collect()
}

/// 呼び出し: `save(user)` → `save`、`vm.user.reload()` → `user.reload`
///
/// 名前はルートを除いたチェーン全体、オフセットは最後のセグメントの位置
pub fn scan_calls(expr: &str, roots: &HashSet<String>) -> Vec<(String, usize)> {
    lex_chains(expr)
        .into_iter()
        .filter(|chain| chain.is_call && !chain.is_key && !chain.is_filter)
        .filter_map(|chain| {
            let last = chain.segments.len() - 1;
            let from = if roots.contains(chain.head()) {
                if last == 0 {
                    return None;
                }
                1
            } else if is_ignored_identifier(chain.head()) {
                return None;
            } else {
                0
            };
            Some((chain.join(from, last), chain.segments[last].1))
        })
        .collect()
}

/// プロパティチェーン: `user.address.city` → `user`, `user.address`, `user.address.city`
///
/// 先頭がルート（`$ctrl`, `vm` 等）の場合はルート自体を1回記録し、
/// 部分パスはルートの次から始める。
pub fn scan_chains(expr: &str, roots: &HashSet<String>) -> Vec<(String, usize)> {
    let mut found = Vec::new();
    for chain in lex_chains(expr) {
        if chain.is_key || chain.is_filter {
            continue;
        }
        let head = chain.head();
        let from = if roots.contains(head) {
            found.push((head.to_string(), chain.segments[0].1));
            1
        } else if is_ignored_identifier(head) {
            continue;
        } else {
            0
        };
        for to in from..chain.segments.len() {
            found.push((chain.join(from, to), chain.segments[to].1));
        }
    }
    found
}

/// 式全体をトークン化する（フィルター → 呼び出し → チェーンの順）
///
/// `base` は式の外側の文書内での開始オフセット
pub fn tokenize(expr: &str, base: usize, roots: &HashSet<String>) -> Vec<Token> {
    let filters = scan_filters(expr)
        .into_iter()
        .map(|(name, offset)| (name, offset, SymbolKind::Filter));
    let calls = scan_calls(expr, roots)
        .into_iter()
        .map(|(name, offset)| (name, offset, SymbolKind::Function));
    let chains = scan_chains(expr, roots)
        .into_iter()
        .map(|(name, offset)| (name, offset, SymbolKind::Variable));

    let mut seen = HashSet::new();
    filters
        .chain(calls)
        .chain(chains)
        .filter(|(name, offset, _)| seen.insert((name.clone(), *offset)))
        .map(|(name, offset, kind)| Token {
            name,
            offset: base + offset,
            kind,
        })
        .collect()
}

/// interpolation `{{ expr }}` の中身とその開始オフセット
pub fn interpolations<'a>(text: &'a str, start_symbol: &str, end_symbol: &str) -> Vec<(&'a str, usize)> {
    let mut found = Vec::new();
    let mut pos = 0;
    while let Some(open) = text[pos..].find(start_symbol) {
        let inner_start = pos + open + start_symbol.len();
        let Some(close) = text[inner_start..].find(end_symbol) else {
            break;
        };
        let inner_end = inner_start + close;
        found.push((&text[inner_start..inner_end], inner_start));
        pos = inner_end + end_symbol.len();
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roots() -> HashSet<String> {
        ["$scope", "vm", "$ctrl", "this"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    fn names(tokens: &[(String, usize)]) -> Vec<&str> {
        tokens.iter().map(|(name, _)| name.as_str()).collect()
    }

    #[test]
    fn test_scan_filters() {
        let expr = "items | orderBy:'name' | limitTo:10";
        let filters = scan_filters(expr);
        assert_eq!(names(&filters), vec!["orderBy", "limitTo"]);
        assert_eq!(filters[0].1, expr.find("orderBy").unwrap());
    }

    #[test]
    fn test_logical_or_is_not_a_filter() {
        assert!(scan_filters("a || b").is_empty());
        assert_eq!(names(&scan_chains("a || b", &roots())), vec!["a", "b"]);
    }

    #[test]
    fn test_scan_calls() {
        let expr = "save(user); vm.reload(); api.load(1); parseInt(x)";
        let calls = scan_calls(expr, &roots());
        assert_eq!(names(&calls), vec!["save", "reload", "api.load"]);
        assert_eq!(calls[1].1, expr.find("reload").unwrap());
        assert_eq!(calls[2].1, expr.find("load(").unwrap());
    }

    #[test]
    fn test_scan_chains_partial_paths() {
        let expr = "user.address.city";
        let chains = scan_chains(expr, &roots());
        assert_eq!(chains, vec![
            ("user".to_string(), 0),
            ("user.address".to_string(), 5),
            ("user.address.city".to_string(), 13),
        ]);
    }

    #[test]
    fn test_scan_chains_with_root() {
        let chains = scan_chains("vm.user.name", &roots());
        assert_eq!(chains, vec![
            ("vm".to_string(), 0),
            ("user".to_string(), 3),
            ("user.name".to_string(), 8),
        ]);
    }

    #[test]
    fn test_strings_keys_and_keywords_are_skipped() {
        let expr = "{ active: isActive, 'x y': other } && !false && $index > 0 && label == 'title.text'";
        let chains = scan_chains(expr, &roots());
        assert_eq!(names(&chains), vec!["isActive", "other", "label"]);
    }

    #[test]
    fn test_member_after_call_is_skipped() {
        let chains = scan_chains("getUser().name", &roots());
        assert_eq!(names(&chains), vec!["getUser"]);
    }

    #[test]
    fn test_tokenize_dedups_and_orders() {
        let expr = "vm.save(item) | json";
        let tokens = tokenize(expr, 100, &roots());
        let summary: Vec<_> = tokens
            .iter()
            .map(|t| (t.name.as_str(), t.offset - 100, t.kind))
            .collect();
        assert_eq!(summary, vec![
            ("json", expr.find("json").unwrap(), SymbolKind::Filter),
            ("save", 3, SymbolKind::Function),
            ("vm", 0, SymbolKind::Variable),
            ("item", expr.find("item").unwrap(), SymbolKind::Variable),
        ]);
    }

    #[test]
    fn test_interpolations() {
        let text = "Hello {{ user.name }} and {{::count}} {{ broken";
        let found = interpolations(text, "{{", "}}");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0], (" user.name ", 8));
        assert_eq!(found[1].0, "::count");
    }
}
