use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::model::{Symbol, SymbolKind, SymbolTable};
use crate::util::FileKind;

/// 検索で見つかった1件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    pub path: PathBuf,
    pub symbol: Symbol,
    /// この検索で定義として扱われたか
    pub is_definition: bool,
}

/// 定義と参照に分けた検索結果（発見順）
#[derive(Debug, Default)]
pub struct Resolution {
    definitions: Vec<Hit>,
    references: Vec<Hit>,
}

impl Resolution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_definitions(&self) -> bool {
        !self.definitions.is_empty()
    }

    /// テーブル内の `name` を定義と参照に振り分ける
    ///
    /// 単一値の種類（controller 等）はヒットすれば定義。リスト値の種類では
    /// `is_definition` を持つ最小オフセットの1件だけが定義で、残りは参照。
    pub fn collect(&mut self, path: &Path, table: &SymbolTable, name: &str) {
        for kind in SymbolKind::PRIORITY {
            if let Some(symbol) = table.single(kind, name) {
                self.definitions.push(hit(path, symbol, true));
            }

            let list = table.list(kind, name);
            let definition = list
                .iter()
                .filter(|s| s.is_definition)
                .min_by_key(|s| s.offset)
                .map(|s| s.offset);
            for symbol in list {
                if Some(symbol.offset) == definition {
                    self.definitions.push(hit(path, symbol, true));
                } else {
                    self.references.push(hit(path, symbol, false));
                }
            }
        }
    }

    /// 定義だけを集める（ワークスペース全体へのフォールバック用）
    pub fn collect_definitions(&mut self, path: &Path, table: &SymbolTable, name: &str) {
        let mut found = Resolution::new();
        found.collect(path, table, name);
        self.definitions.extend(found.definitions);
    }

    /// 定義ジャンプの結果
    ///
    /// マークアップからの問い合わせで定義があれば最初の1件のみ、
    /// スクリプトからなら全定義。定義がなければ参照を含む全件。
    pub fn into_definitions(self, origin: FileKind) -> Vec<Hit> {
        if self.definitions.is_empty() {
            return self.into_merged();
        }
        match origin {
            FileKind::Markup => self.definitions.into_iter().take(1).collect(),
            FileKind::Script => dedup(self.definitions),
        }
    }

    /// 参照検索の結果（定義が先、(file, offset) で重複排除）
    pub fn into_merged(self) -> Vec<Hit> {
        let mut merged = self.definitions;
        merged.extend(self.references);
        dedup(merged)
    }
}

fn hit(path: &Path, symbol: &Symbol, is_definition: bool) -> Hit {
    Hit {
        path: path.to_path_buf(),
        symbol: symbol.clone(),
        is_definition,
    }
}

fn dedup(hits: Vec<Hit>) -> Vec<Hit> {
    let mut seen = HashSet::new();
    hits.into_iter()
        .filter(|h| seen.insert((h.path.clone(), h.symbol.offset)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offsets(hits: &[Hit]) -> Vec<usize> {
        hits.iter().map(|h| h.symbol.offset).collect()
    }

    #[test]
    fn test_earliest_definition_wins_in_list() {
        let path = Path::new("/app/app.js");
        let mut table = SymbolTable::new(path);
        table.insert(Symbol::reference("save", 50, SymbolKind::Function));
        table.insert(Symbol::definition("save", 10, SymbolKind::Function));
        table.insert(Symbol::reference("save", 80, SymbolKind::Function));

        let mut resolution = Resolution::new();
        resolution.collect(path, &table, "save");
        assert_eq!(offsets(&resolution.definitions), vec![10]);
        assert_eq!(offsets(&resolution.references), vec![50, 80]);

        let definitions = resolution.into_definitions(FileKind::Script);
        assert_eq!(offsets(&definitions), vec![10]);
    }

    #[test]
    fn test_later_definition_counts_as_reference() {
        let path = Path::new("/app/app.js");
        let mut table = SymbolTable::new(path);
        table.insert(Symbol::definition("title", 40, SymbolKind::Variable));
        table.insert(Symbol::definition("title", 20, SymbolKind::Variable));

        let mut resolution = Resolution::new();
        resolution.collect(path, &table, "title");
        assert_eq!(offsets(&resolution.definitions), vec![20]);
        assert_eq!(offsets(&resolution.references), vec![40]);

        let merged = resolution.into_merged();
        let flags: Vec<_> = merged.iter().map(|h| h.is_definition).collect();
        assert_eq!(flags, vec![true, false]);
    }

    #[test]
    fn test_markup_origin_returns_first_definition_only() {
        let markup = Path::new("/app/index.html");
        let script = Path::new("/app/app.js");

        let mut markup_table = SymbolTable::new(markup);
        for offset in [5, 15, 25] {
            markup_table.insert(Symbol::reference("save", offset, SymbolKind::Function));
        }
        let mut script_table = SymbolTable::new(script);
        script_table.insert(Symbol::definition("save", 100, SymbolKind::Function));
        script_table.insert(Symbol::definition("save", 200, SymbolKind::Variable));

        let mut resolution = Resolution::new();
        resolution.collect(markup, &markup_table, "save");
        resolution.collect(script, &script_table, "save");

        let definitions = resolution.into_definitions(FileKind::Markup);
        assert_eq!(definitions.len(), 1);
        assert_eq!(definitions[0].path, script);
        assert_eq!(definitions[0].symbol.offset, 100);
    }

    #[test]
    fn test_no_definition_returns_merged_references() {
        let path = Path::new("/app/index.html");
        let mut table = SymbolTable::new(path);
        table.insert(Symbol::reference("count", 30, SymbolKind::Variable));
        table.insert(Symbol::reference("count", 10, SymbolKind::Variable));

        let mut resolution = Resolution::new();
        resolution.collect(path, &table, "count");
        resolution.collect(path, &table, "count");
        assert!(!resolution.has_definitions());
        assert_eq!(offsets(&resolution.into_definitions(FileKind::Markup)), vec![30, 10]);
    }

    #[test]
    fn test_single_valued_kinds_are_definitions() {
        let path = Path::new("/app/app.js");
        let mut table = SymbolTable::new(path);
        table.insert(Symbol::definition("userList", 12, SymbolKind::Component));
        table.insert(Symbol::reference("userList", 60, SymbolKind::Variable));

        let mut resolution = Resolution::new();
        resolution.collect_definitions(path, &table, "userList");
        assert_eq!(offsets(&resolution.into_merged()), vec![12]);
    }
}
