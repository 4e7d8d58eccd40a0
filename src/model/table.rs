use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::symbol::{Symbol, SymbolKind};

/// Per-file container of recovered symbols, grouped by kind.
///
/// Single-valued kinds keep one symbol per name (the earliest offset);
/// list-valued kinds keep every occurrence in discovery order. A
/// `(name, offset)` pair is stored at most once across all kinds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolTable {
    pub file_path: PathBuf,
    pub controllers: HashMap<String, Symbol>,
    pub services: HashMap<String, Symbol>,
    pub directives: HashMap<String, Symbol>,
    pub components: HashMap<String, Symbol>,
    pub attributes: HashMap<String, Symbol>,
    pub functions: HashMap<String, Vec<Symbol>>,
    pub variables: HashMap<String, Vec<Symbol>>,
    pub filters: HashMap<String, Vec<Symbol>>,
}

impl SymbolTable {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
            ..Default::default()
        }
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    fn single_map(&self, kind: SymbolKind) -> Option<&HashMap<String, Symbol>> {
        match kind {
            SymbolKind::Controller => Some(&self.controllers),
            SymbolKind::Service => Some(&self.services),
            SymbolKind::Directive => Some(&self.directives),
            SymbolKind::Component => Some(&self.components),
            SymbolKind::Attribute => Some(&self.attributes),
            _ => None,
        }
    }

    fn single_map_mut(&mut self, kind: SymbolKind) -> Option<&mut HashMap<String, Symbol>> {
        match kind {
            SymbolKind::Controller => Some(&mut self.controllers),
            SymbolKind::Service => Some(&mut self.services),
            SymbolKind::Directive => Some(&mut self.directives),
            SymbolKind::Component => Some(&mut self.components),
            SymbolKind::Attribute => Some(&mut self.attributes),
            _ => None,
        }
    }

    fn list_map(&self, kind: SymbolKind) -> Option<&HashMap<String, Vec<Symbol>>> {
        match kind {
            SymbolKind::Function => Some(&self.functions),
            SymbolKind::Variable => Some(&self.variables),
            SymbolKind::Filter => Some(&self.filters),
            _ => None,
        }
    }

    fn list_map_mut(&mut self, kind: SymbolKind) -> Option<&mut HashMap<String, Vec<Symbol>>> {
        match kind {
            SymbolKind::Function => Some(&mut self.functions),
            SymbolKind::Variable => Some(&mut self.variables),
            SymbolKind::Filter => Some(&mut self.filters),
            _ => None,
        }
    }

    /// 同じ (name, offset) が既にいずれかの種類に記録済みか
    pub fn contains(&self, name: &str, offset: usize) -> bool {
        SymbolKind::PRIORITY.iter().any(|&kind| {
            if let Some(map) = self.single_map(kind) {
                map.get(name).is_some_and(|s| s.offset == offset)
            } else if let Some(map) = self.list_map(kind) {
                map.get(name)
                    .is_some_and(|list| list.iter().any(|s| s.offset == offset))
            } else {
                false
            }
        })
    }

    /// シンボルを追加する。重複（同じ name, offset）の場合は false
    pub fn insert(&mut self, symbol: Symbol) -> bool {
        if self.contains(&symbol.name, symbol.offset) {
            return false;
        }

        let kind = symbol.kind;
        if let Some(map) = self.single_map_mut(kind) {
            let keep_existing = map
                .get(&symbol.name)
                .is_some_and(|existing| existing.offset <= symbol.offset);
            if keep_existing {
                return false;
            }
            map.insert(symbol.name.clone(), symbol);
            true
        } else if let Some(map) = self.list_map_mut(kind) {
            map.entry(symbol.name.clone()).or_default().push(symbol);
            true
        } else {
            false
        }
    }

    /// Merges every symbol of `other` into this table, shifting offsets.
    pub fn absorb(&mut self, other: SymbolTable, shift: usize) {
        for mut symbol in other.into_symbols() {
            symbol.offset += shift;
            self.insert(symbol);
        }
    }

    pub fn single(&self, kind: SymbolKind, name: &str) -> Option<&Symbol> {
        self.single_map(kind)?.get(name)
    }

    pub fn list(&self, kind: SymbolKind, name: &str) -> &[Symbol] {
        self.list_map(kind)
            .and_then(|map| map.get(name))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// 指定名の全出現を種類の優先順に返す
    pub fn occurrences(&self, name: &str) -> Vec<&Symbol> {
        let mut found = Vec::new();
        for kind in SymbolKind::PRIORITY {
            if let Some(symbol) = self.single(kind, name) {
                found.push(symbol);
            }
            found.extend(self.list(kind, name));
        }
        found
    }

    /// 別名（aliasFor が設定された変数定義）の一覧
    pub fn aliases(&self) -> impl Iterator<Item = &Symbol> {
        self.variables
            .values()
            .flatten()
            .filter(|s| s.is_definition && s.alias_for.is_some())
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.controllers
            .values()
            .chain(self.services.values())
            .chain(self.directives.values())
            .chain(self.components.values())
            .chain(self.attributes.values())
            .chain(self.functions.values().flatten())
            .chain(self.variables.values().flatten())
            .chain(self.filters.values().flatten())
    }

    fn into_symbols(self) -> Vec<Symbol> {
        let mut symbols: Vec<Symbol> = Vec::new();
        symbols.extend(self.controllers.into_values());
        symbols.extend(self.services.into_values());
        symbols.extend(self.directives.into_values());
        symbols.extend(self.components.into_values());
        symbols.extend(self.attributes.into_values());
        symbols.extend(self.functions.into_values().flatten());
        symbols.extend(self.variables.into_values().flatten());
        symbols.extend(self.filters.into_values().flatten());
        symbols.sort_by_key(|s| s.offset);
        symbols
    }

    pub fn len(&self) -> usize {
        self.symbols().count()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols().next().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_across_kinds() {
        let mut table = SymbolTable::new("/app/index.html");
        assert!(table.insert(Symbol::reference("save", 12, SymbolKind::Function)));
        assert!(!table.insert(Symbol::reference("save", 12, SymbolKind::Variable)));
        assert!(table.insert(Symbol::reference("save", 40, SymbolKind::Variable)));
        assert_eq!(table.occurrences("save").len(), 2);
    }

    #[test]
    fn test_single_valued_keeps_earliest() {
        let mut table = SymbolTable::new("/app/app.js");
        assert!(table.insert(Symbol::definition("mainCtrl", 80, SymbolKind::Controller)));
        assert!(table.insert(Symbol::definition("mainCtrl", 20, SymbolKind::Controller)));
        assert!(!table.insert(Symbol::definition("mainCtrl", 120, SymbolKind::Controller)));
        assert_eq!(
            table.single(SymbolKind::Controller, "mainCtrl").map(|s| s.offset),
            Some(20)
        );
    }

    #[test]
    fn test_occurrences_follow_kind_priority() {
        let mut table = SymbolTable::new("/app/app.js");
        table.insert(Symbol::definition("format", 50, SymbolKind::Function));
        table.insert(Symbol::definition("format", 10, SymbolKind::Filter));
        let kinds: Vec<_> = table.occurrences("format").iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec![SymbolKind::Filter, SymbolKind::Function]);
    }

    #[test]
    fn test_absorb_shifts_offsets() {
        let mut inline = SymbolTable::new("");
        inline.insert(Symbol::definition("title", 3, SymbolKind::Variable));
        let mut table = SymbolTable::new("/app/index.html");
        table.absorb(inline, 100);
        assert_eq!(table.list(SymbolKind::Variable, "title")[0].offset, 103);
    }

    #[test]
    fn test_aliases() {
        let mut table = SymbolTable::new("/app/app.js");
        table.insert(Symbol::definition("vm", 4, SymbolKind::Variable).with_alias("this"));
        table.insert(Symbol::definition("count", 20, SymbolKind::Variable));
        let aliases: Vec<_> = table.aliases().map(|s| s.name.as_str()).collect();
        assert_eq!(aliases, vec!["vm"]);
    }
}
