use std::collections::HashSet;

use tree_sitter::Node;

use crate::model::{Symbol, SymbolKind, SymbolTable};

/// 1回のスクリプト解析の状態
pub(super) struct ScriptContext<'t> {
    pub(super) table: &'t mut SymbolTable,
    /// 外側の文書内での開始オフセット（インラインscript用）
    pub(super) base: usize,
    /// チェーン先頭として扱う識別子（`$scope`, `this`, 別名 ...）
    pub(super) roots: HashSet<String>,
    /// `templateUrl` に書かれた生のパス
    pub(super) template_urls: Vec<String>,
}

impl<'t> ScriptContext<'t> {
    pub(super) fn new(table: &'t mut SymbolTable, base: usize, roots: HashSet<String>) -> Self {
        Self {
            table,
            base,
            roots,
            template_urls: Vec::new(),
        }
    }

    pub(super) fn is_root(&self, name: &str) -> bool {
        self.roots.contains(name)
    }

    pub(super) fn define(&mut self, name: &str, node: Node, kind: SymbolKind) {
        self.define_at(name, node.start_byte(), kind);
    }

    pub(super) fn define_at(&mut self, name: &str, offset: usize, kind: SymbolKind) {
        self.table
            .insert(Symbol::definition(name, self.base + offset, kind));
    }

    pub(super) fn define_alias(&mut self, name: &str, offset: usize, target: &str) {
        self.table.insert(
            Symbol::definition(name, self.base + offset, SymbolKind::Variable).with_alias(target),
        );
    }

    pub(super) fn reference(&mut self, name: &str, node: Node, kind: SymbolKind) {
        self.table
            .insert(Symbol::reference(name, self.base + node.start_byte(), kind));
    }
}
