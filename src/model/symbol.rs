use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolKind {
    Controller,
    /// `.service()` と `.factory()` の両方
    Service,
    Directive,
    /// AngularJS 1.5+ コンポーネント（.component() で登録）
    Component,
    Function,
    Variable,
    Filter,
    /// `ng-xxx` 形式のディレクティブ属性（プレフィックス除去後の名前）
    Attribute,
}

impl SymbolKind {
    /// 同名シンボルが複数の種類に存在する場合の探索順
    pub const PRIORITY: [SymbolKind; 8] = [
        SymbolKind::Controller,
        SymbolKind::Component,
        SymbolKind::Directive,
        SymbolKind::Service,
        SymbolKind::Filter,
        SymbolKind::Function,
        SymbolKind::Variable,
        SymbolKind::Attribute,
    ];

    /// 1ファイルにつき定義が高々1つと想定される種類か
    pub fn is_single_valued(&self) -> bool {
        matches!(
            self,
            SymbolKind::Controller
                | SymbolKind::Service
                | SymbolKind::Directive
                | SymbolKind::Component
                | SymbolKind::Attribute
        )
    }

    /// `app.<method>("name", ...)` の登録メソッド名から種類を得る
    pub fn from_registration(method: &str) -> Option<Self> {
        match method {
            "controller" => Some(SymbolKind::Controller),
            "service" | "factory" => Some(SymbolKind::Service),
            "directive" => Some(SymbolKind::Directive),
            "component" => Some(SymbolKind::Component),
            "filter" => Some(SymbolKind::Filter),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Controller => "controller",
            SymbolKind::Service => "service",
            SymbolKind::Directive => "directive",
            SymbolKind::Component => "component",
            SymbolKind::Function => "function",
            SymbolKind::Variable => "variable",
            SymbolKind::Filter => "filter",
            SymbolKind::Attribute => "attribute",
        }
    }
}

/// One recovered occurrence of a name in one file.
///
/// `offset` is a byte offset into the exact text that produced the symbol;
/// any edit to the file invalidates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub offset: usize,
    pub kind: SymbolKind,
    pub is_definition: bool,
    pub alias_for: Option<String>,
}

impl Symbol {
    pub fn definition(name: impl Into<String>, offset: usize, kind: SymbolKind) -> Self {
        Self {
            name: name.into(),
            offset,
            kind,
            is_definition: true,
            alias_for: None,
        }
    }

    pub fn reference(name: impl Into<String>, offset: usize, kind: SymbolKind) -> Self {
        Self {
            name: name.into(),
            offset,
            kind,
            is_definition: false,
            alias_for: None,
        }
    }

    pub fn with_alias(mut self, target: impl Into<String>) -> Self {
        self.alias_for = Some(target.into());
        self
    }

    /// 名前の最後のセグメント（`user.name` → `name`）の長さ
    ///
    /// offset はチェーンの最後のセグメントの位置を指す
    pub fn leaf_len(&self) -> usize {
        self.name.rsplit('.').next().map(str::len).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_kinds() {
        assert_eq!(SymbolKind::from_registration("factory"), Some(SymbolKind::Service));
        assert_eq!(SymbolKind::from_registration("service"), Some(SymbolKind::Service));
        assert_eq!(SymbolKind::from_registration("component"), Some(SymbolKind::Component));
        assert_eq!(SymbolKind::from_registration("provider"), None);
    }

    #[test]
    fn test_leaf_len() {
        let symbol = Symbol::reference("user.name", 10, SymbolKind::Variable);
        assert_eq!(symbol.leaf_len(), 4);
        let symbol = Symbol::definition("mainCtrl", 0, SymbolKind::Controller);
        assert_eq!(symbol.leaf_len(), 8);
    }
}
