mod context;
mod declaration;
mod parser;
mod registration;
mod scope;

#[cfg(test)]
mod tests;

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use tree_sitter::{Node, Tree};

use crate::cache::TtlCache;
use crate::config::AjsConfig;
use crate::error::AnalyzerError;
use crate::model::{ContentHash, SymbolTable};
use context::ScriptContext;
use parser::JsParser;

/// 構文木キャッシュの上限
const TREE_CACHE_CAPACITY: usize = 256;

/// スクリプト1ファイル分の解析結果
#[derive(Debug, Clone, Default)]
pub struct ScriptParse {
    pub table: SymbolTable,
    /// `templateUrl: "..."` に書かれた未解決のパス
    pub template_urls: Vec<String>,
}

/// AngularJS 1.x のスクリプトからシンボル定義と参照を抽出するパーサー
///
/// 保持する状態は内容ハッシュをキーにした構文木キャッシュのみで、
/// 複数スレッドから同時に呼び出せる。
pub struct ScriptParser {
    shared_state_roots: Vec<String>,
    view_model_aliases: Vec<String>,
    timeout: Duration,
    trees: TtlCache<ContentHash, Tree>,
}

impl ScriptParser {
    pub fn new(config: &AjsConfig) -> Self {
        Self {
            shared_state_roots: config.conventions.shared_state_roots.clone(),
            view_model_aliases: config.conventions.view_model_aliases.clone(),
            timeout: config.parse.timeout(),
            trees: TtlCache::new(TREE_CACHE_CAPACITY, config.symbol_cache.ttl()),
        }
    }

    /// スクリプトファイル全体を解析する
    pub fn parse(&self, path: &Path, source: &str) -> Result<ScriptParse, AnalyzerError> {
        let mut table = SymbolTable::new(path);
        let template_urls = self.parse_into(source, 0, &mut table)?;
        Ok(ScriptParse {
            table,
            template_urls,
        })
    }

    /// 断片（HTML内のscriptタグ等）を解析し、`base` だけずらしたオフセットで `table` に追加する
    ///
    /// 戻り値は断片内で見つかった templateUrl の一覧
    pub fn parse_into(
        &self,
        source: &str,
        base: usize,
        table: &mut SymbolTable,
    ) -> Result<Vec<String>, AnalyzerError> {
        let tree = self.syntax_tree(table.file_path(), source)?;
        let mut ctx = ScriptContext::new(table, base, self.default_roots());

        // 事前収集フェーズ: 別名（var vm = this / controllerAs）と templateUrl
        self.collect_aliases(tree.root_node(), source, None, &mut ctx);
        // 本解析
        self.collect_declarations(tree.root_node(), source, &mut ctx);
        self.visit_node(tree.root_node(), source, &mut ctx);

        Ok(ctx.template_urls)
    }

    fn default_roots(&self) -> HashSet<String> {
        self.shared_state_roots
            .iter()
            .chain(self.view_model_aliases.iter())
            .cloned()
            .collect()
    }

    fn syntax_tree(&self, path: &Path, source: &str) -> Result<Tree, AnalyzerError> {
        let hash = ContentHash::of(source);
        if let Some(tree) = self.trees.get(&hash) {
            return Ok(tree);
        }

        let mut parser = JsParser::new()?.with_timeout_micros(self.timeout.as_micros() as u64);
        let tree = parser.parse(source).ok_or_else(|| AnalyzerError::Timeout {
            path: path.to_path_buf(),
            budget_ms: self.timeout.as_millis() as u64,
        })?;
        self.trees.insert(hash, tree.clone());
        Ok(tree)
    }

    /// ASTノードを訪問し、種類に応じた解析を行う
    ///
    /// 認識するノード:
    /// - `call_expression`: モジュール登録（.controller() 等）
    /// - `assignment_expression`: 共有状態への代入（$scope.property = value）
    /// - `member_expression`: 共有状態の参照（$scope.property, vm.method()）
    fn visit_node(&self, node: Node, source: &str, ctx: &mut ScriptContext) {
        match node.kind() {
            "call_expression" => {
                self.analyze_registration(node, source, ctx);
            }
            "assignment_expression" => {
                self.analyze_shared_state_assignment(node, source, ctx);
            }
            "member_expression" => {
                self.analyze_shared_state_read(node, source, ctx);
            }
            _ => {}
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit_node(child, source, ctx);
        }
    }
}

// ========== Utility functions ==========

/// ASTノードからソーステキストを取得する
pub(super) fn node_text<'s>(node: Node, source: &'s str) -> &'s str {
    &source[node.byte_range()]
}

/// 文字列リテラルの中身と、その開始オフセット（クォートの直後）
pub(super) fn string_literal(node: Node, source: &str) -> Option<(String, usize)> {
    if node.kind() != "string" {
        return None;
    }
    let text = node_text(node, source);
    let inner = text
        .strip_prefix(['"', '\''])
        .and_then(|t| t.strip_suffix(['"', '\'']))?;
    Some((inner.to_string(), node.start_byte() + 1))
}

/// 関数値の式か
pub(super) fn is_function_node(node: Node) -> bool {
    matches!(
        node.kind(),
        "function_expression" | "function" | "arrow_function" | "generator_function"
    )
}

/// オブジェクトのキー名（識別子・文字列）とその開始オフセット
pub(super) fn property_key(node: Node, source: &str) -> Option<(String, usize)> {
    match node.kind() {
        "property_identifier" | "identifier" => {
            Some((node_text(node, source).to_string(), node.start_byte()))
        }
        "string" => string_literal(node, source),
        _ => None,
    }
}
