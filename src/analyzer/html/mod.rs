//! HTML内のAngularJSディレクティブを解析するモジュール

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tree_sitter::Node;

use crate::analyzer::in_flight::InFlight;
use crate::analyzer::js::ScriptParser;
use crate::analyzer::path_resolver::PathResolver;
use crate::config::{AjsConfig, InterpolateConfig};
use crate::error::AnalyzerError;
use crate::model::{Symbol, SymbolTable};

mod attribute;
pub mod directives;
pub mod expression;
mod parser;
mod script;
pub mod variable_parser;


use parser::HtmlParser;

/// マークアップ1ファイル分の解析結果
#[derive(Debug, Clone, Default)]
pub struct MarkupParse {
    pub table: SymbolTable,
    /// `<script src>` から解決できたスクリプトファイル（出現順、重複なし）
    pub scripts: Vec<PathBuf>,
}

/// 1回のマークアップ解析の状態
struct MarkupContext<'a> {
    path: &'a Path,
    table: SymbolTable,
    scripts: Vec<PathBuf>,
    /// チェーン先頭として扱う識別子（`ng-controller="X as vm"` で増える）
    roots: HashSet<String>,
}

impl MarkupContext<'_> {
    fn record(&mut self, symbol: Symbol) {
        self.table.insert(symbol);
    }
}

/// HTML内のAngularJSディレクティブを解析するアナライザー
pub struct MarkupParser {
    scripts: Arc<ScriptParser>,
    resolver: Arc<PathResolver>,
    interpolate: InterpolateConfig,
    /// ディレクティブ属性のプレフィックス（長い順）
    prefixes: Vec<String>,
    roots: HashSet<String>,
    timeout: Duration,
    in_flight: InFlight,
}

impl MarkupParser {
    pub fn new(scripts: Arc<ScriptParser>, resolver: Arc<PathResolver>, config: &AjsConfig) -> Self {
        let mut prefixes = config.conventions.directive_prefixes.clone();
        prefixes.sort_by(|a, b| b.len().cmp(&a.len()));

        Self {
            scripts,
            resolver,
            interpolate: config.interpolate.clone(),
            prefixes,
            roots: config.conventions.roots().map(str::to_string).collect(),
            timeout: config.parse.timeout(),
            in_flight: InFlight::new(),
        }
    }

    /// 解析中のファイル集合
    pub fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    /// HTMLドキュメントを解析する
    ///
    /// 同じパスを解析中の場合は再帰せず空の結果を返す
    pub fn parse(&self, path: &Path, source: &str) -> Result<MarkupParse, AnalyzerError> {
        let Some(_guard) = self.in_flight.try_begin(path) else {
            tracing::debug!("Skipping re-entrant markup parse of {:?}", path);
            return Ok(MarkupParse {
                table: SymbolTable::new(path),
                scripts: Vec::new(),
            });
        };

        let mut parser = HtmlParser::new()?.with_timeout_micros(self.timeout.as_micros() as u64);
        let tree = parser.parse(source).ok_or_else(|| AnalyzerError::Timeout {
            path: path.to_path_buf(),
            budget_ms: self.timeout.as_millis() as u64,
        })?;

        let mut ctx = MarkupContext {
            path,
            table: SymbolTable::new(path),
            scripts: Vec::new(),
            roots: self.roots.clone(),
        };
        self.visit_node(tree.root_node(), source, &mut ctx);

        Ok(MarkupParse {
            table: ctx.table,
            scripts: ctx.scripts,
        })
    }

    fn visit_node(&self, node: Node, source: &str, ctx: &mut MarkupContext) {
        match node.kind() {
            "script_element" => {
                self.analyze_script_element(node, source, ctx);
                return;
            }
            "style_element" | "comment" => return,
            "start_tag" | "self_closing_tag" => {
                self.analyze_tag_attributes(node, source, ctx);
            }
            "text" => {
                self.analyze_interpolations(&source[node.byte_range()], node.start_byte(), ctx);
            }
            _ => {}
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit_node(child, source, ctx);
        }
    }

    /// `{{ expr }}` 内の式をトークン化する
    fn analyze_interpolations(&self, text: &str, base: usize, ctx: &mut MarkupContext) {
        let found = expression::interpolations(
            text,
            &self.interpolate.start_symbol,
            &self.interpolate.end_symbol,
        );
        for (expr, start) in found {
            self.analyze_expression(expr, base + start, ctx);
        }
    }

    fn analyze_expression(&self, expr: &str, base: usize, ctx: &mut MarkupContext) {
        for token in expression::tokenize(expr, base, &ctx.roots) {
            ctx.record(Symbol::reference(token.name, token.offset, token.kind));
        }
    }
}
