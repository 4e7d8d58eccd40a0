use tree_sitter::Node;

use super::context::ScriptContext;
use super::{is_function_node, node_text, property_key, ScriptParser};
use crate::model::SymbolKind;

/// オブジェクトリテラルを辿る深さの上限
const MAX_OBJECT_DEPTH: usize = 6;

impl ScriptParser {
    /// トップレベル（および即時実行関数の本体）の宣言を収集する
    ///
    /// 認識パターン:
    /// ```javascript
    /// function formatDate(d) { ... }
    /// var load = function() { ... };
    /// var api = { load: function() {}, urls: { base: '/api' } };
    /// (function() { var helper = () => {}; })();
    /// ```
    pub(super) fn collect_declarations(&self, node: Node, source: &str, ctx: &mut ScriptContext) {
        let mut cursor = node.walk();
        for statement in node.named_children(&mut cursor) {
            match statement.kind() {
                "variable_declaration" | "lexical_declaration" => {
                    self.analyze_variable_declaration(statement, source, ctx);
                }
                "function_declaration" | "generator_function_declaration" => {
                    if let Some(name) = statement.child_by_field_name("name") {
                        ctx.define(node_text(name, source), name, SymbolKind::Function);
                    }
                }
                "expression_statement" => {
                    if let Some(body) = iife_body(statement) {
                        self.collect_declarations(body, source, ctx);
                    }
                }
                _ => {}
            }
        }
    }

    fn analyze_variable_declaration(&self, node: Node, source: &str, ctx: &mut ScriptContext) {
        let mut cursor = node.walk();
        for declarator in node.named_children(&mut cursor) {
            if declarator.kind() != "variable_declarator" {
                continue;
            }
            let (Some(name), Some(value)) = (
                declarator.child_by_field_name("name"),
                declarator.child_by_field_name("value"),
            ) else {
                continue;
            };
            if name.kind() != "identifier" {
                continue;
            }

            let declared = node_text(name, source);
            if is_function_node(value) {
                ctx.define(declared, name, SymbolKind::Function);
            } else if value.kind() == "object" {
                ctx.define(declared, name, SymbolKind::Variable);
                self.collect_object_properties(value, source, declared, 1, ctx);
            }
        }
    }

    /// オブジェクトリテラルのプロパティを `prefix.key` の名前で登録する
    fn collect_object_properties(
        &self,
        object: Node,
        source: &str,
        prefix: &str,
        depth: usize,
        ctx: &mut ScriptContext,
    ) {
        if depth > MAX_OBJECT_DEPTH {
            return;
        }

        let mut cursor = object.walk();
        for property in object.named_children(&mut cursor) {
            match property.kind() {
                "pair" => {
                    let (Some(key), Some(value)) = (
                        property.child_by_field_name("key"),
                        property.child_by_field_name("value"),
                    ) else {
                        continue;
                    };
                    let Some((key, offset)) = property_key(key, source) else {
                        continue;
                    };
                    let qualified = format!("{}.{}", prefix, key);

                    if is_function_node(value) {
                        ctx.define_at(&qualified, offset, SymbolKind::Function);
                    } else {
                        ctx.define_at(&qualified, offset, SymbolKind::Variable);
                        if value.kind() == "object" {
                            self.collect_object_properties(value, source, &qualified, depth + 1, ctx);
                        }
                    }
                }
                "method_definition" => {
                    if let Some(name) = property.child_by_field_name("name") {
                        let qualified = format!("{}.{}", prefix, node_text(name, source));
                        ctx.define(&qualified, name, SymbolKind::Function);
                    }
                }
                "shorthand_property_identifier" => {
                    let qualified = format!("{}.{}", prefix, node_text(property, source));
                    ctx.define(&qualified, property, SymbolKind::Variable);
                }
                _ => {}
            }
        }
    }
}

/// `(function() { ... })();` / `(function() { ... }());` / `!function() { ... }();` の本体
fn iife_body(statement: Node) -> Option<Node> {
    let mut expr = statement.named_child(0)?;
    loop {
        match expr.kind() {
            "parenthesized_expression" | "unary_expression" => {
                expr = expr.named_child(0)?;
            }
            "call_expression" => {
                let mut callee = expr.child_by_field_name("function")?;
                while callee.kind() == "parenthesized_expression" {
                    callee = callee.named_child(0)?;
                }
                if !super::is_function_node(callee) {
                    return None;
                }
                let body = callee.child_by_field_name("body")?;
                return (body.kind() == "statement_block").then_some(body);
            }
            _ => return None,
        }
    }
}
