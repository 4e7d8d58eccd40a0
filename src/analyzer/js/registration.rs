use tree_sitter::Node;
use tracing::debug;

use super::context::ScriptContext;
use super::{node_text, property_key, string_literal, ScriptParser};
use crate::model::SymbolKind;

impl ScriptParser {
    /// `X.<method>("name", ...)` 形式の登録呼び出しなら (種類, 名前, 名前のオフセット) を返す
    fn registration(&self, node: Node, source: &str) -> Option<(SymbolKind, String, usize)> {
        let callee = node.child_by_field_name("function")?;
        if callee.kind() != "member_expression" {
            return None;
        }
        let property = callee.child_by_field_name("property")?;
        let kind = SymbolKind::from_registration(node_text(property, source))?;

        let args = node.child_by_field_name("arguments")?;
        let first = args.named_child(0)?;
        match string_literal(first, source) {
            Some((name, offset)) if !name.is_empty() => Some((kind, name, offset)),
            _ => {
                debug!(
                    "Skipping .{}() registration with non-literal name",
                    kind.as_str()
                );
                None
            }
        }
    }

    /// モジュール登録呼び出しを定義として登録する
    ///
    /// 認識パターン:
    /// ```javascript
    /// app.controller('MainCtrl', function($scope) { ... });
    /// angular.module('app').factory('UserService', [...]);
    /// app.component('userList', { templateUrl: 'user-list.html' });
    /// ```
    pub(super) fn analyze_registration(&self, node: Node, source: &str, ctx: &mut ScriptContext) {
        if let Some((kind, name, offset)) = self.registration(node, source) {
            ctx.define_at(&name, offset, kind);
        }
    }

    /// 事前収集: 別名と templateUrl
    ///
    /// 認識パターン:
    /// ```javascript
    /// var vm = this;
    /// var self = $scope;
    /// app.component('userList', { controllerAs: 'list', templateUrl: 'user-list.html' });
    /// ```
    ///
    /// 見つかった別名はこのファイルの以降の解析でチェーン先頭として扱う
    pub(super) fn collect_aliases(
        &self,
        node: Node,
        source: &str,
        registration: Option<&str>,
        ctx: &mut ScriptContext,
    ) {
        match node.kind() {
            "variable_declarator" => self.collect_declared_alias(node, source, ctx),
            "pair" => self.collect_registration_option(node, source, registration, ctx),
            "call_expression" => {
                if let Some((_, name, _)) = self.registration(node, source) {
                    let mut cursor = node.walk();
                    for child in node.children(&mut cursor) {
                        self.collect_aliases(child, source, Some(&name), ctx);
                    }
                    return;
                }
            }
            _ => {}
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.collect_aliases(child, source, registration, ctx);
        }
    }

    /// `var vm = this;` / `var self = $scope;`
    fn collect_declared_alias(&self, node: Node, source: &str, ctx: &mut ScriptContext) {
        let (Some(name), Some(value)) = (
            node.child_by_field_name("name"),
            node.child_by_field_name("value"),
        ) else {
            return;
        };
        if name.kind() != "identifier" {
            return;
        }

        let target = node_text(value, source);
        let is_alias = match value.kind() {
            "this" => true,
            "identifier" => self.shared_state_roots.iter().any(|root| root == target),
            _ => false,
        };
        if is_alias {
            let alias = node_text(name, source);
            ctx.define_alias(alias, name.start_byte(), target);
            ctx.roots.insert(alias.to_string());
        }
    }

    /// `templateUrl: '...'` と `controllerAs: '...'`
    fn collect_registration_option(
        &self,
        node: Node,
        source: &str,
        registration: Option<&str>,
        ctx: &mut ScriptContext,
    ) {
        let (Some(key), Some(value)) = (
            node.child_by_field_name("key"),
            node.child_by_field_name("value"),
        ) else {
            return;
        };
        let Some((key, _)) = property_key(key, source) else {
            return;
        };
        let Some((value_text, value_offset)) = string_literal(value, source) else {
            return;
        };
        if value_text.is_empty() {
            return;
        }

        match key.as_str() {
            "templateUrl" => ctx.template_urls.push(value_text),
            "controllerAs" => {
                // 同じオブジェクトの controller: '...' があればそちらを優先
                let target = node
                    .parent()
                    .and_then(|object| sibling_string(object, source, "controller"))
                    .or_else(|| registration.map(str::to_string))
                    .unwrap_or_else(|| "this".to_string());
                ctx.define_alias(&value_text, value_offset, &target);
                ctx.roots.insert(value_text);
            }
            _ => {}
        }
    }
}

/// オブジェクトリテラル内の `key: 'string'` の値
fn sibling_string(object: Node, source: &str, wanted: &str) -> Option<String> {
    let mut cursor = object.walk();
    let found = object
        .named_children(&mut cursor)
        .filter(|child| child.kind() == "pair")
        .find_map(|pair| {
            let (key, _) = property_key(pair.child_by_field_name("key")?, source)?;
            if key != wanted {
                return None;
            }
            string_literal(pair.child_by_field_name("value")?, source).map(|(value, _)| value)
        });
    found
}
