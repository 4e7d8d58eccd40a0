use tree_sitter::Node;

use super::context::ScriptContext;
use super::{is_function_node, node_text, ScriptParser};
use crate::model::SymbolKind;

impl ScriptParser {
    /// 共有状態ルートから始まるメンバーアクセスチェーンのプロパティパスを再帰的に抽出する
    ///
    /// 例:
    /// - `$scope.user` → Some("user")
    /// - `$scope.user.name` → Some("user.name")
    /// - `vm.save` → Some("save")（`vm` が別名の場合）
    /// - `other.prop` / `$scope[key]` → None
    fn shared_state_path(&self, node: Node, source: &str, ctx: &ScriptContext) -> Option<String> {
        if node.kind() != "member_expression" {
            return None;
        }

        let object = node.child_by_field_name("object")?;
        let property = node.child_by_field_name("property")?;
        if property.kind() != "property_identifier" {
            return None;
        }
        let prop_name = node_text(property, source);

        match object.kind() {
            "identifier" | "this" => {
                // $scope.$watch 等のフレームワークAPIは対象外
                if ctx.is_root(node_text(object, source)) && !prop_name.starts_with('$') {
                    Some(prop_name.to_string())
                } else {
                    None
                }
            }
            "member_expression" => {
                let parent_path = self.shared_state_path(object, source, ctx)?;
                Some(format!("{}.{}", parent_path, prop_name))
            }
            _ => None,
        }
    }

    /// 共有状態への代入を解析し、定義として登録する
    ///
    /// 認識パターン:
    /// ```javascript
    /// $scope.users = [];
    /// $scope.loadUsers = function() { ... };
    /// vm.user.name = 'test';  // ネストされたプロパティ
    /// ```
    ///
    /// 右辺が関数の場合は Function、それ以外は Variable として登録
    pub(super) fn analyze_shared_state_assignment(
        &self,
        node: Node,
        source: &str,
        ctx: &mut ScriptContext,
    ) {
        let Some(left) = node.child_by_field_name("left") else {
            return;
        };
        let Some(path) = self.shared_state_path(left, source, ctx) else {
            return;
        };
        let Some(property) = left.child_by_field_name("property") else {
            return;
        };

        let is_function = node
            .child_by_field_name("right")
            .is_some_and(is_function_node);
        let kind = if is_function {
            SymbolKind::Function
        } else {
            SymbolKind::Variable
        };
        ctx.define(&path, property, kind);
    }

    /// 共有状態の読み取りを参照として登録する
    ///
    /// 呼び出し対象（`$scope.save()`）は Function、それ以外は Variable。
    /// 代入の左辺は定義として登録済みのため、同じ (name, offset) は無視される。
    pub(super) fn analyze_shared_state_read(&self, node: Node, source: &str, ctx: &mut ScriptContext) {
        let Some(path) = self.shared_state_path(node, source, ctx) else {
            return;
        };
        let Some(property) = node.child_by_field_name("property") else {
            return;
        };

        let is_call_target = node.parent().is_some_and(|parent| {
            parent.kind() == "call_expression"
                && parent
                    .child_by_field_name("function")
                    .is_some_and(|callee| callee.id() == node.id())
        });
        let kind = if is_call_target {
            SymbolKind::Function
        } else {
            SymbolKind::Variable
        };
        ctx.reference(&path, property, kind);
    }
}
