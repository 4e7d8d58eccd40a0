//! ディレクティブ属性の処理

use tree_sitter::Node;

use super::directives::{is_event_directive, is_expression_directive};
use super::variable_parser::{parse_ng_init_expression, parse_ng_repeat_expression};
use super::{MarkupContext, MarkupParser};
use crate::model::{Symbol, SymbolKind};
use crate::util::is_valid_identifier;

/// 属性名のテキスト
pub(super) fn attribute_name<'s>(attr: Node, source: &'s str) -> Option<&'s str> {
    let mut cursor = attr.walk();
    let name = attr
        .children(&mut cursor)
        .find(|child| child.kind() == "attribute_name")
        .map(|child| &source[child.byte_range()]);
    name
}

/// 属性値のテキストと開始オフセット（クォートは含まない）
pub(super) fn attribute_value<'s>(attr: Node, source: &'s str) -> Option<(&'s str, usize)> {
    let mut cursor = attr.walk();
    for child in attr.children(&mut cursor) {
        match child.kind() {
            "attribute_value" => return Some((&source[child.byte_range()], child.start_byte())),
            "quoted_attribute_value" => {
                let mut inner_cursor = child.walk();
                let inner = child
                    .children(&mut inner_cursor)
                    .find(|c| c.kind() == "attribute_value");
                return Some(match inner {
                    Some(value) => (&source[value.byte_range()], value.start_byte()),
                    None => ("", child.start_byte() + 1),
                });
            }
            _ => {}
        }
    }
    None
}

impl MarkupParser {
    /// `ng-click` / `data-ng-click` → (`click`, プレフィックス長)
    fn directive_name<'n>(&self, name: &'n str) -> Option<(&'n str, usize)> {
        self.prefixes.iter().find_map(|prefix| {
            let rest = name.strip_prefix(prefix.as_str())?;
            (!rest.is_empty()).then_some((rest, prefix.len()))
        })
    }

    /// タグの全属性を解析する
    pub(super) fn analyze_tag_attributes(&self, tag: Node, source: &str, ctx: &mut MarkupContext) {
        let mut cursor = tag.walk();
        for attr in tag.children(&mut cursor) {
            if attr.kind() != "attribute" {
                continue;
            }
            let Some(name_node) = attr.child(0).filter(|n| n.kind() == "attribute_name") else {
                continue;
            };
            let name = source[name_node.byte_range()].to_ascii_lowercase();
            let value = attribute_value(attr, source);

            if let Some((directive, prefix_len)) = self.directive_name(&name) {
                ctx.record(Symbol::definition(
                    directive,
                    name_node.start_byte() + prefix_len,
                    SymbolKind::Attribute,
                ));
                if let Some((value, offset)) = value {
                    self.analyze_directive_value(directive, value, offset, ctx);
                }
            }

            if let Some((value, offset)) = value {
                self.analyze_interpolations(value, offset, ctx);
            }
        }
    }

    fn analyze_directive_value(
        &self,
        directive: &str,
        value: &str,
        offset: usize,
        ctx: &mut MarkupContext,
    ) {
        match directive {
            "controller" => self.analyze_controller(value, offset, ctx),
            "repeat" => {
                let (variables, collection_start) = parse_ng_repeat_expression(value);
                for var in variables {
                    ctx.record(Symbol::definition(var.name, offset + var.offset, SymbolKind::Variable));
                }
                if let Some(start) = collection_start {
                    self.analyze_expression(&value[start..], offset + start, ctx);
                }
            }
            "init" => {
                for var in parse_ng_init_expression(value) {
                    ctx.record(Symbol::definition(var.name, offset + var.offset, SymbolKind::Variable));
                }
                self.analyze_expression(value, offset, ctx);
            }
            d if is_event_directive(d) || is_expression_directive(d) => {
                self.analyze_expression(value, offset, ctx);
            }
            _ => {}
        }
    }

    /// `ng-controller="UserCtrl"` / `ng-controller="UserCtrl as vm"`
    ///
    /// コントローラー名は参照、`as` の後ろは別名の定義として記録し、
    /// 別名は以降のチェーン先頭として扱う
    fn analyze_controller(&self, value: &str, offset: usize, ctx: &mut MarkupContext) {
        let leading = value.len() - value.trim_start().len();
        let trimmed = value.trim();
        let (controller, alias) = match trimmed.split_once(" as ") {
            Some((controller, alias)) => (controller.trim_end(), Some(alias)),
            None => (trimmed, None),
        };
        if !is_valid_identifier(controller) {
            return;
        }
        ctx.record(Symbol::reference(controller, offset + leading, SymbolKind::Variable));

        let Some(alias) = alias else {
            return;
        };
        let alias_name = alias.trim();
        if !is_valid_identifier(alias_name) {
            return;
        }
        let alias_offset = offset + value.rfind(alias_name).unwrap_or(leading);
        ctx.record(
            Symbol::definition(alias_name, alias_offset, SymbolKind::Variable).with_alias(controller),
        );
        ctx.roots.insert(alias_name.to_string());
    }
}
