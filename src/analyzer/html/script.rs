//! `<script>` タグの処理

use tree_sitter::Node;

use super::attribute::{attribute_name, attribute_value};
use super::{MarkupContext, MarkupParser};

impl MarkupParser {
    /// `<script src="...">` は解決してスクリプト一覧へ、インラインscriptはその場で解析する
    ///
    /// インラインscriptのオフセットは外側の文書内の位置にずらして記録する
    pub(super) fn analyze_script_element(&self, node: Node, source: &str, ctx: &mut MarkupContext) {
        let mut src = None;
        let mut script_type = None;
        let mut raw_text = None;

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "start_tag" => {
                    let mut tag_cursor = child.walk();
                    for attr in child.children(&mut tag_cursor) {
                        if attr.kind() != "attribute" {
                            continue;
                        }
                        let Some(name) = attribute_name(attr, source) else {
                            continue;
                        };
                        match name.to_ascii_lowercase().as_str() {
                            "src" => src = attribute_value(attr, source).map(|(value, _)| value),
                            "type" => {
                                script_type = attribute_value(attr, source).map(|(value, _)| value)
                            }
                            _ => {}
                        }
                    }
                }
                "raw_text" => raw_text = Some(child),
                _ => {}
            }
        }

        if let Some(src) = src {
            if let Some(resolved) = self.resolver.resolve(ctx.path, src) {
                if !ctx.scripts.contains(&resolved) {
                    ctx.scripts.push(resolved);
                }
            }
            return;
        }

        if !is_script_type(script_type) {
            return;
        }
        let Some(raw_text) = raw_text else {
            return;
        };

        // 関連グラフの辺はマークアップ ↔ スクリプトファイル間のみ。
        // インラインscript内の templateUrl は辺を作らない
        let fragment = &source[raw_text.byte_range()];
        match self
            .scripts
            .parse_into(fragment, raw_text.start_byte(), &mut ctx.table)
        {
            Ok(template_urls) if !template_urls.is_empty() => {
                tracing::debug!(
                    "Inline script in {:?} names templates {:?}; not linked",
                    ctx.path,
                    template_urls
                );
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("Inline script in {:?} skipped: {}", ctx.path, e),
        }
    }
}

/// type 属性なし、または JavaScript を示す type か
fn is_script_type(script_type: Option<&str>) -> bool {
    let Some(script_type) = script_type.map(str::trim) else {
        return true;
    };
    let lower = script_type.to_ascii_lowercase();
    lower.is_empty()
        || lower == "module"
        || lower.contains("javascript")
        || lower.contains("ecmascript")
}

#[cfg(test)]
mod tests {
    use super::is_script_type;

    #[test]
    fn test_is_script_type() {
        assert!(is_script_type(None));
        assert!(is_script_type(Some("text/javascript")));
        assert!(is_script_type(Some("module")));
        assert!(!is_script_type(Some("text/ng-template")));
        assert!(!is_script_type(Some("application/json")));
    }
}
