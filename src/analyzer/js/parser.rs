use tree_sitter::{Parser, Tree};

use crate::error::AnalyzerError;

pub struct JsParser {
    parser: Parser,
}

impl JsParser {
    pub fn new() -> Result<Self, AnalyzerError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_javascript::LANGUAGE.into())
            .map_err(|e| AnalyzerError::Parse(format!("Failed to load JavaScript grammar: {}", e)))?;

        Ok(Self { parser })
    }

    /// 1回の解析にかける時間の上限（0 は無制限）
    pub fn with_timeout_micros(mut self, micros: u64) -> Self {
        self.parser.set_timeout_micros(micros);
        self
    }

    /// 時間切れの場合は `None`
    pub fn parse(&mut self, source: &str) -> Option<Tree> {
        self.parser.parse(source, None)
    }
}
