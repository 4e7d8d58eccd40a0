//! Parse local variables from ng-repeat/ng-init expressions

use crate::util::is_valid_identifier;

/// Parsed variable info
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedVariable {
    pub name: String,
    /// Byte offset within the expression
    pub offset: usize,
    /// Length of variable name
    pub len: usize,
}

/// ng-repeat の反復変数とコレクション式の開始位置
///
/// e.g. "item in items" -> ([item], Some(8))
/// e.g. "(key, value) in obj" -> ([key, value], Some(16))
pub fn parse_ng_repeat_expression(expr: &str) -> (Vec<ParsedVariable>, Option<usize>) {
    let mut result = Vec::new();

    let Some(in_idx) = expr.find(" in ") else {
        return (result, None);
    };
    let collection_start = in_idx + " in ".len();
    let iter_part = &expr[..in_idx];

    if iter_part.trim_start().starts_with('(') {
        // (key, value) pattern
        let (Some(open_paren), Some(close_paren)) = (iter_part.find('('), iter_part.find(')')) else {
            return (result, Some(collection_start));
        };
        if close_paren < open_paren {
            return (result, Some(collection_start));
        }

        let inner = &iter_part[open_paren + 1..close_paren];
        let mut var_start = open_paren + 1;
        for var in inner.split(',') {
            let name = var.trim();
            if is_valid_identifier(name) {
                let leading_spaces = var.len() - var.trim_start().len();
                result.push(ParsedVariable {
                    name: name.to_string(),
                    offset: var_start + leading_spaces,
                    len: name.len(),
                });
            }
            var_start += var.len() + 1;
        }
    } else {
        // item pattern
        let name = iter_part.trim();
        if is_valid_identifier(name) {
            let leading_spaces = iter_part.len() - iter_part.trim_start().len();
            result.push(ParsedVariable {
                name: name.to_string(),
                offset: leading_spaces,
                len: name.len(),
            });
        }
    }

    (result, Some(collection_start))
}

/// Parse ng-init expression for variables
/// e.g. "a = 1" -> [ParsedVariable { name: "a", ... }]
/// e.g. "a = 1; b = 2" -> [ParsedVariable { name: "a", ... }, ParsedVariable { name: "b", ... }]
pub fn parse_ng_init_expression(expr: &str) -> Vec<ParsedVariable> {
    let mut result = Vec::new();
    let mut pos = 0;

    for statement in expr.split(';') {
        if let Some(eq_idx) = statement.find('=') {
            let before_eq = &statement[..eq_idx];
            let after_eq = statement.as_bytes().get(eq_idx + 1).copied();
            // Exclude ==, ===, !=, !==, <=, >=
            let is_comparison = after_eq == Some(b'=')
                || before_eq.ends_with(['!', '<', '>']);
            let lhs = before_eq.trim();
            if !is_comparison && is_valid_identifier(lhs) {
                let leading_spaces = before_eq.len() - before_eq.trim_start().len();
                result.push(ParsedVariable {
                    name: lhs.to_string(),
                    offset: pos + leading_spaces,
                    len: lhs.len(),
                });
            }
        }
        pos += statement.len() + 1; // +1 for semicolon
    }

    result
}
