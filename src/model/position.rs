use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// 0始まりの行・列（列はバイト単位）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineCol {
    pub line: u32,
    pub col: u32,
}

impl LineCol {
    pub fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }
}

impl fmt::Display for LineCol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.col + 1)
    }
}

/// Precomputed line-start table for offset <-> line/column conversion.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        for (offset, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(offset + 1);
            }
        }
        Self {
            line_starts,
            len: text.len(),
        }
    }

    pub fn line_col(&self, offset: usize) -> LineCol {
        let offset = offset.min(self.len);
        let line = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        LineCol {
            line: line as u32,
            col: (offset - self.line_starts[line]) as u32,
        }
    }

    pub fn offset(&self, pos: LineCol) -> Option<usize> {
        let start = *self.line_starts.get(pos.line as usize)?;
        let end = self.line_end(pos.line as usize);
        let offset = start + pos.col as usize;
        (offset <= end).then_some(offset)
    }

    /// LSP 用: UTF-16 の列に変換する
    pub fn utf16_col(&self, text: &str, offset: usize) -> u32 {
        let pos = self.line_col(offset);
        let start = self.line_starts[pos.line as usize];
        text.get(start..start + pos.col as usize)
            .map(|s| s.encode_utf16().count() as u32)
            .unwrap_or(pos.col)
    }

    /// LSP の (line, UTF-16 character) をバイトオフセットに変換する
    pub fn offset_utf16(&self, text: &str, line: u32, character: u32) -> Option<usize> {
        let start = *self.line_starts.get(line as usize)?;
        let end = self.line_end(line as usize);
        let line_text = text.get(start..end)?;

        let mut units = 0u32;
        for (byte_idx, ch) in line_text.char_indices() {
            if units >= character {
                return Some(start + byte_idx);
            }
            units += ch.len_utf16() as u32;
        }
        Some(end)
    }

    fn line_end(&self, line: usize) -> usize {
        self.line_starts
            .get(line + 1)
            .map(|next| next - 1)
            .unwrap_or(self.len)
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

/// A resolved definition/reference location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SymbolLocation {
    pub path: PathBuf,
    pub offset: usize,
    pub len: usize,
    pub line: u32,
    pub column: u32,
    /// UTF-16 column (LSP `character`)
    pub character: u32,
    pub is_definition: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col() {
        let index = LineIndex::new("ab\ncde\n\nf");
        assert_eq!(index.line_col(0), LineCol::new(0, 0));
        assert_eq!(index.line_col(2), LineCol::new(0, 2));
        assert_eq!(index.line_col(3), LineCol::new(1, 0));
        assert_eq!(index.line_col(5), LineCol::new(1, 2));
        assert_eq!(index.line_col(7), LineCol::new(2, 0));
        assert_eq!(index.line_col(8), LineCol::new(3, 0));
        assert_eq!(index.line_count(), 4);
    }

    #[test]
    fn test_offset_round_trip_and_bounds() {
        let index = LineIndex::new("ab\ncde");
        assert_eq!(index.offset(LineCol::new(1, 2)), Some(5));
        assert_eq!(index.offset(LineCol::new(0, 5)), None);
        assert_eq!(index.offset(LineCol::new(4, 0)), None);
    }

    #[test]
    fn test_utf16_columns() {
        let text = "<p>日本 {{title}}</p>";
        let index = LineIndex::new(text);
        let offset = text.find("title").unwrap();
        assert_eq!(index.utf16_col(text, offset), 8);
        assert_eq!(index.offset_utf16(text, 0, 8), Some(offset));
    }

    #[test]
    fn test_display_is_one_based() {
        assert_eq!(LineCol::new(4, 9).to_string(), "5:10");
    }
}
