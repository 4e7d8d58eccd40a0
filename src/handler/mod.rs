mod definition;
mod references;
pub mod resolve;
pub mod token;

pub use definition::DefinitionHandler;
pub use references::ReferencesHandler;

use tower_lsp::lsp_types::{Location, Position, Range, Url};

use crate::model::SymbolLocation;

/// 検索結果を LSP の Location に変換する
pub(crate) fn to_lsp_location(location: &SymbolLocation) -> Option<Location> {
    let uri = Url::from_file_path(&location.path).ok()?;
    let start = Position::new(location.line, location.character);
    let end = Position::new(location.line, location.character + location.len as u32);
    Some(Location::new(uri, Range::new(start, end)))
}
