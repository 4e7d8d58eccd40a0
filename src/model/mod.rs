pub mod hash;
pub mod position;
pub mod symbol;
pub mod table;

pub use hash::ContentHash;
pub use position::{LineCol, LineIndex, SymbolLocation};
pub use symbol::{Symbol, SymbolKind};
pub use table::SymbolTable;
