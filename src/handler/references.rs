use tower_lsp::lsp_types::*;
use tracing::debug;

use super::to_lsp_location;
use crate::indexer::Indexer;

pub struct ReferencesHandler {
    indexer: Indexer,
}

impl ReferencesHandler {
    pub fn new(indexer: Indexer) -> Self {
        Self { indexer }
    }

    pub async fn find_references(&self, params: ReferenceParams) -> Option<Vec<Location>> {
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;
        let include_declaration = params.context.include_declaration;
        let path = uri.to_file_path().ok()?;

        let offset = self
            .indexer
            .offset_at(&path, position.line, position.character)
            .await?;
        let locations: Vec<Location> = self
            .indexer
            .provide_references(&path, offset)
            .await
            .iter()
            .filter(|location| include_declaration || !location.is_definition)
            .filter_map(to_lsp_location)
            .collect();

        debug!("references {}:{} -> {} locations", uri, position.line, locations.len());
        if locations.is_empty() {
            None
        } else {
            Some(locations)
        }
    }
}
