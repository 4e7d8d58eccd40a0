use tower_lsp::lsp_types::*;
use tracing::debug;

use super::to_lsp_location;
use crate::indexer::Indexer;

pub struct DefinitionHandler {
    indexer: Indexer,
}

impl DefinitionHandler {
    pub fn new(indexer: Indexer) -> Self {
        Self { indexer }
    }

    pub async fn goto_definition(&self, params: GotoDefinitionParams) -> Option<GotoDefinitionResponse> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;
        let path = uri.to_file_path().ok()?;

        let offset = self
            .indexer
            .offset_at(&path, position.line, position.character)
            .await?;
        let locations: Vec<Location> = self
            .indexer
            .provide_definition(&path, offset)
            .await
            .iter()
            .filter_map(to_lsp_location)
            .collect();

        debug!("goto_definition {}:{} -> {} locations", uri, position.line, locations.len());
        match locations.len() {
            0 => None,
            1 => locations.into_iter().next().map(GotoDefinitionResponse::Scalar),
            _ => Some(GotoDefinitionResponse::Array(locations)),
        }
    }
}
