mod progress;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};

use crate::config::AjsConfig;
use crate::error::SnapshotError;
use crate::handler::{DefinitionHandler, ReferencesHandler};
use crate::host::{FsHost, Host};
use crate::indexer::{Indexer, InitializeOutcome};

use progress::IndexingProgress;

pub const REFRESH_INDEX_COMMAND: &str = "angularjs-xref.refreshIndex";

/// 編集後に再解析するまでの待ち時間
const DEBOUNCE: Duration = Duration::from_millis(200);

/// 1ワークスペース分の状態
#[derive(Clone)]
struct Workspace {
    indexer: Indexer,
    host: Arc<FsHost>,
}

pub struct Backend {
    client: Client,
    root: RwLock<Option<PathBuf>>,
    workspace: RwLock<Option<Workspace>>,
    /// 実行中の初期化パスのキャンセル
    indexing: Mutex<Option<CancellationToken>>,
    debounce_versions: Arc<DashMap<PathBuf, u64>>,
}

impl Backend {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            root: RwLock::new(None),
            workspace: RwLock::new(None),
            indexing: Mutex::new(None),
            debounce_versions: Arc::new(DashMap::new()),
        }
    }

    async fn workspace(&self) -> Option<Workspace> {
        self.workspace.read().await.clone()
    }

    /// 初期化パスをバックグラウンドで開始する（実行中のパスはキャンセルする）
    async fn start_indexing(&self, workspace: Workspace) {
        let cancel = CancellationToken::new();
        if let Some(previous) = self.indexing.lock().await.replace(cancel.clone()) {
            previous.cancel();
        }

        let client = self.client.clone();
        tokio::spawn(async move {
            let indexer = workspace.indexer;
            let progress = IndexingProgress::begin(
                &client,
                "angularjs-xref/indexing",
                "Indexing AngularJS",
                Some("Collecting files...".to_string()),
            )
            .await;

            let files = indexer.discover_files().await;
            if indexer.config().cache {
                progress.report("Loading snapshot...".to_string(), 10).await;
                match indexer.load_snapshot(&files).await {
                    Ok(loaded) => tracing::info!("Restored {} files from snapshot", loaded),
                    Err(SnapshotError::NotFound) => tracing::debug!("No snapshot found"),
                    Err(e) => tracing::warn!("Snapshot ignored: {}", e),
                }
            }

            progress
                .report(format!("Parsing {} files...", files.len()), 20)
                .await;
            let message = match indexer.initialize(files, &cancel).await {
                InitializeOutcome::Completed(stats) => format!(
                    "Indexed {} files ({} unchanged, {} failed)",
                    stats.parsed, stats.unchanged, stats.failed
                ),
                InitializeOutcome::Cancelled(stats) => {
                    format!("Indexing cancelled after {} files", stats.total())
                }
            };
            client.log_message(MessageType::INFO, &message).await;
            progress.end(message).await;
        });
    }

    async fn on_change(&self, path: PathBuf, text: String) {
        let Some(workspace) = self.workspace().await else {
            return;
        };
        workspace.host.open_document(path.clone(), text);

        // Increment version counter for debounce
        let ver = {
            let mut entry = self.debounce_versions.entry(path.clone()).or_insert(0);
            *entry += 1;
            *entry
        };

        let debounce_versions = Arc::clone(&self.debounce_versions);
        tokio::spawn(async move {
            tokio::time::sleep(DEBOUNCE).await;

            // Check version: skip if a newer keystroke has arrived
            if debounce_versions.get(&path).map(|v| *v) != Some(ver) {
                return;
            }
            workspace.indexer.update_index(&path).await;
        });
    }

    async fn register_file_watchers(&self) {
        let options = DidChangeWatchedFilesRegistrationOptions {
            watchers: vec![FileSystemWatcher {
                glob_pattern: GlobPattern::String("**/*.{html,htm,js}".to_string()),
                kind: None,
            }],
        };
        let register_options = match serde_json::to_value(options) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Failed to encode watcher options: {}", e);
                return;
            }
        };

        let registration = Registration {
            id: "angularjs-xref-watcher".to_string(),
            method: "workspace/didChangeWatchedFiles".to_string(),
            register_options: Some(register_options),
        };
        if let Err(e) = self.client.register_capability(vec![registration]).await {
            tracing::debug!("File watcher registration failed: {}", e);
        }
    }
}

fn file_path(uri: &Url) -> Option<PathBuf> {
    uri.to_file_path().ok()
}

fn is_indexed(path: &Path) -> bool {
    crate::util::FileKind::of(path).is_some()
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        let root = params
            .root_uri
            .or_else(|| {
                params
                    .workspace_folders
                    .as_ref()?
                    .first()
                    .map(|f| f.uri.clone())
            })
            .and_then(|uri| uri.to_file_path().ok());

        *self.root.write().await = root;

        Ok(InitializeResult {
            server_info: Some(ServerInfo {
                name: "angularjs-xref".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Options(
                    TextDocumentSyncOptions {
                        open_close: Some(true),
                        change: Some(TextDocumentSyncKind::FULL),
                        save: Some(TextDocumentSyncSaveOptions::Supported(true)),
                        ..Default::default()
                    },
                )),
                references_provider: Some(OneOf::Left(true)),
                definition_provider: Some(OneOf::Left(true)),
                execute_command_provider: Some(ExecuteCommandOptions {
                    commands: vec![REFRESH_INDEX_COMMAND.to_string()],
                    work_done_progress_options: Default::default(),
                }),
                ..Default::default()
            },
        })
    }

    async fn initialized(&self, _params: InitializedParams) {
        let Some(root) = self.root.read().await.clone() else {
            self.client
                .log_message(MessageType::WARNING, "No workspace root; indexing disabled")
                .await;
            return;
        };

        let config = AjsConfig::load_from_dir(&root);
        self.client
            .log_message(
                MessageType::INFO,
                format!(
                    "Interpolate symbols: {} ... {}",
                    config.interpolate.start_symbol, config.interpolate.end_symbol
                ),
            )
            .await;

        let host = Arc::new(FsHost::new(root.clone()));
        let shared: Arc<dyn Host> = host.clone();
        let indexer = match Indexer::new(config, root, shared) {
            Ok(indexer) => indexer,
            Err(e) => {
                self.client
                    .log_message(MessageType::ERROR, format!("Invalid configuration: {}", e))
                    .await;
                return;
            }
        };

        let workspace = Workspace { indexer, host };
        *self.workspace.write().await = Some(workspace.clone());

        self.register_file_watchers().await;
        self.start_indexing(workspace).await;
    }

    async fn shutdown(&self) -> Result<()> {
        if let Some(cancel) = self.indexing.lock().await.take() {
            cancel.cancel();
        }

        if let Some(workspace) = self.workspace().await {
            if workspace.indexer.config().cache {
                match workspace.indexer.save_snapshot().await {
                    Ok(()) => tracing::info!("Snapshot saved on shutdown"),
                    Err(e) => tracing::warn!("Failed to save snapshot on shutdown: {}", e),
                }
            }
        }
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let Some(path) = file_path(&params.text_document.uri).filter(|p| is_indexed(p)) else {
            return;
        };
        let Some(workspace) = self.workspace().await else {
            return;
        };
        workspace
            .host
            .open_document(path.clone(), params.text_document.text);
        self.debounce_versions.insert(path.clone(), 0);
        workspace.indexer.parse_file(&path).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let Some(path) = file_path(&params.text_document.uri).filter(|p| is_indexed(p)) else {
            return;
        };
        if let Some(change) = params.content_changes.into_iter().last() {
            self.on_change(path, change.text).await;
        }
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        let Some(path) = file_path(&params.text_document.uri).filter(|p| is_indexed(p)) else {
            return;
        };
        if let Some(workspace) = self.workspace().await {
            workspace.indexer.parse_file(&path).await;
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let Some(path) = file_path(&params.text_document.uri).filter(|p| is_indexed(p)) else {
            return;
        };
        self.debounce_versions.remove(&path);
        if let Some(workspace) = self.workspace().await {
            workspace.host.close_document(&path);
            workspace.indexer.update_index(&path).await;
        }
    }

    async fn did_change_watched_files(&self, params: DidChangeWatchedFilesParams) {
        let Some(workspace) = self.workspace().await else {
            return;
        };
        for change in params.changes {
            let Some(path) = file_path(&change.uri).filter(|p| is_indexed(p)) else {
                continue;
            };
            if change.typ == FileChangeType::DELETED {
                workspace.indexer.remove_file(&path);
            } else {
                workspace.indexer.parse_file(&path).await;
            }
        }
    }

    async fn references(&self, params: ReferenceParams) -> Result<Option<Vec<Location>>> {
        let Some(workspace) = self.workspace().await else {
            return Ok(None);
        };
        let handler = ReferencesHandler::new(workspace.indexer);
        Ok(handler.find_references(params).await)
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let Some(workspace) = self.workspace().await else {
            return Ok(None);
        };
        let handler = DefinitionHandler::new(workspace.indexer);
        Ok(handler.goto_definition(params).await)
    }

    async fn execute_command(
        &self,
        params: ExecuteCommandParams,
    ) -> Result<Option<serde_json::Value>> {
        match params.command.as_str() {
            REFRESH_INDEX_COMMAND => {
                let Some(workspace) = self.workspace().await else {
                    return Ok(None);
                };
                self.client
                    .log_message(MessageType::INFO, "Refreshing AngularJS index...")
                    .await;

                workspace.indexer.index().clear();
                self.start_indexing(workspace).await;

                Ok(Some(serde_json::json!({ "success": true })))
            }
            _ => {
                self.client
                    .log_message(
                        MessageType::WARNING,
                        format!("Unknown command: {}", params.command),
                    )
                    .await;
                Ok(None)
            }
        }
    }
}
