//! インデックス構築と問い合わせの入口
//!
//! ファイル読み込みと解析は `spawn_blocking` で行い、結果はファイル単位の
//! 置き換えで Symbol Cache と関連グラフに反映する。

mod scheduler;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use globset::GlobSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub use scheduler::{ParseScheduler, ScheduleRun};

use crate::analyzer::{InFlight, InFlightGuard, MarkupParser, PathResolver, ScriptParser};
use crate::cache::{CacheLoader, CacheWriter};
use crate::config::{build_glob_set, AjsConfig, PathMatcher};
use crate::error::{AnalyzerError, ConfigError, SnapshotError};
use crate::handler::resolve::{Hit, Resolution};
use crate::handler::token::{chain_at, normalize_chain};
use crate::host::Host;
use crate::index::{CacheEntry, Index};
use crate::model::{ContentHash, LineCol, LineIndex, SymbolLocation, SymbolTable};
use crate::util::FileKind;

/// インデックス対象のファイル
const SOURCE_PATTERN: &str = "**/*.{html,htm,js}";

/// 1ファイルの解析結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseOutcome {
    /// 解析してキャッシュを置き換えた
    Parsed,
    /// 内容ハッシュが一致したためキャッシュをそのまま使った
    Unchanged,
    /// 同じファイルを解析中だった
    InFlight,
    /// マークアップでもスクリプトでもない
    Ignored,
    /// 読み込みまたは解析に失敗した（空のテーブルで置き換える）
    Failed,
}

/// 初期化パスの集計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub parsed: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl IndexStats {
    fn record(&mut self, outcome: ParseOutcome) {
        match outcome {
            ParseOutcome::Parsed => self.parsed += 1,
            ParseOutcome::Unchanged => self.unchanged += 1,
            ParseOutcome::InFlight | ParseOutcome::Ignored => self.skipped += 1,
            ParseOutcome::Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.parsed + self.unchanged + self.skipped + self.failed
    }
}

/// `initialize` の結果。キャンセルはエラーではない
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitializeOutcome {
    Completed(IndexStats),
    Cancelled(IndexStats),
}

impl InitializeOutcome {
    pub fn stats(&self) -> IndexStats {
        match self {
            InitializeOutcome::Completed(stats) | InitializeOutcome::Cancelled(stats) => *stats,
        }
    }
}

/// spawn_blocking 内の解析結果
enum Analysis {
    Markup {
        table: SymbolTable,
        scripts: Vec<PathBuf>,
    },
    Script {
        table: SymbolTable,
        templates: Vec<PathBuf>,
    },
}

/// AngularJS ワークスペースのインデクサ
#[derive(Clone)]
pub struct Indexer {
    config: Arc<AjsConfig>,
    root: PathBuf,
    host: Arc<dyn Host>,
    index: Arc<Index>,
    scripts: Arc<ScriptParser>,
    markup: Arc<MarkupParser>,
    resolver: Arc<PathResolver>,
    /// 読み込みから反映までを含めた解析中ファイル
    parsing: InFlight,
    pattern: Arc<GlobSet>,
    matcher: Arc<PathMatcher>,
    scheduler: ParseScheduler,
}

impl Indexer {
    pub fn new(config: AjsConfig, root: PathBuf, host: Arc<dyn Host>) -> Result<Self, ConfigError> {
        config.validate()?;

        let resolver = Arc::new(PathResolver::new(root.clone(), Arc::clone(&host), &config)?);
        let scripts = Arc::new(ScriptParser::new(&config));
        let markup = Arc::new(MarkupParser::new(
            Arc::clone(&scripts),
            Arc::clone(&resolver),
            &config,
        ));

        Ok(Self {
            index: Arc::new(Index::new(&config)),
            pattern: Arc::new(build_glob_set(&[SOURCE_PATTERN.to_string()])?),
            matcher: Arc::new(config.create_path_matcher()?),
            scheduler: ParseScheduler::new(config.parse.max_concurrent),
            config: Arc::new(config),
            root,
            host,
            scripts,
            markup,
            resolver,
            parsing: InFlight::new(),
        })
    }

    pub fn config(&self) -> &AjsConfig {
        &self.config
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    /// ワークスペース内のマークアップ・スクリプトを列挙する
    pub async fn discover_files(&self) -> Vec<PathBuf> {
        let host = Arc::clone(&self.host);
        let pattern = Arc::clone(&self.pattern);
        let matcher = Arc::clone(&self.matcher);
        tokio::task::spawn_blocking(move || host.find_files(&pattern, &matcher))
            .await
            .unwrap_or_else(|e| {
                warn!("File discovery failed: {}", e);
                Vec::new()
            })
    }

    // ========== Indexing ==========

    /// 関連付けを作ってから全ファイルを解析する
    ///
    /// マークアップを先に解析し、そこで見つかったスクリプトは同じタスク内で続けて
    /// 解析する。残りのスクリプトはその後のバッチで処理する。
    pub async fn initialize(&self, files: Vec<PathBuf>, cancel: &CancellationToken) -> InitializeOutcome {
        let (markup, scripts): (Vec<_>, Vec<_>) = files
            .into_iter()
            .filter(|path| FileKind::of(path).is_some())
            .partition(|path| FileKind::of(path) == Some(FileKind::Markup));

        info!(
            "Indexing {} markup and {} script files (batch size {})",
            markup.len(),
            scripts.len(),
            self.scheduler.batch_size()
        );

        let mut stats = IndexStats::default();

        let indexer = self.clone();
        let run = self
            .scheduler
            .run(markup, cancel, move |path| {
                let indexer = indexer.clone();
                async move { indexer.parse_file(&path).await }
            })
            .await;
        for outcomes in run.outputs {
            outcomes.into_iter().for_each(|outcome| stats.record(outcome));
        }
        if run.cancelled {
            info!("Indexing cancelled after {} files", stats.total());
            return InitializeOutcome::Cancelled(stats);
        }

        let indexer = self.clone();
        let run = self
            .scheduler
            .run(scripts, cancel, move |path| {
                let indexer = indexer.clone();
                async move { indexer.update_index(&path).await }
            })
            .await;
        run.outputs.into_iter().for_each(|outcome| stats.record(outcome));
        if run.cancelled {
            info!("Indexing cancelled after {} files", stats.total());
            return InitializeOutcome::Cancelled(stats);
        }

        info!(
            "Indexing complete: {} parsed, {} unchanged, {} failed, {} edges",
            stats.parsed,
            stats.unchanged,
            stats.failed,
            self.index.associations.edge_count()
        );
        InitializeOutcome::Completed(stats)
    }

    /// 1ファイルを解析する。マークアップの場合は関連スクリプトも続けて解析する
    ///
    /// 戻り値の先頭が `path` 自身の結果
    pub async fn parse_file(&self, path: &Path) -> Vec<ParseOutcome> {
        let (outcome, scripts) = self.refresh(path).await;
        let mut outcomes = vec![outcome];
        for script in scripts {
            outcomes.push(self.refresh(&script).await.0);
        }
        outcomes
    }

    /// 1ファイルだけを解析し直す（関連ファイルへは波及しない）
    pub async fn update_index(&self, path: &Path) -> ParseOutcome {
        self.refresh(path).await.0
    }

    /// ファイルの削除: 関連エッジとキャッシュを消す
    pub fn remove_file(&self, path: &Path) {
        if let Some(kind) = FileKind::of(path) {
            self.index.associations.clear_for_file(path, kind);
        }
        self.index.symbols.remove(path);
        debug!("Removed {:?} from index", path);
    }

    /// 必要なら解析してキャッシュを更新する
    ///
    /// 2番目の値は、マークアップの場合に現在関連付けられているスクリプト
    async fn refresh(&self, path: &Path) -> (ParseOutcome, Vec<PathBuf>) {
        let Some(kind) = FileKind::of(path) else {
            return (ParseOutcome::Ignored, Vec::new());
        };
        let Some(guard) = self.parsing.try_begin(path) else {
            debug!("{:?} is already being parsed", path);
            return (ParseOutcome::InFlight, Vec::new());
        };

        let (text, mtime) = match self.read(path).await {
            Ok(read) => read,
            Err(e) => {
                warn!("{}", e);
                return (ParseOutcome::Failed, Vec::new());
            }
        };

        let hash = ContentHash::of(&text);
        if self.index.symbols.get_fresh(path, &hash).is_some() {
            return (ParseOutcome::Unchanged, self.current_scripts(path, kind));
        }

        // 時間切れの場合、ガードは打ち切られた解析タスクが終わるまで保持される
        let (_guard, analyzed) = self.analyze(path, kind, text, guard).await;
        let (table, outcome) = match analyzed {
            Ok(Analysis::Markup { table, scripts }) => {
                self.index.associations.set(path, &scripts);
                (table, ParseOutcome::Parsed)
            }
            Ok(Analysis::Script { table, templates }) => {
                self.index.associations.set_templates(path, &templates);
                (table, ParseOutcome::Parsed)
            }
            Err(e) => {
                warn!("{}", e);
                match kind {
                    FileKind::Markup => self.index.associations.set(path, &[]),
                    FileKind::Script => self.index.associations.set_templates(path, &[]),
                }
                // 時間切れは内容ハッシュに紐付けない（次回の要求で再解析する）
                if matches!(e, AnalyzerError::Timeout { .. }) {
                    self.index.symbols.remove(path);
                    return (ParseOutcome::Failed, Vec::new());
                }
                (SymbolTable::new(path), ParseOutcome::Failed)
            }
        };

        debug!("Indexed {:?}: {} symbols", path, table.len());
        self.index.symbols.insert(
            path.to_path_buf(),
            CacheEntry {
                table: Arc::new(table),
                content_hash: hash,
                mtime,
            },
        );

        (outcome, self.current_scripts(path, kind))
    }

    fn current_scripts(&self, path: &Path, kind: FileKind) -> Vec<PathBuf> {
        match kind {
            FileKind::Markup => self.index.associations.scripts_for(path),
            FileKind::Script => Vec::new(),
        }
    }

    async fn read(&self, path: &Path) -> Result<(String, Option<u64>), AnalyzerError> {
        let host = Arc::clone(&self.host);
        let owned = path.to_path_buf();
        let joined = tokio::task::spawn_blocking(move || -> Result<_, AnalyzerError> {
            let text = host.read_text(&owned).map_err(|source| AnalyzerError::Io {
                path: owned.clone(),
                source,
            })?;
            Ok((text, host.stat_mtime(&owned)))
        })
        .await;

        joined.unwrap_or_else(|e| Err(AnalyzerError::Parse(format!("read task failed: {}", e))))
    }

    /// 解析を時間制限付きで実行する
    ///
    /// `guard` は解析タスクに渡され、完了した場合のみ返される
    async fn analyze(
        &self,
        path: &Path,
        kind: FileKind,
        text: String,
        guard: InFlightGuard,
    ) -> (Option<InFlightGuard>, Result<Analysis, AnalyzerError>) {
        let owned = path.to_path_buf();
        let markup = Arc::clone(&self.markup);
        let scripts = Arc::clone(&self.scripts);
        let resolver = Arc::clone(&self.resolver);

        let task = tokio::task::spawn_blocking(move || {
            let analyzed = Self::analyze_blocking(&owned, kind, &text, &markup, &scripts, &resolver);
            (guard, analyzed)
        });

        let budget = self.config.parse.timeout();
        match tokio::time::timeout(budget, task).await {
            Ok(Ok((guard, result))) => (Some(guard), result),
            Ok(Err(e)) => (
                None,
                Err(AnalyzerError::Parse(format!("parse task failed: {}", e))),
            ),
            Err(_) => (
                None,
                Err(AnalyzerError::Timeout {
                    path: path.to_path_buf(),
                    budget_ms: budget.as_millis() as u64,
                }),
            ),
        }
    }

    fn analyze_blocking(
        owned: &Path,
        kind: FileKind,
        text: &str,
        markup: &MarkupParser,
        scripts: &ScriptParser,
        resolver: &PathResolver,
    ) -> Result<Analysis, AnalyzerError> {
        match kind {
            FileKind::Markup => {
                let parsed = markup.parse(owned, text)?;
                Ok(Analysis::Markup {
                    table: parsed.table,
                    scripts: parsed.scripts,
                })
            }
            FileKind::Script => {
                let parsed = scripts.parse(owned, text)?;
                let mut templates: Vec<PathBuf> = Vec::new();
                for url in &parsed.template_urls {
                    if let Some(resolved) = resolver.resolve(owned, url) {
                        if !templates.contains(&resolved) {
                            templates.push(resolved);
                        }
                    }
                }
                Ok(Analysis::Script {
                    table: parsed.table,
                    templates,
                })
            }
        }
    }

    // ========== Queries ==========

    /// キャッシュ済みのテーブル。なければ空のテーブル
    pub fn get_symbol_table(&self, path: &Path) -> Arc<SymbolTable> {
        self.index
            .symbols
            .get(path)
            .map(|entry| entry.table)
            .unwrap_or_else(|| Arc::new(SymbolTable::new(path)))
    }

    pub fn get_associated_scripts(&self, markup: &Path) -> Vec<PathBuf> {
        self.index.associations.scripts_for(markup)
    }

    pub fn get_associated_markup(&self, script: &Path) -> Vec<PathBuf> {
        self.index.associations.markup_for(script)
    }

    /// バイトオフセットを行・列に変換する
    pub async fn resolve_position(&self, path: &Path, offset: usize) -> Option<LineCol> {
        let (text, _) = self.read(path).await.ok()?;
        Some(LineIndex::new(&text).line_col(offset))
    }

    /// LSP の (line, UTF-16 character) をバイトオフセットに変換する
    pub async fn offset_at(&self, path: &Path, line: u32, character: u32) -> Option<usize> {
        let (text, _) = self.read(path).await.ok()?;
        LineIndex::new(&text).offset_utf16(&text, line, character)
    }

    pub async fn provide_definition(&self, path: &Path, offset: usize) -> Vec<SymbolLocation> {
        let Some((kind, resolution)) = self.resolve_at(path, offset).await else {
            return Vec::new();
        };
        self.locate(resolution.into_definitions(kind)).await
    }

    pub async fn provide_references(&self, path: &Path, offset: usize) -> Vec<SymbolLocation> {
        let Some((_, resolution)) = self.resolve_at(path, offset).await else {
            return Vec::new();
        };
        self.locate(resolution.into_merged()).await
    }

    /// カーソル位置のシンボル名を求め、現在のファイル → 関連ファイル →
    /// （定義がなければ）ワークスペース全体の順に探す
    async fn resolve_at(&self, path: &Path, offset: usize) -> Option<(FileKind, Resolution)> {
        let kind = FileKind::of(path)?;
        let (text, _) = match self.read(path).await {
            Ok(read) => read,
            Err(e) => {
                warn!("{}", e);
                return None;
            }
        };
        let (chain, _) = chain_at(&text, offset)?;

        self.update_index(path).await;
        let table = self.get_symbol_table(path);

        let mut searched: HashSet<PathBuf> = HashSet::new();
        searched.insert(path.to_path_buf());
        let mut associated_tables = Vec::new();
        for associated in self.index.associations.associated(path) {
            if !searched.insert(associated.clone()) {
                continue;
            }
            self.update_index(&associated).await;
            let associated_table = self.get_symbol_table(&associated);
            associated_tables.push((associated, associated_table));
        }

        // controllerAs 等の別名は登録側のスクリプトにあり、使う側はテンプレート
        let mut roots: HashSet<String> = self.config.conventions.roots().map(str::to_string).collect();
        for source in std::iter::once(&table).chain(associated_tables.iter().map(|(_, t)| t)) {
            roots.extend(source.aliases().map(|alias| alias.name.clone()));
        }
        let name = normalize_chain(chain, &roots);
        debug!("Resolving '{}' from {:?}", name, path);

        let mut resolution = Resolution::new();
        resolution.collect(path, &table, &name);
        for (associated, associated_table) in &associated_tables {
            resolution.collect(associated, associated_table, &name);
        }

        if self.config.workspace_fallback && !resolution.has_definitions() {
            for (other, entry) in self.index.symbols.entries() {
                if searched.contains(&other) {
                    continue;
                }
                resolution.collect_definitions(&other, &entry.table, &name);
            }
        }

        Some((kind, resolution))
    }

    /// 検索結果を行・列付きの位置に変換する
    async fn locate(&self, hits: Vec<Hit>) -> Vec<SymbolLocation> {
        let mut line_indexes: HashMap<PathBuf, Option<(String, LineIndex)>> = HashMap::new();
        let mut locations = Vec::with_capacity(hits.len());

        for hit in hits {
            if !line_indexes.contains_key(&hit.path) {
                let loaded = self
                    .read(&hit.path)
                    .await
                    .ok()
                    .map(|(text, _)| {
                        let index = LineIndex::new(&text);
                        (text, index)
                    });
                line_indexes.insert(hit.path.clone(), loaded);
            }
            let Some(Some((text, line_index))) = line_indexes.get(&hit.path) else {
                continue;
            };

            let pos = line_index.line_col(hit.symbol.offset);
            locations.push(SymbolLocation {
                offset: hit.symbol.offset,
                len: hit.symbol.leaf_len(),
                line: pos.line,
                column: pos.col,
                character: line_index.utf16_col(text, hit.symbol.offset),
                is_definition: hit.is_definition,
                path: hit.path,
            });
        }

        locations
    }

    // ========== Snapshot ==========

    /// 保存済みスナップショットから更新時刻が一致するファイルを復元する
    pub async fn load_snapshot(&self, files: &[PathBuf]) -> Result<usize, SnapshotError> {
        let host = Arc::clone(&self.host);
        let index = Arc::clone(&self.index);
        let root = self.root.clone();
        let files = files.to_vec();

        tokio::task::spawn_blocking(move || -> Result<usize, SnapshotError> {
            let stamped: Vec<(PathBuf, u64)> = files
                .into_iter()
                .filter_map(|path| {
                    let mtime = host.stat_mtime(&path)?;
                    Some((path, mtime))
                })
                .collect();
            let loader = CacheLoader::new(&root);
            let validation = loader.validate(&stamped)?;
            loader.load(&index, &validation)
        })
        .await
        .map_err(|e| SnapshotError::Io(std::io::Error::other(e)))?
    }

    /// 現在のインデックスをスナップショットとして保存する
    pub async fn save_snapshot(&self) -> Result<(), SnapshotError> {
        let index = Arc::clone(&self.index);
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || CacheWriter::new(&root).save_full(&index))
            .await
            .map_err(|e| SnapshotError::Io(std::io::Error::other(e)))?
    }
}
