use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::util::FileKind;

/// エッジがどの経路で作られたか（両方の場合もある）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeOrigin {
    /// マークアップ側の `<script src>`
    pub embed: bool,
    /// スクリプト側の `templateUrl`
    pub template: bool,
}

impl EdgeOrigin {
    fn is_empty(&self) -> bool {
        !self.embed && !self.template
    }
}

#[derive(Debug, Clone, Copy)]
enum Origin {
    Embed,
    Template,
}

impl Origin {
    fn flag(self, origin: &mut EdgeOrigin) -> &mut bool {
        match self {
            Origin::Embed => &mut origin.embed,
            Origin::Template => &mut origin.template,
        }
    }
}

#[derive(Debug, Default)]
struct Edges {
    /// markup -> scripts（追加順）
    forward: HashMap<PathBuf, Vec<PathBuf>>,
    /// script -> markup（追加順）
    reverse: HashMap<PathBuf, Vec<PathBuf>>,
    origins: HashMap<(PathBuf, PathBuf), EdgeOrigin>,
}

impl Edges {
    fn link(&mut self, markup: &Path, script: &Path, origin: Origin) {
        let key = (markup.to_path_buf(), script.to_path_buf());
        let flags = self.origins.entry(key).or_default();
        let was_linked = !flags.is_empty();
        *origin.flag(flags) = true;
        if was_linked {
            return;
        }

        self.forward
            .entry(markup.to_path_buf())
            .or_default()
            .push(script.to_path_buf());
        self.reverse
            .entry(script.to_path_buf())
            .or_default()
            .push(markup.to_path_buf());
    }

    fn unlink(&mut self, markup: &Path, script: &Path, origin: Option<Origin>) {
        let key = (markup.to_path_buf(), script.to_path_buf());
        let Some(flags) = self.origins.get_mut(&key) else {
            return;
        };
        match origin {
            Some(origin) => *origin.flag(flags) = false,
            None => *flags = EdgeOrigin::default(),
        }
        if !flags.is_empty() {
            return;
        }

        self.origins.remove(&key);
        remove_from(&mut self.forward, markup, script);
        remove_from(&mut self.reverse, script, markup);
    }

    fn linked(&self, map: &HashMap<PathBuf, Vec<PathBuf>>, file: &Path, origin: Origin) -> Vec<PathBuf> {
        let Some(targets) = map.get(file) else {
            return Vec::new();
        };
        targets
            .iter()
            .filter(|target| {
                let key = match origin {
                    Origin::Embed => (file.to_path_buf(), (*target).clone()),
                    Origin::Template => ((*target).clone(), file.to_path_buf()),
                };
                self.origins.get(&key).is_some_and(|flags| match origin {
                    Origin::Embed => flags.embed,
                    Origin::Template => flags.template,
                })
            })
            .cloned()
            .collect()
    }
}

fn remove_from(map: &mut HashMap<PathBuf, Vec<PathBuf>>, key: &Path, value: &Path) {
    if let Some(list) = map.get_mut(key) {
        list.retain(|p| p != value);
        if list.is_empty() {
            map.remove(key);
        }
    }
}

/// マークアップ ↔ スクリプトの双方向関連グラフ
///
/// 前方向と逆方向は同じロックの下で更新されるため、読み手が片方向だけの
/// エッジを観測することはない。
#[derive(Debug, Default)]
pub struct AssociationGraph {
    edges: RwLock<Edges>,
}

impl AssociationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Edges> {
        self.edges.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Edges> {
        self.edges.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// マークアップの埋め込みエッジを丸ごと置き換える
    pub fn set(&self, markup: &Path, scripts: &[PathBuf]) {
        let mut edges = self.write();
        let previous = edges.linked(&edges.forward, markup, Origin::Embed);
        for old in previous {
            if !scripts.contains(&old) {
                edges.unlink(markup, &old, Some(Origin::Embed));
            }
        }
        for script in scripts {
            edges.link(markup, script, Origin::Embed);
        }
    }

    /// スクリプトの templateUrl エッジを丸ごと置き換える
    pub fn set_templates(&self, script: &Path, markups: &[PathBuf]) {
        let mut edges = self.write();
        let previous = edges.linked(&edges.reverse, script, Origin::Template);
        for old in previous {
            if !markups.contains(&old) {
                edges.unlink(&old, script, Some(Origin::Template));
            }
        }
        for markup in markups {
            edges.link(markup, script, Origin::Template);
        }
    }

    pub fn scripts_for(&self, markup: &Path) -> Vec<PathBuf> {
        self.read().forward.get(markup).cloned().unwrap_or_default()
    }

    pub fn markup_for(&self, script: &Path) -> Vec<PathBuf> {
        self.read().reverse.get(script).cloned().unwrap_or_default()
    }

    /// ファイルの種類に応じた方向の関連ファイル
    pub fn associated(&self, file: &Path) -> Vec<PathBuf> {
        match FileKind::of(file) {
            Some(FileKind::Markup) => self.scripts_for(file),
            Some(FileKind::Script) => self.markup_for(file),
            None => Vec::new(),
        }
    }

    /// ファイルの種類に応じた方向のエッジをすべて削除する
    pub fn clear_for_file(&self, file: &Path, kind: FileKind) {
        let mut edges = self.write();
        match kind {
            FileKind::Markup => {
                let scripts = edges.forward.get(file).cloned().unwrap_or_default();
                for script in scripts {
                    edges.unlink(file, &script, None);
                }
            }
            FileKind::Script => {
                let markups = edges.reverse.get(file).cloned().unwrap_or_default();
                for markup in markups {
                    edges.unlink(&markup, file, None);
                }
            }
        }
    }

    /// 前方向と逆方向が一致しているか検証する
    pub fn validate(&self) -> bool {
        let edges = self.read();
        let mut valid = true;

        for (markup, scripts) in &edges.forward {
            for script in scripts {
                let mirrored = edges
                    .reverse
                    .get(script)
                    .is_some_and(|markups| markups.contains(markup));
                if !mirrored {
                    warn!("Missing reverse edge: {:?} -> {:?}", script, markup);
                    valid = false;
                }
            }
        }
        for (script, markups) in &edges.reverse {
            for markup in markups {
                let mirrored = edges
                    .forward
                    .get(markup)
                    .is_some_and(|scripts| scripts.contains(script));
                if !mirrored {
                    warn!("Missing forward edge: {:?} -> {:?}", markup, script);
                    valid = false;
                }
            }
        }
        let edge_count: usize = edges.forward.values().map(Vec::len).sum();
        valid && edge_count == edges.origins.len()
    }

    /// スナップショット用: 全エッジ (markup, script, origin)
    pub fn export(&self) -> Vec<(PathBuf, PathBuf, EdgeOrigin)> {
        let edges = self.read();
        let mut exported = Vec::with_capacity(edges.origins.len());
        for (markup, scripts) in &edges.forward {
            for script in scripts {
                if let Some(origin) = edges.origins.get(&(markup.clone(), script.clone())) {
                    exported.push((markup.clone(), script.clone(), *origin));
                }
            }
        }
        exported
    }

    /// スナップショットから復元したエッジを追加する
    pub fn restore(&self, markup: &Path, script: &Path, origin: EdgeOrigin) {
        let mut edges = self.write();
        if origin.embed {
            edges.link(markup, script, Origin::Embed);
        }
        if origin.template {
            edges.link(markup, script, Origin::Template);
        }
    }

    pub fn edge_count(&self) -> usize {
        self.read().origins.len()
    }

    pub fn clear(&self) {
        *self.write() = Edges::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> PathBuf {
        PathBuf::from(s)
    }

    #[test]
    fn test_set_is_bidirectional() {
        let graph = AssociationGraph::new();
        graph.set(&p("/app/index.html"), &[p("/app/app.js"), p("/app/util.js")]);

        assert_eq!(
            graph.scripts_for(&p("/app/index.html")),
            vec![p("/app/app.js"), p("/app/util.js")]
        );
        assert_eq!(graph.markup_for(&p("/app/util.js")), vec![p("/app/index.html")]);
        assert!(graph.validate());
    }

    #[test]
    fn test_set_replaces_previous_edges() {
        let graph = AssociationGraph::new();
        let markup = p("/app/index.html");
        graph.set(&markup, &[p("/app/a.js"), p("/app/b.js")]);
        graph.set(&markup, &[p("/app/b.js"), p("/app/c.js")]);

        assert_eq!(graph.scripts_for(&markup), vec![p("/app/b.js"), p("/app/c.js")]);
        assert!(graph.markup_for(&p("/app/a.js")).is_empty());
        assert!(graph.validate());
    }

    #[test]
    fn test_template_edges_survive_embed_reset() {
        let graph = AssociationGraph::new();
        let markup = p("/app/user.html");
        let script = p("/app/user.js");
        graph.set_templates(&script, &[markup.clone()]);
        graph.set(&markup, &[script.clone()]);
        graph.set(&markup, &[]);

        assert_eq!(graph.scripts_for(&markup), vec![script.clone()]);
        assert_eq!(graph.markup_for(&script), vec![markup.clone()]);

        graph.set_templates(&script, &[]);
        assert!(graph.scripts_for(&markup).is_empty());
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.validate());
    }

    #[test]
    fn test_clear_for_file() {
        let graph = AssociationGraph::new();
        graph.set(&p("/a.html"), &[p("/x.js")]);
        graph.set(&p("/b.html"), &[p("/x.js"), p("/y.js")]);

        graph.clear_for_file(&p("/x.js"), FileKind::Script);
        assert_eq!(graph.scripts_for(&p("/b.html")), vec![p("/y.js")]);
        assert!(graph.scripts_for(&p("/a.html")).is_empty());

        graph.clear_for_file(&p("/b.html"), FileKind::Markup);
        assert!(graph.markup_for(&p("/y.js")).is_empty());
        assert!(graph.validate());
    }

    #[test]
    fn test_export_restore() {
        let graph = AssociationGraph::new();
        graph.set(&p("/a.html"), &[p("/x.js")]);
        graph.set_templates(&p("/y.js"), &[p("/a.html")]);

        let restored = AssociationGraph::new();
        for (markup, script, origin) in graph.export() {
            restored.restore(&markup, &script, origin);
        }
        assert_eq!(restored.edge_count(), 2);
        assert_eq!(restored.associated(&p("/y.js")), vec![p("/a.html")]);
        assert!(restored.validate());
    }
}
