//! Folder workspace: one manifest plus every tree file sharing a directory.
//!
//! A [`TreeWorkspace`] owns the parsed [`BehaviorTree`]s for all `.tree`
//! files in one folder, the declared-name lists loaded from `btrees.json`,
//! and the derived used-name sets. Opening a workspace kicks off an async
//! initialization pass (manifest load, directory scan, parse of every
//! discovered file); [`TreeWorkspace::ready`] awaits its completion.
//!
//! ```text
//! Uninitialized ──open──▶ Loading ──scan+parse done──▶ Ready
//! ```
//!
//! Used sets are recomputed from scratch on every upsert rather than
//! incrementally patched; folders hold a handful of small files, so the
//! rescan is cheap and immune to edit-order bugs.
//!
//! Change notification is synchronous: an upsert fires
//! [`WorkspaceTreeEvent`] to all subscribers before it returns, and
//! lifecycle transitions fire [`WorkspaceEvent`].

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use futures::future::join_all;
use indexmap::{IndexMap, IndexSet};
use parking_lot::Mutex;

use crate::ast::BehaviorTree;
use crate::error::Result;
use crate::events::{EventEmitter, Subscription};
use crate::manifest;
use crate::parser;
use crate::symbols::{SymbolKind, SymbolLocation};

/// File extension of tree sources, without the dot.
pub const TREE_EXTENSION: &str = "tree";

/// Lifecycle of a workspace. `Ready` means the initial directory scan and
/// manifest load have completed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkspaceState {
    Uninitialized,
    Loading,
    Ready,
}

/// A tree was inserted or replaced.
#[derive(Clone)]
pub struct WorkspaceTreeEvent {
    pub workspace: Arc<TreeWorkspace>,
    pub path: PathBuf,
    pub tree: Arc<BehaviorTree>,
}

impl fmt::Debug for WorkspaceTreeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkspaceTreeEvent")
            .field("path", &self.path)
            .finish()
    }
}

/// A workspace lifecycle notification.
#[derive(Clone)]
pub struct WorkspaceEvent {
    pub workspace: Arc<TreeWorkspace>,
    pub kind: WorkspaceEventKind,
}

impl fmt::Debug for WorkspaceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkspaceEvent")
            .field("kind", &self.kind)
            .finish()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkspaceEventKind {
    /// First transition into `Ready`. Fired exactly once.
    Initialized,
    /// `btrees.json` was re-read after a change, creation, or deletion.
    ManifestReloaded,
}

struct WorkspaceData {
    state: WorkspaceState,
    trees: IndexMap<PathBuf, Arc<BehaviorTree>>,
    actions_used: IndexSet<String>,
    conditions_used: IndexSet<String>,
    actions_declared: Option<Vec<String>>,
    conditions_declared: Option<Vec<String>>,
}

/// All tree and manifest state for one folder. Constructed through
/// [`TreeWorkspace::open`]; shared by `Arc` so events can carry their
/// source workspace.
pub struct TreeWorkspace {
    folder: PathBuf,
    weak: Weak<TreeWorkspace>,
    data: Mutex<WorkspaceData>,
    tree_events: EventEmitter<WorkspaceTreeEvent>,
    events: EventEmitter<WorkspaceEvent>,
}

impl fmt::Debug for TreeWorkspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.data.lock();
        f.debug_struct("TreeWorkspace")
            .field("folder", &self.folder)
            .field("state", &data.state)
            .field("trees", &data.trees.len())
            .finish()
    }
}

impl TreeWorkspace {
    /// Create the workspace and start its initialization scan in the
    /// background. Await [`ready`](Self::ready) before relying on the
    /// initial folder contents.
    pub fn open(folder: impl Into<PathBuf>) -> Arc<Self> {
        let workspace = Arc::new_cyclic(|weak| TreeWorkspace {
            folder: folder.into(),
            weak: weak.clone(),
            data: Mutex::new(WorkspaceData {
                state: WorkspaceState::Uninitialized,
                trees: IndexMap::new(),
                actions_used: IndexSet::new(),
                conditions_used: IndexSet::new(),
                actions_declared: None,
                conditions_declared: None,
            }),
            tree_events: EventEmitter::new(),
            events: EventEmitter::new(),
        });
        let init = workspace.clone();
        tokio::spawn(async move { init.initialize().await });
        workspace
    }

    async fn initialize(self: &Arc<Self>) {
        self.data.lock().state = WorkspaceState::Loading;
        self.load_manifest().await;

        let files = discover_tree_files(&self.folder).await;
        let reads = files.into_iter().map(|path| async move {
            let text = tokio::fs::read_to_string(&path).await;
            (path, text)
        });
        for (path, text) in join_all(reads).await {
            match text {
                Ok(text) => self.upsert(path, Arc::new(parser::parse(&text))),
                Err(error) => log::warn!("skipping {}: {error}", path.display()),
            }
        }

        self.data.lock().state = WorkspaceState::Ready;
        self.emit_event(WorkspaceEventKind::Initialized);
    }

    pub fn folder_path(&self) -> &Path {
        &self.folder
    }

    pub fn state(&self) -> WorkspaceState {
        self.data.lock().state
    }

    pub fn initialized(&self) -> bool {
        self.state() == WorkspaceState::Ready
    }

    /// Resolve once the initialization scan has finished. Returns
    /// immediately on an already-ready workspace.
    pub async fn ready(self: &Arc<Self>) {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let _guard = self.events.subscribe(move |event: &WorkspaceEvent| {
            if event.kind == WorkspaceEventKind::Initialized {
                let _ = tx.send(());
            }
        });
        // Subscribe before checking so the transition cannot slip between.
        if self.initialized() {
            return;
        }
        let _ = rx.recv().await;
    }

    // ------------------------------------------------------------------
    // Trees
    // ------------------------------------------------------------------

    pub fn tree(&self, path: &Path) -> Option<Arc<BehaviorTree>> {
        self.data.lock().trees.get(path).cloned()
    }

    pub fn tree_paths(&self) -> Vec<PathBuf> {
        self.data.lock().trees.keys().cloned().collect()
    }

    pub fn trees(&self) -> Vec<(PathBuf, Arc<BehaviorTree>)> {
        self.data
            .lock()
            .trees
            .iter()
            .map(|(path, tree)| (path.clone(), tree.clone()))
            .collect()
    }

    /// Insert or replace the tree for a document, recompute the used-name
    /// sets, and notify subscribers.
    pub fn upsert(&self, path: impl Into<PathBuf>, tree: Arc<BehaviorTree>) {
        let path = path.into();
        {
            let mut data = self.data.lock();
            data.trees.insert(path.clone(), tree.clone());
            recompute_used(&mut data);
        }
        if let Some(workspace) = self.weak.upgrade() {
            self.tree_events.emit(&WorkspaceTreeEvent {
                workspace,
                path,
                tree,
            });
        }
    }

    // ------------------------------------------------------------------
    // Used and declared names
    // ------------------------------------------------------------------

    pub fn actions_used(&self) -> Vec<String> {
        self.data.lock().actions_used.iter().cloned().collect()
    }

    pub fn conditions_used(&self) -> Vec<String> {
        self.data.lock().conditions_used.iter().cloned().collect()
    }

    /// Declared action names, `None` when the folder has no restriction
    /// configured (no manifest, or a manifest without an `actions` key).
    pub fn actions_declared(&self) -> Option<Vec<String>> {
        self.data.lock().actions_declared.clone()
    }

    pub fn conditions_declared(&self) -> Option<Vec<String>> {
        self.data.lock().conditions_declared.clone()
    }

    /// Action names a tree uses without a declaration.
    ///
    /// Nothing is flagged while no action restriction is configured. A name
    /// matching the stem of any tree file in the folder is exempt: a tree
    /// may be invoked as an action by its filename.
    pub fn undeclared_actions(&self, tree: &BehaviorTree) -> Vec<String> {
        let data = self.data.lock();
        let declared = match &data.actions_declared {
            Some(declared) => declared,
            None => return Vec::new(),
        };
        let stems = tree_file_stems(&data.trees);
        tree.action_names()
            .filter(|name| !declared.iter().any(|d| d == name))
            .filter(|name| !stems.contains(*name))
            .map(str::to_string)
            .collect()
    }

    /// Condition names a tree uses without a declaration. Conditions have
    /// no filename exemption.
    pub fn undeclared_conditions(&self, tree: &BehaviorTree) -> Vec<String> {
        let data = self.data.lock();
        let declared = match &data.conditions_declared {
            Some(declared) => declared,
            None => return Vec::new(),
        };
        tree.condition_names()
            .filter(|name| !declared.iter().any(|d| d == name))
            .map(str::to_string)
            .collect()
    }

    /// Every usage occurrence of a name across the folder's trees.
    pub fn usage_sites(&self, kind: SymbolKind, name: &str) -> Vec<SymbolLocation> {
        let data = self.data.lock();
        let mut sites = Vec::new();
        for (path, tree) in &data.trees {
            let occurrences = match kind {
                SymbolKind::Action => tree.action_occurrences(name),
                SymbolKind::Condition => tree.condition_occurrences(name),
            };
            for &id in occurrences {
                sites.push(SymbolLocation {
                    path: path.clone(),
                    line: tree.node(id).line,
                    columns: None,
                });
            }
        }
        sites
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    /// Declare one action name, persisting the manifest if it was new.
    pub async fn add_declared_action(&self, name: &str) -> Result<bool> {
        self.add_declared_actions(std::slice::from_ref(&name.to_string()))
            .await
    }

    /// Declare one condition name, persisting the manifest if it was new.
    pub async fn add_declared_condition(&self, name: &str) -> Result<bool> {
        self.add_declared_conditions(std::slice::from_ref(&name.to_string()))
            .await
    }

    /// Declare several action names at once. Saves only when at least one
    /// was not already declared.
    pub async fn add_declared_actions(&self, names: &[String]) -> Result<bool> {
        if !self.push_declared(SymbolKind::Action, names) {
            return Ok(false);
        }
        self.save_manifest().await?;
        Ok(true)
    }

    /// Declare several condition names at once.
    pub async fn add_declared_conditions(&self, names: &[String]) -> Result<bool> {
        if !self.push_declared(SymbolKind::Condition, names) {
            return Ok(false);
        }
        self.save_manifest().await?;
        Ok(true)
    }

    /// Declare everything one tree uses without a declaration, in a single
    /// manifest save. A path that is not in the index declares nothing; a
    /// stale editor request must not fault the workspace.
    pub async fn add_all_undeclared(&self, path: &Path) -> Result<bool> {
        let tree = match self.tree(path) {
            Some(tree) => tree,
            None => return Ok(false),
        };
        let actions = self.undeclared_actions(&tree);
        let conditions = self.undeclared_conditions(&tree);

        let mut added = self.push_declared(SymbolKind::Action, &actions);
        added |= self.push_declared(SymbolKind::Condition, &conditions);
        if !added {
            return Ok(false);
        }
        self.save_manifest().await?;
        Ok(true)
    }

    /// Append names to the in-memory declared list. Returns true when any
    /// name was new. Never saves.
    fn push_declared(&self, kind: SymbolKind, names: &[String]) -> bool {
        if names.is_empty() {
            return false;
        }
        let mut data = self.data.lock();
        let list = match kind {
            SymbolKind::Action => &mut data.actions_declared,
            SymbolKind::Condition => &mut data.conditions_declared,
        };
        let list = list.get_or_insert_with(Vec::new);
        let mut added = false;
        for name in names {
            if !list.iter().any(|declared| declared == name) {
                list.push(name.clone());
                added = true;
            }
        }
        added
    }

    // ------------------------------------------------------------------
    // Manifest
    // ------------------------------------------------------------------

    /// Write the in-memory declared lists through the merge-on-save path.
    ///
    /// The in-memory lists stay authoritative even when the write fails;
    /// retrying the save is the recovery path.
    pub async fn save_manifest(&self) -> Result<()> {
        let (actions, conditions) = {
            let data = self.data.lock();
            (data.actions_declared.clone(), data.conditions_declared.clone())
        };
        manifest::save_manifest(&self.folder, actions.as_deref(), conditions.as_deref()).await
    }

    /// Re-read `btrees.json` and replace the declared lists. A missing file
    /// clears both; a malformed one is logged and treated as missing for
    /// this cycle.
    pub async fn reload_manifest(self: &Arc<Self>) {
        self.load_manifest().await;
        self.emit_event(WorkspaceEventKind::ManifestReloaded);
    }

    async fn load_manifest(&self) {
        let (actions, conditions) = match manifest::read_manifest(&self.folder).await {
            Ok(Some(loaded)) => (loaded.declared_actions(), loaded.declared_conditions()),
            Ok(None) => (None, None),
            Err(error) => {
                log::warn!("{error}");
                (None, None)
            }
        };
        let mut data = self.data.lock();
        data.actions_declared = actions;
        data.conditions_declared = conditions;
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    pub fn on_tree_changed(
        &self,
        listener: impl Fn(&WorkspaceTreeEvent) + Send + Sync + 'static,
    ) -> Subscription {
        self.tree_events.subscribe(listener)
    }

    pub fn on_workspace_event(
        &self,
        listener: impl Fn(&WorkspaceEvent) + Send + Sync + 'static,
    ) -> Subscription {
        self.events.subscribe(listener)
    }

    fn emit_event(&self, kind: WorkspaceEventKind) {
        if let Some(workspace) = self.weak.upgrade() {
            self.events.emit(&WorkspaceEvent { workspace, kind });
        }
    }
}

fn recompute_used(data: &mut WorkspaceData) {
    let mut actions = IndexSet::new();
    let mut conditions = IndexSet::new();
    for tree in data.trees.values() {
        actions.extend(tree.action_names().map(str::to_string));
        conditions.extend(tree.condition_names().map(str::to_string));
    }
    data.actions_used = actions;
    data.conditions_used = conditions;
}

fn tree_file_stems(trees: &IndexMap<PathBuf, Arc<BehaviorTree>>) -> HashSet<&str> {
    trees
        .keys()
        .filter_map(|path| path.file_stem())
        .filter_map(|stem| stem.to_str())
        .collect()
}

async fn discover_tree_files(folder: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut entries = match tokio::fs::read_dir(folder).await {
        Ok(entries) => entries,
        Err(error) => {
            log::warn!("cannot scan {}: {error}", folder.display());
            return found;
        }
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some(TREE_EXTENSION) {
            continue;
        }
        match entry.file_type().await {
            Ok(kind) if kind.is_file() => found.push(path),
            _ => {}
        }
    }
    found.sort();
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;
    use pretty_assertions::assert_eq;
    use std::fs;

    const TREE1: &str = "->\n|  [action1]\n|  (condition1)\n|  [action2]\n|  (condition2)";

    async fn ready_workspace(dir: &Path) -> Arc<TreeWorkspace> {
        let workspace = TreeWorkspace::open(dir);
        workspace.ready().await;
        workspace
    }

    #[tokio::test]
    async fn initialization_scans_the_folder() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("tree1.tree"), TREE1).unwrap();
        fs::write(dir.path().join("notes.txt"), "not a tree").unwrap();

        let workspace = ready_workspace(dir.path()).await;
        assert_eq!(workspace.state(), WorkspaceState::Ready);
        assert_eq!(workspace.tree_paths(), vec![dir.path().join("tree1.tree")]);
        assert_eq!(
            workspace.actions_used(),
            vec!["action1".to_string(), "action2".to_string()]
        );
        assert_eq!(
            workspace.conditions_used(),
            vec!["condition1".to_string(), "condition2".to_string()]
        );
        assert_eq!(workspace.actions_declared(), None);
    }

    #[tokio::test]
    async fn unconfigured_folders_flag_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = ready_workspace(dir.path()).await;
        let tree = parse(TREE1);
        assert!(workspace.undeclared_actions(&tree).is_empty());
        assert!(workspace.undeclared_conditions(&tree).is_empty());
    }

    #[tokio::test]
    async fn absent_key_and_empty_section_differ() {
        let dir = tempfile::tempdir().unwrap();
        // conditions key absent, actions section explicitly empty
        fs::write(dir.path().join("btrees.json"), r#"{"actions": {}}"#).unwrap();

        let workspace = ready_workspace(dir.path()).await;
        let tree = parse(TREE1);
        assert_eq!(
            workspace.undeclared_actions(&tree),
            vec!["action1".to_string(), "action2".to_string()]
        );
        assert!(workspace.undeclared_conditions(&tree).is_empty());
    }

    #[tokio::test]
    async fn tree_file_stems_pass_as_actions() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("subtree.tree"), "[leaf]").unwrap();
        fs::write(dir.path().join("main.tree"), "->\n|  [subtree]\n|  (subtree)").unwrap();
        fs::write(dir.path().join("btrees.json"), r#"{"actions": {}, "conditions": {}}"#).unwrap();

        let workspace = ready_workspace(dir.path()).await;
        let main = workspace.tree(&dir.path().join("main.tree")).unwrap();
        // The action form is exempt, the condition form is not.
        assert_eq!(workspace.undeclared_actions(&main), Vec::<String>::new());
        assert_eq!(
            workspace.undeclared_conditions(&main),
            vec!["subtree".to_string()]
        );
    }

    #[tokio::test]
    async fn declaring_persists_and_deduplicates() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = ready_workspace(dir.path()).await;

        assert!(workspace.add_declared_action("go").await.unwrap());
        assert!(!workspace.add_declared_action("go").await.unwrap());
        assert!(workspace.add_declared_condition("ready").await.unwrap());

        let saved = manifest::read_manifest(dir.path()).await.unwrap().unwrap();
        assert_eq!(saved.declared_actions(), Some(vec!["go".to_string()]));
        assert_eq!(saved.declared_conditions(), Some(vec!["ready".to_string()]));
    }

    #[tokio::test]
    async fn add_all_undeclared_saves_once_per_tree() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tree1.tree");
        fs::write(&path, TREE1).unwrap();
        fs::write(dir.path().join("btrees.json"), r#"{"actions": {}, "conditions": {}}"#).unwrap();

        let workspace = ready_workspace(dir.path()).await;
        assert!(workspace.add_all_undeclared(&path).await.unwrap());
        assert_eq!(
            workspace.actions_declared(),
            Some(vec!["action1".to_string(), "action2".to_string()])
        );
        assert_eq!(
            workspace.conditions_declared(),
            Some(vec!["condition1".to_string(), "condition2".to_string()])
        );
        // Everything is declared now.
        assert!(!workspace.add_all_undeclared(&path).await.unwrap());
        // Unknown documents declare nothing.
        assert!(!workspace
            .add_all_undeclared(Path::new("ghost.tree"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn manifest_deletion_clears_declared_lists() {
        let dir = tempfile::tempdir().unwrap();
        let manifest_file = dir.path().join("btrees.json");
        fs::write(&manifest_file, r#"{"actions": {"go": {}}}"#).unwrap();

        let workspace = ready_workspace(dir.path()).await;
        assert_eq!(workspace.actions_declared(), Some(vec!["go".to_string()]));

        fs::remove_file(&manifest_file).unwrap();
        workspace.reload_manifest().await;
        assert_eq!(workspace.actions_declared(), None);
    }

    #[tokio::test]
    async fn upsert_replaces_and_recomputes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tree1.tree");
        fs::write(&path, TREE1).unwrap();

        let workspace = ready_workspace(dir.path()).await;
        workspace.upsert(&path, Arc::new(parse("[only]")));
        assert_eq!(workspace.actions_used(), vec!["only".to_string()]);
        assert!(workspace.conditions_used().is_empty());
    }
}
