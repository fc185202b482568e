//! Registry of folder workspaces, keyed by absolute folder path.
//!
//! The registry is the single entry point collaborators hold: it creates
//! workspaces lazily on first reference and re-broadcasts every workspace's
//! events at registry scope, so one subscription observes the whole
//! session. [`WorkspaceRegistry::clear`] disposes everything between
//! independent sessions.
//!
//! There is deliberately no global instance; construct one and pass it to
//! whoever needs it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::events::{self, EventEmitter, Subscription};
use crate::workspace::{TreeWorkspace, WorkspaceEvent, WorkspaceTreeEvent};

struct RegistryEntry {
    workspace: Arc<TreeWorkspace>,
    // Keeps the fan-out listeners alive for the workspace's lifetime.
    _subscriptions: Vec<Subscription>,
}

/// Owner of every [`TreeWorkspace`] in a session.
#[derive(Default)]
pub struct WorkspaceRegistry {
    workspaces: Mutex<IndexMap<PathBuf, RegistryEntry>>,
    tree_events: EventEmitter<WorkspaceTreeEvent>,
    events: EventEmitter<WorkspaceEvent>,
}

impl WorkspaceRegistry {
    pub fn new() -> Self {
        WorkspaceRegistry::default()
    }

    /// The workspace for a folder, creating and initializing it on first
    /// reference.
    pub fn get_or_create(&self, folder: impl AsRef<Path>) -> Arc<TreeWorkspace> {
        let folder = folder.as_ref().to_path_buf();
        let mut workspaces = self.workspaces.lock();
        if let Some(entry) = workspaces.get(&folder) {
            return entry.workspace.clone();
        }

        let workspace = TreeWorkspace::open(&folder);
        let trees = self.tree_events.clone();
        let lifecycle = self.events.clone();
        let subscriptions = vec![
            workspace.on_tree_changed(move |event| trees.emit(event)),
            workspace.on_workspace_event(move |event| lifecycle.emit(event)),
        ];
        workspaces.insert(
            folder,
            RegistryEntry {
                workspace: workspace.clone(),
                _subscriptions: subscriptions,
            },
        );
        workspace
    }

    /// The workspace for a folder, if one was already created.
    pub fn get(&self, folder: &Path) -> Option<Arc<TreeWorkspace>> {
        self.workspaces
            .lock()
            .get(folder)
            .map(|entry| entry.workspace.clone())
    }

    /// The workspace owning a tree file, i.e. the one for its parent
    /// folder. `None` only for paths without a parent.
    pub fn workspace_for_file(&self, file: &Path) -> Option<Arc<TreeWorkspace>> {
        file.parent().map(|folder| self.get_or_create(folder))
    }

    pub fn len(&self) -> usize {
        self.workspaces.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.workspaces.lock().is_empty()
    }

    /// Dispose every workspace and forget it. Fan-out listeners are
    /// released; registry-scope subscribers stay registered and simply see
    /// no further events until new workspaces appear.
    pub fn clear(&self) {
        let entries: Vec<RegistryEntry> = {
            let mut workspaces = self.workspaces.lock();
            workspaces.drain(..).map(|(_, entry)| entry).collect()
        };
        // Dropped outside the lock; drop order unsubscribes before the
        // workspaces go away.
        drop(entries);
    }

    // ------------------------------------------------------------------
    // Registry-scope events
    // ------------------------------------------------------------------

    /// Observe tree upserts across every workspace.
    pub fn on_tree_changed(
        &self,
        listener: impl Fn(&WorkspaceTreeEvent) + Send + Sync + 'static,
    ) -> Subscription {
        self.tree_events.subscribe(listener)
    }

    /// Observe workspace lifecycle events across every workspace.
    pub fn on_workspace_event(
        &self,
        listener: impl Fn(&WorkspaceEvent) + Send + Sync + 'static,
    ) -> Subscription {
        self.events.subscribe(listener)
    }

    /// Resolve with the first tree event matching `filter`.
    pub async fn wait_for_tree_change(
        &self,
        filter: impl Fn(&WorkspaceTreeEvent) -> bool + Send + Sync + 'static,
    ) -> WorkspaceTreeEvent {
        events::wait_for(&self.tree_events, move |event| {
            filter(event).then(|| event.clone())
        })
        .await
    }

    /// Resolve with the first lifecycle event matching `filter`.
    pub async fn wait_for_workspace_event(
        &self,
        filter: impl Fn(&WorkspaceEvent) -> bool + Send + Sync + 'static,
    ) -> WorkspaceEvent {
        events::wait_for(&self.events, move |event| {
            filter(event).then(|| event.clone())
        })
        .await
    }
}

impl std::fmt::Debug for WorkspaceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkspaceRegistry")
            .field("workspaces", &self.len())
            .finish()
    }
}
