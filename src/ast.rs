//! Behavior tree model produced by the parser.
//!
//! A parsed document is a [`BehaviorTree`]: an arena of [`Node`]s (indexed by
//! [`NodeId`]), an optional root, the parse error fields, and two occurrence
//! maps (action name → node ids, condition name → node ids) kept in document
//! order for fast symbol lookup.
//!
//! Trees are immutable after parsing except for the per-node [`Status`],
//! which interactive previews toggle at runtime and which is never
//! persisted. A fresh parse always starts every node at
//! [`Status::Unknown`].
//!
//! The wire form ([`WireTree`] / [`WireNode`]) is the JSON shape exchanged
//! with preview surfaces; occurrence maps are not transmitted and are
//! rebuilt on [`BehaviorTree::from_wire`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Index of a node in its tree's arena.
pub type NodeId = usize;

/// Runtime-simulated execution state of a node.
///
/// Mutated only through the status setters on [`BehaviorTree`]; reset to
/// `Unknown` by every fresh parse.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Unknown,
    Running,
    Success,
    Failed,
}

impl Status {
    /// The status seen through a negated condition: success and failure
    /// swap, `Running` and `Unknown` pass through.
    pub fn negated(self) -> Status {
        match self {
            Status::Success => Status::Failed,
            Status::Failed => Status::Success,
            other => other,
        }
    }
}

/// What a node is: a control construct or a named leaf.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Sequence,
    Selector,
    Decorator,
    Action,
    Condition,
}

impl NodeKind {
    /// Control nodes may own children; leaves may not.
    pub fn is_control(self) -> bool {
        matches!(
            self,
            NodeKind::Sequence | NodeKind::Selector | NodeKind::Decorator
        )
    }
}

/// One parsed tree element.
///
/// Control nodes have an empty `name`; only conditions use `has_not`; only
/// decorators carry a `count`.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    /// Leaf identifier; empty for control nodes.
    pub name: String,
    /// 1-based source line.
    pub line: usize,
    /// Negation flag (`!(name)` conditions).
    pub has_not: bool,
    /// Numeric parameter of a decorator (`=N`).
    pub count: Option<u32>,
    pub status: Status,
    /// Ordered children, owned exclusively by this node.
    pub children: Vec<NodeId>,
    /// Back-reference for lookup; never used for ownership.
    pub parent: Option<NodeId>,
}

impl Node {
    pub fn is_leaf(&self) -> bool {
        !self.kind.is_control()
    }
}

// =============================================================================
// BehaviorTree
// =============================================================================

/// Parse result for one document.
///
/// Always produced, never an `Err`: malformed input yields a partial tree
/// with [`error`](Self::error) and [`error_line`](Self::error_line) set, and
/// the occurrence maps cover everything parsed before the error line.
///
/// # Example
///
/// ```rust
/// use btree_lang::parse;
///
/// let tree = parse("->\n|  [wave]\n|  (seen)");
/// assert!(tree.error().is_none());
/// assert_eq!(tree.action_occurrences("wave").len(), 1);
/// assert_eq!(tree.condition_occurrences("seen").len(), 1);
/// assert_eq!(tree.action_occurrences("missing"), &[] as &[usize]);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BehaviorTree {
    nodes: Vec<Node>,
    root: Option<NodeId>,
    error: Option<String>,
    error_line: Option<usize>,
    actions: IndexMap<String, Vec<NodeId>>,
    conditions: IndexMap<String, Vec<NodeId>>,
}

impl BehaviorTree {
    pub(crate) fn new() -> Self {
        BehaviorTree::default()
    }

    /// Append a node to the arena, register it with its parent and, for
    /// leaves, with the occurrence map for its name.
    pub(crate) fn push_node(&mut self, mut node: Node) -> NodeId {
        let id = self.nodes.len();
        node.children = Vec::new();
        if let Some(parent) = node.parent {
            self.nodes[parent].children.push(id);
        } else {
            self.root = Some(id);
        }
        match node.kind {
            NodeKind::Action => {
                self.actions
                    .entry(node.name.clone())
                    .or_default()
                    .push(id);
            }
            NodeKind::Condition => {
                self.conditions
                    .entry(node.name.clone())
                    .or_default()
                    .push(id);
            }
            _ => {}
        }
        self.nodes.push(node);
        id
    }

    pub(crate) fn set_error(&mut self, message: impl Into<String>, line: usize) {
        self.error = Some(message.into());
        self.error_line = Some(line);
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn root_id(&self) -> Option<NodeId> {
        self.root
    }

    pub fn root(&self) -> Option<&Node> {
        self.root.map(|id| &self.nodes[id])
    }

    /// Node by id. Ids always come from this tree; an id from another tree
    /// is a caller bug and panics.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Parse failure message, if the document was malformed.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// 1-based line of the parse failure; present iff [`error`](Self::error)
    /// is present.
    pub fn error_line(&self) -> Option<usize> {
        self.error_line
    }

    /// Action names in document order.
    pub fn action_names(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }

    /// Condition names in document order.
    pub fn condition_names(&self) -> impl Iterator<Item = &str> {
        self.conditions.keys().map(String::as_str)
    }

    /// Every occurrence of an action name, in document order. Empty slice
    /// (never absent) for unused names.
    pub fn action_occurrences(&self, name: &str) -> &[NodeId] {
        self.actions.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every occurrence of a condition name, in document order.
    pub fn condition_occurrences(&self, name: &str) -> &[NodeId] {
        self.conditions.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// (name, occurrences) pairs for all actions, in document order.
    pub fn actions(&self) -> impl Iterator<Item = (&str, &[NodeId])> {
        self.actions.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// (name, occurrences) pairs for all conditions, in document order.
    pub fn conditions(&self) -> impl Iterator<Item = (&str, &[NodeId])> {
        self.conditions
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    // ------------------------------------------------------------------
    // Status (preview interaction)
    // ------------------------------------------------------------------

    /// Set the status of every node for an action name. Returns the number
    /// of occurrences updated.
    pub fn set_action_status(&mut self, name: &str, status: Status) -> usize {
        Self::set_status(&mut self.nodes, &self.actions, name, status)
    }

    /// Set the status of every node for a condition name.
    pub fn set_condition_status(&mut self, name: &str, status: Status) -> usize {
        Self::set_status(&mut self.nodes, &self.conditions, name, status)
    }

    fn set_status(
        nodes: &mut [Node],
        map: &IndexMap<String, Vec<NodeId>>,
        name: &str,
        status: Status,
    ) -> usize {
        let ids = match map.get(name) {
            Some(ids) => ids,
            None => return 0,
        };
        for &id in ids {
            nodes[id].status = status;
        }
        ids.len()
    }

    /// Raw status of the first occurrence of an action name.
    pub fn action_status(&self, name: &str) -> Option<Status> {
        self.action_occurrences(name)
            .first()
            .map(|&id| self.nodes[id].status)
    }

    /// Raw status of the first occurrence of a condition name.
    pub fn condition_status(&self, name: &str) -> Option<Status> {
        self.condition_occurrences(name)
            .first()
            .map(|&id| self.nodes[id].status)
    }

    /// Status as observed by the node's parent: negated conditions invert
    /// success and failure.
    pub fn effective_status(&self, id: NodeId) -> Status {
        let node = &self.nodes[id];
        if node.has_not {
            node.status.negated()
        } else {
            node.status
        }
    }

    // ------------------------------------------------------------------
    // Wire form
    // ------------------------------------------------------------------

    /// Serializable snapshot for the preview wire.
    pub fn to_wire(&self) -> WireTree {
        WireTree {
            root: self.root.map(|id| self.node_to_wire(id)),
            error: self.error.clone(),
            line: self.error_line,
        }
    }

    fn node_to_wire(&self, id: NodeId) -> WireNode {
        let node = &self.nodes[id];
        WireNode {
            kind: node.kind,
            name: node.name.clone(),
            line: node.line,
            has_not: node.has_not,
            count: node.count,
            status: node.status,
            children: node
                .children
                .iter()
                .map(|&child| self.node_to_wire(child))
                .collect(),
        }
    }

    /// Rebuild a tree (arena and occurrence maps) from its wire form.
    /// Statuses carried on the wire are preserved.
    pub fn from_wire(wire: &WireTree) -> BehaviorTree {
        let mut tree = BehaviorTree::new();
        tree.error = wire.error.clone();
        tree.error_line = wire.line;
        if let Some(root) = &wire.root {
            tree.adopt_wire_node(root, None);
        }
        tree
    }

    fn adopt_wire_node(&mut self, wire: &WireNode, parent: Option<NodeId>) {
        let id = self.push_node(Node {
            kind: wire.kind,
            name: wire.name.clone(),
            line: wire.line,
            has_not: wire.has_not,
            count: wire.count,
            status: wire.status,
            children: Vec::new(),
            parent,
        });
        for child in &wire.children {
            self.adopt_wire_node(child, Some(id));
        }
    }
}

// =============================================================================
// Wire types
// =============================================================================

/// JSON shape of one node on the preview wire.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireNode {
    pub kind: NodeKind,
    #[serde(default)]
    pub name: String,
    pub line: usize,
    #[serde(default)]
    pub has_not: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub children: Vec<WireNode>,
}

/// JSON shape of a whole tree on the preview wire.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireTree {
    pub root: Option<WireNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// 1-based line of the parse error, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

/// Message posted from the host to a preview surface.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum HostMessage {
    /// A document was (re)parsed; re-render.
    TreeChanged { tree: WireTree },
}

/// Message posted from a preview surface back to the host.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum PreviewMessage {
    /// First render is ready.
    Initialized,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "->\n|  [wave]\n|  !(seen)\n|  [wave]";

    #[test]
    fn occurrence_maps_are_total() {
        let tree = parse(SAMPLE);
        assert_eq!(tree.action_occurrences("wave").len(), 2);
        assert_eq!(tree.condition_occurrences("seen").len(), 1);
        assert_eq!(tree.action_occurrences("nope"), &[] as &[NodeId]);
        assert_eq!(tree.action_names().collect::<Vec<_>>(), vec!["wave"]);
    }

    #[test]
    fn status_setters_touch_every_occurrence() {
        let mut tree = parse(SAMPLE);
        assert_eq!(tree.set_action_status("wave", Status::Running), 2);
        for &id in tree.action_occurrences("wave") {
            assert_eq!(tree.node(id).status, Status::Running);
        }
        assert_eq!(tree.set_action_status("nope", Status::Running), 0);
        assert_eq!(tree.action_status("wave"), Some(Status::Running));
    }

    #[test]
    fn negated_condition_inverts_effective_status() {
        let mut tree = parse(SAMPLE);
        tree.set_condition_status("seen", Status::Success);
        let id = tree.condition_occurrences("seen")[0];
        assert_eq!(tree.node(id).status, Status::Success);
        assert_eq!(tree.effective_status(id), Status::Failed);
        tree.set_condition_status("seen", Status::Running);
        assert_eq!(tree.effective_status(id), Status::Running);
    }

    #[test]
    fn wire_round_trip_rebuilds_maps_and_statuses() {
        let mut tree = parse(SAMPLE);
        tree.set_action_status("wave", Status::Success);
        let rebuilt = BehaviorTree::from_wire(&tree.to_wire());
        assert_eq!(rebuilt, tree);
    }

    #[test]
    fn wire_json_uses_command_tagging() {
        let tree = parse("[solo]");
        let message = HostMessage::TreeChanged {
            tree: tree.to_wire(),
        };
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["command"], "treeChanged");
        assert_eq!(json["tree"]["root"]["kind"], "action");
        assert_eq!(json["tree"]["root"]["name"], "solo");
        assert_eq!(json["tree"]["root"]["status"], "unknown");

        let initialized: PreviewMessage =
            serde_json::from_str(r#"{"command":"initialized"}"#).unwrap();
        assert_eq!(initialized, PreviewMessage::Initialized);
    }
}
