//! # btree-lang
//!
//! Parser, folder symbol index, and workspace model for an
//! indentation-based behavior tree DSL.
//!
//! Tree files describe game-AI behavior trees one node per line: control
//! nodes (sequence, selector, decorator) own the deeper-indented lines
//! below them, and leaves name the actions and conditions the tree runs.
//! This crate provides:
//!
//! - **Total parsing** of tree source into a [`BehaviorTree`] — malformed
//!   input yields a partial tree with a line-accurate error, never a panic
//! - **Folder workspaces** tracking which names every tree uses versus
//!   which names the folder's `btrees.json` manifest declares
//! - **Symbol resolution** with a declaration-or-usages fallback for
//!   editor go-to-definition and references
//! - **A serialized wire form** consumed by interactive preview surfaces
//!
//! ## Quick Start
//!
//! ```rust
//! use btree_lang::{parse, serialize, NodeKind};
//!
//! let source = "\
//! ->
//! |  (hungry)
//! |  =3
//! |  |  [search for food]  ;; retry a few times
//! |  [eat]";
//!
//! let tree = parse(source);
//! assert!(tree.error().is_none());
//!
//! let root = tree.root().unwrap();
//! assert_eq!(root.kind, NodeKind::Sequence);
//! assert_eq!(root.children.len(), 3);
//! assert_eq!(tree.action_occurrences("eat").len(), 1);
//!
//! // Comments are not part of the model; serialization is canonical.
//! assert_eq!(
//!     serialize(&tree),
//!     "->\n|  (hungry)\n|  =3\n|  |  [search for food]\n|  [eat]\n"
//! );
//! ```
//!
//! ## The tree language
//!
//! Indentation is a run of `|` and whitespace, one `|` per nesting level:
//!
//! | Line | Meaning |
//! |------|---------|
//! | `->` | sequence: run children until one fails |
//! | `?` | selector: run children until one succeeds |
//! | `=N` | decorator with a numeric parameter (repeat count) |
//! | `[name]` | action leaf |
//! | `(name)` / `!(name)` | condition leaf, optionally negated |
//! | `;; text` | comment to end of line |
//!
//! ## Module Overview
//!
//! - [`lexer`] - line splitting, comment detection, and the chumsky line grammar
//! - [`parser`] - indentation-driven tree construction with error recovery
//! - [`ast`] - the tree model, occurrence maps, and the preview wire form
//! - [`serializer`] - canonical text form of a tree
//! - [`manifest`] - `btrees.json` reading, merge-on-save, declaration spans
//! - [`workspace`] - per-folder tree index and used-vs-declared differentials
//! - [`registry`] - workspace ownership and event fan-out
//! - [`symbols`] - cursor symbol lookup and two-tier resolution
//! - [`validation`] - per-document diagnostics
//! - [`events`] - synchronous pub/sub with RAII subscriptions
//! - [`error`] - manifest error types and terminal error reports via ariadne

pub mod ast;
pub mod error;
pub mod events;
pub mod lexer;
pub mod manifest;
pub mod parser;
pub mod registry;
pub mod serializer;
pub mod symbols;
pub mod validation;
pub mod workspace;

// Re-export commonly used types
pub use ast::{BehaviorTree, HostMessage, Node, NodeId, NodeKind, PreviewMessage, Status, WireNode, WireTree};
pub use error::{ErrorReporter, ManifestError};
pub use manifest::{Manifest, MANIFEST_FILE};
pub use parser::parse;
pub use registry::WorkspaceRegistry;
pub use serializer::serialize;
pub use symbols::{SymbolKind, SymbolLocation, SymbolResolution};
pub use validation::{validate_tree, Severity, TreeDiagnostic, UndeclaredSymbol};
pub use workspace::{TreeWorkspace, WorkspaceEvent, WorkspaceEventKind, WorkspaceState, WorkspaceTreeEvent, TREE_EXTENSION};
