//! Serializer: convert a [`BehaviorTree`] back to DSL source text.
//!
//! Enables round-trip tooling (format-on-save, tree rewriting) and the
//! round-trip tests: for every valid text `T`,
//! `parse(serialize(parse(T)))` is structurally equal to `parse(T)`.
//! Structure survives any [`FormatOptions`], because nesting depth is the
//! pipe count, not the whitespace width.
//!
//! # Example
//!
//! ```rust
//! use btree_lang::{parse, serialize};
//!
//! let tree = parse("?\n|  (safe)\n|  [retreat]");
//! assert_eq!(serialize(&tree), "?\n|  (safe)\n|  [retreat]\n");
//! ```

use std::fmt::Write;

use crate::ast::{BehaviorTree, NodeId, NodeKind};
use crate::lexer::{tab, FormatOptions};

/// Serialize with the default two-space indentation.
pub fn serialize(tree: &BehaviorTree) -> String {
    serialize_with(tree, &FormatOptions::default())
}

/// Serialize with explicit tab preferences.
pub fn serialize_with(tree: &BehaviorTree, options: &FormatOptions) -> String {
    let mut w = Writer::new(options);
    if let Some(root) = tree.root_id() {
        w.write_node(tree, root);
    }
    w.finish()
}

/// Internal writer tracking the current nesting depth.
struct Writer {
    output: String,
    level: String,
    depth: usize,
}

impl Writer {
    fn new(options: &FormatOptions) -> Self {
        Writer {
            output: String::new(),
            level: format!("|{}", tab(options)),
            depth: 0,
        }
    }

    fn write_node(&mut self, tree: &BehaviorTree, id: NodeId) {
        let node = tree.node(id);
        for _ in 0..self.depth {
            self.output.push_str(&self.level);
        }
        match node.kind {
            NodeKind::Sequence => self.output.push_str("->"),
            NodeKind::Selector => self.output.push('?'),
            NodeKind::Decorator => {
                let _ = write!(self.output, "={}", node.count.unwrap_or(1));
            }
            NodeKind::Action => {
                let _ = write!(self.output, "[{}]", node.name);
            }
            NodeKind::Condition => {
                if node.has_not {
                    self.output.push('!');
                }
                let _ = write!(self.output, "({})", node.name);
            }
        }
        self.output.push('\n');

        self.depth += 1;
        for &child in &node.children {
            self.write_node(tree, child);
        }
        self.depth -= 1;
    }

    fn finish(self) -> String {
        self.output
    }
}
