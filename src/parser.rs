//! Document parser: full source text → [`BehaviorTree`].
//!
//! The grammar is line oriented, so parsing is a single top-to-bottom scan.
//! Each content line is split into indentation and payload
//! ([`lexer::split_source_line`]), the payload classified by the chumsky
//! line grammar ([`lexer::line_token`]), and the node attached using a stack
//! of open parent nodes where `stack[d]` is the open control node at depth
//! `d`. A line at depth `d` becomes the next child of `stack[d - 1]`.
//!
//! Parsing never fails: malformed input stops the scan and records a
//! message plus the offending 1-based line in the returned tree's
//! `error`/`error_line` fields. Everything parsed before the error remains
//! available, so symbol indexing can keep working on a broken document.
//!
//! # Example
//!
//! ```rust
//! use btree_lang::parse;
//!
//! let tree = parse("->\n|  (hungry)\n|  [eat]  ;; om nom");
//! let root = tree.root().unwrap();
//! assert_eq!(root.children.len(), 2);
//! assert!(tree.error().is_none());
//! ```

use chumsky::prelude::*;

use crate::ast::{BehaviorTree, Node, NodeKind, Status};
use crate::lexer::{self, LineToken};

/// Parse a whole document. Total: returns a (possibly partial) tree for
/// every input, with `error`/`error_line` set on malformed structure.
pub fn parse(text: &str) -> BehaviorTree {
    let mut tree = BehaviorTree::new();
    // Open control ancestors; stack[d] is the open parent at depth d.
    let mut stack: Vec<usize> = Vec::new();
    let mut last_depth = 0usize;
    let mut last_was_leaf = false;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let code = lexer::strip_comment(raw);
        let (indents, payload) = lexer::split_source_line(code);
        let payload = payload.trim_end();
        if payload.is_empty() {
            continue;
        }
        let depth = lexer::indent_depth(indents);

        let token = match lexer::line_token().parse(payload).into_result() {
            Ok(token) => token,
            Err(errors) => {
                tree.set_error(payload_error(&errors), line_no);
                break;
            }
        };

        if tree.root_id().is_none() {
            if depth != 0 {
                tree.set_error("the root node must not be indented", line_no);
                break;
            }
        } else if depth == 0 {
            tree.set_error("only one root node is allowed", line_no);
            break;
        } else if stack.len() < depth {
            if last_was_leaf && depth == last_depth + 1 {
                tree.set_error("a leaf node cannot have child nodes", line_no);
            } else {
                tree.set_error(
                    format!(
                        "indentation jumps from depth {} to depth {}",
                        last_depth, depth
                    ),
                    line_no,
                );
            }
            break;
        }

        stack.truncate(depth);
        let parent = stack.last().copied();
        let node = node_from_token(token, line_no, parent);
        let is_control = node.kind.is_control();
        let id = tree.push_node(node);
        if is_control {
            stack.push(id);
        }
        last_depth = depth;
        last_was_leaf = !is_control;
    }

    tree
}

fn node_from_token(token: LineToken, line: usize, parent: Option<usize>) -> Node {
    let (kind, name, has_not, count) = match token {
        LineToken::Sequence => (NodeKind::Sequence, String::new(), false, None),
        LineToken::Selector => (NodeKind::Selector, String::new(), false, None),
        LineToken::Decorator(count) => (NodeKind::Decorator, String::new(), false, Some(count)),
        LineToken::Action(name) => (NodeKind::Action, name, false, None),
        LineToken::Condition { name, negated } => (NodeKind::Condition, name, negated, None),
    };
    Node {
        kind,
        name,
        line,
        has_not,
        count,
        status: Status::Unknown,
        children: Vec::new(),
        parent,
    }
}

/// Human-readable message for a failed payload, in the style
/// `invalid node syntax: found 'x', expected one of: ...`.
fn payload_error(errors: &[Rich<char>]) -> String {
    let detail = errors
        .first()
        .map(describe_rich)
        .unwrap_or_else(|| "unrecognized node".to_string());
    format!("invalid node syntax: {}", detail)
}

fn describe_rich(error: &Rich<char>) -> String {
    let expected: Vec<String> = error.expected().map(|e| e.to_string()).collect();
    if expected.is_empty() {
        // Custom errors carry their own reason text.
        return error.to_string();
    }
    let found = match error.found() {
        Some(c) => format!("found '{}'", c),
        None => "found end of line".to_string(),
    };
    if expected.len() == 1 {
        format!("{}, expected {}", found, expected[0])
    } else {
        format!("{}, expected one of: {}", found, expected.join(", "))
    }
}
