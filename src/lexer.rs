//! Line-level lexing for the behavior tree DSL.
//!
//! Tree sources are line oriented: every line carries at most one node, and
//! nesting is encoded entirely in the indentation prefix (a run of `|` and
//! whitespace, one `|` per level). This module provides the pure functions
//! that decompose and classify a single line:
//!
//! - [`split_source_line()`] / [`indent_depth()`] — indentation handling
//! - [`line_token()`] — chumsky grammar classifying a line payload
//! - [`comment_start()`] / [`is_in_comments()`] — `;;` comment detection
//! - [`tab()`] / [`indent()`] / [`unindent()`] — editor indentation edits
//!
//! # Line forms
//!
//! | Form | Meaning |
//! |------|---------|
//! | `->` | sequence parent |
//! | `?`  | selector (fallback) parent |
//! | `=3` | decorator parent with numeric parameter |
//! | `[name]` | action leaf |
//! | `(name)` / `!(name)` | condition leaf, optionally negated |
//! | `;; text` | comment to end of line |
//!
//! # Example
//!
//! ```rust
//! use btree_lang::lexer::{split_source_line, indent_depth, is_parent_node};
//!
//! let (indents, rest) = split_source_line("|  |  [fetch]");
//! assert_eq!(indent_depth(indents), 2);
//! assert_eq!(rest, "[fetch]");
//! assert!(is_parent_node("?  ;; try each child in turn"));
//! ```

use chumsky::prelude::*;

/// One classified line payload.
///
/// Produced by [`line_token()`] from a payload that has already been stripped
/// of its indentation prefix and trailing comment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LineToken {
    /// `->` — runs children in order until one fails.
    Sequence,
    /// `?` — runs children in order until one succeeds.
    Selector,
    /// `=N` — decorator with a numeric parameter (repeat count).
    Decorator(u32),
    /// `[name]` — action leaf.
    Action(String),
    /// `(name)` or `!(name)` — condition leaf.
    Condition { name: String, negated: bool },
}

impl LineToken {
    /// Control tokens open a parent frame for subsequent deeper lines.
    pub fn is_parent(&self) -> bool {
        matches!(
            self,
            LineToken::Sequence | LineToken::Selector | LineToken::Decorator(_)
        )
    }
}

// =============================================================================
// Indentation
// =============================================================================

/// Split a line into its indentation prefix and the payload.
///
/// The prefix is the maximal leading run of `|` and whitespace characters.
/// Total over all inputs; a line with no indentation yields an empty prefix.
pub fn split_source_line(line: &str) -> (&str, &str) {
    let end = line
        .char_indices()
        .find(|(_, c)| *c != '|' && !c.is_whitespace())
        .map(|(i, _)| i)
        .unwrap_or(line.len());
    line.split_at(end)
}

/// Nesting depth of an indentation prefix: the number of `|` characters.
pub fn indent_depth(indents: &str) -> usize {
    indents.chars().filter(|c| *c == '|').count()
}

/// True iff the line (after trimming a trailing comment) ends with a control
/// marker: `->`, `?`, or `=` followed by digits.
pub fn is_parent_node(text: &str) -> bool {
    let code = strip_comment(text).trim_end();
    if code.ends_with("->") || code.ends_with('?') {
        return true;
    }
    let digits = code.chars().rev().take_while(|c| c.is_ascii_digit()).count();
    digits > 0 && code[..code.len() - digits].ends_with('=')
}

// =============================================================================
// Comments
// =============================================================================

/// Byte offset of the first `;;` that is not inside a bracketed name.
pub fn comment_start(line: &str) -> Option<usize> {
    scan_comment(line).map(|(byte, _)| byte)
}

/// True iff `column` (a character offset) falls at or after the start of a
/// `;;` comment on this line.
pub fn is_in_comments(line: &str, column: usize) -> bool {
    match scan_comment(line) {
        Some((_, char_idx)) => column >= char_idx,
        None => false,
    }
}

/// The line up to (not including) its trailing comment.
pub fn strip_comment(line: &str) -> &str {
    match comment_start(line) {
        Some(i) => &line[..i],
        None => line,
    }
}

/// Locate `;;` outside `(..)` / `[..]`, as (byte offset, char offset).
fn scan_comment(line: &str) -> Option<(usize, usize)> {
    let mut in_round = false;
    let mut in_square = false;
    let mut prev_semi: Option<(usize, usize)> = None;
    for (char_idx, (byte_idx, c)) in line.char_indices().enumerate() {
        match c {
            '(' if !in_square => in_round = true,
            ')' if !in_square => in_round = false,
            '[' if !in_round => in_square = true,
            ']' if !in_round => in_square = false,
            ';' if !in_round && !in_square => {
                if let Some(start) = prev_semi {
                    return Some(start);
                }
                prev_semi = Some((byte_idx, char_idx));
                continue;
            }
            _ => {}
        }
        prev_semi = None;
    }
    None
}

// =============================================================================
// Indentation edits
// =============================================================================

/// Editor tab preferences applied when generating indentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatOptions {
    pub insert_spaces: bool,
    pub tab_size: usize,
}

impl Default for FormatOptions {
    fn default() -> Self {
        FormatOptions {
            insert_spaces: true,
            tab_size: 2,
        }
    }
}

/// The whitespace inserted for one tab stop.
pub fn tab(options: &FormatOptions) -> String {
    if options.insert_spaces {
        " ".repeat(options.tab_size)
    } else {
        "\t".to_string()
    }
}

/// Add one nesting level to the line's indentation.
pub fn indent(text: &str, options: &FormatOptions) -> String {
    let (indents, rest) = split_source_line(text);
    format!("{}|{}{}", indents, tab(options), rest)
}

/// Remove the innermost nesting level (everything from the last `|` to the
/// end of the indentation prefix).
pub fn unindent(text: &str) -> String {
    let (indents, rest) = split_source_line(text);
    match indents.rfind('|') {
        Some(i) => format!("{}{}", &indents[..i], rest),
        None => rest.to_string(),
    }
}

// =============================================================================
// Line grammar
// =============================================================================

/// Parser for one comment-stripped, whitespace-trimmed line payload.
///
/// The payload must be exactly one node marker; trailing garbage, empty
/// names, and unterminated brackets are reported as [`Rich`] errors.
///
/// # Example
///
/// ```rust
/// use btree_lang::lexer::{line_token, LineToken};
/// use chumsky::prelude::*; // for Parser trait
///
/// let token = line_token().parse("!(door is open)").into_result().unwrap();
/// assert_eq!(
///     token,
///     LineToken::Condition { name: "door is open".to_string(), negated: true }
/// );
/// ```
pub fn line_token<'src>() -> impl Parser<'src, &'src str, LineToken, extra::Err<Rich<'src, char>>> {
    let sequence = just("->").to(LineToken::Sequence);

    let selector = just('?').to(LineToken::Selector);

    let decorator = just('=').ignore_then(text::int(10).to_slice()).try_map(
        |digits: &str, span| match digits.parse::<u32>() {
            Ok(count) => Ok(LineToken::Decorator(count)),
            Err(_) => Err(Rich::custom(span, "decorator parameter is out of range")),
        },
    );

    let condition = just('!')
        .or_not()
        .then(
            none_of("()")
                .repeated()
                .at_least(1)
                .to_slice()
                .delimited_by(just('('), just(')')),
        )
        .map(|(negation, name): (Option<char>, &str)| LineToken::Condition {
            name: name.trim().to_string(),
            negated: negation.is_some(),
        });

    let action = none_of("[]")
        .repeated()
        .at_least(1)
        .to_slice()
        .delimited_by(just('['), just(']'))
        .map(|name: &str| LineToken::Action(name.trim().to_string()));

    choice((sequence, selector, decorator, condition, action)).then_ignore(end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn classify(payload: &str) -> LineToken {
        line_token().parse(payload).into_result().unwrap()
    }

    #[test]
    fn splits_indent_prefix_from_payload() {
        assert_eq!(split_source_line("|  |  (alive)"), ("|  |  ", "(alive)"));
        assert_eq!(split_source_line("->"), ("", "->"));
        assert_eq!(split_source_line("   "), ("   ", ""));
        assert_eq!(split_source_line(""), ("", ""));
    }

    #[test]
    fn depth_counts_pipes_only() {
        assert_eq!(indent_depth(""), 0);
        assert_eq!(indent_depth("    "), 0);
        assert_eq!(indent_depth("|  "), 1);
        assert_eq!(indent_depth("|  |\t"), 2);
    }

    #[test]
    fn parent_markers_at_end_of_line() {
        assert!(is_parent_node("->"));
        assert!(is_parent_node("|  ?"));
        assert!(is_parent_node("|  =5"));
        assert!(is_parent_node("|  ->  ;; comment"));
        assert!(!is_parent_node("[action]"));
        assert!(!is_parent_node("(condition)"));
        assert!(!is_parent_node("|  = "));
        assert!(!is_parent_node(""));
    }

    #[test]
    fn comment_detection_ignores_bracketed_names() {
        assert_eq!(comment_start(";; whole line"), Some(0));
        assert_eq!(comment_start("[go] ;; note"), Some(5));
        assert_eq!(comment_start("(a;;b)"), None);
        assert_eq!(comment_start("[a;;b] ;; real"), Some(7));
        assert_eq!(comment_start("; single"), None);
        assert!(is_in_comments("[go] ;; note", 6));
        assert!(is_in_comments("[go] ;; note", 5));
        assert!(!is_in_comments("[go] ;; note", 4));
    }

    #[test]
    fn classifies_all_node_forms() {
        assert_eq!(classify("->"), LineToken::Sequence);
        assert_eq!(classify("?"), LineToken::Selector);
        assert_eq!(classify("=12"), LineToken::Decorator(12));
        assert_eq!(classify("[pick up]"), LineToken::Action("pick up".to_string()));
        assert_eq!(
            classify("(door open)"),
            LineToken::Condition {
                name: "door open".to_string(),
                negated: false
            }
        );
        assert_eq!(
            classify("!(door open)"),
            LineToken::Condition {
                name: "door open".to_string(),
                negated: true
            }
        );
    }

    #[test]
    fn rejects_malformed_payloads() {
        assert!(line_token().parse("(unterminated").into_result().is_err());
        assert!(line_token().parse("[unterminated").into_result().is_err());
        assert!(line_token().parse("()").into_result().is_err());
        assert!(line_token().parse("[a] extra").into_result().is_err());
        assert!(line_token().parse("bare words").into_result().is_err());
        assert!(line_token().parse("=").into_result().is_err());
        assert!(line_token().parse("=99999999999").into_result().is_err());
    }

    #[test]
    fn indentation_edits_round_trip() {
        let options = FormatOptions::default();
        assert_eq!(tab(&options), "  ");
        assert_eq!(indent("[go]", &options), "|  [go]");
        assert_eq!(indent("|  [go]", &options), "|  |  [go]");
        assert_eq!(unindent("|  |  [go]"), "|  [go]");
        assert_eq!(unindent("[go]"), "[go]");

        let tabs = FormatOptions {
            insert_spaces: false,
            tab_size: 4,
        };
        assert_eq!(indent("(c)", &tabs), "|\t(c)");
    }
}
