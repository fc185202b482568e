//! Symbol identification and resolution across a folder workspace.
//!
//! A symbol is an action or condition name. Resolution is two tier: a name
//! declared in the folder's manifest resolves to its declaration property
//! inside `btrees.json`; an undeclared name has no canonical site, so it
//! resolves to every usage occurrence across the folder's trees instead.

use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::lexer;
use crate::manifest;
use crate::workspace::TreeWorkspace;

/// The two leaf namespaces a name can belong to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Action,
    Condition,
}

impl SymbolKind {
    /// Key of the manifest section declaring names of this kind.
    pub fn manifest_key(self) -> &'static str {
        match self {
            SymbolKind::Action => "actions",
            SymbolKind::Condition => "conditions",
        }
    }

    /// Lowercase noun for messages.
    pub fn describe(self) -> &'static str {
        match self {
            SymbolKind::Action => "action",
            SymbolKind::Condition => "condition",
        }
    }
}

/// A place a symbol appears: a tree file line or a manifest property.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SymbolLocation {
    pub path: PathBuf,
    /// 1-based line.
    pub line: usize,
    /// 0-based character columns within the line; `None` covers the whole
    /// line (tree occurrences are tracked per line, not per column).
    pub columns: Option<Range<usize>>,
}

/// Outcome of a two-tier lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SymbolResolution {
    /// The manifest declares the name; this is its declaration property.
    Declaration(SymbolLocation),
    /// No declaration exists; every usage site stands in for one.
    Usages(Vec<SymbolLocation>),
}

/// Identify the symbol under a cursor on one source line.
///
/// `character` is a 0-based character column. Returns `None` when the
/// cursor is outside any bracketed name or inside a comment.
pub fn symbol_at(line: &str, character: usize) -> Option<(SymbolKind, String)> {
    if lexer::is_in_comments(line, character) {
        return None;
    }
    let code = lexer::strip_comment(line);
    let chars: Vec<char> = code.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let (kind, close) = match chars[i] {
            '(' => (SymbolKind::Condition, ')'),
            '[' => (SymbolKind::Action, ']'),
            _ => {
                i += 1;
                continue;
            }
        };
        let start = i + 1;
        let Some(offset) = chars[start..].iter().position(|&c| c == close) else {
            break;
        };
        let end = start + offset;
        if character >= i && character <= end {
            let name: String = chars[start..end].iter().collect();
            let name = name.trim().to_string();
            return if name.is_empty() { None } else { Some((kind, name)) };
        }
        i = end + 1;
    }
    None
}

/// Resolve a symbol in a folder: manifest declaration first, usage sites as
/// the fallback. `None` when the name is neither declared nor used, or the
/// token was cancelled.
pub async fn resolve_symbol(
    workspace: &Arc<TreeWorkspace>,
    kind: SymbolKind,
    name: &str,
    cancel: &CancellationToken,
) -> Option<SymbolResolution> {
    if cancel.is_cancelled() {
        return None;
    }
    let manifest_file = manifest::manifest_path(workspace.folder_path());
    if let Ok(text) = tokio::fs::read_to_string(&manifest_file).await {
        if cancel.is_cancelled() {
            return None;
        }
        if let Some(span) = manifest::declaration_span(&text, kind, name) {
            return Some(SymbolResolution::Declaration(span_to_location(
                &manifest_file,
                &text,
                span,
            )));
        }
    }
    if cancel.is_cancelled() {
        return None;
    }
    let usages = workspace.usage_sites(kind, name);
    if usages.is_empty() {
        None
    } else {
        Some(SymbolResolution::Usages(usages))
    }
}

/// All usage occurrences of a symbol across the folder, in tree insertion
/// order then document order. Declarations are not included.
pub fn symbol_references(
    workspace: &TreeWorkspace,
    kind: SymbolKind,
    name: &str,
) -> Vec<SymbolLocation> {
    workspace.usage_sites(kind, name)
}

/// Convert a byte span inside `text` into a line/column location. Spans are
/// clamped to their starting line.
pub(crate) fn span_to_location(path: &Path, text: &str, span: Range<usize>) -> SymbolLocation {
    let before = &text[..span.start];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let column_start = text[line_start..span.start].chars().count();

    let line_end = text[span.start..]
        .find('\n')
        .map_or(text.len(), |i| span.start + i);
    let end = span.end.min(line_end);
    let column_end = column_start + text[span.start..end].chars().count();

    SymbolLocation {
        path: path.to_owned(),
        line,
        columns: Some(column_start..column_end),
    }
}
