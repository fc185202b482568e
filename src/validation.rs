//! Document diagnostics: parse failures and name-declaration consistency.
//!
//! Validation is per document, against its folder workspace. It checks
//! names only; what an action or condition *does* is outside the model.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::ast::BehaviorTree;
use crate::manifest::MANIFEST_FILE;
use crate::symbols::{SymbolKind, SymbolLocation};
use crate::workspace::TreeWorkspace;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// Payload a quick fix needs to declare the flagged name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UndeclaredSymbol {
    pub kind: SymbolKind,
    pub name: String,
    pub folder: PathBuf,
}

/// One finding for one document.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TreeDiagnostic {
    pub message: String,
    /// 1-based line.
    pub line: usize,
    pub severity: Severity,
    pub hint: Option<String>,
    /// Present on undeclared-name findings.
    pub undeclared: Option<UndeclaredSymbol>,
    /// Every indexed usage site of the flagged name across the folder.
    pub related: Vec<SymbolLocation>,
}

/// Validate one tree against its workspace.
///
/// A parse failure yields a single error at the offending line; the partial
/// tree is still checked for undeclared names, one warning per name at its
/// first occurrence.
pub fn validate_tree(workspace: &TreeWorkspace, tree: &BehaviorTree) -> Vec<TreeDiagnostic> {
    let mut diagnostics = Vec::new();

    if let Some(message) = tree.error() {
        diagnostics.push(TreeDiagnostic {
            message: message.to_string(),
            line: tree.error_line().unwrap_or(1),
            severity: Severity::Error,
            hint: None,
            undeclared: None,
            related: Vec::new(),
        });
    }

    for name in workspace.undeclared_actions(tree) {
        diagnostics.push(undeclared_diagnostic(workspace, tree, SymbolKind::Action, name));
    }
    for name in workspace.undeclared_conditions(tree) {
        diagnostics.push(undeclared_diagnostic(
            workspace,
            tree,
            SymbolKind::Condition,
            name,
        ));
    }

    diagnostics
}

fn undeclared_diagnostic(
    workspace: &TreeWorkspace,
    tree: &BehaviorTree,
    kind: SymbolKind,
    name: String,
) -> TreeDiagnostic {
    let occurrences = match kind {
        SymbolKind::Action => tree.action_occurrences(&name),
        SymbolKind::Condition => tree.condition_occurrences(&name),
    };
    let line = occurrences
        .first()
        .map(|&id| tree.node(id).line)
        .unwrap_or(1);
    let related = workspace.usage_sites(kind, &name);
    TreeDiagnostic {
        message: format!(
            "{} \"{}\" is not declared in {}",
            kind.describe(),
            name,
            MANIFEST_FILE
        ),
        line,
        severity: Severity::Warning,
        hint: Some(format!(
            "add \"{}\" to the {} section of {}",
            name,
            kind.manifest_key(),
            MANIFEST_FILE
        )),
        undeclared: Some(UndeclaredSymbol {
            kind,
            name,
            folder: workspace.folder_path().to_owned(),
        }),
        related,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;
    use crate::workspace::TreeWorkspace;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn parse_failures_become_a_single_error() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = TreeWorkspace::open(dir.path());
        workspace.ready().await;

        let tree = parse("->\n[second root]");
        let diagnostics = validate_tree(&workspace, &tree);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, Severity::Error);
        assert_eq!(diagnostics[0].line, 2);
        assert_eq!(diagnostics[0].message, "only one root node is allowed");
        assert_eq!(diagnostics[0].undeclared, None);
    }

    #[tokio::test]
    async fn undeclared_names_warn_at_first_occurrence() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = TreeWorkspace::open(dir.path());
        workspace.ready().await;

        let path = dir.path().join("patrol.tree");
        let tree = parse("->\n|  [go]\n|  [go]\n|  (set)");
        workspace.upsert(&path, std::sync::Arc::new(tree.clone()));
        // Nothing configured yet: clean.
        assert!(validate_tree(&workspace, &tree).is_empty());

        workspace.add_declared_action("other").await.unwrap();
        let diagnostics = validate_tree(&workspace, &tree);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, Severity::Warning);
        assert_eq!(diagnostics[0].line, 2);
        assert_eq!(
            diagnostics[0].message,
            "action \"go\" is not declared in btrees.json"
        );
        let undeclared = diagnostics[0].undeclared.as_ref().unwrap();
        assert_eq!(undeclared.kind, SymbolKind::Action);
        assert_eq!(undeclared.name, "go");
        assert_eq!(undeclared.folder, dir.path());
        let related_lines: Vec<usize> = diagnostics[0].related.iter().map(|s| s.line).collect();
        assert_eq!(related_lines, vec![2, 3]);
        assert_eq!(diagnostics[0].related[0].path, path);

        workspace.add_declared_condition("armed").await.unwrap();
        assert_eq!(validate_tree(&workspace, &tree).len(), 2);
    }
}
