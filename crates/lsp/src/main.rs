use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use btree_lang::events::Subscription;
use btree_lang::lexer::{self, FormatOptions};
use btree_lang::symbols;
use btree_lang::validation::UndeclaredSymbol;
use btree_lang::{
    parse, validate_tree, BehaviorTree, HostMessage, ManifestError, Severity, Status, SymbolKind,
    SymbolLocation, SymbolResolution, TreeDiagnostic, TreeWorkspace, WorkspaceRegistry,
    MANIFEST_FILE,
};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer, LspService, Server};

const DECLARE_ACTION_COMMAND: &str = "tree.declareAction";
const DECLARE_CONDITION_COMMAND: &str = "tree.declareCondition";
const DECLARE_ALL_COMMAND: &str = "tree.declareAll";

// =============================================================================
// Document State
// =============================================================================

/// Cached parse state for a single document.
struct DocumentState {
    source: String,
    tree: Arc<BehaviorTree>,
}

impl DocumentState {
    fn new(source: String) -> Self {
        let tree = Arc::new(parse(&source));
        Self { source, tree }
    }
}

// =============================================================================
// Backend
// =============================================================================

struct Backend {
    client: Client,
    registry: Arc<WorkspaceRegistry>,
    documents: Arc<RwLock<HashMap<Url, DocumentState>>>,
    subscriptions: parking_lot::Mutex<Vec<Subscription>>,
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend").finish()
    }
}

impl Backend {
    fn new(client: Client) -> Self {
        Self {
            client,
            registry: Arc::new(WorkspaceRegistry::new()),
            documents: Arc::new(RwLock::new(HashMap::new())),
            subscriptions: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Workspace owning a document's folder, created on first touch.
    /// `None` for URIs without a filesystem path.
    fn workspace_for(&self, uri: &Url) -> Option<Arc<TreeWorkspace>> {
        let path = uri.to_file_path().ok()?;
        self.registry.workspace_for_file(&path)
    }

    async fn update_document(&self, uri: Url, text: String) {
        let doc = DocumentState::new(text);
        let tree = doc.tree.clone();
        self.documents.write().await.insert(uri.clone(), doc);

        if let (Ok(path), Some(workspace)) = (uri.to_file_path(), self.workspace_for(&uri)) {
            workspace.ready().await;
            workspace.upsert(path, tree);
        }
        self.publish_diagnostics(&uri).await;
    }

    async fn publish_diagnostics(&self, uri: &Url) {
        let diagnostics = {
            let docs = self.documents.read().await;
            let Some(doc) = docs.get(uri) else { return };
            match self.workspace_for(uri) {
                Some(workspace) => diagnostics_for(&workspace, doc),
                None => parse_only_diagnostics(doc),
            }
        };
        self.client
            .publish_diagnostics(uri.clone(), diagnostics, None)
            .await;
    }

    /// Ask the client to watch every manifest in the workspace. Reloads are
    /// driven by `did_change_watched_files`.
    async fn register_manifest_watcher(&self) {
        let options = DidChangeWatchedFilesRegistrationOptions {
            watchers: vec![FileSystemWatcher {
                glob_pattern: GlobPattern::String(format!("**/{}", MANIFEST_FILE)),
                kind: None,
            }],
        };
        let registration = Registration {
            id: "btree-manifest-watcher".to_string(),
            method: "workspace/didChangeWatchedFiles".to_string(),
            register_options: serde_json::to_value(options).ok(),
        };
        if let Err(error) = self.client.register_capability(vec![registration]).await {
            log::warn!("manifest watcher registration failed: {error}");
        }
    }

    /// Revalidate a workspace's open documents whenever one of its trees or
    /// its manifest changes. Upserts made by other documents can change the
    /// filename-stem exemption, so the whole folder is refreshed.
    fn start_event_pump(&self) {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let tree_tx = tx.clone();
        let on_tree = self.registry.on_tree_changed(move |event| {
            let _ = tree_tx.send(event.workspace.clone());
        });
        let on_lifecycle = self.registry.on_workspace_event(move |event| {
            let _ = tx.send(event.workspace.clone());
        });
        {
            let mut subscriptions = self.subscriptions.lock();
            subscriptions.push(on_tree);
            subscriptions.push(on_lifecycle);
        }

        let client = self.client.clone();
        let documents = Arc::clone(&self.documents);
        tokio::spawn(async move {
            while let Some(workspace) = rx.recv().await {
                publish_folder(&client, &documents, &workspace).await;
            }
        });
    }

    async fn report_save_outcome(&self, outcome: std::result::Result<bool, ManifestError>) {
        if let Err(error) = outcome {
            log::warn!("{error}");
            self.client
                .show_message(
                    MessageType::ERROR,
                    format!("{} update failed: {}", MANIFEST_FILE, error),
                )
                .await;
        }
    }

    async fn symbol_at_position(&self, uri: &Url, position: Position) -> Option<(SymbolKind, String)> {
        let docs = self.documents.read().await;
        let doc = docs.get(uri)?;
        let line = doc.source.lines().nth(position.line as usize)?;
        symbols::symbol_at(line, position.character as usize)
    }
}

// =============================================================================
// Diagnostics
// =============================================================================

async fn publish_folder(
    client: &Client,
    documents: &RwLock<HashMap<Url, DocumentState>>,
    workspace: &Arc<TreeWorkspace>,
) {
    let batch: Vec<(Url, Vec<Diagnostic>)> = {
        let docs = documents.read().await;
        docs.iter()
            .filter(|(uri, _)| {
                uri.to_file_path()
                    .ok()
                    .and_then(|path| path.parent().map(|dir| dir == workspace.folder_path()))
                    .unwrap_or(false)
            })
            .map(|(uri, doc)| (uri.clone(), diagnostics_for(workspace, doc)))
            .collect()
    };
    for (uri, diagnostics) in batch {
        client.publish_diagnostics(uri, diagnostics, None).await;
    }
}

fn diagnostics_for(workspace: &TreeWorkspace, doc: &DocumentState) -> Vec<Diagnostic> {
    validate_tree(workspace, &doc.tree)
        .into_iter()
        .map(|finding| finding_to_diagnostic(&doc.source, finding))
        .collect()
}

/// Fallback for documents outside any folder: parse errors only.
fn parse_only_diagnostics(doc: &DocumentState) -> Vec<Diagnostic> {
    let Some(message) = doc.tree.error() else {
        return Vec::new();
    };
    vec![Diagnostic {
        range: line_range(&doc.source, doc.tree.error_line().unwrap_or(1)),
        severity: Some(DiagnosticSeverity::ERROR),
        source: Some("btree".to_string()),
        message: message.to_string(),
        ..Default::default()
    }]
}

fn finding_to_diagnostic(text: &str, finding: TreeDiagnostic) -> Diagnostic {
    let mut message = finding.message;
    if let Some(hint) = &finding.hint {
        message.push_str(&format!("\nHint: {}", hint));
    }

    let code = finding.undeclared.as_ref().map(|symbol| {
        NumberOrString::String(match symbol.kind {
            SymbolKind::Action => "undeclared-action".to_string(),
            SymbolKind::Condition => "undeclared-condition".to_string(),
        })
    });

    let related_information = if finding.related.is_empty() {
        None
    } else {
        Some(
            finding
                .related
                .iter()
                .filter_map(|site| {
                    Some(DiagnosticRelatedInformation {
                        location: site_to_location(site)?,
                        message: "used here".to_string(),
                    })
                })
                .collect(),
        )
    };

    Diagnostic {
        range: line_range(text, finding.line),
        severity: Some(match finding.severity {
            Severity::Error => DiagnosticSeverity::ERROR,
            Severity::Warning => DiagnosticSeverity::WARNING,
        }),
        code,
        source: Some("btree".to_string()),
        message,
        related_information,
        data: finding
            .undeclared
            .and_then(|symbol| serde_json::to_value(symbol).ok()),
        ..Default::default()
    }
}

// =============================================================================
// Completions
// =============================================================================

fn completion_items(workspace: &TreeWorkspace, trigger: Option<&str>) -> Vec<CompletionItem> {
    match trigger {
        // Inside a just-opened bracket the marker is already typed.
        Some("(") => bare_name_items(
            known_names(workspace, SymbolKind::Condition),
            CompletionItemKind::VARIABLE,
            "condition",
        ),
        Some("[") => bare_name_items(
            known_names(workspace, SymbolKind::Action),
            CompletionItemKind::FUNCTION,
            "action",
        ),
        _ => {
            let mut items = vec![
                keyword_item("->", "sequence: run children in order until one fails", None),
                keyword_item("?", "selector: run children in order until one succeeds", None),
                keyword_item("=N", "decorator: repeat the child N times", Some("=")),
            ];
            for name in known_names(workspace, SymbolKind::Condition) {
                items.push(CompletionItem {
                    label: format!("({})", name),
                    kind: Some(CompletionItemKind::VARIABLE),
                    detail: Some("condition".to_string()),
                    ..Default::default()
                });
            }
            for name in known_names(workspace, SymbolKind::Action) {
                items.push(CompletionItem {
                    label: format!("[{}]", name),
                    kind: Some(CompletionItemKind::FUNCTION),
                    detail: Some("action".to_string()),
                    ..Default::default()
                });
            }
            items
        }
    }
}

/// Names worth offering: the declared list when the folder is configured,
/// every used name otherwise.
fn known_names(workspace: &TreeWorkspace, kind: SymbolKind) -> Vec<String> {
    match kind {
        SymbolKind::Action => workspace
            .actions_declared()
            .unwrap_or_else(|| workspace.actions_used()),
        SymbolKind::Condition => workspace
            .conditions_declared()
            .unwrap_or_else(|| workspace.conditions_used()),
    }
}

fn bare_name_items(
    names: Vec<String>,
    kind: CompletionItemKind,
    detail: &str,
) -> Vec<CompletionItem> {
    names
        .into_iter()
        .map(|name| CompletionItem {
            label: name,
            kind: Some(kind),
            detail: Some(detail.to_string()),
            ..Default::default()
        })
        .collect()
}

fn keyword_item(label: &str, detail: &str, insert_text: Option<&str>) -> CompletionItem {
    CompletionItem {
        label: label.to_string(),
        kind: Some(CompletionItemKind::KEYWORD),
        detail: Some(detail.to_string()),
        insert_text: insert_text.map(str::to_string),
        ..Default::default()
    }
}

// =============================================================================
// On-Type Formatting
// =============================================================================

/// Edits applied as the user types: `|` grows one tab stop, newline repeats
/// the previous line's indentation (one level deeper under a parent).
fn on_type_edits(
    source: &str,
    position: Position,
    ch: &str,
    options: &FormatOptions,
) -> Option<Vec<TextEdit>> {
    let new_text = match ch {
        "|" => lexer::tab(options),
        "\n" => {
            let previous = source.lines().nth((position.line as usize).checked_sub(1)?)?;
            let (indents, _) = lexer::split_source_line(previous);
            let mut depth = lexer::indent_depth(indents);
            if lexer::is_parent_node(previous) {
                depth += 1;
            }
            if depth == 0 {
                return None;
            }
            format!("|{}", lexer::tab(options)).repeat(depth)
        }
        _ => return None,
    };
    Some(vec![TextEdit {
        range: Range {
            start: position,
            end: position,
        },
        new_text,
    }])
}

// =============================================================================
// LSP Trait Implementation
// =============================================================================

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, _: InitializeParams) -> Result<InitializeResult> {
        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                completion_provider: Some(CompletionOptions {
                    trigger_characters: Some(vec!["[".to_string(), "(".to_string()]),
                    ..Default::default()
                }),
                definition_provider: Some(OneOf::Left(true)),
                references_provider: Some(OneOf::Left(true)),
                code_action_provider: Some(CodeActionProviderCapability::Simple(true)),
                execute_command_provider: Some(ExecuteCommandOptions {
                    commands: vec![
                        DECLARE_ACTION_COMMAND.to_string(),
                        DECLARE_CONDITION_COMMAND.to_string(),
                        DECLARE_ALL_COMMAND.to_string(),
                    ],
                    ..Default::default()
                }),
                document_on_type_formatting_provider: Some(DocumentOnTypeFormattingOptions {
                    first_trigger_character: "|".to_string(),
                    more_trigger_character: Some(vec!["\n".to_string()]),
                }),
                ..Default::default()
            },
            ..Default::default()
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        self.client
            .log_message(MessageType::INFO, "behavior tree LSP initialized")
            .await;
        self.register_manifest_watcher().await;
        self.start_event_pump();
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        self.update_document(params.text_document.uri, params.text_document.text)
            .await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        if let Some(change) = params.content_changes.into_iter().next() {
            self.update_document(params.text_document.uri, change.text)
                .await;
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        self.documents
            .write()
            .await
            .remove(&params.text_document.uri);
    }

    async fn did_change_watched_files(&self, params: DidChangeWatchedFilesParams) {
        for event in params.changes {
            let Ok(path) = event.uri.to_file_path() else {
                continue;
            };
            if path.file_name().and_then(|name| name.to_str()) != Some(MANIFEST_FILE) {
                continue;
            }
            let Some(folder) = path.parent() else {
                continue;
            };
            // Creation, change, and deletion all reduce to a reload; the
            // event pump republishes the folder's diagnostics.
            if let Some(workspace) = self.registry.get(folder) {
                workspace.reload_manifest().await;
            }
        }
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let uri = params.text_document_position.text_document.uri;
        let Some(workspace) = self.workspace_for(&uri) else {
            return Ok(None);
        };
        let trigger = params
            .context
            .as_ref()
            .and_then(|context| context.trigger_character.as_deref());
        let items = completion_items(&workspace, trigger);
        if items.is_empty() {
            Ok(None)
        } else {
            Ok(Some(CompletionResponse::Array(items)))
        }
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let position = params.text_document_position_params.position;
        let uri = params.text_document_position_params.text_document.uri;
        let Some((kind, name)) = self.symbol_at_position(&uri, position).await else {
            return Ok(None);
        };
        let Some(workspace) = self.workspace_for(&uri) else {
            return Ok(None);
        };
        workspace.ready().await;

        let cancel = CancellationToken::new();
        let response = match symbols::resolve_symbol(&workspace, kind, &name, &cancel).await {
            Some(SymbolResolution::Declaration(site)) => {
                site_to_location(&site).map(GotoDefinitionResponse::Scalar)
            }
            Some(SymbolResolution::Usages(sites)) => {
                let locations: Vec<Location> = sites.iter().filter_map(site_to_location).collect();
                (!locations.is_empty()).then_some(GotoDefinitionResponse::Array(locations))
            }
            None => None,
        };
        Ok(response)
    }

    async fn references(&self, params: ReferenceParams) -> Result<Option<Vec<Location>>> {
        let position = params.text_document_position.position;
        let uri = params.text_document_position.text_document.uri;
        let Some((kind, name)) = self.symbol_at_position(&uri, position).await else {
            return Ok(None);
        };
        let Some(workspace) = self.workspace_for(&uri) else {
            return Ok(None);
        };
        workspace.ready().await;

        let locations: Vec<Location> = symbols::symbol_references(&workspace, kind, &name)
            .iter()
            .filter_map(site_to_location)
            .collect();
        if locations.is_empty() {
            Ok(None)
        } else {
            Ok(Some(locations))
        }
    }

    async fn code_action(&self, params: CodeActionParams) -> Result<Option<CodeActionResponse>> {
        let mut actions: Vec<CodeActionOrCommand> = Vec::new();
        let mut folder = None;

        for diagnostic in &params.context.diagnostics {
            let Some(symbol) = diagnostic
                .data
                .clone()
                .and_then(|data| serde_json::from_value::<UndeclaredSymbol>(data).ok())
            else {
                continue;
            };
            let title = format!(
                "Declare {} \"{}\" in {}",
                symbol.kind.describe(),
                symbol.name,
                MANIFEST_FILE
            );
            let command = match symbol.kind {
                SymbolKind::Action => DECLARE_ACTION_COMMAND,
                SymbolKind::Condition => DECLARE_CONDITION_COMMAND,
            };
            folder = Some(symbol.folder.clone());
            actions.push(CodeActionOrCommand::CodeAction(CodeAction {
                title: title.clone(),
                kind: Some(CodeActionKind::QUICKFIX),
                diagnostics: Some(vec![diagnostic.clone()]),
                is_preferred: Some(true),
                command: Some(Command {
                    title,
                    command: command.to_string(),
                    arguments: serde_json::to_value(&symbol).ok().map(|value| vec![value]),
                }),
                ..Default::default()
            }));
        }

        if let (Some(folder), Ok(path)) = (folder, params.text_document.uri.to_file_path()) {
            let title = format!(
                "Declare all undeclared actions and conditions in {}",
                MANIFEST_FILE
            );
            let arguments = serde_json::to_value(DeclareAllArgs { folder, path })
                .ok()
                .map(|value| vec![value]);
            actions.push(CodeActionOrCommand::CodeAction(CodeAction {
                title: title.clone(),
                kind: Some(CodeActionKind::QUICKFIX),
                command: Some(Command {
                    title,
                    command: DECLARE_ALL_COMMAND.to_string(),
                    arguments,
                }),
                ..Default::default()
            }));
        }

        if actions.is_empty() {
            Ok(None)
        } else {
            Ok(Some(actions))
        }
    }

    async fn execute_command(
        &self,
        params: ExecuteCommandParams,
    ) -> Result<Option<serde_json::Value>> {
        match params.command.as_str() {
            DECLARE_ACTION_COMMAND | DECLARE_CONDITION_COMMAND => {
                let symbol: UndeclaredSymbol = first_argument(params.arguments)?;
                let workspace = self.registry.get_or_create(&symbol.folder);
                workspace.ready().await;
                let outcome = match symbol.kind {
                    SymbolKind::Action => workspace.add_declared_action(&symbol.name).await,
                    SymbolKind::Condition => workspace.add_declared_condition(&symbol.name).await,
                };
                self.report_save_outcome(outcome).await;
                publish_folder(&self.client, &self.documents, &workspace).await;
            }
            DECLARE_ALL_COMMAND => {
                let args: DeclareAllArgs = first_argument(params.arguments)?;
                let workspace = self.registry.get_or_create(&args.folder);
                workspace.ready().await;
                let outcome = workspace.add_all_undeclared(&args.path).await;
                self.report_save_outcome(outcome).await;
                publish_folder(&self.client, &self.documents, &workspace).await;
            }
            other => {
                return Err(tower_lsp::jsonrpc::Error::invalid_params(format!(
                    "unknown command: {}",
                    other
                )));
            }
        }
        Ok(None)
    }

    async fn on_type_formatting(
        &self,
        params: DocumentOnTypeFormattingParams,
    ) -> Result<Option<Vec<TextEdit>>> {
        let position = params.text_document_position.position;
        let uri = params.text_document_position.text_document.uri;
        let docs = self.documents.read().await;
        let Some(doc) = docs.get(&uri) else {
            return Ok(None);
        };
        let options = FormatOptions {
            insert_spaces: params.options.insert_spaces,
            tab_size: params.options.tab_size as usize,
        };
        Ok(on_type_edits(&doc.source, position, &params.ch, &options))
    }
}

// =============================================================================
// Custom Request Handlers (tree/*)
// =============================================================================

/// Parameters for tree/preview request.
#[derive(Debug, serde::Deserialize)]
struct PreviewParams {
    uri: String,
}

/// Parameters for tree/setStatus request.
#[derive(Debug, serde::Deserialize)]
struct SetStatusParams {
    uri: String,
    kind: SymbolKind,
    name: String,
    status: Status,
}

/// Arguments of the declare-all command.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct DeclareAllArgs {
    folder: PathBuf,
    path: PathBuf,
}

impl Backend {
    /// Handle tree/preview: the treeChanged message for one document, as a
    /// preview surface expects it.
    async fn handle_preview(&self, params: serde_json::Value) -> Result<serde_json::Value> {
        let params: PreviewParams = serde_json::from_value(params)
            .map_err(|e| tower_lsp::jsonrpc::Error::invalid_params(e.to_string()))?;

        let uri: Url = params
            .uri
            .parse()
            .map_err(|e| tower_lsp::jsonrpc::Error::invalid_params(format!("{}", e)))?;

        let docs = self.documents.read().await;
        let doc = docs
            .get(&uri)
            .ok_or_else(|| tower_lsp::jsonrpc::Error::invalid_params("Document not found"))?;

        let message = HostMessage::TreeChanged {
            tree: doc.tree.to_wire(),
        };
        serde_json::to_value(&message).map_err(|e| tower_lsp::jsonrpc::Error {
            code: tower_lsp::jsonrpc::ErrorCode::InternalError,
            message: e.to_string().into(),
            data: None,
        })
    }

    /// Handle tree/setStatus: apply a status to every occurrence of a name
    /// and return the updated treeChanged message. Statuses are view state;
    /// they reset on the next reparse.
    async fn handle_set_status(&self, params: serde_json::Value) -> Result<serde_json::Value> {
        let params: SetStatusParams = serde_json::from_value(params)
            .map_err(|e| tower_lsp::jsonrpc::Error::invalid_params(e.to_string()))?;

        let uri: Url = params
            .uri
            .parse()
            .map_err(|e| tower_lsp::jsonrpc::Error::invalid_params(format!("{}", e)))?;

        let updated = {
            let mut docs = self.documents.write().await;
            let doc = docs
                .get_mut(&uri)
                .ok_or_else(|| tower_lsp::jsonrpc::Error::invalid_params("Document not found"))?;
            let mut tree = (*doc.tree).clone();
            match params.kind {
                SymbolKind::Action => tree.set_action_status(&params.name, params.status),
                SymbolKind::Condition => tree.set_condition_status(&params.name, params.status),
            };
            doc.tree = Arc::new(tree);
            doc.tree.clone()
        };

        let message = HostMessage::TreeChanged {
            tree: updated.to_wire(),
        };
        serde_json::to_value(&message).map_err(|e| tower_lsp::jsonrpc::Error {
            code: tower_lsp::jsonrpc::ErrorCode::InternalError,
            message: e.to_string().into(),
            data: None,
        })
    }
}

fn first_argument<T: serde::de::DeserializeOwned>(arguments: Vec<serde_json::Value>) -> Result<T> {
    let value = arguments
        .into_iter()
        .next()
        .ok_or_else(|| tower_lsp::jsonrpc::Error::invalid_params("missing command argument"))?;
    serde_json::from_value(value).map_err(|e| tower_lsp::jsonrpc::Error::invalid_params(e.to_string()))
}

// =============================================================================
// Utility Functions
// =============================================================================

fn site_to_location(site: &SymbolLocation) -> Option<Location> {
    let uri = Url::from_file_path(&site.path).ok()?;
    Some(Location {
        uri,
        range: site_range(site),
    })
}

fn site_range(site: &SymbolLocation) -> Range {
    let line = site.line.saturating_sub(1) as u32;
    match &site.columns {
        Some(columns) => Range {
            start: Position {
                line,
                character: columns.start as u32,
            },
            end: Position {
                line,
                character: columns.end as u32,
            },
        },
        // Whole-line site: run to the start of the next line.
        None => Range {
            start: Position { line, character: 0 },
            end: Position {
                line: line + 1,
                character: 0,
            },
        },
    }
}

/// Whole-line range of a 1-based line in `text`.
fn line_range(text: &str, line: usize) -> Range {
    let index = line.saturating_sub(1);
    let length = text
        .lines()
        .nth(index)
        .map_or(0, |content| content.chars().count());
    Range {
        start: Position {
            line: index as u32,
            character: 0,
        },
        end: Position {
            line: index as u32,
            character: length as u32,
        },
    }
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() {
    env_logger::init();

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::build(Backend::new)
        .custom_method("tree/preview", Backend::handle_preview)
        .custom_method("tree/setStatus", Backend::handle_set_status)
        .finish();
    Server::new(stdin, stdout, socket).serve(service).await;
}
