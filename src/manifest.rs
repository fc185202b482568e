//! Manifest model: the per-folder `btrees.json` document.
//!
//! A manifest declares the permitted action and condition names for every
//! tree file in its folder. Both sections are optional, and the distinction
//! is load-bearing three ways:
//!
//! - no manifest file → nothing is restricted,
//! - manifest present but a section absent → that kind is unrestricted,
//! - section present but empty → *nothing* of that kind is permitted.
//!
//! Reads are permissive (comments and trailing commas are accepted, as the
//! `jsonc-parser` crate understands them) so hand-edited manifests keep
//! working. Saves merge: missing declared names are added as empty-object
//! entries, nothing is ever removed, and unrelated fields are carried over
//! unchanged. The rewrite is pretty-printed JSON, so comments do not
//! survive a programmatic save.
//!
//! ```json
//! {
//!     "actions": { "action1": {} },
//!     "conditions": { "condition1": {} }
//! }
//! ```

use std::ops::Range;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use jsonc_parser::ast::{Object as JsoncObject, ObjectProp, ObjectPropName, Value as JsoncValue};
use jsonc_parser::{parse_to_ast, parse_to_serde_value, CollectOptions, ParseOptions};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ManifestError, Result};
use crate::symbols::SymbolKind;

/// Manifest file name, fixed per folder.
pub const MANIFEST_FILE: &str = "btrees.json";

/// Reserved per-name metadata record. Currently always empty; written as
/// `{}` so future fields stay backward compatible.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolMeta {}

/// Typed view of a manifest document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<IndexMap<String, SymbolMeta>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<IndexMap<String, SymbolMeta>>,
}

impl Manifest {
    /// Declared action names in manifest order, `None` if unrestricted.
    pub fn declared_actions(&self) -> Option<Vec<String>> {
        self.actions.as_ref().map(|m| m.keys().cloned().collect())
    }

    /// Declared condition names in manifest order, `None` if unrestricted.
    pub fn declared_conditions(&self) -> Option<Vec<String>> {
        self.conditions.as_ref().map(|m| m.keys().cloned().collect())
    }
}

/// Path of the manifest inside a folder.
pub fn manifest_path(folder: &Path) -> PathBuf {
    folder.join(MANIFEST_FILE)
}

/// Read a folder's manifest. `Ok(None)` if the file does not exist; an
/// error if it exists but cannot be read or parsed.
pub async fn read_manifest(folder: &Path) -> Result<Option<Manifest>> {
    let path = manifest_path(folder);
    let text = match tokio::fs::read_to_string(&path).await {
        Ok(text) => text,
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(ManifestError::Read { path, source }),
    };
    parse_manifest(&text, &path).map(Some)
}

/// Parse manifest text permissively into the typed view.
pub fn parse_manifest(text: &str, path: &Path) -> Result<Manifest> {
    match tolerant_value(text, path)? {
        Some(value) => {
            serde_json::from_value(value).map_err(|e| ManifestError::Parse {
                path: path.to_owned(),
                message: e.to_string(),
            })
        }
        // Blank document: same as an empty object.
        None => Ok(Manifest::default()),
    }
}

/// Persist declared names into the folder's manifest, merging with whatever
/// is already on disk.
///
/// Only the `actions`/`conditions` sections are touched, and only by adding
/// missing names; unrelated fields pass through. A `None` list leaves its
/// section exactly as found. Refuses to overwrite a manifest it cannot
/// parse, so a broken document is never silently destroyed.
pub async fn save_manifest(
    folder: &Path,
    actions: Option<&[String]>,
    conditions: Option<&[String]>,
) -> Result<()> {
    let path = manifest_path(folder);
    let existing = match tokio::fs::read_to_string(&path).await {
        Ok(text) => tolerant_value(&text, &path)?,
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => None,
        Err(source) => return Err(ManifestError::Read { path, source }),
    };

    let mut doc = existing.unwrap_or_else(|| Value::Object(Map::new()));
    let root = match doc.as_object_mut() {
        Some(root) => root,
        None => {
            return Err(ManifestError::Parse {
                path,
                message: "manifest root is not an object".to_string(),
            })
        }
    };
    if let Some(names) = actions {
        merge_names(root, "actions", names);
    }
    if let Some(names) = conditions {
        merge_names(root, "conditions", names);
    }

    let json = serde_json::to_string_pretty(&doc)?;
    tokio::fs::write(&path, json)
        .await
        .map_err(|source| ManifestError::Write { path, source })
}

/// Byte range of the property declaring `name` under the section for
/// `kind`, located on the jsonc syntax tree so comments and trailing
/// commas do not shift it.
pub fn declaration_span(text: &str, kind: SymbolKind, name: &str) -> Option<Range<usize>> {
    let parsed = parse_to_ast(
        text,
        &CollectOptions {
            comments: false,
            tokens: false,
        },
        &ParseOptions::default(),
    )
    .ok()?;
    let root = match parsed.value {
        Some(JsoncValue::Object(root)) => root,
        _ => return None,
    };
    let section = match &find_prop(&root, kind.manifest_key())?.value {
        JsoncValue::Object(section) => section,
        _ => return None,
    };
    let prop = find_prop(section, name)?;
    Some(prop.range.start..prop.range.end)
}

fn tolerant_value(text: &str, path: &Path) -> Result<Option<Value>> {
    parse_to_serde_value(text, &ParseOptions::default()).map_err(|e| ManifestError::Parse {
        path: path.to_owned(),
        message: e.to_string(),
    })
}

fn merge_names(root: &mut Map<String, Value>, key: &str, names: &[String]) {
    let section = root
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !section.is_object() {
        // A scalar section cannot hold declarations; start over.
        *section = Value::Object(Map::new());
    }
    if let Some(map) = section.as_object_mut() {
        for name in names {
            map.entry(name.clone())
                .or_insert_with(|| Value::Object(Map::new()));
        }
    }
}

fn find_prop<'a, 'b>(obj: &'a JsoncObject<'b>, name: &str) -> Option<&'a ObjectProp<'b>> {
    obj.properties.iter().find(|prop| prop_name(prop) == name)
}

fn prop_name<'a>(prop: &'a ObjectProp) -> &'a str {
    match &prop.name {
        ObjectPropName::String(s) => s.value.as_ref(),
        ObjectPropName::Word(w) => w.value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    const COMMENTED: &str = indoc! {r#"
        {
            // names this folder may use
            "actions": {
                "action1": {},
                "action2": {},
            },
            "conditions": {},
        }
    "#};

    fn fake_path() -> PathBuf {
        PathBuf::from("btrees.json")
    }

    #[test]
    fn tolerates_comments_and_trailing_commas() {
        let manifest = parse_manifest(COMMENTED, &fake_path()).unwrap();
        assert_eq!(
            manifest.declared_actions(),
            Some(vec!["action1".to_string(), "action2".to_string()])
        );
        assert_eq!(manifest.declared_conditions(), Some(vec![]));
    }

    #[test]
    fn absent_sections_stay_unrestricted() {
        let manifest = parse_manifest(r#"{"actions": {"a": {}}}"#, &fake_path()).unwrap();
        assert!(manifest.actions.is_some());
        assert_eq!(manifest.conditions, None);

        let empty = parse_manifest("{}", &fake_path()).unwrap();
        assert_eq!(empty, Manifest::default());

        let blank = parse_manifest("", &fake_path()).unwrap();
        assert_eq!(blank, Manifest::default());
    }

    #[test]
    fn malformed_manifest_is_an_error() {
        assert!(parse_manifest("{ not json", &fake_path()).is_err());
        assert!(parse_manifest(r#"{"actions": 5}"#, &fake_path()).is_err());
    }

    #[test]
    fn declaration_spans_point_at_the_property() {
        let span = declaration_span(COMMENTED, SymbolKind::Action, "action2").unwrap();
        assert!(COMMENTED[span.clone()].starts_with("\"action2\""));

        assert_eq!(declaration_span(COMMENTED, SymbolKind::Action, "ghost"), None);
        assert_eq!(
            declaration_span(COMMENTED, SymbolKind::Condition, "action1"),
            None
        );
        assert_eq!(declaration_span("[]", SymbolKind::Action, "a"), None);
    }

    #[tokio::test]
    async fn read_is_none_when_file_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(read_manifest(dir.path()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn save_creates_and_merges() {
        let dir = tempfile::tempdir().unwrap();
        let actions = vec!["go".to_string()];
        save_manifest(dir.path(), Some(&actions), None).await.unwrap();

        let manifest = read_manifest(dir.path()).await.unwrap().unwrap();
        assert_eq!(manifest.declared_actions(), Some(vec!["go".to_string()]));
        assert_eq!(manifest.conditions, None);

        // Second save adds without dropping what is there.
        let more = vec!["go".to_string(), "stop".to_string()];
        let conditions = vec!["ready".to_string()];
        save_manifest(dir.path(), Some(&more), Some(&conditions))
            .await
            .unwrap();
        let manifest = read_manifest(dir.path()).await.unwrap().unwrap();
        assert_eq!(
            manifest.declared_actions(),
            Some(vec!["go".to_string(), "stop".to_string()])
        );
        assert_eq!(
            manifest.declared_conditions(),
            Some(vec!["ready".to_string()])
        );
    }

    #[tokio::test]
    async fn save_preserves_unrelated_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = manifest_path(dir.path());
        tokio::fs::write(
            &path,
            r#"{"version": 3, "actions": {"keep": {"note": "hi"}}, "owner": "ai team"}"#,
        )
        .await
        .unwrap();

        let actions = vec!["added".to_string()];
        save_manifest(dir.path(), Some(&actions), None).await.unwrap();

        let raw: Value =
            serde_json::from_str(&tokio::fs::read_to_string(&path).await.unwrap()).unwrap();
        assert_eq!(raw["version"], 3);
        assert_eq!(raw["owner"], "ai team");
        assert_eq!(raw["actions"]["keep"]["note"], "hi");
        assert_eq!(raw["actions"]["added"], Value::Object(Map::new()));
    }

    #[tokio::test]
    async fn save_refuses_to_clobber_a_broken_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let path = manifest_path(dir.path());
        tokio::fs::write(&path, "{ broken").await.unwrap();

        let actions = vec!["go".to_string()];
        assert!(save_manifest(dir.path(), Some(&actions), None).await.is_err());
        // Still broken, still intact.
        assert_eq!(
            tokio::fs::read_to_string(&path).await.unwrap(),
            "{ broken"
        );
    }
}
