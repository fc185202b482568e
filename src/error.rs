//! Error types and pretty error reporting.
//!
//! Parse problems are *data*, not errors: the parser always returns a tree
//! and records failures in its `error`/`error_line` fields (see
//! [`crate::parse`]). The fallible operations in this crate are manifest
//! I/O, covered by [`ManifestError`].
//!
//! [`ErrorReporter`] renders a recorded parse failure with
//! [ariadne](https://crates.io/crates/ariadne) for terminal output:
//!
//! ```rust
//! use btree_lang::{parse, ErrorReporter};
//!
//! let source = "->\n|  [unterminated";
//! let tree = parse(source);
//! let reporter = ErrorReporter::new("patrol.tree", source);
//! // reporter.report_parse_error(tree.error().unwrap(), tree.error_line().unwrap());
//! ```

use ariadne::{Color, Label, Report, ReportKind, Source};
use std::path::PathBuf;
use thiserror::Error;

/// Errors from reading, writing, or interpreting a `btrees.json` manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("unable to read manifest from {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to write manifest to {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("manifest {} is not valid JSON: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("unable to serialize manifest: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type for manifest operations.
pub type Result<T> = std::result::Result<T, ManifestError>;

/// Error reporter that uses ariadne for pretty terminal output.
pub struct ErrorReporter<'src> {
    source_name: String,
    source: &'src str,
}

impl<'src> ErrorReporter<'src> {
    /// Create a new error reporter over one document.
    pub fn new(source_name: impl Into<String>, source: &'src str) -> Self {
        Self {
            source_name: source_name.into(),
            source,
        }
    }

    /// Report a parse error (message plus 1-based line) to stderr.
    pub fn report_parse_error(&self, message: &str, line: usize) {
        let span = line_span(self.source, line);

        Report::build(ReportKind::Error, &self.source_name, span.start)
            .with_message(message)
            .with_label(
                Label::new((&self.source_name, span))
                    .with_color(Color::Red)
                    .with_message("offending line"),
            )
            .finish()
            .eprint((&self.source_name, Source::from(self.source)))
            .unwrap();
    }
}

/// Byte range of a 1-based line, excluding its terminator.
fn line_span(source: &str, line: usize) -> std::ops::Range<usize> {
    let mut offset = 0;
    for (idx, raw) in source.split_inclusive('\n').enumerate() {
        if idx + 1 == line {
            let content = raw.trim_end_matches(['\n', '\r']);
            return offset..offset + content.len();
        }
        offset += raw.len();
    }
    offset..offset
}
