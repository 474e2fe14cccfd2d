//! Error types and source position tracking for WDL parsing, dependency
//! analysis and bundling.
//!
//! Every fallible operation in this crate returns [`WdlError`]. Syntax
//! problems are never reported one at a time: the lexer and parser collect
//! [`Diagnostic`]s into a [`DiagnosticCollector`] and raise them together.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Source position information for AST nodes and errors.
///
/// Contains both the original URI/filename and resolved absolute path,
/// along with one-based line and column positions.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourcePosition {
    /// The filename/URI passed to load or import (may be relative)
    pub uri: String,
    /// The absolute filename/URI after path resolution
    pub abspath: String,
    /// One-based line number where the construct starts
    pub line: u32,
    /// One-based column number where the construct starts
    pub column: u32,
    /// One-based line number where the construct ends
    pub end_line: u32,
    /// One-based column number where the construct ends
    pub end_column: u32,
}

impl SourcePosition {
    pub fn new(
        uri: String,
        abspath: String,
        line: u32,
        column: u32,
        end_line: u32,
        end_column: u32,
    ) -> Self {
        Self {
            uri,
            abspath,
            line,
            column,
            end_line,
            end_column,
        }
    }

    /// A position at the start of the named file.
    pub fn start_of(uri: &str) -> Self {
        Self::new(uri.to_string(), uri.to_string(), 1, 1, 1, 1)
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.uri.is_empty() {
            write!(f, "{}:{}", self.line, self.column)
        } else {
            write!(f, "{}:{}:{}", self.uri, self.line, self.column)
        }
    }
}

/// A single lexer or parser complaint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub line: u32,
    pub column: u32,
    pub message: String,
}

impl Diagnostic {
    pub fn new(line: u32, column: u32, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            message: message.into(),
        }
    }

    pub fn at(pos: &SourcePosition, message: impl Into<String>) -> Self {
        Self::new(pos.line, pos.column, message)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.message)
    }
}

fn display_uri(uri: &str) -> &str {
    if uri.is_empty() {
        "<input>"
    } else {
        uri
    }
}

fn summarize(diagnostics: &[Diagnostic]) -> String {
    match diagnostics {
        [] => "no diagnostics".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{} (and {} more)", first, rest.len()),
    }
}

fn render_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Main error type for all WDL-related errors.
#[derive(Error, Debug)]
pub enum WdlError {
    /// Failure to lex/parse a WDL document; carries every diagnostic found
    #[error("Syntax error in {}: {}", display_uri(.uri), summarize(.diagnostics))]
    Syntax {
        uri: String,
        diagnostics: Vec<Diagnostic>,
    },

    /// Failure to resolve, open or read an imported WDL document
    #[error("Import error: {message}")]
    Import {
        pos: SourcePosition,
        uri: String,
        message: String,
        #[source]
        cause: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An import chain leads back to one of its own ancestors
    #[error("Circular dependency: {}", render_chain(.chain))]
    CircularDependency { chain: Vec<PathBuf> },

    /// Read/write failure on a source or archive file
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Malformed archive or unsafe archive contents
    #[error("Bundle error: {message}")]
    Bundle { message: String },

    /// Unreadable or invalid bundling configuration
    #[error("Configuration error in {}: {message}", .path.display())]
    Config { path: PathBuf, message: String },
}

impl WdlError {
    /// Create a syntax error from a single diagnostic.
    pub fn syntax_error(pos: SourcePosition, message: impl Into<String>) -> Self {
        WdlError::Syntax {
            diagnostics: vec![Diagnostic::at(&pos, message)],
            uri: pos.uri,
        }
    }

    /// Create an import error.
    pub fn import_error(pos: SourcePosition, import_uri: &str, message: Option<String>) -> Self {
        let msg = match message {
            Some(m) => format!("Failed to import {}, {}", import_uri, m),
            None => format!("Failed to import {}", import_uri),
        };
        WdlError::Import {
            pos,
            uri: import_uri.to_string(),
            message: msg,
            cause: None,
        }
    }

    /// Create an I/O error annotated with the offending path.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        WdlError::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a bundle error.
    pub fn bundle(message: impl Into<String>) -> Self {
        WdlError::Bundle {
            message: message.into(),
        }
    }

    /// All diagnostics carried by a syntax error (empty for other kinds).
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            WdlError::Syntax { diagnostics, .. } => diagnostics,
            _ => &[],
        }
    }
}

/// Annotates `io::Result`s with the path they concern.
pub trait IoResultExt<T> {
    fn with_path(self, path: &Path) -> Result<T, WdlError>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn with_path(self, path: &Path) -> Result<T, WdlError> {
        self.map_err(|e| WdlError::io(path, e))
    }
}

/// Context for collecting multiple diagnostics.
///
/// This allows lexing and parsing to continue after encountering errors,
/// collecting them all before reporting.
#[derive(Debug, Default)]
pub struct DiagnosticCollector {
    uri: String,
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    pub fn new(uri: &str) -> Self {
        Self {
            uri: uri.to_string(),
            diagnostics: Vec::new(),
        }
    }

    /// Manually append an error to the collection.
    pub fn append(&mut self, error: WdlError) {
        match error {
            WdlError::Syntax { diagnostics, .. } => self.diagnostics.extend(diagnostics),
            other => self
                .diagnostics
                .push(Diagnostic::new(1, 1, other.to_string())),
        }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Raise collected errors, if any.
    /// Returns Ok(()) if no errors were collected.
    pub fn maybe_raise(mut self) -> Result<(), WdlError> {
        if self.diagnostics.is_empty() {
            return Ok(());
        }
        self.diagnostics
            .sort_by(|a, b| (a.line, a.column).cmp(&(b.line, b.column)));
        self.diagnostics.dedup();
        Err(WdlError::Syntax {
            uri: self.uri,
            diagnostics: self.diagnostics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_position_ordering() {
        let pos1 = SourcePosition::new("test.wdl".to_string(), "/test.wdl".to_string(), 1, 1, 1, 5);
        let pos2 = SourcePosition::new("test.wdl".to_string(), "/test.wdl".to_string(), 1, 6, 1, 10);
        let pos3 = SourcePosition::new("test.wdl".to_string(), "/test.wdl".to_string(), 2, 1, 2, 5);

        assert!(pos1 < pos2);
        assert!(pos2 < pos3);
        assert_eq!(pos3.to_string(), "test.wdl:2:1");
    }

    #[test]
    fn test_syntax_error() {
        let pos = SourcePosition::new("test.wdl".to_string(), "/test.wdl".to_string(), 3, 7, 3, 9);
        let error = WdlError::syntax_error(pos, "unexpected token");

        match &error {
            WdlError::Syntax { uri, diagnostics } => {
                assert_eq!(uri, "test.wdl");
                assert_eq!(diagnostics, &vec![Diagnostic::new(3, 7, "unexpected token")]);
            }
            _ => panic!("Expected syntax error"),
        }
        assert_eq!(
            error.to_string(),
            "Syntax error in test.wdl: 3:7: unexpected token"
        );
    }

    #[test]
    fn test_import_error() {
        let pos = SourcePosition::start_of("main.wdl");
        let error = WdlError::import_error(pos.clone(), "missing.wdl", None);

        match &error {
            WdlError::Import { pos: error_pos, message, uri, .. } => {
                assert_eq!(error_pos, &pos);
                assert_eq!(uri, "missing.wdl");
                assert_eq!(message, "Failed to import missing.wdl");
            }
            _ => panic!("Expected import error"),
        }
    }

    #[test]
    fn test_circular_dependency_message() {
        let error = WdlError::CircularDependency {
            chain: vec![
                PathBuf::from("/w/a.wdl"),
                PathBuf::from("/w/b.wdl"),
                PathBuf::from("/w/a.wdl"),
            ],
        };
        assert_eq!(
            error.to_string(),
            "Circular dependency: /w/a.wdl -> /w/b.wdl -> /w/a.wdl"
        );
    }

    #[test]
    fn test_io_result_ext() {
        let result: io::Result<()> = Err(io::Error::new(io::ErrorKind::NotFound, "gone"));
        let error = result.with_path(Path::new("/nowhere.wdl")).unwrap_err();
        match error {
            WdlError::Io { path, source } => {
                assert_eq!(path, PathBuf::from("/nowhere.wdl"));
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            _ => panic!("Expected I/O error"),
        }
    }

    #[test]
    fn test_diagnostic_collector() {
        let mut ctx = DiagnosticCollector::new("test.wdl");
        assert!(DiagnosticCollector::new("empty.wdl").maybe_raise().is_ok());

        ctx.push(Diagnostic::new(5, 1, "second"));
        ctx.append(WdlError::syntax_error(
            SourcePosition::new("test.wdl".into(), "test.wdl".into(), 2, 3, 2, 4),
            "first",
        ));

        match ctx.maybe_raise().unwrap_err() {
            WdlError::Syntax { diagnostics, .. } => {
                assert_eq!(diagnostics[0].message, "first");
                assert_eq!(diagnostics[1].message, "second");
            }
            _ => panic!("Expected syntax error"),
        }
    }

    #[test]
    fn test_empty_collector_is_ok() {
        assert!(DiagnosticCollector::new("x.wdl").maybe_raise().is_ok());
    }
}
