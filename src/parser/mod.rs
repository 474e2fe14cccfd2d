//! WDL parser: a nom-based lexer feeding per-production recursive-descent
//! parsers

pub mod declarations;
pub mod document;
pub mod expressions;
pub mod keywords;
pub mod lexer;
pub mod literals;
pub mod parser_utils;
pub mod statements;
pub mod tasks;
pub mod token_stream;
pub mod tokens;
pub mod types;

use crate::error::{Diagnostic, WdlError};
use crate::expr::Expression;
use crate::fs_utils;
use crate::tree::Document;
use std::path::Path;

pub use document::parse_document;

/// Decode UTF-8, reporting invalid bytes as a located syntax diagnostic
fn decode(content: &[u8], uri: &str) -> Result<String, WdlError> {
    match std::str::from_utf8(content) {
        Ok(text) => Ok(text.to_string()),
        Err(err) => {
            let valid = &content[..err.valid_up_to()];
            let line = valid.iter().filter(|&&b| b == b'\n').count() as u32 + 1;
            let line_start = valid
                .iter()
                .rposition(|&b| b == b'\n')
                .map(|i| i + 1)
                .unwrap_or(0);
            let column = String::from_utf8_lossy(&valid[line_start..]).chars().count() as u32 + 1;
            Err(WdlError::Syntax {
                uri: uri.to_string(),
                diagnostics: vec![Diagnostic::new(line, column, "Invalid UTF-8 in source")],
            })
        }
    }
}

/// Parse a WDL document from a file, recording its canonical path
pub fn parse<P: AsRef<Path>>(path: P) -> Result<Document, WdlError> {
    let path = path.as_ref();
    let content = fs_utils::read_file_to_bytes(path)?;
    let canonical = fs_utils::absolute_path(path)?;
    let uri = path.display().to_string();
    let source = decode(&content, &uri)?;
    let mut doc = parse_document(&source, &uri)?;
    doc.source = Some(canonical);
    Ok(doc)
}

/// Parse a WDL document from in-memory bytes
pub fn parse_bytes(content: &[u8]) -> Result<Document, WdlError> {
    let source = decode(content, "")?;
    parse_document(&source, "")
}

/// Parse a standalone expression such as `a + b * 2`
pub fn parse_expression_str(text: &str) -> Result<Expression, WdlError> {
    let mut stream = token_stream::TokenStream::new(text, "")?;
    let expr = expressions::parse_expression(&mut stream)?;
    stream.expect_eof()?;
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::BinaryOperator;
    use tempfile::TempDir;

    #[test]
    fn test_parse_file_sets_source() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("hello.wdl");
        std::fs::write(&file, "version 1.0\ntask t { command <<< echo >>> }\n").unwrap();

        let doc = parse(&file).unwrap();
        assert_eq!(doc.source(), Some(file.canonicalize().unwrap().as_path()));
        assert_eq!(doc.tasks.len(), 1);
    }

    #[test]
    fn test_parse_missing_file() {
        let temp = TempDir::new().unwrap();
        let err = parse(temp.path().join("nope.wdl")).unwrap_err();
        assert!(matches!(err, WdlError::Io { .. }));
    }

    #[test]
    fn test_parse_bytes_has_no_source() {
        let doc = parse_bytes(b"version 1.0\nworkflow w {}\n").unwrap();
        assert!(doc.source().is_none());
        assert!(doc.workflow.is_some());
    }

    #[test]
    fn test_invalid_utf8() {
        let err = parse_bytes(b"version 1.0\nwork\xffflow w {}\n").unwrap_err();
        let diagnostic = &err.diagnostics()[0];
        assert_eq!((diagnostic.line, diagnostic.column), (2, 5));
        assert!(diagnostic.message.contains("UTF-8"));
    }

    #[test]
    fn test_expression_precedence() {
        match parse_expression_str("1 + 2 * 3").unwrap() {
            Expression::BinaryOp {
                op: BinaryOperator::Add,
                right,
                ..
            } => assert!(matches!(
                *right,
                Expression::BinaryOp {
                    op: BinaryOperator::Multiply,
                    ..
                }
            )),
            other => panic!("Unexpected expression {:?}", other),
        }
        assert!(parse_expression_str("1 +").is_err());
        assert!(parse_expression_str("a b").is_err());
    }
}
