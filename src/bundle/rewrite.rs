//! In-place rewriting of import URIs

use crate::error::WdlError;
use std::ops::Range;

/// Escape `uri` for a string literal delimited by `quote`
fn escape(uri: &str, quote: char) -> String {
    let mut escaped = String::with_capacity(uri.len());
    for c in uri.chars() {
        if c == '\\' || c == quote {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Replace the text at each span (the inside of an import's quotes) with a
/// new URI. Bytes outside the spans are copied unchanged.
pub(crate) fn replace_import_uris(
    source: &[u8],
    edits: &[(Range<usize>, String)],
) -> Result<Vec<u8>, WdlError> {
    let mut ordered: Vec<&(Range<usize>, String)> = edits.iter().collect();
    ordered.sort_by_key(|(span, _)| span.start);

    let mut rewritten = Vec::with_capacity(source.len());
    let mut cursor = 0;
    for (span, uri) in ordered {
        if span.start == 0 || span.start < cursor || span.end > source.len() || span.start > span.end {
            return Err(WdlError::bundle(format!(
                "import span {}..{} does not fit the source",
                span.start, span.end
            )));
        }
        let quote = source[span.start - 1] as char;
        rewritten.extend_from_slice(&source[cursor..span.start]);
        rewritten.extend_from_slice(escape(uri, quote).as_bytes());
        cursor = span.end;
    }
    rewritten.extend_from_slice(&source[cursor..]);
    Ok(rewritten)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_document;

    fn edits_for(source: &str, uris: &[&str]) -> Vec<(Range<usize>, String)> {
        let doc = parse_document(source, "main.wdl").unwrap();
        doc.imports
            .iter()
            .zip(uris)
            .map(|(import, uri)| (import.uri_span.clone(), uri.to_string()))
            .collect()
    }

    #[test]
    fn test_only_uris_change() {
        let source = "version 1.0\n# keep me\nimport \"../lib/a.wdl\" as a\nimport 'x/b.wdl'   alias S as T\n\nworkflow w {}\n";
        let edits = edits_for(source, &["a.wdl", "b.wdl"]);
        let rewritten = replace_import_uris(source.as_bytes(), &edits).unwrap();
        assert_eq!(
            String::from_utf8(rewritten).unwrap(),
            "version 1.0\n# keep me\nimport \"a.wdl\" as a\nimport 'b.wdl'   alias S as T\n\nworkflow w {}\n"
        );
    }

    #[test]
    fn test_quotes_escaped() {
        let source = "import 'a.wdl'\n";
        let edits = edits_for(source, &["it's.wdl"]);
        let rewritten = replace_import_uris(source.as_bytes(), &edits).unwrap();
        let text = String::from_utf8(rewritten).unwrap();
        assert_eq!(text, "import 'it\\'s.wdl'\n");
        assert_eq!(parse_document(&text, "m.wdl").unwrap().imports[0].uri, "it's.wdl");
    }

    #[test]
    fn test_bad_span() {
        assert!(replace_import_uris(b"abc", &[(2..9, "x".to_string())]).is_err());
    }
}
