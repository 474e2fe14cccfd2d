//! Token-based document parsing for WDL (top-level parser)

use super::lexer::Origin;
use super::literals::string_from_token;
use super::parser_utils::{synchronize, ParseResult};
use super::tasks::{parse_meta_section, parse_task, parse_workflow};
use super::token_stream::TokenStream;
use super::tokens::Token;
use super::types::parse_type;
use crate::error::{DiagnosticCollector, SourcePosition, WdlError};
use crate::expr::{Expression, Literal};
use crate::tree::{Document, Import, ImportAlias, StructTypeDef};
use indexmap::IndexMap;

/// Parse an import statement:
/// `import "uri" [as namespace] [alias Original as Renamed]*`
fn parse_import(stream: &mut TokenStream) -> ParseResult<Import> {
    let pos = stream.current_position();
    stream.expect_keyword("import")?;

    let token = match stream.peek() {
        Some(token) if matches!(token.token, Token::StringLiteral { .. }) => token.clone(),
        _ => return Err(stream.unexpected("import URI string")),
    };
    stream.next();

    let uri = match string_from_token(&token, stream.uri())? {
        Expression::Literal {
            value: Literal::String(uri),
            ..
        } => uri,
        _ => {
            return Err(WdlError::syntax_error(
                token.pos,
                "Import URI must not contain placeholders",
            ))
        }
    };
    // Inside the quotes
    let uri_span = token.span.start + 1..token.span.end - 1;

    let mut import = Import::new(pos, uri, uri_span);
    if stream.try_keyword("as").is_some() {
        import.namespace = Some(stream.expect_identifier()?.0);
    }
    while stream.try_keyword("alias").is_some() {
        let (original, _) = stream.expect_identifier()?;
        stream.expect_keyword("as")?;
        let (alias, _) = stream.expect_identifier()?;
        import.aliases.push(ImportAlias { original, alias });
    }

    Ok(import)
}

/// Parse a struct definition: `struct Name { Type member ... }`
fn parse_struct(stream: &mut TokenStream) -> ParseResult<StructTypeDef> {
    let pos = stream.current_position();
    stream.expect_keyword("struct")?;
    let (name, _) = stream.expect_identifier()?;
    stream.expect(Token::LeftBrace)?;

    let mut members = IndexMap::new();
    let mut meta = None;
    let mut parameter_meta = None;

    while stream.try_consume(&Token::RightBrace).is_none() {
        let section_pos = stream.current_position();
        if stream.try_keyword("meta").is_some() {
            if meta.is_some() {
                return Err(WdlError::syntax_error(section_pos, "Duplicate meta section"));
            }
            meta = Some(parse_meta_section(stream)?);
            continue;
        }
        if stream.try_keyword("parameter_meta").is_some() {
            if parameter_meta.is_some() {
                return Err(WdlError::syntax_error(
                    section_pos,
                    "Duplicate parameter_meta section",
                ));
            }
            parameter_meta = Some(parse_meta_section(stream)?);
            continue;
        }

        let member_type = parse_type(stream)?;
        let (member, member_pos) = stream.expect_identifier()?;
        if members.insert(member.clone(), member_type).is_some() {
            return Err(WdlError::syntax_error(
                member_pos,
                format!("Duplicate member '{}' in struct {}", member, name),
            ));
        }
    }

    let mut def = StructTypeDef::new(pos, name, members);
    def.meta = meta.unwrap_or_default();
    def.parameter_meta = parameter_meta.unwrap_or_default();
    Ok(def)
}

/// Parse one top-level item into the document
fn parse_top_level_item(stream: &mut TokenStream, doc: &mut Document) -> ParseResult<()> {
    if stream.check_keyword("import") {
        doc.imports.push(parse_import(stream)?);
    } else if stream.check_keyword("struct") {
        doc.structs.push(parse_struct(stream)?);
    } else if stream.check_keyword("task") {
        doc.tasks.push(parse_task(stream)?);
    } else if stream.check_keyword("workflow") {
        let pos = stream.current_position();
        let workflow = parse_workflow(stream)?;
        if doc.workflow.is_some() {
            return Err(WdlError::syntax_error(
                pos,
                format!(
                    "Multiple workflows in one document ('{}' is the second)",
                    workflow.name
                ),
            ));
        }
        doc.workflow = Some(workflow);
    } else if matches!(stream.peek_token(), Some(Token::Version(_))) {
        return Err(stream.error_here("Version declaration must come first"));
    } else {
        return Err(stream.unexpected("import, struct, task or workflow"));
    }
    Ok(())
}

/// Parse a complete WDL document.
///
/// Errors in one top-level item do not stop the parse: the parser skips to
/// the next top-level keyword and keeps going, so a single call reports
/// every lexical and syntax error in the document.
pub fn parse_document(source: &str, uri: &str) -> Result<Document, WdlError> {
    // Spans stay relative to the full text, byte order mark included
    let mut stream = match source.strip_prefix('\u{FEFF}') {
        Some(rest) => TokenStream::lenient(
            rest,
            uri,
            Origin {
                offset: source.len() - rest.len(),
                ..Origin::default()
            },
        ),
        None => TokenStream::lenient(source, uri, Origin::default()),
    };
    let mut collector = DiagnosticCollector::new(uri);
    for diagnostic in stream.take_lexer_diagnostics() {
        collector.push(diagnostic);
    }

    let version = match stream.peek_token() {
        Some(Token::Version(version)) => {
            let version = version.clone();
            stream.next();
            version
        }
        _ => String::new(),
    };

    let mut doc = Document::new(SourcePosition::start_of(uri), version);
    while !stream.is_eof() {
        if let Err(err) = parse_top_level_item(&mut stream, &mut doc) {
            collector.append(err);
            synchronize(&mut stream);
        }
    }

    collector.maybe_raise()?;
    Ok(doc)
}
