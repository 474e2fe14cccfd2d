//! Token-based literal parsing for WDL
//!
//! Scalar literals, string literals with `~{}`/`${}` placeholders, command
//! sections, and the untyped values of `meta`/`parameter_meta` sections.

use super::expressions::parse_expression;
use super::lexer::{scan_placeholder, Origin};
use super::parser_utils::{parse_delimited_list, ParseResult};
use super::token_stream::TokenStream;
use super::tokens::{LocatedToken, Token};
use crate::error::{DiagnosticCollector, SourcePosition, WdlError};
use crate::expr::{Expression, PlaceholderOptions, StringPart};

/// Which placeholder openers are recognized, and whether escapes are decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextMode {
    /// Quoted string: `~{}` and `${}`, escapes decoded
    String,
    /// `command <<< >>>`: `~{}` only, text kept verbatim
    Heredoc,
    /// `command { }`: `~{}` and `${}`, text kept verbatim
    BraceCommand,
}

/// Position of byte `idx` of `text`, where `text` starts at `origin`
fn locate(text: &str, idx: usize, origin: Origin) -> Origin {
    let before = &text[..idx];
    match before.rfind('\n') {
        Some(nl) => Origin {
            line: origin.line + before.matches('\n').count() as u32,
            column: before[nl + 1..].chars().count() as u32 + 1,
            offset: origin.offset + idx,
        },
        None => Origin {
            line: origin.line,
            column: origin.column + before.chars().count() as u32,
            offset: origin.offset + idx,
        },
    }
}

fn decode_escape(c: char) -> Option<char> {
    match c {
        'n' => Some('\n'),
        't' => Some('\t'),
        'r' => Some('\r'),
        '\\' => Some('\\'),
        '"' => Some('"'),
        '\'' => Some('\''),
        _ => None,
    }
}

/// Decode escape sequences in placeholder-free text
pub fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(next) => match decode_escape(next) {
                Some(decoded) => out.push(decoded),
                None => {
                    out.push('\\');
                    out.push(next);
                }
            },
            None => out.push('\\'),
        }
    }
    out
}

/// Split text into literal runs and placeholders.
fn split_interpolated(
    text: &str,
    uri: &str,
    origin: Origin,
    mode: TextMode,
) -> ParseResult<Vec<StringPart>> {
    let mut parts = Vec::new();
    let mut buffer = String::new();
    let mut i = 0;

    while i < text.len() {
        let rest = &text[i..];
        let c = match rest.chars().next() {
            Some(c) => c,
            None => break,
        };

        if c == '\\' && mode == TextMode::String {
            let next = rest[1..].chars().next();
            match next.and_then(decode_escape) {
                Some(decoded) => buffer.push(decoded),
                None => {
                    buffer.push('\\');
                    if let Some(next) = next {
                        buffer.push(next);
                    }
                }
            }
            i += 1 + next.map_or(0, char::len_utf8);
            continue;
        }

        let opens_placeholder = (c == '~' || (c == '$' && mode != TextMode::Heredoc))
            && rest[1..].starts_with('{');
        if opens_placeholder {
            let len = match scan_placeholder(&rest[1..]) {
                Some(len) => len,
                None => {
                    let at = locate(text, i, origin);
                    return Err(WdlError::syntax_error(
                        SourcePosition::new(
                            uri.to_string(),
                            uri.to_string(),
                            at.line,
                            at.column,
                            at.line,
                            at.column,
                        ),
                        "Unterminated placeholder",
                    ));
                }
            };
            if !buffer.is_empty() {
                parts.push(StringPart::Text(std::mem::take(&mut buffer)));
            }
            let inner_start = i + 2;
            let inner = &text[inner_start..i + len];
            parts.push(parse_placeholder(inner, uri, locate(text, inner_start, origin))?);
            i += 1 + len;
            continue;
        }

        buffer.push(c);
        i += c.len_utf8();
    }

    if !buffer.is_empty() {
        parts.push(StringPart::Text(buffer));
    }
    Ok(parts)
}

/// Parse the inside of `~{ ... }`: option assignments then one expression.
fn parse_placeholder(inner: &str, uri: &str, origin: Origin) -> ParseResult<StringPart> {
    let mut stream = TokenStream::lenient(inner, uri, origin);
    let mut collector = DiagnosticCollector::new(uri);
    for diagnostic in stream.take_lexer_diagnostics() {
        collector.push(diagnostic);
    }
    collector.maybe_raise()?;

    let mut options = PlaceholderOptions::default();
    loop {
        let name = match stream.peek_token() {
            Some(Token::Identifier(name)) => name.clone(),
            Some(Token::BoolLiteral(b)) => b.to_string(),
            _ => break,
        };
        if stream.peek_ahead(1).map(|t| &t.token) != Some(&Token::Assign) {
            break;
        }
        let option_pos = stream.current_position();
        stream.next();
        stream.next();
        let value = parse_option_value(&mut stream)?;
        if !options.set(&name, value) {
            return Err(WdlError::syntax_error(
                option_pos,
                format!("Unknown placeholder option '{}'", name),
            ));
        }
    }

    let expression = parse_expression(&mut stream)?;
    stream.expect_eof()?;
    Ok(StringPart::Placeholder {
        expression: Box::new(expression),
        options,
    })
}

fn parse_option_value(stream: &mut TokenStream) -> ParseResult<String> {
    let value = match stream.peek_token() {
        Some(Token::StringLiteral { raw, .. }) => unescape(raw),
        Some(Token::IntLiteral(n)) => n.to_string(),
        Some(Token::FloatLiteral(x)) => x.to_string(),
        Some(Token::BoolLiteral(b)) => b.to_string(),
        _ => return Err(stream.unexpected("placeholder option value")),
    };
    stream.next();
    Ok(value)
}

/// Parse a string literal token into a literal or interpolation
pub fn string_from_token(token: &LocatedToken, uri: &str) -> ParseResult<Expression> {
    let raw = match &token.token {
        Token::StringLiteral { raw, .. } => raw,
        other => {
            return Err(WdlError::syntax_error(
                token.pos.clone(),
                format!("Expected string literal, found '{}'", other),
            ))
        }
    };
    let origin = Origin {
        line: token.pos.line,
        column: token.pos.column + 1,
        offset: token.span.start + 1,
    };
    let parts = split_interpolated(raw, uri, origin, TextMode::String)?;
    Ok(Expression::string(token.pos.clone(), parts))
}

/// Parse a string literal
pub fn parse_string_literal(stream: &mut TokenStream) -> ParseResult<Expression> {
    let token = match stream.peek() {
        Some(token) => token.clone(),
        None => return Err(stream.unexpected("string literal")),
    };
    let expr = string_from_token(&token, stream.uri())?;
    stream.next();
    Ok(expr)
}

/// Parse a command section token into its template and heredoc flag
pub fn parse_command(stream: &mut TokenStream) -> ParseResult<(Expression, bool)> {
    let (pos, heredoc, body, origin) = match stream.peek() {
        Some(LocatedToken {
            token:
                Token::Command {
                    heredoc,
                    body,
                    line,
                    column,
                },
            pos,
            span,
        }) => {
            // The body ends just before the closing `>>>` or `}`
            let closer = if *heredoc { 3 } else { 1 };
            let origin = Origin {
                line: *line,
                column: *column,
                offset: span.end - closer - body.len(),
            };
            (pos.clone(), *heredoc, body.clone(), origin)
        }
        _ => return Err(stream.unexpected("command section")),
    };
    stream.next();

    let mode = if heredoc {
        TextMode::Heredoc
    } else {
        TextMode::BraceCommand
    };
    let parts = split_interpolated(&body, stream.uri(), origin, mode)?;
    Ok((Expression::StringInterpolation { pos, parts }, heredoc))
}

/// Parse any scalar literal expression
pub fn parse_literal(stream: &mut TokenStream) -> ParseResult<Expression> {
    let pos = stream.current_position();
    let expr = match stream.peek_token() {
        Some(Token::IntLiteral(n)) => Expression::int(pos, *n),
        Some(Token::FloatLiteral(x)) => Expression::float(pos, *x),
        Some(Token::BoolLiteral(b)) => Expression::boolean(pos, *b),
        Some(Token::Keyword(k)) if k == "None" => Expression::null(pos),
        Some(Token::StringLiteral { .. }) => return parse_string_literal(stream),
        _ => return Err(stream.unexpected("literal")),
    };
    stream.next();
    Ok(expr)
}

/// Parse a `meta`/`parameter_meta` value into untyped JSON
pub fn parse_meta_value(stream: &mut TokenStream) -> ParseResult<serde_json::Value> {
    use serde_json::Value;

    let value = match stream.peek_token() {
        Some(Token::StringLiteral { raw, .. }) => Value::String(unescape(raw)),
        Some(Token::IntLiteral(n)) => Value::from(*n),
        Some(Token::FloatLiteral(x)) => float_value(stream, *x)?,
        Some(Token::BoolLiteral(b)) => Value::Bool(*b),
        Some(Token::Keyword(k)) if k == "None" => Value::Null,
        Some(Token::Identifier(k)) if k == "null" => Value::Null,
        Some(Token::Minus) => {
            stream.next();
            return match stream.peek_token() {
                Some(Token::IntLiteral(n)) => {
                    let n = -*n;
                    stream.next();
                    Ok(Value::from(n))
                }
                Some(Token::FloatLiteral(x)) => {
                    let value = float_value(stream, -*x)?;
                    stream.next();
                    Ok(value)
                }
                _ => Err(stream.unexpected("number")),
            };
        }
        Some(Token::LeftBracket) => {
            let items = parse_delimited_list(
                stream,
                Token::LeftBracket,
                Token::RightBracket,
                Token::Comma,
                parse_meta_value,
            )?;
            return Ok(Value::Array(items));
        }
        Some(Token::LeftBrace) => {
            let entries = parse_delimited_list(
                stream,
                Token::LeftBrace,
                Token::RightBrace,
                Token::Comma,
                parse_meta_entry,
            )?;
            return Ok(Value::Object(entries.into_iter().collect()));
        }
        _ => return Err(stream.unexpected("meta value")),
    };
    stream.next();
    Ok(value)
}

/// Parse `key: value` inside a meta section or meta object
pub fn parse_meta_entry(stream: &mut TokenStream) -> ParseResult<(String, serde_json::Value)> {
    let (key, _) = stream.expect_word()?;
    stream.expect(Token::Colon)?;
    let value = parse_meta_value(stream)?;
    Ok((key, value))
}

fn float_value(stream: &TokenStream, x: f64) -> ParseResult<serde_json::Value> {
    serde_json::Number::from_f64(x)
        .map(serde_json::Value::Number)
        .ok_or_else(|| stream.error_here("Float meta value must be finite"))
}
