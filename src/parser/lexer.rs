//! nom-based lexer for WDL
//!
//! The lexer turns source text into [`LocatedToken`]s, skipping whitespace
//! and `#` comments. Lexical problems never abort tokenization: each one is
//! recorded as a [`Diagnostic`] and the offending character skipped, so a
//! single pass reports every error. String literals and command sections
//! are captured whole (placeholders included) and decoded later by the
//! literal parser.

use super::keywords::is_keyword;
use super::tokens::{LocatedToken, Token};
use crate::error::{Diagnostic, SourcePosition};
use nom::{
    branch::alt,
    bytes::complete::{tag, take_until, take_while, take_while1},
    character::complete::{
        alpha1, alphanumeric1, anychar, char, digit0, digit1, multispace0, multispace1, one_of,
        satisfy, space1,
    },
    combinator::{map, not, opt, recognize, value},
    multi::many0,
    sequence::{pair, preceded, terminated, tuple},
    IResult, Slice,
};
use nom_locate::LocatedSpan;

pub type Span<'a> = LocatedSpan<&'a str>;

/// Location of the lexed text inside its enclosing file, for sub-lexing
/// placeholder expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Origin {
    pub line: u32,
    pub column: u32,
    pub offset: usize,
}

impl Default for Origin {
    fn default() -> Self {
        Self {
            line: 1,
            column: 1,
            offset: 0,
        }
    }
}

impl Origin {
    fn shift(&self, line: u32, column: usize) -> (u32, u32) {
        if line == 1 {
            (self.line, self.column + column as u32 - 1)
        } else {
            (self.line + line - 1, column as u32)
        }
    }
}

enum LexError {
    Unexpected(char),
    Unterminated(&'static str),
    OutOfRange(String),
}

// Basic token parsers

fn comment(input: Span) -> IResult<Span, Span> {
    recognize(pair(char('#'), take_while(|c: char| c != '\n' && c != '\r')))(input)
}

/// Skip whitespace, newlines and comments
fn trivia(input: Span) -> IResult<Span, ()> {
    value((), many0(alt((multispace1, comment))))(input)
}

fn exponent(input: Span) -> IResult<Span, Span> {
    recognize(tuple((one_of("eE"), opt(one_of("+-")), digit1)))(input)
}

/// Parse a numeric literal, reporting whether it is a float
fn number(input: Span) -> IResult<Span, (Span, bool)> {
    alt((
        map(
            recognize(tuple((digit1, char('.'), digit0, opt(exponent)))),
            |s| (s, true),
        ),
        map(recognize(tuple((char('.'), digit1, opt(exponent)))), |s| {
            (s, true)
        }),
        map(recognize(pair(digit1, exponent)), |s| (s, true)),
        map(digit1, |s| (s, false)),
    ))(input)
}

/// Parse an identifier, keyword or boolean literal
fn identifier_or_keyword(input: Span) -> IResult<Span, Token> {
    map(
        recognize(pair(alpha1, many0(alt((alphanumeric1, tag("_")))))),
        |word: Span| match *word.fragment() {
            "true" => Token::BoolLiteral(true),
            "false" => Token::BoolLiteral(false),
            w if is_keyword(w) => Token::Keyword(w.to_string()),
            w => Token::Identifier(w.to_string()),
        },
    )(input)
}

/// `version 1.0` header; the value must start with an alphanumeric so that
/// `version:` meta keys still lex as a keyword.
fn version_decl(input: Span) -> IResult<Span, Token> {
    map(
        preceded(
            pair(tag("version"), space1),
            recognize(pair(
                satisfy(|c: char| c.is_ascii_alphanumeric()),
                take_while(|c: char| !c.is_whitespace() && c != '#'),
            )),
        ),
        |v: Span| Token::Version(v.fragment().to_string()),
    )(input)
}

fn operator(input: Span) -> IResult<Span, Token> {
    alt((
        alt((
            value(Token::Equal, tag("==")),
            value(Token::NotEqual, tag("!=")),
            value(Token::LessEqual, tag("<=")),
            value(Token::GreaterEqual, tag(">=")),
            value(Token::And, tag("&&")),
            value(Token::Or, tag("||")),
        )),
        alt((
            value(Token::Plus, char('+')),
            value(Token::Minus, char('-')),
            value(Token::Star, char('*')),
            value(Token::Slash, char('/')),
            value(Token::Percent, char('%')),
            value(Token::Less, char('<')),
            value(Token::Greater, char('>')),
            value(Token::Not, char('!')),
            value(Token::Assign, char('=')),
        )),
        alt((
            value(Token::LeftParen, char('(')),
            value(Token::RightParen, char(')')),
            value(Token::LeftBracket, char('[')),
            value(Token::RightBracket, char(']')),
            value(Token::LeftBrace, char('{')),
            value(Token::RightBrace, char('}')),
            value(Token::Comma, char(',')),
            value(Token::Dot, char('.')),
            value(Token::Colon, char(':')),
            value(Token::Question, char('?')),
        )),
    ))(input)
}

/// Byte length of the quoted string at the start of `text`, through the
/// closing quote. Placeholders may contain nested strings.
fn scan_string(text: &str) -> Option<usize> {
    let quote = text.chars().next()?;
    let mut i = quote.len_utf8();
    while i < text.len() {
        let rest = &text[i..];
        let c = rest.chars().next()?;
        if c == '\\' {
            i += 1 + rest[1..].chars().next().map_or(0, char::len_utf8);
        } else if c == '\n' {
            return None;
        } else if c == quote {
            return Some(i + 1);
        } else if (c == '~' || c == '$') && rest[1..].starts_with('{') {
            i += 1 + scan_placeholder(&rest[1..])?;
        } else {
            i += c.len_utf8();
        }
    }
    None
}

/// Byte length of the `{...}` group at the start of `text`
pub(crate) fn scan_placeholder(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = 0;
    while i < text.len() {
        let rest = &text[i..];
        let c = rest.chars().next()?;
        match c {
            '{' => {
                depth += 1;
                i += 1;
            }
            '}' => {
                depth = depth.saturating_sub(1);
                i += 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            '"' | '\'' => i += scan_string(rest)?,
            _ => i += c.len_utf8(),
        }
    }
    None
}

/// Byte length of a brace-form command body (after the opening `{`)
fn scan_command_body(text: &str) -> Option<usize> {
    let mut depth = 1usize;
    for (i, c) in text.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn command_keyword(input: Span) -> IResult<Span, Span> {
    terminated(
        tag("command"),
        not(satisfy(|c: char| c.is_alphanumeric() || c == '_')),
    )(input)
}

/// Command section: returns the remaining input, heredoc flag and body span.
fn command_section(input: Span) -> Option<Result<(Span, bool, Span), LexError>> {
    let (rest, _) = command_keyword(input).ok()?;
    let (rest, _) = multispace0::<Span, nom::error::Error<Span>>(rest).ok()?;

    if rest.fragment().starts_with("<<<") {
        let open = rest.slice(3..);
        let scanned: IResult<Span, Span> = terminated(take_until(">>>"), tag(">>>"))(open);
        return Some(match scanned {
            Ok((after, body)) => Ok((after, true, body)),
            Err(_) => Err(LexError::Unterminated("command section")),
        });
    }

    if rest.fragment().starts_with('{') {
        let open = rest.slice(1..);
        return Some(match scan_command_body(open.fragment()) {
            Some(len) => Ok((open.slice(len + 1..), false, open.slice(..len))),
            None => Err(LexError::Unterminated("command section")),
        });
    }

    None
}

fn next_token(input: Span) -> Result<(Span, Token), LexError> {
    let text = *input.fragment();

    if text.starts_with('"') || text.starts_with('\'') {
        let quote = text.chars().next().unwrap_or('"');
        let len = scan_string(text).ok_or(LexError::Unterminated("string literal"))?;
        let token = Token::StringLiteral {
            quote,
            raw: text[1..len - 1].to_string(),
        };
        return Ok((input.slice(len..), token));
    }

    if let Some(scanned) = command_section(input) {
        let (rest, heredoc, body) = scanned?;
        let (line, column) = (body.location_line(), body.get_utf8_column());
        return Ok((
            rest,
            Token::Command {
                heredoc,
                body: body.fragment().to_string(),
                line,
                column: column as u32,
            },
        ));
    }

    if let Ok((rest, token)) = version_decl(input) {
        return Ok((rest, token));
    }

    if let Ok((rest, (digits, is_float))) = number(input) {
        let literal = *digits.fragment();
        let token = if is_float {
            literal
                .parse::<f64>()
                .map(Token::FloatLiteral)
                .map_err(|_| LexError::OutOfRange(literal.to_string()))?
        } else {
            literal
                .parse::<i64>()
                .map(Token::IntLiteral)
                .map_err(|_| LexError::OutOfRange(literal.to_string()))?
        };
        return Ok((rest, token));
    }

    if let Ok((rest, token)) = identifier_or_keyword(input) {
        return Ok((rest, token));
    }

    if let Ok((rest, token)) = operator(input) {
        return Ok((rest, token));
    }

    Err(LexError::Unexpected(text.chars().next().unwrap_or('\0')))
}

fn position(uri: &str, origin: Origin, start: &Span, end: &Span) -> SourcePosition {
    let (line, column) = origin.shift(start.location_line(), start.get_utf8_column());
    let (end_line, end_column) = origin.shift(end.location_line(), end.get_utf8_column());
    SourcePosition::new(
        uri.to_string(),
        uri.to_string(),
        line,
        column,
        end_line,
        end_column,
    )
}

/// Tokenize a whole file
pub fn tokenize(source: &str, uri: &str) -> (Vec<LocatedToken>, Vec<Diagnostic>) {
    tokenize_at(source, uri, Origin::default())
}

/// Tokenize text that starts at `origin` inside the file `uri`
pub fn tokenize_at(source: &str, uri: &str, origin: Origin) -> (Vec<LocatedToken>, Vec<Diagnostic>) {
    let mut tokens = Vec::new();
    let mut diagnostics = Vec::new();
    let mut input = Span::new(source);

    loop {
        if let Ok((rest, _)) = trivia(input) {
            input = rest;
        }
        if input.fragment().is_empty() {
            break;
        }

        let (line, column) = origin.shift(input.location_line(), input.get_utf8_column());
        match next_token(input) {
            Ok((rest, token)) => {
                let token = match token {
                    // Command body positions are relative to the lexed text
                    Token::Command {
                        heredoc,
                        body,
                        line,
                        column,
                    } => {
                        let (line, column) = origin.shift(line, column as usize);
                        Token::Command {
                            heredoc,
                            body,
                            line,
                            column,
                        }
                    }
                    other => other,
                };
                let span = origin.offset + input.location_offset()
                    ..origin.offset + rest.location_offset();
                tokens.push(LocatedToken::new(
                    token,
                    position(uri, origin, &input, &rest),
                    span,
                ));
                input = rest;
            }
            Err(LexError::Unterminated(what)) => {
                diagnostics.push(Diagnostic::new(
                    line,
                    column,
                    format!("Unterminated {}", what),
                ));
                break;
            }
            Err(LexError::OutOfRange(literal)) => {
                diagnostics.push(Diagnostic::new(
                    line,
                    column,
                    format!("Numeric literal out of range: {}", literal),
                ));
                match number(input) {
                    Ok((rest, _)) => input = rest,
                    Err(_) => break,
                }
            }
            Err(LexError::Unexpected(c)) => {
                diagnostics.push(Diagnostic::new(
                    line,
                    column,
                    format!("Unexpected character '{}'", c),
                ));
                match anychar::<Span, nom::error::Error<Span>>(input) {
                    Ok((rest, _)) => input = rest,
                    Err(_) => break,
                }
            }
        }
    }

    (tokens, diagnostics)
}
