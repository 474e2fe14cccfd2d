//! Parser utility functions for token-based parsing

use super::keywords::TOP_LEVEL_KEYWORDS;
use super::token_stream::TokenStream;
use super::tokens::Token;
use crate::error::WdlError;

/// Parse result type
pub type ParseResult<T> = Result<T, WdlError>;

/// Parse a list of items enclosed in delimiters, allowing a trailing
/// separator
pub fn parse_delimited_list<T, F>(
    stream: &mut TokenStream,
    open: Token,
    close: Token,
    separator: Token,
    mut parser: F,
) -> ParseResult<Vec<T>>
where
    F: FnMut(&mut TokenStream) -> ParseResult<T>,
{
    stream.expect(open)?;

    let mut items = Vec::new();

    // Check for empty list
    if stream.try_consume(&close).is_some() {
        return Ok(items);
    }

    items.push(parser(stream)?);

    while stream.peek_token() != Some(&close) {
        stream.expect(separator.clone())?;

        // Allow trailing separator
        if stream.peek_token() == Some(&close) {
            break;
        }

        items.push(parser(stream)?);
    }

    stream.expect(close)?;
    Ok(items)
}

/// Parse `{ item* }`, calling `parser` until the closing brace
pub fn parse_braced_block<F>(stream: &mut TokenStream, mut parser: F) -> ParseResult<()>
where
    F: FnMut(&mut TokenStream) -> ParseResult<()>,
{
    stream.expect(Token::LeftBrace)?;
    loop {
        match stream.peek_token() {
            Some(Token::RightBrace) => {
                stream.next();
                return Ok(());
            }
            None => return Err(stream.unexpected("'}'")),
            Some(_) => parser(stream)?,
        }
    }
}

/// Whether the current token starts a top-level document item
pub fn at_top_level_item(stream: &TokenStream) -> bool {
    match stream.peek_token() {
        Some(Token::Version(_)) => true,
        Some(Token::Keyword(k)) => TOP_LEVEL_KEYWORDS.contains(&k.as_str()),
        _ => false,
    }
}

/// Error recovery: skip at least one token, then up to the next top-level
/// keyword.
pub fn synchronize(stream: &mut TokenStream) {
    if !stream.is_eof() {
        stream.next();
    }
    while !stream.is_eof() && !at_top_level_item(stream) {
        stream.next();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(stream: &mut TokenStream) -> ParseResult<i64> {
        match stream.next().map(|t| t.token) {
            Some(Token::IntLiteral(n)) => Ok(n),
            _ => Err(stream.error_here("Expected integer")),
        }
    }

    #[test]
    fn test_delimited_list() {
        let mut stream = TokenStream::new("[1, 2, 3,]", "test.wdl").unwrap();
        let items = parse_delimited_list(
            &mut stream,
            Token::LeftBracket,
            Token::RightBracket,
            Token::Comma,
            int,
        )
        .unwrap();
        assert_eq!(items, vec![1, 2, 3]);
        assert!(stream.is_eof());

        let mut stream = TokenStream::new("[]", "test.wdl").unwrap();
        let items = parse_delimited_list(
            &mut stream,
            Token::LeftBracket,
            Token::RightBracket,
            Token::Comma,
            int,
        )
        .unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_synchronize() {
        let mut stream = TokenStream::new("task ( junk ) workflow w", "test.wdl").unwrap();
        synchronize(&mut stream);
        assert!(stream.check_keyword("workflow"));
    }

    #[test]
    fn test_braced_block() {
        let mut stream = TokenStream::new("{ 1 2 }", "test.wdl").unwrap();
        let mut seen = Vec::new();
        parse_braced_block(&mut stream, |s| {
            seen.push(int(s)?);
            Ok(())
        })
        .unwrap();
        assert_eq!(seen, vec![1, 2]);

        let mut stream = TokenStream::new("{ 1", "test.wdl").unwrap();
        assert!(parse_braced_block(&mut stream, |s| int(s).map(|_| ())).is_err());
    }
}
