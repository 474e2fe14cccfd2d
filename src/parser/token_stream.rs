//! Token stream for parsing WDL

use super::lexer::{tokenize_at, Origin};
use super::tokens::{LocatedToken, Token};
use crate::error::{Diagnostic, DiagnosticCollector, SourcePosition, WdlError};

/// A stream of tokens with lookahead and backtracking
#[derive(Debug, Clone)]
pub struct TokenStream {
    uri: String,
    tokens: Vec<LocatedToken>,
    position: usize,
    /// Lexer diagnostics not yet handed to a collector
    lexer_diagnostics: Vec<Diagnostic>,
    end: SourcePosition,
}

impl TokenStream {
    /// Create a new token stream from source text, failing on any lexical
    /// error
    pub fn new(source: &str, uri: &str) -> Result<Self, WdlError> {
        let mut stream = Self::lenient(source, uri, Origin::default());
        let mut collector = DiagnosticCollector::new(uri);
        for diagnostic in stream.take_lexer_diagnostics() {
            collector.push(diagnostic);
        }
        collector.maybe_raise()?;
        Ok(stream)
    }

    /// Create a token stream that keeps lexical diagnostics for the caller
    /// to collect
    pub fn lenient(source: &str, uri: &str, origin: Origin) -> Self {
        let (tokens, lexer_diagnostics) = tokenize_at(source, uri, origin);
        let end = match tokens.last() {
            Some(last) => SourcePosition::new(
                uri.to_string(),
                uri.to_string(),
                last.pos.end_line,
                last.pos.end_column,
                last.pos.end_line,
                last.pos.end_column,
            ),
            None => {
                let mut pos = SourcePosition::start_of(uri);
                pos.line = origin.line;
                pos.column = origin.column;
                pos
            }
        };
        TokenStream {
            uri: uri.to_string(),
            tokens,
            position: 0,
            lexer_diagnostics,
            end,
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn take_lexer_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.lexer_diagnostics)
    }

    /// Peek at the current token without consuming it
    pub fn peek(&self) -> Option<&LocatedToken> {
        self.tokens.get(self.position)
    }

    /// Peek at the nth token ahead without consuming
    pub fn peek_ahead(&self, n: usize) -> Option<&LocatedToken> {
        self.tokens.get(self.position + n)
    }

    /// Get the current token type
    pub fn peek_token(&self) -> Option<&Token> {
        self.peek().map(|t| &t.token)
    }

    /// Consume and return the current token
    pub fn next(&mut self) -> Option<LocatedToken> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    /// Check if we're at the end of the stream
    pub fn is_eof(&self) -> bool {
        self.position >= self.tokens.len()
    }

    /// Get the source position of the current token
    pub fn current_position(&self) -> SourcePosition {
        match self.peek() {
            Some(token) => token.pos.clone(),
            None => self.end.clone(),
        }
    }

    /// Syntax error located at the current token
    pub fn error_here(&self, message: impl Into<String>) -> WdlError {
        WdlError::syntax_error(self.current_position(), message)
    }

    /// Syntax error describing what was expected instead of the current token
    pub fn unexpected(&self, expected: &str) -> WdlError {
        let found = match self.peek_token() {
            Some(token) => format!("'{}'", token),
            None => "end of input".to_string(),
        };
        self.error_here(format!("Expected {}, found {}", expected, found))
    }

    /// Consume a specific token type, returning an error if it doesn't match
    pub fn expect(&mut self, expected: Token) -> Result<LocatedToken, WdlError> {
        match self.try_consume(&expected) {
            Some(token) => Ok(token),
            None => Err(self.unexpected(&format!("'{}'", expected))),
        }
    }

    /// Try to consume a specific token type
    pub fn try_consume(&mut self, expected: &Token) -> Option<LocatedToken> {
        match self.peek_token() {
            Some(token) if token == expected => self.next(),
            _ => None,
        }
    }

    /// Check whether the current token is the given keyword
    pub fn check_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek_token(), Some(t) if t.is_keyword_named(keyword))
    }

    pub fn try_keyword(&mut self, keyword: &str) -> Option<LocatedToken> {
        if self.check_keyword(keyword) {
            self.next()
        } else {
            None
        }
    }

    pub fn expect_keyword(&mut self, keyword: &str) -> Result<LocatedToken, WdlError> {
        match self.try_keyword(keyword) {
            Some(token) => Ok(token),
            None => Err(self.unexpected(&format!("'{}'", keyword))),
        }
    }

    /// Consume an identifier, returning its name and position
    pub fn expect_identifier(&mut self) -> Result<(String, SourcePosition), WdlError> {
        match self.peek_token() {
            Some(Token::Identifier(name)) => {
                let name = name.clone();
                let pos = self.current_position();
                self.position += 1;
                Ok((name, pos))
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    /// Consume an identifier or keyword used as a plain name (meta keys,
    /// member names)
    pub fn expect_word(&mut self) -> Result<(String, SourcePosition), WdlError> {
        match self.peek_token().and_then(Token::word) {
            Some(word) => {
                let word = word.to_string();
                let pos = self.current_position();
                self.position += 1;
                Ok((word, pos))
            }
            None => Err(self.unexpected("name")),
        }
    }

    /// Fail unless every token has been consumed
    pub fn expect_eof(&self) -> Result<(), WdlError> {
        if self.is_eof() {
            Ok(())
        } else {
            Err(self.unexpected("end of input"))
        }
    }
}
