//! Token definitions for WDL parser

use crate::error::SourcePosition;
use std::fmt;
use std::ops::Range;

/// Token type for WDL lexer
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Keywords
    Keyword(String),

    // Identifiers
    Identifier(String),

    // Literals
    IntLiteral(i64),
    FloatLiteral(f64),
    BoolLiteral(bool),
    /// Raw text between the quotes; escapes and placeholders are decoded
    /// by the literal parser
    StringLiteral { quote: char, raw: String },

    /// `version X` header, carrying X
    Version(String),

    /// Whole command section; `line`/`column` locate the first body character
    Command {
        heredoc: bool,
        body: String,
        line: u32,
        column: u32,
    },

    // Operators - Arithmetic
    Plus,
    Minus,
    Star,
    Slash,
    Percent,

    // Operators - Comparison
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,

    // Operators - Logical
    And,
    Or,
    Not,

    // Operators - Assignment
    Assign,

    // Delimiters
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,

    // Punctuation
    Comma,
    Dot,
    Colon,
    Question,
}

impl Token {
    /// Check if this token is a keyword
    pub fn is_keyword(&self) -> bool {
        matches!(self, Token::Keyword(_))
    }

    /// Check if this token is the given keyword
    pub fn is_keyword_named(&self, word: &str) -> bool {
        matches!(self, Token::Keyword(k) if k == word)
    }

    /// Check if this token is an operator
    pub fn is_operator(&self) -> bool {
        matches!(
            self,
            Token::Plus
                | Token::Minus
                | Token::Star
                | Token::Slash
                | Token::Percent
                | Token::Equal
                | Token::NotEqual
                | Token::Less
                | Token::LessEqual
                | Token::Greater
                | Token::GreaterEqual
                | Token::And
                | Token::Or
                | Token::Not
                | Token::Assign
        )
    }

    /// Identifier or keyword text, for contexts that accept either
    pub fn word(&self) -> Option<&str> {
        match self {
            Token::Identifier(s) | Token::Keyword(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Keyword(s) => write!(f, "{}", s),
            Token::Identifier(s) => write!(f, "{}", s),
            Token::IntLiteral(n) => write!(f, "{}", n),
            Token::FloatLiteral(n) => write!(f, "{:?}", n),
            Token::BoolLiteral(b) => write!(f, "{}", b),
            Token::StringLiteral { quote, raw } => write!(f, "{}{}{}", quote, raw, quote),
            Token::Version(v) => write!(f, "version {}", v),
            Token::Command { heredoc: true, .. } => write!(f, "command <<<"),
            Token::Command { heredoc: false, .. } => write!(f, "command {{"),

            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),

            Token::Equal => write!(f, "=="),
            Token::NotEqual => write!(f, "!="),
            Token::Less => write!(f, "<"),
            Token::LessEqual => write!(f, "<="),
            Token::Greater => write!(f, ">"),
            Token::GreaterEqual => write!(f, ">="),

            Token::And => write!(f, "&&"),
            Token::Or => write!(f, "||"),
            Token::Not => write!(f, "!"),

            Token::Assign => write!(f, "="),

            Token::LeftParen => write!(f, "("),
            Token::RightParen => write!(f, ")"),
            Token::LeftBracket => write!(f, "["),
            Token::RightBracket => write!(f, "]"),
            Token::LeftBrace => write!(f, "{{"),
            Token::RightBrace => write!(f, "}}"),

            Token::Comma => write!(f, ","),
            Token::Dot => write!(f, "."),
            Token::Colon => write!(f, ":"),
            Token::Question => write!(f, "?"),
        }
    }
}

/// A token with its source position and byte span
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedToken {
    pub token: Token,
    pub pos: SourcePosition,
    pub span: Range<usize>,
}

impl LocatedToken {
    pub fn new(token: Token, pos: SourcePosition, span: Range<usize>) -> Self {
        Self { token, pos, span }
    }
}
