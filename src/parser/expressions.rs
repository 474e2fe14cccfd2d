//! Token-based expression parsing for WDL
//!
//! One function per precedence level, loosest to tightest:
//! `||`, `&&`, comparisons, `+ -`, `* / %`, then the core level (unary
//! operators, `if/then/else`, literals, access and application). Binary
//! levels are left-associative.

use super::literals::parse_literal;
use super::parser_utils::{parse_delimited_list, ParseResult};
use super::token_stream::TokenStream;
use super::tokens::Token;
use crate::expr::{BinaryOperator, Expression, UnaryOperator};

/// Parse a complete expression
pub fn parse_expression(stream: &mut TokenStream) -> ParseResult<Expression> {
    parse_or(stream)
}

fn parse_binary_level(
    stream: &mut TokenStream,
    next: fn(&mut TokenStream) -> ParseResult<Expression>,
    operator: fn(&Token) -> Option<BinaryOperator>,
) -> ParseResult<Expression> {
    let mut left = next(stream)?;
    while let Some(op) = stream.peek_token().and_then(operator) {
        stream.next();
        let right = next(stream)?;
        let pos = left.pos().clone();
        left = Expression::binary_op(pos, op, left, right);
    }
    Ok(left)
}

/// Logical OR (`||`)
pub fn parse_or(stream: &mut TokenStream) -> ParseResult<Expression> {
    parse_binary_level(stream, parse_and, |t| match t {
        Token::Or => Some(BinaryOperator::Or),
        _ => None,
    })
}

/// Logical AND (`&&`)
pub fn parse_and(stream: &mut TokenStream) -> ParseResult<Expression> {
    parse_binary_level(stream, parse_comparison, |t| match t {
        Token::And => Some(BinaryOperator::And),
        _ => None,
    })
}

/// Comparison (`==`, `!=`, `<`, `<=`, `>`, `>=`)
pub fn parse_comparison(stream: &mut TokenStream) -> ParseResult<Expression> {
    parse_binary_level(stream, parse_additive, |t| match t {
        Token::Equal => Some(BinaryOperator::Equal),
        Token::NotEqual => Some(BinaryOperator::NotEqual),
        Token::Less => Some(BinaryOperator::Less),
        Token::LessEqual => Some(BinaryOperator::LessEqual),
        Token::Greater => Some(BinaryOperator::Greater),
        Token::GreaterEqual => Some(BinaryOperator::GreaterEqual),
        _ => None,
    })
}

/// Addition and subtraction
pub fn parse_additive(stream: &mut TokenStream) -> ParseResult<Expression> {
    parse_binary_level(stream, parse_multiplicative, |t| match t {
        Token::Plus => Some(BinaryOperator::Add),
        Token::Minus => Some(BinaryOperator::Subtract),
        _ => None,
    })
}

/// Multiplication, division and remainder
pub fn parse_multiplicative(stream: &mut TokenStream) -> ParseResult<Expression> {
    parse_binary_level(stream, parse_core, |t| match t {
        Token::Star => Some(BinaryOperator::Multiply),
        Token::Slash => Some(BinaryOperator::Divide),
        Token::Percent => Some(BinaryOperator::Modulo),
        _ => None,
    })
}

/// Unary operators, conditionals, and postfix access
pub fn parse_core(stream: &mut TokenStream) -> ParseResult<Expression> {
    let pos = stream.current_position();

    let op = match stream.peek_token() {
        Some(Token::Not) => Some(UnaryOperator::Not),
        Some(Token::Minus) => Some(UnaryOperator::Negate),
        Some(Token::Plus) => Some(UnaryOperator::Plus),
        _ => None,
    };
    if let Some(op) = op {
        stream.next();
        let operand = parse_core(stream)?;
        return Ok(Expression::unary_op(pos, op, operand));
    }

    if stream.try_keyword("if").is_some() {
        let condition = parse_expression(stream)?;
        stream.expect_keyword("then")?;
        let if_true = parse_expression(stream)?;
        stream.expect_keyword("else")?;
        let if_false = parse_expression(stream)?;
        return Ok(Expression::if_then_else(pos, condition, if_true, if_false));
    }

    parse_postfix(stream)
}

/// Parse member access (`a.b`) and index access (`a[i]`) chains
fn parse_postfix(stream: &mut TokenStream) -> ParseResult<Expression> {
    let mut expr = parse_primary(stream)?;

    loop {
        match stream.peek_token() {
            Some(Token::Dot) => {
                stream.next();
                let (member, _) = stream.expect_word()?;
                let pos = expr.pos().clone();
                expr = Expression::member_access(pos, expr, member);
            }
            Some(Token::LeftBracket) => {
                stream.next();
                let index = parse_expression(stream)?;
                stream.expect(Token::RightBracket)?;
                let pos = expr.pos().clone();
                expr = Expression::index_access(pos, expr, index);
            }
            _ => break,
        }
    }

    Ok(expr)
}

fn parse_primary(stream: &mut TokenStream) -> ParseResult<Expression> {
    let pos = stream.current_position();

    match stream.peek_token() {
        Some(
            Token::IntLiteral(_)
            | Token::FloatLiteral(_)
            | Token::BoolLiteral(_)
            | Token::StringLiteral { .. },
        ) => parse_literal(stream),
        Some(Token::Keyword(k)) if k == "None" => parse_literal(stream),
        Some(Token::Keyword(k)) if k == "object" => {
            stream.next();
            let members = parse_object_members(stream)?;
            Ok(Expression::object(pos, None, members))
        }
        Some(Token::LeftParen) => {
            stream.next();
            let first = parse_expression(stream)?;
            if stream.try_consume(&Token::Comma).is_some() {
                let second = parse_expression(stream)?;
                stream.expect(Token::RightParen)?;
                return Ok(Expression::pair(pos, first, second));
            }
            stream.expect(Token::RightParen)?;
            Ok(first)
        }
        Some(Token::LeftBracket) => {
            let items = parse_delimited_list(
                stream,
                Token::LeftBracket,
                Token::RightBracket,
                Token::Comma,
                parse_expression,
            )?;
            Ok(Expression::array(pos, items))
        }
        Some(Token::LeftBrace) => {
            let entries = parse_delimited_list(
                stream,
                Token::LeftBrace,
                Token::RightBrace,
                Token::Comma,
                |s| {
                    let key = parse_expression(s)?;
                    s.expect(Token::Colon)?;
                    let value = parse_expression(s)?;
                    Ok((key, value))
                },
            )?;
            Ok(Expression::map(pos, entries))
        }
        Some(Token::Identifier(_)) => {
            let (name, _) = stream.expect_identifier()?;
            if stream.peek_token() == Some(&Token::LeftParen) {
                let arguments = parse_delimited_list(
                    stream,
                    Token::LeftParen,
                    Token::RightParen,
                    Token::Comma,
                    parse_expression,
                )?;
                return Ok(Expression::apply(pos, name, arguments));
            }
            if starts_struct_literal(stream) {
                let members = parse_object_members(stream)?;
                return Ok(Expression::object(pos, Some(name), members));
            }
            Ok(Expression::ident(pos, name))
        }
        _ => Err(stream.unexpected("expression")),
    }
}

/// `Name { member: ...`
fn starts_struct_literal(stream: &TokenStream) -> bool {
    stream.peek_token() == Some(&Token::LeftBrace)
        && stream
            .peek_ahead(1)
            .map_or(false, |t| t.token.word().is_some())
        && stream
            .peek_ahead(2)
            .map_or(false, |t| t.token == Token::Colon)
}

fn parse_object_members(stream: &mut TokenStream) -> ParseResult<Vec<(String, Expression)>> {
    parse_delimited_list(
        stream,
        Token::LeftBrace,
        Token::RightBrace,
        Token::Comma,
        |s| {
            let (name, _) = s.expect_word()?;
            s.expect(Token::Colon)?;
            let value = parse_expression(s)?;
            Ok((name, value))
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Literal;

    fn parse(source: &str) -> Expression {
        let mut stream = TokenStream::new(source, "test.wdl").unwrap();
        let expr = parse_expression(&mut stream).unwrap();
        assert!(stream.is_eof(), "trailing tokens in {:?}", source);
        expr
    }

    fn is_int(expr: &Expression, n: i64) -> bool {
        matches!(expr, Expression::Literal { value: Literal::Int(v), .. } if *v == n)
    }

    #[test]
    fn test_multiplication_binds_tighter() {
        match parse("1 + 2 * 3") {
            Expression::BinaryOp {
                op: BinaryOperator::Add,
                left,
                right,
                ..
            } => {
                assert!(is_int(&left, 1));
                match *right {
                    Expression::BinaryOp {
                        op: BinaryOperator::Multiply,
                        left,
                        right,
                        ..
                    } => {
                        assert!(is_int(&left, 2));
                        assert!(is_int(&right, 3));
                    }
                    other => panic!("Expected multiplication, got {:?}", other),
                }
            }
            other => panic!("Expected addition, got {:?}", other),
        }
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        assert!(matches!(
            parse("a || b && c"),
            Expression::BinaryOp { op: BinaryOperator::Or, right, .. }
                if matches!(*right, Expression::BinaryOp { op: BinaryOperator::And, .. })
        ));
    }

    #[test]
    fn test_left_associative() {
        let expr = parse("10 - 2 - 3");
        assert_eq!(expr.to_string(), "10 - 2 - 3");
        match expr {
            Expression::BinaryOp {
                op: BinaryOperator::Subtract,
                left,
                right,
                ..
            } => {
                assert!(matches!(*left, Expression::BinaryOp { op: BinaryOperator::Subtract, .. }));
                assert!(is_int(&right, 3));
            }
            other => panic!("Expected subtraction, got {:?}", other),
        }
    }

    #[test]
    fn test_comparison_and_unary() {
        let expr = parse("!flag && -x + 1 >= length(xs)");
        assert_eq!(expr.to_string(), "!flag && -x + 1 >= length(xs)");
        assert!(matches!(
            expr,
            Expression::BinaryOp { op: BinaryOperator::And, left, .. }
                if matches!(*left, Expression::UnaryOp { op: UnaryOperator::Not, .. })
        ));
    }

    #[test]
    fn test_parentheses_override_precedence() {
        let expr = parse("(1 + 2) * 3");
        assert!(matches!(
            expr,
            Expression::BinaryOp { op: BinaryOperator::Multiply, .. }
        ));
        assert_eq!(expr.to_string(), "(1 + 2) * 3");
    }

    #[test]
    fn test_ternary() {
        let expr = parse("if n > 0 then \"pos\" else \"neg\"");
        assert!(matches!(expr, Expression::TernaryOp { .. }));
        assert_eq!(expr.to_string(), "if n > 0 then \"pos\" else \"neg\"");
    }

    #[test]
    fn test_postfix_chain() {
        let expr = parse("samples[0].left.name");
        assert_eq!(expr.to_string(), "samples[0].left.name");
        match expr {
            Expression::MemberAccess { object, member, .. } => {
                assert_eq!(member, "name");
                assert!(matches!(*object, Expression::MemberAccess { .. }));
            }
            other => panic!("Expected member access, got {:?}", other),
        }
    }

    #[test]
    fn test_composite_literals() {
        assert!(matches!(parse("[1, 2, 3]"), Expression::ArrayLiteral { items, .. } if items.len() == 3));
        assert!(matches!(parse("[]"), Expression::ArrayLiteral { items, .. } if items.is_empty()));
        assert!(matches!(parse("(1, \"a\")"), Expression::PairLiteral { .. }));
        assert!(matches!(
            parse("{\"a\": 1, \"b\": 2}"),
            Expression::MapLiteral { entries, .. } if entries.len() == 2
        ));
        assert!(matches!(
            parse("object { a: 1, b: [2] }"),
            Expression::ObjectLiteral { type_name: None, members, .. } if members.len() == 2
        ));
        assert!(matches!(
            parse("Sample { id: \"s1\", reads: [] }"),
            Expression::ObjectLiteral { type_name: Some(name), .. } if name == "Sample"
        ));
    }

    #[test]
    fn test_function_call() {
        match parse("select_first([a, b], 1)") {
            Expression::FunctionCall {
                name, arguments, ..
            } => {
                assert_eq!(name, "select_first");
                assert_eq!(arguments.len(), 2);
            }
            other => panic!("Expected function call, got {:?}", other),
        }
    }

    #[test]
    fn test_errors() {
        for source in ["1 +", "(1, 2", "if a then b", "[1 2]", "f(,)"] {
            let mut stream = TokenStream::new(source, "test.wdl").unwrap();
            assert!(parse_expression(&mut stream).is_err(), "{}", source);
        }
    }
}
