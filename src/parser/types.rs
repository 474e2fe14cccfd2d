//! Token-based type parsing for WDL

use super::parser_utils::ParseResult;
use super::token_stream::TokenStream;
use super::tokens::Token;
use crate::types::Type;

/// Whether the current token can begin a type
pub fn starts_type(stream: &TokenStream) -> bool {
    matches!(stream.peek_token(), Some(Token::Identifier(_)))
}

/// Parse `[T]` or `[A, B]` after a parametric type name
fn parse_parameters(stream: &mut TokenStream, count: usize) -> ParseResult<Vec<Type>> {
    stream.expect(Token::LeftBracket)?;
    let mut params = vec![parse_type(stream)?];
    while params.len() < count {
        stream.expect(Token::Comma)?;
        params.push(parse_type(stream)?);
    }
    stream.expect(Token::RightBracket)?;
    Ok(params)
}

/// Parse a type, including parametric types like `Map[String, Array[Int]+]?`
pub fn parse_type(stream: &mut TokenStream) -> ParseResult<Type> {
    let (name, _) = match stream.peek_token() {
        Some(Token::Identifier(_)) => stream.expect_identifier()?,
        _ => return Err(stream.unexpected("type")),
    };

    let parsed = match name.as_str() {
        "Boolean" => Type::boolean(false),
        "Int" => Type::int(false),
        "Float" => Type::float(false),
        "String" => Type::string(false),
        "File" => Type::file(false),
        "Directory" => Type::directory(false),
        "Object" => Type::object(false),
        "Array" => {
            let mut params = parse_parameters(stream, 1)?;
            let item = params.remove(0);
            let nonempty = stream.try_consume(&Token::Plus).is_some();
            Type::array(item, nonempty, false)
        }
        "Map" => {
            let mut params = parse_parameters(stream, 2)?;
            let value = params.remove(1);
            let key = params.remove(0);
            Type::map(key, value, false)
        }
        "Pair" => {
            let mut params = parse_parameters(stream, 2)?;
            let right = params.remove(1);
            let left = params.remove(0);
            Type::pair(left, right, false)
        }
        _ => Type::struct_instance(name, false),
    };

    let optional = stream.try_consume(&Token::Question).is_some();
    Ok(parsed.with_optional(optional))
}
