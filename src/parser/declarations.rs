//! Token-based declaration parsing for WDL

use super::expressions::parse_expression;
use super::parser_utils::{parse_braced_block, ParseResult};
use super::token_stream::TokenStream;
use super::tokens::Token;
use super::types::parse_type;
use crate::error::WdlError;
use crate::tree::Declaration;

/// Parse a declaration: `Type name` or `Type name = expr`
pub fn parse_declaration(stream: &mut TokenStream) -> ParseResult<Declaration> {
    let pos = stream.current_position();
    let decl_type = parse_type(stream)?;
    let (name, _) = stream.expect_identifier()?;

    let expr = if stream.try_consume(&Token::Assign).is_some() {
        Some(parse_expression(stream)?)
    } else {
        None
    };

    Ok(Declaration::new(pos, decl_type, name, expr))
}

/// Parse a declaration that must carry a value (outputs)
pub fn parse_bound_declaration(stream: &mut TokenStream) -> ParseResult<Declaration> {
    let decl = parse_declaration(stream)?;
    if decl.expr.is_none() {
        return Err(WdlError::syntax_error(
            decl.pos.clone(),
            format!("Output '{}' must be bound to an expression", decl.name),
        ));
    }
    Ok(decl)
}

fn parse_declaration_block<F>(stream: &mut TokenStream, parser: F) -> ParseResult<Vec<Declaration>>
where
    F: Fn(&mut TokenStream) -> ParseResult<Declaration>,
{
    let mut decls: Vec<Declaration> = Vec::new();
    parse_braced_block(stream, |s| {
        let decl = parser(s)?;
        if decls.iter().any(|d| d.name == decl.name) {
            return Err(WdlError::syntax_error(
                decl.pos.clone(),
                format!("Duplicate declaration '{}'", decl.name),
            ));
        }
        decls.push(decl);
        Ok(())
    })?;
    Ok(decls)
}

/// Parse `input { ... }`
pub fn parse_input_section(stream: &mut TokenStream) -> ParseResult<Vec<Declaration>> {
    stream.expect_keyword("input")?;
    parse_declaration_block(stream, parse_declaration)
}

/// Parse `output { ... }`
pub fn parse_output_section(stream: &mut TokenStream) -> ParseResult<Vec<Declaration>> {
    stream.expect_keyword("output")?;
    parse_declaration_block(stream, parse_bound_declaration)
}
