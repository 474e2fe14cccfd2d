//! Token-based workflow statement parsing for WDL (calls, scatters,
//! conditionals)

use super::declarations::parse_declaration;
use super::expressions::parse_expression;
use super::parser_utils::{parse_braced_block, ParseResult};
use super::token_stream::TokenStream;
use super::tokens::Token;
use super::types::starts_type;
use crate::error::WdlError;
use crate::expr::Expression;
use crate::tree::{Call, Conditional, Scatter, WorkflowElement};

/// Parse a call statement:
/// `call ns.task [as alias] [after other]* [{ [input:] k = e, k2, ... }]`
pub fn parse_call_statement(stream: &mut TokenStream) -> ParseResult<Call> {
    let pos = stream.current_position();
    stream.expect_keyword("call")?;

    let (mut target, _) = stream.expect_identifier()?;
    while stream.try_consume(&Token::Dot).is_some() {
        let (part, _) = stream.expect_identifier()?;
        target.push('.');
        target.push_str(&part);
    }

    let alias = if stream.try_keyword("as").is_some() {
        Some(stream.expect_identifier()?.0)
    } else {
        None
    };

    let mut call = Call::new(pos, target, alias);
    while stream.try_keyword("after").is_some() {
        call.after.push(stream.expect_identifier()?.0);
    }

    if stream.peek_token() == Some(&Token::LeftBrace) {
        parse_call_inputs(stream, &mut call)?;
    }

    Ok(call)
}

fn parse_call_inputs(stream: &mut TokenStream, call: &mut Call) -> ParseResult<()> {
    stream.expect(Token::LeftBrace)?;

    if stream.check_keyword("input") {
        stream.next();
        stream.expect(Token::Colon)?;
    }

    while stream.peek_token() != Some(&Token::RightBrace) {
        let (name, pos) = stream.expect_identifier()?;
        // `input: x` is shorthand for `x = x`
        let value = if stream.try_consume(&Token::Assign).is_some() {
            parse_expression(stream)?
        } else {
            Expression::ident(pos.clone(), name.clone())
        };
        if call.inputs.insert(name.clone(), value).is_some() {
            return Err(WdlError::syntax_error(
                pos,
                format!("Duplicate call input '{}'", name),
            ));
        }
        if stream.try_consume(&Token::Comma).is_none() {
            break;
        }
    }

    stream.expect(Token::RightBrace)?;
    Ok(())
}

/// Parse `scatter (x in expr) { ... }`
pub fn parse_scatter_statement(stream: &mut TokenStream) -> ParseResult<Scatter> {
    let pos = stream.current_position();
    stream.expect_keyword("scatter")?;
    stream.expect(Token::LeftParen)?;
    let (variable, _) = stream.expect_identifier()?;
    stream.expect_keyword("in")?;
    let expr = parse_expression(stream)?;
    stream.expect(Token::RightParen)?;
    let body = parse_workflow_body(stream)?;

    Ok(Scatter {
        pos,
        variable,
        expr,
        body,
    })
}

/// Parse `if (expr) { ... }`
pub fn parse_conditional_statement(stream: &mut TokenStream) -> ParseResult<Conditional> {
    let pos = stream.current_position();
    stream.expect_keyword("if")?;
    stream.expect(Token::LeftParen)?;
    let expr = parse_expression(stream)?;
    stream.expect(Token::RightParen)?;
    let body = parse_workflow_body(stream)?;

    Ok(Conditional { pos, expr, body })
}

/// Parse a braced list of workflow elements
pub fn parse_workflow_body(stream: &mut TokenStream) -> ParseResult<Vec<WorkflowElement>> {
    let mut body = Vec::new();
    parse_braced_block(stream, |s| {
        body.push(parse_workflow_element(s)?);
        Ok(())
    })?;
    Ok(body)
}

/// Parse a single workflow body element
pub fn parse_workflow_element(stream: &mut TokenStream) -> ParseResult<WorkflowElement> {
    if stream.check_keyword("call") {
        Ok(WorkflowElement::Call(parse_call_statement(stream)?))
    } else if stream.check_keyword("scatter") {
        Ok(WorkflowElement::Scatter(Box::new(parse_scatter_statement(
            stream,
        )?)))
    } else if stream.check_keyword("if") {
        Ok(WorkflowElement::Conditional(Box::new(
            parse_conditional_statement(stream)?,
        )))
    } else if starts_type(stream) {
        Ok(WorkflowElement::Declaration(parse_declaration(stream)?))
    } else {
        Err(stream.unexpected("call, scatter, if or declaration"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(source: &str) -> ParseResult<Call> {
        let mut stream = TokenStream::new(source, "test.wdl").unwrap();
        let call = parse_call_statement(&mut stream)?;
        assert!(stream.is_eof());
        Ok(call)
    }

    #[test]
    fn test_simple_call() {
        let c = call("call lib.align").unwrap();
        assert_eq!(c.target, "lib.align");
        assert!(c.alias.is_none());
        assert!(c.inputs.is_empty());
    }

    #[test]
    fn test_call_with_everything() {
        let c = call("call align as a2 after a1 after prep { input: reads = r, threads }").unwrap();
        assert_eq!(c.name(), "a2");
        assert_eq!(c.after, vec!["a1", "prep"]);
        assert_eq!(c.inputs.len(), 2);
        assert!(matches!(
            &c.inputs["threads"],
            Expression::Identifier { name, .. } if name == "threads"
        ));
        assert_eq!(c.inputs["reads"].to_string(), "r");
    }

    #[test]
    fn test_call_inputs_without_input_keyword() {
        let c = call("call t { x = 1, y = 2, }").unwrap();
        assert_eq!(c.inputs.keys().collect::<Vec<_>>(), vec!["x", "y"]);
    }

    #[test]
    fn test_duplicate_call_input() {
        let err = call("call t { input: x = 1, x = 2 }").unwrap_err();
        assert!(err.to_string().contains("Duplicate call input 'x'"));
    }

    #[test]
    fn test_nested_sections() {
        let mut stream = TokenStream::new(
            "scatter (s in samples) { Int n = 1 if (s.ok) { call t } }",
            "test.wdl",
        )
        .unwrap();
        match parse_workflow_element(&mut stream).unwrap() {
            WorkflowElement::Scatter(scatter) => {
                assert_eq!(scatter.variable, "s");
                assert_eq!(scatter.body.len(), 2);
                assert!(matches!(scatter.body[1], WorkflowElement::Conditional(_)));
            }
            other => panic!("Expected scatter, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_element() {
        let mut stream = TokenStream::new("42", "test.wdl").unwrap();
        assert!(parse_workflow_element(&mut stream).is_err());
    }
}
