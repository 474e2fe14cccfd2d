//! Token-based task and workflow parsing for WDL

use super::declarations::{parse_declaration, parse_input_section, parse_output_section};
use super::expressions::parse_expression;
use super::literals::{parse_command, parse_meta_entry};
use super::parser_utils::{parse_braced_block, ParseResult};
use super::statements::parse_workflow_element;
use super::token_stream::TokenStream;
use super::tokens::Token;
use super::types::starts_type;
use crate::error::{SourcePosition, WdlError};
use crate::expr::Expression;
use crate::tree::{Declaration, MetaMap, Task, Workflow};
use indexmap::IndexMap;

/// Parse `meta { ... }` or `parameter_meta { ... }` after its keyword
pub fn parse_meta_section(stream: &mut TokenStream) -> ParseResult<MetaMap> {
    let mut meta = MetaMap::new();
    parse_braced_block(stream, |s| {
        let pos = s.current_position();
        let (key, value) = parse_meta_entry(s)?;
        if meta.insert(key.clone(), value).is_some() {
            return Err(WdlError::syntax_error(pos, format!("Duplicate meta key '{}'", key)));
        }
        s.try_consume(&Token::Comma);
        Ok(())
    })?;
    Ok(meta)
}

/// Parse `runtime { key: expr ... }` (also `requirements` and `hints`)
pub fn parse_runtime_section(stream: &mut TokenStream) -> ParseResult<IndexMap<String, Expression>> {
    let mut entries = IndexMap::new();
    parse_braced_block(stream, |s| {
        let (key, pos) = s.expect_word()?;
        s.expect(Token::Colon)?;
        let value = parse_expression(s)?;
        if entries.insert(key.clone(), value).is_some() {
            return Err(WdlError::syntax_error(pos, format!("Duplicate runtime key '{}'", key)));
        }
        s.try_consume(&Token::Comma);
        Ok(())
    })?;
    Ok(entries)
}

fn duplicate_section(pos: SourcePosition, section: &str) -> WdlError {
    WdlError::syntax_error(pos, format!("Duplicate {} section", section))
}

/// `requirements {` or `hints {` (contextual section names)
fn contextual_section(stream: &TokenStream) -> Option<&'static str> {
    let name = match stream.peek_token() {
        Some(Token::Identifier(name)) if name == "requirements" => "requirements",
        Some(Token::Identifier(name)) if name == "hints" => "hints",
        _ => return None,
    };
    match stream.peek_ahead(1) {
        Some(t) if t.token == Token::LeftBrace => Some(name),
        _ => None,
    }
}

/// Parse a task definition
pub fn parse_task(stream: &mut TokenStream) -> ParseResult<Task> {
    let pos = stream.current_position();
    stream.expect_keyword("task")?;
    let (name, _) = stream.expect_identifier()?;

    let mut inputs: Option<Vec<Declaration>> = None;
    let mut outputs: Option<Vec<Declaration>> = None;
    let mut command: Option<(Expression, bool)> = None;
    let mut declarations = Vec::new();
    let mut runtime = None;
    let mut requirements = None;
    let mut hints = None;
    let mut meta = None;
    let mut parameter_meta = None;

    parse_braced_block(stream, |s| {
        let section_pos = s.current_position();
        if s.check_keyword("input") {
            if inputs.is_some() {
                return Err(duplicate_section(section_pos, "input"));
            }
            inputs = Some(parse_input_section(s)?);
        } else if s.check_keyword("output") {
            if outputs.is_some() {
                return Err(duplicate_section(section_pos, "output"));
            }
            outputs = Some(parse_output_section(s)?);
        } else if matches!(s.peek_token(), Some(Token::Command { .. })) {
            if command.is_some() {
                return Err(duplicate_section(section_pos, "command"));
            }
            command = Some(parse_command(s)?);
        } else if s.try_keyword("runtime").is_some() {
            if runtime.is_some() {
                return Err(duplicate_section(section_pos, "runtime"));
            }
            runtime = Some(parse_runtime_section(s)?);
        } else if s.try_keyword("meta").is_some() {
            if meta.is_some() {
                return Err(duplicate_section(section_pos, "meta"));
            }
            meta = Some(parse_meta_section(s)?);
        } else if s.try_keyword("parameter_meta").is_some() {
            if parameter_meta.is_some() {
                return Err(duplicate_section(section_pos, "parameter_meta"));
            }
            parameter_meta = Some(parse_meta_section(s)?);
        } else if let Some(section) = contextual_section(s) {
            s.next();
            let slot = if section == "requirements" {
                &mut requirements
            } else {
                &mut hints
            };
            if slot.is_some() {
                return Err(duplicate_section(section_pos, section));
            }
            *slot = Some(parse_runtime_section(s)?);
        } else if starts_type(s) {
            declarations.push(parse_declaration(s)?);
        } else {
            return Err(s.unexpected("task section or declaration"));
        }
        Ok(())
    })?;

    let (command, heredoc) = command.ok_or_else(|| {
        WdlError::syntax_error(
            pos.clone(),
            format!("Task '{}' is missing a command section", name),
        )
    })?;

    let mut task = Task::new(pos, name, command, heredoc);
    task.inputs = inputs.unwrap_or_default();
    task.declarations = declarations;
    task.outputs = outputs.unwrap_or_default();
    task.runtime = runtime.unwrap_or_default();
    task.requirements = requirements.unwrap_or_default();
    task.hints = hints.unwrap_or_default();
    task.meta = meta.unwrap_or_default();
    task.parameter_meta = parameter_meta.unwrap_or_default();
    Ok(task)
}

/// Parse a workflow definition
pub fn parse_workflow(stream: &mut TokenStream) -> ParseResult<Workflow> {
    let pos = stream.current_position();
    stream.expect_keyword("workflow")?;
    let (name, _) = stream.expect_identifier()?;
    let mut workflow = Workflow::new(pos, name);

    let mut seen_input = false;
    let mut seen_output = false;
    let mut seen_meta = false;
    let mut seen_parameter_meta = false;

    parse_braced_block(stream, |s| {
        let section_pos = s.current_position();
        if s.check_keyword("input") {
            if std::mem::replace(&mut seen_input, true) {
                return Err(duplicate_section(section_pos, "input"));
            }
            workflow.inputs = parse_input_section(s)?;
        } else if s.check_keyword("output") {
            if std::mem::replace(&mut seen_output, true) {
                return Err(duplicate_section(section_pos, "output"));
            }
            workflow.outputs = parse_output_section(s)?;
        } else if s.try_keyword("meta").is_some() {
            if std::mem::replace(&mut seen_meta, true) {
                return Err(duplicate_section(section_pos, "meta"));
            }
            workflow.meta = parse_meta_section(s)?;
        } else if s.try_keyword("parameter_meta").is_some() {
            if std::mem::replace(&mut seen_parameter_meta, true) {
                return Err(duplicate_section(section_pos, "parameter_meta"));
            }
            workflow.parameter_meta = parse_meta_section(s)?;
        } else {
            workflow.body.push(parse_workflow_element(s)?);
        }
        Ok(())
    })?;

    Ok(workflow)
}
