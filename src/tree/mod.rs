//! WDL Abstract Syntax Tree (AST) for documents, tasks, and workflows
//!
//! This module contains the AST representation for WDL documents, including tasks,
//! workflows, declarations, calls, and control flow sections. The AST is
//! constructed by the parser and consumed by the dependency analyzer and the
//! bundler; it is immutable once built.

use crate::error::SourcePosition;
use crate::expr::Expression;
use crate::types::Type;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::path::{Path, PathBuf};

/// Untyped `meta`/`parameter_meta` section contents, in source order
pub type MetaMap = IndexMap<String, serde_json::Value>;

/// WDL struct type definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructTypeDef {
    pub pos: SourcePosition,
    pub name: String,
    pub members: IndexMap<String, Type>,
    pub meta: MetaMap,
    pub parameter_meta: MetaMap,
}

impl StructTypeDef {
    pub fn new(pos: SourcePosition, name: String, members: IndexMap<String, Type>) -> Self {
        Self {
            pos,
            name,
            members,
            meta: MetaMap::new(),
            parameter_meta: MetaMap::new(),
        }
    }
}

/// Value declaration within a task, workflow or section body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    pub pos: SourcePosition,
    pub decl_type: Type,
    pub name: String,
    /// Absent for unbound (input-only) declarations
    pub expr: Option<Expression>,
}

impl Declaration {
    pub fn new(pos: SourcePosition, decl_type: Type, name: String, expr: Option<Expression>) -> Self {
        Self {
            pos,
            decl_type,
            name,
            expr,
        }
    }
}

/// WDL Task definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub pos: SourcePosition,
    pub name: String,
    pub inputs: Vec<Declaration>,
    /// Private declarations outside the input and output sections
    pub declarations: Vec<Declaration>,
    /// Command template: a string literal or interpolation
    pub command: Expression,
    /// `command <<< >>>` rather than `command { }`
    pub heredoc: bool,
    pub outputs: Vec<Declaration>,
    pub runtime: IndexMap<String, Expression>,
    pub requirements: IndexMap<String, Expression>,
    pub hints: IndexMap<String, Expression>,
    pub meta: MetaMap,
    pub parameter_meta: MetaMap,
}

impl Task {
    pub fn new(pos: SourcePosition, name: String, command: Expression, heredoc: bool) -> Self {
        Self {
            pos,
            name,
            inputs: Vec::new(),
            declarations: Vec::new(),
            command,
            heredoc,
            outputs: Vec::new(),
            runtime: IndexMap::new(),
            requirements: IndexMap::new(),
            hints: IndexMap::new(),
            meta: MetaMap::new(),
            parameter_meta: MetaMap::new(),
        }
    }

    /// Inputs without a default expression
    pub fn required_inputs(&self) -> impl Iterator<Item = &Declaration> {
        self.inputs
            .iter()
            .filter(|d| d.expr.is_none() && !d.decl_type.is_optional())
    }
}

/// Task or workflow call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub pos: SourcePosition,
    /// Dotted reference, e.g. `lib.align`
    pub target: String,
    pub alias: Option<String>,
    pub inputs: IndexMap<String, Expression>,
    /// Names of calls this one must run after
    pub after: Vec<String>,
}

impl Call {
    pub fn new(pos: SourcePosition, target: String, alias: Option<String>) -> Self {
        Self {
            pos,
            target,
            alias,
            inputs: IndexMap::new(),
            after: Vec::new(),
        }
    }

    /// Name the call's outputs are bound under: the alias, or the last
    /// component of the target.
    pub fn name(&self) -> &str {
        match &self.alias {
            Some(alias) => alias.as_str(),
            None => self
                .target
                .rsplit('.')
                .next()
                .unwrap_or(self.target.as_str()),
        }
    }

    /// Import namespace prefix of the target, if it is qualified
    pub fn namespace(&self) -> Option<&str> {
        self.target.rsplit_once('.').map(|(ns, _)| ns)
    }
}

/// Scatter section for parallel execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scatter {
    pub pos: SourcePosition,
    pub variable: String,
    pub expr: Expression,
    pub body: Vec<WorkflowElement>,
}

/// Conditional section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conditional {
    pub pos: SourcePosition,
    pub expr: Expression,
    pub body: Vec<WorkflowElement>,
}

/// Workflow body element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WorkflowElement {
    Declaration(Declaration),
    Call(Call),
    Scatter(Box<Scatter>),
    Conditional(Box<Conditional>),
}

impl WorkflowElement {
    pub fn pos(&self) -> &SourcePosition {
        match self {
            WorkflowElement::Declaration(d) => &d.pos,
            WorkflowElement::Call(c) => &c.pos,
            WorkflowElement::Scatter(s) => &s.pos,
            WorkflowElement::Conditional(c) => &c.pos,
        }
    }

    /// Nested body, for scatter and conditional sections
    pub fn body(&self) -> &[WorkflowElement] {
        match self {
            WorkflowElement::Scatter(s) => &s.body,
            WorkflowElement::Conditional(c) => &c.body,
            _ => &[],
        }
    }
}

/// WDL Workflow definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub pos: SourcePosition,
    pub name: String,
    pub inputs: Vec<Declaration>,
    pub body: Vec<WorkflowElement>,
    pub outputs: Vec<Declaration>,
    pub meta: MetaMap,
    pub parameter_meta: MetaMap,
}

impl Workflow {
    pub fn new(pos: SourcePosition, name: String) -> Self {
        Self {
            pos,
            name,
            inputs: Vec::new(),
            body: Vec::new(),
            outputs: Vec::new(),
            meta: MetaMap::new(),
            parameter_meta: MetaMap::new(),
        }
    }

    pub fn declarations(&self) -> impl Iterator<Item = &Declaration> {
        self.body.iter().filter_map(|e| match e {
            WorkflowElement::Declaration(d) => Some(d),
            _ => None,
        })
    }

    pub fn calls(&self) -> impl Iterator<Item = &Call> {
        self.body.iter().filter_map(|e| match e {
            WorkflowElement::Call(c) => Some(c),
            _ => None,
        })
    }

    pub fn scatters(&self) -> impl Iterator<Item = &Scatter> {
        self.body.iter().filter_map(|e| match e {
            WorkflowElement::Scatter(s) => Some(s.as_ref()),
            _ => None,
        })
    }

    pub fn conditionals(&self) -> impl Iterator<Item = &Conditional> {
        self.body.iter().filter_map(|e| match e {
            WorkflowElement::Conditional(c) => Some(c.as_ref()),
            _ => None,
        })
    }

    /// Every call in the workflow, including those nested in sections, in
    /// source order.
    pub fn all_calls(&self) -> Vec<&Call> {
        fn collect<'a>(elements: &'a [WorkflowElement], out: &mut Vec<&'a Call>) {
            for element in elements {
                match element {
                    WorkflowElement::Call(call) => out.push(call),
                    other => collect(other.body(), out),
                }
            }
        }

        let mut calls = Vec::new();
        collect(&self.body, &mut calls);
        calls
    }
}

/// Struct alias clause of an import: `alias Original as Renamed`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportAlias {
    pub original: String,
    pub alias: String,
}

/// Import statement in a WDL document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Import {
    pub pos: SourcePosition,
    /// URI exactly as written between the quotes
    pub uri: String,
    /// Explicit `as` namespace
    pub namespace: Option<String>,
    pub aliases: Vec<ImportAlias>,
    /// Byte range of the URI text (inside the quotes) in the source
    pub uri_span: Range<usize>,
}

impl Import {
    pub fn new(pos: SourcePosition, uri: String, uri_span: Range<usize>) -> Self {
        Self {
            pos,
            uri,
            namespace: None,
            aliases: Vec::new(),
            uri_span,
        }
    }

    /// Namespace the imported document is bound under: the explicit alias,
    /// or the file stem of the URI.
    pub fn effective_namespace(&self) -> String {
        if let Some(ns) = &self.namespace {
            return ns.clone();
        }
        let name = self.uri.rsplit('/').next().unwrap_or(self.uri.as_str());
        let name = name.split('?').next().unwrap_or(name);
        match name.rfind('.') {
            Some(dot) if dot > 0 => name[..dot].to_string(),
            _ => name.to_string(),
        }
    }
}

/// WDL Document (top-level container)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub pos: SourcePosition,
    /// Declared version, empty when the document has no `version` line
    pub version: String,
    pub imports: Vec<Import>,
    pub structs: Vec<StructTypeDef>,
    pub tasks: Vec<Task>,
    pub workflow: Option<Workflow>,
    /// Canonical path the document was read from
    pub source: Option<PathBuf>,
}

impl Document {
    pub fn new(pos: SourcePosition, version: String) -> Self {
        Self {
            pos,
            version,
            imports: Vec::new(),
            structs: Vec::new(),
            tasks: Vec::new(),
            workflow: None,
            source: None,
        }
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn task(&self, name: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.name == name)
    }

    pub fn struct_def(&self, name: &str) -> Option<&StructTypeDef> {
        self.structs.iter().find(|s| s.name == name)
    }

    /// Import bound under the given namespace
    pub fn import(&self, namespace: &str) -> Option<&Import> {
        self.imports
            .iter()
            .find(|i| i.effective_namespace() == namespace)
    }
}
