//! WDL expressions composing literal values, arithmetic, comparison, conditionals,
//! string interpolation, arrays & maps, and function applications.
//!
//! The abstract syntax tree (AST) for any expression is represented by a closed
//! enum. Expressions form trees without sharing; every node records the source
//! position it was parsed from. Rendering an expression with `Display` yields
//! WDL text, parenthesized where operator precedence requires it.

use crate::error::SourcePosition;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Literal constant values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Boolean(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// `None`
    None,
}

/// WDL expression AST node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    /// Constant value (a string without placeholders is a literal too)
    Literal { pos: SourcePosition, value: Literal },

    /// Variable identifier reference
    Identifier { pos: SourcePosition, name: String },

    /// Member access: object.member
    MemberAccess {
        pos: SourcePosition,
        object: Box<Expression>,
        member: String,
    },

    /// Array/map access: collection[index]
    IndexAccess {
        pos: SourcePosition,
        collection: Box<Expression>,
        index: Box<Expression>,
    },

    /// Function application: name(arg1, arg2, ...)
    FunctionCall {
        pos: SourcePosition,
        name: String,
        arguments: Vec<Expression>,
    },

    /// Binary operations: +, -, *, /, %, ==, !=, <, <=, >, >=, &&, ||
    BinaryOp {
        pos: SourcePosition,
        op: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },

    /// Unary operations: !, -, +
    UnaryOp {
        pos: SourcePosition,
        op: UnaryOperator,
        operand: Box<Expression>,
    },

    /// Conditional expression: if condition then if_true else if_false
    TernaryOp {
        pos: SourcePosition,
        condition: Box<Expression>,
        if_true: Box<Expression>,
        if_false: Box<Expression>,
    },

    /// Array literal [item1, item2, ...]
    ArrayLiteral {
        pos: SourcePosition,
        items: Vec<Expression>,
    },

    /// Map literal {key1: value1, key2: value2, ...}
    MapLiteral {
        pos: SourcePosition,
        entries: Vec<(Expression, Expression)>,
    },

    /// Pair literal (left, right)
    PairLiteral {
        pos: SourcePosition,
        left: Box<Expression>,
        right: Box<Expression>,
    },

    /// `object { a: 1 }` (no type name) or `MyStruct { a: 1 }`
    ObjectLiteral {
        pos: SourcePosition,
        type_name: Option<String>,
        members: Vec<(String, Expression)>,
    },

    /// String or command text with at least one placeholder
    StringInterpolation {
        pos: SourcePosition,
        parts: Vec<StringPart>,
    },
}

/// Parts of an interpolated string (literal text or placeholder)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StringPart {
    /// Literal text, escape sequences already decoded
    Text(String),
    /// Expression placeholder ~{expr} or ${expr}
    Placeholder {
        expression: Box<Expression>,
        options: PlaceholderOptions,
    },
}

/// Placeholder options: `sep`, `default`, `true`, `false`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceholderOptions {
    pub sep: Option<String>,
    pub default: Option<String>,
    pub true_value: Option<String>,
    pub false_value: Option<String>,
}

impl PlaceholderOptions {
    pub fn is_empty(&self) -> bool {
        self.sep.is_none()
            && self.default.is_none()
            && self.true_value.is_none()
            && self.false_value.is_none()
    }

    /// Sets an option by its WDL name; returns false for unknown names.
    pub fn set(&mut self, name: &str, value: String) -> bool {
        let slot = match name {
            "sep" => &mut self.sep,
            "default" => &mut self.default,
            "true" => &mut self.true_value,
            "false" => &mut self.false_value,
            _ => return false,
        };
        *slot = Some(value);
        true
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOperator {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,

    // Comparison
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,

    // Logical
    And,
    Or,
}

impl BinaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::Less => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::Greater => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::And => "&&",
            BinaryOperator::Or => "||",
        }
    }

    /// Binding strength, loosest (1) to tightest (5).
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOperator::Or => 1,
            BinaryOperator::And => 2,
            BinaryOperator::Equal
            | BinaryOperator::NotEqual
            | BinaryOperator::Less
            | BinaryOperator::LessEqual
            | BinaryOperator::Greater
            | BinaryOperator::GreaterEqual => 3,
            BinaryOperator::Add | BinaryOperator::Subtract => 4,
            BinaryOperator::Multiply | BinaryOperator::Divide | BinaryOperator::Modulo => 5,
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOperator {
    /// Logical NOT (!)
    Not,
    /// Numeric negation (-)
    Negate,
    /// Numeric identity (+)
    Plus,
}

impl UnaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOperator::Not => "!",
            UnaryOperator::Negate => "-",
            UnaryOperator::Plus => "+",
        }
    }
}

// Constructors
impl Expression {
    pub fn boolean(pos: SourcePosition, value: bool) -> Self {
        Expression::Literal {
            pos,
            value: Literal::Boolean(value),
        }
    }

    pub fn int(pos: SourcePosition, value: i64) -> Self {
        Expression::Literal {
            pos,
            value: Literal::Int(value),
        }
    }

    pub fn float(pos: SourcePosition, value: f64) -> Self {
        Expression::Literal {
            pos,
            value: Literal::Float(value),
        }
    }

    pub fn string_literal(pos: SourcePosition, value: impl Into<String>) -> Self {
        Expression::Literal {
            pos,
            value: Literal::String(value.into()),
        }
    }

    pub fn null(pos: SourcePosition) -> Self {
        Expression::Literal {
            pos,
            value: Literal::None,
        }
    }

    pub fn ident(pos: SourcePosition, name: impl Into<String>) -> Self {
        Expression::Identifier {
            pos,
            name: name.into(),
        }
    }

    pub fn member_access(pos: SourcePosition, object: Expression, member: impl Into<String>) -> Self {
        Expression::MemberAccess {
            pos,
            object: Box::new(object),
            member: member.into(),
        }
    }

    pub fn index_access(pos: SourcePosition, collection: Expression, index: Expression) -> Self {
        Expression::IndexAccess {
            pos,
            collection: Box::new(collection),
            index: Box::new(index),
        }
    }

    pub fn apply(pos: SourcePosition, name: impl Into<String>, arguments: Vec<Expression>) -> Self {
        Expression::FunctionCall {
            pos,
            name: name.into(),
            arguments,
        }
    }

    pub fn binary_op(
        pos: SourcePosition,
        op: BinaryOperator,
        left: Expression,
        right: Expression,
    ) -> Self {
        Expression::BinaryOp {
            pos,
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn unary_op(pos: SourcePosition, op: UnaryOperator, operand: Expression) -> Self {
        Expression::UnaryOp {
            pos,
            op,
            operand: Box::new(operand),
        }
    }

    pub fn if_then_else(
        pos: SourcePosition,
        condition: Expression,
        if_true: Expression,
        if_false: Expression,
    ) -> Self {
        Expression::TernaryOp {
            pos,
            condition: Box::new(condition),
            if_true: Box::new(if_true),
            if_false: Box::new(if_false),
        }
    }

    pub fn array(pos: SourcePosition, items: Vec<Expression>) -> Self {
        Expression::ArrayLiteral { pos, items }
    }

    pub fn map(pos: SourcePosition, entries: Vec<(Expression, Expression)>) -> Self {
        Expression::MapLiteral { pos, entries }
    }

    pub fn pair(pos: SourcePosition, left: Expression, right: Expression) -> Self {
        Expression::PairLiteral {
            pos,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn object(
        pos: SourcePosition,
        type_name: Option<String>,
        members: Vec<(String, Expression)>,
    ) -> Self {
        Expression::ObjectLiteral {
            pos,
            type_name,
            members,
        }
    }

    /// Builds a string expression, collapsing placeholder-free parts into a
    /// plain string literal.
    pub fn string(pos: SourcePosition, parts: Vec<StringPart>) -> Self {
        if parts
            .iter()
            .all(|part| matches!(part, StringPart::Text(_)))
        {
            let text: String = parts
                .into_iter()
                .filter_map(|part| match part {
                    StringPart::Text(text) => Some(text),
                    StringPart::Placeholder { .. } => None,
                })
                .collect();
            Expression::string_literal(pos, text)
        } else {
            Expression::StringInterpolation { pos, parts }
        }
    }
}

impl Expression {
    /// Source position of this expression
    pub fn pos(&self) -> &SourcePosition {
        match self {
            Expression::Literal { pos, .. }
            | Expression::Identifier { pos, .. }
            | Expression::MemberAccess { pos, .. }
            | Expression::IndexAccess { pos, .. }
            | Expression::FunctionCall { pos, .. }
            | Expression::BinaryOp { pos, .. }
            | Expression::UnaryOp { pos, .. }
            | Expression::TernaryOp { pos, .. }
            | Expression::ArrayLiteral { pos, .. }
            | Expression::MapLiteral { pos, .. }
            | Expression::PairLiteral { pos, .. }
            | Expression::ObjectLiteral { pos, .. }
            | Expression::StringInterpolation { pos, .. } => pos,
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Expression::TernaryOp { .. } => 0,
            Expression::BinaryOp { op, .. } => op.precedence(),
            Expression::UnaryOp { .. } => 6,
            _ => 7,
        }
    }
}

fn escape_text(text: &str, quote: char) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}

fn write_operand(f: &mut fmt::Formatter<'_>, expr: &Expression, min: u8) -> fmt::Result {
    if expr.precedence() < min {
        write!(f, "({})", expr)
    } else {
        write!(f, "{}", expr)
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Boolean(value) => write!(f, "{}", value),
            Literal::Int(value) => write!(f, "{}", value),
            // Debug keeps the fractional part so the text lexes as a float
            Literal::Float(value) => write!(f, "{:?}", value),
            Literal::String(value) => write!(f, "\"{}\"", escape_text(value, '"')),
            Literal::None => write!(f, "None"),
        }
    }
}

impl fmt::Display for StringPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StringPart::Text(text) => write!(f, "{}", escape_text(text, '"')),
            StringPart::Placeholder {
                expression,
                options,
            } => {
                write!(f, "~{{")?;
                let named = [
                    ("sep", &options.sep),
                    ("true", &options.true_value),
                    ("false", &options.false_value),
                    ("default", &options.default),
                ];
                for (name, value) in named {
                    if let Some(value) = value {
                        write!(f, "{}=\"{}\" ", name, escape_text(value, '"'))?;
                    }
                }
                write!(f, "{}}}", expression)
            }
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal { value, .. } => write!(f, "{}", value),
            Expression::Identifier { name, .. } => write!(f, "{}", name),
            Expression::MemberAccess { object, member, .. } => {
                write_operand(f, object, 7)?;
                write!(f, ".{}", member)
            }
            Expression::IndexAccess {
                collection, index, ..
            } => {
                write_operand(f, collection, 7)?;
                write!(f, "[{}]", index)
            }
            Expression::FunctionCall {
                name, arguments, ..
            } => {
                write!(f, "{}(", name)?;
                write_list(f, arguments)?;
                write!(f, ")")
            }
            Expression::BinaryOp {
                op, left, right, ..
            } => {
                // Left-associative: an equal-precedence right operand needs parens
                write_operand(f, left, op.precedence())?;
                write!(f, " {} ", op.symbol())?;
                write_operand(f, right, op.precedence() + 1)
            }
            Expression::UnaryOp { op, operand, .. } => {
                write!(f, "{}", op.symbol())?;
                write_operand(f, operand, 6)
            }
            Expression::TernaryOp {
                condition,
                if_true,
                if_false,
                ..
            } => write!(f, "if {} then {} else {}", condition, if_true, if_false),
            Expression::ArrayLiteral { items, .. } => {
                write!(f, "[")?;
                write_list(f, items)?;
                write!(f, "]")
            }
            Expression::MapLiteral { entries, .. } => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            Expression::PairLiteral { left, right, .. } => write!(f, "({}, {})", left, right),
            Expression::ObjectLiteral {
                type_name,
                members,
                ..
            } => {
                write!(f, "{} {{", type_name.as_deref().unwrap_or("object"))?;
                for (i, (name, value)) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, " {}: {}", name, value)?;
                }
                write!(f, " }}")
            }
            Expression::StringInterpolation { parts, .. } => {
                write!(f, "\"")?;
                for part in parts {
                    write!(f, "{}", part)?;
                }
                write!(f, "\"")
            }
        }
    }
}
