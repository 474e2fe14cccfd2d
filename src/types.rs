//! WDL data types
//!
//! WDL has both atomic types such as `Int`, `Boolean`, and `String`; and
//! parametric types like `Array[String]` and `Map[String, Array[Float]]`.
//! Each type is represented by an immutable instance of a Rust enum, and
//! every variant carries its own `optional` (`?`) flag so the quantifier can
//! appear at any nesting level.
//!
//! Rendering a type with [`Display`](fmt::Display) yields WDL source text
//! that [`FromStr`] parses back to an identical value.

use crate::error::WdlError;
use crate::parser::token_stream::TokenStream;
use crate::parser::types::parse_type;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The base type for all WDL types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    /// Boolean type (true/false)
    Boolean { optional: bool },

    /// Integer type
    Int { optional: bool },

    /// Floating point type
    Float { optional: bool },

    /// String type
    String { optional: bool },

    /// File type (represents a filesystem path)
    File { optional: bool },

    /// Directory type (represents a directory path)
    Directory { optional: bool },

    /// Untyped object
    Object { optional: bool },

    /// Reference to a struct type by name
    Struct { name: String, optional: bool },

    /// Array type, parameterized by item type
    Array {
        item_type: Box<Type>,
        nonempty: bool,
        optional: bool,
    },

    /// Map type, parameterized by key and value types
    Map {
        key_type: Box<Type>,
        value_type: Box<Type>,
        optional: bool,
    },

    /// Pair type, parameterized by left and right types
    Pair {
        left_type: Box<Type>,
        right_type: Box<Type>,
        optional: bool,
    },
}

impl Type {
    pub fn boolean(optional: bool) -> Self {
        Type::Boolean { optional }
    }

    pub fn int(optional: bool) -> Self {
        Type::Int { optional }
    }

    pub fn float(optional: bool) -> Self {
        Type::Float { optional }
    }

    pub fn string(optional: bool) -> Self {
        Type::String { optional }
    }

    pub fn file(optional: bool) -> Self {
        Type::File { optional }
    }

    pub fn directory(optional: bool) -> Self {
        Type::Directory { optional }
    }

    pub fn object(optional: bool) -> Self {
        Type::Object { optional }
    }

    pub fn struct_instance(name: impl Into<String>, optional: bool) -> Self {
        Type::Struct {
            name: name.into(),
            optional,
        }
    }

    pub fn array(item_type: Type, nonempty: bool, optional: bool) -> Self {
        Type::Array {
            item_type: Box::new(item_type),
            nonempty,
            optional,
        }
    }

    pub fn map(key_type: Type, value_type: Type, optional: bool) -> Self {
        Type::Map {
            key_type: Box::new(key_type),
            value_type: Box::new(value_type),
            optional,
        }
    }

    pub fn pair(left_type: Type, right_type: Type, optional: bool) -> Self {
        Type::Pair {
            left_type: Box::new(left_type),
            right_type: Box::new(right_type),
            optional,
        }
    }

    pub fn is_optional(&self) -> bool {
        match self {
            Type::Boolean { optional }
            | Type::Int { optional }
            | Type::Float { optional }
            | Type::String { optional }
            | Type::File { optional }
            | Type::Directory { optional }
            | Type::Object { optional }
            | Type::Struct { optional, .. }
            | Type::Array { optional, .. }
            | Type::Map { optional, .. }
            | Type::Pair { optional, .. } => *optional,
        }
    }

    /// Returns a copy of this type with the `?` quantifier set or cleared.
    pub fn with_optional(mut self, value: bool) -> Self {
        match &mut self {
            Type::Boolean { optional }
            | Type::Int { optional }
            | Type::Float { optional }
            | Type::String { optional }
            | Type::File { optional }
            | Type::Directory { optional }
            | Type::Object { optional }
            | Type::Struct { optional, .. }
            | Type::Array { optional, .. }
            | Type::Map { optional, .. }
            | Type::Pair { optional, .. } => *optional = value,
        }
        self
    }

    pub fn is_nonempty(&self) -> bool {
        matches!(self, Type::Array { nonempty: true, .. })
    }

    /// Type parameters of compound types (empty for atomic types).
    pub fn parameters(&self) -> Vec<&Type> {
        match self {
            Type::Array { item_type, .. } => vec![item_type.as_ref()],
            Type::Map {
                key_type,
                value_type,
                ..
            } => vec![key_type.as_ref(), value_type.as_ref()],
            Type::Pair {
                left_type,
                right_type,
                ..
            } => vec![left_type.as_ref(), right_type.as_ref()],
            _ => Vec::new(),
        }
    }

    /// Names of all struct types referenced anywhere in this type.
    pub fn struct_names(&self) -> Vec<&str> {
        match self {
            Type::Struct { name, .. } => vec![name.as_str()],
            _ => self
                .parameters()
                .into_iter()
                .flat_map(|t| t.struct_names())
                .collect(),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Boolean { .. } => write!(f, "Boolean")?,
            Type::Int { .. } => write!(f, "Int")?,
            Type::Float { .. } => write!(f, "Float")?,
            Type::String { .. } => write!(f, "String")?,
            Type::File { .. } => write!(f, "File")?,
            Type::Directory { .. } => write!(f, "Directory")?,
            Type::Object { .. } => write!(f, "Object")?,
            Type::Struct { name, .. } => write!(f, "{}", name)?,
            Type::Array {
                item_type,
                nonempty,
                ..
            } => write!(f, "Array[{}]{}", item_type, if *nonempty { "+" } else { "" })?,
            Type::Map {
                key_type,
                value_type,
                ..
            } => write!(f, "Map[{}, {}]", key_type, value_type)?,
            Type::Pair {
                left_type,
                right_type,
                ..
            } => write!(f, "Pair[{}, {}]", left_type, right_type)?,
        }

        if self.is_optional() {
            write!(f, "?")?;
        }
        Ok(())
    }
}

impl FromStr for Type {
    type Err = WdlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut stream = TokenStream::new(s, "")?;
        let parsed = parse_type(&mut stream)?;
        stream.expect_eof()?;
        Ok(parsed)
    }
}
