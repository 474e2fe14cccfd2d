//! # wdl-bundler
//!
//! Workflow Description Language (WDL) parser, import dependency analyzer
//! and workflow bundler.
//!
//! ```no_run
//! use wdl_bundler::{create_bundle, extract_bundle, BundleOptions};
//!
//! let bundle = create_bundle("workflow/main.wdl", "main.zip", BundleOptions::default())?;
//! println!("{} files", bundle.files.len());
//! extract_bundle("main.zip", "unpacked")?;
//! # Ok::<(), wdl_bundler::WdlError>(())
//! ```

pub mod bundle;
pub mod config;
pub mod dependencies;
pub mod error;
pub mod expr;
pub mod fs_utils;
pub mod parser;
pub mod tree;
pub mod types;

pub use bundle::{
    build_bundle, create_bundle, extract_bundle, read_manifest, Bundle, BundleMetadata,
    BundleOptions, Bundler,
};
pub use dependencies::{analyze, analyze_dependencies_from_file, DependencyGraph, DependencyNode};
pub use error::{Diagnostic, SourcePosition, WdlError};
pub use expr::{BinaryOperator, Expression, Literal, PlaceholderOptions, StringPart, UnaryOperator};
pub use parser::{parse, parse_bytes, parse_document, parse_expression_str};
pub use tree::{
    Call, Conditional, Declaration, Document, Import, ImportAlias, Scatter, StructTypeDef, Task,
    Workflow, WorkflowElement,
};
pub use types::Type;
