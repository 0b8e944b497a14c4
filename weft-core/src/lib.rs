//! Core compiler for the weft template language.
//!
//! Templates mix literal text with interpolation markers, control tags, and
//! partial references:
//!
//! ```text
//! Hello {{ user.name }}!{% for items as item %} {{item}}{% end %}
//! ```
//!
//! The pipeline is:
//!
//!   template source
//!     -> scanner   (code points + line/column positions)
//!     -> lexer     (markup tokens + expression tokens)
//!     -> parser    (AST)
//!     -> evaluator (text, against layered data frames)
//!
//! [`compile`] (or [`compile_with_partials`]) runs the front half once and
//! returns a [`CompiledTemplate`]; [`CompiledTemplate::render`] walks the
//! AST against `serde_json` data as many times as needed. Higher-level
//! tools (the CLI, embedding applications) should depend on this crate
//! rather than reimplementing the pipeline.

// ---------------------------------------------------------------------
// Diagnostics and errors
// ---------------------------------------------------------------------

pub mod position;
pub mod error;

// ---------------------------------------------------------------------
// Front end: scanning, tokenization, parsing
// ---------------------------------------------------------------------

pub mod scanner;
pub mod lexer;
pub mod ast;
pub mod parser;

// ---------------------------------------------------------------------
// Back end: evaluation and the compile surface
// ---------------------------------------------------------------------

mod eval;
pub mod compiler;
pub mod registry;

// ---------------------------------------------------------------------
// Public API re-exports
// ---------------------------------------------------------------------

pub use compiler::{CompiledTemplate, compile, compile_with_partials};
pub use error::TemplateError;
pub use position::Position;
pub use registry::load_partials_dir;
