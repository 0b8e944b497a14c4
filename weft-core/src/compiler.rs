//! Compile entry points and the reusable compiled template.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::ast::Node;
use crate::error::TemplateError;
use crate::eval::{Environment, render_node};
use crate::parser::Parser;

/// A parsed template, reusable for any number of renders.
///
/// The AST and the globals frame are immutable after compilation, so a
/// compiled template can be shared freely between threads; every render
/// builds its own environment and output buffer.
#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    root: Node,
    /// The fixed outermost environment frame. Empty today; data always
    /// shadows it.
    globals: Value,
}

impl CompiledTemplate {
    /// Render against `data`, which becomes the innermost environment
    /// frame. The only render-time failure is a `for` loop whose source
    /// path does not resolve to a sequence.
    pub fn render(&self, data: &Value) -> Result<String, TemplateError> {
        let mut env = Environment::new(&self.globals, data);
        let mut out = String::new();
        render_node(&self.root, &mut env, &mut out)?;
        Ok(out)
    }
}

/// Compile a template that references no partials.
pub fn compile(source: &str) -> Result<CompiledTemplate, TemplateError> {
    compile_with_partials(source, &HashMap::new())
}

/// Compile a template, resolving `{> name}` references against `partials`.
///
/// Partials are compiled (recursively, against the same registry) at
/// compile time; all compile errors abort here and nothing partial is
/// returned.
pub fn compile_with_partials(
    source: &str,
    partials: &HashMap<String, String>,
) -> Result<CompiledTemplate, TemplateError> {
    let root = Parser::new(source, partials).parse()?;
    Ok(CompiledTemplate {
        root,
        globals: Value::Object(Map::new()),
    })
}
