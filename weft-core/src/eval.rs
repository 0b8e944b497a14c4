//! Tree-walking evaluation against a layered variable environment.
//!
//! The environment is an ordered stack of frames. Every render starts from
//! two frames — the template's fixed globals underneath the caller's data —
//! and each loop iteration pushes a one-entry binding frame that is popped
//! when the iteration's body finishes. Resolution checks frames
//! innermost-first, so a loop binding shadows a data key of the same name.
//!
//! Path resolution is three-state: `Found` or the missing sentinel. A
//! missing plain variable renders as nothing; only a missing (or
//! non-sequence) loop iterable is a render error.

use serde_json::Value;

use crate::ast::Node;
use crate::error::TemplateError;

/// One layer of the variable environment.
enum Frame<'a> {
    /// A whole data value; dotted paths descend from its root.
    Data(&'a Value),
    /// A single loop binding.
    Binding { name: &'a str, value: &'a Value },
}

/// Ordered frame stack; later-pushed frames shadow earlier ones.
pub(crate) struct Environment<'a> {
    frames: Vec<Frame<'a>>,
}

impl<'a> Environment<'a> {
    pub(crate) fn new(globals: &'a Value, data: &'a Value) -> Self {
        Environment {
            frames: vec![Frame::Data(globals), Frame::Data(data)],
        }
    }

    fn push_binding(&mut self, name: &'a str, value: &'a Value) {
        self.frames.push(Frame::Binding { name, value });
    }

    fn pop_binding(&mut self) {
        self.frames.pop();
    }

    /// Resolve a dotted path, innermost frame first.
    fn resolve(&self, path: &str) -> Option<&'a Value> {
        for frame in self.frames.iter().rev() {
            let found = match *frame {
                Frame::Data(value) => descend(value, path.split('.')),
                Frame::Binding { name, value } => {
                    let mut segments = path.split('.');
                    if segments.next() != Some(name) {
                        continue;
                    }
                    descend(value, segments)
                }
            };
            if let Some(value) = found {
                return Some(value);
            }
        }
        None
    }
}

/// Sequential key descent. Mappings descend by key, sequences by numeric
/// index; any other segment short-circuits the whole path to "not found".
fn descend<'a, 'p>(
    mut value: &'a Value,
    segments: impl Iterator<Item = &'p str>,
) -> Option<&'a Value> {
    for segment in segments {
        value = match value {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(value)
}

/// Result of evaluating an expression node: a value, or the sentinel
/// produced by unresolved variable references.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Resolved {
    Found(Value),
    Missing,
}

impl Resolved {
    fn truthy(&self) -> bool {
        match self {
            Resolved::Missing => false,
            Resolved::Found(value) => truthy(value),
        }
    }
}

/// Falsey: null, false, zero, and the empty string. Sequences and mappings
/// are truthy whether or not they are empty.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Strict type-and-value equality. Numbers compare numerically across
/// integer/float representations; no other cross-type pair is ever equal,
/// so a number and its string representation are distinct.
fn strict_eq(a: &Resolved, b: &Resolved) -> bool {
    match (a, b) {
        (Resolved::Missing, Resolved::Missing) => true,
        (Resolved::Missing, _) | (_, Resolved::Missing) => false,
        (Resolved::Found(a), Resolved::Found(b)) => value_eq(a, b),
    }
}

fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => a == b,
    }
}

/// Render a statement-position node into `out`.
pub(crate) fn render_node<'a>(
    node: &'a Node,
    env: &mut Environment<'a>,
    out: &mut String,
) -> Result<(), TemplateError> {
    match node {
        Node::Block(children) => {
            for child in children {
                render_node(child, env, out)?;
            }
            Ok(())
        }
        Node::Text(value) => {
            out.push_str(value);
            Ok(())
        }
        Node::VariableRef(path) => {
            if let Some(value) = env.resolve(path) {
                write_value(value, out);
            }
            Ok(())
        }
        Node::For {
            iterable,
            binding,
            body,
        } => {
            let Some(Value::Array(items)) = env.resolve(iterable) else {
                return Err(TemplateError::UnresolvableIterator {
                    path: iterable.clone(),
                });
            };
            for item in items {
                env.push_binding(binding, item);
                let result = render_node(body, env, out);
                env.pop_binding();
                result?;
            }
            Ok(())
        }
        Node::IfElse {
            condition,
            then_body,
            else_body,
        } => {
            if eval_expr(condition, env).truthy() {
                render_node(then_body, env, out)
            } else {
                render_node(else_body, env, out)
            }
        }
        Node::StringLit(_)
        | Node::NumberLit(_)
        | Node::BoolLit(_)
        | Node::Equals(..)
        | Node::NotEquals(..)
        | Node::And(..)
        | Node::Or(..) => {
            if let Resolved::Found(value) = eval_expr(node, env) {
                write_value(&value, out);
            }
            Ok(())
        }
    }
}

/// Evaluate an expression-position node to a scalar value.
fn eval_expr(node: &Node, env: &Environment<'_>) -> Resolved {
    match node {
        Node::StringLit(value) => Resolved::Found(Value::String(value.clone())),
        Node::NumberLit(value) => match serde_json::Number::from_f64(*value) {
            Some(n) => Resolved::Found(Value::Number(n)),
            None => Resolved::Missing,
        },
        Node::BoolLit(value) => Resolved::Found(Value::Bool(*value)),
        Node::VariableRef(path) => match env.resolve(path) {
            Some(value) => Resolved::Found(value.clone()),
            None => Resolved::Missing,
        },
        Node::Equals(lhs, rhs) => Resolved::Found(Value::Bool(strict_eq(
            &eval_expr(lhs, env),
            &eval_expr(rhs, env),
        ))),
        Node::NotEquals(lhs, rhs) => Resolved::Found(Value::Bool(!strict_eq(
            &eval_expr(lhs, env),
            &eval_expr(rhs, env),
        ))),
        Node::And(lhs, rhs) => Resolved::Found(Value::Bool(
            eval_expr(lhs, env).truthy() && eval_expr(rhs, env).truthy(),
        )),
        Node::Or(lhs, rhs) => Resolved::Found(Value::Bool(
            eval_expr(lhs, env).truthy() || eval_expr(rhs, env).truthy(),
        )),
        // The parser never places these in expression position.
        Node::Block(_) | Node::Text(_) | Node::For { .. } | Node::IfElse { .. } => {
            Resolved::Missing
        }
    }
}

/// A value's textual contribution: strings as-is, null as nothing, scalars
/// and compound values via their JSON text.
fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Null => {}
        Value::String(s) => out.push_str(s),
        other => out.push_str(&other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resolve_in<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
        let env = Environment {
            frames: vec![Frame::Data(data)],
        };
        env.resolve(path)
    }

    #[test]
    fn resolves_dotted_paths_through_mappings() {
        let data = json!({"a": {"b": {"c": "x"}}});
        assert_eq!(resolve_in(&data, "a.b.c"), Some(&json!("x")));
        assert_eq!(resolve_in(&data, "a.b.missing"), None);
        assert_eq!(resolve_in(&data, "a.b.c.too_deep"), None);
    }

    #[test]
    fn numeric_segments_index_sequences() {
        let data = json!({"planets": [{"name": "Mercury"}, {"name": "Venus"}]});
        assert_eq!(resolve_in(&data, "planets.1.name"), Some(&json!("Venus")));
        assert_eq!(resolve_in(&data, "planets.9.name"), None);
        assert_eq!(resolve_in(&data, "planets.x"), None);
    }

    #[test]
    fn bindings_shadow_outer_frames() {
        let globals = json!({});
        let data = json!({"x": "outer", "inner": "bound"});
        let bound = json!("bound-value");
        let mut env = Environment::new(&globals, &data);
        env.push_binding("x", &bound);
        assert_eq!(env.resolve("x"), Some(&bound));
        env.pop_binding();
        assert_eq!(env.resolve("x"), Some(&json!("outer")));
    }

    #[test]
    fn binding_paths_descend_into_the_bound_value() {
        let globals = json!({});
        let data = json!({});
        let person = json!({"name": "Andrew", "hobbies": ["fitness", "beer"]});
        let mut env = Environment::new(&globals, &data);
        env.push_binding("p", &person);
        assert_eq!(env.resolve("p.name"), Some(&json!("Andrew")));
        assert_eq!(env.resolve("p.hobbies.0"), Some(&json!("fitness")));
        assert_eq!(env.resolve("q.name"), None);
    }

    #[test]
    fn truthiness_table() {
        assert!(!truthy(&json!(null)));
        assert!(!truthy(&json!(false)));
        assert!(!truthy(&json!(0)));
        assert!(!truthy(&json!(0.0)));
        assert!(!truthy(&json!("")));
        assert!(truthy(&json!(true)));
        assert!(truthy(&json!(1)));
        assert!(truthy(&json!("x")));
        assert!(truthy(&json!([])));
        assert!(truthy(&json!({})));
    }

    #[test]
    fn strict_equality_distinguishes_types() {
        let num = Resolved::Found(json!(42));
        let num_str = Resolved::Found(json!("42"));
        assert!(!strict_eq(&num, &num_str));
        assert!(strict_eq(&num, &Resolved::Found(json!(42.0))));
        assert!(strict_eq(
            &Resolved::Found(json!("hi")),
            &Resolved::Found(json!("hi"))
        ));
    }

    #[test]
    fn missing_compares_equal_only_to_missing() {
        // Two missing values compare equal here; the underlying contract
        // leaves this case open, so this test documents the choice rather
        // than a requirement.
        assert!(strict_eq(&Resolved::Missing, &Resolved::Missing));
        assert!(!strict_eq(&Resolved::Missing, &Resolved::Found(json!(null))));
        assert!(!strict_eq(&Resolved::Found(json!(0)), &Resolved::Missing));
    }

    #[test]
    fn write_value_forms() {
        let mut out = String::new();
        write_value(&json!("plain"), &mut out);
        write_value(&json!(null), &mut out);
        write_value(&json!(42), &mut out);
        write_value(&json!(true), &mut out);
        write_value(&json!([1, 2]), &mut out);
        assert_eq!(out, "plain42true[1,2]");
    }
}
