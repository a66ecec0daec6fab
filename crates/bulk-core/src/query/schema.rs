//! Static type checking of filter expressions against a JSON Schema
//!
//! Best-effort and silent on anything it cannot see: an unreachable,
//! error-status, or unparsable schema produces no warnings at all. When a
//! comparison's declared type and literal type both resolve and disagree,
//! the check emits a `WARN: cannot compare <t1> with <t2>` line.

use serde_json::Value;
use tracing::debug;

use crate::transport::{Method, Transport};

use super::parser::{Expr, Literal, PathSegment};

/// Fetch a schema, tolerating every failure mode by returning `None`.
pub fn fetch_schema(transport: &dyn Transport, url: &str) -> Option<Value> {
    let response = match transport.send(Method::Get, url, None) {
        Ok(response) => response,
        Err(e) => {
            debug!("schema fetch failed for {url}: {e}");
            return None;
        }
    };
    if response.status >= 400 {
        debug!("schema {url} returned HTTP {}", response.status);
        return None;
    }
    response.body
}

/// Collect warnings for every comparison whose operand types disagree.
pub fn check(expr: &Expr, schema: &Value) -> Vec<String> {
    let mut warnings = Vec::new();
    walk(expr, schema, &mut warnings);
    warnings
}

fn walk(expr: &Expr, schema: &Value, warnings: &mut Vec<String>) {
    match expr {
        Expr::Or(left, right) | Expr::And(left, right) => {
            walk(left, schema, warnings);
            walk(right, schema, warnings);
        }
        Expr::Not(inner) => walk(inner, schema, warnings),
        Expr::Cmp { path, op } => {
            let Some((_, literal)) = op else {
                return;
            };
            let Some(declared) = declared_type(schema, path) else {
                return;
            };
            let operand = literal_type(literal);
            if !compatible(&declared, operand) {
                warnings.push(format!("WARN: cannot compare {declared} with {operand}"));
            }
        }
    }
}

/// Walk a path through `properties`/`items`, descending arrays
/// transparently, and return the declared type of the final node.
fn declared_type(schema: &Value, path: &[PathSegment]) -> Option<String> {
    let mut node = schema;
    for segment in path {
        node = descend_arrays(node);
        match segment {
            PathSegment::Key(name) => {
                node = node.get("properties")?.get(name.as_str())?;
            }
            PathSegment::Index(_) => {
                node = node.get("items")?;
            }
        }
    }
    // Comparisons against a sequence apply to its elements.
    node = descend_arrays(node);
    node.get("type")?.as_str().map(str::to_string)
}

fn descend_arrays(mut node: &Value) -> &Value {
    while node.get("type").and_then(Value::as_str) == Some("array") {
        match node.get("items") {
            Some(items) => node = items,
            None => break,
        }
    }
    node
}

fn literal_type(literal: &Literal) -> &'static str {
    match literal {
        Literal::Number(_) => "number",
        Literal::Str(_) => "string",
        Literal::Bool(_) => "boolean",
        Literal::Null => "null",
    }
}

fn compatible(declared: &str, literal: &'static str) -> bool {
    match declared {
        "number" | "integer" => literal == "number",
        "string" => literal == "string",
        "boolean" => literal == "boolean",
        "null" => literal == "null",
        // Structured or unknown declared types: nothing useful to say.
        _ => true,
    }
}
