//! Filter and projection language for `list`
//!
//! `-m <expr>` filters files by their body content; `-f <path>` selects a
//! fragment of each body for display. Both share the path grammar. When a
//! file advertises a JSON Schema, the filter is statically checked against
//! it and type mismatches surface as `WARN:` lines.

mod eval;
mod lexer;
mod parser;
mod schema;

pub use parser::{CmpOp, Expr, Literal, PathSegment};
pub use schema::fetch_schema;

use serde_json::Value;

use crate::Result;

/// A parsed `-m` filter. An empty expression matches everything.
#[derive(Debug, Clone)]
pub struct Filter {
    expr: Option<Expr>,
}

impl Filter {
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(Self { expr: None });
        }
        Ok(Self {
            expr: Some(parser::parse_expr(trimmed)?),
        })
    }

    /// Whether this filter can exclude anything.
    pub fn is_selective(&self) -> bool {
        self.expr.is_some()
    }

    pub fn matches(&self, body: &Value) -> bool {
        match &self.expr {
            None => true,
            Some(expr) => eval::eval(expr, body),
        }
    }

    /// Static type-check against a schema document.
    pub fn schema_warnings(&self, schema: &Value) -> Vec<String> {
        match &self.expr {
            None => Vec::new(),
            Some(expr) => schema::check(expr, schema),
        }
    }
}

/// A parsed `-f` projection path.
#[derive(Debug, Clone)]
pub struct Projection {
    segments: Vec<PathSegment>,
}

impl Projection {
    pub fn parse(input: &str) -> Result<Self> {
        Ok(Self {
            segments: parser::parse_path(input.trim())?,
        })
    }

    /// Select the projected fragment, `None` when the path is absent.
    pub fn apply(&self, body: &Value) -> Option<Value> {
        eval::resolve(body, &self.segments)
    }
}
