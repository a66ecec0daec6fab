//! Expression evaluation over parsed JSON bodies
//!
//! Paths descend arrays transparently: `trinkets.age` against an array of
//! objects yields the sequence of ages, and a comparison against a sequence
//! holds when any element satisfies it. A path that resolves to nothing
//! makes the whole comparison false; evaluation never errors.

use serde_json::Value;

use super::parser::{CmpOp, Expr, Literal, PathSegment};

pub fn eval(expr: &Expr, body: &Value) -> bool {
    match expr {
        Expr::Or(left, right) => eval(left, body) || eval(right, body),
        Expr::And(left, right) => eval(left, body) && eval(right, body),
        Expr::Not(inner) => !eval(inner, body),
        Expr::Cmp { path, op } => {
            let Some(value) = resolve(body, path) else {
                return false;
            };
            match op {
                None => !is_falsey(&value),
                Some((op, literal)) => compare(*op, &value, literal),
            }
        }
    }
}

/// Resolve a path, descending into arrays by mapping the remaining path
/// over their elements.
pub fn resolve(value: &Value, segments: &[PathSegment]) -> Option<Value> {
    let Some(segment) = segments.first() else {
        return Some(value.clone());
    };
    match (segment, value) {
        (PathSegment::Key(name), Value::Object(map)) => {
            map.get(name.as_str()).and_then(|v| resolve(v, &segments[1..]))
        }
        (PathSegment::Key(_), Value::Array(items)) => {
            let collected: Vec<Value> = items
                .iter()
                .filter_map(|item| resolve(item, segments))
                .collect();
            if collected.is_empty() {
                None
            } else {
                Some(Value::Array(collected))
            }
        }
        (PathSegment::Index(i), Value::Array(items)) => {
            items.get(*i).and_then(|v| resolve(v, &segments[1..]))
        }
        _ => None,
    }
}

pub fn is_falsey(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

fn compare(op: CmpOp, value: &Value, literal: &Literal) -> bool {
    // Sequence on the left: membership for `contains`, exists-semantics
    // for everything else.
    if let Value::Array(items) = value {
        return match op {
            CmpOp::Contains => items.iter().any(|item| scalar_eq(item, literal)),
            _ => items.iter().any(|item| compare(op, item, literal)),
        };
    }

    match op {
        CmpOp::Eq => scalar_eq(value, literal),
        CmpOp::Ne => !scalar_eq(value, literal),
        CmpOp::Lt | CmpOp::Le | CmpOp::Gt | CmpOp::Ge => ordered(op, value, literal),
        CmpOp::Contains => with_strings(value, literal, |s, needle| s.contains(needle)),
        CmpOp::StartsWith => with_strings(value, literal, |s, needle| s.starts_with(needle)),
        CmpOp::EndsWith => with_strings(value, literal, |s, needle| s.ends_with(needle)),
    }
}

fn scalar_eq(value: &Value, literal: &Literal) -> bool {
    match (value, literal) {
        (Value::Number(n), Literal::Number(x)) => n.as_f64() == Some(*x),
        (Value::String(s), Literal::Str(x)) => s == x,
        (Value::Bool(b), Literal::Bool(x)) => b == x,
        (Value::Null, Literal::Null) => true,
        _ => false,
    }
}

fn ordered(op: CmpOp, value: &Value, literal: &Literal) -> bool {
    let ordering = match (value, literal) {
        (Value::Number(n), Literal::Number(x)) => n.as_f64().and_then(|n| n.partial_cmp(x)),
        (Value::String(s), Literal::Str(x)) => Some(s.as_str().cmp(x.as_str())),
        _ => None,
    };
    let Some(ordering) = ordering else {
        return false;
    };
    match op {
        CmpOp::Lt => ordering.is_lt(),
        CmpOp::Le => ordering.is_le(),
        CmpOp::Gt => ordering.is_gt(),
        CmpOp::Ge => ordering.is_ge(),
        _ => false,
    }
}

/// Substring operators stringify a scalar literal, so `id contains 1`
/// matches `"a1"`.
fn with_strings(value: &Value, literal: &Literal, test: impl Fn(&str, &str) -> bool) -> bool {
    let Value::String(s) = value else {
        return false;
    };
    let needle = match literal {
        Literal::Str(x) => x.clone(),
        Literal::Number(x) => {
            if x.fract() == 0.0 {
                format!("{}", *x as i64)
            } else {
                format!("{x}")
            }
        }
        Literal::Bool(x) => x.to_string(),
        Literal::Null => return false,
    };
    test(s, &needle)
}

#[cfg(test)]
mod tests {
    use super::super::parser::parse_expr;
    use super::*;
    use serde_json::json;

    fn matches(expr: &str, body: &Value) -> bool {
        eval(&parse_expr(expr).unwrap(), body)
    }

    #[test]
    fn falsey_values() {
        for value in [
            json!(false),
            json!(0),
            json!(0.0),
            json!(""),
            json!([]),
            json!({}),
            json!(null),
        ] {
            assert!(is_falsey(&value), "expected falsey: {value}");
        }
        for value in [json!(true), json!(1), json!("x"), json!([0]), json!({"a": 0})] {
            assert!(!is_falsey(&value), "expected truthy: {value}");
        }
    }

    #[test]
    fn bare_path_is_truthiness() {
        let body = json!({"labels": ["one"], "empty": []});
        assert!(matches("labels", &body));
        assert!(!matches("empty", &body));
        assert!(!matches("missing", &body));
    }

    #[test]
    fn missing_path_makes_comparisons_false() {
        let body = json!({"id": "a1"});
        assert!(!matches("nope = 1", &body));
        assert!(!matches("nope != 1", &body));
        assert!(!matches("nope > 1", &body));
    }

    #[test]
    fn contains_stringifies_numeric_literals() {
        assert!(matches("id contains 1", &json!({"id": "a1"})));
        assert!(!matches("id contains 1", &json!({"id": "a2"})));
    }

    #[test]
    fn string_prefix_and_suffix() {
        let body = json!({"name": "widget-large"});
        assert!(matches("name startsWith widget", &body));
        assert!(matches("name endsWith large", &body));
        assert!(!matches("name startsWith large", &body));
    }

    #[test]
    fn numeric_comparisons_require_numbers() {
        assert!(matches("age > 5", &json!({"age": 6})));
        assert!(!matches("age > 5", &json!({"age": "6"})));
        assert!(matches("age <= 5", &json!({"age": 5})));
    }

    #[test]
    fn string_ordering() {
        assert!(matches("id < \"b\"", &json!({"id": "a1"})));
        assert!(!matches("id < \"a\"", &json!({"id": "a1"})));
    }

    #[test]
    fn boolean_and_null_literals() {
        assert!(matches("active = true", &json!({"active": true})));
        assert!(matches("meta = null", &json!({"meta": null})));
        assert!(matches("active != false", &json!({"active": true})));
    }

    #[test]
    fn and_or_not_combinators() {
        let body = json!({"id": "a1", "age": 7});
        assert!(matches("id contains a and age > 5", &body));
        assert!(matches("id contains z or age > 5", &body));
        assert!(!matches("not age > 5", &body));
        assert!(matches("not (id contains z)", &body));
    }

    #[test]
    fn sequence_membership() {
        let body = json!({"labels": ["one", "two"]});
        assert!(matches("labels contains one", &body));
        assert!(!matches("labels contains three", &body));
    }

    #[test]
    fn paths_descend_arrays_with_exists_semantics() {
        let body = json!({"trinkets": [{"age": 3}, {"age": 9}]});
        assert!(matches("trinkets.age > 5", &body));
        assert!(!matches("trinkets.age > 10", &body));
    }

    #[test]
    fn indexed_paths() {
        let body = json!({"items": [{"id": "x"}, {"id": "y"}]});
        assert!(matches("items[1].id = \"y\"", &body));
        assert!(!matches("items[5].id = \"y\"", &body));
    }

    #[test]
    fn negation_partitions_the_set() {
        let bodies = [
            json!({"id": "a1"}),
            json!({"id": "a2"}),
            json!({"id": "b1"}),
        ];
        let expr = "id contains 1";
        let negated = format!("not ({expr})");
        for body in &bodies {
            assert_ne!(matches(expr, body), matches(&negated, body));
        }
    }
}
