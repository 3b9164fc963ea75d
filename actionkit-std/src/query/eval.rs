use super::{CompareOp, Expr, Function, Literal};
use actionkit_core::{Event, FieldPath};
use serde_json::Value;
use std::cmp::Ordering;

pub(super) fn evaluate(expr: &Expr, event: &Event) -> bool {
    match expr {
        Expr::Compare { path, op, value } => match present(event, path) {
            Some(found) => compare(found, *op, value),
            None => false,
        },
        Expr::Exists(path) => present(event, path).is_some(),
        Expr::Missing(path) => present(event, path).is_none(),
        Expr::Call {
            function,
            path,
            pattern,
        } => match present(event, path).and_then(text) {
            Some(found) => match function {
                Function::Contains => found.contains(pattern.as_str()),
                Function::Match => glob(pattern, &found),
            },
            None => false,
        },
        Expr::Not(inner) => !evaluate(inner, event),
        Expr::And(left, right) => evaluate(left, event) && evaluate(right, event),
        Expr::Or(left, right) => evaluate(left, event) || evaluate(right, event),
    }
}

/// Null counts as absent.
fn present<'a>(event: &'a Event, path: &FieldPath) -> Option<&'a Value> {
    event.resolve(path).filter(|value| !value.is_null())
}

fn compare(found: &Value, op: CompareOp, literal: &Literal) -> bool {
    match op {
        CompareOp::Eq => equals(found, literal),
        CompareOp::Ne => !equals(found, literal),
        CompareOp::Lt => order(found, literal) == Some(Ordering::Less),
        CompareOp::Le => matches!(order(found, literal), Some(Ordering::Less | Ordering::Equal)),
        CompareOp::Gt => order(found, literal) == Some(Ordering::Greater),
        CompareOp::Ge => matches!(
            order(found, literal),
            Some(Ordering::Greater | Ordering::Equal)
        ),
    }
}

fn equals(found: &Value, literal: &Literal) -> bool {
    match (found, literal) {
        (Value::String(s), Literal::String(expected)) => s == expected,
        (Value::Number(_) | Value::Bool(_), Literal::String(expected)) => {
            text(found).is_some_and(|s| s == *expected)
        }
        (_, Literal::Number(expected)) => number(found) == Some(*expected),
        (Value::Bool(b), Literal::Bool(expected)) => b == expected,
        (Value::String(s), Literal::Bool(expected)) => s.parse::<bool>().ok() == Some(*expected),
        _ => false,
    }
}

fn order(found: &Value, literal: &Literal) -> Option<Ordering> {
    let expected = match literal {
        Literal::Number(n) => *n,
        Literal::String(s) => s.trim().parse().ok()?,
        Literal::Bool(_) => return None,
    };
    number(found)?.partial_cmp(&expected)
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// `*` matches any run of characters; everything else is literal.
fn glob(pattern: &str, input: &str) -> bool {
    let mut parts = pattern.split('*');
    let Some(head) = parts.next() else {
        return input.is_empty();
    };
    let Some(mut rest) = input.strip_prefix(head) else {
        return false;
    };
    let tail: Vec<&str> = parts.collect();
    let Some((last, middle)) = tail.split_last() else {
        // no `*` at all
        return rest.is_empty();
    };
    for part in middle {
        match rest.find(part) {
            Some(at) => rest = &rest[at + part.len()..],
            None => return false,
        }
    }
    rest.len() >= last.len() && rest.ends_with(last)
}

#[cfg(test)]
mod tests {
    use super::glob;

    #[test]
    fn test_glob() {
        assert!(glob("admin-*", "admin-42"));
        assert!(glob("*@example.com", "jane@example.com"));
        assert!(glob("*Order*", "Big Order Placed"));
        assert!(glob("a*b*c", "a-b-c"));
        assert!(glob("exact", "exact"));
        assert!(glob("*", ""));
        assert!(!glob("exact", "exactly"));
        assert!(!glob("admin-*", "user-1"));
        assert!(!glob("ab*ba", "aba"));
    }
}
