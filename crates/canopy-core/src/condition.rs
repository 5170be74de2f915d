//! Condition evaluation and value ordering shared by collections and
//! conditional nodes.

use canopy_dsl::{Condition, Predicate};
use serde_json::Value;
use std::cmp::Ordering;

use crate::expression::{has_markers, resolve, resolve_value};
use crate::scope::DataScope;

/// Evaluate a condition against a scope.
///
/// A condition whose key path or expected value cannot be resolved is not
/// satisfied (except `isNotSet`, which is satisfied by absence).
pub fn evaluate_condition(condition: &Condition, scope: &DataScope) -> bool {
    let actual = resolve_value(&condition.key_path, scope);

    match condition.predicate {
        Predicate::IsSet => actual.map_or(false, |v| !v.is_null()),
        Predicate::IsNotSet => actual.map_or(true, |v| v.is_null()),
        Predicate::IsTrue => matches!(actual, Some(Value::Bool(true))),
        Predicate::IsFalse => matches!(actual, Some(Value::Bool(false))),
        Predicate::Equals => compare_with_expected(condition, scope, actual)
            .map_or(false, |ord| ord == Ordering::Equal),
        Predicate::DoesNotEqual => compare_with_expected(condition, scope, actual)
            .map_or(true, |ord| ord != Ordering::Equal),
        Predicate::IsGreaterThan => compare_with_expected(condition, scope, actual)
            .map_or(false, |ord| ord == Ordering::Greater),
        Predicate::IsLessThan => compare_with_expected(condition, scope, actual)
            .map_or(false, |ord| ord == Ordering::Less),
    }
}

/// Whether every condition holds; an empty list always holds
pub fn evaluate_all(conditions: &[Condition], scope: &DataScope) -> bool {
    conditions.iter().all(|c| evaluate_condition(c, scope))
}

fn compare_with_expected(condition: &Condition, scope: &DataScope, actual: Option<Value>) -> Option<Ordering> {
    let actual = actual?;
    let expected = expected_value(condition.value.as_ref()?, scope)?;
    compare_scalars(&actual, &expected)
}

/// String expected values may carry markers; resolve them first
fn expected_value(value: &Value, scope: &DataScope) -> Option<Value> {
    match value {
        Value::String(s) if has_markers(s) => resolve(s, scope).map(Value::String),
        other => Some(other.clone()),
    }
}

/// Compare two scalars of compatible kinds.
///
/// Numbers compare numerically, and a numeric string compares as a number
/// against a number. `None` when the kinds cannot be compared.
pub fn compare_scalars(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::Number(x), Value::String(s)) => x.as_f64()?.partial_cmp(&s.trim().parse::<f64>().ok()?),
        (Value::String(s), Value::Number(y)) => s.trim().parse::<f64>().ok()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ if a == b => Some(Ordering::Equal),
        _ => None,
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over optional values used for sorting.
///
/// Missing values sort first, then by kind (null < bool < number < string
/// < array < object), then by value within a kind.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => {
            let rank = type_rank(a).cmp(&type_rank(b));
            if rank != Ordering::Equal {
                return rank;
            }
            match (a, b) {
                (Value::Number(_), Value::Number(_))
                | (Value::String(_), Value::String(_))
                | (Value::Bool(_), Value::Bool(_)) => compare_scalars(a, b).unwrap_or(Ordering::Equal),
                (Value::Array(x), Value::Array(y)) => x.len().cmp(&y.len()),
                (Value::Object(x), Value::Object(y)) => x.len().cmp(&y.len()),
                _ => Ordering::Equal,
            }
        }
    }
}
