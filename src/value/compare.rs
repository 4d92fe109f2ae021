//! Value/exception normalization and comparison
//!
//! Two comparison flavours are in use across conformance suites:
//!
//! - [`Comparison::SameValue`]: `shouldBe`-style. NaN matches NaN, `-0` and
//!   `+0` are different values, types must agree.
//! - [`Comparison::Legacy`]: `TestCase`/`assertEquals`-style. NaN matches
//!   NaN, `-0 == +0`, types must agree, and an optional absolute tolerance
//!   absorbs floating-point rounding.
//!
//! In both, an exception is compared through its `"Kind: message"` string, so
//! an expected string can match a thrown exception.

use super::{Completion, Value};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// How expected and actual values are judged equal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    SameValue,
    Legacy,
}

/// Collapse a probe completion into a single value. Never fails: a thrown
/// exception becomes the value.
pub fn normalize(completion: Completion) -> Value {
    match completion {
        Ok(value) => value,
        Err(exception) => Value::Exception(exception),
    }
}

fn comparable(value: &Value) -> Cow<'_, Value> {
    match value {
        Value::Exception(e) => Cow::Owned(Value::String(e.to_string())),
        other => Cow::Borrowed(other),
    }
}

/// SameValue equality (`Object.is` semantics)
pub fn same_value(a: &Value, b: &Value) -> bool {
    values_match(a, b, Comparison::SameValue, None)
}

/// Compare an expected value against an actual one
pub fn values_match(
    expected: &Value,
    actual: &Value,
    comparison: Comparison,
    tolerance: Option<f64>,
) -> bool {
    let expected = comparable(expected);
    let actual = comparable(actual);

    if expected.type_of() != actual.type_of() {
        return false;
    }

    match (expected.as_ref(), actual.as_ref()) {
        (Value::Undefined, Value::Undefined) => true,
        (Value::Null, Value::Null) => true,
        (Value::Boolean(a), Value::Boolean(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Object(a), Value::Object(b)) => a.same_object(b),
        (Value::Number(a), Value::Number(b)) => numbers_match(*a, *b, comparison, tolerance),
        _ => false,
    }
}

fn numbers_match(expected: f64, actual: f64, comparison: Comparison, tolerance: Option<f64>) -> bool {
    if expected.is_nan() || actual.is_nan() {
        return expected.is_nan() && actual.is_nan();
    }
    match comparison {
        Comparison::SameValue => {
            if expected == 0.0 && actual == 0.0 {
                expected.is_sign_negative() == actual.is_sign_negative()
            } else {
                expected == actual
            }
        }
        Comparison::Legacy => {
            if expected == actual {
                return true;
            }
            match tolerance {
                Some(eps) if expected.is_finite() && actual.is_finite() => {
                    (actual - expected).abs() < eps
                }
                _ => false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Exception, ObjectRef};

    #[test]
    fn test_nan_matches_nan() {
        let nan = Value::Number(f64::NAN);
        assert!(values_match(&nan, &nan, Comparison::SameValue, None));
        assert!(values_match(&nan, &nan, Comparison::Legacy, None));
        assert!(!values_match(&nan, &Value::Number(0.0), Comparison::Legacy, None));
    }

    #[test]
    fn test_negative_zero() {
        let neg = Value::Number(-0.0);
        let pos = Value::Number(0.0);
        assert!(!values_match(&neg, &pos, Comparison::SameValue, None));
        assert!(values_match(&neg, &neg, Comparison::SameValue, None));
        assert!(values_match(&neg, &pos, Comparison::Legacy, None));
    }

    #[test]
    fn test_type_mismatch_fails() {
        assert!(!values_match(&Value::from("1"), &Value::from(1.0), Comparison::Legacy, None));
        assert!(!values_match(&Value::Null, &Value::Undefined, Comparison::Legacy, None));
        let obj = Value::from(ObjectRef::new("Object", Vec::<(String, Value)>::new()));
        assert!(!values_match(&Value::Null, &obj, Comparison::SameValue, None));
    }

    #[test]
    fn test_tolerance_only_in_legacy() {
        let a = Value::from(0.1 + 0.2);
        let b = Value::from(0.3);
        assert!(!values_match(&b, &a, Comparison::Legacy, None));
        assert!(values_match(&b, &a, Comparison::Legacy, Some(1e-7)));
        assert!(!values_match(&b, &a, Comparison::SameValue, Some(1e-7)));
    }

    #[test]
    fn test_exception_compares_as_string() {
        let thrown = normalize(Err(Exception::type_error("x is null")));
        let expected = Value::from("TypeError: x is null");
        assert!(values_match(&expected, &thrown, Comparison::SameValue, None));
        let other = Value::from("RangeError: x is null");
        assert!(!values_match(&other, &thrown, Comparison::SameValue, None));
    }

    #[test]
    fn test_objects_compare_by_identity() {
        let node = ObjectRef::new("Text", [("nodeType", 3)]);
        let same = Value::from(node.clone());
        let twin = Value::from(ObjectRef::new("Text", [("nodeType", 3)]));
        assert!(same_value(&Value::from(node), &same));
        assert!(!same_value(&same, &twin));
    }
}
