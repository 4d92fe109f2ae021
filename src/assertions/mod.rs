//! Assertion primitives
//!
//! Three families live side by side, all methods on [`SuiteContext`]:
//!
//! | Family | Primitives | Comparison |
//! |--------|-----------|------------|
//! | `js-test` | `should_be`, `should_throw`, `should_be_true`, ... | SameValue |
//! | DOM / JsUnit | `assert_equals`, `assert_size`, `assert_same`, ... | Legacy |
//! | ECMA shell | `record_case`, `report_compare`, `report_match` | Legacy |
//!
//! Every primitive appends exactly one [`TestCase`] and touches nothing else.
//! Exceptions thrown by a probe are captured here and become the actual
//! value; nothing propagates out of a primitive. The returned `bool` is the
//! verdict at append time.

use crate::error::Error;
use crate::host::Probe;
use crate::suite::SuiteContext;
use crate::testcase::{Append, Origin, TestCase};
use crate::value::{dom_codes, normalize, same_value, values_match, Comparison, Value};
use regex::Regex;

impl SuiteContext {
    fn push(&mut self, case: TestCase) -> bool {
        let passed = case.passed;
        match self.append(case) {
            Append::Stored(_) => passed,
            Append::Rejected => false,
        }
    }

    fn decided(
        &mut self,
        description: impl Into<String>,
        expected: Value,
        actual: Value,
        passed: bool,
        message: String,
    ) -> bool {
        let section = self.section().to_string();
        let reason = if passed { String::new() } else { format!("{} ", message) };
        self.push(TestCase::decided(section, description, expected, actual, passed, reason).with_message(message))
    }

    fn legacy(&mut self, section: String, description: String, expected: Value, actual: Value) -> TestCase {
        TestCase::compared(
            section,
            description,
            expected,
            actual,
            Comparison::Legacy,
            self.config().numeric_tolerance,
        )
    }

    // -----------------------------------------------------------------------
    // js-test family
    // -----------------------------------------------------------------------

    /// Evaluate both sides and compare them with SameValue semantics
    pub fn should_be(&mut self, probe: impl Probe, expected: impl Probe) -> bool {
        let description = probe.describe();
        let expected_text = expected.describe();
        let actual = probe.evaluate(self.host_mut());
        let expected_value = normalize(expected.evaluate(self.host_mut()));
        let section = self.section().to_string();

        let case = match actual {
            Err(exception) => {
                let message = format!(
                    "{} should be {}. Threw exception {}",
                    description, expected_text, exception
                );
                let reason = format!("Threw exception {}. ", exception);
                TestCase::decided(section, description, expected_value, Value::Exception(exception), false, reason)
                    .with_message(message)
            }
            Ok(actual) => {
                let mut case = TestCase::compared(
                    section,
                    description.clone(),
                    expected_value,
                    actual,
                    Comparison::SameValue,
                    None,
                );
                case.message = if case.passed {
                    format!("{} is {}", description, expected_text)
                } else if case.expected.type_of() == case.actual.type_of() {
                    format!(
                        "{} should be {}. Was {}.",
                        description,
                        expected_text,
                        case.actual.stringify()
                    )
                } else {
                    format!(
                        "{} should be {} (of type {}). Was {} (of type {}).",
                        description,
                        expected_text,
                        case.expected.type_of(),
                        case.actual.stringify(),
                        case.actual.type_of()
                    )
                };
                case
            }
        };
        self.push(case)
    }

    /// Pass when the probe's value differs (SameValue) from `unexpected`
    pub fn should_not_be(&mut self, probe: impl Probe, unexpected: impl Probe) -> bool {
        let description = probe.describe();
        let unexpected_text = unexpected.describe();
        let actual = probe.evaluate(self.host_mut());
        let unexpected_value = normalize(unexpected.evaluate(self.host_mut()));

        match actual {
            Err(exception) => {
                let message = format!(
                    "{} should not be {}. Threw exception {}",
                    description, unexpected_text, exception
                );
                self.decided(description, unexpected_value, Value::Exception(exception), false, message)
            }
            Ok(actual) => {
                let passed = !same_value(&unexpected_value, &actual);
                let message = if passed {
                    format!("{} is not {}", description, unexpected_text)
                } else {
                    format!("{} should not be {}.", description, unexpected_text)
                };
                self.decided(description, unexpected_value, actual, passed, message)
            }
        }
    }

    pub fn should_be_true(&mut self, probe: impl Probe) -> bool {
        self.should_be(probe, Value::Boolean(true))
    }

    pub fn should_be_false(&mut self, probe: impl Probe) -> bool {
        self.should_be(probe, Value::Boolean(false))
    }

    pub fn should_be_null(&mut self, probe: impl Probe) -> bool {
        self.should_be(probe, Value::Null)
    }

    pub fn should_be_undefined(&mut self, probe: impl Probe) -> bool {
        self.should_be(probe, Value::Undefined)
    }

    pub fn should_be_nan(&mut self, probe: impl Probe) -> bool {
        self.should_be(probe, Value::Number(f64::NAN))
    }

    /// Positive zero only; `-0` fails
    pub fn should_be_zero(&mut self, probe: impl Probe) -> bool {
        self.should_be(probe, Value::Number(0.0))
    }

    pub fn should_be_equal_to_string(&mut self, probe: impl Probe, expected: &str) -> bool {
        self.should_be(probe, Value::from(expected))
    }

    /// Expect the probe to throw. With `expected`, the thrown exception's
    /// string form must equal the string form of the evaluated expectation;
    /// without it, any exception passes.
    pub fn should_throw(&mut self, probe: impl Probe, expected: Option<&str>) -> bool {
        let description = probe.describe();
        let actual = probe.evaluate(self.host_mut());
        let expected_value = match expected {
            Some(source) => Some(normalize(self.host_mut().evaluate(source))),
            None => None,
        };
        let expected_text = expected_value
            .as_ref()
            .map(|v| v.to_js_string())
            .unwrap_or_else(|| "an exception".to_string());
        let expected_case_value = Value::String(expected_text.clone());

        match actual {
            Err(exception) => {
                let thrown = exception.to_string();
                let passed = expected_value.is_none() || thrown == expected_text;
                let message = if passed {
                    format!("{} threw exception {}.", description, thrown)
                } else {
                    format!(
                        "{} should throw {}. Threw exception {}.",
                        description, expected_text, thrown
                    )
                };
                self.decided(description, expected_case_value, Value::Exception(exception), passed, message)
            }
            Ok(value) => {
                let message = format!(
                    "{} should throw {}. Was {}.",
                    description,
                    expected_text,
                    value.stringify()
                );
                self.decided(description, expected_case_value, value, false, message)
            }
        }
    }

    pub fn should_not_throw(&mut self, probe: impl Probe) -> bool {
        let description = probe.describe();
        match probe.evaluate(self.host_mut()) {
            Ok(value) => {
                let message = format!("{} did not throw exception.", description);
                self.decided(description, Value::from("no exception"), value, true, message)
            }
            Err(exception) => {
                let message = format!(
                    "{} should not throw exception. Threw exception {}.",
                    description, exception
                );
                self.decided(description, Value::from("no exception"), Value::Exception(exception), false, message)
            }
        }
    }

    /// Record a pass with a free-form message (`testPassed`)
    pub fn test_passed(&mut self, message: impl Into<String>) -> bool {
        let message = message.into();
        self.decided(message.clone(), Value::Boolean(true), Value::Boolean(true), true, message)
    }

    /// Record a failure with a free-form message (`testFailed`)
    pub fn test_failed(&mut self, message: impl Into<String>) -> bool {
        let message = message.into();
        self.decided(message.clone(), Value::Boolean(true), Value::Boolean(false), false, message)
    }

    /// Record an outcome produced in another context (a worker)
    pub fn record_remote(&mut self, origin: Origin, passed: bool, message: impl Into<String>) -> bool {
        let message = message.into();
        let section = self.section().to_string();
        let reason = if passed { String::new() } else { format!("{} ", message) };
        let case = TestCase::decided(
            section,
            message.clone(),
            Value::Boolean(true),
            Value::Boolean(passed),
            passed,
            reason,
        )
        .with_message(message)
        .with_origin(origin);
        self.push(case)
    }

    // -----------------------------------------------------------------------
    // DOM / JsUnit family
    // -----------------------------------------------------------------------

    pub fn assert_equals(&mut self, label: &str, expected: impl Into<Value>, actual: impl Into<Value>) -> bool {
        let section = self.section().to_string();
        let mut case = self.legacy(section, label.to_string(), expected.into(), actual.into());
        case.message = if case.passed {
            label.to_string()
        } else {
            format!(
                "{}: expected {} but was {}",
                label,
                case.expected.stringify(),
                case.actual.stringify()
            )
        };
        self.push(case)
    }

    pub fn assert_true(&mut self, label: &str, actual: impl Into<Value>) -> bool {
        self.assert_equals(label, true, actual)
    }

    pub fn assert_false(&mut self, label: &str, actual: impl Into<Value>) -> bool {
        self.assert_equals(label, false, actual)
    }

    pub fn assert_null(&mut self, label: &str, actual: impl Into<Value>) -> bool {
        self.assert_equals(label, Value::Null, actual)
    }

    pub fn assert_not_null(&mut self, label: &str, actual: impl Into<Value>) -> bool {
        let actual = actual.into();
        let passed = !actual.is_null();
        let message = if passed {
            label.to_string()
        } else {
            format!("{}: expected a non-null value", label)
        };
        self.decided(label, Value::from("not null"), actual, passed, message)
    }

    /// Reference identity for objects, SameValue for primitives
    pub fn assert_same(&mut self, label: &str, expected: impl Into<Value>, actual: impl Into<Value>) -> bool {
        let (expected, actual) = (expected.into(), actual.into());
        let passed = same_value(&expected, &actual);
        let message = if passed {
            label.to_string()
        } else {
            format!("{}: expected the same object as {} but was {}", label, expected, actual)
        };
        self.decided(label, expected, actual, passed, message)
    }

    /// Check the `length` projection of a collection
    pub fn assert_size(&mut self, label: &str, expected: usize, collection: impl Into<Value>) -> bool {
        let collection = collection.into();
        let length = collection.project("length");
        let expected_value = Value::Number(expected as f64);
        let (passed, message) = match length.as_number() {
            Some(n) if n == expected as f64 => (true, label.to_string()),
            Some(n) => (false, format!("{}: expected size {} but was {}", label, expected, Value::Number(n))),
            None => (false, format!("{}: {} is not a collection", label, collection)),
        };
        self.decided(label, expected_value, length, passed, message)
    }

    pub fn assert_equals_ignoring_case(&mut self, label: &str, expected: &str, actual: impl Into<Value>) -> bool {
        let actual = actual.into();
        let passed = match &actual {
            Value::String(s) => s.to_lowercase() == expected.to_lowercase(),
            _ => false,
        };
        let message = if passed {
            label.to_string()
        } else {
            format!("{}: expected {} (ignoring case) but was {}", label, expected, actual.stringify())
        };
        self.decided(label, Value::from(expected), actual, passed, message)
    }

    /// Ordered element-wise comparison of a collection
    pub fn assert_equals_collection(&mut self, label: &str, expected: &[Value], actual: impl Into<Value>) -> bool {
        let tolerance = self.config().numeric_tolerance;
        let actual = actual.into();
        let items = collection_items(&actual);
        let passed = match &items {
            Some(items) => {
                items.len() == expected.len()
                    && expected
                        .iter()
                        .zip(items.iter())
                        .all(|(e, a)| values_match(e, a, Comparison::Legacy, tolerance))
            }
            None => false,
        };
        self.collection_case(label, expected, &actual, items, passed, "")
    }

    /// Unordered (multiset) comparison of a collection
    pub fn assert_equals_unordered(&mut self, label: &str, expected: &[Value], actual: impl Into<Value>) -> bool {
        let tolerance = self.config().numeric_tolerance;
        let actual = actual.into();
        let items = collection_items(&actual);
        let passed = match &items {
            Some(items) if items.len() == expected.len() => {
                let mut unmatched: Vec<&Value> = items.iter().collect();
                expected.iter().all(|e| {
                    match unmatched
                        .iter()
                        .position(|a| values_match(e, a, Comparison::Legacy, tolerance))
                    {
                        Some(i) => {
                            unmatched.swap_remove(i);
                            true
                        }
                        None => false,
                    }
                })
            }
            _ => false,
        };
        self.collection_case(label, expected, &actual, items, passed, " (any order)")
    }

    fn collection_case(
        &mut self,
        label: &str,
        expected: &[Value],
        actual: &Value,
        items: Option<Vec<Value>>,
        passed: bool,
        qualifier: &str,
    ) -> bool {
        let expected_text = render_list(expected);
        let actual_text = match &items {
            Some(items) => render_list(items),
            None => actual.to_js_string(),
        };
        let message = if passed {
            label.to_string()
        } else {
            format!("{}: expected {}{} but was {}", label, expected_text, qualifier, actual_text)
        };
        self.decided(label, Value::String(expected_text), Value::String(actual_text), passed, message)
    }

    /// Expect the probe to throw an exception carrying the given legacy code
    pub fn assert_throws_code(&mut self, label: &str, code: u16, probe: impl Probe) -> bool {
        let code_name = dom_codes::name(code).unwrap_or("UNKNOWN_ERR");
        let expected = Value::from(format!("{} ({})", code_name, code));
        match probe.evaluate(self.host_mut()) {
            Err(exception) => match exception.code {
                Some(thrown) if thrown == code => {
                    self.decided(label, expected, Value::Exception(exception), true, label.to_string())
                }
                thrown => {
                    let message = match thrown {
                        Some(c) => format!("{}: expected {} but exception code was {}", label, expected, c),
                        None => format!("{}: expected {} but threw {} without a code", label, expected, exception),
                    };
                    self.decided(label, expected, Value::Exception(exception), false, message)
                }
            },
            Ok(value) => {
                let message = format!("{}: expected {} to be thrown", label, expected);
                self.decided(label, expected, value, false, message)
            }
        }
    }

    // -----------------------------------------------------------------------
    // ECMA shell family
    // -----------------------------------------------------------------------

    /// `new TestCase(section, description, expected, actual)`
    pub fn record_case(
        &mut self,
        section: &str,
        description: &str,
        expected: impl Into<Value>,
        actual: impl Into<Value>,
    ) -> bool {
        let case = self.legacy(section.to_string(), description.to_string(), expected.into(), actual.into());
        self.push(case)
    }

    /// `reportCompare(expected, actual, description)` in the current section
    pub fn report_compare(&mut self, expected: impl Into<Value>, actual: impl Into<Value>, description: &str) -> bool {
        let section = self.section().to_string();
        self.record_case(&section, description, expected, actual)
    }

    /// `reportMatch(pattern, actual, description)`: the actual value's string
    /// form must match the regular expression. An invalid pattern is a
    /// failed case, not an error.
    pub fn report_match(&mut self, pattern: &str, actual: impl Into<Value>, description: &str) -> bool {
        let actual = actual.into();
        let expected = Value::from(format!("/{}/", pattern));
        match Regex::new(pattern) {
            Ok(re) => {
                let passed = re.is_match(&actual.to_js_string());
                let message = if passed {
                    format!("{} matches {}", description, expected)
                } else {
                    format!("{}: {} does not match {}", description, actual.stringify(), expected)
                };
                self.decided(description, expected, actual, passed, message)
            }
            Err(e) => {
                let message = format!("{}: {}", description, Error::invalid_pattern(pattern, e.to_string()));
                self.decided(description, expected, actual, false, message)
            }
        }
    }
}

fn collection_items(value: &Value) -> Option<Vec<Value>> {
    match value {
        Value::Object(obj) => Some(obj.items().to_vec()),
        _ => None,
    }
}

fn render_list(items: &[Value]) -> String {
    let inner: Vec<String> = items.iter().map(Value::stringify).collect();
    format!("[{}]", inner.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{thunk, ExpressionHost};
    use crate::value::{Exception, ObjectRef};

    fn ctx() -> SuiteContext {
        let mut host = ExpressionHost::new();
        host.define("s", "Hello");
        SuiteContext::new("unit", host)
    }

    fn last(ctx: &SuiteContext) -> &TestCase {
        ctx.cases().last().unwrap()
    }

    #[test]
    fn test_should_be_pass_and_fail() {
        let mut ctx = ctx();
        assert!(ctx.should_be("1+1", "2"));
        assert_eq!(last(&ctx).message, "1+1 is 2");
        assert!(!ctx.should_be("1+1", "3"));
        let case = last(&ctx);
        assert_eq!(case.actual.as_number(), Some(2.0));
        assert_eq!(case.expected.as_number(), Some(3.0));
        assert_eq!(case.message, "1+1 should be 3. Was 2.");
        assert_eq!(ctx.cases().len(), 2);
    }

    #[test]
    fn test_should_be_type_mismatch_message() {
        let mut ctx = ctx();
        assert!(!ctx.should_be("'2'", "2"));
        assert_eq!(last(&ctx).message, "'2' should be 2 (of type number). Was \"2\" (of type string).");
    }

    #[test]
    fn test_should_be_nan_and_negative_zero() {
        let mut ctx = ctx();
        assert!(ctx.should_be("0/0", "NaN"));
        assert!(ctx.should_be_nan("0/0"));
        assert!(!ctx.should_be_zero("-0"));
        assert!(ctx.should_be("-0", "-0"));
    }

    #[test]
    fn test_should_be_captures_probe_exception() {
        let mut ctx = ctx();
        assert!(!ctx.should_be("null.x", "1"));
        let case = last(&ctx);
        assert!(case.actual.is_exception());
        assert!(case.message.contains("Threw exception TypeError"));
    }

    #[test]
    fn test_should_throw() {
        let mut ctx = ctx();
        assert!(ctx.should_throw("null.x", None));
        assert!(!ctx.should_throw("1", None));
        assert_eq!(last(&ctx).message, "1 should throw an exception. Was 1.");
        assert!(ctx.should_throw("nope", Some("'ReferenceError: \\'nope\\' is not defined'")));
        assert!(!ctx.should_throw("null.x", Some("'RangeError: x'")));
        assert_eq!(ctx.cases().len(), 4);
    }

    #[test]
    fn test_should_not_throw() {
        let mut ctx = ctx();
        assert!(ctx.should_not_throw("1"));
        assert!(!ctx.should_not_throw("undefined.length"));
    }

    #[test]
    fn test_should_not_be_and_helpers() {
        let mut ctx = ctx();
        assert!(ctx.should_not_be("1", "2"));
        assert!(!ctx.should_not_be("1", "1"));
        assert!(ctx.should_be_true("1 === 1"));
        assert!(ctx.should_be_false("1 === 2"));
        assert!(ctx.should_be_null("null"));
        assert!(ctx.should_be_undefined("undefined"));
        assert!(ctx.should_be_equal_to_string("s", "Hello"));
    }

    #[test]
    fn test_assert_equals_family() {
        let mut ctx = ctx();
        assert!(ctx.assert_equals("nodeName", "P", "P"));
        assert!(ctx.assert_equals("sum", 0.0, -0.0));
        assert!(!ctx.assert_equals("value", "a", "b"));
        assert_eq!(last(&ctx).message, "value: expected \"a\" but was \"b\"");
        assert!(ctx.assert_true("ok", true));
        assert!(ctx.assert_false("not ok", false));
        assert!(ctx.assert_null("parent", Value::Null));
        assert!(!ctx.assert_null("parent", Value::Undefined));
        assert!(ctx.assert_not_null("doc", "x"));
        assert!(!ctx.assert_not_null("doc", Value::Null));
    }

    #[test]
    fn test_labels_are_not_keys() {
        let mut ctx = ctx();
        ctx.assert_equals("same", 1, 1);
        ctx.assert_equals("same", 1, 2);
        assert_eq!(ctx.cases().len(), 2);
        assert!(ctx.cases().get(0).unwrap().passed);
        assert!(!ctx.cases().get(1).unwrap().passed);
    }

    #[test]
    fn test_assert_size() {
        let mut ctx = ctx();
        let list = ObjectRef::collection("NodeList", vec![Value::Null, Value::Null, Value::Null]);
        assert!(ctx.assert_size("children", 3, list.clone()));
        assert!(!ctx.assert_size("children", 2, list));
        assert_eq!(last(&ctx).message, "children: expected size 2 but was 3");
        assert!(!ctx.assert_size("children", 0, 5.0));
    }

    #[test]
    fn test_assert_same_identity() {
        let mut ctx = ctx();
        let node = ObjectRef::new("Element", [("tagName", "EM")]);
        let twin = ObjectRef::new("Element", [("tagName", "EM")]);
        assert!(ctx.assert_same("firstChild", node.clone(), node.clone()));
        assert!(!ctx.assert_same("firstChild", node, twin));
    }

    #[test]
    fn test_collections() {
        let mut ctx = ctx();
        let names = ObjectRef::collection("NodeList", vec!["em".into(), "strong".into()]);
        let expected = [Value::from("em"), Value::from("strong")];
        let reversed = [Value::from("strong"), Value::from("em")];
        assert!(ctx.assert_equals_collection("names", &expected, names.clone()));
        assert!(!ctx.assert_equals_collection("names", &reversed, names.clone()));
        assert_eq!(last(&ctx).message, "names: expected [\"strong\", \"em\"] but was [\"em\", \"strong\"]");
        assert!(ctx.assert_equals_unordered("names", &reversed, names.clone()));
        assert!(!ctx.assert_equals_unordered("names", &[Value::from("em")], names));
        assert!(ctx.assert_equals_ignoring_case("tag", "div", "DIV"));
        assert!(!ctx.assert_equals_ignoring_case("tag", "div", 1));
    }

    #[test]
    fn test_assert_throws_code() {
        let mut ctx = ctx();
        assert!(ctx.assert_throws_code("removeChild", dom_codes::NOT_FOUND_ERR,
            thunk("doc.removeChild(x)", |_| Err(Exception::dom(dom_codes::NOT_FOUND_ERR)))));
        assert!(!ctx.assert_throws_code("removeChild", dom_codes::NOT_FOUND_ERR,
            thunk("doc.removeChild(x)", |_| Err(Exception::dom(dom_codes::HIERARCHY_REQUEST_ERR)))));
        assert!(last(&ctx).message.ends_with("exception code was 3"));
        assert!(!ctx.assert_throws_code("removeChild", dom_codes::NOT_FOUND_ERR, "1"));
        assert!(!ctx.assert_throws_code("removeChild", dom_codes::NOT_FOUND_ERR, "null.x"));
    }

    #[test]
    fn test_shell_family() {
        let mut ctx = ctx();
        ctx.set_section("15.4.4.2");
        assert!(ctx.record_case("15.4.4.2", "[1,2].join()", "1,2", "1,2"));
        assert!(ctx.report_compare(2, 2.0, "two"));
        assert_eq!(last(&ctx).section, "15.4.4.2");
        assert!(!ctx.report_compare("2", 2, "typeof differs"));
        assert!(ctx.report_match("^Type", Value::from(Exception::type_error("x")), "error kind"));
        assert!(!ctx.report_match("(", "anything", "bad pattern"));
        assert!(last(&ctx).message.starts_with("bad pattern: InvalidPattern: ("));
    }

    #[test]
    fn test_probe_exception_as_actual_in_record_case() {
        let mut ctx = ctx();
        let actual = ctx.host_mut().evaluate("null.x");
        assert!(ctx.record_case("s", "null.x", "TypeError: Cannot read property 'x' of null", actual));
    }

    #[test]
    fn test_earlier_records_are_untouched() {
        let mut ctx = ctx();
        ctx.should_be("1", "1");
        let before = format!("{:?}", ctx.cases().get(0).unwrap());
        ctx.should_be("2", "3");
        ctx.test_failed("explicit");
        ctx.record_remote(Origin::Worker("w".into()), true, "from worker");
        assert_eq!(format!("{:?}", ctx.cases().get(0).unwrap()), before);
        assert_eq!(ctx.cases().len(), 4);
        assert_eq!(last(&ctx).origin, Origin::Worker("w".into()));
    }
}
