//! Integration tests for the assertion primitives and the synchronous runner
//!
//! Organized by family:
//!   - webkit (shouldBe / shouldThrow)
//!   - dom (assertEquals / assertSize / DOMException codes)
//!   - shell (TestCase / reportCompare / reportMatch)

mod common;

use common::{memory_reporter, suite};
use conformance_harness::value::dom_codes;
use conformance_harness::{runner, thunk, Exception, ObjectRef, ReportStyle, SuiteContext, Value};

mod webkit {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_should_be_reports_pass_and_fail() -> anyhow::Result<()> {
        let mut suite = suite("arith");
        suite.should_be("1+1", "2");
        suite.should_be("1+1", "3");

        let failed = suite.cases().get(1).unwrap();
        assert_eq!(failed.actual, Value::Number(2.0));
        assert_eq!(failed.expected, Value::Number(3.0));

        let (mut reporter, sink) = memory_reporter(ReportStyle::WebKit);
        let summary = runner::run(&mut suite, &mut reporter)?;
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(
            sink.lines(),
            vec![
                "PASS 1+1 is 2",
                "FAIL 1+1 should be 3. Was 2.",
                "TEST COMPLETE: 1 PASS, 1 FAIL",
            ]
        );
        Ok(())
    }

    #[test]
    fn test_should_throw() {
        let mut suite = suite("throws");
        assert!(suite.should_throw("null.x", None));
        assert!(!suite.should_throw("1", None));
        assert!(suite.should_throw("null.x", Some("'TypeError: Cannot read property \\'x\\' of null'")));
        assert_eq!(suite.cases().len(), 3);
        assert_eq!(
            suite.cases().get(0).unwrap().message,
            "null.x threw exception TypeError: Cannot read property 'x' of null."
        );
    }

    #[test]
    fn test_nan_matches_nan() {
        let mut suite = suite("nan");
        assert!(suite.should_be("0/0", "NaN"));
        assert!(suite.should_be_nan("0/0"));
        assert!(!suite.should_be("0/0", "0"));
    }

    #[test]
    fn test_host_object_projections() {
        let mut suite = suite("dom");
        assert!(suite.should_be("body.tagName", "'BODY'"));
        assert!(suite.should_be("body.nodeType", "1"));
        assert!(suite.should_be_undefined("body.missing"));
        assert!(suite.should_be_equal_to_string("title", "Conformance"));
    }

    #[test]
    fn test_primitives_append_exactly_one_case() {
        let mut suite = suite("count");
        let calls: Vec<Box<dyn Fn(&mut SuiteContext)>> = vec![
            Box::new(|s: &mut SuiteContext| {
                s.should_be("1", "1");
            }),
            Box::new(|s: &mut SuiteContext| {
                s.should_not_throw("nope");
            }),
            Box::new(|s: &mut SuiteContext| {
                s.assert_equals("label", 1, 2);
            }),
            Box::new(|s: &mut SuiteContext| {
                s.assert_size("size", 1, Value::from("ab"));
            }),
            Box::new(|s: &mut SuiteContext| {
                s.report_match("^a", "abc", "match");
            }),
            Box::new(|s: &mut SuiteContext| {
                s.record_case("s", "d", 1, 1);
            }),
        ];
        for (i, call) in calls.iter().enumerate() {
            call(&mut suite);
            assert_eq!(suite.cases().len(), i + 1);
            assert_eq!(suite.cases().last().unwrap().ordinal, i);
        }
    }
}

mod dom {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_assert_family_with_mozilla_report() -> anyhow::Result<()> {
        let mut suite = suite("hc_nodelist");
        let list = ObjectRef::collection("NodeList", vec!["em".into(), "strong".into(), "code".into()]);
        suite.assert_size("elementsSize", 3, list.clone());
        suite.assert_equals_collection(
            "nodeNames",
            &["em".into(), "strong".into(), "code".into()],
            list.clone(),
        );
        suite.assert_equals("firstName", "em", list.items()[0].clone());
        suite.assert_size("elementsSize", 2, list);

        let (mut reporter, sink) = memory_reporter(ReportStyle::Mozilla);
        runner::run(&mut suite, &mut reporter)?;
        assert_eq!(
            sink.lines(),
            vec![
                "elementsSize = 3 PASSED!",
                "nodeNames = [\"em\", \"strong\", \"code\"] PASSED!",
                "firstName = em PASSED!",
                "elementsSize = 3 FAILED! expected: 2 elementsSize: expected size 2 but was 3 wrong value",
                "hc_nodelist: 4 tests, 3 passed, 1 failed",
            ]
        );
        Ok(())
    }

    #[test]
    fn test_dom_exception_codes() {
        let mut suite = suite("hc_exceptions");
        assert!(suite.assert_throws_code(
            "throw_NOT_FOUND_ERR",
            dom_codes::NOT_FOUND_ERR,
            thunk("removeChild", |_| Err(Exception::dom(dom_codes::NOT_FOUND_ERR))),
        ));
        assert!(!suite.assert_throws_code(
            "throw_INDEX_SIZE_ERR",
            dom_codes::INDEX_SIZE_ERR,
            thunk("substringData", |_| Ok(Value::from(""))),
        ));
    }
}

mod shell {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_legacy_comparison_and_annotation() -> anyhow::Result<()> {
        let mut suite = suite("15.5.4.10");
        suite.set_bug_number("123456");
        suite.set_summary("String.prototype.match");
        suite.record_case("15.5.4.10", "'abc'.length", 3, Value::from("abc").project("length"));
        suite.report_compare(0, Value::Number(-0.0), "legacy zero");
        suite.report_compare("3", 3, "string vs number");

        let (mut reporter, sink) = memory_reporter(ReportStyle::Mozilla);
        runner::start_test(&suite, &mut reporter);
        runner::run(&mut suite, &mut reporter)?;
        assert_eq!(
            sink.lines(),
            vec![
                "BUGNUMBER: 123456",
                "STATUS: String.prototype.match",
                "'abc'.length = 3 PASSED!",
                "legacy zero = -0 PASSED!",
                "string vs number = 3 FAILED! expected: 3 wrong value",
                "15.5.4.10: 3 tests, 2 passed, 1 failed",
            ]
        );
        Ok(())
    }

    #[test]
    fn test_probe_exception_compared_as_string() {
        let mut suite = suite("exceptions");
        let thrown = suite.host_mut().evaluate("undefined.foo");
        assert!(suite.report_compare(
            "TypeError: Cannot read property 'foo' of undefined",
            thrown,
            "undefined.foo"
        ));
    }

    #[test]
    fn test_report_is_stable_across_renders() -> anyhow::Result<()> {
        let mut suite = suite("stable");
        suite.record_case("s", "one", 1, 1);
        suite.record_case("s", "two", 2, 3);
        let (mut reporter, sink) = memory_reporter(ReportStyle::Mozilla);
        runner::run(&mut suite, &mut reporter)?;

        let emitted = sink.lines();
        assert_eq!(runner::render(&suite, &reporter), emitted);
        assert_eq!(runner::render(&suite, &reporter), emitted);
        assert!(runner::run(&mut suite, &mut reporter).is_err());
        assert_eq!(sink.lines(), emitted);
        Ok(())
    }

    #[test]
    fn test_render_unchanged_by_late_append() -> anyhow::Result<()> {
        let mut suite = suite("r");
        suite.record_case("s", "a", 1, 1);
        let (mut reporter, sink) = memory_reporter(ReportStyle::Mozilla);
        runner::run(&mut suite, &mut reporter)?;
        let emitted = sink.lines();
        assert_eq!(emitted, vec!["a = 1 PASSED!", "r: 1 tests, 1 passed, 0 failed"]);

        assert!(!suite.record_case("s", "late", 1, 1));
        assert_eq!(suite.cases().late_cases(), 1);
        assert_eq!(runner::render(&suite, &reporter), emitted);
        Ok(())
    }
}
