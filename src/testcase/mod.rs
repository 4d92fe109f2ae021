//! TestCase records and the ordered per-suite log
//!
//! A [`TestCase`] is created by an assertion primitive and finalized exactly
//! once by the synchronous runner. The [`CaseLog`] is append-only: records are
//! never removed or reordered, and once the suite's gate completes the log is
//! sealed so nothing can be appended behind the runner's back.

use crate::value::{values_match, Comparison, Value};
use std::fmt;

// ---------------------------------------------------------------------------
// Origin
// ---------------------------------------------------------------------------

/// Where a result was produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// Asserted in the page's own context
    Local,
    /// Reported by a worker over its message channel
    Worker(String),
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Local => write!(f, "local"),
            Origin::Worker(name) => write!(f, "worker:{}", name),
        }
    }
}

// ---------------------------------------------------------------------------
// TestCase
// ---------------------------------------------------------------------------

/// One recorded assertion outcome
#[derive(Debug, Clone)]
pub struct TestCase {
    /// Position in the suite's log (0-based)
    pub ordinal: usize,
    /// Section id, e.g. `15.4.4.2` or the DOM test name
    pub section: String,
    /// Source expression or human label
    pub description: String,
    pub expected: Value,
    pub actual: Value,
    /// How `expected` and `actual` are judged
    pub comparison: Comparison,
    /// Verdict. For comparison-based cases this is recomputed by the runner.
    pub passed: bool,
    /// Why the case failed; empty on pass
    pub reason: String,
    /// WebKit-style sentence ("x is 2", "x should be 3. Was 2.")
    pub message: String,
    pub origin: Origin,
    /// Set once the runner has processed this record
    pub finalized: bool,
    /// Cases whose verdict is not a plain expected/actual comparison
    /// (shouldThrow, assertSize, ...) keep the verdict from append time.
    pub verdict_fixed: bool,
}

impl TestCase {
    /// A comparison-based case; `passed` is computed immediately and again at
    /// finalization.
    pub fn compared(
        section: impl Into<String>,
        description: impl Into<String>,
        expected: Value,
        actual: Value,
        comparison: Comparison,
        tolerance: Option<f64>,
    ) -> Self {
        let passed = values_match(&expected, &actual, comparison, tolerance);
        Self {
            ordinal: 0,
            section: section.into(),
            description: description.into(),
            expected,
            actual,
            comparison,
            passed,
            reason: String::new(),
            message: String::new(),
            origin: Origin::Local,
            finalized: false,
            verdict_fixed: false,
        }
    }

    /// A case whose verdict was decided by the primitive itself
    pub fn decided(
        section: impl Into<String>,
        description: impl Into<String>,
        expected: Value,
        actual: Value,
        passed: bool,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            ordinal: 0,
            section: section.into(),
            description: description.into(),
            expected,
            actual,
            comparison: Comparison::SameValue,
            passed,
            reason: reason.into(),
            message: String::new(),
            origin: Origin::Local,
            finalized: false,
            verdict_fixed: true,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    /// Decide the final verdict and annotate failures. Idempotent: a second
    /// call leaves the record untouched.
    pub fn finalize(&mut self, tolerance: Option<f64>, failure_annotation: &str) {
        if self.finalized {
            return;
        }
        if !self.verdict_fixed {
            self.passed = values_match(&self.expected, &self.actual, self.comparison, tolerance);
        }
        if !self.passed {
            self.reason.push_str(failure_annotation);
        }
        self.finalized = true;
    }
}

// ---------------------------------------------------------------------------
// CaseLog
// ---------------------------------------------------------------------------

/// Outcome of trying to append to the log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Append {
    /// Stored at this ordinal
    Stored(usize),
    /// The log was sealed; the case was dropped
    Rejected,
}

/// Ordered, append-only sequence of test cases for one suite
#[derive(Debug, Default)]
pub struct CaseLog {
    cases: Vec<TestCase>,
    sealed: bool,
    late: usize,
}

impl CaseLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a case, assigning its ordinal
    pub fn push(&mut self, mut case: TestCase) -> Append {
        if self.sealed {
            self.late += 1;
            return Append::Rejected;
        }
        let ordinal = self.cases.len();
        case.ordinal = ordinal;
        self.cases.push(case);
        Append::Stored(ordinal)
    }

    /// Stop accepting appends
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Number of appends rejected after sealing
    pub fn late_cases(&self) -> usize {
        self.late
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    pub fn get(&self, ordinal: usize) -> Option<&TestCase> {
        self.cases.get(ordinal)
    }

    pub fn last(&self) -> Option<&TestCase> {
        self.cases.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TestCase> {
        self.cases.iter()
    }

    /// Mutable access for the runner's finalization pass only. The slice can
    /// be edited in place but not grown, shrunk or reordered.
    pub(crate) fn cases_mut(&mut self) -> &mut [TestCase] {
        &mut self.cases
    }

    /// Drop all records and start a fresh suite
    pub fn reset(&mut self) {
        self.cases.clear();
        self.sealed = false;
        self.late = 0;
    }
}

impl<'a> IntoIterator for &'a CaseLog {
    type Item = &'a TestCase;
    type IntoIter = std::slice::Iter<'a, TestCase>;

    fn into_iter(self) -> Self::IntoIter {
        self.cases.iter()
    }
}
