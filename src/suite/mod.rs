//! Per-suite context
//!
//! Every suite run owns one [`SuiteContext`]: its host, configuration and
//! ordered case log. There is no process-wide state, so independent suites
//! can run side by side on separate threads.

use crate::config::HarnessConfig;
use crate::host::Host;
use crate::report::SuiteSummary;
use crate::testcase::{Append, CaseLog, TestCase};
use std::fmt;

/// Explicit state of one suite run, passed to every primitive and the runner
pub struct SuiteContext {
    name: String,
    section: String,
    bug_number: Option<String>,
    summary: Option<String>,
    config: HarnessConfig,
    host: Box<dyn Host>,
    cases: CaseLog,
    reported: Option<SuiteSummary>,
}

impl fmt::Debug for SuiteContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuiteContext")
            .field("name", &self.name)
            .field("section", &self.section)
            .field("cases", &self.cases.len())
            .field("sealed", &self.cases.is_sealed())
            .field("reported", &self.reported.is_some())
            .finish_non_exhaustive()
    }
}

impl SuiteContext {
    /// Create a suite with the default configuration
    pub fn new(name: impl Into<String>, host: impl Host + 'static) -> Self {
        Self::with_config(name, host, HarnessConfig::default())
    }

    pub fn with_config(name: impl Into<String>, host: impl Host + 'static, config: HarnessConfig) -> Self {
        let name = name.into();
        Self {
            section: name.clone(),
            name,
            bug_number: None,
            summary: None,
            config,
            host: Box::new(host),
            cases: CaseLog::new(),
            reported: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Section id stamped on cases that do not name their own
    pub fn section(&self) -> &str {
        &self.section
    }

    pub fn set_section(&mut self, section: impl Into<String>) {
        self.section = section.into();
    }

    pub fn bug_number(&self) -> Option<&str> {
        self.bug_number.as_deref()
    }

    pub fn set_bug_number(&mut self, bug: impl Into<String>) {
        self.bug_number = Some(bug.into());
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    pub fn set_summary(&mut self, summary: impl Into<String>) {
        self.summary = Some(summary.into());
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn host_mut(&mut self) -> &mut dyn Host {
        self.host.as_mut()
    }

    pub fn cases(&self) -> &CaseLog {
        &self.cases
    }

    pub(crate) fn cases_mut(&mut self) -> &mut CaseLog {
        &mut self.cases
    }

    /// Whether the runner has already reported this suite
    pub fn is_reported(&self) -> bool {
        self.reported.is_some()
    }

    /// The summary the runner emitted, once the suite has been reported
    pub fn reported_summary(&self) -> Option<&SuiteSummary> {
        self.reported.as_ref()
    }

    pub(crate) fn mark_reported(&mut self, summary: SuiteSummary) {
        self.reported = Some(summary);
    }

    /// Append one case to the log. After the log is sealed the case is
    /// dropped and counted as late.
    pub fn append(&mut self, case: TestCase) -> Append {
        let description = case.description.clone();
        let passed = case.passed;
        let outcome = self.cases.push(case);
        match outcome {
            Append::Stored(ordinal) => {
                tracing::debug!(suite = %self.name, ordinal, passed, %description, "case recorded");
            }
            Append::Rejected => {
                tracing::warn!(suite = %self.name, %description,
                    "case appended after the suite was sealed; dropped");
            }
        }
        outcome
    }

    /// Stop accepting cases; called when the gate completes
    pub fn seal(&mut self) {
        self.cases.seal();
    }

    /// Start over with an empty log for the next suite run
    pub fn reset(&mut self) {
        self.cases.reset();
        self.reported = None;
        self.section = self.name.clone();
    }
}
