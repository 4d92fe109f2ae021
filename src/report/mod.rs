//! Reporter: turns finalized test cases into text lines
//!
//! The reporter is a pure sink adapter. It never changes a verdict, and a
//! sink that cannot be written to (closed pipe, detached console) is counted
//! and otherwise ignored.

use crate::config::HarnessConfig;
use crate::error::{Error, Result};
use crate::testcase::{Origin, TestCase};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

// ---------------------------------------------------------------------------
// ReportStyle
// ---------------------------------------------------------------------------

/// Output line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStyle {
    /// `desc = actual PASSED!` / `desc = actual FAILED! expected: e reason`
    Mozilla,
    /// `PASS message` / `FAIL message`
    WebKit,
}

impl FromStr for ReportStyle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mozilla" => Ok(ReportStyle::Mozilla),
            "webkit" => Ok(ReportStyle::WebKit),
            other => Err(Error::invalid_config(format!("unknown report style '{}'", other))),
        }
    }
}

impl fmt::Display for ReportStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportStyle::Mozilla => write!(f, "mozilla"),
            ReportStyle::WebKit => write!(f, "webkit"),
        }
    }
}

// ---------------------------------------------------------------------------
// SuiteSummary
// ---------------------------------------------------------------------------

/// Totals for one suite run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteSummary {
    pub suite: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    /// Results that arrived after the gate completed and were dropped
    pub late_cases: usize,
    /// Lines the sink refused
    pub dropped_lines: usize,
}

impl SuiteSummary {
    /// Pass rate as a percentage
    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.passed as f64 / self.total as f64 * 100.0
        }
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Line-oriented text destination
pub trait ReportSink {
    fn write_line(&mut self, line: &str) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Writes to standard output
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl ReportSink for ConsoleSink {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        writeln!(handle, "{}", line)
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().flush()
    }
}

/// Writes to any `io::Write`
#[derive(Debug)]
pub struct WriterSink<W: Write> {
    writer: W,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ReportSink for WriterSink<W> {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.writer, "{}", line)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Collects lines in a shared buffer; clones see the same buffer
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything written so far
    pub fn lines(&self) -> Vec<String> {
        match self.lines.lock() {
            Ok(lines) => lines.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn clear(&self) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.clear();
        }
    }
}

impl ReportSink for MemorySink {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.lines
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "report buffer poisoned"))?
            .push(line.to_string());
        Ok(())
    }
}

/// Emits every line as a `tracing` event
#[derive(Debug, Default)]
pub struct TracingSink;

impl ReportSink for TracingSink {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        tracing::info!(target: "conformance_harness::report", "{}", line);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Reporter
// ---------------------------------------------------------------------------

/// Formats cases and summaries and hands them to a sink
pub struct Reporter {
    sink: Box<dyn ReportSink>,
    style: ReportStyle,
    dropped: usize,
}

impl fmt::Debug for Reporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reporter")
            .field("style", &self.style)
            .field("dropped", &self.dropped)
            .finish_non_exhaustive()
    }
}

impl Reporter {
    pub fn new(sink: impl ReportSink + 'static, style: ReportStyle) -> Self {
        Self {
            sink: Box::new(sink),
            style,
            dropped: 0,
        }
    }

    /// Reporter in the line format `config` names
    pub fn from_config(sink: impl ReportSink + 'static, config: &HarnessConfig) -> Self {
        Self::new(sink, config.report_style)
    }

    /// Reporter writing to stdout
    pub fn console(style: ReportStyle) -> Self {
        Self::new(ConsoleSink, style)
    }

    pub fn style(&self) -> ReportStyle {
        self.style
    }

    /// Lines the sink refused so far
    pub fn dropped_lines(&self) -> usize {
        self.dropped
    }

    /// Render one case. Pure: the same case always yields the same line.
    pub fn format_case(&self, case: &TestCase) -> String {
        let line = match self.style {
            ReportStyle::Mozilla => {
                let mut line = format!("{} = {}", case.description, plain(&case.actual));
                if case.passed {
                    line.push_str(" PASSED!");
                } else {
                    line.push_str(&format!(" FAILED! expected: {}", plain(&case.expected)));
                    let reason = case.reason.trim();
                    if !reason.is_empty() {
                        line.push(' ');
                        line.push_str(reason);
                    }
                }
                line
            }
            ReportStyle::WebKit => {
                let message = if case.message.is_empty() {
                    default_message(case)
                } else {
                    case.message.clone()
                };
                format!("{} {}", if case.passed { "PASS" } else { "FAIL" }, message)
            }
        };
        match &case.origin {
            Origin::Local => line,
            Origin::Worker(name) => format!("[{}] {}", name, line),
        }
    }

    /// Render the summary line
    pub fn format_summary(&self, summary: &SuiteSummary) -> String {
        let mut line = match self.style {
            ReportStyle::Mozilla => format!(
                "{}: {} tests, {} passed, {} failed",
                summary.suite, summary.total, summary.passed, summary.failed
            ),
            ReportStyle::WebKit => format!(
                "TEST COMPLETE: {} PASS, {} FAIL",
                summary.passed, summary.failed
            ),
        };
        if summary.late_cases > 0 {
            line.push_str(&format!(" ({} late results dropped)", summary.late_cases));
        }
        line
    }

    /// Machine-readable summary
    pub fn summary_json(summary: &SuiteSummary) -> serde_json::Value {
        serde_json::json!({
            "suite": summary.suite,
            "total": summary.total,
            "passed": summary.passed,
            "failed": summary.failed,
            "late_cases": summary.late_cases,
            "dropped_lines": summary.dropped_lines,
            "pass_rate": summary.pass_rate(),
        })
    }

    pub fn report_case(&mut self, case: &TestCase) {
        let line = self.format_case(case);
        self.emit(&line);
    }

    pub fn report_summary(&mut self, summary: &SuiteSummary) {
        let line = self.format_summary(summary);
        self.emit(&line);
    }

    /// Write a free-form line (suite headers, worker log lines)
    pub fn write_line(&mut self, line: &str) {
        self.emit(line);
    }

    pub fn flush(&mut self) {
        if let Err(e) = self.sink.flush() {
            tracing::warn!(error = %e, "report sink flush failed");
        }
    }

    fn emit(&mut self, line: &str) {
        if let Err(e) = self.sink.write_line(line) {
            self.dropped += 1;
            tracing::warn!(error = %e, dropped = self.dropped, "report sink unavailable; line dropped");
        }
    }
}

fn plain(value: &Value) -> String {
    match value {
        Value::Number(n) if *n == 0.0 && n.is_sign_negative() => "-0".to_string(),
        other => other.to_js_string(),
    }
}

fn default_message(case: &TestCase) -> String {
    if case.passed {
        format!("{} is {}", case.description, case.expected.stringify())
    } else {
        format!(
            "{} should be {}. Was {}.",
            case.description,
            case.expected.stringify(),
            case.actual.stringify()
        )
    }
}
