//! Synchronous test runner
//!
//! Walks a suite's case log in ordinal order, finalizes each record, reports
//! it, and emits a summary. A suite is reported once; the gate guarantees the
//! runner is released a single time, and the runner refuses a second call.

use crate::error::{Error, Result};
use crate::report::{ReportStyle, Reporter};
use crate::suite::SuiteContext;

pub use crate::report::SuiteSummary;

// ---------------------------------------------------------------------------
// Setup / teardown
// ---------------------------------------------------------------------------

/// Write the suite header (`startTest`)
pub fn start_test(ctx: &SuiteContext, reporter: &mut Reporter) {
    tracing::debug!(suite = ctx.name(), "suite started");
    for line in header_lines(ctx, reporter.style()) {
        reporter.write_line(&line);
    }
}

/// The header lines `start_test` writes, in order
pub fn header_lines(ctx: &SuiteContext, style: ReportStyle) -> Vec<String> {
    let mut lines = Vec::new();
    match style {
        ReportStyle::Mozilla => {
            if let Some(bug) = ctx.bug_number() {
                lines.push(format!("BUGNUMBER: {}", bug));
            }
            if let Some(summary) = ctx.summary() {
                lines.push(format!("STATUS: {}", summary));
            }
        }
        ReportStyle::WebKit => {
            if let Some(summary) = ctx.summary() {
                lines.push(summary.to_string());
            }
        }
    }
    lines
}

/// Suite teardown (`stopTest`)
pub fn stop_test(reporter: &mut Reporter) {
    reporter.flush();
}

// ---------------------------------------------------------------------------
// Running
// ---------------------------------------------------------------------------

/// Finalize and report every case of the suite, then the summary.
///
/// Seals the log first, so anything appended afterwards is dropped and shows
/// up as a late case in later summaries.
pub fn run(ctx: &mut SuiteContext, reporter: &mut Reporter) -> Result<SuiteSummary> {
    if ctx.is_reported() {
        tracing::warn!(suite = ctx.name(), "runner invoked twice");
        return Err(Error::RunnerAlreadyInvoked(ctx.name().to_string()));
    }

    ctx.seal();
    let tolerance = ctx.config().numeric_tolerance;
    let annotation = ctx.config().failure_annotation.clone();
    for case in ctx.cases_mut().cases_mut() {
        case.finalize(tolerance, &annotation);
    }

    for case in ctx.cases() {
        reporter.report_case(case);
    }

    let summary = summarize(ctx, reporter);
    if ctx.config().emit_summary {
        reporter.report_summary(&summary);
    }
    stop_test(reporter);
    ctx.mark_reported(summary.clone());

    tracing::info!(
        suite = %summary.suite,
        total = summary.total,
        passed = summary.passed,
        failed = summary.failed,
        "suite reported"
    );
    Ok(summary)
}

/// Totals for the suite as it stands now
pub fn summarize(ctx: &SuiteContext, reporter: &Reporter) -> SuiteSummary {
    let passed = ctx.cases().iter().filter(|c| c.passed).count();
    SuiteSummary {
        suite: ctx.name().to_string(),
        total: ctx.cases().len(),
        passed,
        failed: ctx.cases().len() - passed,
        late_cases: ctx.cases().late_cases(),
        dropped_lines: reporter.dropped_lines(),
    }
}

/// Re-render the report lines of an already finalized suite without
/// touching any sink. Yields the same lines every time; a reported suite
/// reuses the summary the runner emitted.
pub fn render(ctx: &SuiteContext, reporter: &Reporter) -> Vec<String> {
    let mut lines: Vec<String> = ctx.cases().iter().map(|c| reporter.format_case(c)).collect();
    if ctx.config().emit_summary {
        let summary = match ctx.reported_summary() {
            Some(summary) => summary.clone(),
            None => summarize(ctx, reporter),
        };
        lines.push(reporter.format_summary(&summary));
    }
    lines
}
