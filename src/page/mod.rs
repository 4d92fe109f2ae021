//! Page: the cooperative callback queue one suite runs in
//!
//! A [`Page`] owns a suite's context, its gate and its reporter, and
//! serializes everything that touches them through one FIFO of callbacks.
//! Suspension happens only between callbacks: document loads, worker message
//! deliveries and timer firings are each a separate callback.
//!
//! ```
//! use conformance_harness::{ExpressionHost, Gate, MemorySink, Page, PageOutcome,
//!     ReportStyle, Reporter, Signal, SuiteContext};
//!
//! let sink = MemorySink::new();
//! let suite = SuiteContext::new("async", ExpressionHost::new());
//! let mut page = Page::new(suite, Gate::counted(1), Reporter::new(sink.clone(), ReportStyle::WebKit));
//!
//! page.suite_mut().should_be("1+1", "2");
//! page.set_timeout(10, |page| {
//!     page.suite_mut().should_be("2+2", "4");
//!     page.signal(Signal::Finished);
//! });
//!
//! let outcome = page.run().unwrap();
//! assert!(matches!(outcome, PageOutcome::Completed(ref s) if s.passed == 2));
//! ```

pub mod worker;

pub use worker::{WorkerHandle, WorkerMessage, WorkerScope, WorkerState};

use crate::error::Result;
use crate::gate::{Gate, Signal, Transition};
use crate::report::{ReportSink, Reporter, SuiteSummary};
use crate::runner;
use crate::suite::SuiteContext;
use crate::testcase::Origin;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};
use worker::Envelope;

/// A unit of work on the page's queue
pub type Callback = Box<dyn FnOnce(&mut Page)>;

/// Handler for messages from one worker (`onmessage`)
pub type MessageHandler = Box<dyn FnMut(&mut Page, &str, WorkerMessage)>;

/// Identifies a scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a page run ended
#[derive(Debug, Clone, PartialEq)]
pub enum PageOutcome {
    /// The gate completed and the runner reported the suite
    Completed(SuiteSummary),
    /// Nothing left that could complete the gate; the runner never ran
    Starved { received: usize, required: usize },
}

enum Task {
    Callback(Callback),
    Deliver { worker: String, message: WorkerMessage },
    RunSuite,
}

struct Timer {
    id: TimerId,
    due: u64,
    callback: Callback,
}

// ---------------------------------------------------------------------------
// Page
// ---------------------------------------------------------------------------

pub struct Page {
    suite: SuiteContext,
    gate: Gate,
    reporter: Reporter,
    queue: VecDeque<Task>,
    timers: Vec<Timer>,
    clock: u64,
    next_timer_id: u64,
    current_timer: Option<TimerId>,
    outbox: Sender<Envelope>,
    inbox: Receiver<Envelope>,
    live_workers: usize,
    handlers: HashMap<String, MessageHandler>,
    held_lines: Vec<String>,
    started: bool,
    outcome: Option<SuiteSummary>,
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("suite", &self.suite)
            .field("gate", &self.gate)
            .field("queued", &self.queue.len())
            .field("timers", &self.timers.len())
            .field("clock", &self.clock)
            .field("live_workers", &self.live_workers)
            .field("held_lines", &self.held_lines.len())
            .finish_non_exhaustive()
    }
}

impl Page {
    pub fn new(suite: SuiteContext, gate: Gate, reporter: Reporter) -> Self {
        let (outbox, inbox) = mpsc::channel();
        Self {
            suite,
            gate,
            reporter,
            queue: VecDeque::new(),
            timers: Vec::new(),
            clock: 0,
            next_timer_id: 1,
            current_timer: None,
            outbox,
            inbox,
            live_workers: 0,
            handlers: HashMap::new(),
            held_lines: Vec::new(),
            started: false,
            outcome: None,
        }
    }

    /// Page whose reporter uses the line format from the suite's config
    pub fn with_sink(suite: SuiteContext, gate: Gate, sink: impl ReportSink + 'static) -> Self {
        let reporter = Reporter::from_config(sink, suite.config());
        Self::new(suite, gate, reporter)
    }

    pub fn suite(&self) -> &SuiteContext {
        &self.suite
    }

    pub fn suite_mut(&mut self) -> &mut SuiteContext {
        &mut self.suite
    }

    pub fn gate(&self) -> &Gate {
        &self.gate
    }

    pub fn reporter(&self) -> &Reporter {
        &self.reporter
    }

    pub fn reporter_mut(&mut self) -> &mut Reporter {
        &mut self.reporter
    }

    /// Give back the suite after the run
    pub fn into_suite(self) -> SuiteContext {
        self.suite
    }

    /// Virtual time in milliseconds
    pub fn now(&self) -> u64 {
        self.clock
    }

    /// The timer whose callback is executing, if any
    pub fn current_timer(&self) -> Option<TimerId> {
        self.current_timer
    }

    // -----------------------------------------------------------------------
    // Scheduling
    // -----------------------------------------------------------------------

    /// Append a callback to the queue
    pub fn queue<F>(&mut self, callback: F)
    where
        F: FnOnce(&mut Page) + 'static,
    {
        tracing::trace!(queued = self.queue.len() + 1, "callback queued");
        self.queue.push_back(Task::Callback(Box::new(callback)));
    }

    /// Fire `callback` once after `delay_ms` of virtual time. Delays below the
    /// configured minimum are raised to it.
    pub fn set_timeout<F>(&mut self, delay_ms: u64, callback: F) -> TimerId
    where
        F: FnOnce(&mut Page) + 'static,
    {
        let delay = delay_ms.max(self.suite.config().min_timer_delay_ms);
        let due = self.clock.saturating_add(delay);
        let id = TimerId(self.next_timer_id);
        self.next_timer_id += 1;
        self.timers.push(Timer {
            id,
            due,
            callback: Box::new(callback),
        });
        tracing::trace!(timer = %id, due, "timer scheduled");
        id
    }

    /// Cancel a timer that has not fired yet. Returns whether it was pending.
    pub fn clear_timeout(&mut self, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.id != id);
        before != self.timers.len()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Hold a free-form line (suite header, worker description or log). Held
    /// lines go to the reporter ahead of the cases when the suite is
    /// reported, and are discarded if the page starves.
    pub fn write_line(&mut self, line: impl Into<String>) {
        self.held_lines.push(line.into());
    }

    // -----------------------------------------------------------------------
    // Signals
    // -----------------------------------------------------------------------

    /// Deliver a readiness signal. On completion the case log is sealed and
    /// the single runner invocation is queued behind what is already queued.
    pub fn signal(&mut self, signal: Signal) -> Transition {
        let transition = self.gate.signal(&signal);
        if transition == Transition::Completed {
            self.suite.seal();
            self.release_runner();
        }
        transition
    }

    /// `finishJSTest()` / `completeTest()`
    pub fn finish_test(&mut self) -> Transition {
        self.signal(Signal::Finished)
    }

    /// A preloaded document finished loading
    pub fn document_loaded(&mut self, name: &str) -> Transition {
        self.signal(Signal::DocumentLoaded(name.to_string()))
    }

    fn release_runner(&mut self) {
        if self.gate.release_runner() {
            tracing::debug!(suite = self.suite.name(), "runner released");
            self.queue.push_back(Task::RunSuite);
        }
    }

    // -----------------------------------------------------------------------
    // Workers
    // -----------------------------------------------------------------------

    /// Start a worker thread whose messages are delivered to this page
    pub fn spawn_worker<F>(&mut self, name: &str, body: F) -> Result<WorkerHandle>
    where
        F: FnOnce(WorkerScope) + Send + 'static,
    {
        let handle = worker::spawn(name.to_string(), self.outbox.clone(), body)?;
        self.live_workers += 1;
        Ok(handle)
    }

    /// Install the `onmessage` handler for one worker. Workers without a
    /// handler use [`WorkerProtocol`].
    pub fn on_message<F>(&mut self, worker: &str, handler: F)
    where
        F: FnMut(&mut Page, &str, WorkerMessage) + 'static,
    {
        self.handlers.insert(worker.to_string(), Box::new(handler));
    }

    fn accept(&mut self, envelope: Envelope) {
        match envelope {
            Envelope::Message { worker, message } => {
                tracing::trace!(%worker, %message, "worker message queued");
                self.queue.push_back(Task::Deliver { worker, message });
            }
            Envelope::Exited { worker } => {
                self.live_workers = self.live_workers.saturating_sub(1);
                tracing::debug!(%worker, live = self.live_workers, "worker exited");
            }
        }
    }

    fn deliver(&mut self, worker: String, message: WorkerMessage) {
        match self.handlers.remove(&worker) {
            Some(mut handler) => {
                handler(self, &worker, message);
                self.handlers.entry(worker).or_insert(handler);
            }
            None => WorkerProtocol::handle(self, &worker, message),
        }
    }

    // -----------------------------------------------------------------------
    // Event loop
    // -----------------------------------------------------------------------

    /// Run the page until the suite is reported or starves.
    ///
    /// Order of work: queued callbacks first, then worker messages that have
    /// already arrived, then the earliest timer (advancing the virtual clock),
    /// and only then a blocking wait on live workers.
    pub fn run(&mut self) -> Result<PageOutcome> {
        if let Some(summary) = &self.outcome {
            return Ok(PageOutcome::Completed(summary.clone()));
        }
        if !self.started {
            self.started = true;
            tracing::debug!(suite = self.suite.name(), "suite started");
            let mut lines = runner::header_lines(&self.suite, self.reporter.style());
            lines.append(&mut self.held_lines);
            self.held_lines = lines;
            // A gate that needs nothing is complete already; the runner goes
            // behind the synchronous setup.
            self.release_runner();
        }

        loop {
            if let Some(task) = self.queue.pop_front() {
                match task {
                    Task::Callback(callback) => callback(self),
                    Task::Deliver { worker, message } => self.deliver(worker, message),
                    Task::RunSuite => {
                        for line in std::mem::take(&mut self.held_lines) {
                            self.reporter.write_line(&line);
                        }
                        let summary = runner::run(&mut self.suite, &mut self.reporter)?;
                        self.teardown();
                        self.outcome = Some(summary.clone());
                        return Ok(PageOutcome::Completed(summary));
                    }
                }
                continue;
            }

            if let Ok(envelope) = self.inbox.try_recv() {
                self.accept(envelope);
                continue;
            }

            if let Some(timer) = self.take_next_timer() {
                self.clock = self.clock.max(timer.due);
                tracing::trace!(timer = %timer.id, now = self.clock, "timer fired");
                self.current_timer = Some(timer.id);
                (timer.callback)(self);
                self.current_timer = None;
                continue;
            }

            if self.live_workers > 0 {
                match self.inbox.recv() {
                    Ok(envelope) => {
                        self.accept(envelope);
                        continue;
                    }
                    Err(_) => self.live_workers = 0,
                }
            }

            tracing::warn!(
                suite = self.suite.name(),
                received = self.gate.received(),
                required = self.gate.required(),
                discarded_lines = self.held_lines.len(),
                "page starved before the gate completed"
            );
            self.held_lines.clear();
            return Ok(PageOutcome::Starved {
                received: self.gate.received(),
                required: self.gate.required(),
            });
        }
    }

    fn take_next_timer(&mut self) -> Option<Timer> {
        let index = self
            .timers
            .iter()
            .enumerate()
            .min_by_key(|(_, t)| (t.due, t.id))
            .map(|(i, _)| i)?;
        Some(self.timers.remove(index))
    }

    fn teardown(&mut self) {
        let cancelled = self.timers.len();
        self.timers.clear();
        let abandoned = self.queue.len();
        self.queue.clear();
        if cancelled > 0 || abandoned > 0 {
            tracing::debug!(cancelled, abandoned, "page torn down");
        }
    }
}

// ---------------------------------------------------------------------------
// WorkerProtocol
// ---------------------------------------------------------------------------

/// Default `onmessage`: PASS/FAIL become remote cases, DESC and log lines are
/// held for the report, DONE signals the gate.
pub struct WorkerProtocol;

impl WorkerProtocol {
    pub fn handle(page: &mut Page, worker: &str, message: WorkerMessage) {
        let origin = Origin::Worker(worker.to_string());
        match message {
            WorkerMessage::Pass(text) => {
                page.suite_mut().record_remote(origin, true, text);
            }
            WorkerMessage::Fail(text) => {
                page.suite_mut().record_remote(origin, false, text);
            }
            WorkerMessage::Description(text) | WorkerMessage::Log(text) => {
                page.write_line(format!("[{}] {}", worker, text));
            }
            WorkerMessage::Done => {
                page.signal(Signal::WorkerMessage(worker.to_string()));
            }
            WorkerMessage::Data(value) => {
                tracing::debug!(%worker, %value, "structured worker message ignored by protocol");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::GateStatus;
    use crate::host::ExpressionHost;
    use crate::report::{MemorySink, ReportStyle};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn page(gate: Gate) -> (Page, MemorySink) {
        let sink = MemorySink::new();
        let suite = SuiteContext::new("page", ExpressionHost::new());
        (Page::new(suite, gate, Reporter::new(sink.clone(), ReportStyle::WebKit)), sink)
    }

    #[test]
    fn test_runner_waits_for_gate() {
        let (mut page, sink) = page(Gate::counted(2));
        page.suite_mut().should_be("1", "1");
        page.queue(|page| {
            page.document_loaded("a");
        });
        page.set_timeout(5, |page| {
            assert_eq!(page.gate().status(), GateStatus::Pending);
            page.suite_mut().should_be("2", "2");
            page.document_loaded("b");
        });
        let outcome = page.run().unwrap();
        assert!(matches!(outcome, PageOutcome::Completed(ref s) if s.total == 2));
        assert_eq!(sink.lines().last().unwrap(), "TEST COMPLETE: 2 PASS, 0 FAIL");
        assert_eq!(page.run().unwrap(), outcome);
    }

    #[test]
    fn test_zero_threshold_runs_after_setup() {
        let (mut page, sink) = page(Gate::counted(0));
        page.queue(|page| {
            page.suite_mut().should_be("1", "1");
        });
        let outcome = page.run().unwrap();
        assert!(matches!(outcome, PageOutcome::Completed(ref s) if s.total == 1));
        assert_eq!(sink.lines()[0], "PASS 1 is 1");
    }

    #[test]
    fn test_starved_page_never_reports() {
        let (mut page, sink) = page(Gate::counted(2));
        page.suite_mut().should_be("1", "1");
        page.queue(|page| {
            page.finish_test();
        });
        let outcome = page.run().unwrap();
        assert_eq!(outcome, PageOutcome::Starved { received: 1, required: 2 });
        assert!(sink.lines().is_empty());
    }

    #[test]
    fn test_timers_fire_in_due_order() {
        let (mut page, _sink) = page(Gate::counted(1));
        let order = Rc::new(RefCell::new(Vec::new()));
        for (delay, tag) in [(30, "c"), (10, "a"), (10, "b")] {
            let order = Rc::clone(&order);
            page.set_timeout(delay, move |page| {
                order.borrow_mut().push((tag, page.now()));
            });
        }
        let cancelled = page.set_timeout(20, |_| panic!("cancelled timer fired"));
        assert!(page.clear_timeout(cancelled));
        page.set_timeout(40, |page| {
            page.finish_test();
        });
        page.run().unwrap();
        assert_eq!(*order.borrow(), vec![("a", 10), ("b", 10), ("c", 30)]);
    }

    #[test]
    fn test_minimum_delay() {
        let (mut page, _sink) = page(Gate::counted(1));
        page.set_timeout(0, |page| {
            assert_eq!(page.now(), 1);
            assert!(page.current_timer().is_some());
            page.finish_test();
        });
        page.run().unwrap();
    }

    #[test]
    fn test_teardown_cancels_pending_timers() {
        let (mut page, _sink) = page(Gate::counted(1));
        page.set_timeout(100, |_| panic!("timer outlived the suite"));
        page.queue(|page| {
            page.finish_test();
        });
        page.run().unwrap();
        assert_eq!(page.pending_timers(), 0);
    }

    #[test]
    fn test_worker_results_follow_local_ones() {
        let (mut page, sink) = page(Gate::counted(1));
        page.suite_mut().should_be("1+1", "2");
        page.spawn_worker("w", |scope| {
            scope.post_message("PASS: computed in worker").unwrap();
            scope.post_message("DONE").unwrap();
        })
        .unwrap();
        page.run().unwrap();
        assert_eq!(
            sink.lines(),
            vec![
                "PASS 1+1 is 2".to_string(),
                "[w] PASS computed in worker".to_string(),
                "TEST COMPLETE: 2 PASS, 0 FAIL".to_string(),
            ]
        );
    }

    #[test]
    fn test_custom_message_handler() {
        let (mut page, _sink) = page(Gate::counted(1));
        let handle = page
            .spawn_worker("echo", |scope| {
                while let Some(msg) = scope.recv() {
                    scope.post(msg).unwrap();
                }
            })
            .unwrap();
        handle.post_message("{\"value\": 3}").unwrap();
        page.on_message("echo", move |page, _worker, message| {
            if let WorkerMessage::Data(value) = message {
                page.suite_mut().assert_equals("echoed", 3, value["value"].as_f64().unwrap_or(0.0));
                page.finish_test();
            }
        });
        let outcome = page.run().unwrap();
        assert!(matches!(outcome, PageOutcome::Completed(ref s) if s.passed == 1));
        drop(handle);
    }

    #[test]
    fn test_worker_exit_without_done_starves() {
        let (mut page, _sink) = page(Gate::counted(1));
        page.spawn_worker("quiet", |_scope| {}).unwrap();
        let outcome = page.run().unwrap();
        assert_eq!(outcome, PageOutcome::Starved { received: 0, required: 1 });
    }

    #[test]
    fn test_starved_page_discards_held_lines() {
        let (mut page, sink) = page(Gate::counted(2));
        page.suite_mut().set_summary("header");
        page.spawn_worker("w", |scope| {
            scope.post_message("DESC: worker says hi").unwrap();
        })
        .unwrap();
        let outcome = page.run().unwrap();
        assert_eq!(outcome, PageOutcome::Starved { received: 0, required: 2 });
        assert!(sink.lines().is_empty());
    }

    #[test]
    fn test_header_and_worker_lines_lead_the_report() {
        let (mut page, sink) = page(Gate::counted(1));
        page.suite_mut().set_summary("header");
        page.suite_mut().should_be("1", "1");
        page.spawn_worker("w", |scope| {
            scope.post_message("DESC: worker says hi").unwrap();
            scope.post_message("DONE").unwrap();
        })
        .unwrap();
        page.run().unwrap();
        assert_eq!(
            sink.lines(),
            vec![
                "header".to_string(),
                "[w] worker says hi".to_string(),
                "PASS 1 is 1".to_string(),
                "TEST COMPLETE: 1 PASS, 0 FAIL".to_string(),
            ]
        );
    }

    #[test]
    fn test_huge_delay_saturates_the_clock() {
        let (mut page, _sink) = page(Gate::counted(1));
        page.set_timeout(10, |page| {
            page.set_timeout(u64::MAX, |page| {
                page.finish_test();
            });
        });
        let outcome = page.run().unwrap();
        assert!(matches!(outcome, PageOutcome::Completed(_)));
        assert_eq!(page.now(), u64::MAX);
    }

    #[test]
    fn test_with_sink_uses_configured_style() {
        let sink = MemorySink::new();
        let config = crate::config::HarnessConfig {
            report_style: ReportStyle::Mozilla,
            ..Default::default()
        };
        let suite = SuiteContext::with_config("cfg", ExpressionHost::new(), config);
        let mut page = Page::with_sink(suite, Gate::counted(0), sink.clone());
        page.suite_mut().record_case("s", "one", 1, 1);
        page.run().unwrap();
        assert_eq!(sink.lines()[0], "one = 1 PASSED!");
    }
}
