//! Conformance harness: test-case records, assertions and async gating for
//! engine and DOM conformance suites
//!
//! The harness is what a conformance test script links against. It records
//! `TestCase`s through the `shouldBe`/`shouldThrow`/`assertEquals` families,
//! normalizes values and exceptions across engines, defers the report until
//! every asynchronous prerequisite has arrived, and prints one line per case.
//! The engine or DOM under test is a black box behind the [`Host`] trait.
//!
//! # Quick Start
//!
//! ```
//! use conformance_harness::{runner, ExpressionHost, MemorySink, ReportStyle, Reporter, SuiteContext};
//!
//! fn main() -> conformance_harness::Result<()> {
//!     let mut suite = SuiteContext::new("arith", ExpressionHost::new());
//!     suite.should_be("1+1", "2");
//!     suite.should_throw("null.x", None);
//!
//!     let sink = MemorySink::new();
//!     let mut reporter = Reporter::new(sink.clone(), ReportStyle::WebKit);
//!     let summary = runner::run(&mut suite, &mut reporter)?;
//!     assert_eq!(summary.passed, 2);
//!     assert_eq!(sink.lines()[0], "PASS 1+1 is 2");
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! Probe → [`assertions`] → [`testcase`] log → [`gate`] → [`runner`] → [`report`]
//!
//! | Category | Modules |
//! |----------|---------|
//! | **Values** | [`value`], [`host`] |
//! | **Recording** | [`testcase`], [`suite`], [`assertions`] |
//! | **Execution** | [`gate`], [`page`], [`runner`] |
//! | **Output** | [`report`], [`logging`] |
//! | **Setup** | [`config`], [`error`](Error) |

pub mod assertions;
pub mod config;
pub mod gate;
pub mod host;
pub mod logging;
pub mod page;
pub mod prelude;
pub mod report;
pub mod runner;
pub mod suite;
pub mod testcase;
pub mod value;

mod error;

pub use config::HarnessConfig;
pub use error::{Error, Result};
pub use gate::{Gate, GateStatus, Signal, Transition};
pub use host::{thunk, ExpressionHost, Host, Probe};
pub use page::{Page, PageOutcome, TimerId, WorkerMessage, WorkerProtocol};
pub use report::{MemorySink, ReportSink, ReportStyle, Reporter, SuiteSummary};
pub use suite::SuiteContext;
pub use testcase::{Origin, TestCase};
pub use value::{Comparison, Exception, ExceptionKind, ObjectRef, Value};

/// Harness version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
