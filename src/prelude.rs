//! Prelude module for convenient imports
//!
//! Everything a test script usually touches:
//!
//! ```
//! use conformance_harness::prelude::*;
//!
//! let mut suite = SuiteContext::new("prelude", ExpressionHost::new());
//! suite.should_be_nan("0/0");
//! assert!(suite.cases().last().unwrap().passed);
//! ```

// Values and the probe surface
pub use crate::host::{thunk, ExpressionHost, Host, Probe};
pub use crate::value::{dom_codes, Comparison, Completion, Exception, ExceptionKind, ObjectRef, Value};

// Recording
pub use crate::suite::SuiteContext;
pub use crate::testcase::{Origin, TestCase};

// Execution
pub use crate::gate::{Gate, Signal};
pub use crate::page::{Page, PageOutcome, WorkerMessage, WorkerScope};
pub use crate::runner;

// Output and setup
pub use crate::config::HarnessConfig;
pub use crate::error::{Error, Result};
pub use crate::report::{MemorySink, ReportStyle, Reporter, SuiteSummary, TracingSink, WriterSink};
