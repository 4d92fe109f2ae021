//! Probe surface
//!
//! The harness never looks inside the engine or DOM under test. It only
//! needs something that can evaluate an expression and either return a value
//! or throw. [`Host`] is that capability; [`Probe`] is what assertion
//! primitives accept: an expression string, a closure, or an already known
//! [`Value`].

mod expr;

pub use expr::{Binding, ExpressionHost};

use crate::value::{Completion, Value};

/// The black-box engine/DOM under test
pub trait Host {
    /// Evaluate `source`, returning its value or the exception it threw
    fn evaluate(&mut self, source: &str) -> Completion;
}

/// Something an assertion primitive can evaluate and describe
pub trait Probe {
    /// Source text used as the TestCase description
    fn describe(&self) -> String;

    /// Run the probe against the host
    fn evaluate(self, host: &mut dyn Host) -> Completion;
}

impl Probe for &str {
    fn describe(&self) -> String {
        self.to_string()
    }

    fn evaluate(self, host: &mut dyn Host) -> Completion {
        host.evaluate(self)
    }
}

impl Probe for String {
    fn describe(&self) -> String {
        self.clone()
    }

    fn evaluate(self, host: &mut dyn Host) -> Completion {
        host.evaluate(&self)
    }
}

impl Probe for Value {
    fn describe(&self) -> String {
        self.stringify()
    }

    fn evaluate(self, _host: &mut dyn Host) -> Completion {
        Ok(self)
    }
}

/// A labelled closure probe, for operations that are not expressible as
/// source text (DOM mutations, calls into host objects).
pub struct Thunk<F> {
    label: String,
    f: F,
}

/// Wrap a closure as a probe
pub fn thunk<F>(label: impl Into<String>, f: F) -> Thunk<F>
where
    F: FnOnce(&mut dyn Host) -> Completion,
{
    Thunk {
        label: label.into(),
        f,
    }
}

impl<F> Probe for Thunk<F>
where
    F: FnOnce(&mut dyn Host) -> Completion,
{
    fn describe(&self) -> String {
        self.label.clone()
    }

    fn evaluate(self, host: &mut dyn Host) -> Completion {
        (self.f)(host)
    }
}
