//! Asynchronous readiness gate
//!
//! A counted rendezvous deciding when a suite's synchronous runner may run.
//! The gate moves `Pending -> Complete` once and never back. Completion is
//! decided at each signal, never by polling, and only on an exact match
//! with the required count (or once every required flag is set).
//!
//! The gate does not defend against overshoot: signals arriving after
//! completion are ignored and logged, and callers are expected to keep a
//! one-to-one mapping between signals and expectations.

use std::collections::BTreeSet;
use std::fmt;

/// Gate state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStatus {
    Pending,
    Complete,
}

impl fmt::Display for GateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateStatus::Pending => write!(f, "pending"),
            GateStatus::Complete => write!(f, "complete"),
        }
    }
}

/// An external readiness signal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// A document finished loading
    DocumentLoaded(String),
    /// A worker delivered one unit of async work
    WorkerMessage(String),
    /// A timer fired
    TimerFired(u64),
    /// The test body declared itself finished (`finishJSTest`/`completeTest`)
    Finished,
    /// A named flag was raised
    Flag(String),
}

impl Signal {
    /// Name used when matching against flag-based readiness
    fn flag_name(&self) -> Option<&str> {
        match self {
            Signal::DocumentLoaded(name) | Signal::WorkerMessage(name) | Signal::Flag(name) => {
                Some(name)
            }
            Signal::TimerFired(_) | Signal::Finished => None,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::DocumentLoaded(name) => write!(f, "document-loaded({})", name),
            Signal::WorkerMessage(name) => write!(f, "worker-message({})", name),
            Signal::TimerFired(id) => write!(f, "timer-fired({})", id),
            Signal::Finished => write!(f, "finished"),
            Signal::Flag(name) => write!(f, "flag({})", name),
        }
    }
}

/// What the gate waits for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    /// Exactly this many signals
    Count(usize),
    /// Every one of these named flags
    Flags(BTreeSet<String>),
}

/// Result of delivering a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Still waiting
    Pending { received: usize, required: usize },
    /// This signal completed the gate
    Completed,
    /// The signal did not count (gate already complete, unknown or repeated flag)
    Ignored,
}

/// Counted rendezvous gating one suite run
#[derive(Debug, Clone)]
pub struct Gate {
    readiness: Readiness,
    received: usize,
    raised: BTreeSet<String>,
    status: GateStatus,
    runner_released: bool,
}

impl Gate {
    /// Counted gate with an explicit threshold
    pub fn new(required: usize) -> Self {
        Self::counted(required)
    }

    /// Wait for exactly `required` signals. A threshold of zero is complete
    /// from the start.
    pub fn counted(required: usize) -> Self {
        Self {
            readiness: Readiness::Count(required),
            received: 0,
            raised: BTreeSet::new(),
            status: if required == 0 {
                GateStatus::Complete
            } else {
                GateStatus::Pending
            },
            runner_released: false,
        }
    }

    /// Wait until every named flag has been raised once
    pub fn flags<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: BTreeSet<String> = names.into_iter().map(Into::into).collect();
        let status = if names.is_empty() {
            GateStatus::Complete
        } else {
            GateStatus::Pending
        };
        Self {
            readiness: Readiness::Flags(names),
            received: 0,
            raised: BTreeSet::new(),
            status,
            runner_released: false,
        }
    }

    pub fn readiness(&self) -> &Readiness {
        &self.readiness
    }

    pub fn status(&self) -> GateStatus {
        self.status
    }

    pub fn is_complete(&self) -> bool {
        self.status == GateStatus::Complete
    }

    /// Signals that counted towards completion
    pub fn received(&self) -> usize {
        self.received
    }

    /// Signals needed in total
    pub fn required(&self) -> usize {
        match &self.readiness {
            Readiness::Count(n) => *n,
            Readiness::Flags(names) => names.len(),
        }
    }

    /// Deliver one signal
    pub fn signal(&mut self, signal: &Signal) -> Transition {
        if self.is_complete() {
            tracing::warn!(%signal, received = self.received, required = self.required(),
                "signal after gate completion ignored");
            return Transition::Ignored;
        }

        match &self.readiness {
            Readiness::Count(_) => {
                self.received += 1;
            }
            Readiness::Flags(names) => {
                let name = match signal.flag_name() {
                    Some(name) if names.contains(name) => name,
                    _ => {
                        tracing::warn!(%signal, "signal does not match any required flag");
                        return Transition::Ignored;
                    }
                };
                if !self.raised.insert(name.to_string()) {
                    tracing::warn!(%signal, "flag raised twice");
                    return Transition::Ignored;
                }
                self.received += 1;
            }
        }

        if self.received == self.required() {
            self.status = GateStatus::Complete;
            tracing::info!(%signal, required = self.required(), "gate complete");
            Transition::Completed
        } else {
            tracing::debug!(%signal, received = self.received, required = self.required(), "gate pending");
            Transition::Pending {
                received: self.received,
                required: self.required(),
            }
        }
    }

    /// Hand out the single runner invocation this gate unblocks. Returns
    /// `true` exactly once, and only after completion.
    pub fn release_runner(&mut self) -> bool {
        if self.is_complete() && !self.runner_released {
            self.runner_released = true;
            true
        } else {
            false
        }
    }

    /// Whether the runner invocation has been handed out
    pub fn runner_released(&self) -> bool {
        self.runner_released
    }

    /// Tear down for a fresh page load
    pub fn reset(&mut self) {
        let readiness = self.readiness.clone();
        *self = match readiness {
            Readiness::Count(n) => Gate::counted(n),
            Readiness::Flags(names) => Gate::flags(names),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counted_gate_completes_on_exact_count() {
        let mut gate = Gate::counted(2);
        assert_eq!(gate.status(), GateStatus::Pending);
        assert!(!gate.release_runner());
        assert_eq!(
            gate.signal(&Signal::DocumentLoaded("a".into())),
            Transition::Pending { received: 1, required: 2 }
        );
        assert!(!gate.release_runner());
        assert_eq!(gate.signal(&Signal::TimerFired(1)), Transition::Completed);
        assert!(gate.is_complete());
        assert!(gate.release_runner());
        assert!(!gate.release_runner());
    }

    #[test]
    fn test_overshoot_is_ignored() {
        let mut gate = Gate::counted(1);
        assert_eq!(gate.signal(&Signal::Finished), Transition::Completed);
        assert_eq!(gate.signal(&Signal::Finished), Transition::Ignored);
        assert_eq!(gate.received(), 1);
        assert!(gate.is_complete());
    }

    #[test]
    fn test_zero_threshold_is_complete_immediately() {
        let mut gate = Gate::counted(0);
        assert!(gate.is_complete());
        assert!(gate.release_runner());
    }

    #[test]
    fn test_flag_gate() {
        let mut gate = Gate::flags(["staff", "hc_staff"]);
        assert_eq!(gate.required(), 2);
        assert_eq!(gate.signal(&Signal::DocumentLoaded("other".into())), Transition::Ignored);
        assert!(matches!(gate.signal(&Signal::DocumentLoaded("staff".into())), Transition::Pending { .. }));
        assert_eq!(gate.signal(&Signal::DocumentLoaded("staff".into())), Transition::Ignored);
        assert_eq!(gate.signal(&Signal::TimerFired(3)), Transition::Ignored);
        assert_eq!(gate.signal(&Signal::Flag("hc_staff".into())), Transition::Completed);
    }

    #[test]
    fn test_reset_restores_pending() {
        let mut gate = Gate::counted(1);
        gate.signal(&Signal::Finished);
        assert!(gate.release_runner());
        gate.reset();
        assert_eq!(gate.status(), GateStatus::Pending);
        assert_eq!(gate.received(), 0);
        assert!(!gate.runner_released());
    }
}
