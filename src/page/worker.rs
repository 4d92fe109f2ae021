//! Worker contexts
//!
//! A worker runs on its own OS thread and talks to its page only through
//! messages. Everything it posts lands on the page's single consumer channel,
//! so per-worker message order is the only ordering guarantee.

use crate::error::{Error, Result};
use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

// ==================== Worker Messages ====================

/// A message crossing between a worker and its page
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerMessage {
    /// `PASS:<message>`
    Pass(String),
    /// `FAIL:<message>`
    Fail(String),
    /// `DESC:<description>`
    Description(String),
    /// `DONE`
    Done,
    /// Any other text
    Log(String),
    /// A small structured payload
    Data(serde_json::Value),
}

impl WorkerMessage {
    /// Parse the line protocol. Text that is none of the protocol prefixes is a
    /// log line, unless it is a JSON object or array.
    pub fn parse(text: &str) -> Self {
        if let Some(rest) = text.strip_prefix("PASS:") {
            return WorkerMessage::Pass(rest.trim_start().to_string());
        }
        if let Some(rest) = text.strip_prefix("FAIL:") {
            return WorkerMessage::Fail(rest.trim_start().to_string());
        }
        if let Some(rest) = text.strip_prefix("DESC:") {
            return WorkerMessage::Description(rest.trim_start().to_string());
        }
        if text.trim() == "DONE" {
            return WorkerMessage::Done;
        }
        let trimmed = text.trim_start();
        if trimmed.starts_with('{') || trimmed.starts_with('[') {
            if let Ok(value) = serde_json::from_str(trimmed) {
                return WorkerMessage::Data(value);
            }
        }
        WorkerMessage::Log(text.to_string())
    }
}

impl fmt::Display for WorkerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerMessage::Pass(m) => write!(f, "PASS:{}", m),
            WorkerMessage::Fail(m) => write!(f, "FAIL:{}", m),
            WorkerMessage::Description(m) => write!(f, "DESC:{}", m),
            WorkerMessage::Done => write!(f, "DONE"),
            WorkerMessage::Log(m) => write!(f, "{}", m),
            WorkerMessage::Data(v) => write!(f, "{}", v),
        }
    }
}

/// What travels on the page's channel
#[derive(Debug)]
pub(crate) enum Envelope {
    Message { worker: String, message: WorkerMessage },
    Exited { worker: String },
}

// ==================== Worker ====================

/// Worker lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Running,
    Terminated,
}

/// The worker's side: posts to the page, receives from the page
pub struct WorkerScope {
    name: String,
    outbox: Sender<Envelope>,
    inbox: Receiver<WorkerMessage>,
}

impl WorkerScope {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `postMessage(text)` using the line protocol
    pub fn post_message(&self, text: &str) -> Result<()> {
        self.post(WorkerMessage::parse(text))
    }

    pub fn post(&self, message: WorkerMessage) -> Result<()> {
        self.outbox
            .send(Envelope::Message {
                worker: self.name.clone(),
                message,
            })
            .map_err(|_| Error::ChannelClosed(self.name.clone()))
    }

    pub fn post_json(&self, value: serde_json::Value) -> Result<()> {
        self.post(WorkerMessage::Data(value))
    }

    /// Block until the page posts something. `None` once the page dropped
    /// its handle.
    pub fn recv(&self) -> Option<WorkerMessage> {
        self.inbox.recv().ok()
    }

    pub fn try_recv(&self) -> Option<WorkerMessage> {
        self.inbox.try_recv().ok()
    }
}

/// Reports the worker's exit to the page, also when the body panics
struct ExitGuard {
    name: String,
    outbox: Sender<Envelope>,
    state: Arc<Mutex<WorkerState>>,
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            *state = WorkerState::Terminated;
        }
        let _ = self.outbox.send(Envelope::Exited {
            worker: self.name.clone(),
        });
    }
}

/// The page's side of a worker
pub struct WorkerHandle {
    name: String,
    inbox: Sender<WorkerMessage>,
    state: Arc<Mutex<WorkerState>>,
    thread: Option<JoinHandle<()>>,
}

impl fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("name", &self.name)
            .field("state", &self.state())
            .finish()
    }
}

impl WorkerHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> WorkerState {
        match self.state.lock() {
            Ok(state) => *state,
            Err(_) => WorkerState::Terminated,
        }
    }

    /// Post to the worker's inbox
    pub fn post_message(&self, text: &str) -> Result<()> {
        self.inbox
            .send(WorkerMessage::parse(text))
            .map_err(|_| Error::ChannelClosed(self.name.clone()))
    }

    /// Wait for the worker thread to finish
    pub fn join(mut self) -> Result<()> {
        match self.thread.take() {
            Some(thread) => thread
                .join()
                .map_err(|_| Error::ChannelClosed(self.name.clone())),
            None => Ok(()),
        }
    }
}

/// The thread body. The exit guard only exists once the thread runs, so a
/// worker that never started never reports an exit.
fn entry<F>(scope: WorkerScope, state: Arc<Mutex<WorkerState>>, body: F) -> impl FnOnce() + Send + 'static
where
    F: FnOnce(WorkerScope) + Send + 'static,
{
    move || {
        let _guard = ExitGuard {
            name: scope.name.clone(),
            outbox: scope.outbox.clone(),
            state,
        };
        body(scope);
    }
}

/// Start `body` on a new thread
pub(crate) fn spawn<F>(name: String, outbox: Sender<Envelope>, body: F) -> Result<WorkerHandle>
where
    F: FnOnce(WorkerScope) + Send + 'static,
{
    let (inbox_tx, inbox_rx) = mpsc::channel();
    let state = Arc::new(Mutex::new(WorkerState::Running));
    let scope = WorkerScope {
        name: name.clone(),
        outbox,
        inbox: inbox_rx,
    };

    let thread = thread::Builder::new()
        .name(format!("worker-{}", name))
        .spawn(entry(scope, Arc::clone(&state), body))?;

    tracing::debug!(worker = %name, "worker started");
    Ok(WorkerHandle {
        name,
        inbox: inbox_tx,
        state,
        thread: Some(thread),
    })
}
