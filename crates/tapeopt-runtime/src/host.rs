//! Interactive runs driven from an async host.
//!
//! The interpreter is synchronous, so it runs on a blocking thread. Each
//! `Input` instruction posts an [`InputRequest`] that the host answers from
//! its own loop (a prompt, a socket, stdin).

use crate::input::{ChannelInput, InputRequest};
use crate::interpreter::Execution;
use crate::Runtime;
use std::time::Duration;
use tapeopt_core::{Error, Result};
use tapeopt_ir::Program;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// A running interpretation waiting on its host for input
pub struct InteractiveRun {
    /// Pending input requests, one per executed `Input`
    pub requests: mpsc::Receiver<InputRequest>,
    cancel: CancellationToken,
    handle: JoinHandle<Result<Execution>>,
}

impl InteractiveRun {
    /// Token that aborts any pending or future input request
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the interpreter to finish
    pub async fn finish(self) -> Result<Execution> {
        // Dropping the receiver makes further requests fail fast
        drop(self.requests);
        self.handle
            .await
            .map_err(|e| Error::InvalidState(format!("interpreter task failed: {}", e)))?
    }
}

/// Start `program` on a blocking thread of the current tokio runtime.
///
/// Must be called from within a tokio runtime.
pub fn spawn_interactive(runtime: &Runtime, program: Program) -> Result<InteractiveRun> {
    let handle = Handle::try_current()
        .map_err(|e| Error::InvalidState(format!("no async runtime available: {}", e)))?;

    let (tx, rx) = mpsc::channel(1);
    let cancel = CancellationToken::new();
    let timeout = runtime.config().input_timeout_ms.map(Duration::from_millis);
    let mut input = ChannelInput::new(tx, handle.clone(), timeout, cancel.clone());
    let interpreter = runtime.interpreter();

    debug!(instructions = program.len(), ?timeout, "Starting interactive run");
    let task = handle.spawn_blocking(move || {
        let result = interpreter.run(&program, &mut input);
        if let Ok(execution) = &result {
            info!(steps = execution.steps, "Interactive run finished");
        }
        result
    });

    Ok(InteractiveRun {
        requests: rx,
        cancel,
        handle: task,
    })
}
