use std::sync::{Mutex, MutexGuard, PoisonError};

use mediagrab_logging::grab_info;
use tokio_util::sync::CancellationToken;

use crate::emitter::EmitterControl;
use crate::supervisor::ProcessHandle;

/// Callbacks through which a running job hands out its control surfaces.
pub trait JobHooks: Send + Sync {
    /// The job spawned its process.
    fn process_started(&self, handle: &ProcessHandle);

    /// The process exited; its handle should no longer be used.
    fn process_finished(&self) {}

    /// The job created its progress emitter.
    fn emitter_started(&self, control: &EmitterControl);

    /// Polled on every output line.
    fn is_cancelled(&self) -> bool;

    /// Awaited while the job prepares, so a slow helper process does not
    /// delay cancellation. Hooks without a token are only polled.
    fn cancellation_token(&self) -> Option<&CancellationToken> {
        None
    }
}

/// Control state of one job, shared by the driver and whoever may cancel it.
#[derive(Default)]
pub struct JobContext {
    token: CancellationToken,
    process: Mutex<Option<ProcessHandle>>,
    emitter: Mutex<Option<EmitterControl>>,
}

impl JobContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation: kills the process tree if one is running and
    /// stops the progress display. Cancellation cannot be undone. Returns
    /// `false` when the job was already cancelled.
    pub fn cancel(&self) -> bool {
        if self.token.is_cancelled() {
            return false;
        }
        self.token.cancel();
        grab_info!("cancellation requested");
        if let Some(process) = lock(&self.process).clone() {
            process.kill();
        }
        if let Some(emitter) = lock(&self.emitter).clone() {
            emitter.stop();
        }
        true
    }

    pub fn current_process(&self) -> Option<ProcessHandle> {
        lock(&self.process).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl JobHooks for JobContext {
    fn process_started(&self, handle: &ProcessHandle) {
        *lock(&self.process) = Some(handle.clone());
        // Cancelled while the process was being spawned.
        if self.token.is_cancelled() {
            handle.kill();
        }
    }

    fn process_finished(&self) {
        lock(&self.process).take();
    }

    fn emitter_started(&self, control: &EmitterControl) {
        *lock(&self.emitter) = Some(control.clone());
        if self.token.is_cancelled() {
            control.stop();
        }
    }

    fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    fn cancellation_token(&self) -> Option<&CancellationToken> {
        Some(&self.token)
    }
}
