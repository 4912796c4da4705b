use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use mediagrab_core::{ProgressEvent, Throttle, ThrottleDecision};
use mediagrab_logging::grab_trace;
use tokio::task::JoinHandle;

use crate::sink::ProgressSink;

struct EmitterState {
    throttle: Throttle,
    latest: Option<ProgressEvent>,
    /// `latest` has not reached the sink yet.
    dirty: bool,
    last_rendered: Option<ProgressEvent>,
    pending: Option<JoinHandle<()>>,
    /// Bumped for every scheduled render; a stale timer leaves state alone.
    generation: u64,
    stopped: bool,
}

struct Inner {
    state: Mutex<EmitterState>,
    sink: Arc<dyn ProgressSink>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, EmitterState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Marks `latest` as rendered and hands it out. The caller emits it after
    /// releasing the lock so a sink may call back into the emitter.
    fn take_render(state: &mut EmitterState) -> Option<ProgressEvent> {
        if !state.dirty {
            return None;
        }
        let event = state.latest.clone()?;
        state.dirty = false;
        state.throttle.mark_rendered(now());
        state.last_rendered = Some(event.clone());
        Some(event)
    }

    fn render_deferred(&self, generation: u64) {
        let event = {
            let mut state = self.lock();
            if state.stopped || state.generation != generation {
                return;
            }
            state.pending = None;
            Self::take_render(&mut state)
        };
        if let Some(event) = event {
            self.sink.emit(&event);
        }
    }
}

fn now() -> std::time::Instant {
    tokio::time::Instant::now().into_std()
}

/// Rate limits renders to one per interval while guaranteeing that the last
/// update before [`ThrottledEmitter::stop`] is rendered.
///
/// Deferred renders are tokio tasks, so updates must come from inside a
/// runtime.
#[derive(Clone)]
pub struct ThrottledEmitter {
    inner: Arc<Inner>,
}

impl ThrottledEmitter {
    pub fn new(interval: Duration, sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(EmitterState {
                    throttle: Throttle::new(interval),
                    latest: None,
                    dirty: false,
                    last_rendered: None,
                    pending: None,
                    generation: 0,
                    stopped: false,
                }),
                sink,
            }),
        }
    }

    pub fn update(&self, event: ProgressEvent) {
        let render = {
            let mut state = self.inner.lock();
            if state.stopped {
                return;
            }
            state.latest = Some(event);
            state.dirty = true;
            if let Some(pending) = state.pending.take() {
                pending.abort();
            }
            match state.throttle.decide(now()) {
                ThrottleDecision::RenderNow => Inner::take_render(&mut state),
                ThrottleDecision::Defer(wait) => {
                    grab_trace!("deferring render by {:?}", wait);
                    state.generation += 1;
                    let generation = state.generation;
                    let inner = Arc::clone(&self.inner);
                    state.pending = Some(tokio::spawn(async move {
                        tokio::time::sleep(wait).await;
                        inner.render_deferred(generation);
                    }));
                    None
                }
            }
        };
        if let Some(event) = render {
            self.inner.sink.emit(&event);
        }
    }

    /// Cancels any deferred render, flushes the latest update and finishes the
    /// sink. Returns `false` if the emitter was already stopped.
    pub fn stop(&self) -> bool {
        let render = {
            let mut state = self.inner.lock();
            if state.stopped {
                return false;
            }
            state.stopped = true;
            if let Some(pending) = state.pending.take() {
                pending.abort();
            }
            Inner::take_render(&mut state)
        };
        if let Some(event) = render {
            self.inner.sink.emit(&event);
        }
        self.inner.sink.finish();
        true
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.lock().stopped
    }

    pub fn last_rendered(&self) -> Option<ProgressEvent> {
        self.inner.lock().last_rendered.clone()
    }

    /// Handle that can only stop this emitter.
    pub fn control(&self) -> EmitterControl {
        EmitterControl {
            emitter: self.clone(),
        }
    }
}

/// Stop-only view of a running emitter, handed to cancellation triggers.
#[derive(Clone)]
pub struct EmitterControl {
    emitter: ThrottledEmitter,
}

impl EmitterControl {
    pub fn stop(&self) -> bool {
        self.emitter.stop()
    }

    pub fn is_stopped(&self) -> bool {
        self.emitter.is_stopped()
    }
}
