use std::time::{Duration, Instant};

pub const DEFAULT_THROTTLE_INTERVAL: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    RenderNow,
    /// Render after this wait unless a newer update replaces it.
    Defer(Duration),
}

/// Decides when a progress update may reach the renderer.
///
/// Holds no timers; the caller schedules deferred renders and reports every
/// render back through [`Throttle::mark_rendered`].
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    last_render: Option<Instant>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_render: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn decide(&self, now: Instant) -> ThrottleDecision {
        match self.last_render {
            None => ThrottleDecision::RenderNow,
            Some(last) => {
                let since = now.saturating_duration_since(last);
                if since >= self.interval {
                    ThrottleDecision::RenderNow
                } else {
                    ThrottleDecision::Defer(self.interval - since)
                }
            }
        }
    }

    pub fn mark_rendered(&mut self, now: Instant) {
        self.last_render = Some(now);
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(DEFAULT_THROTTLE_INTERVAL)
    }
}
