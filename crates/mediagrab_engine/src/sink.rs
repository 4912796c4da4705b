use std::sync::mpsc;
use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressStyle};
use mediagrab_core::{Phase, ProgressEvent};

/// Receives throttled progress renders.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: &ProgressEvent);

    /// Called once when the emitter stops, after the final render.
    fn finish(&self) {}
}

/// Forwards renders to a channel, e.g. for a UI living on another thread.
pub struct ChannelProgressSink {
    tx: mpsc::Sender<ProgressEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: mpsc::Sender<ProgressEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: &ProgressEvent) {
        let _ = self.tx.send(event.clone());
    }
}

const VIDEO_TEMPLATE: &str =
    "{prefix:.cyan.bold} [{bar:40.cyan/blue}] {pos:>3}% | {msg}";
const AUDIO_TEMPLATE: &str =
    "{prefix:.yellow.bold} [{bar:40.yellow/blue}] {pos:>3}% | {msg}";

/// Terminal bar labelled and colored by phase.
pub struct IndicatifSink {
    bar: ProgressBar,
    phase: Mutex<Option<Phase>>,
}

impl IndicatifSink {
    pub fn new() -> Self {
        Self::with_bar(ProgressBar::new(100))
    }

    /// Wraps an existing bar, e.g. one attached to a `MultiProgress` or a
    /// hidden one in tests.
    pub fn with_bar(bar: ProgressBar) -> Self {
        Self {
            bar,
            phase: Mutex::new(None),
        }
    }

    pub fn bar(&self) -> &ProgressBar {
        &self.bar
    }

    fn apply_phase(&self, phase: Phase) {
        let mut current = self.phase.lock().unwrap_or_else(|e| e.into_inner());
        if *current == Some(phase) {
            return;
        }
        *current = Some(phase);
        let template = match phase {
            Phase::Audio => AUDIO_TEMPLATE,
            Phase::Video | Phase::Merging | Phase::Complete => VIDEO_TEMPLATE,
        };
        let style = ProgressStyle::with_template(template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        self.bar.set_style(style);
        self.bar.set_prefix(format!("[{}]", phase.label()));
    }
}

impl Default for IndicatifSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for IndicatifSink {
    fn emit(&self, event: &ProgressEvent) {
        self.apply_phase(event.phase);
        self.bar.set_position(u64::from(event.percent));
        self.bar
            .set_message(format!("Speed: {} | ETA: {}", event.speed, event.eta));
    }

    fn finish(&self) {
        self.bar.finish();
    }
}
