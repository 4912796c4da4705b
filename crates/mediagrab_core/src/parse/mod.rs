//! Line grammars of the two external tools, normalized into [`ProgressEvent`].
mod fetch;
mod transcode;

use std::time::{Duration, Instant};

pub use fetch::{FetchGrammar, MERGE_PERCENT};
pub use transcode::{parse_clock, TranscodeGrammar};

use crate::{Job, JobMode, ProgressEvent};

/// One variant per external tool.
#[derive(Debug)]
pub enum Grammar {
    Transcode(TranscodeGrammar),
    Fetch(FetchGrammar),
}

/// Stateful line parser for one job.
///
/// Percent never goes backwards: the parser remembers the highest percent it
/// produced and clamps later events to it.
#[derive(Debug)]
pub struct ProgressParser {
    grammar: Grammar,
    high_water: u8,
    started: Instant,
}

impl ProgressParser {
    pub fn new(grammar: Grammar) -> Self {
        Self {
            grammar,
            high_water: 0,
            started: Instant::now(),
        }
    }

    /// Picks the grammar matching the job mode. `total_duration` is only used in
    /// transcode mode.
    pub fn for_job(job: &Job, total_duration: Option<f64>) -> Self {
        let grammar = match job.mode {
            JobMode::Transcode => Grammar::Transcode(
                TranscodeGrammar::new(total_duration).with_phase(job.initial_phase()),
            ),
            JobMode::Fetch => Grammar::Fetch(FetchGrammar::new(job.initial_phase())),
        };
        Self::new(grammar)
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn high_water(&self) -> u8 {
        self.high_water
    }

    /// Parses a line using wall-clock time elapsed since the parser was created.
    pub fn parse(&mut self, line: &str) -> Option<ProgressEvent> {
        let wall = self.started.elapsed();
        self.parse_at(line, wall)
    }

    /// Parses a line with an explicit wall-clock time since job start.
    pub fn parse_at(&mut self, line: &str, wall: Duration) -> Option<ProgressEvent> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let mut event = match &mut self.grammar {
            Grammar::Transcode(grammar) => grammar.parse_line(line, wall),
            Grammar::Fetch(grammar) => grammar.parse_line(line),
        }?;
        event.percent = event.percent.min(100).max(self.high_water);
        self.high_water = event.percent;
        Some(event)
    }
}

/// Human readable byte rate, e.g. `1.50MiB/s`.
pub fn format_rate(bytes_per_sec: f64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    if !bytes_per_sec.is_finite() || bytes_per_sec < 0.0 {
        return "Unknown".to_string();
    }
    let mut value = bytes_per_sec;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.2}{}/s", UNITS[unit])
}

/// Remaining time as whole seconds, e.g. `42s`.
pub fn format_eta(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "Unknown".to_string();
    }
    format!("{}s", seconds.round() as u64)
}
