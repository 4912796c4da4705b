use std::sync::LazyLock;

use regex::Regex;

use crate::{Phase, ProgressEvent};

/// Percent shown while streams are merged or post-processed.
pub const MERGE_PERCENT: u8 = 95;

static PROGRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\[download\]\s+([0-9.]+)%\s+of\s+~?\s*([0-9.]+)(B|KiB|MiB|GiB|TiB)\s+at\s+([0-9.]+)(B|KiB|MiB|GiB|TiB)/s(?:\s+ETA\s+([0-9:]+))?",
    )
    .expect("progress pattern compiles")
});
static STREAM_DONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[download\]\s+100(?:\.0+)?%\s+of\s+~?\s*\S+\s+in\s").expect("done pattern compiles")
});
static FORMATS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Downloading (\d+) format\(s\)(?::\s*(\S+))?").expect("formats pattern compiles")
});

const AUDIO_MARKERS: [&str; 4] = ["audio only", ".m4a", "Extracting audio", "[ExtractAudio]"];
const MERGE_MARKERS: [&str; 3] = ["[Merger]", "Merging formats", "[Fixup"];
const DELETE_MARKER: &str = "Deleting original file";
const ALREADY_DOWNLOADED: &str = "has already been downloaded";

/// Parser for the fetcher's `--newline` progress output.
///
/// The fetcher reports percent per stream. When it announces several streams
/// (e.g. separate video and audio), per-stream percent is rescaled into a
/// single job percent.
#[derive(Debug)]
pub struct FetchGrammar {
    phase: Phase,
    total_streams: u32,
    stream_index: u32,
    last_percent: u8,
}

impl FetchGrammar {
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            total_streams: 1,
            stream_index: 0,
            last_percent: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn total_streams(&self) -> u32 {
        self.total_streams
    }

    pub fn stream_index(&self) -> u32 {
        self.stream_index
    }

    /// Moves to a given stream position. Out of range values are clamped.
    pub fn set_streams(&mut self, total: u32, index: u32) {
        self.total_streams = total.max(1);
        self.stream_index = index.min(self.total_streams - 1);
    }

    /// Job percent for a raw per-stream percent of the current stream.
    pub fn overall_percent(&self, raw: f64) -> u8 {
        let raw = if raw.is_finite() { raw.clamp(0.0, 100.0) } else { 0.0 };
        let overall = (f64::from(self.stream_index) * 100.0 + raw) / f64::from(self.total_streams);
        overall.round().min(100.0) as u8
    }

    pub(super) fn parse_line(&mut self, line: &str) -> Option<ProgressEvent> {
        if line.contains(DELETE_MARKER) {
            self.phase = Phase::Complete;
            return Some(self.event(100, "", ""));
        }
        if MERGE_MARKERS.iter().any(|m| line.contains(m)) {
            self.phase = Phase::Merging;
            return Some(self.event(MERGE_PERCENT, "", ""));
        }

        let flipped = self.phase == Phase::Video && AUDIO_MARKERS.iter().any(|m| line.contains(m));
        if flipped {
            self.phase = Phase::Audio;
        }

        if let Some(caps) = FORMATS_RE.captures(line) {
            let announced = caps[1].parse::<u32>().unwrap_or(1);
            let listed = caps
                .get(2)
                .map(|ids| ids.as_str().split('+').filter(|id| !id.is_empty()).count() as u32)
                .unwrap_or(0);
            self.set_streams(announced.max(listed), self.stream_index);
            return None;
        }

        if STREAM_DONE_RE.is_match(line) || line.contains(ALREADY_DOWNLOADED) {
            let percent = self.overall_percent(100.0);
            if self.stream_index + 1 < self.total_streams {
                self.stream_index += 1;
            }
            return Some(self.event(percent, "", ""));
        }

        if let Some(caps) = PROGRESS_RE.captures(line) {
            let raw = caps[1].parse::<f64>().ok()?;
            let speed = format!("{}{}/s", &caps[4], &caps[5]);
            let eta = caps.get(6).map_or("Unknown", |m| m.as_str()).to_string();
            let percent = self.overall_percent(raw);
            return Some(self.event(percent, speed, eta));
        }

        if flipped {
            return Some(self.event(self.last_percent, "", ""));
        }
        None
    }

    fn event(&mut self, percent: u8, speed: impl Into<String>, eta: impl Into<String>) -> ProgressEvent {
        self.last_percent = percent;
        ProgressEvent::new(percent, self.phase, speed, eta)
    }
}
