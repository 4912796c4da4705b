use std::collections::BTreeMap;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use super::{format_eta, format_rate};
use crate::{Phase, ProgressEvent};

static PAIR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\w+)=\s*(\S+)$").expect("pair pattern compiles"));
static STATS_TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"time=\s*(-?[\d:.]+)").expect("time pattern compiles"));
static STATS_SPEED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"speed=\s*([\d.]+)x").expect("speed pattern compiles"));
static STATS_SIZE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"size=\s*(\d+)\s*(?:kB|KiB)").expect("size pattern compiles"));

/// Placeholder ceiling while the total duration is unknown.
const UNKNOWN_TOTAL_CEILING: u8 = 99;

/// Parser for the transcoder's `-progress` output: one `key=value` pair per
/// line, accumulated into a running record.
#[derive(Debug)]
pub struct TranscodeGrammar {
    total: Option<f64>,
    phase: Phase,
    record: BTreeMap<String, String>,
    elapsed: f64,
    bytes: Option<u64>,
}

impl TranscodeGrammar {
    /// `total` is the media duration in seconds, if it could be probed.
    pub fn new(total: Option<f64>) -> Self {
        Self {
            total: total.filter(|t| t.is_finite() && *t > 0.0),
            phase: Phase::Video,
            record: BTreeMap::new(),
            elapsed: 0.0,
            bytes: None,
        }
    }

    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.phase = phase;
        self
    }

    /// Latest raw value seen for `key`.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.record.get(key).map(String::as_str)
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed
    }

    /// Latest `speed=N.NNx` reported by the transcoder.
    fn reported_speed(&self) -> Option<f64> {
        let value = self.value("speed")?.trim().trim_end_matches('x');
        value
            .parse::<f64>()
            .ok()
            .filter(|speed| speed.is_finite() && *speed > 0.0)
    }

    pub(super) fn parse_line(&mut self, line: &str, wall: Duration) -> Option<ProgressEvent> {
        let elapsed = if let Some(caps) = PAIR_RE.captures(line) {
            let key = &caps[1];
            let value = &caps[2];
            self.record.insert(key.to_string(), value.to_string());
            match key {
                // Both keys carry microseconds despite the name.
                "out_time_us" | "out_time_ms" => parse_micros(value)?,
                "out_time" => parse_clock(value)?,
                "total_size" => {
                    if let Ok(bytes) = value.parse::<u64>() {
                        self.bytes = Some(bytes);
                    }
                    return None;
                }
                _ => return None,
            }
        } else if let Some(caps) = STATS_TIME_RE.captures(line) {
            if let Some(speed) = STATS_SPEED_RE.captures(line) {
                self.record.insert("speed".to_string(), format!("{}x", &speed[1]));
            }
            if let Some(size) = STATS_SIZE_RE.captures(line) {
                if let Ok(kib) = size[1].parse::<u64>() {
                    self.bytes = Some(kib * 1024);
                }
            }
            parse_clock(&caps[1])?
        } else {
            return None;
        };

        self.elapsed = elapsed;
        Some(self.event(wall))
    }

    fn event(&self, wall: Duration) -> ProgressEvent {
        let wall_secs = wall.as_secs_f64();
        let percent = match self.total {
            Some(total) => (self.elapsed / total * 100.0).round().min(100.0) as u8,
            None => {
                let ratio = self.elapsed / (self.elapsed + 1.0);
                ((ratio * 100.0).round() as u8).min(UNKNOWN_TOTAL_CEILING)
            }
        };

        let speed = match self.bytes {
            Some(bytes) if wall_secs > 0.0 => format_rate(bytes as f64 / wall_secs),
            _ => "Unknown".to_string(),
        };

        // Media seconds per wall second: the transcoder's own speed, else the average.
        let rate = self
            .reported_speed()
            .or_else(|| (wall_secs > 0.0).then(|| self.elapsed / wall_secs));
        let eta = match (self.total, rate) {
            (Some(total), Some(rate)) if self.elapsed > 0.0 && rate > 0.0 => {
                format_eta((total - self.elapsed).max(0.0) / rate)
            }
            _ => "Unknown".to_string(),
        };

        ProgressEvent::new(percent, self.phase, speed, eta)
    }
}

fn parse_micros(value: &str) -> Option<f64> {
    let micros = value.parse::<i64>().ok()?;
    if micros < 0 {
        return None;
    }
    Some(micros as f64 / 1_000_000.0)
}

/// Parses `HH:MM:SS.frac`, `MM:SS` or `SS` into seconds.
pub fn parse_clock(value: &str) -> Option<f64> {
    let value = value.trim();
    if value.is_empty() || value.starts_with('-') {
        return None;
    }
    let mut seconds = 0.0;
    let mut scale = 1.0;
    for (i, part) in value.rsplit(':').enumerate() {
        if i > 2 {
            return None;
        }
        let part: f64 = part.parse().ok()?;
        if !part.is_finite() || part < 0.0 {
            return None;
        }
        seconds += part * scale;
        scale *= 60.0;
    }
    Some(seconds)
}
