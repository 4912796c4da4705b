use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::collision::CollisionPolicy;

pub type JobId = u64;

/// Which external tool drives a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobMode {
    /// Generic transcoder reading a direct media URL or file.
    Transcode,
    /// Site-aware fetcher that may download and merge several streams.
    Fetch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DownloadType {
    #[default]
    Video,
    AudioOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quality {
    P1440,
    #[default]
    P1080,
    P720,
    Best,
}

impl Quality {
    pub fn max_height(self) -> Option<u32> {
        match self {
            Quality::P1440 => Some(1440),
            Quality::P1080 => Some(1080),
            Quality::P720 => Some(720),
            Quality::Best => None,
        }
    }
}

impl FromStr for Quality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1440p" | "1440" => Ok(Quality::P1440),
            "1080p" | "1080" => Ok(Quality::P1080),
            "720p" | "720" => Ok(Quality::P720),
            "best" => Ok(Quality::Best),
            other => Err(format!("unknown quality {other:?}")),
        }
    }
}

/// Coarse stage of a download, used to label and color progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Video,
    Audio,
    Merging,
    Complete,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Phase::Video => "VIDEO",
            Phase::Audio => "AUDIO",
            Phase::Merging => "MERGING",
            Phase::Complete => "COMPLETE",
        }
    }
}

/// Normalized progress reported by either grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Overall job percent, 0..=100.
    pub percent: u8,
    pub phase: Phase,
    pub speed: String,
    pub eta: String,
}

impl ProgressEvent {
    pub fn new(percent: u8, phase: Phase, speed: impl Into<String>, eta: impl Into<String>) -> Self {
        Self {
            percent: percent.min(100),
            phase,
            speed: speed.into(),
            eta: eta.into(),
        }
    }

    /// Event rendered when a job finished successfully.
    pub fn finished(phase: Phase) -> Self {
        Self::new(100, phase, "", "Complete")
    }
}

/// A fully resolved download request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: JobId,
    pub source_url: String,
    pub mode: JobMode,
    pub download_type: DownloadType,
    pub quality: Quality,
    pub output_dir: PathBuf,
    /// Explicit target file. When absent the driver derives one.
    pub output_path: Option<PathBuf>,
    pub collision: CollisionPolicy,
}

impl Job {
    pub fn new(
        id: JobId,
        source_url: impl Into<String>,
        mode: JobMode,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id,
            source_url: source_url.into(),
            mode,
            download_type: DownloadType::default(),
            quality: Quality::default(),
            output_dir: output_dir.into(),
            output_path: None,
            collision: CollisionPolicy::default(),
        }
    }

    pub fn is_audio_only(&self) -> bool {
        self.download_type == DownloadType::AudioOnly
    }

    /// Phase a job starts in before any output has been parsed.
    pub fn initial_phase(&self) -> Phase {
        if self.is_audio_only() {
            Phase::Audio
        } else {
            Phase::Video
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// The executable could not be launched.
    Spawn(String),
    /// The process exited unsuccessfully; `None` means it was terminated by a signal.
    Exit(Option<i32>),
    Io(String),
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Spawn(message) => write!(f, "failed to start process: {message}"),
            FailureKind::Exit(Some(code)) => write!(f, "process failed with exit code {code}"),
            FailureKind::Exit(None) => write!(f, "process terminated by signal"),
            FailureKind::Io(message) => write!(f, "io error: {message}"),
        }
    }
}

/// Terminal result of a job. Exactly one is produced per job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded(PathBuf),
    /// The target existed and the collision policy said to leave it alone.
    Skipped(PathBuf),
    Cancelled,
    Failed(FailureKind),
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobOutcome::Succeeded(path) => write!(f, "downloaded {}", path.display()),
            JobOutcome::Skipped(path) => write!(f, "skipped existing {}", path.display()),
            JobOutcome::Cancelled => write!(f, "cancelled"),
            JobOutcome::Failed(kind) => write!(f, "failed: {kind}"),
        }
    }
}
