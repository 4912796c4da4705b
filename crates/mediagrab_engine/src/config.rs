use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use mediagrab_core::DEFAULT_THROTTLE_INTERVAL;

/// How to launch one external tool. `prefix_args` go before the arguments the
/// drivers build, e.g. `python -m yt_dlp`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: PathBuf,
    pub prefix_args: Vec<OsString>,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            prefix_args: Vec::new(),
        }
    }

    pub fn with_prefix<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.prefix_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Full argument list: prefix followed by `args`.
    pub fn args_with(&self, args: Vec<OsString>) -> Vec<OsString> {
        let mut full = self.prefix_args.clone();
        full.extend(args);
        full
    }

    pub fn display_name(&self) -> String {
        self.program.display().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub transcoder: ToolCommand,
    pub prober: ToolCommand,
    pub fetcher: ToolCommand,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            transcoder: ToolCommand::new("ffmpeg"),
            prober: ToolCommand::new("ffprobe"),
            fetcher: ToolCommand::new("yt-dlp"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub tools: ToolPaths,
    /// Minimum time between two progress renders.
    pub throttle_interval: Duration,
    pub probe_timeout: Duration,
    /// Limit for the fetcher's file name prediction run.
    pub predict_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tools: ToolPaths::default(),
            throttle_interval: DEFAULT_THROTTLE_INTERVAL,
            probe_timeout: Duration::from_secs(30),
            predict_timeout: Duration::from_secs(60),
        }
    }
}
