use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser, ValueEnum};
use log::LevelFilter;
use mediagrab_core::{mode_for_url, CollisionPolicy, DownloadType, Job, JobMode, Quality};
use mediagrab_engine::{EngineConfig, ToolCommand, ToolPaths};
use mediagrab_logging::{LogDestination, DEFAULT_LOG_FILE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Fetcher for YouTube links, transcoder for everything else.
    Auto,
    Transcode,
    Fetch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OnExists {
    Overwrite,
    /// Write `name (n).ext` next to the existing file.
    Rename,
    Skip,
}

impl From<OnExists> for CollisionPolicy {
    fn from(value: OnExists) -> Self {
        match value {
            OnExists::Overwrite => CollisionPolicy::Overwrite,
            OnExists::Rename => CollisionPolicy::AutoRename,
            OnExists::Skip => CollisionPolicy::Skip,
        }
    }
}

/// Download media through ffmpeg or yt-dlp with a live progress bar.
/// Press Ctrl-C to cancel the running download.
#[derive(Parser, Debug)]
#[command(name = "mediagrab", version, about = "Download media with live progress")]
pub struct Cli {
    /// Media URLs: direct media links or YouTube pages
    #[arg(required = true)]
    pub urls: Vec<String>,

    /// Which tool downloads the URLs
    #[arg(short, long, value_enum, default_value_t = ModeArg::Auto)]
    pub mode: ModeArg,

    /// Keep only the audio track
    #[arg(short, long, action = ArgAction::SetTrue)]
    pub audio_only: bool,

    /// Maximum video height for YouTube downloads (1440p, 1080p, 720p, best)
    #[arg(short, long, default_value = "1080p", value_parser = parse_quality)]
    pub quality: Quality,

    /// Directory downloads are written to, created if missing
    #[arg(short, long, default_value = "./downloads")]
    pub output_dir: PathBuf,

    /// What to do when the output file already exists
    #[arg(long, value_enum, default_value_t = OnExists::Overwrite)]
    pub on_exists: OnExists,

    /// Transcoder executable
    #[arg(long, default_value = "ffmpeg")]
    pub ffmpeg: PathBuf,

    /// Prober executable
    #[arg(long, default_value = "ffprobe")]
    pub ffprobe: PathBuf,

    /// Fetcher executable
    #[arg(long, default_value = "yt-dlp")]
    pub yt_dlp: PathBuf,

    /// Minimum milliseconds between progress redraws
    #[arg(long, default_value_t = 3000)]
    pub refresh_ms: u64,

    /// Log file
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,

    /// Also log to the terminal, at debug level
    #[arg(short, long, action = ArgAction::SetTrue)]
    pub verbose: bool,
}

fn parse_quality(value: &str) -> Result<Quality, String> {
    value.parse()
}

impl Cli {
    pub fn log_destination(&self) -> LogDestination {
        if self.verbose {
            LogDestination::Both(self.log_file.clone())
        } else {
            LogDestination::File(self.log_file.clone())
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            tools: ToolPaths {
                transcoder: ToolCommand::new(&self.ffmpeg),
                prober: ToolCommand::new(&self.ffprobe),
                fetcher: ToolCommand::new(&self.yt_dlp),
            },
            throttle_interval: Duration::from_millis(self.refresh_ms),
            ..EngineConfig::default()
        }
    }

    /// One job per URL, numbered from 1.
    pub fn jobs(&self) -> Vec<Job> {
        self.urls
            .iter()
            .zip(1..)
            .map(|(url, id)| {
                let mode = match self.mode {
                    ModeArg::Auto => mode_for_url(url),
                    ModeArg::Transcode => JobMode::Transcode,
                    ModeArg::Fetch => JobMode::Fetch,
                };
                let mut job = Job::new(id, url.trim(), mode, &self.output_dir);
                if self.audio_only {
                    job.download_type = DownloadType::AudioOnly;
                }
                job.quality = self.quality;
                job.collision = self.on_exists.into();
                job
            })
            .collect()
    }
}
