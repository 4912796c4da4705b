//! Mediagrab engine: process supervision, throttled rendering and job drivers.
mod config;
mod context;
mod driver;
mod emitter;
mod engine;
mod error;
mod kill;
mod output;
mod probe;
mod sink;
mod supervisor;

pub use config::{EngineConfig, ToolCommand, ToolPaths};
pub use context::{JobContext, JobHooks};
pub use emitter::{EmitterControl, ThrottledEmitter};
pub use engine::Engine;
pub use error::{Completion, JobError, ProbeError, SpawnError};
#[cfg(unix)]
pub use kill::ProcessGroupKiller;
#[cfg(windows)]
pub use kill::TaskKillKiller;
pub use kill::{platform_killer, TreeKiller};
pub use output::{ensure_output_dir, OutputDirError};
pub use probe::{parse_probe_output, DurationProbe, FfprobeProbe};
pub use sink::{ChannelProgressSink, IndicatifSink, ProgressSink};
pub use supervisor::{ProcessHandle, SpawnedProcess, Supervisor};
