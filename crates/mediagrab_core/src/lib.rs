//! Mediagrab core: pure progress parsing, throttling and job lifecycle rules.
mod args;
mod collision;
mod lifecycle;
mod lines;
mod naming;
mod parse;
mod throttle;
mod types;

pub use args::{
    fetch_args, format_selector, predict_filename_args, probe_args, transcode_args, FETCH_TEMPLATE,
};
pub use collision::{numbered_candidate, resolve_output_path, CollisionPolicy, Resolution};
pub use lifecycle::{JobLifecycle, JobState, TransitionError};
pub use lines::LineAssembler;
pub use naming::{audio_sibling, filename_from_url, is_fetch_source, mode_for_url};
pub use parse::{
    format_eta, format_rate, parse_clock, FetchGrammar, Grammar, ProgressParser, TranscodeGrammar,
    MERGE_PERCENT,
};
pub use throttle::{Throttle, ThrottleDecision, DEFAULT_THROTTLE_INTERVAL};
pub use types::{
    DownloadType, FailureKind, Job, JobId, JobMode, JobOutcome, Phase, ProgressEvent, Quality,
};
