use std::io;
use std::path::PathBuf;

use mediagrab_core::{FailureKind, JobOutcome};
use thiserror::Error;

/// Launching an external tool failed before it ran.
#[derive(Debug, Error)]
#[error("failed to start {program}: {source}")]
pub struct SpawnError {
    pub program: String,
    #[source]
    pub source: io::Error,
}

/// Why a job did not complete.
#[derive(Debug, Error)]
pub enum JobError {
    /// User initiated; not a fault.
    #[error("download was cancelled by user")]
    Cancelled,
    #[error(transparent)]
    Spawn(#[from] SpawnError),
    #[error("{program} {}", describe_exit(.code))]
    Exit { program: String, code: Option<i32> },
    #[error("io error while running job: {0}")]
    Io(#[from] io::Error),
}

impl JobError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, JobError::Cancelled)
    }

    pub fn outcome(&self) -> JobOutcome {
        match self {
            JobError::Cancelled => JobOutcome::Cancelled,
            JobError::Spawn(err) => JobOutcome::Failed(FailureKind::Spawn(err.to_string())),
            JobError::Exit { code, .. } => JobOutcome::Failed(FailureKind::Exit(*code)),
            JobError::Io(err) => JobOutcome::Failed(FailureKind::Io(err.to_string())),
        }
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("process failed with exit code {code}"),
        None => "process was terminated by a signal".to_string(),
    }
}

/// Successful end of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The tool exited cleanly. For fetch jobs whose file name could not be
    /// predicted this is the output directory.
    Downloaded(PathBuf),
    /// The target already existed and the collision policy skipped it.
    Skipped(PathBuf),
}

impl Completion {
    pub fn outcome(&self) -> JobOutcome {
        match self {
            Completion::Downloaded(path) => JobOutcome::Succeeded(path.clone()),
            Completion::Skipped(path) => JobOutcome::Skipped(path.clone()),
        }
    }
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to start prober: {0}")]
    Spawn(#[source] io::Error),
    #[error("prober {}", describe_exit(.0))]
    Exit(Option<i32>),
    #[error("prober timed out")]
    Timeout,
    #[error("unreadable prober output: {0}")]
    Parse(String),
}
