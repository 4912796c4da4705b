use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use mediagrab_core::probe_args;
use mediagrab_logging::grab_debug;
use serde::Deserialize;
use tokio::process::Command;

use crate::config::ToolCommand;
use crate::error::ProbeError;

/// Looks up the total duration of a source in seconds.
#[async_trait]
pub trait DurationProbe: Send + Sync {
    async fn probe(&self, source_url: &str) -> Result<f64, ProbeError>;
}

pub struct FfprobeProbe {
    tool: ToolCommand,
    timeout: Duration,
}

impl FfprobeProbe {
    pub fn new(tool: ToolCommand, timeout: Duration) -> Self {
        Self { tool, timeout }
    }
}

#[async_trait]
impl DurationProbe for FfprobeProbe {
    async fn probe(&self, source_url: &str) -> Result<f64, ProbeError> {
        let args = self.tool.args_with(probe_args(source_url));
        let mut command = Command::new(&self.tool.program);
        command.args(&args).stdin(Stdio::null()).kill_on_drop(true);
        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| ProbeError::Timeout)?
            .map_err(ProbeError::Spawn)?;
        if !output.status.success() {
            return Err(ProbeError::Exit(output.status.code()));
        }
        let duration = parse_probe_output(&output.stdout)?;
        grab_debug!("probed duration {:.2}s for {}", duration, source_url);
        Ok(duration)
    }
}

#[derive(Debug, Deserialize)]
struct ProbeReport {
    format: ProbeFormat,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Reads `format.duration` from the prober's JSON report.
pub fn parse_probe_output(stdout: &[u8]) -> Result<f64, ProbeError> {
    let report: ProbeReport =
        serde_json::from_slice(stdout).map_err(|err| ProbeError::Parse(err.to_string()))?;
    let raw = report
        .format
        .duration
        .ok_or_else(|| ProbeError::Parse("missing format.duration".to_string()))?;
    match raw.trim().parse::<f64>() {
        Ok(seconds) if seconds.is_finite() && seconds > 0.0 => Ok(seconds),
        _ => Err(ProbeError::Parse(format!("invalid duration {raw:?}"))),
    }
}
