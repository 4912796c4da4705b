use std::path::PathBuf;
use std::process::Stdio;

use mediagrab_core::{
    audio_sibling, fetch_args, predict_filename_args, resolve_output_path, Job, ProgressParser,
    Resolution, FETCH_TEMPLATE,
};
use mediagrab_logging::{grab_debug, grab_error, grab_info, grab_warn};
use tokio::process::Command;

use super::{Prepared, ProcessPlan, ProgressStream};
use crate::config::EngineConfig;

/// Settles the output path. Without an explicit path the fetcher is asked
/// which file it would write; if that fails it falls back to its own naming
/// template inside the output directory.
pub(crate) async fn prepare(job: &Job, config: &EngineConfig) -> Prepared {
    let predicted = match &job.output_path {
        Some(path) => Some(path.clone()),
        None => predict_filename(job, config).await,
    };

    let (output_arg, reported) = match predicted {
        Some(target) => {
            // Audio extraction replaces the downloaded file with an .mp3.
            let check = if job.is_audio_only() {
                audio_sibling(&target)
            } else {
                target
            };
            let resolved = match resolve_output_path(&check, job.collision, |p| p.exists()) {
                Resolution::Skip(existing) => return Prepared::Skip(existing),
                Resolution::Proceed(path) => path,
            };
            if resolved != check {
                grab_info!("{} exists, writing {}", check.display(), resolved.display());
            }
            (resolved.with_extension("%(ext)s"), resolved)
        }
        None => (job.output_dir.join(FETCH_TEMPLATE), job.output_dir.clone()),
    };

    Prepared::Run(ProcessPlan {
        tool: config.tools.fetcher.clone(),
        args: fetch_args(job, &output_arg),
        output: reported,
        progress_stream: ProgressStream::Stdout,
        parser: ProgressParser::for_job(job, None),
        initial_phase: job.initial_phase(),
        diagnostics: log_stderr_line,
    })
}

async fn predict_filename(job: &Job, config: &EngineConfig) -> Option<PathBuf> {
    let tool = &config.tools.fetcher;
    let mut command = Command::new(&tool.program);
    command
        .args(tool.args_with(predict_filename_args(job)))
        .stdin(Stdio::null())
        .kill_on_drop(true);

    let output = match tokio::time::timeout(config.predict_timeout, command.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(err)) => {
            grab_warn!("could not run {} to predict file name: {}", tool.display_name(), err);
            return None;
        }
        Err(_) => {
            grab_warn!("file name prediction timed out");
            return None;
        }
    };
    if !output.status.success() {
        grab_warn!("file name prediction exited with {}", output.status);
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let name = stdout.lines().map(str::trim).find(|line| !line.is_empty())?;
    grab_debug!("predicted file name {}", name);
    Some(job.output_dir.join(name))
}

fn log_stderr_line(line: &str) {
    if line.contains("WARNING") {
        grab_warn!("fetcher: {}", line);
    } else if line.contains("[download]") {
        grab_debug!("fetcher: {}", line);
    } else {
        grab_error!("fetcher: {}", line);
    }
}
