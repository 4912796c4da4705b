use mediagrab_core::{
    filename_from_url, resolve_output_path, transcode_args, Job, ProgressParser, Resolution,
};
use mediagrab_logging::{grab_debug, grab_info, grab_warn};

use super::{Prepared, ProcessPlan, ProgressStream};
use crate::config::EngineConfig;
use crate::probe::DurationProbe;

/// Settles the output path and, unless the job is skipped, probes the source
/// duration. A failed probe only degrades the progress estimate.
pub(crate) async fn prepare(
    job: &Job,
    config: &EngineConfig,
    probe: &dyn DurationProbe,
) -> Prepared {
    let target = job.output_path.clone().unwrap_or_else(|| {
        job.output_dir
            .join(filename_from_url(&job.source_url, job.download_type))
    });
    let output = match resolve_output_path(&target, job.collision, |p| p.exists()) {
        Resolution::Skip(existing) => return Prepared::Skip(existing),
        Resolution::Proceed(path) => path,
    };
    if output != target {
        grab_info!("{} exists, writing {}", target.display(), output.display());
    }

    let total = match probe.probe(&job.source_url).await {
        Ok(seconds) => Some(seconds),
        Err(err) => {
            grab_warn!("could not determine duration ({}), progress is estimated", err);
            None
        }
    };

    Prepared::Run(ProcessPlan {
        tool: config.tools.transcoder.clone(),
        args: transcode_args(job, &output),
        output,
        progress_stream: ProgressStream::Stderr,
        parser: ProgressParser::for_job(job, total),
        initial_phase: job.initial_phase(),
        diagnostics: log_stdout_line,
    })
}

fn log_stdout_line(line: &str) {
    grab_debug!("transcoder: {}", line);
}
