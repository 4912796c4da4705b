use std::sync::Arc;

use mediagrab_core::{Job, JobLifecycle, JobMode, JobState};
use mediagrab_logging::{grab_error, grab_info, grab_warn, set_current_job};

use crate::config::EngineConfig;
use crate::context::JobHooks;
use crate::driver::{self, Prepared};
use crate::error::{Completion, JobError};
use crate::probe::{DurationProbe, FfprobeProbe};
use crate::sink::ProgressSink;
use crate::supervisor::Supervisor;

/// Runs download jobs, one `submit` at a time per caller.
pub struct Engine {
    config: EngineConfig,
    supervisor: Supervisor,
    probe: Arc<dyn DurationProbe>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let probe = Arc::new(FfprobeProbe::new(
            config.tools.prober.clone(),
            config.probe_timeout,
        ));
        Self::with_parts(config, Supervisor::default(), probe)
    }

    pub fn with_parts(
        config: EngineConfig,
        supervisor: Supervisor,
        probe: Arc<dyn DurationProbe>,
    ) -> Self {
        Self {
            config,
            supervisor,
            probe,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Drives `job` to its terminal state.
    ///
    /// `hooks` receives the process handle and the emitter control as soon as
    /// they exist and is polled for cancellation; `sink` receives throttled
    /// progress.
    pub async fn submit(
        &self,
        job: &Job,
        hooks: &dyn JobHooks,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<Completion, JobError> {
        set_current_job(job.id);
        grab_info!("starting {:?} job for {}", job.mode, job.source_url);

        let mut lifecycle = JobLifecycle::new();
        transition(&mut lifecycle, JobState::Starting);
        let result = self.drive(job, hooks, sink, &mut lifecycle).await;

        let outcome = match &result {
            Ok(completion) => completion.outcome(),
            Err(err) => err.outcome(),
        };
        if let Err(err) = lifecycle.finish(&outcome) {
            grab_warn!("{}", err);
        }
        match &result {
            Err(err) if !err.is_cancelled() => grab_error!("job {}", outcome),
            _ => grab_info!("job {}", outcome),
        }
        set_current_job(0);
        result
    }

    async fn drive(
        &self,
        job: &Job,
        hooks: &dyn JobHooks,
        sink: Arc<dyn ProgressSink>,
        lifecycle: &mut JobLifecycle,
    ) -> Result<Completion, JobError> {
        if hooks.is_cancelled() {
            return Err(JobError::Cancelled);
        }
        let prepare = async {
            match job.mode {
                JobMode::Transcode => {
                    driver::transcode::prepare(job, &self.config, self.probe.as_ref()).await
                }
                JobMode::Fetch => driver::fetch::prepare(job, &self.config).await,
            }
        };
        // Dropping the preparation kills any helper process it started.
        let prepared = match hooks.cancellation_token() {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => return Err(JobError::Cancelled),
                prepared = prepare => prepared,
            },
            None => prepare.await,
        };
        let plan = match prepared {
            Prepared::Skip(existing) => {
                grab_info!("{} already exists, skipping", existing.display());
                return Ok(Completion::Skipped(existing));
            }
            Prepared::Run(plan) => plan,
        };
        if hooks.is_cancelled() {
            return Err(JobError::Cancelled);
        }

        transition(lifecycle, JobState::Running);
        driver::run_plan(
            &self.supervisor,
            self.config.throttle_interval,
            plan,
            hooks,
            sink,
        )
        .await
    }
}

fn transition(lifecycle: &mut JobLifecycle, to: JobState) {
    if let Err(err) = lifecycle.advance(to) {
        grab_warn!("{}", err);
    }
}
