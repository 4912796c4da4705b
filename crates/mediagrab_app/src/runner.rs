use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use mediagrab_core::Job;
use mediagrab_engine::{Completion, Engine, IndicatifSink, JobContext, JobError};
use mediagrab_logging::{grab_info, grab_warn};
use tokio::task::JoinHandle;

type ActiveJob = Arc<Mutex<Option<Arc<JobContext>>>>;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub downloaded: usize,
    pub skipped: usize,
    pub cancelled: usize,
    pub failed: usize,
}

/// Drives jobs one after another and routes Ctrl-C to the running one.
pub struct JobRunner {
    engine: Engine,
    active: ActiveJob,
}

impl JobRunner {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine,
            active: Arc::new(Mutex::new(None)),
        }
    }

    /// Ctrl-C cancels the running job; while idle it exits the program.
    pub fn spawn_interrupt_listener(&self) -> JoinHandle<()> {
        let active = Arc::clone(&self.active);
        tokio::spawn(async move {
            loop {
                if let Err(err) = tokio::signal::ctrl_c().await {
                    grab_warn!("cannot listen for Ctrl-C: {}", err);
                    return;
                }
                let current = lock(&active).clone();
                match current {
                    Some(ctx) => {
                        if ctx.cancel() {
                            eprintln!("\nCancelling download...");
                        }
                    }
                    None => {
                        grab_info!("interrupted while idle, exiting");
                        std::process::exit(130);
                    }
                }
            }
        })
    }

    pub async fn run(&self, jobs: Vec<Job>) -> Summary {
        let mut summary = Summary::default();
        for job in jobs {
            let ctx = Arc::new(JobContext::new());
            *lock(&self.active) = Some(Arc::clone(&ctx));

            println!("Downloading {}", job.source_url);
            let sink = Arc::new(IndicatifSink::new());
            let result = self.engine.submit(&job, ctx.as_ref(), sink).await;
            lock(&self.active).take();

            report(&result, &mut summary);
        }
        summary
    }
}

/// Prints the single terminal message of a job.
fn report(result: &Result<Completion, JobError>, summary: &mut Summary) {
    match result {
        Ok(Completion::Downloaded(path)) => {
            summary.downloaded += 1;
            println!("Download completed: {}", path.display());
        }
        Ok(Completion::Skipped(path)) => {
            summary.skipped += 1;
            println!("Skipped, file already exists: {}", path.display());
        }
        Err(err) if err.is_cancelled() => {
            summary.cancelled += 1;
            println!("Download cancelled.");
        }
        Err(err) => {
            summary.failed += 1;
            eprintln!("Download failed: {err}");
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
