mod cli;
mod runner;

use anyhow::{bail, Context, Result};
use clap::Parser;
use mediagrab_engine::{ensure_output_dir, Engine};
use mediagrab_logging::grab_info;

use crate::cli::Cli;
use crate::runner::JobRunner;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    mediagrab_logging::initialize(cli.log_destination(), cli.log_level());

    ensure_output_dir(&cli.output_dir)
        .with_context(|| format!("preparing {}", cli.output_dir.display()))?;

    let jobs = cli.jobs();
    let total = jobs.len();
    grab_info!("mediagrab starting with {} job(s)", total);

    let runner = JobRunner::new(Engine::new(cli.engine_config()));
    let listener = runner.spawn_interrupt_listener();
    let summary = runner.run(jobs).await;
    listener.abort();

    grab_info!("finished: {:?}", summary);
    if summary.failed > 0 {
        bail!("{} of {} downloads failed", summary.failed, total);
    }
    Ok(())
}
