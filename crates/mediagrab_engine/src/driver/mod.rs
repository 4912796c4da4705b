//! Per-job pipelines: resolve the target, spawn the tool and turn its output
//! into throttled progress.
pub(crate) mod fetch;
pub(crate) mod transcode;

use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use mediagrab_core::{LineAssembler, Phase, ProgressEvent, ProgressParser};
use mediagrab_logging::{grab_debug, grab_trace};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::config::ToolCommand;
use crate::context::JobHooks;
use crate::emitter::ThrottledEmitter;
use crate::error::{Completion, JobError};
use crate::sink::ProgressSink;
use crate::supervisor::{ProcessHandle, Supervisor};

const READ_CHUNK: usize = 8 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProgressStream {
    Stdout,
    Stderr,
}

/// Everything needed to run the tool once the target is settled.
pub(crate) struct ProcessPlan {
    pub tool: ToolCommand,
    pub args: Vec<OsString>,
    /// Reported on success.
    pub output: PathBuf,
    pub progress_stream: ProgressStream,
    pub parser: ProgressParser,
    pub initial_phase: Phase,
    /// Logs a line of the stream that does not carry progress.
    pub diagnostics: fn(&str),
}

pub(crate) enum Prepared {
    /// The target exists and must not be touched.
    Skip(PathBuf),
    Run(ProcessPlan),
}

type BoxedReader = Box<dyn AsyncRead + Unpin + Send>;

pub(crate) async fn run_plan(
    supervisor: &Supervisor,
    throttle_interval: Duration,
    plan: ProcessPlan,
    hooks: &dyn JobHooks,
    sink: Arc<dyn ProgressSink>,
) -> Result<Completion, JobError> {
    let ProcessPlan {
        tool,
        args,
        output,
        progress_stream,
        mut parser,
        initial_phase,
        diagnostics,
    } = plan;

    let emitter = ThrottledEmitter::new(throttle_interval, sink);
    hooks.emitter_started(&emitter.control());
    emitter.update(ProgressEvent::new(0, initial_phase, "", ""));

    let mut process = match supervisor.spawn(&tool, args) {
        Ok(process) => process,
        Err(err) => {
            emitter.stop();
            return Err(err.into());
        }
    };
    let handle = process.handle().clone();
    hooks.process_started(&handle);

    let stdout: BoxedReader = match process.take_stdout() {
        Some(stdout) => Box::new(stdout),
        None => Box::new(tokio::io::empty()),
    };
    let stderr: BoxedReader = match process.take_stderr() {
        Some(stderr) => Box::new(stderr),
        None => Box::new(tokio::io::empty()),
    };
    let (progress, other) = match progress_stream {
        ProgressStream::Stdout => (stdout, stderr),
        ProgressStream::Stderr => (stderr, stdout),
    };

    let (pumped, drained) = tokio::join!(
        pump_progress(progress, &mut parser, &emitter, hooks, &handle),
        drain_lines(other, diagnostics),
    );
    let status = process.wait().await;
    hooks.process_finished();

    if hooks.is_cancelled() || handle.kill_requested() {
        emitter.stop();
        return Err(JobError::Cancelled);
    }

    let result = match (status, pumped.and(drained)) {
        (Err(err), _) | (Ok(_), Err(err)) => Err(JobError::Io(err)),
        (Ok(status), Ok(())) if status.success() => {
            emitter.update(ProgressEvent::finished(Phase::Complete));
            Ok(Completion::Downloaded(output))
        }
        (Ok(status), Ok(())) => Err(JobError::Exit {
            program: tool.display_name(),
            code: status.code(),
        }),
    };
    emitter.stop();
    result
}

/// Reads the progress stream to its end. Once cancellation is observed the
/// process tree is killed and remaining output is discarded.
async fn pump_progress(
    mut reader: BoxedReader,
    parser: &mut ProgressParser,
    emitter: &ThrottledEmitter,
    hooks: &dyn JobHooks,
    handle: &ProcessHandle,
) -> io::Result<()> {
    let mut assembler = LineAssembler::new();
    let mut buf = vec![0u8; READ_CHUNK];
    let mut last_shown: Option<(u8, Phase)> = None;
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        for line in assembler.feed(&buf[..n]) {
            if hooks.is_cancelled() {
                handle.kill();
                continue;
            }
            let Some(event) = parser.parse(&line) else {
                grab_trace!("{}", line);
                continue;
            };
            let key = (event.percent, event.phase);
            if last_shown == Some(key) {
                continue;
            }
            last_shown = Some(key);
            emitter.update(event);
        }
    }
    if let Some(rest) = assembler.finish() {
        grab_debug!("unterminated progress output: {}", rest);
    }
    Ok(())
}

async fn drain_lines(mut reader: BoxedReader, log_line: fn(&str)) -> io::Result<()> {
    let mut assembler = LineAssembler::new();
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        for line in assembler.feed(&buf[..n]) {
            let line = line.trim();
            if !line.is_empty() {
                log_line(line);
            }
        }
    }
    if let Some(rest) = assembler.finish() {
        log_line(rest.trim());
    }
    Ok(())
}
