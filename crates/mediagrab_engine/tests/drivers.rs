#![cfg(unix)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use mediagrab_core::{
    CollisionPolicy, DownloadType, Job, JobMode, JobOutcome, Phase, ProgressEvent,
};
use mediagrab_engine::{
    Completion, DurationProbe, EmitterControl, Engine, EngineConfig, JobContext, JobError,
    JobHooks, ProbeError, ProcessHandle, ProgressSink, Supervisor, ToolCommand, ToolPaths,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

static INIT: Once = Once::new();

fn init_logging() {
    INIT.call_once(mediagrab_logging::initialize_for_tests);
}

#[derive(Default)]
struct TestSink {
    events: Mutex<Vec<ProgressEvent>>,
    finished: Mutex<bool>,
}

impl TestSink {
    fn percents(&self) -> Vec<u8> {
        self.events.lock().unwrap().iter().map(|e| e.percent).collect()
    }

    fn last(&self) -> Option<ProgressEvent> {
        self.events.lock().unwrap().last().cloned()
    }

    fn finished(&self) -> bool {
        *self.finished.lock().unwrap()
    }
}

impl ProgressSink for TestSink {
    fn emit(&self, event: &ProgressEvent) {
        self.events.lock().unwrap().push(event.clone());
    }

    fn finish(&self) {
        *self.finished.lock().unwrap() = true;
    }
}

struct FixedProbe(Option<f64>);

#[async_trait]
impl DurationProbe for FixedProbe {
    async fn probe(&self, _source_url: &str) -> Result<f64, ProbeError> {
        self.0.ok_or(ProbeError::Timeout)
    }
}

/// Writes a shell script standing in for an external tool.
fn script(dir: &Path, name: &str, body: &str) -> ToolCommand {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    ToolCommand::new("sh").with_prefix([path.into_os_string()])
}

fn engine(transcoder: ToolCommand, fetcher: ToolCommand, duration: Option<f64>) -> Engine {
    let config = EngineConfig {
        tools: ToolPaths {
            transcoder,
            prober: ToolCommand::new("/nonexistent/prober"),
            fetcher,
        },
        throttle_interval: Duration::ZERO,
        ..EngineConfig::default()
    };
    Engine::with_parts(config, Supervisor::default(), Arc::new(FixedProbe(duration)))
}

fn missing_tool() -> ToolCommand {
    ToolCommand::new("/nonexistent/mediagrab-tool")
}

struct Fixture {
    tools: TempDir,
    out: TempDir,
}

impl Fixture {
    fn new() -> Self {
        init_logging();
        Self {
            tools: TempDir::new().unwrap(),
            out: TempDir::new().unwrap(),
        }
    }

    fn tool(&self, name: &str, body: &str) -> ToolCommand {
        script(self.tools.path(), name, body)
    }

    fn out(&self) -> &Path {
        self.out.path()
    }

    fn args_file(&self) -> PathBuf {
        self.tools.path().join("args.txt")
    }

    fn recorded_args(&self) -> Vec<String> {
        fs::read_to_string(self.args_file())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

fn transcode_job(out: &Path) -> Job {
    Job::new(1, "https://cdn.example.com/media/clip.mp4", JobMode::Transcode, out)
}

fn fetch_job(out: &Path) -> Job {
    Job::new(2, "https://www.youtube.com/watch?v=abc", JobMode::Fetch, out)
}

fn assert_non_decreasing(percents: &[u8]) {
    assert!(
        percents.windows(2).all(|w| w[0] <= w[1]),
        "percent regressed: {percents:?}"
    );
}

#[tokio::test]
async fn transcode_with_known_duration_reports_half_way() {
    let fx = Fixture::new();
    let transcoder = fx.tool(
        "transcoder.sh",
        "printf 'frame=10\\nout_time_ms=60000000\\nprogress=continue\\n' >&2",
    );
    let engine = engine(transcoder, missing_tool(), Some(120.0));
    let sink = Arc::new(TestSink::default());
    let ctx = JobContext::new();

    let completion = engine
        .submit(&transcode_job(fx.out()), &ctx, sink.clone())
        .await
        .unwrap();

    assert_eq!(completion, Completion::Downloaded(fx.out().join("clip.mp4")));
    let percents = sink.percents();
    assert!(percents.contains(&50), "{percents:?}");
    assert_non_decreasing(&percents);
    assert_eq!(sink.last().unwrap(), ProgressEvent::finished(Phase::Complete));
    assert!(sink.finished());
}

#[tokio::test]
async fn transcode_without_duration_still_moves() {
    let fx = Fixture::new();
    let transcoder = fx.tool("transcoder.sh", "echo 'out_time_us=3000000' >&2");
    let engine = engine(transcoder, missing_tool(), None);
    let sink = Arc::new(TestSink::default());

    engine
        .submit(&transcode_job(fx.out()), &JobContext::new(), sink.clone())
        .await
        .unwrap();

    // 3 / (3 + 1)
    assert!(sink.percents().contains(&75), "{:?}", sink.percents());
}

#[tokio::test]
async fn transcode_passes_resolved_output_and_copy_flags() {
    let fx = Fixture::new();
    let body = format!("printf '%s\\n' \"$@\" > '{}'", fx.args_file().display());
    let engine = engine(fx.tool("transcoder.sh", &body), missing_tool(), Some(10.0));
    let mut job = transcode_job(fx.out());
    job.download_type = DownloadType::AudioOnly;

    engine
        .submit(&job, &JobContext::new(), Arc::new(TestSink::default()))
        .await
        .unwrap();

    let args = fx.recorded_args();
    assert_eq!(&args[..2], ["-i", "https://cdn.example.com/media/clip.mp4"]);
    assert!(args.contains(&"-vn".to_string()));
    assert_eq!(
        args.last().map(String::as_str),
        Some(fx.out().join("clip.mp4").to_str().unwrap())
    );
}

#[tokio::test]
async fn fetch_multi_stream_job_ends_at_one_hundred() {
    let fx = Fixture::new();
    let fetcher = fx.tool(
        "fetcher.sh",
        r#"if [ "$1" = "--get-filename" ]; then echo 'clip.mp4'; exit 0; fi
echo '[youtube] abc: Downloading 2 format(s): 137+140'
echo '[download]  50.0% of 10.00MiB at 1.00MiB/s ETA 00:05'
echo '[download] 100% of 10.00MiB in 00:00:10 at 1.00MiB/s'
echo '[download]  40.0% of 2.00MiB at 1.00MiB/s ETA 00:01'
echo '[download] 100% of 2.00MiB in 00:00:02 at 1.00MiB/s'
echo '[Merger] Merging formats into "clip.mp4"'
echo 'WARNING: unable to fetch thumbnail' >&2"#,
    );
    let engine = engine(missing_tool(), fetcher, None);
    let sink = Arc::new(TestSink::default());

    let completion = engine
        .submit(&fetch_job(fx.out()), &JobContext::new(), sink.clone())
        .await
        .unwrap();

    assert_eq!(completion, Completion::Downloaded(fx.out().join("clip.mp4")));
    assert_eq!(completion.outcome(), JobOutcome::Succeeded(fx.out().join("clip.mp4")));
    let percents = sink.percents();
    assert!(percents.contains(&25) && percents.contains(&70), "{percents:?}");
    assert_non_decreasing(&percents);
    assert_eq!(sink.last().unwrap().percent, 100);
}

#[tokio::test]
async fn fetch_auto_rename_picks_next_free_name() {
    let fx = Fixture::new();
    fs::write(fx.out().join("clip.mp4"), b"old").unwrap();
    let body = format!(
        "if [ \"$1\" = \"--get-filename\" ]; then echo 'clip.mp4'; exit 0; fi\nprintf '%s\\n' \"$@\" > '{}'",
        fx.args_file().display()
    );
    let engine = engine(missing_tool(), fx.tool("fetcher.sh", &body), None);
    let mut job = fetch_job(fx.out());
    job.collision = CollisionPolicy::AutoRename;

    let completion = engine
        .submit(&job, &JobContext::new(), Arc::new(TestSink::default()))
        .await
        .unwrap();

    assert_eq!(completion, Completion::Downloaded(fx.out().join("clip (1).mp4")));
    let args = fx.recorded_args();
    let output = args.iter().position(|a| a == "--output").unwrap() + 1;
    assert_eq!(
        args[output],
        fx.out().join("clip (1).%(ext)s").to_str().unwrap()
    );
}

#[tokio::test]
async fn fetch_overwrite_tells_the_fetcher_to_replace() {
    let fx = Fixture::new();
    fs::write(fx.out().join("clip.mp4"), b"old").unwrap();
    let body = format!(
        "if [ \"$1\" = \"--get-filename\" ]; then echo 'clip.mp4'; exit 0; fi\nprintf '%s\\n' \"$@\" > '{}'",
        fx.args_file().display()
    );
    let engine = engine(missing_tool(), fx.tool("fetcher.sh", &body), None);
    let job = fetch_job(fx.out());
    assert_eq!(job.collision, CollisionPolicy::Overwrite);

    let completion = engine
        .submit(&job, &JobContext::new(), Arc::new(TestSink::default()))
        .await
        .unwrap();

    assert_eq!(completion, Completion::Downloaded(fx.out().join("clip.mp4")));
    let args = fx.recorded_args();
    assert!(args.iter().any(|a| a == "--force-overwrites"), "{args:?}");
    let output = args.iter().position(|a| a == "--output").unwrap() + 1;
    assert_eq!(args[output], fx.out().join("clip.%(ext)s").to_str().unwrap());
}

#[tokio::test]
async fn fetch_falls_back_to_template_when_prediction_fails() {
    let fx = Fixture::new();
    let body = format!(
        "if [ \"$1\" = \"--get-filename\" ]; then exit 1; fi\nprintf '%s\\n' \"$@\" > '{}'",
        fx.args_file().display()
    );
    let engine = engine(missing_tool(), fx.tool("fetcher.sh", &body), None);

    let completion = engine
        .submit(&fetch_job(fx.out()), &JobContext::new(), Arc::new(TestSink::default()))
        .await
        .unwrap();

    assert_eq!(completion, Completion::Downloaded(fx.out().to_path_buf()));
    assert!(fx
        .recorded_args()
        .contains(&fx.out().join("%(title)s.%(ext)s").to_str().unwrap().to_string()));
}

#[tokio::test]
async fn skip_policy_never_spawns() {
    let fx = Fixture::new();
    let existing = fx.out().join("clip.mp4");
    fs::write(&existing, b"old").unwrap();
    let engine = engine(missing_tool(), missing_tool(), Some(10.0));
    let mut job = transcode_job(fx.out());
    job.collision = CollisionPolicy::Skip;
    let sink = Arc::new(TestSink::default());

    let completion = engine
        .submit(&job, &JobContext::new(), sink.clone())
        .await
        .unwrap();

    assert_eq!(completion, Completion::Skipped(existing));
    assert!(sink.percents().is_empty());
}

#[tokio::test]
async fn audio_fetch_checks_the_mp3_sibling() {
    let fx = Fixture::new();
    fs::write(fx.out().join("song.mp3"), b"old").unwrap();
    let fetcher = fx.tool(
        "fetcher.sh",
        "if [ \"$1\" = \"--get-filename\" ]; then echo 'song.webm'; exit 0; fi\nexit 9",
    );
    let engine = engine(missing_tool(), fetcher, None);
    let mut job = fetch_job(fx.out());
    job.download_type = DownloadType::AudioOnly;
    job.collision = CollisionPolicy::Skip;

    let completion = engine
        .submit(&job, &JobContext::new(), Arc::new(TestSink::default()))
        .await
        .unwrap();

    assert_eq!(completion, Completion::Skipped(fx.out().join("song.mp3")));
}

#[tokio::test]
async fn non_zero_exit_fails_with_code() {
    let fx = Fixture::new();
    let transcoder = fx.tool("transcoder.sh", "echo 'out_time_ms=6000000' >&2\nexit 3");
    let engine = engine(transcoder, missing_tool(), Some(120.0));
    let sink = Arc::new(TestSink::default());

    let err = engine
        .submit(&transcode_job(fx.out()), &JobContext::new(), sink.clone())
        .await
        .unwrap_err();

    match &err {
        JobError::Exit { code, .. } => assert_eq!(*code, Some(3)),
        other => panic!("expected exit error, got {other:?}"),
    }
    assert!(!err.is_cancelled());
    // Failure does not force the bar to 100.
    assert_eq!(sink.last().unwrap().percent, 5);
    assert!(sink.finished());
}

#[tokio::test]
async fn missing_executable_is_a_spawn_failure() {
    let fx = Fixture::new();
    let engine = engine(missing_tool(), missing_tool(), Some(10.0));
    let sink = Arc::new(TestSink::default());

    let err = engine
        .submit(&transcode_job(fx.out()), &JobContext::new(), sink.clone())
        .await
        .unwrap_err();

    assert!(matches!(err, JobError::Spawn(_)), "{err:?}");
    assert!(sink.finished());
}

#[tokio::test]
async fn cancel_kills_the_tool_and_resolves_cancelled() {
    let fx = Fixture::new();
    let transcoder = fx.tool("transcoder.sh", "echo 'out_time_ms=1000000' >&2\nsleep 30");
    let engine = engine(transcoder, missing_tool(), Some(120.0));
    let sink = Arc::new(TestSink::default());
    let ctx = Arc::new(JobContext::new());

    let job = transcode_job(fx.out());
    let run = engine.submit(&job, ctx.as_ref(), sink.clone());
    let cancel = async {
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(ctx.cancel());
        assert!(!ctx.cancel());
    };
    let (result, ()) = tokio::time::timeout(Duration::from_secs(20), async {
        tokio::join!(run, cancel)
    })
    .await
    .expect("cancelled job terminates");

    let err = result.unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(err.outcome(), JobOutcome::Cancelled);
    assert!(ctx.current_process().is_none());
    assert!(sink.finished());
}

#[tokio::test]
async fn cancelled_before_start_spawns_nothing() {
    let fx = Fixture::new();
    let engine = engine(missing_tool(), missing_tool(), Some(10.0));
    let ctx = JobContext::new();
    ctx.cancel();

    let err = engine
        .submit(&transcode_job(fx.out()), &ctx, Arc::new(TestSink::default()))
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
}

#[tokio::test]
async fn cancel_interrupts_a_slow_file_name_prediction() {
    let fx = Fixture::new();
    let fetcher = fx.tool(
        "fetcher.sh",
        "if [ \"$1\" = \"--get-filename\" ]; then sleep 10; echo 'clip.mp4'; exit 0; fi\nexit 9",
    );
    let engine = engine(missing_tool(), fetcher, None);
    let sink = Arc::new(TestSink::default());
    let ctx = JobContext::new();

    let started = Instant::now();
    let job = fetch_job(fx.out());
    let run = engine.submit(&job, &ctx, sink.clone());
    let cancel = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        ctx.cancel();
    };
    let (result, ()) = tokio::join!(run, cancel);

    assert!(result.unwrap_err().is_cancelled());
    assert!(started.elapsed() < Duration::from_secs(3), "{:?}", started.elapsed());
    assert!(sink.percents().is_empty());
}

/// Hooks that only expose a flag, raised as soon as the process starts.
#[derive(Default)]
struct FlagHooks {
    cancelled: AtomicBool,
}

impl JobHooks for FlagHooks {
    fn process_started(&self, _handle: &ProcessHandle) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    fn emitter_started(&self, _control: &EmitterControl) {}

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[tokio::test]
async fn cancel_flag_seen_on_an_output_line_kills_the_tool() {
    let fx = Fixture::new();
    let transcoder = fx.tool(
        "transcoder.sh",
        "sleep 0.3\necho 'out_time_ms=1000000' >&2\nsleep 30",
    );
    let engine = engine(transcoder, missing_tool(), Some(120.0));
    let hooks = FlagHooks::default();

    let started = Instant::now();
    let err = tokio::time::timeout(
        Duration::from_secs(20),
        engine.submit(&transcode_job(fx.out()), &hooks, Arc::new(TestSink::default())),
    )
    .await
    .expect("flagged job terminates")
    .unwrap_err();

    assert!(err.is_cancelled(), "{err:?}");
    assert!(started.elapsed() < Duration::from_secs(10), "{:?}", started.elapsed());
}
