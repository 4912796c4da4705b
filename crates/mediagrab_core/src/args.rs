use std::ffi::OsString;
use std::path::Path;

use crate::{CollisionPolicy, DownloadType, Job, Quality};

/// Output template handed to the fetcher when no explicit file name is known.
pub const FETCH_TEMPLATE: &str = "%(title)s.%(ext)s";

/// Format selector string understood by the fetcher.
pub fn format_selector(download_type: DownloadType, quality: Quality) -> String {
    if download_type == DownloadType::AudioOnly {
        return "bestaudio/best".to_string();
    }
    match quality.max_height() {
        Some(height) => format!("bestvideo[height<={height}]+bestaudio/best[ext=mp4]"),
        None => "best[ext=mp4]".to_string(),
    }
}

/// Transcoder invocation copying streams into `output` while reporting
/// progress as `key=value` lines on stderr.
pub fn transcode_args(job: &Job, output: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-i".into(), job.source_url.as_str().into()];
    if job.is_audio_only() {
        args.extend(["-vn", "-acodec", "copy"].map(OsString::from));
    } else {
        args.extend(["-c", "copy"].map(OsString::from));
    }
    args.extend(
        ["-progress", "pipe:2", "-nostats", "-loglevel", "error", "-y"].map(OsString::from),
    );
    args.push(output.as_os_str().to_owned());
    args
}

/// Fetcher invocation. `output` is either a resolved file path or a template.
///
/// Under the overwrite policy the fetcher is told to replace existing files;
/// otherwise it would report them as already downloaded and keep them.
pub fn fetch_args(job: &Job, output: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "--format".into(),
        format_selector(job.download_type, job.quality).into(),
        "--output".into(),
        output.as_os_str().to_owned(),
        "--progress".into(),
        "--newline".into(),
    ];
    if job.collision == CollisionPolicy::Overwrite {
        args.push("--force-overwrites".into());
    }
    args.push(job.source_url.as_str().into());
    if job.is_audio_only() {
        args.extend(["--extract-audio", "--audio-format", "mp3"].map(OsString::from));
    }
    args
}

/// Prober invocation printing the container duration as JSON.
pub fn probe_args(source_url: &str) -> Vec<OsString> {
    let mut args: Vec<OsString> = [
        "-v",
        "error",
        "-show_entries",
        "format=duration",
        "-of",
        "json",
    ]
    .map(OsString::from)
    .to_vec();
    args.push(source_url.into());
    args
}

/// Fetcher invocation printing the file name the download of `job` would
/// produce. Uses the same format selector, so merged selections predict the
/// merged extension.
pub fn predict_filename_args(job: &Job) -> Vec<OsString> {
    vec![
        "--get-filename".into(),
        "--format".into(),
        format_selector(job.download_type, job.quality).into(),
        "--output".into(),
        FETCH_TEMPLATE.into(),
        job.source_url.as_str().into(),
    ]
}
