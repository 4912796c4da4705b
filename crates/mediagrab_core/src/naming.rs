use std::path::{Path, PathBuf};

use url::Url;

use crate::{DownloadType, JobMode};

const MEDIA_EXTENSIONS: [&str; 6] = ["mp4", "mkv", "webm", "mp3", "mov", "avi"];
const FETCH_HOSTS: [&str; 4] = ["youtube.com", "www.youtube.com", "m.youtube.com", "youtu.be"];

/// File name for a transcode job, taken from the last URL path segment.
/// Falls back to `output` and appends `.mp4`/`.mp3` when the name carries no
/// known media extension.
pub fn filename_from_url(source_url: &str, download_type: DownloadType) -> String {
    let segment = Url::parse(source_url)
        .ok()
        .and_then(|url| {
            url.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|segment| !segment.is_empty())
        .unwrap_or_else(|| "output".to_string());

    let has_media_ext = Path::new(&segment)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| MEDIA_EXTENSIONS.iter().any(|m| m.eq_ignore_ascii_case(ext)));
    if has_media_ext {
        return segment;
    }
    match download_type {
        DownloadType::AudioOnly => format!("{segment}.mp3"),
        DownloadType::Video => format!("{segment}.mp4"),
    }
}

/// True for hosts the site-aware fetcher handles.
pub fn is_fetch_source(source_url: &str) -> bool {
    Url::parse(source_url)
        .ok()
        .and_then(|url| url.host_str().map(str::to_ascii_lowercase))
        .is_some_and(|host| FETCH_HOSTS.contains(&host.as_str()))
}

pub fn mode_for_url(source_url: &str) -> JobMode {
    if is_fetch_source(source_url) {
        JobMode::Fetch
    } else {
        JobMode::Transcode
    }
}

/// Where audio extraction leaves its result for a predicted fetch file name.
pub fn audio_sibling(path: &Path) -> PathBuf {
    path.with_extension("mp3")
}
