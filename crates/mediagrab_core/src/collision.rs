use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// What to do when the output file already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollisionPolicy {
    #[default]
    Overwrite,
    /// Pick the first free `name (n).ext`.
    AutoRename,
    Skip,
}

impl FromStr for CollisionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overwrite" => Ok(CollisionPolicy::Overwrite),
            "rename" | "auto-rename" => Ok(CollisionPolicy::AutoRename),
            "skip" => Ok(CollisionPolicy::Skip),
            other => Err(format!("unknown collision policy {other:?}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Write to this path.
    Proceed(PathBuf),
    /// Leave the existing file alone; nothing is spawned.
    Skip(PathBuf),
}

/// Applies `policy` to `path`. `exists` is injected so callers and tests
/// decide what "taken" means.
pub fn resolve_output_path(
    path: &Path,
    policy: CollisionPolicy,
    exists: impl Fn(&Path) -> bool,
) -> Resolution {
    if !exists(path) {
        return Resolution::Proceed(path.to_path_buf());
    }
    match policy {
        CollisionPolicy::Overwrite => Resolution::Proceed(path.to_path_buf()),
        CollisionPolicy::Skip => Resolution::Skip(path.to_path_buf()),
        CollisionPolicy::AutoRename => {
            let mut n: u32 = 1;
            loop {
                let candidate = numbered_candidate(path, n);
                if !exists(&candidate) || n == u32::MAX {
                    return Resolution::Proceed(candidate);
                }
                n += 1;
            }
        }
    }
}

/// `dir/video.mp4` with `n = 2` becomes `dir/video (2).mp4`.
pub fn numbered_candidate(path: &Path, n: u32) -> PathBuf {
    let stem = path.file_stem().map(OsString::from).unwrap_or_default();
    let mut name = stem;
    name.push(format!(" ({n})"));
    if let Some(ext) = path.extension() {
        name.push(".");
        name.push(ext);
    }
    path.with_file_name(name)
}
