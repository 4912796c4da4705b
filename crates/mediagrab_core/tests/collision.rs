use std::collections::HashSet;
use std::path::{Path, PathBuf};

use mediagrab_core::{numbered_candidate, resolve_output_path, CollisionPolicy, Resolution};
use pretty_assertions::assert_eq;

fn taken(paths: &[&str]) -> HashSet<PathBuf> {
    paths.iter().map(PathBuf::from).collect()
}

#[test]
fn free_path_is_used_for_every_policy() {
    let existing = taken(&[]);
    for policy in [
        CollisionPolicy::Overwrite,
        CollisionPolicy::AutoRename,
        CollisionPolicy::Skip,
    ] {
        let got = resolve_output_path(Path::new("out/video.mp4"), policy, |p| existing.contains(p));
        assert_eq!(got, Resolution::Proceed(PathBuf::from("out/video.mp4")));
    }
}

#[test]
fn auto_rename_searches_numeric_suffixes() {
    let existing = taken(&["out/video.mp4"]);
    let got = resolve_output_path(Path::new("out/video.mp4"), CollisionPolicy::AutoRename, |p| {
        existing.contains(p)
    });
    assert_eq!(got, Resolution::Proceed(PathBuf::from("out/video (1).mp4")));

    let existing = taken(&["out/video.mp4", "out/video (1).mp4"]);
    let got = resolve_output_path(Path::new("out/video.mp4"), CollisionPolicy::AutoRename, |p| {
        existing.contains(p)
    });
    assert_eq!(got, Resolution::Proceed(PathBuf::from("out/video (2).mp4")));
}

#[test]
fn skip_and_overwrite_keep_the_original_path() {
    let existing = taken(&["video.mp4"]);
    let skip = resolve_output_path(Path::new("video.mp4"), CollisionPolicy::Skip, |p| {
        existing.contains(p)
    });
    assert_eq!(skip, Resolution::Skip(PathBuf::from("video.mp4")));

    let overwrite = resolve_output_path(Path::new("video.mp4"), CollisionPolicy::Overwrite, |p| {
        existing.contains(p)
    });
    assert_eq!(overwrite, Resolution::Proceed(PathBuf::from("video.mp4")));
}

#[test]
fn candidate_without_extension() {
    assert_eq!(
        numbered_candidate(Path::new("dir/clip"), 3),
        PathBuf::from("dir/clip (3)")
    );
}

#[test]
fn policy_parses_from_flag_values() {
    assert_eq!("rename".parse::<CollisionPolicy>(), Ok(CollisionPolicy::AutoRename));
    assert_eq!("SKIP".parse::<CollisionPolicy>(), Ok(CollisionPolicy::Skip));
    assert_eq!("overwrite".parse::<CollisionPolicy>(), Ok(CollisionPolicy::Overwrite));
    assert!("merge".parse::<CollisionPolicy>().is_err());
}
