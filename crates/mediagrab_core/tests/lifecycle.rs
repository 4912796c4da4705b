use std::path::PathBuf;

use mediagrab_core::{FailureKind, JobLifecycle, JobOutcome, JobState, TransitionError};

#[test]
fn happy_path_reaches_succeeded() {
    let mut lifecycle = JobLifecycle::new();
    assert_eq!(lifecycle.state(), JobState::Idle);
    lifecycle.advance(JobState::Starting).unwrap();
    lifecycle.advance(JobState::Running).unwrap();
    let state = lifecycle
        .finish(&JobOutcome::Succeeded(PathBuf::from("a.mp4")))
        .unwrap();
    assert_eq!(state, JobState::Succeeded);
    assert!(state.is_terminal());
}

#[test]
fn skip_short_circuits_from_starting() {
    let mut lifecycle = JobLifecycle::new();
    lifecycle.advance(JobState::Starting).unwrap();
    let state = lifecycle
        .finish(&JobOutcome::Skipped(PathBuf::from("a.mp4")))
        .unwrap();
    assert_eq!(state, JobState::Skipped);
}

#[test]
fn terminal_states_are_final() {
    let mut lifecycle = JobLifecycle::new();
    lifecycle.advance(JobState::Starting).unwrap();
    lifecycle.advance(JobState::Running).unwrap();
    lifecycle.finish(&JobOutcome::Cancelled).unwrap();

    let err = lifecycle
        .finish(&JobOutcome::Failed(FailureKind::Exit(Some(1))))
        .unwrap_err();
    assert_eq!(
        err,
        TransitionError {
            from: JobState::Cancelled,
            to: JobState::Failed,
        }
    );
    assert_eq!(lifecycle.state(), JobState::Cancelled);
}

#[test]
fn running_cannot_be_skipped_or_restarted() {
    let mut lifecycle = JobLifecycle::new();
    assert!(lifecycle.advance(JobState::Running).is_err());
    lifecycle.advance(JobState::Starting).unwrap();
    lifecycle.advance(JobState::Running).unwrap();
    assert!(lifecycle.advance(JobState::Skipped).is_err());
    assert!(lifecycle.advance(JobState::Starting).is_err());
}

#[test]
fn failure_kinds_render_for_users() {
    assert_eq!(
        FailureKind::Exit(Some(2)).to_string(),
        "process failed with exit code 2"
    );
    assert_eq!(FailureKind::Exit(None).to_string(), "process terminated by signal");
    assert_eq!(JobOutcome::Cancelled.to_string(), "cancelled");
}
