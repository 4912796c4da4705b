//! Process-tree termination, one implementation per platform family.
use std::io;
use std::sync::Arc;

/// Terminates a spawned process together with the helpers it started.
pub trait TreeKiller: Send + Sync {
    fn kill_tree(&self, pid: u32) -> io::Result<()>;

    fn name(&self) -> &'static str;
}

/// Signals the process group led by the child. Requires the child to have
/// been started as a group leader, which [`crate::Supervisor`] does.
#[cfg(unix)]
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessGroupKiller;

#[cfg(unix)]
impl TreeKiller for ProcessGroupKiller {
    fn kill_tree(&self, pid: u32) -> io::Result<()> {
        let pid = libc::pid_t::try_from(pid)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;

        // SAFETY: kill(2) takes plain integers and touches no memory.
        if unsafe { libc::kill(-pid, libc::SIGTERM) } == 0 {
            return Ok(());
        }
        let group_err = io::Error::last_os_error();
        mediagrab_logging::grab_debug!(
            "group signal for pid {} failed ({}), signalling the process alone",
            pid,
            group_err
        );

        // SAFETY: as above.
        if unsafe { libc::kill(pid, libc::SIGTERM) } == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }

    fn name(&self) -> &'static str {
        "process-group"
    }
}

/// Runs `taskkill /T /F`, which walks the child's process tree.
#[cfg(windows)]
#[derive(Debug, Default, Clone, Copy)]
pub struct TaskKillKiller;

#[cfg(windows)]
impl TreeKiller for TaskKillKiller {
    fn kill_tree(&self, pid: u32) -> io::Result<()> {
        let status = std::process::Command::new("taskkill")
            .args(["/PID", &pid.to_string(), "/T", "/F"])
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()?;
        if status.success() {
            Ok(())
        } else {
            Err(io::Error::other(format!("taskkill exited with {status}")))
        }
    }

    fn name(&self) -> &'static str {
        "taskkill"
    }
}

/// The killer for the platform this binary was built for.
pub fn platform_killer() -> Arc<dyn TreeKiller> {
    #[cfg(unix)]
    {
        Arc::new(ProcessGroupKiller)
    }
    #[cfg(windows)]
    {
        Arc::new(TaskKillKiller)
    }
}
