use std::ffi::OsString;
use std::fmt;
use std::io;
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use mediagrab_logging::{grab_debug, grab_info, grab_warn};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};

use crate::config::ToolCommand;
use crate::error::SpawnError;
use crate::kill::{platform_killer, TreeKiller};

/// Shared reference to a running child.
///
/// Cloning is cheap; all clones share the kill state, so only the first
/// `kill()` across every clone signals the process.
#[derive(Clone)]
pub struct ProcessHandle {
    program: Arc<str>,
    pid: Option<u32>,
    cancel_handled: Arc<AtomicBool>,
    exited: Arc<AtomicBool>,
    killer: Arc<dyn TreeKiller>,
}

impl ProcessHandle {
    pub fn new(program: &str, pid: Option<u32>, killer: Arc<dyn TreeKiller>) -> Self {
        Self {
            program: Arc::from(program),
            pid,
            cancel_handled: Arc::new(AtomicBool::new(false)),
            exited: Arc::new(AtomicBool::new(false)),
            killer,
        }
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Whether a kill was already requested.
    pub fn kill_requested(&self) -> bool {
        self.cancel_handled.load(Ordering::SeqCst)
    }

    pub fn has_exited(&self) -> bool {
        self.exited.load(Ordering::SeqCst)
    }

    /// Terminates the process tree. Returns `true` only for the call that
    /// actually issued the termination.
    pub fn kill(&self) -> bool {
        if self.cancel_handled.swap(true, Ordering::SeqCst) {
            return false;
        }
        if self.has_exited() {
            grab_debug!("{} already exited, nothing to kill", self.program);
            return false;
        }
        let Some(pid) = self.pid else {
            grab_warn!("{} has no pid, cannot kill", self.program);
            return false;
        };
        match self.killer.kill_tree(pid) {
            Ok(()) => grab_info!(
                "terminated {} (pid {}) via {}",
                self.program,
                pid,
                self.killer.name()
            ),
            Err(err) => grab_warn!("failed to terminate {} (pid {}): {}", self.program, pid, err),
        }
        true
    }

    pub(crate) fn mark_exited(&self) {
        self.exited.store(true, Ordering::SeqCst);
    }
}

impl fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("program", &self.program)
            .field("pid", &self.pid)
            .field("kill_requested", &self.kill_requested())
            .field("exited", &self.has_exited())
            .finish()
    }
}

/// A child started by the [`Supervisor`] with both output streams captured.
#[derive(Debug)]
pub struct SpawnedProcess {
    handle: ProcessHandle,
    child: Child,
}

impl SpawnedProcess {
    pub fn handle(&self) -> &ProcessHandle {
        &self.handle
    }

    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.child.stdout.take()
    }

    pub fn take_stderr(&mut self) -> Option<ChildStderr> {
        self.child.stderr.take()
    }

    /// Waits for the exit status. Later kills become no-ops.
    pub async fn wait(&mut self) -> io::Result<ExitStatus> {
        let status = self.child.wait().await;
        self.handle.mark_exited();
        let status = status?;
        grab_debug!("{} exited with {}", self.handle.program, status);
        Ok(status)
    }
}

/// Starts external tools so that they can later be torn down as a tree.
#[derive(Clone)]
pub struct Supervisor {
    killer: Arc<dyn TreeKiller>,
}

impl Supervisor {
    pub fn new(killer: Arc<dyn TreeKiller>) -> Self {
        Self { killer }
    }

    pub fn spawn(
        &self,
        tool: &ToolCommand,
        args: Vec<OsString>,
    ) -> Result<SpawnedProcess, SpawnError> {
        let program = tool.display_name();
        let args = tool.args_with(args);
        grab_debug!("spawning {} {:?}", program, args);

        let mut command = Command::new(&tool.program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Own process group, so a kill also reaches helpers the tool starts.
        #[cfg(unix)]
        command.process_group(0);

        let child = command.spawn().map_err(|source| SpawnError {
            program: program.clone(),
            source,
        })?;
        let handle = ProcessHandle::new(&program, child.id(), self.killer.clone());
        grab_info!("started {} (pid {:?})", program, handle.pid());
        Ok(SpawnedProcess { handle, child })
    }
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new(platform_killer())
    }
}
