use crate::input::InputFile;
use crate::outcome::{
    CHILD_EXIT_UNDEFINED, ExitConvention, TerminationStatus, child_exit_code,
};
use crate::target::FuzzTarget;
use serde::Deserialize;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use thiserror::Error;

/// Flag that switches the driver into single-input child mode.
pub const CHILD_FLAG: &str = "--fuzz-child";

/// Runs one input against the target in a disposable execution context.
pub trait Executor {
    fn name(&self) -> &'static str;

    /// How clean exit codes produced by this executor are to be read.
    fn exit_convention(&self) -> ExitConvention;

    /// Blocks until the execution context for `input` has terminated.
    fn execute_isolated(&mut self, input: &InputFile) -> TerminationStatus;
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum IsolationKind {
    Fork,
    Spawn,
}

impl IsolationKind {
    pub fn platform_default() -> Self {
        if cfg!(unix) {
            IsolationKind::Fork
        } else {
            IsolationKind::Spawn
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IsolationKind::Fork => "fork",
            IsolationKind::Spawn => "spawn",
        }
    }
}

impl Default for IsolationKind {
    fn default() -> Self {
        Self::platform_default()
    }
}

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("{} isolation is not supported on this platform", .0.as_str())]
    Unsupported(IsolationKind),
    #[error("cannot locate the driver executable for spawn isolation: {0}")]
    CurrentExe(#[source] io::Error),
}

pub fn build_executor(
    kind: IsolationKind,
    target: FuzzTarget,
) -> Result<Box<dyn Executor>, BuildError> {
    match kind {
        #[cfg(unix)]
        IsolationKind::Fork => Ok(Box::new(ForkExecutor::new(target))),
        #[cfg(not(unix))]
        IsolationKind::Fork => {
            let _ = target;
            Err(BuildError::Unsupported(kind))
        }
        IsolationKind::Spawn => Ok(Box::new(
            SpawnExecutor::current_exe().map_err(BuildError::CurrentExe)?,
        )),
    }
}

/// Runs each input in a `fork()`ed copy of the driver.
///
/// The child calls the target directly and exits with the encoded return value;
/// the parent decodes the wait status.
#[cfg(unix)]
pub struct ForkExecutor {
    target: FuzzTarget,
}

#[cfg(unix)]
impl ForkExecutor {
    pub fn new(target: FuzzTarget) -> Self {
        Self { target }
    }
}

#[cfg(unix)]
impl Executor for ForkExecutor {
    fn name(&self) -> &'static str {
        "fork"
    }

    fn exit_convention(&self) -> ExitConvention {
        ExitConvention::Direct
    }

    fn execute_isolated(&mut self, input: &InputFile) -> TerminationStatus {
        flush_std_streams();

        // SAFETY: the child never returns into driver code; it runs the target and `_exit`s.
        let pid = unsafe { libc::fork() };
        if pid < 0 {
            let err = io::Error::last_os_error();
            tracing::warn!(path = ?input.path, error = %err, "fork failed");
            return TerminationStatus::LaunchFailed(format!("fork failed: {err}"));
        }

        if pid == 0 {
            let ret = self.target.invoke_contained(input.as_bytes());
            let status = crate::outcome::fork_exit_status(ret);
            // SAFETY: `_exit` skips atexit handlers and stdio teardown owned by the parent.
            unsafe { libc::_exit(status) }
        }

        tracing::trace!(pid, path = ?input.path, "forked child");
        wait_for_child(pid)
    }
}

#[cfg(unix)]
fn wait_for_child(pid: libc::pid_t) -> TerminationStatus {
    let mut status: libc::c_int = 0;
    loop {
        // SAFETY: `status` is a valid out-pointer for the duration of the call.
        let rc = unsafe { libc::waitpid(pid, &mut status, 0) };
        if rc == pid {
            break;
        }
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::Interrupted {
            continue;
        }
        tracing::warn!(pid, error = %err, "waitpid failed");
        return TerminationStatus::StatusUnavailable(format!("waitpid({pid}) failed: {err}"));
    }

    if libc::WIFEXITED(status) {
        TerminationStatus::Exited(libc::WEXITSTATUS(status))
    } else if libc::WIFSIGNALED(status) {
        TerminationStatus::Signaled(libc::WTERMSIG(status))
    } else {
        TerminationStatus::StatusUnavailable(format!("unrecognised wait status {status:#x}"))
    }
}

#[cfg(unix)]
fn flush_std_streams() {
    use std::io::Write;
    // Anything still buffered would otherwise be written twice, once per process.
    let _ = io::stdout().flush();
    let _ = io::stderr().flush();
}

/// Runs each input by re-invoking a driver executable in child mode.
///
/// The child is started as `<program> --fuzz-child=<path>` and reports through one
/// of the reserved exit codes; see [`run_child`].
pub struct SpawnExecutor {
    program: PathBuf,
}

impl SpawnExecutor {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn current_exe() -> io::Result<Self> {
        Ok(Self::new(std::env::current_exe()?))
    }
}

impl Executor for SpawnExecutor {
    fn name(&self) -> &'static str {
        "spawn"
    }

    fn exit_convention(&self) -> ExitConvention {
        ExitConvention::Reserved
    }

    fn execute_isolated(&mut self, input: &InputFile) -> TerminationStatus {
        let mut cmd = Command::new(&self.program);
        cmd.arg(child_argument(&input.path)).stdin(Stdio::null());

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                tracing::warn!(program = ?self.program, error = %e, "failed to spawn child");
                return TerminationStatus::LaunchFailed(format!(
                    "failed to spawn {:?}: {e}",
                    self.program
                ));
            }
        };
        tracing::trace!(pid = child.id(), path = ?input.path, "spawned child");

        match child.wait() {
            Ok(status) => decode_exit_status(status),
            Err(e) => {
                tracing::warn!(error = %e, "failed to wait for child");
                TerminationStatus::StatusUnavailable(format!("failed to wait for child: {e}"))
            }
        }
    }
}

/// Builds `--fuzz-child=<path>` as one argument so a path starting with `-`
/// cannot be mistaken for a flag by the child's parser.
fn child_argument(path: &Path) -> OsString {
    let mut arg = OsString::from(CHILD_FLAG);
    arg.push("=");
    arg.push(path);
    arg
}

fn decode_exit_status(status: ExitStatus) -> TerminationStatus {
    if let Some(code) = status.code() {
        return TerminationStatus::Exited(code);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return TerminationStatus::Signaled(signal);
        }
    }
    TerminationStatus::StatusUnavailable(format!("unrecognised exit status: {status}"))
}

/// Child-mode entry point: replays the single input at `path` and returns the
/// reserved exit code describing the verdict.
///
/// The initialize hook, if any, runs first with `[program, path]`. A file that
/// cannot be loaded is reported as undefined.
pub fn run_child(target: &FuzzTarget, path: &Path) -> i32 {
    let program = std::env::args_os()
        .next()
        .unwrap_or_else(|| OsString::from("fuzzreplay"));
    let mut args = vec![program, path.as_os_str().to_os_string()];
    target.initialize(&mut args);

    let input = match InputFile::load(path) {
        Ok(input) => input,
        Err(e) => {
            tracing::warn!(error = %e, "child could not load its input");
            return CHILD_EXIT_UNDEFINED;
        }
    };

    child_exit_code(target.invoke_contained(input.as_bytes()))
}
