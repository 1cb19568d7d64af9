// Fork/exec launcher (Unix)
// reason: nix for fork, waitpid and descriptor plumbing; the raw execv/write
// calls go through nix's libc so the child never allocates after fork

use std::ffi::{CStr, CString};
use std::fs::File;
use std::io::Read;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::os::unix::ffi::OsStrExt;

use nix::errno::Errno;
use nix::fcntl::{open, OFlag};
use nix::libc;
use nix::sys::stat::Mode;
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{close, dup2, fork, ForkResult, Pid};
use tracing::debug;

use systemcalls_core::config::ExecConfig;
use systemcalls_core::domain::{ChildOutcome, CommandSpec, StdoutTarget};
use systemcalls_core::port::{ExecError, ProcessLauncher};

/// Size of a child failure report: stage (u32) + errno (i32)
const REPORT_LEN: usize = 8;

/// Point in the child at which setup failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
enum ChildStage {
    Redirect = 1,
    Exec = 2,
}

impl ChildStage {
    fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            1 => Some(ChildStage::Redirect),
            2 => Some(ChildStage::Exec),
            _ => None,
        }
    }
}

/// Fork/exec process launcher
///
/// Forks the caller, points fd 1 at the redirect target inside the child
/// when one is requested, and replaces the child image with `execv` (no
/// shell, no `PATH` search). If the child cannot get that far it reports
/// `(stage, errno)` over a close-on-exec pipe and `_exit`s with the
/// configured failure status, so it never runs caller code. The parent reaps
/// exactly the pid it forked.
#[derive(Debug, Clone)]
pub struct ForkExecLauncher {
    exec_failure_exit_code: i32,
    redirect_file_mode: u32,
}

impl ForkExecLauncher {
    /// Create a new fork/exec launcher
    ///
    /// # Arguments
    /// * `exec_failure_exit_code` - Status a child exits with when exec or redirect setup fails
    /// * `redirect_file_mode` - Permission bits for created redirect targets
    pub fn new(exec_failure_exit_code: i32, redirect_file_mode: u32) -> Self {
        Self {
            exec_failure_exit_code,
            redirect_file_mode,
        }
    }

    pub fn from_config(config: &ExecConfig) -> Self {
        Self::new(config.exec_failure_exit_code, config.redirect_file_mode)
    }
}

impl Default for ForkExecLauncher {
    fn default() -> Self {
        Self::from_config(&ExecConfig::default())
    }
}

impl ProcessLauncher for ForkExecLauncher {
    fn launch(
        &self,
        command: &CommandSpec,
        stdout: &StdoutTarget,
    ) -> Result<ChildOutcome, ExecError> {
        let image = ExecImage::prepare(command, stdout)?;
        let (report_rd, report_wr) = report_pipe()?;
        let mode = Mode::from_bits_truncate(self.redirect_file_mode as libc::mode_t);

        // SAFETY: between fork and exec the child only makes async-signal-safe
        // calls on memory prepared above, then execs or _exits.
        match unsafe { fork() } {
            Err(errno) => Err(ExecError::LaunchFailed(format!("fork failed: {errno}"))),
            Ok(ForkResult::Child) => exec_child(
                &image,
                report_wr.as_raw_fd(),
                mode,
                self.exec_failure_exit_code,
            ),
            Ok(ForkResult::Parent { child }) => {
                drop(report_wr);
                debug!(pid = %child, command = %command, "Forked child process");

                // Returns once the child has exec'd or exited
                let report = read_report(report_rd);
                let outcome = wait_for(child)?;

                debug!(pid = %child, outcome = %outcome, "Reaped child process");

                match report? {
                    Some((stage, errno)) => Err(stage_error(stage, errno, command, stdout)),
                    None => Ok(outcome),
                }
            }
        }
    }

    fn name(&self) -> &'static str {
        "fork-exec"
    }
}

/// Everything the child touches, built before fork
struct ExecImage {
    path: CString,
    // Owns the strings `argv` points into
    _args: Vec<CString>,
    argv: Vec<*const libc::c_char>,
    redirect: Option<CString>,
}

impl ExecImage {
    fn prepare(command: &CommandSpec, stdout: &StdoutTarget) -> Result<Self, ExecError> {
        let path = to_cstring(command.program().as_bytes())?;
        let args = command
            .argv()
            .map(|arg| to_cstring(arg.as_bytes()))
            .collect::<Result<Vec<_>, _>>()?;

        let mut argv: Vec<*const libc::c_char> = args.iter().map(|arg| arg.as_ptr()).collect();
        argv.push(std::ptr::null());

        let redirect = match stdout {
            StdoutTarget::Inherit => None,
            StdoutTarget::File(target) => {
                Some(to_cstring(target.path().as_os_str().as_bytes())?)
            }
        };

        Ok(Self {
            path,
            _args: args,
            argv,
            redirect,
        })
    }
}

fn to_cstring(bytes: &[u8]) -> Result<CString, ExecError> {
    CString::new(bytes)
        .map_err(|e| ExecError::LaunchFailed(format!("argument not representable as C string: {e}")))
}

/// Child side of the fork. Never returns.
fn exec_child(image: &ExecImage, report_fd: RawFd, mode: Mode, failure_code: i32) -> ! {
    if let Some(target) = image.redirect.as_deref() {
        if let Err(errno) = redirect_stdout(target, mode) {
            report_and_exit(report_fd, ChildStage::Redirect, errno, failure_code);
        }
    }

    // SAFETY: `path` and every `argv` entry point into CStrings owned by
    // `image`, and `argv` is NULL-terminated.
    unsafe { libc::execv(image.path.as_ptr(), image.argv.as_ptr()) };

    report_and_exit(report_fd, ChildStage::Exec, Errno::last(), failure_code)
}

fn redirect_stdout(target: &CStr, mode: Mode) -> Result<(), Errno> {
    let fd = open(
        target,
        OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
        mode,
    )?;
    dup2(fd, libc::STDOUT_FILENO)?;
    // fd is 1 when the caller had stdout closed
    if fd != libc::STDOUT_FILENO {
        close(fd)?;
    }
    Ok(())
}

fn report_and_exit(report_fd: RawFd, stage: ChildStage, errno: Errno, failure_code: i32) -> ! {
    let mut report = [0u8; REPORT_LEN];
    report[..4].copy_from_slice(&(stage as u32).to_ne_bytes());
    report[4..].copy_from_slice(&(errno as i32).to_ne_bytes());

    // SAFETY: write(2) of a stack buffer and _exit(2) are both
    // async-signal-safe. _exit skips atexit handlers and stdio flushing, so
    // nothing inherited from the parent runs in the child. A failed report
    // still exits with the failure status.
    unsafe {
        libc::write(report_fd, report.as_ptr().cast(), report.len());
        libc::_exit(failure_code)
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn report_pipe() -> Result<(OwnedFd, OwnedFd), ExecError> {
    nix::unistd::pipe2(OFlag::O_CLOEXEC)
        .map_err(|e| ExecError::LaunchFailed(format!("status pipe: {e}")))
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn report_pipe() -> Result<(OwnedFd, OwnedFd), ExecError> {
    use nix::fcntl::{fcntl, FcntlArg, FdFlag};

    let (rd, wr) =
        nix::unistd::pipe().map_err(|e| ExecError::LaunchFailed(format!("status pipe: {e}")))?;
    for fd in [&rd, &wr] {
        fcntl(fd.as_raw_fd(), FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC))
            .map_err(|e| ExecError::LaunchFailed(format!("status pipe: {e}")))?;
    }
    Ok((rd, wr))
}

/// Read the child's failure report; EOF without data means exec succeeded
fn read_report(report_rd: OwnedFd) -> Result<Option<(ChildStage, i32)>, ExecError> {
    let mut report = Vec::with_capacity(REPORT_LEN);
    File::from(report_rd)
        .read_to_end(&mut report)
        .map_err(|e| ExecError::WaitFailed(format!("reading child status pipe: {e}")))?;

    if report.is_empty() {
        return Ok(None);
    }
    if report.len() != REPORT_LEN {
        return Err(ExecError::WaitFailed(format!(
            "malformed child report ({} bytes)",
            report.len()
        )));
    }

    let mut stage = [0u8; 4];
    let mut errno = [0u8; 4];
    stage.copy_from_slice(&report[..4]);
    errno.copy_from_slice(&report[4..]);

    let stage = ChildStage::from_raw(u32::from_ne_bytes(stage)).ok_or_else(|| {
        ExecError::WaitFailed(format!("unknown child stage {}", u32::from_ne_bytes(stage)))
    })?;

    Ok(Some((stage, i32::from_ne_bytes(errno))))
}

fn stage_error(
    stage: ChildStage,
    errno: i32,
    command: &CommandSpec,
    stdout: &StdoutTarget,
) -> ExecError {
    let reason = std::io::Error::from_raw_os_error(errno).to_string();
    match stage {
        ChildStage::Exec => ExecError::ExecFailed {
            path: command.program().to_string(),
            reason,
        },
        ChildStage::Redirect => ExecError::RedirectSetupFailed {
            target: match stdout {
                StdoutTarget::File(target) => target.to_string(),
                StdoutTarget::Inherit => "<stdout>".to_string(),
            },
            reason,
        },
    }
}

/// Block until `child` terminates
fn wait_for(child: Pid) -> Result<ChildOutcome, ExecError> {
    loop {
        match waitpid(child, None) {
            Ok(WaitStatus::Exited(pid, code)) if pid == child => {
                return Ok(ChildOutcome::Exited(code));
            }
            Ok(WaitStatus::Signaled(pid, signal, _)) if pid == child => {
                return Ok(ChildOutcome::Signaled(signal as i32));
            }
            Ok(status) => {
                return Err(ExecError::WaitFailed(format!(
                    "unexpected wait status for child {child}: {status:?}"
                )));
            }
            Err(Errno::EINTR) => continue,
            Err(errno) => {
                return Err(ExecError::WaitFailed(format!(
                    "waitpid({child}) failed: {errno}"
                )));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use systemcalls_core::domain::RedirectTarget;

    fn sh(script: &str) -> CommandSpec {
        CommandSpec::new("/bin/sh", &["-c", script]).unwrap()
    }

    fn to_file(path: &std::path::Path) -> StdoutTarget {
        StdoutTarget::File(RedirectTarget::new(path).unwrap())
    }

    #[test]
    fn test_exit_status_reported() {
        let launcher = ForkExecLauncher::default();

        let outcome = launcher.launch(&sh("exit 0"), &StdoutTarget::Inherit).unwrap();
        assert_eq!(outcome, ChildOutcome::Exited(0));

        let outcome = launcher.launch(&sh("exit 3"), &StdoutTarget::Inherit).unwrap();
        assert_eq!(outcome, ChildOutcome::Exited(3));
    }

    #[test]
    fn test_signal_reported() {
        let launcher = ForkExecLauncher::default();

        let outcome = launcher
            .launch(&sh("kill -TERM $$"), &StdoutTarget::Inherit)
            .unwrap();
        assert_eq!(outcome, ChildOutcome::Signaled(libc::SIGTERM));
    }

    #[test]
    fn test_missing_executable_is_exec_failure() {
        let launcher = ForkExecLauncher::default();
        let args: [&str; 0] = [];
        let cmd = CommandSpec::new("/definitely/not/here", &args).unwrap();

        let err = launcher.launch(&cmd, &StdoutTarget::Inherit).unwrap_err();
        match err {
            ExecError::ExecFailed { path, reason } => {
                assert_eq!(path, "/definitely/not/here");
                assert!(reason.contains("No such file"), "{reason}");
            }
            other => panic!("expected ExecFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_non_executable_file_is_exec_failure() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("not-executable");
        std::fs::write(&script, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o644)).unwrap();

        let launcher = ForkExecLauncher::default();
        let args: [&str; 0] = [];
        let cmd = CommandSpec::new(script.to_str().unwrap(), &args).unwrap();

        let err = launcher.launch(&cmd, &StdoutTarget::Inherit).unwrap_err();
        assert!(matches!(err, ExecError::ExecFailed { .. }), "{err:?}");
    }

    #[test]
    fn test_redirect_writes_and_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");
        std::fs::write(&out, "stale content that is longer than the new output\n").unwrap();

        let launcher = ForkExecLauncher::default();
        let cmd = CommandSpec::new("/bin/echo", &["hello"]).unwrap();

        let outcome = launcher.launch(&cmd, &to_file(&out)).unwrap();
        assert!(outcome.success());
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "hello\n");
    }

    #[test]
    fn test_redirect_args_reach_target_unmodified() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("args.txt");

        let launcher = ForkExecLauncher::default();
        let cmd = CommandSpec::new(
            "/bin/sh",
            &["-c", r#"printf '%s|' "$@""#, "sh", "a b", "*", ">", "$HOME"],
        )
        .unwrap();

        let outcome = launcher.launch(&cmd, &to_file(&out)).unwrap();
        assert!(outcome.success());
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "a b|*|>|$HOME|");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_argv0_is_executable_path() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("cmdline");

        let launcher = ForkExecLauncher::default();
        let cmd = CommandSpec::new("/bin/cat", &["/proc/self/cmdline"]).unwrap();

        launcher.launch(&cmd, &to_file(&out)).unwrap();
        assert_eq!(
            std::fs::read(&out).unwrap(),
            b"/bin/cat\0/proc/self/cmdline\0".to_vec()
        );
    }

    #[test]
    fn test_redirect_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("missing").join("out.txt");

        let launcher = ForkExecLauncher::default();
        let cmd = CommandSpec::new("/bin/echo", &["hello"]).unwrap();

        let err = launcher.launch(&cmd, &to_file(&out)).unwrap_err();
        match err {
            ExecError::RedirectSetupFailed { target, .. } => {
                assert!(target.ends_with("out.txt"), "{target}");
            }
            other => panic!("expected RedirectSetupFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_redirect_file_mode_applied() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("private.txt");

        let launcher = ForkExecLauncher::new(127, 0o600);
        let cmd = CommandSpec::new("/bin/echo", &["secret"]).unwrap();

        launcher.launch(&cmd, &to_file(&out)).unwrap();
        let mode = std::fs::metadata(&out).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    /// Fork a child straight into `exec_child` with an unwritable report fd
    /// and return its raw exit status.
    fn reaped_status_without_report(
        cmd: &CommandSpec,
        stdout: &StdoutTarget,
        failure_code: i32,
    ) -> ChildOutcome {
        let image = ExecImage::prepare(cmd, stdout).unwrap();
        let mode = Mode::from_bits_truncate(0o644);

        // SAFETY: the child only runs exec_child, which execs or _exits
        match unsafe { fork() }.unwrap() {
            ForkResult::Child => exec_child(&image, -1, mode, failure_code),
            ForkResult::Parent { child } => wait_for(child).unwrap(),
        }
    }

    #[test]
    fn test_failed_exec_exits_with_configured_status() {
        let args: [&str; 0] = [];
        let cmd = CommandSpec::new("/definitely/not/here", &args).unwrap();

        let outcome = reaped_status_without_report(&cmd, &StdoutTarget::Inherit, 42);
        assert_eq!(outcome, ChildOutcome::Exited(42));
        assert!(!outcome.success());
    }

    #[test]
    fn test_failed_redirect_exits_with_configured_status() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("missing").join("out.txt");
        let cmd = CommandSpec::new("/bin/echo", &["hello"]).unwrap();

        let outcome = reaped_status_without_report(&cmd, &to_file(&out), 127);
        assert_eq!(outcome, ChildOutcome::Exited(127));
        assert!(!out.exists());
    }

    #[test]
    fn test_prepared_argv_is_null_terminated() {
        let cmd = CommandSpec::new("/bin/echo", &["a", "b"]).unwrap();
        let image = ExecImage::prepare(&cmd, &StdoutTarget::Inherit).unwrap();

        assert_eq!(image.argv.len(), 4);
        assert!(image.argv[3].is_null());
        assert_eq!(image.path.as_bytes(), b"/bin/echo");
        assert!(image.redirect.is_none());
    }
}
