// std::process::Command launcher
// Portable fallback for platforms without fork; same redirect-before-launch
// and wait-for-exit contract as ForkExecLauncher

use std::fs::{File, OpenOptions};
use std::io;
use std::process::{Command, ExitStatus, Stdio};

use tracing::debug;

use systemcalls_core::config::ExecConfig;
use systemcalls_core::domain::{ChildOutcome, CommandSpec, RedirectTarget, StdoutTarget};
use systemcalls_core::port::{ExecError, ProcessLauncher};

/// Process launcher backed by `std::process::Command`
///
/// The redirect target is opened in the caller and handed to the child as
/// its stdout, so the caller's own stdout is never rebound.
#[derive(Debug, Clone)]
pub struct StdCommandLauncher {
    #[cfg_attr(not(unix), allow(dead_code))]
    redirect_file_mode: u32,
}

impl StdCommandLauncher {
    pub fn new(redirect_file_mode: u32) -> Self {
        Self { redirect_file_mode }
    }

    pub fn from_config(config: &ExecConfig) -> Self {
        Self::new(config.redirect_file_mode)
    }

    fn open_target(&self, target: &RedirectTarget) -> Result<File, ExecError> {
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(self.redirect_file_mode);
        }

        options
            .open(target.path())
            .map_err(|e| ExecError::RedirectSetupFailed {
                target: target.to_string(),
                reason: e.to_string(),
            })
    }
}

impl Default for StdCommandLauncher {
    fn default() -> Self {
        Self::from_config(&ExecConfig::default())
    }
}

impl ProcessLauncher for StdCommandLauncher {
    fn launch(
        &self,
        command: &CommandSpec,
        stdout: &StdoutTarget,
    ) -> Result<ChildOutcome, ExecError> {
        let mut cmd = Command::new(command.program());
        cmd.args(command.args());

        if let StdoutTarget::File(target) = stdout {
            cmd.stdout(Stdio::from(self.open_target(target)?));
        }

        let status = cmd.status().map_err(|e| spawn_error(command, e))?;
        debug!(command = %command, status = %status, "Child process exited");

        exit_outcome(status)
    }

    fn name(&self) -> &'static str {
        "std-command"
    }
}

fn spawn_error(command: &CommandSpec, err: io::Error) -> ExecError {
    match err.kind() {
        // std reports the child's exec errno back to the caller
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => ExecError::ExecFailed {
            path: command.program().to_string(),
            reason: err.to_string(),
        },
        _ => ExecError::LaunchFailed(format!("spawning {}: {err}", command.program())),
    }
}

fn exit_outcome(status: ExitStatus) -> Result<ChildOutcome, ExecError> {
    if let Some(code) = status.code() {
        return Ok(ChildOutcome::Exited(code));
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return Ok(ChildOutcome::Signaled(signal));
        }
    }

    Err(ExecError::WaitFailed(format!(
        "child finished without exit status: {status}"
    )))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> CommandSpec {
        CommandSpec::new("/bin/sh", &["-c", script]).unwrap()
    }

    #[test]
    fn test_exit_status_reported() {
        let launcher = StdCommandLauncher::default();

        assert_eq!(
            launcher.launch(&sh("exit 0"), &StdoutTarget::Inherit).unwrap(),
            ChildOutcome::Exited(0)
        );
        assert_eq!(
            launcher.launch(&sh("exit 42"), &StdoutTarget::Inherit).unwrap(),
            ChildOutcome::Exited(42)
        );
    }

    #[test]
    fn test_signal_reported() {
        let launcher = StdCommandLauncher::default();

        let outcome = launcher
            .launch(&sh("kill -KILL $$"), &StdoutTarget::Inherit)
            .unwrap();
        assert_eq!(outcome, ChildOutcome::Signaled(9));
    }

    #[test]
    fn test_missing_executable_is_exec_failure() {
        let launcher = StdCommandLauncher::default();
        let args: [&str; 0] = [];
        let cmd = CommandSpec::new("/definitely/not/here", &args).unwrap();

        let err = launcher.launch(&cmd, &StdoutTarget::Inherit).unwrap_err();
        assert!(matches!(err, ExecError::ExecFailed { .. }), "{err:?}");
    }

    #[test]
    fn test_redirect_writes_and_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");
        std::fs::write(&out, "previous run output\n").unwrap();

        let launcher = StdCommandLauncher::default();
        let cmd = CommandSpec::new("/bin/echo", &["hello"]).unwrap();
        let target = StdoutTarget::File(RedirectTarget::new(&out).unwrap());

        assert!(launcher.launch(&cmd, &target).unwrap().success());
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "hello\n");
    }

    #[test]
    fn test_redirect_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("missing").join("out.txt");

        let launcher = StdCommandLauncher::default();
        let cmd = CommandSpec::new("/bin/echo", &["hello"]).unwrap();
        let target = StdoutTarget::File(RedirectTarget::new(&out).unwrap());

        let err = launcher.launch(&cmd, &target).unwrap_err();
        assert!(matches!(err, ExecError::RedirectSetupFailed { .. }), "{err:?}");
    }
}
