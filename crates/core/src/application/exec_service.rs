// Execution service
// Shell, direct and redirected execution on top of a ProcessLauncher

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::application::constants::SHELL_PROBE_SCRIPT;
use crate::config::ExecConfig;
use crate::domain::{ChildOutcome, CommandSpec, DomainError, RedirectTarget, StdoutTarget};
use crate::port::{ExecError, ProcessLauncher};

/// Blocking process execution service
///
/// Each call creates exactly one child through the launcher and returns once
/// it has been reaped. The service holds no per-call state, so one instance
/// may be shared across threads.
#[derive(Clone)]
pub struct ExecService {
    launcher: Arc<dyn ProcessLauncher>,
    config: ExecConfig,
}

impl ExecService {
    /// Create a new execution service
    ///
    /// # Arguments
    /// * `launcher` - Adapter that creates and reaps child processes
    /// * `config` - Shell and child-failure settings
    ///
    /// # Example
    /// ```
    /// use std::sync::Arc;
    /// use systemcalls_core::application::ExecService;
    /// use systemcalls_core::config::ExecConfig;
    /// use systemcalls_core::port::process_launcher::mocks::MockLauncher;
    ///
    /// let service = ExecService::new(Arc::new(MockLauncher::new_exit(0)), ExecConfig::default());
    /// assert!(service.direct_exec("/bin/true", &[] as &[&str]));
    /// ```
    pub fn new(launcher: Arc<dyn ProcessLauncher>, config: ExecConfig) -> Self {
        Self { launcher, config }
    }

    pub fn config(&self) -> &ExecConfig {
        &self.config
    }

    /// Run a command line through the configured interpreter
    ///
    /// `command` is handed to the shell untouched; pipes, redirections and
    /// globs are interpreted by the shell. The caller is responsible for
    /// sanitizing it.
    pub fn shell_exec(&self, command: &str) -> bool {
        self.try_shell_exec(command).is_ok()
    }

    pub fn try_shell_exec(&self, command: &str) -> Result<(), ExecError> {
        let spec = CommandSpec::new(
            self.config.shell.as_str(),
            &[self.config.shell_flag.as_str(), command],
        )
        .map_err(|e| rejected("shell_exec", e))?;

        self.run("shell_exec", &spec, &StdoutTarget::Inherit)
    }

    /// Run an executable by absolute path, without a shell
    pub fn direct_exec<S: AsRef<str>>(&self, path: &str, args: &[S]) -> bool {
        self.try_direct_exec(path, args).is_ok()
    }

    pub fn try_direct_exec<S: AsRef<str>>(&self, path: &str, args: &[S]) -> Result<(), ExecError> {
        let spec = absolute_command(path, args).map_err(|e| rejected("direct_exec", e))?;
        self.run("direct_exec", &spec, &StdoutTarget::Inherit)
    }

    /// Run an executable by absolute path with its stdout written to
    /// `output_file` (created or truncated)
    ///
    /// The target's own argv is passed through unmodified; the redirection
    /// happens on the child's descriptor table, not through shell syntax.
    pub fn redirect_exec<S, P>(&self, path: &str, args: &[S], output_file: P) -> bool
    where
        S: AsRef<str>,
        P: AsRef<Path>,
    {
        self.try_redirect_exec(path, args, output_file).is_ok()
    }

    pub fn try_redirect_exec<S, P>(
        &self,
        path: &str,
        args: &[S],
        output_file: P,
    ) -> Result<(), ExecError>
    where
        S: AsRef<str>,
        P: AsRef<Path>,
    {
        let spec = absolute_command(path, args).map_err(|e| rejected("redirect_exec", e))?;
        let target = RedirectTarget::new(output_file.as_ref())
            .map_err(|e| rejected("redirect_exec", e))?;

        self.run("redirect_exec", &spec, &StdoutTarget::File(target))
    }

    /// Whether the configured interpreter can be launched at all
    pub fn shell_available(&self) -> bool {
        self.try_shell_exec(SHELL_PROBE_SCRIPT).is_ok()
    }

    fn run(
        &self,
        operation: &'static str,
        spec: &CommandSpec,
        stdout: &StdoutTarget,
    ) -> Result<(), ExecError> {
        let output_file = match stdout {
            StdoutTarget::File(target) => Some(target.to_string()),
            StdoutTarget::Inherit => None,
        };

        info!(
            operation,
            command = %spec,
            output_file = ?output_file,
            launcher = self.launcher.name(),
            "Starting child process"
        );

        let outcome = match self.launcher.launch(spec, stdout) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(operation, command = %spec, error = %e, "Child process failed to run");
                return Err(e);
            }
        };

        log_outcome(operation, spec, outcome);
        ExecError::check_outcome(outcome)
    }
}

fn absolute_command<S: AsRef<str>>(
    path: &str,
    args: &[S],
) -> Result<CommandSpec, DomainError> {
    CommandSpec::new(path, args)?.require_absolute()
}

fn rejected(operation: &'static str, err: DomainError) -> ExecError {
    warn!(operation, error = %err, "Command rejected before launch");
    ExecError::InvalidCommand(err)
}

fn log_outcome(operation: &'static str, spec: &CommandSpec, outcome: ChildOutcome) {
    if outcome.success() {
        info!(
            operation,
            command = %spec,
            exit_code = ?outcome.exit_code(),
            "Child process completed"
        );
    } else {
        warn!(
            operation,
            command = %spec,
            exit_code = ?outcome.exit_code(),
            signal = ?outcome.signal(),
            "Child process completed unsuccessfully"
        );
    }
}
