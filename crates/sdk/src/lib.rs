//! systemcalls - blocking process execution
//!
//! Three independent, synchronous operations, each creating exactly one
//! child process and returning once it has terminated:
//!
//! - [`shell_exec`]: run a command line through the system shell
//! - [`direct_exec`]: run an executable by absolute path, no shell
//! - [`redirect_exec`]: like [`direct_exec`], with stdout written to a file
//!
//! Each returns `true` only when the child exited with status 0. The
//! `try_*` variants return the [`ExecError`] instead of collapsing it.
//!
//! # Example
//!
//! ```no_run
//! use systemcalls::{direct_exec, redirect_exec, shell_exec};
//!
//! assert!(shell_exec("test -d /tmp && echo ok | tr a-z A-Z"));
//! assert!(direct_exec("/bin/mkdir", &["-p", "/tmp/build"]));
//! assert!(redirect_exec("/bin/echo", &["hello"], "/tmp/build/hello.txt"));
//! ```
//!
//! Configuration is read from `SYSTEMCALLS_*` environment variables on every
//! call (see [`ExecConfig::from_env`]); nothing is cached between calls.

use std::path::Path;

use tracing::warn;

pub use systemcalls_core::domain::{ChildOutcome, CommandSpec, DomainError, RedirectTarget};
pub use systemcalls_core::port::{ExecError, ProcessLauncher};
pub use systemcalls_core::{ExecConfig, ExecService};
pub use systemcalls_infra_system::{platform_launcher, StdCommandLauncher};
#[cfg(unix)]
pub use systemcalls_infra_system::ForkExecLauncher;

/// Execution service for the current environment
///
/// Falls back to defaults (with a warning) when the environment holds
/// invalid settings.
pub fn service() -> ExecService {
    let config = ExecConfig::from_env().unwrap_or_else(|e| {
        warn!(error = %e, "Invalid SYSTEMCALLS_* environment, using defaults");
        ExecConfig::default()
    });
    service_with(config)
}

/// Execution service bound to an explicit configuration
pub fn service_with(config: ExecConfig) -> ExecService {
    ExecService::new(platform_launcher(&config), config)
}

/// Run `command` through the system shell; `true` iff it exited 0
pub fn shell_exec(command: &str) -> bool {
    service().shell_exec(command)
}

pub fn try_shell_exec(command: &str) -> Result<(), ExecError> {
    service().try_shell_exec(command)
}

/// Run the executable at absolute `path` with `args`; `true` iff it exited 0
pub fn direct_exec<S: AsRef<str>>(path: &str, args: &[S]) -> bool {
    service().direct_exec(path, args)
}

pub fn try_direct_exec<S: AsRef<str>>(path: &str, args: &[S]) -> Result<(), ExecError> {
    service().try_direct_exec(path, args)
}

/// Run the executable at absolute `path` with its stdout written to
/// `output_file`; `true` iff it exited 0
pub fn redirect_exec<S, P>(path: &str, args: &[S], output_file: P) -> bool
where
    S: AsRef<str>,
    P: AsRef<Path>,
{
    service().redirect_exec(path, args, output_file)
}

pub fn try_redirect_exec<S, P>(path: &str, args: &[S], output_file: P) -> Result<(), ExecError>
where
    S: AsRef<str>,
    P: AsRef<Path>,
{
    service().try_redirect_exec(path, args, output_file)
}

/// Whether the system shell can be launched
pub fn shell_available() -> bool {
    service().shell_available()
}
