// systemcalls Infrastructure - OS process adapters
// Implements: ProcessLauncher

use std::sync::Arc;

use systemcalls_core::config::ExecConfig;
use systemcalls_core::port::ProcessLauncher;

pub mod command_launcher;
#[cfg(unix)]
pub mod fork_exec;

pub use command_launcher::StdCommandLauncher;
#[cfg(unix)]
pub use fork_exec::ForkExecLauncher;

/// Launcher native to the current platform
///
/// fork/exec on Unix, `std::process::Command` elsewhere.
pub fn platform_launcher(config: &ExecConfig) -> Arc<dyn ProcessLauncher> {
    #[cfg(unix)]
    {
        Arc::new(ForkExecLauncher::from_config(config))
    }

    #[cfg(not(unix))]
    {
        Arc::new(StdCommandLauncher::from_config(config))
    }
}
