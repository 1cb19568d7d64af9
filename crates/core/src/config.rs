// Execution configuration
// Defaults per platform, overridable through SYSTEMCALLS_* environment variables

use serde::{Deserialize, Serialize};

use crate::application::constants::{
    DEFAULT_EXEC_FAILURE_EXIT_CODE, DEFAULT_REDIRECT_FILE_MODE, UNIX_SHELL, UNIX_SHELL_FLAG,
    WINDOWS_SHELL, WINDOWS_SHELL_FLAG,
};
use crate::error::{AppError, Result};

pub const ENV_SHELL: &str = "SYSTEMCALLS_SHELL";
pub const ENV_SHELL_FLAG: &str = "SYSTEMCALLS_SHELL_FLAG";
pub const ENV_EXEC_FAILURE_CODE: &str = "SYSTEMCALLS_EXEC_FAILURE_CODE";
pub const ENV_REDIRECT_MODE: &str = "SYSTEMCALLS_REDIRECT_MODE";

/// Execution configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecConfig {
    /// Command interpreter used by shell execution
    pub shell: String,

    /// Flag passed to the interpreter before the command line
    pub shell_flag: String,

    /// Exit status of a child that could not exec (1..=255)
    pub exec_failure_exit_code: i32,

    /// Unix permission bits for created redirect targets
    pub redirect_file_mode: u32,
}

impl Default for ExecConfig {
    fn default() -> Self {
        let (shell, shell_flag) = if cfg!(windows) {
            (WINDOWS_SHELL, WINDOWS_SHELL_FLAG)
        } else {
            (UNIX_SHELL, UNIX_SHELL_FLAG)
        };

        Self {
            shell: shell.to_string(),
            shell_flag: shell_flag.to_string(),
            exec_failure_exit_code: DEFAULT_EXEC_FAILURE_EXIT_CODE,
            redirect_file_mode: DEFAULT_REDIRECT_FILE_MODE,
        }
    }
}

impl ExecConfig {
    /// Load configuration from the process environment
    ///
    /// # Environment Variables
    ///
    /// - `SYSTEMCALLS_SHELL`: interpreter path (default `/bin/sh`)
    /// - `SYSTEMCALLS_SHELL_FLAG`: interpreter flag (default `-c`)
    /// - `SYSTEMCALLS_EXEC_FAILURE_CODE`: child status on exec failure (default 127)
    /// - `SYSTEMCALLS_REDIRECT_MODE`: octal file mode for redirect targets (default 644)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup, over defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(shell) = lookup(ENV_SHELL) {
            config.shell = shell;
        }
        if let Some(flag) = lookup(ENV_SHELL_FLAG) {
            config.shell_flag = flag;
        }
        if let Some(code) = lookup(ENV_EXEC_FAILURE_CODE) {
            config.exec_failure_exit_code = code.trim().parse().map_err(|_| {
                AppError::Config(format!("{ENV_EXEC_FAILURE_CODE} is not an integer: {code}"))
            })?;
        }
        if let Some(mode) = lookup(ENV_REDIRECT_MODE) {
            config.redirect_file_mode = u32::from_str_radix(mode.trim(), 8).map_err(|_| {
                AppError::Config(format!("{ENV_REDIRECT_MODE} is not an octal mode: {mode}"))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check invariants the launchers rely on
    pub fn validate(&self) -> Result<()> {
        if self.shell.trim().is_empty() {
            return Err(AppError::Config("shell must not be empty".to_string()));
        }
        // An empty flag would make the shell read the command as a script path
        if self.shell_flag.trim().is_empty() {
            return Err(AppError::Config("shell_flag must not be empty".to_string()));
        }
        // A zero status would make a failed exec look like success
        if !(1..=255).contains(&self.exec_failure_exit_code) {
            return Err(AppError::Config(format!(
                "exec_failure_exit_code must be in 1..=255, got {}",
                self.exec_failure_exit_code
            )));
        }
        if self.redirect_file_mode > 0o7777 {
            return Err(AppError::Config(format!(
                "redirect_file_mode out of range: {:o}",
                self.redirect_file_mode
            )));
        }
        Ok(())
    }
}
