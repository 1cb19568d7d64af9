// Process Launcher Port
// Abstraction over the OS primitives that create, exec and reap one child

use thiserror::Error;

use crate::domain::{ChildOutcome, CommandSpec, DomainError, StdoutTarget};

/// Execution errors
///
/// Every variant collapses to `false` at the boolean API boundary; the
/// `try_*` operations surface them unchanged.
#[derive(Error, Debug)]
pub enum ExecError {
    #[error("Invalid command: {0}")]
    InvalidCommand(#[from] DomainError),

    #[error("Launch failed: {0}")]
    LaunchFailed(String),

    #[error("Exec of {path} failed: {reason}")]
    ExecFailed { path: String, reason: String },

    #[error("Wait failed: {0}")]
    WaitFailed(String),

    #[error("Redirect to {target} failed: {reason}")]
    RedirectSetupFailed { target: String, reason: String },

    #[error("Process exited with status {0}")]
    NonZeroExit(i32),

    #[error("Process terminated by signal {0}")]
    Signaled(i32),
}

impl ExecError {
    /// Map a reaped child's outcome to `Ok` only for exit status 0
    pub fn check_outcome(outcome: ChildOutcome) -> Result<(), ExecError> {
        match outcome {
            ChildOutcome::Exited(0) => Ok(()),
            ChildOutcome::Exited(code) => Err(ExecError::NonZeroExit(code)),
            ChildOutcome::Signaled(signal) => Err(ExecError::Signaled(signal)),
        }
    }
}

/// Process Launcher trait
///
/// Implementations:
/// - ForkExecLauncher: fork + dup2 + execv + waitpid (Unix)
/// - StdCommandLauncher: `std::process::Command` (portable fallback)
///
/// A call creates exactly one child, blocks the calling thread until that
/// child terminates, and waits on no other process.
pub trait ProcessLauncher: Send + Sync {
    /// Run `command` to completion with its stdout bound to `stdout`
    ///
    /// Returns the child's termination outcome, whatever its exit status.
    ///
    /// # Errors
    /// - ExecError::LaunchFailed if the child cannot be created
    /// - ExecError::ExecFailed if the child cannot become `command`
    /// - ExecError::RedirectSetupFailed if `stdout` cannot be bound
    /// - ExecError::WaitFailed if the child's status cannot be collected
    fn launch(&self, command: &CommandSpec, stdout: &StdoutTarget)
        -> Result<ChildOutcome, ExecError>;

    /// Short adapter name for logs
    fn name(&self) -> &'static str;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Mock launcher behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Child exits with this status
        Exit(i32),
        /// Child is killed by this signal
        Signal(i32),
        /// Child cannot be created
        LaunchFail(String),
        /// Child cannot exec its image
        ExecFail(String),
        /// Redirect target cannot be opened
        RedirectFail(String),
    }

    /// One recorded `launch` call
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct LaunchCall {
        pub argv: Vec<String>,
        pub stdout: StdoutTarget,
    }

    /// Mock Process Launcher for testing
    #[derive(Clone)]
    pub struct MockLauncher {
        behavior: Arc<Mutex<MockBehavior>>,
        calls: Arc<Mutex<Vec<LaunchCall>>>,
    }

    impl MockLauncher {
        pub fn new(behavior: MockBehavior) -> Self {
            Self {
                behavior: Arc::new(Mutex::new(behavior)),
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn new_exit(code: i32) -> Self {
            Self::new(MockBehavior::Exit(code))
        }

        pub fn set_behavior(&self, behavior: MockBehavior) {
            *self.behavior.lock().unwrap() = behavior;
        }

        pub fn calls(&self) -> Vec<LaunchCall> {
            self.calls.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl ProcessLauncher for MockLauncher {
        fn launch(
            &self,
            command: &CommandSpec,
            stdout: &StdoutTarget,
        ) -> Result<ChildOutcome, ExecError> {
            self.calls.lock().unwrap().push(LaunchCall {
                argv: command.argv().map(str::to_string).collect(),
                stdout: stdout.clone(),
            });

            let behavior = self.behavior.lock().unwrap().clone();

            match behavior {
                MockBehavior::Exit(code) => Ok(ChildOutcome::Exited(code)),
                MockBehavior::Signal(signal) => Ok(ChildOutcome::Signaled(signal)),
                MockBehavior::LaunchFail(msg) => Err(ExecError::LaunchFailed(msg)),
                MockBehavior::ExecFail(reason) => Err(ExecError::ExecFailed {
                    path: command.program().to_string(),
                    reason,
                }),
                MockBehavior::RedirectFail(reason) => Err(ExecError::RedirectSetupFailed {
                    target: match stdout {
                        StdoutTarget::File(target) => target.to_string(),
                        StdoutTarget::Inherit => "<stdout>".to_string(),
                    },
                    reason,
                }),
            }
        }

        fn name(&self) -> &'static str {
            "mock"
        }
    }
}
