// Child process termination outcome

use std::fmt;

/// How a reaped child terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildOutcome {
    /// Ran to completion with this exit status
    Exited(i32),
    /// Terminated by this signal number
    Signaled(i32),
}

impl ChildOutcome {
    /// Only a zero exit status counts as success
    pub fn success(&self) -> bool {
        matches!(self, ChildOutcome::Exited(0))
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ChildOutcome::Exited(code) => Some(*code),
            ChildOutcome::Signaled(_) => None,
        }
    }

    pub fn signal(&self) -> Option<i32> {
        match self {
            ChildOutcome::Exited(_) => None,
            ChildOutcome::Signaled(signal) => Some(*signal),
        }
    }
}

impl fmt::Display for ChildOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChildOutcome::Exited(code) => write!(f, "exited with status {code}"),
            ChildOutcome::Signaled(signal) => write!(f, "terminated by signal {signal}"),
        }
    }
}
