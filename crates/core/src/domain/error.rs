// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Command is empty: at least the executable path is required")]
    EmptyCommand,

    #[error("Executable path must be absolute: {0}")]
    RelativePath(String),

    #[error("Argument contains an interior NUL byte: {0:?}")]
    InteriorNul(String),

    #[error("Redirect target is empty")]
    EmptyRedirectTarget,
}

pub type Result<T> = std::result::Result<T, DomainError>;
