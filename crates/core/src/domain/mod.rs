// Domain Layer - Pure value types, no OS access

pub mod command;
pub mod error;
pub mod outcome;

// Re-exports
pub use command::{CommandSpec, RedirectTarget, StdoutTarget};
pub use error::DomainError;
pub use outcome::ChildOutcome;
