// Port Layer - Interfaces for external dependencies

pub mod process_launcher;

// Re-exports
pub use process_launcher::{ExecError, ProcessLauncher};
