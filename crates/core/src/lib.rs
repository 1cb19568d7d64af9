// systemcalls Core - Domain, Ports & Execution Service
// NO system dependencies: OS process primitives live behind port::ProcessLauncher

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod port;

pub use application::ExecService;
pub use config::ExecConfig;
pub use error::{AppError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
