// Application Layer - Use cases

pub mod constants;
pub mod exec_service;

// Re-exports
pub use exec_service::ExecService;
