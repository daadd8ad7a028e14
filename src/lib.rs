//! Diagnostic HTTP endpoint that simulates transient backend failures.

pub mod cli;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod simulation;

pub use config::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use simulation::FailureCycle;
