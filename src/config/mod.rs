//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) + command line flags
//!     → loader.rs (parse & deserialize)
//!     → cli.rs (flag overrides)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//!     → handed to HttpServer at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no hot reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, read_config, ConfigError};
pub use schema::FailureCycleSettings;
pub use schema::ListenerConfig;
pub use schema::ObservabilityConfig;
pub use schema::RequestLogConfig;
pub use schema::RequestLogFormat;
pub use schema::ResponseConfig;
pub use schema::ServerConfig;
pub use validation::{validate_config, ValidationError};
