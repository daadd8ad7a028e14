//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Request handler produces:
//!     → logging.rs (structured log events, stderr)
//!     → metrics.rs (counters, histograms)
//!     → request_log.rs (raw/JSON request dumps, stdout or file)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through all log events
//! - Metrics are cheap (no-op without an exporter)
//! - Request dumps are opt-in

pub mod logging;
pub mod metrics;
pub mod request_log;

pub use request_log::{RecordedRequest, RequestRecorder};
