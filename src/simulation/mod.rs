//! Transient failure simulation.
//!
//! # Data Flow
//! ```text
//! [failure] settings
//!     → CyclePlan (validated counts and codes)
//!     → FailureCycle (Arc, shared by every request task)
//!     → evaluate() once per request → response status
//! ```

pub mod cycle;

pub use cycle::{CyclePlan, CycleSnapshot, FailureCycle, Outcome, Phase};
