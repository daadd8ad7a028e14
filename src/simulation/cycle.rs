//! Deterministic failure/success cycle.
//!
//! # States
//! - Failure: the configured failure code is returned
//! - Success: the configured success code is returned
//! - Passthrough: cycle disabled (or both phases empty), default code returned
//!
//! # State Transitions
//! ```text
//! Failure → Success: failure_count failures served, success_count > 0
//! Failure → Failure: failure_count failures served, success_count == 0
//! Success → Failure: success_count successes served, failure_count > 0
//! Success → Success: success_count successes served, failure_count == 0
//! ```
//!
//! # Design Decisions
//! - One exclusive lock around the whole read-modify-write
//! - No I/O and no await points while the lock is held
//! - A phase with a zero target is skipped entirely

use std::sync::{Mutex, MutexGuard, PoisonError};

use axum::http::StatusCode;

use crate::config::{FailureCycleSettings, ValidationError};
use crate::config::validation::parse_status_code;

/// Validated, immutable description of one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CyclePlan {
    pub failure_count: u32,
    pub success_count: u32,
    pub failure_code: StatusCode,
    pub success_code: StatusCode,
}

impl CyclePlan {
    /// Collect every problem with the raw settings.
    pub fn validate(settings: &FailureCycleSettings) -> Result<Self, Vec<ValidationError>> {
        let failure_count = parse_count("failure.failure_count", settings.failure_count);
        let success_count = parse_count("failure.success_count", settings.success_count);
        let failure_code = parse_status_code("failure.failure_code", settings.failure_code);
        let success_code = parse_status_code("failure.success_code", settings.success_code);

        match (failure_count, success_count, failure_code, success_code) {
            (Ok(failure_count), Ok(success_count), Ok(failure_code), Ok(success_code)) => Ok(Self {
                failure_count,
                success_count,
                failure_code,
                success_code,
            }),
            (a, b, c, d) => Err([a.err(), b.err(), c.err(), d.err()]
                .into_iter()
                .flatten()
                .collect()),
        }
    }

    /// Number of calls in one full cycle.
    pub fn cycle_len(&self) -> u64 {
        u64::from(self.failure_count) + u64::from(self.success_count)
    }
}

impl TryFrom<&FailureCycleSettings> for CyclePlan {
    type Error = ValidationError;

    fn try_from(settings: &FailureCycleSettings) -> Result<Self, Self::Error> {
        Self::validate(settings).map_err(|mut errors| errors.remove(0))
    }
}

fn parse_count(field: &'static str, value: i64) -> Result<u32, ValidationError> {
    if value < 0 {
        return Err(ValidationError::NegativeCount { field, value });
    }
    u32::try_from(value).map_err(|_| ValidationError::CountTooLarge {
        field,
        value,
        max: u32::MAX,
    })
}

/// Which part of the cycle produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Failure,
    Success,
    Passthrough,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Failure => "failure",
            Phase::Success => "success",
            Phase::Passthrough => "passthrough",
        }
    }
}

/// Result of a single evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub status: StatusCode,
    pub phase: Phase,
}

/// Point-in-time copy of the cycle counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CycleSnapshot {
    pub failure_iteration: u32,
    pub success_iteration: u32,
}

#[derive(Debug, Default)]
struct CycleState {
    failure_iteration: u32,
    success_iteration: u32,
}

/// Shared failure cycle, evaluated once per inbound request.
///
/// One instance exists per running server; it is handed to the request
/// layer behind an `Arc`.
#[derive(Debug)]
pub struct FailureCycle {
    enabled: bool,
    plan: CyclePlan,
    default_code: StatusCode,
    state: Mutex<CycleState>,
}

impl FailureCycle {
    /// Create an enabled cycle.
    pub fn new(plan: CyclePlan, default_code: StatusCode) -> Self {
        if plan.cycle_len() == 0 {
            tracing::warn!(
                default_code = default_code.as_u16(),
                "Failure simulation enabled with zero failure and success counts; every request gets the default code"
            );
        }
        Self {
            enabled: true,
            plan,
            default_code,
            state: Mutex::new(CycleState::default()),
        }
    }

    /// Create a cycle that always returns `default_code`.
    pub fn disabled(default_code: StatusCode) -> Self {
        Self {
            enabled: false,
            plan: CyclePlan {
                failure_count: 0,
                success_count: 0,
                failure_code: default_code,
                success_code: default_code,
            },
            default_code,
            state: Mutex::new(CycleState::default()),
        }
    }

    /// Build from raw settings, enabled or not.
    pub fn from_settings(
        settings: &FailureCycleSettings,
        default_code: StatusCode,
    ) -> Result<Self, ValidationError> {
        let plan = CyclePlan::try_from(settings)?;
        if settings.enabled {
            tracing::info!(
                failure_count = plan.failure_count,
                failure_code = plan.failure_code.as_u16(),
                success_count = plan.success_count,
                success_code = plan.success_code.as_u16(),
                "Failure simulation enabled"
            );
            Ok(Self::new(plan, default_code))
        } else {
            Ok(Self::disabled(default_code))
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn plan(&self) -> &CyclePlan {
        &self.plan
    }

    pub fn default_code(&self) -> StatusCode {
        self.default_code
    }

    /// Status code for this call; advances the cycle for the next one.
    pub fn evaluate(&self) -> StatusCode {
        self.evaluate_outcome().status
    }

    /// Like [`evaluate`](Self::evaluate), also reporting the phase.
    pub fn evaluate_outcome(&self) -> Outcome {
        if !self.enabled {
            return self.passthrough();
        }

        let mut state = self.lock();
        let plan = &self.plan;

        let outcome = if state.failure_iteration < plan.failure_count {
            state.failure_iteration += 1;
            if state.failure_iteration == plan.failure_count {
                if plan.success_count > 0 {
                    state.success_iteration = 0;
                } else {
                    state.failure_iteration = 0;
                }
            }
            Outcome {
                status: plan.failure_code,
                phase: Phase::Failure,
            }
        } else if state.success_iteration < plan.success_count {
            state.success_iteration += 1;
            if state.success_iteration == plan.success_count {
                if plan.failure_count > 0 {
                    state.failure_iteration = 0;
                } else {
                    state.success_iteration = 0;
                }
            }
            Outcome {
                status: plan.success_code,
                phase: Phase::Success,
            }
        } else {
            self.passthrough()
        };

        debug_assert!(
            state.failure_iteration <= plan.failure_count
                && state.success_iteration <= plan.success_count,
            "cycle counters out of bounds: {state:?} for {plan:?}"
        );

        outcome
    }

    /// Current counter values.
    pub fn snapshot(&self) -> CycleSnapshot {
        let state = self.lock();
        CycleSnapshot {
            failure_iteration: state.failure_iteration,
            success_iteration: state.success_iteration,
        }
    }

    fn passthrough(&self) -> Outcome {
        Outcome {
            status: self.default_code,
            phase: Phase::Passthrough,
        }
    }

    // Counters are only written after every check has passed, so a
    // poisoned lock still guards consistent state.
    fn lock(&self) -> MutexGuard<'_, CycleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
