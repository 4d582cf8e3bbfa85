use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

/// Error kinds surfaced across the public API (spec.md §7).
///
/// `WeatherUnavailable` is recovered internally by the weather chain's
/// synthetic fallback and never escapes a public entry point; it exists
/// here only so internal plumbing can propagate it with `?` before the
/// recovery point.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanError {
    #[error("invalid coordinate: lat={lat}, lon={lon}")]
    InvalidCoordinate { lat: f64, lon: f64 },

    #[error("endpoint still on land after snap attempts: ({lat}, {lon})")]
    EndpointOnLandAfterSnap { lat: f64, lon: f64 },

    #[error("no collision-free route found after exhausting the planner chain")]
    NoRouteFound,

    #[error("plan request cancelled")]
    Cancelled,

    #[error("weather provider unavailable: {0}")]
    WeatherUnavailable(String),

    #[error("replanner could not reach the goal from the changed grid")]
    ReplanInfeasible,

    #[error("unknown vessel id: {0}")]
    UnknownVessel(String),
}

pub type Result<T> = std::result::Result<T, PlanError>;

/// Cooperative cancellation handle (spec.md §5): planners poll this at
/// loop heads and between expansions rather than being forcibly
/// interrupted, so a cancel never leaves a planner mid-mutation of
/// shared state. Cloning shares the same underlying flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_token_is_shared_across_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
