//! Maritime fuel-optimal route planning engine.
//!
//! Plans collision-free routes between two points for a given vessel
//! class, subject to landmass avoidance and a hazard/weather cost
//! surface, and exposes an incremental replanner for mid-voyage use.

pub mod config;
pub mod error;
pub mod geodesy;
pub mod land;
pub mod grid;
pub mod hazard;
pub mod weather;
pub mod voyage;
pub mod planner;
pub mod orchestrator;

pub use config::PlanningConfig;
pub use error::{CancellationToken, PlanError};
pub use geodesy::Coordinate;
pub use orchestrator::{PlanDiagnostics, PlanRequest, PlanResult, RouteOrchestrator};
pub use voyage::VoyageMetrics;
