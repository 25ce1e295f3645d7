//! care-route-optimizer
//!
//! Daily route planning for home-hospitalization teams: assigns patient
//! cases to vehicles and their personnel, respecting skills, time windows,
//! working hours and capacity, and explains what could not be planned.

pub mod cache;
pub mod config;
pub mod constraints;
pub mod domain;
pub mod error;
pub mod extract;
pub mod haversine;
pub mod matrix;
pub mod model;
pub mod osrm;
pub mod resources;
pub mod service;
pub mod skill_gap;
pub mod strategy;
pub mod traits;

pub use cache::{InMemoryMatrixCache, NoopMatrixCache};
pub use config::{CapacityMode, OptimizerConfig, TimeWindowMode};
pub use error::{OptimizeError, ValidationError};
pub use haversine::HaversineProvider;
pub use model::{OptimizationRequest, OptimizationResult};
pub use resources::{InMemoryResources, ProblemFile};
pub use service::OptimizationService;
pub use traits::{DistanceProvider, MatrixCache, ResourceManager, TravelCost};
