//! Error taxonomy for the optimizer.
//!
//! Business outcomes (infeasible cases, provider outages, timeouts) are not
//! errors: they end up as violations in the result. The types here cover
//! malformed input, missing entities and broken solver invariants.

use thiserror::Error;

use crate::model::{CareTypeId, CaseId, PersonnelId, VehicleId};

/// A request or entity set that cannot be optimized as given.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("at least one case is required")]
    NoCases,
    #[error("at least one vehicle is required")]
    NoVehicles,
    #[error("max_optimization_time_seconds must be between {min} and {max}, got {value}")]
    TimeBudgetOutOfRange { value: u32, min: u32, max: u32 },
    #[error("{kind} {id} is listed more than once")]
    Duplicate { kind: &'static str, id: u64 },
    #[error("case {case_id} has a malformed time window ({start}..{end} minutes)")]
    MalformedTimeWindow { case_id: CaseId, start: u32, end: u32 },
    #[error("case {case_id} has an invalid location")]
    InvalidLocation { case_id: CaseId },
    #[error("vehicle {vehicle_id} has an invalid base location")]
    InvalidDepot { vehicle_id: VehicleId },
    #[error("case {case_id} references unknown care type {care_type_id}")]
    UnknownCareType { case_id: CaseId, care_type_id: CareTypeId },
    #[error("care type {care_type_id} must have a positive duration")]
    NonPositiveDuration { care_type_id: CareTypeId },
    #[error("personnel {personnel_id} has malformed working hours ({start}..{end} minutes)")]
    MalformedWorkingHours { personnel_id: PersonnelId, start: u32, end: u32 },
    #[error("vehicle {vehicle_id} must have a capacity of at least 1")]
    ZeroCapacity { vehicle_id: VehicleId },
    #[error("vehicle {vehicle_id} has {team_size} personnel assigned but capacity {capacity}")]
    TeamExceedsCapacity { vehicle_id: VehicleId, team_size: usize, capacity: u32 },
    #[error("personnel assignment references vehicle {vehicle_id}, which is not part of the request")]
    AssignmentForUnknownVehicle { vehicle_id: VehicleId },
    #[error("personnel assignment references unknown personnel {personnel_id}")]
    UnknownPersonnel { personnel_id: PersonnelId },
    #[error("personnel {personnel_id} is assigned to more than one vehicle")]
    PersonnelAssignedTwice { personnel_id: PersonnelId },
}

/// Failure to hydrate entities from the resource manager.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: u64 },
    #[error("resource manager unavailable: {0}")]
    Unavailable(String),
}

/// Failure of a distance provider call. Never leaves the matrix builder.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider rejected the request: {0}")]
    Rejected(String),
    #[error("unexpected table shape: {0}")]
    Shape(String),
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

/// An unexpected invariant violation inside a strategy or the constraint model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolverError {
    #[error("invariant violated: {0}")]
    Invariant(String),
    #[error("strategy {strategy} failed: {reason}")]
    Strategy { strategy: String, reason: String },
}

/// Invalid configuration value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
}

/// Top-level error of an optimization run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptimizeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Resource(#[from] ResourceError),
    #[error("internal solver error: {0}")]
    InternalSolver(#[from] SolverError),
}
