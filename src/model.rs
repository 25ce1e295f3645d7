//! Entities, request and result records.
//!
//! Everything here is a plain value record for one planning run. Times of
//! day are expressed in minutes since midnight.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::skill_gap::SkillGapAnalysis;

pub type CaseId = u64;
pub type PatientId = u64;
pub type CareTypeId = u64;
pub type SkillId = u64;
pub type PersonnelId = u64;
pub type VehicleId = u64;

/// Minutes in a day; time windows never extend past midnight.
pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// A geographic point (WGS84).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Interval in minutes-of-day, `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: u32,
    pub end: u32,
}

impl TimeWindow {
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Builds a window from `HH:MM`-style hour/minute pairs.
    pub const fn hm(start: (u32, u32), end: (u32, u32)) -> Self {
        Self {
            start: start.0 * 60 + start.1,
            end: end.0 * 60 + end.1,
        }
    }

    pub fn is_well_formed(&self) -> bool {
        self.start < self.end && self.end <= MINUTES_PER_DAY
    }

    /// Intersection of two windows, if non-empty.
    pub fn intersect(&self, other: &TimeWindow) -> Option<TimeWindow> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start < end).then_some(TimeWindow { start, end })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    #[default]
    Pending,
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl CaseStatus {
    /// Whether a case in this status should be planned.
    pub fn is_plannable(&self) -> bool {
        matches!(self, CaseStatus::Pending | CaseStatus::Scheduled)
    }
}

/// A home-visit request tied to a patient and a care type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub id: CaseId,
    pub patient_id: PatientId,
    pub care_type_id: CareTypeId,
    pub location: GeoPoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_window: Option<TimeWindow>,
    /// Higher is more urgent.
    #[serde(default)]
    pub priority: u8,
    #[serde(default)]
    pub status: CaseStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CareType {
    pub id: CareTypeId,
    pub name: String,
    pub duration_minutes: u32,
    #[serde(default)]
    pub required_skills: BTreeSet<SkillId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub id: SkillId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Personnel {
    pub id: PersonnelId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub skills: BTreeSet<SkillId>,
    pub working_hours: TimeWindow,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_location: Option<GeoPoint>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleStatus {
    #[default]
    Available,
    InUse,
    Maintenance,
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    #[serde(default)]
    pub name: String,
    pub capacity: u32,
    /// Route start and end.
    pub base_location: GeoPoint,
    #[serde(default)]
    pub status: VehicleStatus,
    #[serde(default)]
    pub special_resources: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    #[default]
    Solver,
    Heuristic,
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algorithm::Solver => write!(f, "solver"),
            Algorithm::Heuristic => write!(f, "heuristic"),
        }
    }
}

impl FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "solver" => Ok(Algorithm::Solver),
            "heuristic" => Ok(Algorithm::Heuristic),
            other => Err(format!("unknown algorithm '{}', expected solver or heuristic", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonnelAssignment {
    pub vehicle_id: VehicleId,
    pub personnel_ids: Vec<PersonnelId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizationRequest {
    pub date: NaiveDate,
    pub case_ids: Vec<CaseId>,
    pub vehicle_ids: Vec<VehicleId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personnel_assignments: Option<Vec<PersonnelAssignment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<Algorithm>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_optimization_time_seconds: Option<u32>,
}

impl OptimizationRequest {
    pub fn new(date: NaiveDate, case_ids: Vec<CaseId>, vehicle_ids: Vec<VehicleId>) -> Self {
        Self {
            date,
            case_ids,
            vehicle_ids,
            personnel_assignments: None,
            algorithm: None,
            max_optimization_time_seconds: None,
        }
    }

    /// Checks the request shape. Entity-level checks happen in the model builder.
    pub fn validate(&self, min_budget: u32, max_budget: u32) -> Result<(), ValidationError> {
        if self.case_ids.is_empty() {
            return Err(ValidationError::NoCases);
        }
        if self.vehicle_ids.is_empty() {
            return Err(ValidationError::NoVehicles);
        }
        if let Some(value) = self.max_optimization_time_seconds {
            if value < min_budget || value > max_budget {
                return Err(ValidationError::TimeBudgetOutOfRange {
                    value,
                    min: min_budget,
                    max: max_budget,
                });
            }
        }
        ensure_unique("case", &self.case_ids)?;
        ensure_unique("vehicle", &self.vehicle_ids)?;
        Ok(())
    }
}

fn ensure_unique(kind: &'static str, ids: &[u64]) -> Result<(), ValidationError> {
    let mut seen = BTreeSet::new();
    for id in ids {
        if !seen.insert(*id) {
            return Err(ValidationError::Duplicate { kind, id: *id });
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteStatus {
    #[default]
    Draft,
    Active,
    InProgress,
    Completed,
    Cancelled,
}

/// One stop on a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visit {
    pub case_id: CaseId,
    /// 0-based, contiguous within the route.
    pub sequence: usize,
    pub estimated_arrival: NaiveDateTime,
    pub estimated_departure: NaiveDateTime,
    pub travel_time_from_previous_minutes: f64,
    pub travel_distance_from_previous_km: f64,
}

/// One vehicle's ordered visits for the planning date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub vehicle_id: VehicleId,
    pub visits: Vec<Visit>,
    pub personnel_ids: Vec<PersonnelId>,
    pub total_distance_km: f64,
    pub total_duration_minutes: f64,
    pub status: RouteStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationType {
    SkillMismatch,
    CapacityExceeded,
    TimeWindowViolation,
    WorkingHoursViolation,
    Infeasible,
    ProviderDegraded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Case,
    Vehicle,
    Personnel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintViolation {
    pub violation_type: ViolationType,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<EntityRef>,
    pub description: String,
    #[serde(default)]
    pub details: serde_json::Value,
}

impl ConstraintViolation {
    pub fn error(violation_type: ViolationType, description: impl Into<String>) -> Self {
        Self::new(violation_type, Severity::Error, description)
    }

    pub fn warning(violation_type: ViolationType, description: impl Into<String>) -> Self {
        Self::new(violation_type, Severity::Warning, description)
    }

    fn new(violation_type: ViolationType, severity: Severity, description: impl Into<String>) -> Self {
        Self {
            violation_type,
            severity,
            entity: None,
            description: description.into(),
            details: serde_json::Value::Null,
        }
    }

    pub fn for_case(self, id: CaseId) -> Self {
        self.with_entity(EntityKind::Case, id)
    }

    pub fn for_vehicle(self, id: VehicleId) -> Self {
        self.with_entity(EntityKind::Vehicle, id)
    }

    pub fn for_personnel(self, id: PersonnelId) -> Self {
        self.with_entity(EntityKind::Personnel, id)
    }

    fn with_entity(mut self, kind: EntityKind, id: u64) -> Self {
        self.entity = Some(EntityRef { kind, id });
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }

    pub fn case_id(&self) -> Option<CaseId> {
        match self.entity {
            Some(EntityRef { kind: EntityKind::Case, id }) => Some(id),
            _ => None,
        }
    }
}

/// Which strategy produced the returned routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyUsed {
    Solver,
    /// The solver ran out of budget and its best-so-far solution was kept.
    SolverTimeLimited,
    Heuristic,
    /// The solver ran out of budget and the heuristic solution was kept.
    HeuristicFallback,
    /// No strategy ran (validation failure or nothing feasible).
    None,
}

impl fmt::Display for StrategyUsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StrategyUsed::Solver => "solver",
            StrategyUsed::SolverTimeLimited => "solver_time_limited",
            StrategyUsed::Heuristic => "heuristic",
            StrategyUsed::HeuristicFallback => "heuristic_fallback",
            StrategyUsed::None => "none",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub success: bool,
    pub message: String,
    pub routes: Vec<Route>,
    pub unassigned_case_ids: Vec<CaseId>,
    pub constraint_violations: Vec<ConstraintViolation>,
    pub optimization_time_seconds: f64,
    pub strategy_used: StrategyUsed,
    pub total_distance_km: f64,
    pub total_time_minutes: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill_gap_analysis: Option<SkillGapAnalysis>,
}

impl OptimizationResult {
    /// A result for a run that never reached a strategy.
    pub fn failure(message: impl Into<String>, elapsed_secs: f64) -> Self {
        Self {
            success: false,
            message: message.into(),
            routes: Vec::new(),
            unassigned_case_ids: Vec::new(),
            constraint_violations: Vec::new(),
            optimization_time_seconds: elapsed_secs,
            strategy_used: StrategyUsed::None,
            total_distance_km: 0.0,
            total_time_minutes: 0.0,
            skill_gap_analysis: None,
        }
    }

    pub fn violations_of(&self, violation_type: ViolationType) -> impl Iterator<Item = &ConstraintViolation> {
        self.constraint_violations
            .iter()
            .filter(move |v| v.violation_type == violation_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    #[test]
    fn test_time_window_well_formed() {
        assert!(TimeWindow::hm((8, 0), (9, 0)).is_well_formed());
        assert!(!TimeWindow::new(600, 600).is_well_formed());
        assert!(!TimeWindow::new(700, 600).is_well_formed());
        assert!(!TimeWindow::new(0, MINUTES_PER_DAY + 1).is_well_formed());
    }

    #[test]
    fn test_time_window_intersection() {
        let a = TimeWindow::hm((8, 0), (12, 0));
        let b = TimeWindow::hm((10, 0), (17, 0));
        assert_eq!(a.intersect(&b), Some(TimeWindow::hm((10, 0), (12, 0))));
        assert_eq!(a.intersect(&TimeWindow::hm((12, 0), (13, 0))), None);
    }

    #[test]
    fn test_request_rejects_empty_lists() {
        let request = OptimizationRequest::new(date(), vec![], vec![1]);
        assert_eq!(request.validate(10, 300), Err(ValidationError::NoCases));

        let request = OptimizationRequest::new(date(), vec![1], vec![]);
        assert_eq!(request.validate(10, 300), Err(ValidationError::NoVehicles));
    }

    #[test]
    fn test_request_rejects_budget_out_of_range() {
        let mut request = OptimizationRequest::new(date(), vec![1], vec![1]);
        request.max_optimization_time_seconds = Some(301);
        assert_eq!(
            request.validate(10, 300),
            Err(ValidationError::TimeBudgetOutOfRange { value: 301, min: 10, max: 300 })
        );
        request.max_optimization_time_seconds = Some(10);
        assert!(request.validate(10, 300).is_ok());
    }

    #[test]
    fn test_request_rejects_duplicates() {
        let request = OptimizationRequest::new(date(), vec![1, 2, 1], vec![1]);
        assert_eq!(
            request.validate(10, 300),
            Err(ValidationError::Duplicate { kind: "case", id: 1 })
        );
    }

    #[test]
    fn test_request_json_contract() {
        let json = r#"{
            "date": "2026-03-02",
            "case_ids": [1, 2],
            "vehicle_ids": [7],
            "personnel_assignments": [{"vehicle_id": 7, "personnel_ids": [3]}],
            "algorithm": "heuristic",
            "max_optimization_time_seconds": 60
        }"#;
        let request: OptimizationRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.algorithm, Some(Algorithm::Heuristic));
        assert_eq!(request.personnel_assignments.unwrap()[0].personnel_ids, vec![3]);
    }

    #[test]
    fn test_algorithm_from_str() {
        assert_eq!("Solver".parse::<Algorithm>(), Ok(Algorithm::Solver));
        assert!("genetic".parse::<Algorithm>().is_err());
    }

    #[test]
    fn test_violation_serializes_snake_case() {
        let violation = ConstraintViolation::error(ViolationType::SkillMismatch, "missing skill")
            .for_case(4)
            .with_details(serde_json::json!({ "missing_skills": ["wound_care"] }));
        let value = serde_json::to_value(&violation).unwrap();
        assert_eq!(value["violation_type"], "skill_mismatch");
        assert_eq!(value["severity"], "error");
        assert_eq!(value["entity"]["kind"], "case");
        assert_eq!(violation.case_id(), Some(4));
    }
}
