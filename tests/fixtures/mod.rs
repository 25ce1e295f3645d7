//! Test fixtures for care-route-optimizer.
//!
//! Provides:
//! - Madrid locations for realistic scenarios
//! - Builders for cases, personnel and vehicles
//! - Deterministic and failing distance providers
//! - Strategy doubles for time-budget tests

#![allow(dead_code)]

pub mod madrid_locations;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::NaiveDate;
use parking_lot::Mutex;

use care_route_optimizer::cache::NoopMatrixCache;
use care_route_optimizer::constraints::Problem;
use care_route_optimizer::error::{ProviderError, SolverError};
use care_route_optimizer::model::{
    Case, CaseId, CaseStatus, CareType, GeoPoint, OptimizationRequest, Personnel,
    PersonnelAssignment, Skill, SkillId, TimeWindow, Vehicle, VehicleStatus,
};
use care_route_optimizer::strategy::{
    Assignment, ConstraintSolver, Deadline, OptimizationStrategy, StrategyOutcome,
};
use care_route_optimizer::{
    DistanceProvider, InMemoryResources, MatrixCache, OptimizationService, OptimizerConfig,
    TravelCost,
};

pub use madrid_locations::*;

pub const WOUND_CARE: SkillId = 1;
pub const IV_THERAPY: SkillId = 2;
pub const PALLIATIVE: SkillId = 3;

/// Care type ids used by [`Scenario::with_standard_care_types`].
pub const CHECKUP: u64 = 1;
pub const DRESSING: u64 = 2;
pub const INFUSION: u64 = 3;

pub fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 14).expect("valid date")
}

pub fn window(start: (u32, u32), end: (u32, u32)) -> TimeWindow {
    TimeWindow::hm(start, end)
}

// ============================================================================
// Entity builders
// ============================================================================

/// Builder for test cases with sensible defaults.
#[derive(Clone, Debug)]
pub struct TestCase {
    case: Case,
}

impl TestCase {
    pub fn new(id: CaseId) -> Self {
        Self {
            case: Case {
                id,
                patient_id: 1000 + id,
                care_type_id: CHECKUP,
                location: GeoPoint::new(40.42, -3.70),
                time_window: None,
                priority: 0,
                status: CaseStatus::Pending,
            },
        }
    }

    pub fn location(mut self, lat: f64, lng: f64) -> Self {
        self.case.location = GeoPoint::new(lat, lng);
        self
    }

    pub fn at(self, location: &Location) -> Self {
        self.location(location.lat, location.lng)
    }

    pub fn care_type(mut self, care_type_id: u64) -> Self {
        self.case.care_type_id = care_type_id;
        self
    }

    pub fn window(mut self, start: (u32, u32), end: (u32, u32)) -> Self {
        self.case.time_window = Some(window(start, end));
        self
    }

    pub fn priority(mut self, priority: u8) -> Self {
        self.case.priority = priority;
        self
    }

    pub fn status(mut self, status: CaseStatus) -> Self {
        self.case.status = status;
        self
    }

    pub fn build(self) -> Case {
        self.case
    }
}

/// Builder for personnel, working 08:00-17:00 by default.
#[derive(Clone, Debug)]
pub struct TestNurse {
    personnel: Personnel,
}

impl TestNurse {
    pub fn new(id: u64) -> Self {
        Self {
            personnel: Personnel {
                id,
                name: format!("nurse-{}", id),
                skills: BTreeSet::new(),
                working_hours: window((8, 0), (17, 0)),
                start_location: None,
                active: true,
            },
        }
    }

    pub fn skill(mut self, skill: SkillId) -> Self {
        self.personnel.skills.insert(skill);
        self
    }

    pub fn hours(mut self, start: (u32, u32), end: (u32, u32)) -> Self {
        self.personnel.working_hours = window(start, end);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.personnel.active = false;
        self
    }

    pub fn build(self) -> Personnel {
        self.personnel
    }
}

/// Builder for vehicles based at the first hospital by default.
#[derive(Clone, Debug)]
pub struct TestVehicle {
    vehicle: Vehicle,
}

impl TestVehicle {
    pub fn new(id: u64) -> Self {
        let base = HOSPITALS[1];
        Self {
            vehicle: Vehicle {
                id,
                name: format!("van-{}", id),
                capacity: 2,
                base_location: GeoPoint::new(base.lat, base.lng),
                status: VehicleStatus::Available,
                special_resources: Vec::new(),
            },
        }
    }

    pub fn capacity(mut self, capacity: u32) -> Self {
        self.vehicle.capacity = capacity;
        self
    }

    pub fn base(mut self, location: &Location) -> Self {
        self.vehicle.base_location = GeoPoint::new(location.lat, location.lng);
        self
    }

    pub fn status(mut self, status: VehicleStatus) -> Self {
        self.vehicle.status = status;
        self
    }

    pub fn build(self) -> Vehicle {
        self.vehicle
    }
}

// ============================================================================
// Scenario
// ============================================================================

/// Entities plus the request that plans all of them.
#[derive(Clone, Debug, Default)]
pub struct Scenario {
    pub skills: Vec<Skill>,
    pub care_types: Vec<CareType>,
    pub personnel: Vec<Personnel>,
    pub vehicles: Vec<Vehicle>,
    pub cases: Vec<Case>,
    pub assignments: Option<Vec<PersonnelAssignment>>,
}

impl Scenario {
    pub fn new() -> Self {
        Self::default().with_standard_care_types()
    }

    fn with_standard_care_types(mut self) -> Self {
        self.skills = vec![
            Skill { id: WOUND_CARE, name: "wound_care".into() },
            Skill { id: IV_THERAPY, name: "iv_therapy".into() },
            Skill { id: PALLIATIVE, name: "palliative".into() },
        ];
        self.care_types = vec![
            care_type(CHECKUP, "checkup", 30, &[]),
            care_type(DRESSING, "dressing", 45, &[WOUND_CARE]),
            care_type(INFUSION, "infusion", 60, &[IV_THERAPY]),
        ];
        self
    }

    pub fn case(mut self, case: TestCase) -> Self {
        self.cases.push(case.build());
        self
    }

    pub fn nurse(mut self, nurse: TestNurse) -> Self {
        self.personnel.push(nurse.build());
        self
    }

    pub fn vehicle(mut self, vehicle: TestVehicle) -> Self {
        self.vehicles.push(vehicle.build());
        self
    }

    pub fn assign(mut self, vehicle_id: u64, personnel_ids: &[u64]) -> Self {
        self.assignments
            .get_or_insert_with(Vec::new)
            .push(PersonnelAssignment {
                vehicle_id,
                personnel_ids: personnel_ids.to_vec(),
            });
        self
    }

    pub fn resources(&self) -> InMemoryResources {
        InMemoryResources::new()
            .with_skills(self.skills.clone())
            .with_care_types(self.care_types.clone())
            .with_personnel(self.personnel.clone())
            .with_vehicles(self.vehicles.clone())
            .with_cases(self.cases.clone())
    }

    /// Plans every case on every vehicle.
    pub fn request(&self) -> OptimizationRequest {
        let mut request = OptimizationRequest::new(
            date(),
            self.cases.iter().map(|c| c.id).collect(),
            self.vehicles.iter().map(|v| v.id).collect(),
        );
        request.personnel_assignments = self.assignments.clone();
        request
    }

    pub fn service(&self, config: OptimizerConfig, provider: Arc<dyn DistanceProvider>) -> OptimizationService {
        self.service_with_cache(config, provider, Arc::new(NoopMatrixCache))
    }

    pub fn service_with_cache(
        &self,
        config: OptimizerConfig,
        provider: Arc<dyn DistanceProvider>,
        cache: Arc<dyn MatrixCache>,
    ) -> OptimizationService {
        OptimizationService::new(config, Arc::new(self.resources()), provider, cache)
    }
}

fn care_type(id: u64, name: &str, duration_minutes: u32, skills: &[SkillId]) -> CareType {
    CareType {
        id,
        name: name.to_string(),
        duration_minutes,
        required_skills: skills.iter().copied().collect(),
    }
}

// ============================================================================
// Distance providers
// ============================================================================

/// Manhattan distance on degrees, 1 degree = 100 km, driven at 40 km/h.
#[derive(Default)]
pub struct ManhattanProvider {
    calls: AtomicUsize,
}

impl ManhattanProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn cost(from: GeoPoint, to: GeoPoint) -> TravelCost {
        let km = ((from.lat - to.lat).abs() + (from.lng - to.lng).abs()) * 100.0;
        TravelCost::new(km, km * 60.0 / 40.0)
    }
}

impl DistanceProvider for ManhattanProvider {
    fn name(&self) -> &str {
        "manhattan"
    }

    fn table(
        &self,
        sources: &[GeoPoint],
        destinations: &[GeoPoint],
    ) -> Result<Vec<Vec<Option<TravelCost>>>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(sources
            .iter()
            .map(|from| destinations.iter().map(|to| Some(Self::cost(*from, *to))).collect())
            .collect())
    }
}

/// A provider that is always down.
pub struct FailingProvider;

impl DistanceProvider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    fn table(
        &self,
        _sources: &[GeoPoint],
        _destinations: &[GeoPoint],
    ) -> Result<Vec<Vec<Option<TravelCost>>>, ProviderError> {
        Err(ProviderError::Unavailable("simulated outage".into()))
    }
}

/// Hangs for `delay` before failing, like a routing service that times out.
pub struct HangingProvider {
    pub delay: Duration,
}

impl DistanceProvider for HangingProvider {
    fn name(&self) -> &str {
        "hanging"
    }

    fn table(
        &self,
        _sources: &[GeoPoint],
        _destinations: &[GeoPoint],
    ) -> Result<Vec<Vec<Option<TravelCost>>>, ProviderError> {
        std::thread::sleep(self.delay);
        Err(ProviderError::Unavailable("request timed out".into()))
    }
}

// ============================================================================
// Strategy doubles
// ============================================================================

/// Never finds anything and only returns once its deadline has passed.
pub struct StalledStrategy;

impl OptimizationStrategy for StalledStrategy {
    fn name(&self) -> &str {
        "stalled"
    }

    fn solve(&self, problem: &Problem, deadline: &Deadline) -> Result<StrategyOutcome, SolverError> {
        while !deadline.is_reached() {
            std::thread::sleep(Duration::from_millis(5).min(deadline.remaining()));
        }
        Ok(StrategyOutcome {
            assignment: Assignment::empty(problem),
            completed: false,
        })
    }
}

/// Runs the constraint solver and records which cases it was given.
#[derive(Default)]
pub struct RecordingStrategy {
    inner: ConstraintSolver,
    seen: Mutex<Vec<CaseId>>,
}

impl RecordingStrategy {
    pub fn seen(&self) -> Vec<CaseId> {
        self.seen.lock().clone()
    }
}

impl OptimizationStrategy for RecordingStrategy {
    fn name(&self) -> &str {
        "recording"
    }

    fn solve(&self, problem: &Problem, deadline: &Deadline) -> Result<StrategyOutcome, SolverError> {
        self.seen
            .lock()
            .extend(problem.jobs.iter().map(|job| job.case_id));
        self.inner.solve(problem, deadline)
    }
}

/// Returns a route that breaks every rule: all cases on the first team, twice.
pub struct BrokenStrategy;

impl OptimizationStrategy for BrokenStrategy {
    fn name(&self) -> &str {
        "broken"
    }

    fn solve(&self, problem: &Problem, _deadline: &Deadline) -> Result<StrategyOutcome, SolverError> {
        let mut assignment = Assignment::empty(problem);
        let all: Vec<usize> = (0..problem.jobs.len()).collect();
        assignment.routes[0] = all.iter().chain(all.iter()).copied().collect();
        assignment.unassigned.clear();
        Ok(StrategyOutcome {
            assignment,
            completed: true,
        })
    }
}
