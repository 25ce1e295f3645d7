//! Optimization service.
//!
//! Runs one request through the pipeline
//! `Validating → BuildingMatrix → Solving → Extracting → Analyzing → Done`,
//! ending in `Infeasible` when nothing can be routed and in `Error` when the
//! request is malformed or a strategy breaks an invariant.
//!
//! The service holds no per-request state; the distance cache is the only
//! thing shared between concurrent runs.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;
use tracing::{debug, info, info_span, warn};

use crate::cache::InMemoryMatrixCache;
use crate::config::OptimizerConfig;
use crate::constraints::{Diagnosis, Problem, Rules};
use crate::domain::{DomainModel, Entities, ModelBuilder};
use crate::error::{OptimizeError, ProviderError, ValidationError};
use crate::extract::extract;
use crate::haversine::HaversineProvider;
use crate::matrix::DistanceMatrixBuilder;
use crate::model::{
    Algorithm, CaseId, ConstraintViolation, OptimizationRequest, OptimizationResult, Severity,
    StrategyUsed, ViolationType,
};
use crate::osrm::OsrmClient;
use crate::skill_gap::SkillGapAnalyzer;
use crate::strategy::{
    ConstraintSolver, Deadline, NearestNeighborHeuristic, OptimizationStrategy, Quality,
    StrategyOutcome,
};
use crate::traits::{DistanceProvider, MatrixCache, ResourceManager};

/// Pipeline stage of one optimization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validating,
    BuildingMatrix,
    Solving,
    Extracting,
    Analyzing,
    Done,
    Infeasible,
    Error,
}

struct RunState {
    stage: Stage,
    started: Instant,
}

impl RunState {
    fn new() -> Self {
        debug!(stage = ?Stage::Validating, "stage entered");
        Self {
            stage: Stage::Validating,
            started: Instant::now(),
        }
    }

    fn transition(&mut self, next: Stage) {
        debug!(
            from = ?self.stage,
            to = ?next,
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            "stage transition"
        );
        self.stage = next;
    }

    fn elapsed_secs(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }
}

pub struct OptimizationService {
    config: OptimizerConfig,
    resources: Arc<dyn ResourceManager>,
    provider: Arc<dyn DistanceProvider>,
    cache: Arc<dyn MatrixCache>,
    primary: Arc<dyn OptimizationStrategy>,
    fallback: Arc<dyn OptimizationStrategy>,
}

impl OptimizationService {
    pub fn new(
        config: OptimizerConfig,
        resources: Arc<dyn ResourceManager>,
        provider: Arc<dyn DistanceProvider>,
        cache: Arc<dyn MatrixCache>,
    ) -> Self {
        let fallback = Arc::new(NearestNeighborHeuristic::new(config.local_search_iterations));
        Self {
            config,
            resources,
            provider,
            cache,
            primary: Arc::new(ConstraintSolver::default()),
            fallback,
        }
    }

    /// OSRM when a URL is configured, haversine estimates otherwise, with an
    /// in-memory cache.
    pub fn from_config(
        config: OptimizerConfig,
        resources: Arc<dyn ResourceManager>,
    ) -> Result<Self, ProviderError> {
        let provider: Arc<dyn DistanceProvider> = match config.osrm() {
            Some(osrm) => {
                info!(url = %osrm.base_url, profile = %osrm.profile, "using OSRM distance provider");
                Arc::new(OsrmClient::new(osrm)?)
            }
            None => {
                info!("no OSRM_URL configured, using haversine distances");
                Arc::new(HaversineProvider::new(config.average_speed_kmh, config.road_coefficient))
            }
        };
        let cache = Arc::new(InMemoryMatrixCache::new(config.cache_ttl()));
        Ok(Self::new(config, resources, provider, cache))
    }

    pub fn with_primary(mut self, strategy: Arc<dyn OptimizationStrategy>) -> Self {
        self.primary = strategy;
        self
    }

    pub fn with_fallback(mut self, strategy: Arc<dyn OptimizationStrategy>) -> Self {
        self.fallback = strategy;
        self
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<dyn MatrixCache> {
        &self.cache
    }

    /// Never fails: errors are folded into a `success = false` result.
    pub fn respond(&self, request: &OptimizationRequest) -> OptimizationResult {
        let started = Instant::now();
        self.optimize(request).unwrap_or_else(|err| {
            OptimizationResult::failure(err.to_string(), started.elapsed().as_secs_f64())
        })
    }

    pub fn optimize(&self, request: &OptimizationRequest) -> Result<OptimizationResult, OptimizeError> {
        let span = info_span!(
            "optimize",
            date = %request.date,
            cases = request.case_ids.len(),
            vehicles = request.vehicle_ids.len()
        );
        let _guard = span.enter();

        let mut run = RunState::new();
        let outcome = self.run(&mut run, request);
        match &outcome {
            Ok(result) => info!(
                success = result.success,
                strategy = %result.strategy_used,
                routes = result.routes.len(),
                unassigned = result.unassigned_case_ids.len(),
                elapsed_secs = result.optimization_time_seconds,
                "optimization finished"
            ),
            Err(err) => {
                run.transition(Stage::Error);
                warn!(error = %err, "optimization failed");
            }
        }
        outcome
    }

    fn run(&self, run: &mut RunState, request: &OptimizationRequest) -> Result<OptimizationResult, OptimizeError> {
        if let Err(err) = request.validate(self.config.min_time_budget_secs, self.config.max_time_budget_secs) {
            return match err {
                ValidationError::NoCases | ValidationError::NoVehicles => {
                    run.transition(Stage::Error);
                    Ok(OptimizationResult::failure(err.to_string(), run.elapsed_secs()))
                }
                other => Err(other.into()),
            };
        }

        let entities = Entities {
            cases: self.resources.cases(&request.case_ids)?,
            vehicles: self.resources.vehicles(&request.vehicle_ids)?,
            personnel: self.resources.personnel()?,
            care_types: self.resources.care_types()?,
            skills: self.resources.skills()?,
        };
        let model = ModelBuilder::build(request, &entities)?;
        for violation in model.violations.iter().filter(|v| v.severity == Severity::Warning) {
            warn!(description = %violation.description, "entity excluded from planning");
        }
        if !model.excluded.is_empty() {
            info!(excluded = model.excluded.len(), "cases set aside before solving");
        }

        if model.jobs.is_empty() || model.teams.is_empty() {
            run.transition(Stage::Infeasible);
            return Ok(self.infeasible(run, model));
        }

        let budget = request
            .max_optimization_time_seconds
            .unwrap_or(self.config.default_time_budget_secs);
        let deadline = Deadline::starting_at(run.started, Duration::from_secs(u64::from(budget)));

        run.transition(Stage::BuildingMatrix);
        let matrix_limit = deadline.share(self.config.matrix_budget_share).remaining();
        let build = DistanceMatrixBuilder::new(Arc::clone(&self.provider), self.cache.as_ref(), &self.config)
            .with_time_limit(matrix_limit)
            .build(&model.points());
        let mut violations = model.violations.clone();
        violations.extend(build.warnings);

        let problem = Problem::new(
            model.jobs.clone(),
            model.teams.clone(),
            build.matrix,
            Rules::from_config(&self.config),
        )?;

        run.transition(Stage::Solving);
        let (outcome, strategy_used) = self.solve(&problem, &deadline, request.algorithm.unwrap_or_default())?;
        let schedules = outcome.assignment.validate(&problem)?;

        run.transition(Stage::Extracting);
        let extraction = extract(&problem, &schedules, request.date);
        violations.extend(extraction.violations);

        for &job in &outcome.assignment.unassigned {
            violations.push(unassigned_violation(&problem, job, &outcome.assignment.routes));
        }

        let mut unassigned: Vec<CaseId> = model
            .excluded
            .iter()
            .copied()
            .chain(outcome.assignment.unassigned.iter().map(|&j| problem.jobs[j].case_id))
            .collect();
        unassigned.sort_unstable();

        run.transition(Stage::Analyzing);
        let unassigned_set: BTreeSet<CaseId> = unassigned.iter().copied().collect();
        let analysis = SkillGapAnalyzer::new(&model.requirements, &model.skill_pool, &model.skill_names)
            .analyze(&unassigned_set);

        let assigned = outcome.assignment.assigned_count();
        let mut message = format!(
            "assigned {} of {} cases on {} routes",
            assigned,
            request.case_ids.len(),
            extraction.routes.len()
        );
        if strategy_used == StrategyUsed::HeuristicFallback {
            message.push_str(&format!(
                "; time-limited solution, solver stopped within the {}s budget and the heuristic fallback was used",
                budget
            ));
        } else if !outcome.completed {
            message.push_str(&format!(
                "; time-limited solution, budget of {}s reached",
                budget
            ));
        }

        run.transition(Stage::Done);
        Ok(OptimizationResult {
            success: true,
            message,
            routes: extraction.routes,
            unassigned_case_ids: unassigned,
            constraint_violations: violations,
            optimization_time_seconds: run.elapsed_secs(),
            strategy_used,
            total_distance_km: extraction.total_distance_km,
            total_time_minutes: extraction.total_time_minutes,
            skill_gap_analysis: Some(analysis),
        })
    }

    fn solve(
        &self,
        problem: &Problem,
        deadline: &Deadline,
        algorithm: Algorithm,
    ) -> Result<(StrategyOutcome, StrategyUsed), OptimizeError> {
        if algorithm == Algorithm::Heuristic {
            let outcome = self.fallback.solve(problem, deadline)?;
            return Ok((outcome, StrategyUsed::Heuristic));
        }

        let primary = self.primary.solve(problem, &deadline.share(self.config.fallback_share))?;
        if primary.completed {
            return Ok((primary, StrategyUsed::Solver));
        }

        warn!(
            strategy = self.primary.name(),
            fallback = self.fallback.name(),
            elapsed_ms = deadline.elapsed().as_millis() as u64,
            "primary strategy ran out of time, running fallback"
        );
        let fallback = self.fallback.solve(problem, deadline)?;

        let better = match (
            Quality::of(problem, &fallback.assignment),
            Quality::of(problem, &primary.assignment),
        ) {
            (Some(f), Some(p)) => f.compare(&p).is_lt(),
            (Some(_), None) => true,
            _ => false,
        };
        if better {
            Ok((fallback, StrategyUsed::HeuristicFallback))
        } else {
            Ok((primary, StrategyUsed::SolverTimeLimited))
        }
    }

    /// Result for a run where no case can be routed at all.
    fn infeasible(&self, run: &RunState, model: DomainModel) -> OptimizationResult {
        let mut violations = model.violations;
        let reason = if model.teams.is_empty() {
            "no eligible vehicle with active personnel is available"
        } else {
            "no plannable case remains after prechecks"
        };

        for job in &model.jobs {
            violations.push(
                ConstraintViolation::error(
                    ViolationType::Infeasible,
                    format!("case {} cannot be routed: {}", job.case_id, reason),
                )
                .for_case(job.case_id),
            );
        }

        let mut unassigned: Vec<CaseId> = model
            .excluded
            .iter()
            .copied()
            .chain(model.jobs.iter().map(|job| job.case_id))
            .collect();
        unassigned.sort_unstable();

        let unassigned_set: BTreeSet<CaseId> = unassigned.iter().copied().collect();
        let analysis = SkillGapAnalyzer::new(&model.requirements, &model.skill_pool, &model.skill_names)
            .analyze(&unassigned_set);

        OptimizationResult {
            success: false,
            message: format!("no feasible routes: {}", reason),
            unassigned_case_ids: unassigned,
            constraint_violations: violations,
            skill_gap_analysis: Some(analysis),
            ..OptimizationResult::failure("", run.elapsed_secs())
        }
    }
}

fn unassigned_violation(problem: &Problem, job: usize, routes: &[Vec<usize>]) -> ConstraintViolation {
    let case_id = problem.jobs[job].case_id;
    let diagnosis = problem.diagnose(job, routes);
    let (violation_type, description) = match diagnosis {
        Diagnosis::SkillMismatch => (
            ViolationType::SkillMismatch,
            format!("case {} needs a skill combination no single team holds", case_id),
        ),
        Diagnosis::TimeWindow => (
            ViolationType::TimeWindowViolation,
            format!("case {} cannot be reached inside its time window", case_id),
        ),
        Diagnosis::WorkingHours => (
            ViolationType::WorkingHoursViolation,
            format!("case {} does not fit within any team's working hours", case_id),
        ),
        Diagnosis::CapacityExceeded => (
            ViolationType::CapacityExceeded,
            format!("case {} left out: every capable vehicle reached its visit limit", case_id),
        ),
        Diagnosis::NoRoom => (
            ViolationType::Infeasible,
            format!("case {} left out: no capable route has room for it", case_id),
        ),
    };

    ConstraintViolation::error(violation_type, description)
        .for_case(case_id)
        .with_details(json!({ "diagnosis": format!("{:?}", diagnosis) }))
}
