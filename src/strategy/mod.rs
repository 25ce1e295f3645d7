//! Optimization strategies.
//!
//! A strategy turns a [`Problem`] into an [`Assignment`] of jobs to team
//! routes. Strategies poll a [`Deadline`] at well-defined checkpoints and
//! always return a valid, possibly partial, assignment when it passes.

mod heuristic;
mod solver;

pub use heuristic::NearestNeighborHeuristic;
pub use solver::ConstraintSolver;

use std::cmp::Ordering;
use std::time::{Duration, Instant};

use crate::constraints::{EPSILON, Problem, Schedule};
use crate::error::SolverError;

/// Cooperative cancellation point for time-budgeted solving.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    limit: Duration,
}

impl Deadline {
    pub fn new(limit: Duration) -> Self {
        Self::starting_at(Instant::now(), limit)
    }

    pub fn starting_at(started: Instant, limit: Duration) -> Self {
        Self { started, limit }
    }

    /// A deadline sharing this start, cut to a fraction of the limit.
    pub fn share(&self, fraction: f64) -> Self {
        Self {
            started: self.started,
            limit: self.limit.mul_f64(fraction.clamp(0.0, 1.0)),
        }
    }

    pub fn is_reached(&self) -> bool {
        self.started.elapsed() >= self.limit
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn remaining(&self) -> Duration {
        self.limit.saturating_sub(self.started.elapsed())
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }
}

/// Job indices per team route, plus the jobs left out.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Assignment {
    /// One entry per team, in team order.
    pub routes: Vec<Vec<usize>>,
    pub unassigned: Vec<usize>,
}

impl Assignment {
    pub fn empty(problem: &Problem) -> Self {
        Self {
            routes: vec![Vec::new(); problem.teams.len()],
            unassigned: (0..problem.jobs.len()).collect(),
        }
    }

    pub fn assigned_count(&self) -> usize {
        self.routes.iter().map(Vec::len).sum()
    }

    /// Checks that every job appears exactly once and every route is feasible.
    pub fn validate(&self, problem: &Problem) -> Result<Vec<Schedule>, SolverError> {
        if self.routes.len() != problem.teams.len() {
            return Err(SolverError::Invariant(format!(
                "expected {} routes, got {}",
                problem.teams.len(),
                self.routes.len()
            )));
        }

        let mut seen = vec![false; problem.jobs.len()];
        for &job in self.routes.iter().flatten().chain(self.unassigned.iter()) {
            let slot = seen.get_mut(job).ok_or_else(|| {
                SolverError::Invariant(format!("job index {} out of range", job))
            })?;
            if *slot {
                return Err(SolverError::Invariant(format!(
                    "case {} appears more than once",
                    problem.jobs[job].case_id
                )));
            }
            *slot = true;
        }
        if let Some(missing) = seen.iter().position(|s| !s) {
            return Err(SolverError::Invariant(format!(
                "case {} is neither routed nor unassigned",
                problem.jobs[missing].case_id
            )));
        }

        self.routes
            .iter()
            .enumerate()
            .map(|(team, jobs)| {
                problem.evaluate(team, jobs).map_err(|reason| {
                    SolverError::Invariant(format!(
                        "route of vehicle {} violates {:?}",
                        problem.teams[team].vehicle_id, reason
                    ))
                })
            })
            .collect()
    }
}

/// Result of one strategy run.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyOutcome {
    pub assignment: Assignment,
    /// False when the deadline cut the search short.
    pub completed: bool,
}

/// A pluggable routing algorithm.
pub trait OptimizationStrategy: Send + Sync {
    fn name(&self) -> &str;

    fn solve(&self, problem: &Problem, deadline: &Deadline) -> Result<StrategyOutcome, SolverError>;
}

/// Lexicographic quality: more assigned jobs first, then lower cost.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quality {
    pub assigned: usize,
    pub cost: f64,
}

impl Quality {
    pub fn of(problem: &Problem, assignment: &Assignment) -> Option<Self> {
        let mut cost = 0.0;
        for (team, jobs) in assignment.routes.iter().enumerate() {
            cost += problem.evaluate(team, jobs).ok()?.cost(&problem.rules);
        }
        Some(Self {
            assigned: assignment.assigned_count(),
            cost,
        })
    }

    /// `Less` means `self` is better.
    pub fn compare(&self, other: &Quality) -> Ordering {
        other
            .assigned
            .cmp(&self.assigned)
            .then_with(|| compare_cost(self.cost, other.cost))
    }
}

/// Float comparison that treats differences below [`EPSILON`] as ties.
pub(crate) fn compare_cost(a: f64, b: f64) -> Ordering {
    if (a - b).abs() <= EPSILON {
        Ordering::Equal
    } else {
        a.total_cmp(&b)
    }
}
