//! Primary strategy: cheapest insertion followed by local search to a local
//! optimum (2-opt, relocate, exchange, re-insertion of left-out jobs).
//!
//! Insertion picks the most urgent job first, then the cheapest position,
//! then the position that keeps route spans balanced, then the lowest case
//! id. The search stops when no move improves the objective or when the
//! deadline passes; in the latter case the best solution so far is returned
//! and the outcome is marked incomplete.

use std::cmp::Ordering;

use tracing::debug;

use super::{Assignment, Deadline, OptimizationStrategy, StrategyOutcome, compare_cost};
use crate::constraints::{EPSILON, Problem, Schedule};
use crate::error::SolverError;

/// Safety bound on improvement rounds for pathological inputs.
const DEFAULT_MAX_ROUNDS: usize = 10_000;

#[derive(Debug, Clone)]
pub struct ConstraintSolver {
    max_rounds: usize,
}

impl Default for ConstraintSolver {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }
}

impl ConstraintSolver {
    pub fn new(max_rounds: usize) -> Self {
        Self { max_rounds }
    }
}

#[derive(Debug, Clone)]
struct RouteState {
    jobs: Vec<usize>,
    schedule: Schedule,
}

#[derive(Debug, Clone)]
struct Insertion {
    job: usize,
    team: usize,
    position: usize,
    schedule: Schedule,
    delta: f64,
    balance: f64,
}

impl OptimizationStrategy for ConstraintSolver {
    fn name(&self) -> &str {
        "solver"
    }

    fn solve(&self, problem: &Problem, deadline: &Deadline) -> Result<StrategyOutcome, SolverError> {
        let mut routes = empty_routes(problem)?;
        let mut pending: Vec<usize> = (0..problem.jobs.len()).collect();

        let mut completed = insert_all(problem, &mut routes, &mut pending, deadline);
        if completed {
            completed = self.improve(problem, &mut routes, &mut pending, deadline);
        }

        pending.sort_unstable();
        debug!(
            assigned = problem.jobs.len() - pending.len(),
            unassigned = pending.len(),
            completed,
            "constraint solver finished"
        );

        Ok(StrategyOutcome {
            assignment: Assignment {
                routes: routes.into_iter().map(|route| route.jobs).collect(),
                unassigned: pending,
            },
            completed,
        })
    }
}

impl ConstraintSolver {
    /// Runs improvement rounds until a local optimum or the deadline.
    /// Returns false when the deadline interrupted the search.
    fn improve(
        &self,
        problem: &Problem,
        routes: &mut [RouteState],
        pending: &mut Vec<usize>,
        deadline: &Deadline,
    ) -> bool {
        for round in 0..self.max_rounds {
            if deadline.is_reached() {
                debug!(round, "deadline reached during improvement");
                return false;
            }

            let mut improved = false;
            for (team, route) in routes.iter_mut().enumerate() {
                if two_opt_improve(problem, team, route, deadline) {
                    improved = true;
                }
            }
            if relocate_improve(problem, routes, deadline) {
                improved = true;
            }
            if exchange_improve(problem, routes, deadline) {
                improved = true;
            }
            if let Some(insertion) = best_insertion(problem, routes, pending) {
                apply_insertion(routes, pending, insertion);
                improved = true;
            }

            if !improved {
                return !deadline.is_reached();
            }
        }
        true
    }
}

fn empty_routes(problem: &Problem) -> Result<Vec<RouteState>, SolverError> {
    (0..problem.teams.len())
        .map(|team| {
            problem
                .evaluate(team, &[])
                .map(|schedule| RouteState {
                    jobs: Vec::new(),
                    schedule,
                })
                .map_err(|reason| {
                    SolverError::Invariant(format!(
                        "empty route of vehicle {} is infeasible: {:?}",
                        problem.teams[team].vehicle_id, reason
                    ))
                })
        })
        .collect()
}

/// Inserts pending jobs one at a time until none fits.
fn insert_all(
    problem: &Problem,
    routes: &mut [RouteState],
    pending: &mut Vec<usize>,
    deadline: &Deadline,
) -> bool {
    while !pending.is_empty() {
        if deadline.is_reached() {
            return false;
        }
        match best_insertion(problem, routes, pending) {
            Some(insertion) => apply_insertion(routes, pending, insertion),
            None => break,
        }
    }
    true
}

fn apply_insertion(routes: &mut [RouteState], pending: &mut Vec<usize>, insertion: Insertion) {
    let route = &mut routes[insertion.team];
    route.jobs.insert(insertion.position, insertion.job);
    route.schedule = insertion.schedule;
    pending.retain(|&job| job != insertion.job);
}

fn best_insertion(problem: &Problem, routes: &[RouteState], pending: &[usize]) -> Option<Insertion> {
    let spans: Vec<f64> = routes.iter().map(|r| r.schedule.span_minutes()).collect();
    let mut best: Option<Insertion> = None;

    for &job in pending {
        for (team, route) in routes.iter().enumerate() {
            if !problem.covers(team, job) {
                continue;
            }
            let current_cost = route.schedule.cost(&problem.rules);
            let others_max = spans
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != team)
                .map(|(_, span)| *span)
                .fold(0.0, f64::max);

            for position in 0..=route.jobs.len() {
                let mut candidate = route.jobs.clone();
                candidate.insert(position, job);

                let Ok(schedule) = problem.evaluate(team, &candidate) else {
                    continue;
                };
                let insertion = Insertion {
                    job,
                    team,
                    position,
                    delta: schedule.cost(&problem.rules) - current_cost,
                    balance: others_max.max(schedule.span_minutes()),
                    schedule,
                };
                let replace = match &best {
                    Some(current) => compare_insertions(problem, &insertion, current) == Ordering::Less,
                    None => true,
                };
                if replace {
                    best = Some(insertion);
                }
            }
        }
    }

    best
}

/// `Less` means `a` should be preferred.
fn compare_insertions(problem: &Problem, a: &Insertion, b: &Insertion) -> Ordering {
    let (job_a, job_b) = (&problem.jobs[a.job], &problem.jobs[b.job]);
    job_b
        .priority
        .cmp(&job_a.priority)
        .then_with(|| compare_cost(a.delta, b.delta))
        .then_with(|| compare_cost(a.balance, b.balance))
        .then_with(|| job_a.case_id.cmp(&job_b.case_id))
}

/// 2-opt: reverse a segment within a route to reduce cost.
/// Returns true if an improvement was made.
fn two_opt_improve(problem: &Problem, team: usize, route: &mut RouteState, deadline: &Deadline) -> bool {
    let n = route.jobs.len();
    if n < 2 {
        return false;
    }
    let current_cost = route.schedule.cost(&problem.rules);

    for i in 0..n - 1 {
        if deadline.is_reached() {
            return false;
        }
        for j in i + 1..n {
            let mut candidate = route.jobs.clone();
            candidate[i..=j].reverse();

            if let Ok(schedule) = problem.evaluate(team, &candidate) {
                if schedule.cost(&problem.rules) < current_cost - EPSILON {
                    route.jobs = candidate;
                    route.schedule = schedule;
                    return true;
                }
            }
        }
    }

    false
}

/// Relocate: move a job to another position, in the same or another route.
/// Returns true if an improvement was made.
fn relocate_improve(problem: &Problem, routes: &mut [RouteState], deadline: &Deadline) -> bool {
    for from in 0..routes.len() {
        for idx in 0..routes[from].jobs.len() {
            if deadline.is_reached() {
                return false;
            }
            let job = routes[from].jobs[idx];

            for to in 0..routes.len() {
                if !problem.covers(to, job) {
                    continue;
                }

                if from == to {
                    let old_cost = routes[from].schedule.cost(&problem.rules);
                    for position in 0..routes[from].jobs.len() {
                        if position == idx {
                            continue;
                        }
                        let mut candidate = routes[from].jobs.clone();
                        candidate.remove(idx);
                        candidate.insert(position, job);
                        if let Ok(schedule) = problem.evaluate(from, &candidate) {
                            if schedule.cost(&problem.rules) < old_cost - EPSILON {
                                routes[from].jobs = candidate;
                                routes[from].schedule = schedule;
                                return true;
                            }
                        }
                    }
                    continue;
                }

                let mut from_candidate = routes[from].jobs.clone();
                from_candidate.remove(idx);
                let Ok(from_schedule) = problem.evaluate(from, &from_candidate) else {
                    continue;
                };
                let old_cost = routes[from].schedule.cost(&problem.rules)
                    + routes[to].schedule.cost(&problem.rules);

                for position in 0..=routes[to].jobs.len() {
                    let mut to_candidate = routes[to].jobs.clone();
                    to_candidate.insert(position, job);
                    let Ok(to_schedule) = problem.evaluate(to, &to_candidate) else {
                        continue;
                    };

                    let new_cost = from_schedule.cost(&problem.rules) + to_schedule.cost(&problem.rules);
                    if new_cost < old_cost - EPSILON {
                        routes[from].jobs = from_candidate;
                        routes[from].schedule = from_schedule;
                        routes[to].jobs = to_candidate;
                        routes[to].schedule = to_schedule;
                        return true;
                    }
                }
            }
        }
    }

    false
}

/// Exchange: swap two jobs between different routes.
/// Returns true if an improvement was made.
fn exchange_improve(problem: &Problem, routes: &mut [RouteState], deadline: &Deadline) -> bool {
    for a in 0..routes.len() {
        for b in a + 1..routes.len() {
            if deadline.is_reached() {
                return false;
            }
            let old_cost =
                routes[a].schedule.cost(&problem.rules) + routes[b].schedule.cost(&problem.rules);

            for i in 0..routes[a].jobs.len() {
                for j in 0..routes[b].jobs.len() {
                    let (job_a, job_b) = (routes[a].jobs[i], routes[b].jobs[j]);
                    if !problem.covers(b, job_a) || !problem.covers(a, job_b) {
                        continue;
                    }

                    let mut a_candidate = routes[a].jobs.clone();
                    let mut b_candidate = routes[b].jobs.clone();
                    a_candidate[i] = job_b;
                    b_candidate[j] = job_a;

                    let (Ok(a_schedule), Ok(b_schedule)) = (
                        problem.evaluate(a, &a_candidate),
                        problem.evaluate(b, &b_candidate),
                    ) else {
                        continue;
                    };

                    let new_cost = a_schedule.cost(&problem.rules) + b_schedule.cost(&problem.rules);
                    if new_cost < old_cost - EPSILON {
                        routes[a] = RouteState {
                            jobs: a_candidate,
                            schedule: a_schedule,
                        };
                        routes[b] = RouteState {
                            jobs: b_candidate,
                            schedule: b_schedule,
                        };
                        return true;
                    }
                }
            }
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use crate::config::CapacityMode;
    use crate::constraints::Rules;
    use crate::strategy::testing::{job, problem, team};

    fn budget() -> Deadline {
        Deadline::new(Duration::from_secs(10))
    }

    #[test]
    fn test_assigns_every_reachable_job() {
        let p = problem(
            vec![job(1, 0.03, 0, &[]), job(2, 0.01, 0, &[]), job(3, 0.02, 0, &[])],
            vec![team(1, 2, &[])],
            Rules::default(),
        );
        let outcome = ConstraintSolver::default().solve(&p, &budget()).unwrap();

        assert!(outcome.completed);
        assert!(outcome.assignment.unassigned.is_empty());
        assert!(outcome.assignment.validate(&p).is_ok());
        // Along a line the cheapest tour visits the points in order.
        let route = &outcome.assignment.routes[0];
        let cases: Vec<u64> = route.iter().map(|&j| p.jobs[j].case_id).collect();
        assert!(cases == vec![2, 3, 1] || cases == vec![1, 3, 2]);
    }

    #[test]
    fn test_higher_priority_wins_scarce_capacity() {
        let rules = Rules {
            capacity_mode: CapacityMode::DailyVisits,
            ..Rules::default()
        };
        let p = problem(
            vec![job(1, 0.01, 0, &[]), job(2, 0.05, 3, &[])],
            vec![team(1, 1, &[])],
            rules,
        );
        let outcome = ConstraintSolver::default().solve(&p, &budget()).unwrap();

        assert_eq!(outcome.assignment.routes[0], vec![1]);
        assert_eq!(outcome.assignment.unassigned, vec![0]);
    }

    #[test]
    fn test_skilled_job_goes_to_capable_team() {
        let p = problem(
            vec![job(1, 0.01, 0, &[7]), job(2, 0.02, 0, &[])],
            vec![team(1, 2, &[]), team(2, 2, &[7])],
            Rules::default(),
        );
        let outcome = ConstraintSolver::default().solve(&p, &budget()).unwrap();

        assert!(outcome.assignment.routes[1].contains(&0));
        assert!(outcome.assignment.validate(&p).is_ok());
    }

    #[test]
    fn test_expired_deadline_returns_valid_partial_result() {
        let p = problem(
            vec![job(1, 0.01, 0, &[]), job(2, 0.02, 0, &[])],
            vec![team(1, 2, &[])],
            Rules::default(),
        );
        let outcome = ConstraintSolver::default()
            .solve(&p, &Deadline::new(Duration::ZERO))
            .unwrap();

        assert!(!outcome.completed);
        assert_eq!(outcome.assignment.unassigned, vec![0, 1]);
        assert!(outcome.assignment.validate(&p).is_ok());
    }

    #[test]
    fn test_is_deterministic() {
        let jobs: Vec<_> = (0..8)
            .map(|i| job(i + 1, 0.005 * (i as f64 + 1.0), (i % 3) as u8, &[]))
            .collect();
        let p = problem(jobs, vec![team(1, 4, &[]), team(2, 4, &[])], Rules::default());
        let solver = ConstraintSolver::default();

        let first = solver.solve(&p, &budget()).unwrap();
        let second = solver.solve(&p, &budget()).unwrap();
        assert_eq!(first, second);
    }
}
