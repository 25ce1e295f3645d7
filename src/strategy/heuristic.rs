//! Fallback strategy: nearest-neighbor construction with a bounded swap pass.
//!
//! Each team in turn extends its route with the closest job it can still
//! serve feasibly, breaking distance ties by priority and then case id.
//! Construction always runs to the end, even past the deadline, so the
//! fallback never comes back empty-handed; only the swap pass is cut short.
//! The swap pass only ever accepts strictly shorter total distance.

use tracing::debug;

use super::{Assignment, Deadline, OptimizationStrategy, StrategyOutcome, compare_cost};
use crate::constraints::{EPSILON, Problem, Schedule};
use crate::error::SolverError;

#[derive(Debug, Clone)]
pub struct NearestNeighborHeuristic {
    max_passes: usize,
}

impl Default for NearestNeighborHeuristic {
    fn default() -> Self {
        Self { max_passes: 200 }
    }
}

impl NearestNeighborHeuristic {
    pub fn new(max_passes: usize) -> Self {
        Self { max_passes }
    }
}

impl OptimizationStrategy for NearestNeighborHeuristic {
    fn name(&self) -> &str {
        "heuristic"
    }

    fn solve(&self, problem: &Problem, deadline: &Deadline) -> Result<StrategyOutcome, SolverError> {
        let mut routes: Vec<Vec<usize>> = vec![Vec::new(); problem.teams.len()];
        let mut schedules = Vec::with_capacity(problem.teams.len());
        for team in 0..problem.teams.len() {
            let schedule = problem.evaluate(team, &[]).map_err(|reason| SolverError::Strategy {
                strategy: self.name().to_string(),
                reason: format!(
                    "vehicle {} cannot leave its depot: {:?}",
                    problem.teams[team].vehicle_id, reason
                ),
            })?;
            schedules.push(schedule);
        }

        let mut assigned = vec![false; problem.jobs.len()];
        construct(problem, &mut routes, &mut schedules, &mut assigned);
        let completed = self.swap_passes(problem, &mut routes, &mut schedules, deadline);

        let unassigned: Vec<usize> = (0..problem.jobs.len()).filter(|&j| !assigned[j]).collect();
        debug!(
            assigned = problem.jobs.len() - unassigned.len(),
            unassigned = unassigned.len(),
            completed,
            "nearest-neighbor heuristic finished"
        );

        Ok(StrategyOutcome {
            assignment: Assignment { routes, unassigned },
            completed,
        })
    }
}

/// Greedy nearest-neighbor construction, one team at a time.
fn construct(
    problem: &Problem,
    routes: &mut [Vec<usize>],
    schedules: &mut [Schedule],
    assigned: &mut [bool],
) {
    for team in 0..routes.len() {
        loop {
            let here = routes[team]
                .last()
                .map_or(problem.team_depot(team), |&j| problem.job_location(j));

            let mut best: Option<(usize, f64, Schedule)> = None;
            for job in 0..problem.jobs.len() {
                if assigned[job] || !problem.covers(team, job) {
                    continue;
                }
                let mut candidate = routes[team].clone();
                candidate.push(job);
                let Ok(schedule) = problem.evaluate(team, &candidate) else {
                    continue;
                };

                let distance = problem.travel(here, problem.job_location(job)).distance_km;
                let closer = match &best {
                    None => true,
                    Some((current, current_distance, _)) => {
                        let (a, b) = (&problem.jobs[job], &problem.jobs[*current]);
                        compare_cost(distance, *current_distance)
                            .then_with(|| b.priority.cmp(&a.priority))
                            .then_with(|| a.case_id.cmp(&b.case_id))
                            .is_lt()
                    }
                };
                if closer {
                    best = Some((job, distance, schedule));
                }
            }

            match best {
                Some((job, _, schedule)) => {
                    routes[team].push(job);
                    schedules[team] = schedule;
                    assigned[job] = true;
                }
                None => break,
            }
        }
    }
}

impl NearestNeighborHeuristic {
    /// Pairwise swaps within and across routes, first improvement per pass.
    /// Returns false when the deadline interrupted the passes.
    fn swap_passes(
        &self,
        problem: &Problem,
        routes: &mut [Vec<usize>],
        schedules: &mut [Schedule],
        deadline: &Deadline,
    ) -> bool {
        for _ in 0..self.max_passes {
            match find_swap(problem, routes, schedules, deadline) {
                SwapSearch::Improved => {}
                SwapSearch::Exhausted => return true,
                SwapSearch::Interrupted => return false,
            }
        }
        true
    }
}

enum SwapSearch {
    Improved,
    Exhausted,
    Interrupted,
}

fn find_swap(
    problem: &Problem,
    routes: &mut [Vec<usize>],
    schedules: &mut [Schedule],
    deadline: &Deadline,
) -> SwapSearch {
    let positions: Vec<(usize, usize)> = routes
        .iter()
        .enumerate()
        .flat_map(|(team, jobs)| (0..jobs.len()).map(move |i| (team, i)))
        .collect();

    for (n, &(ta, ia)) in positions.iter().enumerate() {
        if deadline.is_reached() {
            return SwapSearch::Interrupted;
        }
        for &(tb, ib) in &positions[n + 1..] {
            if ta == tb {
                let mut candidate = routes[ta].clone();
                candidate.swap(ia, ib);
                if let Ok(schedule) = problem.evaluate(ta, &candidate) {
                    if schedule.distance_km() < schedules[ta].distance_km() - EPSILON {
                        routes[ta] = candidate;
                        schedules[ta] = schedule;
                        return SwapSearch::Improved;
                    }
                }
                continue;
            }

            let mut a = routes[ta].clone();
            let mut b = routes[tb].clone();
            std::mem::swap(&mut a[ia], &mut b[ib]);
            let (Ok(sa), Ok(sb)) = (problem.evaluate(ta, &a), problem.evaluate(tb, &b)) else {
                continue;
            };

            let before = schedules[ta].distance_km() + schedules[tb].distance_km();
            if sa.distance_km() + sb.distance_km() < before - EPSILON {
                routes[ta] = a;
                routes[tb] = b;
                schedules[ta] = sa;
                schedules[tb] = sb;
                return SwapSearch::Improved;
            }
        }
    }

    SwapSearch::Exhausted
}
