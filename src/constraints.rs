//! Constraint model.
//!
//! A [`Problem`] binds jobs and teams to a travel matrix and evaluates route
//! candidates against every hard constraint: skills, capacity, time windows
//! and working hours. Strategies only ever propose job sequences; whether a
//! sequence is feasible, and what it costs, is decided here.

use crate::config::{CapacityMode, OptimizerConfig, TimeWindowMode};
use crate::domain::{Job, Team};
use crate::error::SolverError;
use crate::matrix::TravelMatrix;
use crate::traits::TravelCost;

/// Tolerance for time and cost comparisons.
pub const EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rules {
    pub time_window_mode: TimeWindowMode,
    pub capacity_mode: CapacityMode,
    pub distance_weight: f64,
    pub time_weight: f64,
}

impl Rules {
    pub fn from_config(config: &OptimizerConfig) -> Self {
        Self {
            time_window_mode: config.time_window_mode,
            capacity_mode: config.capacity_mode,
            distance_weight: config.distance_weight,
            time_weight: config.time_weight,
        }
    }
}

impl Default for Rules {
    fn default() -> Self {
        Self::from_config(&OptimizerConfig::default())
    }
}

/// Why a route candidate is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Infeasibility {
    SkillMismatch,
    CapacityExceeded,
    TimeWindow,
    WorkingHours,
}

/// Why a job ended up unassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diagnosis {
    /// No single team holds every required skill.
    SkillMismatch,
    /// Every capable team would reach the case after its window closes.
    TimeWindow,
    /// Every capable team would overrun its working hours.
    WorkingHours,
    /// Capable teams could serve it alone but their daily visits are used up.
    CapacityExceeded,
    /// Capable teams could serve it alone but their routes have no room left.
    NoRoom,
}

/// One scheduled stop. Times are minutes-of-day.
#[derive(Debug, Clone, PartialEq)]
pub struct Stop {
    pub job: usize,
    pub travel: TravelCost,
    pub arrival: f64,
    pub departure: f64,
    /// Minutes past the window end; only non-zero with soft windows.
    pub lateness: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    pub stops: Vec<Stop>,
    /// Departure from the depot.
    pub start: f64,
    /// Return to the depot.
    pub end: f64,
    pub return_travel: TravelCost,
}

impl Schedule {
    pub fn distance_km(&self) -> f64 {
        self.stops.iter().map(|s| s.travel.distance_km).sum::<f64>() + self.return_travel.distance_km
    }

    pub fn travel_minutes(&self) -> f64 {
        self.stops.iter().map(|s| s.travel.duration_minutes).sum::<f64>()
            + self.return_travel.duration_minutes
    }

    /// Depot departure to depot return, including service and waiting.
    pub fn span_minutes(&self) -> f64 {
        self.end - self.start
    }

    pub fn cost(&self, rules: &Rules) -> f64 {
        rules.distance_weight * self.distance_km() + rules.time_weight * self.travel_minutes()
    }
}

#[derive(Debug, Clone)]
pub struct Problem {
    pub jobs: Vec<Job>,
    pub teams: Vec<Team>,
    pub rules: Rules,
    matrix: TravelMatrix,
    job_locations: Vec<usize>,
    team_depots: Vec<usize>,
}

impl Problem {
    pub fn new(
        jobs: Vec<Job>,
        teams: Vec<Team>,
        matrix: TravelMatrix,
        rules: Rules,
    ) -> Result<Self, SolverError> {
        let job_locations = jobs
            .iter()
            .map(|job| {
                matrix.index_of(job.point).ok_or_else(|| {
                    SolverError::Invariant(format!("case {} location missing from matrix", job.case_id))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let team_depots = teams
            .iter()
            .map(|team| {
                matrix.index_of(team.depot).ok_or_else(|| {
                    SolverError::Invariant(format!("vehicle {} depot missing from matrix", team.vehicle_id))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            jobs,
            teams,
            rules,
            matrix,
            job_locations,
            team_depots,
        })
    }

    pub fn matrix(&self) -> &TravelMatrix {
        &self.matrix
    }

    pub fn job_location(&self, job: usize) -> usize {
        self.job_locations[job]
    }

    pub fn team_depot(&self, team: usize) -> usize {
        self.team_depots[team]
    }

    pub fn travel(&self, from: usize, to: usize) -> TravelCost {
        self.matrix.cost(from, to)
    }

    /// Whether the team collectively holds every skill the job requires.
    pub fn covers(&self, team: usize, job: usize) -> bool {
        self.jobs[job].required_skills.is_subset(&self.teams[team].skills)
    }

    /// Maximum number of visits a team's route may hold.
    pub fn visit_limit(&self, team: usize) -> usize {
        match self.rules.capacity_mode {
            CapacityMode::ConcurrentCases => usize::MAX,
            CapacityMode::DailyVisits => self.teams[team].capacity as usize,
        }
    }

    /// Schedules `jobs` in order on `team`'s route.
    ///
    /// The team leaves its depot as late as possible without waiting for the
    /// first window, serves each job on arrival (or at window start when
    /// early) and must be back before its working hours end.
    pub fn evaluate(&self, team: usize, jobs: &[usize]) -> Result<Schedule, Infeasibility> {
        if jobs.len() > self.visit_limit(team) {
            return Err(Infeasibility::CapacityExceeded);
        }

        let hours = self.teams[team].working_hours;
        let depot = self.team_depots[team];
        let mut stops = Vec::with_capacity(jobs.len());
        let mut location = depot;
        let mut start = hours.start as f64;
        let mut time = start;

        for (position, &j) in jobs.iter().enumerate() {
            if !self.covers(team, j) {
                return Err(Infeasibility::SkillMismatch);
            }
            let job = &self.jobs[j];
            let travel = self.travel(location, self.job_locations[j]);

            if position == 0 {
                if let Some(window) = job.window {
                    start = start.max(window.start as f64 - travel.duration_minutes);
                }
                time = start;
            }

            let mut arrival = time + travel.duration_minutes;
            let mut lateness = 0.0;
            if let Some(window) = job.window {
                arrival = arrival.max(window.start as f64);
                let late_by = arrival - window.end as f64;
                if late_by > EPSILON {
                    match self.rules.time_window_mode {
                        TimeWindowMode::Hard => return Err(Infeasibility::TimeWindow),
                        TimeWindowMode::Soft => lateness = late_by,
                    }
                }
            }

            let departure = arrival + job.duration_minutes;
            stops.push(Stop {
                job: j,
                travel,
                arrival,
                departure,
                lateness,
            });
            time = departure;
            location = self.job_locations[j];
        }

        let return_travel = self.travel(location, depot);
        let end = time + return_travel.duration_minutes;
        if end > hours.end as f64 + EPSILON {
            return Err(Infeasibility::WorkingHours);
        }

        Ok(Schedule {
            stops,
            start,
            end,
            return_travel,
        })
    }

    /// Explains why `job` is not on any of `routes`.
    pub fn diagnose(&self, job: usize, routes: &[Vec<usize>]) -> Diagnosis {
        let capable: Vec<usize> = (0..self.teams.len()).filter(|&t| self.covers(t, job)).collect();
        if capable.is_empty() {
            return Diagnosis::SkillMismatch;
        }

        let mut servable_alone = false;
        let mut all_full = true;
        let mut window_blocked = false;

        for team in capable {
            match self.evaluate(team, &[job]) {
                Ok(_) => {
                    servable_alone = true;
                    let used = routes.get(team).map_or(0, Vec::len);
                    if used < self.visit_limit(team) {
                        all_full = false;
                    }
                }
                Err(Infeasibility::TimeWindow) => window_blocked = true,
                Err(_) => {}
            }
        }

        match (servable_alone, all_full, window_blocked) {
            (true, true, _) => Diagnosis::CapacityExceeded,
            (true, false, _) => Diagnosis::NoRoom,
            (false, _, true) => Diagnosis::TimeWindow,
            (false, _, false) => Diagnosis::WorkingHours,
        }
    }
}
