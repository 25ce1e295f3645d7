//! Solution extraction.
//!
//! Turns scheduled team routes into [`Route`]/[`Visit`] records dated on the
//! planning day. Only routes with at least one visit are returned.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::json;

use crate::constraints::{EPSILON, Problem, Schedule};
use crate::model::{ConstraintViolation, Route, RouteStatus, Visit, ViolationType};

#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub routes: Vec<Route>,
    /// Soft time-window lateness, one warning per late visit.
    pub violations: Vec<ConstraintViolation>,
    pub total_distance_km: f64,
    pub total_time_minutes: f64,
}

/// Builds routes from one schedule per team, in team order.
pub fn extract(problem: &Problem, schedules: &[Schedule], date: NaiveDate) -> Extraction {
    let midnight = date.and_time(NaiveTime::MIN);
    let mut extraction = Extraction::default();

    for (team, schedule) in schedules.iter().enumerate() {
        if schedule.stops.is_empty() {
            continue;
        }
        let vehicle_id = problem.teams[team].vehicle_id;

        let visits: Vec<Visit> = schedule
            .stops
            .iter()
            .enumerate()
            .map(|(sequence, stop)| Visit {
                case_id: problem.jobs[stop.job].case_id,
                sequence,
                estimated_arrival: at_minute(midnight, stop.arrival),
                estimated_departure: at_minute(midnight, stop.departure),
                travel_time_from_previous_minutes: stop.travel.duration_minutes,
                travel_distance_from_previous_km: stop.travel.distance_km,
            })
            .collect();

        for stop in schedule.stops.iter().filter(|stop| stop.lateness > EPSILON) {
            let case_id = problem.jobs[stop.job].case_id;
            extraction.violations.push(
                ConstraintViolation::warning(
                    ViolationType::TimeWindowViolation,
                    format!(
                        "case {} is reached {:.0} minutes after its window closes",
                        case_id, stop.lateness
                    ),
                )
                .for_case(case_id)
                .with_details(json!({
                    "vehicle_id": vehicle_id,
                    "lateness_minutes": stop.lateness,
                })),
            );
        }

        let route = Route {
            vehicle_id,
            visits,
            personnel_ids: problem.teams[team].personnel_ids.clone(),
            total_distance_km: schedule.distance_km(),
            total_duration_minutes: schedule.travel_minutes(),
            status: RouteStatus::Draft,
        };
        extraction.total_distance_km += route.total_distance_km;
        extraction.total_time_minutes += route.total_duration_minutes;
        extraction.routes.push(route);
    }

    extraction
}

/// Minutes-of-day to a timestamp, rounded to the second.
fn at_minute(midnight: NaiveDateTime, minutes: f64) -> NaiveDateTime {
    midnight + Duration::seconds((minutes * 60.0).round() as i64)
}
