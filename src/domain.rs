//! Domain model builder.
//!
//! Turns raw entities into jobs (plannable cases) and teams (vehicles with
//! their personnel), validating every record on the way. Cases that cannot
//! be served by anybody in the personnel pool are set aside here so that no
//! strategy spends budget on them.
//!
//! Two skill sets matter: the supplied pool (every active personnel record)
//! decides whether a skill is missing from the staff, the seated skills
//! (personnel actually riding a vehicle) decide whether a case can be routed
//! in this run.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde_json::json;
use tracing::debug;

use crate::error::ValidationError;
use crate::model::{
    Case, CareType, CareTypeId, CaseId, ConstraintViolation, GeoPoint, OptimizationRequest,
    Personnel, PersonnelAssignment, PersonnelId, Skill, SkillId, TimeWindow, Vehicle, VehicleId, VehicleStatus,
    ViolationType,
};

/// Entities hydrated for one planning run.
#[derive(Debug, Clone, Default)]
pub struct Entities {
    pub cases: Vec<Case>,
    pub vehicles: Vec<Vehicle>,
    pub personnel: Vec<Personnel>,
    pub care_types: Vec<CareType>,
    pub skills: Vec<Skill>,
}

/// A case ready for routing.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub case_id: CaseId,
    pub point: GeoPoint,
    pub duration_minutes: f64,
    pub window: Option<TimeWindow>,
    pub required_skills: BTreeSet<SkillId>,
    pub priority: u8,
}

/// A vehicle together with the personnel riding it.
#[derive(Debug, Clone, PartialEq)]
pub struct Team {
    pub vehicle_id: VehicleId,
    pub depot: GeoPoint,
    pub personnel_ids: Vec<PersonnelId>,
    /// Union of the members' skills.
    pub skills: BTreeSet<SkillId>,
    /// Intersection of the members' working hours.
    pub working_hours: TimeWindow,
    pub capacity: u32,
}

#[derive(Debug, Clone)]
pub struct DomainModel {
    /// Sorted by case id.
    pub jobs: Vec<Job>,
    /// Sorted by vehicle id.
    pub teams: Vec<Team>,
    /// Cases set aside before solving.
    pub excluded: Vec<CaseId>,
    pub violations: Vec<ConstraintViolation>,
    /// Skills held by any active personnel supplied.
    pub skill_pool: BTreeSet<SkillId>,
    /// Skills held by personnel riding a vehicle in this run.
    pub seated_skills: BTreeSet<SkillId>,
    pub skill_names: BTreeMap<SkillId, String>,
    /// Required skills of every requested case.
    pub requirements: BTreeMap<CaseId, BTreeSet<SkillId>>,
}

impl DomainModel {
    /// Depots first, then case locations. May contain duplicates.
    pub fn points(&self) -> Vec<GeoPoint> {
        self.teams
            .iter()
            .map(|team| team.depot)
            .chain(self.jobs.iter().map(|job| job.point))
            .collect()
    }

    pub fn skill_label(&self, id: SkillId) -> String {
        skill_label(&self.skill_names, id)
    }
}

pub(crate) fn skill_label(names: &BTreeMap<SkillId, String>, id: SkillId) -> String {
    names
        .get(&id)
        .cloned()
        .unwrap_or_else(|| format!("skill-{}", id))
}

pub struct ModelBuilder;

impl ModelBuilder {
    pub fn build(
        request: &OptimizationRequest,
        entities: &Entities,
    ) -> Result<DomainModel, ValidationError> {
        let care_types = validate_care_types(entities)?;
        validate_cases(&entities.cases)?;
        validate_personnel(&entities.personnel)?;
        validate_vehicles(&entities.vehicles)?;

        let mut violations = Vec::new();
        let skill_names: BTreeMap<SkillId, String> = entities
            .skills
            .iter()
            .map(|skill| (skill.id, skill.name.clone()))
            .collect();

        let roster = match &request.personnel_assignments {
            Some(assignments) => explicit_roster(entities, assignments, &mut violations)?,
            None => {
                let demand = skill_demand(&entities.cases, &care_types);
                automatic_roster(entities, &demand, &mut violations)
            }
        };

        let mut teams = Vec::new();
        for (vehicle, members) in roster {
            if let Some(team) = build_team(vehicle, &members, &mut violations) {
                teams.push(team);
            }
        }
        teams.sort_by_key(|team| team.vehicle_id);

        let skill_pool: BTreeSet<SkillId> = entities
            .personnel
            .iter()
            .filter(|member| member.active)
            .flat_map(|member| member.skills.iter().copied())
            .collect();
        let seated_skills: BTreeSet<SkillId> = teams
            .iter()
            .flat_map(|team| team.skills.iter().copied())
            .collect();

        let mut cases: Vec<&Case> = entities.cases.iter().collect();
        cases.sort_by_key(|case| case.id);

        let mut jobs = Vec::new();
        let mut excluded = Vec::new();
        let mut requirements = BTreeMap::new();

        for case in cases {
            let care_type = care_types[&case.care_type_id];
            let required = care_type.required_skills.clone();
            requirements.insert(case.id, required.clone());

            if !case.status.is_plannable() {
                excluded.push(case.id);
                violations.push(
                    ConstraintViolation::warning(
                        ViolationType::Infeasible,
                        format!("case {} has status {:?} and is not planned", case.id, case.status),
                    )
                    .for_case(case.id),
                );
                continue;
            }

            let missing: Vec<SkillId> = required.difference(&skill_pool).copied().collect();
            if !missing.is_empty() {
                let labels: Vec<String> = missing.iter().map(|id| skill_label(&skill_names, *id)).collect();
                excluded.push(case.id);
                violations.push(
                    ConstraintViolation::error(
                        ViolationType::SkillMismatch,
                        format!(
                            "case {} requires skills no available personnel holds: {}",
                            case.id,
                            labels.join(", ")
                        ),
                    )
                    .for_case(case.id)
                    .with_details(json!({
                        "care_type_id": care_type.id,
                        "required_skills": required.iter().map(|id| skill_label(&skill_names, *id)).collect::<Vec<_>>(),
                        "missing_skills": labels,
                    })),
                );
                continue;
            }

            let unseated: Vec<SkillId> = required.difference(&seated_skills).copied().collect();
            if !unseated.is_empty() {
                let labels: Vec<String> = unseated.iter().map(|id| skill_label(&skill_names, *id)).collect();
                excluded.push(case.id);
                violations.push(
                    ConstraintViolation::error(
                        ViolationType::SkillMismatch,
                        format!(
                            "case {} requires skills held only by personnel without a vehicle seat: {}",
                            case.id,
                            labels.join(", ")
                        ),
                    )
                    .for_case(case.id)
                    .with_details(json!({
                        "care_type_id": care_type.id,
                        "required_skills": required.iter().map(|id| skill_label(&skill_names, *id)).collect::<Vec<_>>(),
                        "unseated_skills": labels,
                    })),
                );
                continue;
            }

            let duration = care_type.duration_minutes as f64;
            if let Some(window) = case.time_window {
                let reachable = teams
                    .iter()
                    .any(|team| window_reachable(window, duration, team.working_hours));
                if !reachable {
                    excluded.push(case.id);
                    violations.push(
                        ConstraintViolation::error(
                            ViolationType::Infeasible,
                            format!(
                                "case {} time window cannot be met within any team's working hours",
                                case.id
                            ),
                        )
                        .for_case(case.id)
                        .with_details(json!({
                            "window_start": window.start,
                            "window_end": window.end,
                            "duration_minutes": care_type.duration_minutes,
                        })),
                    );
                    continue;
                }
            }

            jobs.push(Job {
                case_id: case.id,
                point: case.location,
                duration_minutes: duration,
                window: case.time_window,
                required_skills: required,
                priority: case.priority,
            });
        }

        debug!(
            jobs = jobs.len(),
            teams = teams.len(),
            excluded = excluded.len(),
            "domain model built"
        );

        Ok(DomainModel {
            jobs,
            teams,
            excluded,
            violations,
            skill_pool,
            seated_skills,
            skill_names,
            requirements,
        })
    }
}

/// Whether a visit can start inside `window` and finish inside `hours`.
fn window_reachable(window: TimeWindow, duration: f64, hours: TimeWindow) -> bool {
    let earliest = window.start.max(hours.start) as f64;
    window.end >= hours.start && earliest + duration <= hours.end as f64
}

fn validate_care_types(entities: &Entities) -> Result<HashMap<CareTypeId, &CareType>, ValidationError> {
    let care_types: HashMap<CareTypeId, &CareType> =
        entities.care_types.iter().map(|ct| (ct.id, ct)).collect();

    for case in &entities.cases {
        let care_type = care_types
            .get(&case.care_type_id)
            .ok_or(ValidationError::UnknownCareType {
                case_id: case.id,
                care_type_id: case.care_type_id,
            })?;
        if care_type.duration_minutes == 0 {
            return Err(ValidationError::NonPositiveDuration {
                care_type_id: care_type.id,
            });
        }
    }

    Ok(care_types)
}

fn validate_cases(cases: &[Case]) -> Result<(), ValidationError> {
    for case in cases {
        if !case.location.is_valid() {
            return Err(ValidationError::InvalidLocation { case_id: case.id });
        }
        if let Some(window) = case.time_window {
            if !window.is_well_formed() {
                return Err(ValidationError::MalformedTimeWindow {
                    case_id: case.id,
                    start: window.start,
                    end: window.end,
                });
            }
        }
    }
    Ok(())
}

fn validate_personnel(personnel: &[Personnel]) -> Result<(), ValidationError> {
    let mut seen = BTreeSet::new();
    for member in personnel {
        if !seen.insert(member.id) {
            return Err(ValidationError::Duplicate {
                kind: "personnel",
                id: member.id,
            });
        }
        if !member.working_hours.is_well_formed() {
            return Err(ValidationError::MalformedWorkingHours {
                personnel_id: member.id,
                start: member.working_hours.start,
                end: member.working_hours.end,
            });
        }
    }
    Ok(())
}

fn validate_vehicles(vehicles: &[Vehicle]) -> Result<(), ValidationError> {
    for vehicle in vehicles {
        if vehicle.capacity == 0 {
            return Err(ValidationError::ZeroCapacity {
                vehicle_id: vehicle.id,
            });
        }
        if !vehicle.base_location.is_valid() {
            return Err(ValidationError::InvalidDepot {
                vehicle_id: vehicle.id,
            });
        }
    }
    Ok(())
}

fn eligible_vehicle(vehicle: &Vehicle, violations: &mut Vec<ConstraintViolation>) -> bool {
    if vehicle.status == VehicleStatus::Available {
        return true;
    }
    violations.push(
        ConstraintViolation::warning(
            ViolationType::Infeasible,
            format!(
                "vehicle {} has status {:?} and is excluded from planning",
                vehicle.id, vehicle.status
            ),
        )
        .for_vehicle(vehicle.id),
    );
    false
}

fn explicit_roster<'a>(
    entities: &'a Entities,
    assignments: &[PersonnelAssignment],
    violations: &mut Vec<ConstraintViolation>,
) -> Result<Vec<(&'a Vehicle, Vec<&'a Personnel>)>, ValidationError> {
    let vehicles: BTreeMap<VehicleId, &Vehicle> =
        entities.vehicles.iter().map(|v| (v.id, v)).collect();
    let personnel: BTreeMap<PersonnelId, &Personnel> =
        entities.personnel.iter().map(|p| (p.id, p)).collect();

    let mut by_vehicle: BTreeMap<VehicleId, Vec<&Personnel>> = BTreeMap::new();
    let mut assigned = BTreeSet::new();

    for assignment in assignments {
        let vehicle = vehicles.get(&assignment.vehicle_id).ok_or(
            ValidationError::AssignmentForUnknownVehicle {
                vehicle_id: assignment.vehicle_id,
            },
        )?;
        if by_vehicle.contains_key(&vehicle.id) {
            return Err(ValidationError::Duplicate {
                kind: "personnel assignment for vehicle",
                id: vehicle.id,
            });
        }
        if assignment.personnel_ids.len() > vehicle.capacity as usize {
            return Err(ValidationError::TeamExceedsCapacity {
                vehicle_id: vehicle.id,
                team_size: assignment.personnel_ids.len(),
                capacity: vehicle.capacity,
            });
        }

        let mut members = Vec::new();
        for personnel_id in &assignment.personnel_ids {
            let member = personnel.get(personnel_id).ok_or(ValidationError::UnknownPersonnel {
                personnel_id: *personnel_id,
            })?;
            if !assigned.insert(*personnel_id) {
                return Err(ValidationError::PersonnelAssignedTwice {
                    personnel_id: *personnel_id,
                });
            }
            if member.active {
                members.push(*member);
            } else {
                violations.push(
                    ConstraintViolation::warning(
                        ViolationType::Infeasible,
                        format!(
                            "personnel {} is inactive and was removed from vehicle {}",
                            member.id, vehicle.id
                        ),
                    )
                    .for_personnel(member.id),
                );
            }
        }
        by_vehicle.insert(vehicle.id, members);
    }

    let mut roster = Vec::new();
    for vehicle in &entities.vehicles {
        if !eligible_vehicle(vehicle, violations) {
            continue;
        }
        let members = by_vehicle.remove(&vehicle.id).unwrap_or_default();
        roster.push((vehicle, members));
    }
    Ok(roster)
}

/// Skills required by the plannable requested cases.
fn skill_demand(cases: &[Case], care_types: &HashMap<CareTypeId, &CareType>) -> BTreeSet<SkillId> {
    cases
        .iter()
        .filter(|case| case.status.is_plannable())
        .filter_map(|case| care_types.get(&case.care_type_id))
        .flat_map(|care_type| care_type.required_skills.iter().copied())
        .collect()
}

/// Distributes active personnel round-robin over eligible vehicles, up to
/// each vehicle's capacity. Holders of demanded skills are seated first,
/// each pick adding the most skills not yet on board (lowest id on ties);
/// everybody else follows in ascending id order.
fn automatic_roster<'a>(
    entities: &'a Entities,
    demand: &BTreeSet<SkillId>,
    violations: &mut Vec<ConstraintViolation>,
) -> Vec<(&'a Vehicle, Vec<&'a Personnel>)> {
    let mut vehicles: Vec<&Vehicle> = entities
        .vehicles
        .iter()
        .filter(|vehicle| eligible_vehicle(vehicle, violations))
        .collect();
    vehicles.sort_by_key(|vehicle| vehicle.id);

    let mut pending: Vec<&Personnel> = entities.personnel.iter().filter(|p| p.active).collect();
    pending.sort_by_key(|p| p.id);

    let mut personnel = Vec::with_capacity(pending.len());
    let mut uncovered = demand.clone();
    while !uncovered.is_empty() {
        let best = pending
            .iter()
            .enumerate()
            .map(|(i, member)| (i, member.skills.intersection(&uncovered).count()))
            .filter(|&(_, added)| added > 0)
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)));
        let Some((i, _)) = best else {
            break;
        };
        let member = pending.remove(i);
        uncovered.retain(|skill| !member.skills.contains(skill));
        personnel.push(member);
    }
    personnel.extend(pending);

    let mut roster: Vec<(&Vehicle, Vec<&Personnel>)> =
        vehicles.into_iter().map(|vehicle| (vehicle, Vec::new())).collect();
    if roster.is_empty() {
        return roster;
    }

    let mut slot = 0;
    let mut unplaced = 0;
    for member in personnel {
        let mut placed = false;
        for offset in 0..roster.len() {
            let idx = (slot + offset) % roster.len();
            let (vehicle, members) = &mut roster[idx];
            if members.len() < vehicle.capacity as usize {
                members.push(member);
                slot = idx + 1;
                placed = true;
                break;
            }
        }
        if !placed {
            unplaced += 1;
        }
    }
    if unplaced > 0 {
        debug!(unplaced, "personnel left without a vehicle seat");
    }

    roster
}

fn build_team(
    vehicle: &Vehicle,
    members: &[&Personnel],
    violations: &mut Vec<ConstraintViolation>,
) -> Option<Team> {
    if members.is_empty() {
        violations.push(
            ConstraintViolation::warning(
                ViolationType::Infeasible,
                format!("vehicle {} has no active personnel and is excluded", vehicle.id),
            )
            .for_vehicle(vehicle.id),
        );
        return None;
    }

    let mut working_hours = Some(members[0].working_hours);
    for member in &members[1..] {
        working_hours = working_hours.and_then(|hours| hours.intersect(&member.working_hours));
    }
    let Some(working_hours) = working_hours else {
        violations.push(
            ConstraintViolation::warning(
                ViolationType::WorkingHoursViolation,
                format!(
                    "personnel on vehicle {} have no common working hours; vehicle excluded",
                    vehicle.id
                ),
            )
            .for_vehicle(vehicle.id)
            .with_details(json!({
                "personnel_ids": members.iter().map(|m| m.id).collect::<Vec<_>>(),
            })),
        );
        return None;
    };

    let mut personnel_ids: Vec<PersonnelId> = members.iter().map(|m| m.id).collect();
    personnel_ids.sort_unstable();

    Some(Team {
        vehicle_id: vehicle.id,
        depot: vehicle.base_location,
        personnel_ids,
        skills: members
            .iter()
            .flat_map(|m| m.skills.iter().copied())
            .collect(),
        working_hours,
        capacity: vehicle.capacity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::NaiveDate;

    use crate::model::CaseStatus;

    const WOUND_CARE: SkillId = 1;
    const IV_THERAPY: SkillId = 2;

    fn entities() -> Entities {
        Entities {
            cases: vec![
                case(10, 100, Some(TimeWindow::hm((8, 0), (9, 0)))),
                case(11, 101, None),
            ],
            vehicles: vec![vehicle(1, 2), vehicle(2, 2)],
            personnel: vec![
                nurse(5, &[WOUND_CARE], TimeWindow::hm((8, 0), (17, 0))),
                nurse(6, &[], TimeWindow::hm((9, 0), (15, 0))),
            ],
            care_types: vec![
                CareType {
                    id: 100,
                    name: "wound dressing".into(),
                    duration_minutes: 30,
                    required_skills: [WOUND_CARE].into(),
                },
                CareType {
                    id: 101,
                    name: "iv therapy".into(),
                    duration_minutes: 45,
                    required_skills: [IV_THERAPY].into(),
                },
            ],
            skills: vec![
                Skill { id: WOUND_CARE, name: "wound_care".into() },
                Skill { id: IV_THERAPY, name: "iv_therapy".into() },
            ],
        }
    }

    fn case(id: CaseId, care_type_id: CareTypeId, window: Option<TimeWindow>) -> Case {
        Case {
            id,
            patient_id: id + 1000,
            care_type_id,
            location: GeoPoint::new(41.39, 2.16),
            time_window: window,
            priority: 0,
            status: CaseStatus::Pending,
        }
    }

    fn vehicle(id: VehicleId, capacity: u32) -> Vehicle {
        Vehicle {
            id,
            name: format!("van-{}", id),
            capacity,
            base_location: GeoPoint::new(41.38, 2.17),
            status: VehicleStatus::Available,
            special_resources: Vec::new(),
        }
    }

    fn nurse(id: PersonnelId, skills: &[SkillId], hours: TimeWindow) -> Personnel {
        Personnel {
            id,
            name: format!("nurse-{}", id),
            skills: skills.iter().copied().collect(),
            working_hours: hours,
            start_location: None,
            active: true,
        }
    }

    fn request(entities: &Entities) -> OptimizationRequest {
        OptimizationRequest::new(
            NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            entities.cases.iter().map(|c| c.id).collect(),
            entities.vehicles.iter().map(|v| v.id).collect(),
        )
    }

    #[test]
    fn test_missing_skill_is_excluded_before_solving() {
        let entities = entities();
        let model = ModelBuilder::build(&request(&entities), &entities).unwrap();

        assert_eq!(model.jobs.iter().map(|j| j.case_id).collect::<Vec<_>>(), vec![10]);
        assert_eq!(model.excluded, vec![11]);

        let violation = model
            .violations
            .iter()
            .find(|v| v.case_id() == Some(11))
            .unwrap();
        assert_eq!(violation.violation_type, ViolationType::SkillMismatch);
        assert_eq!(violation.details["missing_skills"][0], "iv_therapy");
    }

    #[test]
    fn test_round_robin_roster() {
        let entities = entities();
        let model = ModelBuilder::build(&request(&entities), &entities).unwrap();

        assert_eq!(model.teams.len(), 2);
        assert_eq!(model.teams[0].personnel_ids, vec![5]);
        assert_eq!(model.teams[1].personnel_ids, vec![6]);
    }

    #[test]
    fn test_skill_holders_are_seated_first() {
        let mut entities = entities();
        entities.cases.truncate(1);
        entities.vehicles = vec![vehicle(1, 1), vehicle(2, 1)];
        entities.personnel = vec![
            nurse(1, &[], TimeWindow::hm((8, 0), (17, 0))),
            nurse(2, &[], TimeWindow::hm((8, 0), (17, 0))),
            nurse(3, &[WOUND_CARE], TimeWindow::hm((8, 0), (17, 0))),
        ];
        let model = ModelBuilder::build(&request(&entities), &entities).unwrap();

        assert_eq!(model.teams[0].personnel_ids, vec![3]);
        assert_eq!(model.teams[1].personnel_ids, vec![1]);
        assert_eq!(model.jobs.iter().map(|j| j.case_id).collect::<Vec<_>>(), vec![10]);
        assert!(model.excluded.is_empty());
    }

    #[test]
    fn test_skill_of_unseated_personnel_is_not_a_staff_gap() {
        let entities = entities();
        let mut request = request(&entities);
        request.personnel_assignments = Some(vec![PersonnelAssignment {
            vehicle_id: 1,
            personnel_ids: vec![6],
        }]);
        let model = ModelBuilder::build(&request, &entities).unwrap();

        assert!(model.skill_pool.contains(&WOUND_CARE));
        assert!(!model.seated_skills.contains(&WOUND_CARE));
        assert_eq!(model.excluded, vec![10, 11]);

        let violation = model.violations.iter().find(|v| v.case_id() == Some(10)).unwrap();
        assert_eq!(violation.violation_type, ViolationType::SkillMismatch);
        assert!(violation.description.contains("without a vehicle seat"));
        assert_eq!(violation.details["unseated_skills"][0], "wound_care");
    }

    #[test]
    fn test_explicit_roster_intersects_working_hours() {
        let entities = entities();
        let mut request = request(&entities);
        request.personnel_assignments = Some(vec![PersonnelAssignment {
            vehicle_id: 1,
            personnel_ids: vec![5, 6],
        }]);
        let model = ModelBuilder::build(&request, &entities).unwrap();

        assert_eq!(model.teams.len(), 1, "Vehicle 2 has no personnel");
        assert_eq!(model.teams[0].working_hours, TimeWindow::hm((9, 0), (15, 0)));
        assert!(model
            .violations
            .iter()
            .any(|v| v.entity.map(|e| e.id) == Some(2)));
    }

    #[test]
    fn test_window_outside_working_hours_is_infeasible() {
        let mut entities = entities();
        entities.cases[0].time_window = Some(TimeWindow::hm((6, 0), (7, 0)));
        let model = ModelBuilder::build(&request(&entities), &entities).unwrap();

        assert!(model.excluded.contains(&10));
        let violation = model.violations.iter().find(|v| v.case_id() == Some(10)).unwrap();
        assert_eq!(violation.violation_type, ViolationType::Infeasible);
    }

    #[test]
    fn test_malformed_time_window_is_rejected() {
        let mut entities = entities();
        entities.cases[0].time_window = Some(TimeWindow::new(600, 540));
        let err = ModelBuilder::build(&request(&entities), &entities).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MalformedTimeWindow { case_id: 10, start: 600, end: 540 }
        );
    }

    #[test]
    fn test_malformed_working_hours_are_rejected() {
        let mut entities = entities();
        entities.personnel[1].working_hours = TimeWindow::new(900, 900);
        assert!(matches!(
            ModelBuilder::build(&request(&entities), &entities),
            Err(ValidationError::MalformedWorkingHours { personnel_id: 6, .. })
        ));
    }

    #[test]
    fn test_team_larger_than_capacity_is_rejected() {
        let mut entities = entities();
        entities.vehicles[0].capacity = 1;
        let mut request = request(&entities);
        request.personnel_assignments = Some(vec![PersonnelAssignment {
            vehicle_id: 1,
            personnel_ids: vec![5, 6],
        }]);
        assert_eq!(
            ModelBuilder::build(&request, &entities).unwrap_err(),
            ValidationError::TeamExceedsCapacity { vehicle_id: 1, team_size: 2, capacity: 1 }
        );
    }

    #[test]
    fn test_unavailable_vehicle_is_excluded() {
        let mut entities = entities();
        entities.vehicles[1].status = VehicleStatus::Maintenance;
        let model = ModelBuilder::build(&request(&entities), &entities).unwrap();

        assert_eq!(model.teams.len(), 1);
        assert_eq!(model.teams[0].personnel_ids, vec![5, 6]);
    }

    #[test]
    fn test_cancelled_case_is_not_planned() {
        let mut entities = entities();
        entities.cases[0].status = CaseStatus::Cancelled;
        let model = ModelBuilder::build(&request(&entities), &entities).unwrap();

        assert!(model.jobs.is_empty());
        assert!(model.excluded.contains(&10));
    }
}
