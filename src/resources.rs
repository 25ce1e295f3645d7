//! In-memory resource manager and the JSON problem file the CLI reads.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::ResourceError;
use crate::model::{
    Case, CareType, CaseId, OptimizationRequest, Personnel, Skill, Vehicle, VehicleId,
};
use crate::traits::ResourceManager;

/// Resource manager backed by plain maps.
#[derive(Debug, Clone, Default)]
pub struct InMemoryResources {
    cases: BTreeMap<CaseId, Case>,
    vehicles: BTreeMap<VehicleId, Vehicle>,
    personnel: Vec<Personnel>,
    care_types: Vec<CareType>,
    skills: Vec<Skill>,
}

impl InMemoryResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_case(mut self, case: Case) -> Self {
        self.cases.insert(case.id, case);
        self
    }

    pub fn with_cases(mut self, cases: impl IntoIterator<Item = Case>) -> Self {
        self.cases.extend(cases.into_iter().map(|case| (case.id, case)));
        self
    }

    pub fn with_vehicle(mut self, vehicle: Vehicle) -> Self {
        self.vehicles.insert(vehicle.id, vehicle);
        self
    }

    pub fn with_vehicles(mut self, vehicles: impl IntoIterator<Item = Vehicle>) -> Self {
        self.vehicles
            .extend(vehicles.into_iter().map(|vehicle| (vehicle.id, vehicle)));
        self
    }

    pub fn with_personnel(mut self, personnel: impl IntoIterator<Item = Personnel>) -> Self {
        self.personnel.extend(personnel);
        self
    }

    pub fn with_care_types(mut self, care_types: impl IntoIterator<Item = CareType>) -> Self {
        self.care_types.extend(care_types);
        self
    }

    pub fn with_skills(mut self, skills: impl IntoIterator<Item = Skill>) -> Self {
        self.skills.extend(skills);
        self
    }
}

impl ResourceManager for InMemoryResources {
    fn cases(&self, ids: &[CaseId]) -> Result<Vec<Case>, ResourceError> {
        ids.iter()
            .map(|id| {
                self.cases
                    .get(id)
                    .cloned()
                    .ok_or(ResourceError::NotFound { kind: "case", id: *id })
            })
            .collect()
    }

    fn vehicles(&self, ids: &[VehicleId]) -> Result<Vec<Vehicle>, ResourceError> {
        ids.iter()
            .map(|id| {
                self.vehicles
                    .get(id)
                    .cloned()
                    .ok_or(ResourceError::NotFound { kind: "vehicle", id: *id })
            })
            .collect()
    }

    fn personnel(&self) -> Result<Vec<Personnel>, ResourceError> {
        Ok(self.personnel.clone())
    }

    fn care_types(&self) -> Result<Vec<CareType>, ResourceError> {
        Ok(self.care_types.clone())
    }

    fn skills(&self) -> Result<Vec<Skill>, ResourceError> {
        Ok(self.skills.clone())
    }
}

/// Entities plus one request, as read from a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemFile {
    #[serde(default)]
    pub skills: Vec<Skill>,
    pub care_types: Vec<CareType>,
    pub personnel: Vec<Personnel>,
    pub vehicles: Vec<Vehicle>,
    pub cases: Vec<Case>,
    pub request: OptimizationRequest,
}

impl ProblemFile {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let problem = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(problem)
    }

    /// Splits the file into a resource manager and the request.
    pub fn into_parts(self) -> (InMemoryResources, OptimizationRequest) {
        let resources = InMemoryResources::new()
            .with_skills(self.skills)
            .with_care_types(self.care_types)
            .with_personnel(self.personnel)
            .with_vehicles(self.vehicles)
            .with_cases(self.cases);
        (resources, self.request)
    }
}
