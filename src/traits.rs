//! Interfaces to the optimizer's collaborators.
//!
//! The optimizer owns none of its inputs: entities come from a resource
//! manager, travel costs from a distance provider, and cached matrix cells
//! from an injectable cache.

use serde::{Deserialize, Serialize};

use crate::cache::PairKey;
use crate::error::{ProviderError, ResourceError};
use crate::model::{Case, CaseId, CareType, GeoPoint, Personnel, Skill, Vehicle, VehicleId};

/// Travel distance and duration between two points.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TravelCost {
    pub distance_km: f64,
    pub duration_minutes: f64,
}

impl TravelCost {
    pub const ZERO: TravelCost = TravelCost {
        distance_km: 0.0,
        duration_minutes: 0.0,
    };

    pub fn new(distance_km: f64, duration_minutes: f64) -> Self {
        Self {
            distance_km,
            duration_minutes,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.distance_km.is_finite()
            && self.duration_minutes.is_finite()
            && self.distance_km >= 0.0
            && self.duration_minutes >= 0.0
    }
}

/// Provides travel costs between sets of points.
///
/// The returned table is indexed `[source][destination]`. A `None` cell means
/// the provider has no answer for that pair; the caller degrades that cell
/// only.
pub trait DistanceProvider: Send + Sync {
    /// Provider name for logging and warnings.
    fn name(&self) -> &str;

    fn table(
        &self,
        sources: &[GeoPoint],
        destinations: &[GeoPoint],
    ) -> Result<Vec<Vec<Option<TravelCost>>>, ProviderError>;
}

/// Cache of matrix cells keyed by rounded coordinate pairs.
///
/// Implementations must allow concurrent reads; writes are idempotent and
/// last-writer-wins.
pub trait MatrixCache: Send + Sync {
    fn get(&self, key: &PairKey) -> Option<TravelCost>;

    fn put(&self, key: PairKey, cost: TravelCost);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&self);
}

/// Supplies fully hydrated entities by identifier.
pub trait ResourceManager: Send + Sync {
    /// Cases in the order requested; unknown ids are an error.
    fn cases(&self, ids: &[CaseId]) -> Result<Vec<Case>, ResourceError>;

    /// Vehicles in the order requested; unknown ids are an error.
    fn vehicles(&self, ids: &[VehicleId]) -> Result<Vec<Vehicle>, ResourceError>;

    /// Every personnel record known to the resource manager.
    fn personnel(&self) -> Result<Vec<Personnel>, ResourceError>;

    fn care_types(&self) -> Result<Vec<CareType>, ResourceError>;

    fn skills(&self) -> Result<Vec<Skill>, ResourceError>;
}
