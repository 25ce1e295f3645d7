//! Optimizer configuration.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::osrm::OsrmConfig;

/// How explicit case time windows are enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeWindowMode {
    /// Late arrival makes the assignment infeasible.
    #[default]
    Hard,
    /// Late arrival is allowed and reported as a warning.
    Soft,
}

impl FromStr for TimeWindowMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hard" => Ok(TimeWindowMode::Hard),
            "soft" => Ok(TimeWindowMode::Soft),
            other => Err(other.to_string()),
        }
    }
}

/// Meaning of `Vehicle::capacity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityMode {
    /// Capacity bounds the cases served at the same time (and the team size).
    /// Visits are sequential, so it never limits the number of daily visits.
    #[default]
    ConcurrentCases,
    /// Capacity is the maximum number of visits on a route.
    DailyVisits,
}

impl FromStr for CapacityMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "concurrent_cases" => Ok(CapacityMode::ConcurrentCases),
            "daily_visits" => Ok(CapacityMode::DailyVisits),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Objective weight per travelled kilometer.
    pub distance_weight: f64,
    /// Objective weight per travelled minute.
    pub time_weight: f64,
    /// Haversine fallback speed.
    pub average_speed_kmh: f64,
    /// Haversine fallback straight-line to road multiplier.
    pub road_coefficient: f64,
    pub default_time_budget_secs: u32,
    pub min_time_budget_secs: u32,
    pub max_time_budget_secs: u32,
    /// Share of the budget given to the primary strategy before falling back.
    pub fallback_share: f64,
    /// Share of the budget the distance provider may take before the
    /// remaining cells are estimated.
    pub matrix_budget_share: f64,
    pub time_window_mode: TimeWindowMode,
    pub capacity_mode: CapacityMode,
    /// Upper bound on heuristic improvement passes.
    pub local_search_iterations: usize,
    pub cache_ttl_secs: u64,
    /// Decimals kept when keying cached cells.
    pub coordinate_precision: u32,
    /// Source rows per provider call.
    pub provider_batch_size: usize,
    /// Concurrent provider calls.
    pub provider_parallelism: usize,
    pub osrm_url: Option<String>,
    pub osrm_profile: String,
    pub osrm_timeout_secs: u64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            distance_weight: 1.0,
            time_weight: 1.0,
            average_speed_kmh: 40.0,
            road_coefficient: 1.0,
            default_time_budget_secs: 30,
            min_time_budget_secs: 10,
            max_time_budget_secs: 300,
            fallback_share: 0.85,
            matrix_budget_share: 0.5,
            time_window_mode: TimeWindowMode::Hard,
            capacity_mode: CapacityMode::ConcurrentCases,
            local_search_iterations: 200,
            cache_ttl_secs: 24 * 3600,
            coordinate_precision: 5,
            provider_batch_size: 25,
            provider_parallelism: 4,
            osrm_url: None,
            osrm_profile: "car".to_string(),
            osrm_timeout_secs: 10,
        }
    }
}

impl OptimizerConfig {
    /// Load configuration from environment variables, reading `.env` if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup over defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        override_with(&lookup, "OPTIMIZER_DISTANCE_WEIGHT", &mut config.distance_weight)?;
        override_with(&lookup, "OPTIMIZER_TIME_WEIGHT", &mut config.time_weight)?;
        override_with(&lookup, "OPTIMIZER_AVERAGE_SPEED_KMH", &mut config.average_speed_kmh)?;
        override_with(&lookup, "OPTIMIZER_ROAD_COEFFICIENT", &mut config.road_coefficient)?;
        override_with(&lookup, "OPTIMIZER_DEFAULT_TIME_BUDGET_SECS", &mut config.default_time_budget_secs)?;
        override_with(&lookup, "OPTIMIZER_MIN_TIME_BUDGET_SECS", &mut config.min_time_budget_secs)?;
        override_with(&lookup, "OPTIMIZER_MAX_TIME_BUDGET_SECS", &mut config.max_time_budget_secs)?;
        override_with(&lookup, "OPTIMIZER_FALLBACK_SHARE", &mut config.fallback_share)?;
        override_with(&lookup, "OPTIMIZER_MATRIX_BUDGET_SHARE", &mut config.matrix_budget_share)?;
        override_with(&lookup, "OPTIMIZER_TIME_WINDOW_MODE", &mut config.time_window_mode)?;
        override_with(&lookup, "OPTIMIZER_CAPACITY_MODE", &mut config.capacity_mode)?;
        override_with(&lookup, "OPTIMIZER_LOCAL_SEARCH_ITERATIONS", &mut config.local_search_iterations)?;
        override_with(&lookup, "OPTIMIZER_CACHE_TTL_SECS", &mut config.cache_ttl_secs)?;
        override_with(&lookup, "OPTIMIZER_COORDINATE_PRECISION", &mut config.coordinate_precision)?;
        override_with(&lookup, "OPTIMIZER_PROVIDER_BATCH_SIZE", &mut config.provider_batch_size)?;
        override_with(&lookup, "OPTIMIZER_PROVIDER_PARALLELISM", &mut config.provider_parallelism)?;
        override_with(&lookup, "OSRM_PROFILE", &mut config.osrm_profile)?;
        override_with(&lookup, "OSRM_TIMEOUT_SECS", &mut config.osrm_timeout_secs)?;
        config.osrm_url = lookup("OSRM_URL").filter(|url| !url.trim().is_empty());

        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<(), ConfigError> {
        if !(self.fallback_share > 0.0 && self.fallback_share <= 1.0) {
            return Err(invalid("OPTIMIZER_FALLBACK_SHARE", self.fallback_share));
        }
        if !(self.matrix_budget_share > 0.0 && self.matrix_budget_share <= 1.0) {
            return Err(invalid("OPTIMIZER_MATRIX_BUDGET_SHARE", self.matrix_budget_share));
        }
        if !(self.average_speed_kmh.is_finite() && self.average_speed_kmh > 0.0) {
            return Err(invalid("OPTIMIZER_AVERAGE_SPEED_KMH", self.average_speed_kmh));
        }
        if !(self.road_coefficient.is_finite() && self.road_coefficient > 0.0) {
            return Err(invalid("OPTIMIZER_ROAD_COEFFICIENT", self.road_coefficient));
        }
        if !(self.distance_weight.is_finite() && self.distance_weight >= 0.0) {
            return Err(invalid("OPTIMIZER_DISTANCE_WEIGHT", self.distance_weight));
        }
        if !(self.time_weight.is_finite() && self.time_weight >= 0.0) {
            return Err(invalid("OPTIMIZER_TIME_WEIGHT", self.time_weight));
        }
        if self.min_time_budget_secs == 0 || self.min_time_budget_secs > self.max_time_budget_secs {
            return Err(invalid("OPTIMIZER_MIN_TIME_BUDGET_SECS", self.min_time_budget_secs));
        }
        if self.provider_batch_size == 0 {
            return Err(invalid("OPTIMIZER_PROVIDER_BATCH_SIZE", self.provider_batch_size));
        }
        if self.provider_parallelism == 0 {
            return Err(invalid("OPTIMIZER_PROVIDER_PARALLELISM", self.provider_parallelism));
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Routing service settings, when one is configured.
    pub fn osrm(&self) -> Option<OsrmConfig> {
        self.osrm_url.as_ref().map(|url| OsrmConfig {
            base_url: url.clone(),
            profile: self.osrm_profile.clone(),
            timeout_secs: self.osrm_timeout_secs,
        })
    }
}

fn override_with<F, T>(lookup: &F, key: &str, target: &mut T) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(key) {
        *target = raw
            .trim()
            .parse()
            .map_err(|_| invalid(key, &raw))?;
    }
    Ok(())
}

fn invalid(key: &str, value: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}
