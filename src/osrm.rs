//! OSRM HTTP adapter for distance tables.

use serde::Deserialize;
use tracing::debug;

use crate::error::ProviderError;
use crate::model::GeoPoint;
use crate::traits::{DistanceProvider, TravelCost};

#[derive(Debug, Clone)]
pub struct OsrmConfig {
    pub base_url: String,
    pub profile: String,
    pub timeout_secs: u64,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            profile: "car".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OsrmClient {
    config: OsrmConfig,
    client: reqwest::blocking::Client,
}

impl OsrmClient {
    pub fn new(config: OsrmConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    /// Table URL with sources listed first, then destinations.
    fn table_url(&self, sources: &[GeoPoint], destinations: &[GeoPoint]) -> String {
        let coords = sources
            .iter()
            .chain(destinations.iter())
            .map(|point| format!("{:.6},{:.6}", point.lng, point.lat))
            .collect::<Vec<_>>()
            .join(";");

        let source_idx = index_list(0, sources.len());
        let destination_idx = index_list(sources.len(), destinations.len());

        format!(
            "{}/table/v1/{}/{}?sources={}&destinations={}&annotations=duration,distance",
            self.config.base_url.trim_end_matches('/'),
            self.config.profile,
            coords,
            source_idx,
            destination_idx
        )
    }
}

fn index_list(offset: usize, len: usize) -> String {
    (offset..offset + len)
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(";")
}

impl DistanceProvider for OsrmClient {
    fn name(&self) -> &str {
        "osrm"
    }

    fn table(
        &self,
        sources: &[GeoPoint],
        destinations: &[GeoPoint],
    ) -> Result<Vec<Vec<Option<TravelCost>>>, ProviderError> {
        if sources.is_empty() || destinations.is_empty() {
            return Ok(vec![Vec::new(); sources.len()]);
        }

        let url = self.table_url(sources, destinations);
        debug!(
            sources = sources.len(),
            destinations = destinations.len(),
            "requesting OSRM table"
        );

        let body = self
            .client
            .get(url)
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<OsrmTableResponse>())?;

        body.into_table(sources.len(), destinations.len())
    }
}

#[derive(Debug, Deserialize)]
struct OsrmTableResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    durations: Option<Vec<Vec<Option<f64>>>>,
    distances: Option<Vec<Vec<Option<f64>>>>,
}

impl OsrmTableResponse {
    /// Converts seconds/meters into minutes/kilometers, checking the shape.
    fn into_table(
        self,
        rows: usize,
        cols: usize,
    ) -> Result<Vec<Vec<Option<TravelCost>>>, ProviderError> {
        if self.code != "Ok" {
            return Err(ProviderError::Rejected(
                self.message.unwrap_or(self.code),
            ));
        }

        let durations = self
            .durations
            .ok_or_else(|| ProviderError::Shape("missing durations".to_string()))?;
        let distances = self
            .distances
            .ok_or_else(|| ProviderError::Shape("missing distances".to_string()))?;

        if durations.len() != rows || distances.len() != rows {
            return Err(ProviderError::Shape(format!(
                "expected {} rows, got {} durations and {} distances",
                rows,
                durations.len(),
                distances.len()
            )));
        }

        durations
            .into_iter()
            .zip(distances)
            .map(|(duration_row, distance_row)| {
                if duration_row.len() != cols || distance_row.len() != cols {
                    return Err(ProviderError::Shape(format!(
                        "expected {} columns per row",
                        cols
                    )));
                }
                Ok(duration_row
                    .into_iter()
                    .zip(distance_row)
                    .map(|cell| match cell {
                        (Some(seconds), Some(meters)) => {
                            Some(TravelCost::new(meters / 1000.0, seconds / 60.0))
                        }
                        _ => None,
                    })
                    .collect())
            })
            .collect()
    }
}
