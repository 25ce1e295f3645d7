//! Distance matrix construction for one planning run.
//!
//! Points are deduplicated, cached cells are reused, the remaining source
//! rows are requested from the provider in batches with bounded parallelism,
//! and any cell the provider cannot answer degrades to a haversine estimate.
//!
//! With a time limit set, provider calls run on a detached thread and the
//! build stops waiting once the limit passes; batches still in flight are
//! estimated, and their late answers are dropped.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde_json::json;
use tracing::{debug, warn};

use crate::cache::PairKey;
use crate::config::OptimizerConfig;
use crate::error::ProviderError;
use crate::haversine::HaversineProvider;
use crate::model::{ConstraintViolation, GeoPoint, ViolationType};
use crate::traits::{DistanceProvider, MatrixCache, TravelCost};

/// Square travel-cost matrix over deduplicated points.
#[derive(Debug, Clone, PartialEq)]
pub struct TravelMatrix {
    points: Vec<GeoPoint>,
    index: HashMap<String, usize>,
    cells: Vec<TravelCost>,
}

impl TravelMatrix {
    fn new(points: Vec<GeoPoint>, cells: Vec<TravelCost>) -> Self {
        let index = location_index(&points);
        Self { points, index, cells }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    pub fn index_of(&self, point: GeoPoint) -> Option<usize> {
        self.index.get(&location_key(point)).copied()
    }

    pub fn cost(&self, from: usize, to: usize) -> TravelCost {
        self.cells[from * self.points.len() + to]
    }
}

/// Outcome of a matrix build, including provenance counts.
#[derive(Debug, Clone)]
pub struct MatrixBuild {
    pub matrix: TravelMatrix,
    pub cached_cells: usize,
    pub provider_cells: usize,
    pub fallback_cells: usize,
    /// Provider degradation warnings, at most one per build.
    pub warnings: Vec<ConstraintViolation>,
}

type RowBatch = (Vec<usize>, Result<Vec<Vec<Option<TravelCost>>>, ProviderError>);

pub struct DistanceMatrixBuilder<'a> {
    provider: Arc<dyn DistanceProvider>,
    cache: &'a dyn MatrixCache,
    fallback: HaversineProvider,
    batch_size: usize,
    parallelism: usize,
    precision: u32,
    time_limit: Option<Duration>,
}

impl<'a> DistanceMatrixBuilder<'a> {
    pub fn new(
        provider: Arc<dyn DistanceProvider>,
        cache: &'a dyn MatrixCache,
        config: &OptimizerConfig,
    ) -> Self {
        Self {
            provider,
            cache,
            fallback: HaversineProvider::new(config.average_speed_kmh, config.road_coefficient),
            batch_size: config.provider_batch_size.max(1),
            parallelism: config.provider_parallelism.max(1),
            precision: config.coordinate_precision,
            time_limit: None,
        }
    }

    /// Caps the wall-clock time spent waiting on the provider.
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    pub fn build(&self, points: &[GeoPoint]) -> MatrixBuild {
        let unique = dedupe_points(points);
        let n = unique.len();
        let mut cells: Vec<Option<TravelCost>> = vec![None; n * n];
        let mut cached_cells = 0;

        for i in 0..n {
            for j in 0..n {
                if i == j {
                    cells[i * n + j] = Some(TravelCost::ZERO);
                } else if let Some(cost) = self.cache.get(&self.key(&unique, i, j)) {
                    cells[i * n + j] = Some(cost);
                    cached_cells += 1;
                }
            }
        }

        let missing_rows: Vec<usize> = (0..n)
            .filter(|i| (0..n).any(|j| cells[i * n + j].is_none()))
            .collect();

        let mut provider_cells = 0;
        let mut errors = Vec::new();

        if !missing_rows.is_empty() {
            let (responses, cut_short) = self.request_rows(&unique, &missing_rows);
            if let Some(reason) = cut_short {
                warn!(provider = self.provider.name(), reason = %reason, "stopped waiting for distance provider");
                errors.push(reason);
            }
            for (rows, response) in responses {
                match response {
                    Ok(table) => {
                        for (row, &i) in table.into_iter().zip(rows.iter()) {
                            for (j, cell) in row.into_iter().enumerate().take(n) {
                                let slot = &mut cells[i * n + j];
                                if slot.is_some() {
                                    continue;
                                }
                                if let Some(cost) = cell.filter(TravelCost::is_valid) {
                                    *slot = Some(cost);
                                    self.cache.put(self.key(&unique, i, j), cost);
                                    provider_cells += 1;
                                }
                            }
                        }
                    }
                    Err(err) => {
                        warn!(provider = self.provider.name(), rows = rows.len(), error = %err, "distance provider batch failed");
                        errors.push(err.to_string());
                    }
                }
            }
        }

        let mut fallback_cells = 0;
        let cells: Vec<TravelCost> = cells
            .into_iter()
            .enumerate()
            .map(|(k, cell)| {
                cell.unwrap_or_else(|| {
                    fallback_cells += 1;
                    self.fallback.estimate(unique[k / n], unique[k % n])
                })
            })
            .collect();

        let mut warnings = Vec::new();
        if fallback_cells > 0 {
            warn!(
                provider = self.provider.name(),
                fallback_cells,
                "distance provider degraded, using haversine estimates"
            );
            warnings.push(
                ConstraintViolation::warning(
                    ViolationType::ProviderDegraded,
                    format!(
                        "distance provider '{}' could not answer {} of {} cells; haversine estimates used",
                        self.provider.name(),
                        fallback_cells,
                        n * n.saturating_sub(1)
                    ),
                )
                .with_details(json!({
                    "provider": self.provider.name(),
                    "fallback_cells": fallback_cells,
                    "total_cells": n * n.saturating_sub(1),
                    "errors": errors,
                })),
            );
        }

        debug!(points = n, cached_cells, provider_cells, fallback_cells, "distance matrix built");

        MatrixBuild {
            matrix: TravelMatrix::new(unique, cells),
            cached_cells,
            provider_cells,
            fallback_cells,
            warnings,
        }
    }

    fn key(&self, points: &[GeoPoint], from: usize, to: usize) -> PairKey {
        PairKey::new(points[from], points[to], self.precision)
    }

    /// Requests the given source rows against all points, batch by batch.
    /// Also returns why the wait was cut short, if it was.
    fn request_rows(&self, points: &[GeoPoint], rows: &[usize]) -> (Vec<RowBatch>, Option<String>) {
        let batches: Vec<Vec<usize>> = rows.chunks(self.batch_size).map(|c| c.to_vec()).collect();
        let expected = batches.len();
        let (tx, rx) = mpsc::channel();

        let Some(limit) = self.time_limit else {
            fetch_batches(self.provider.as_ref(), points, &batches, self.parallelism, &tx);
            drop(tx);
            return (rx.try_iter().collect(), None);
        };

        let provider = Arc::clone(&self.provider);
        let owned_points = points.to_vec();
        let parallelism = self.parallelism;
        let spawned = thread::Builder::new()
            .name("distance-provider".to_string())
            .spawn(move || fetch_batches(provider.as_ref(), &owned_points, &batches, parallelism, &tx));
        if let Err(err) = spawned {
            return (Vec::new(), Some(format!("could not spawn provider thread: {}", err)));
        }

        let give_up = Instant::now() + limit;
        let mut received = Vec::with_capacity(expected);
        while received.len() < expected {
            match rx.recv_timeout(give_up.saturating_duration_since(Instant::now())) {
                Ok(batch) => received.push(batch),
                Err(RecvTimeoutError::Timeout) => {
                    let reason = format!("time limit of {}ms exceeded", limit.as_millis());
                    return (received, Some(reason));
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        (received, None)
    }
}

fn fetch_batches(
    provider: &dyn DistanceProvider,
    points: &[GeoPoint],
    batches: &[Vec<usize>],
    parallelism: usize,
    sink: &Sender<RowBatch>,
) {
    let request = |batch: &Vec<usize>| {
        let sources: Vec<GeoPoint> = batch.iter().map(|&i| points[i]).collect();
        let response = provider.table(&sources, points).and_then(|table| {
            if table.len() == sources.len() {
                Ok(table)
            } else {
                Err(ProviderError::Shape(format!(
                    "expected {} rows, got {}",
                    sources.len(),
                    table.len()
                )))
            }
        });
        // The receiver is gone once the build stopped waiting.
        let _ = sink.send((batch.clone(), response));
    };

    if batches.len() == 1 || parallelism == 1 {
        batches.iter().for_each(request);
        return;
    }

    match rayon::ThreadPoolBuilder::new().num_threads(parallelism).build() {
        Ok(pool) => pool.install(|| batches.par_iter().for_each(request)),
        Err(err) => {
            warn!(error = %err, "could not build provider pool, requesting sequentially");
            batches.iter().for_each(request);
        }
    }
}

pub fn dedupe_points(points: &[GeoPoint]) -> Vec<GeoPoint> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut unique = Vec::new();
    for point in points {
        let key = location_key(*point);
        if seen.contains_key(&key) {
            continue;
        }
        seen.insert(key, unique.len());
        unique.push(*point);
    }
    unique
}

fn location_key(point: GeoPoint) -> String {
    format!("{:.6},{:.6}", point.lat, point.lng)
}

fn location_index(points: &[GeoPoint]) -> HashMap<String, usize> {
    let mut index = HashMap::new();
    for (i, point) in points.iter().enumerate() {
        index.insert(location_key(*point), i);
    }
    index
}
