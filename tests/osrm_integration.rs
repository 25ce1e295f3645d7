//! OSRM integration test.
//!
//! Needs docker and a dataset already prepared for the MLD pipeline
//! (`osrm-extract`, `osrm-partition`, `osrm-customize`) in `OSRM_DATA_DIR`,
//! named by `OSRM_DATASET` (default `madrid-latest.osrm`). Run with
//! `cargo test -- --ignored`.

mod fixtures;

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use testcontainers::core::{IntoContainerPort, Mount};
use testcontainers::runners::SyncRunner;
use testcontainers::{Container, GenericImage, ImageExt, ReuseDirective, TestcontainersError};

use care_route_optimizer::model::{GeoPoint, ViolationType};
use care_route_optimizer::osrm::{OsrmClient, OsrmConfig};
use care_route_optimizer::{DistanceProvider, OptimizerConfig, TravelCost};

use fixtures::*;

fn osrm_container() -> Result<(Container<GenericImage>, String), TestcontainersError> {
    let data_dir = PathBuf::from(env::var("OSRM_DATA_DIR").unwrap_or_else(|_| "osrm-data".to_string()));
    let dataset = env::var("OSRM_DATASET").unwrap_or_else(|_| "madrid-latest.osrm".to_string());
    let data_dir = data_dir
        .canonicalize()
        .map_err(|err| TestcontainersError::other(format!("OSRM data dir: {}", err)))?;

    let image = GenericImage::new("osrm/osrm-backend", "latest")
        .with_exposed_port(5000.tcp())
        .with_mount(Mount::bind_mount(data_dir.to_string_lossy().to_string(), "/data"))
        .with_cmd(vec![
            "osrm-routed".to_string(),
            "--algorithm".to_string(),
            "mld".to_string(),
            format!("/data/{}", dataset),
        ])
        .with_container_name("care-route-osrm")
        .with_startup_timeout(Duration::from_secs(30))
        .with_reuse(ReuseDirective::Always);

    let container = image.start()?;
    let port = container.get_host_port_ipv4(5000.tcp())?;
    Ok((container, format!("http://127.0.0.1:{}", port)))
}

fn client(base_url: &str) -> OsrmClient {
    OsrmClient::new(OsrmConfig {
        base_url: base_url.to_string(),
        profile: "car".to_string(),
        timeout_secs: 10,
    })
    .expect("build OSRM client")
}

/// The server needs a moment after the container starts.
fn wait_for_table(client: &OsrmClient, points: &[GeoPoint]) -> Vec<Vec<Option<TravelCost>>> {
    let started = Instant::now();
    loop {
        match client.table(points, points) {
            Ok(table) => return table,
            Err(err) if started.elapsed() < Duration::from_secs(15) => {
                eprintln!("OSRM not ready yet: {}", err);
                std::thread::sleep(Duration::from_millis(500));
            }
            Err(err) => panic!("OSRM table failed: {}", err),
        }
    }
}

#[test]
#[ignore = "needs docker and a prepared OSRM dataset"]
fn osrm_table_returns_matrix() {
    let (container, base_url) = osrm_container().expect("start OSRM container");
    let points: Vec<GeoPoint> = HOMES
        .iter()
        .take(3)
        .map(|home| GeoPoint::new(home.lat, home.lng))
        .collect();

    let table = wait_for_table(&client(&base_url), &points);

    assert_eq!(table.len(), points.len());
    for (i, row) in table.iter().enumerate() {
        assert_eq!(row.len(), points.len());
        for (j, cell) in row.iter().enumerate() {
            let cost = cell.expect("routable pair");
            if i != j {
                assert!(cost.distance_km > 0.0 && cost.duration_minutes > 0.0);
            }
        }
    }

    drop(container);
}

#[test]
#[ignore = "needs docker and a prepared OSRM dataset"]
fn optimize_with_osrm_distances() {
    let (container, base_url) = osrm_container().expect("start OSRM container");
    let osrm = client(&base_url);
    let warmup: Vec<GeoPoint> = HOSPITALS.iter().map(|h| GeoPoint::new(h.lat, h.lng)).collect();
    wait_for_table(&osrm, &warmup);

    let mut scenario = Scenario::new()
        .nurse(TestNurse::new(1))
        .vehicle(TestVehicle::new(1).base(&HOSPITALS[1]));
    for (i, home) in HOMES.iter().take(5).enumerate() {
        scenario = scenario.case(TestCase::new(i as u64 + 1).at(home));
    }

    let result = scenario
        .service(OptimizerConfig::default(), Arc::new(osrm))
        .optimize(&scenario.request())
        .unwrap();

    assert!(result.success, "{}", result.message);
    assert_eq!(result.routes[0].visits.len(), 5);
    assert_eq!(result.violations_of(ViolationType::ProviderDegraded).count(), 0);

    drop(container);
}
