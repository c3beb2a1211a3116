#![allow(dead_code)]

use std::{
    fmt::Write as _,
    fs,
    path::PathBuf,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use sensor_routes::{
    config::DataConfig,
    graphs::SensorId,
    predictions::{
        time_grid::{format_time, interval_to_time, INTERVALS_PER_DAY},
        CongestionScale, PredictionStore,
    },
    route_service::RouteService,
};

pub const DATE: &str = "oct1_2017";

/// `(id, lat, lon)`. 51 -> 61 -> 64 is the short corridor, 51 -> 62 -> 63 -> 64
/// the detour; 90 is isolated.
pub const SENSORS: [(SensorId, f64, f64); 6] = [
    (51, 25.040, 121.500),
    (61, 25.040, 121.510),
    (64, 25.040, 121.520),
    (62, 25.045, 121.505),
    (63, 25.045, 121.515),
    (90, 25.100, 121.600),
];

const LINKS: [(SensorId, SensorId, f64); 6] = [
    (51, 61, 0.1),
    (61, 64, 0.1),
    (51, 62, 0.15),
    (62, 63, 0.15),
    (63, 64, 0.15),
    (51, 64, 0.005),
];

static FIXTURE_COUNTER: AtomicUsize = AtomicUsize::new(0);

pub fn fixture_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "sensor_routes_{}_{}",
        std::process::id(),
        FIXTURE_COUNTER.fetch_add(1, Ordering::SeqCst)
    ));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// Free flow at night, sensor 61 congested in the 09:00 bucket.
pub fn xgboost(sensor: SensorId, interval: u32) -> Option<f64> {
    if interval < 120 {
        return Some(5.0 + (sensor % 7) as f64);
    }
    match sensor {
        61 if (180..190).contains(&interval) => Some(53.5),
        61 => Some(30.0),
        _ => Some(15.0),
    }
}

/// Sensor 61 severe all day; sensor 63 has no records in the 09:00 bucket.
pub fn catboost(sensor: SensorId, interval: u32) -> Option<f64> {
    match sensor {
        61 if (120..420).contains(&interval) => Some(150.0),
        61 => Some(10.0),
        63 if (180..190).contains(&interval) => None,
        _ => Some(20.0),
    }
}

/// Sensor 64 missing entirely.
pub fn sparse(sensor: SensorId, _interval: u32) -> Option<f64> {
    (sensor != 64).then_some(12.0)
}

pub fn write_predictions(
    dir: &std::path::Path,
    model: &str,
    values: impl Fn(SensorId, u32) -> Option<f64>,
) {
    let mut csv = String::from("detid,date,interval,time,traffic_predict\n");
    for (sensor, _, _) in SENSORS {
        for interval in 0..INTERVALS_PER_DAY {
            if let Some(value) = values(sensor, interval) {
                writeln!(
                    csv,
                    "{},2017-10-01,{},{},{}",
                    sensor,
                    interval / 60,
                    format_time(interval_to_time(interval)),
                    value
                )
                .unwrap();
            }
        }
    }
    fs::write(dir.join(format!("predictions_{}_{}.csv", DATE, model)), csv).unwrap();
}

pub fn write_network(dir: &std::path::Path) {
    let mut detectors = String::from("detid,long,lat,road,length,lanes,fclass\n");
    for (sensor, lat, lon) in SENSORS {
        writeln!(detectors, "{}.00,{},{},Road {},100.0,2,primary", sensor, lon, lat, sensor).unwrap();
    }
    fs::write(dir.join("taipeh_detectors.csv"), detectors).unwrap();

    let weight = |from: SensorId, to: SensorId| {
        if from == to {
            return 1.0;
        }
        LINKS
            .iter()
            .find(|&&(a, b, _)| (a, b) == (from, to) || (a, b) == (to, from))
            .map_or(0.0, |&(_, _, weight)| weight)
    };

    let mut matrix = String::from("detid_Y");
    for (sensor, _, _) in SENSORS {
        write!(matrix, ",{}.00", sensor).unwrap();
    }
    matrix.push('\n');
    for (tail, _, _) in SENSORS {
        write!(matrix, "{}.00", tail).unwrap();
        for (head, _, _) in SENSORS {
            write!(matrix, ",{}", weight(tail, head)).unwrap();
        }
        matrix.push('\n');
    }
    fs::write(dir.join("taipeh_adjacency_matrix_transposed_normalized.csv"), matrix).unwrap();
}

/// A data directory with the network and the xgboost, catboost and sparse tables.
pub fn fixture() -> PathBuf {
    let dir = fixture_dir();
    write_network(&dir);
    write_predictions(&dir, "xgboost", xgboost);
    write_predictions(&dir, "catboost", catboost);
    write_predictions(&dir, "sparse", sparse);
    dir
}

pub fn service(dir: &std::path::Path) -> RouteService {
    RouteService::from_config(&DataConfig::new(dir)).unwrap()
}

pub fn store(dir: &std::path::Path) -> Arc<PredictionStore> {
    Arc::new(PredictionStore::new(dir, CongestionScale::Canonical))
}

pub fn coordinate(sensor: SensorId) -> (f64, f64) {
    SENSORS
        .iter()
        .find(|&&(id, _, _)| id == sensor)
        .map(|&(_, lat, lon)| (lat, lon))
        .unwrap()
}
