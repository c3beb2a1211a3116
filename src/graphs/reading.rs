//! Readers for the static reference tables.
//!
//! Both readers fail on the first malformed row. A graph built from a partially
//! read table would silently route around missing detectors.

use std::{fs::File, io::Read, path::Path};

use serde::Deserialize;
use tracing::info;

use super::{edge::SensorEdge, sensor::Sensor, SensorId, Weight};
use crate::error::TrafficError;

/// Weights at or below this value are measurement noise, not connections.
pub const MIN_EDGE_WEIGHT: Weight = 0.01;

#[derive(Debug, Deserialize)]
struct SensorRow {
    detid: String,
    long: f64,
    lat: f64,
    #[serde(default)]
    road: Option<String>,
    #[serde(default)]
    length: Option<f64>,
    #[serde(default)]
    lanes: Option<f64>,
    #[serde(default)]
    fclass: Option<String>,
}

fn open(path: &Path) -> Result<File, TrafficError> {
    File::open(path).map_err(|source| TrafficError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Parses ids written either as integers or as floats such as `51.00`.
pub fn parse_sensor_id(value: &str) -> Option<SensorId> {
    let value = value.trim();
    if let Ok(id) = value.parse::<SensorId>() {
        return Some(id);
    }

    let float: f64 = value.parse().ok()?;
    if float.is_finite() && float >= 0.0 && float.fract() == 0.0 && float <= SensorId::MAX as f64
    {
        return Some(float as SensorId);
    }
    None
}

pub fn read_sensors(path: &Path) -> Result<Vec<Sensor>, TrafficError> {
    let sensors = read_sensors_from(open(path)?)?;
    info!("read {} sensors from {}", sensors.len(), path.display());
    Ok(sensors)
}

pub fn read_sensors_from<R: Read>(reader: R) -> Result<Vec<Sensor>, TrafficError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    reader
        .deserialize::<SensorRow>()
        .enumerate()
        .map(|(index, row)| {
            let row = row.map_err(|error| {
                TrafficError::GraphLoad(format!("sensor row {}: {}", index + 1, error))
            })?;
            let id = parse_sensor_id(&row.detid).ok_or_else(|| {
                TrafficError::GraphLoad(format!(
                    "sensor row {}: invalid detector id '{}'",
                    index + 1,
                    row.detid
                ))
            })?;

            let lanes = match row.lanes {
                Some(lanes) if lanes >= 0.0 && lanes.fract() == 0.0 => lanes as u32,
                Some(lanes) => {
                    return Err(TrafficError::GraphLoad(format!(
                        "sensor {}: invalid lane count {}",
                        id, lanes
                    )))
                }
                None => 1,
            };

            let fclass = row.fclass.unwrap_or_default();
            Ok(Sensor {
                id,
                latitude: row.lat,
                longitude: row.long,
                // Older exports have no road column; the OSM class is the best name we have.
                road: row.road.filter(|road| !road.is_empty()).unwrap_or_else(|| fclass.clone()),
                lanes,
                class: fclass,
                length: row.length.unwrap_or(0.0),
            })
        })
        .collect()
}

pub fn read_weight_table(path: &Path) -> Result<Vec<SensorEdge>, TrafficError> {
    let edges = read_weight_table_from(open(path)?)?;
    info!("read {} edges from {}", edges.len(), path.display());
    Ok(edges)
}

/// Reads the square weight matrix: a header of column detector ids and one row
/// per tail detector.
pub fn read_weight_table_from<R: Read>(reader: R) -> Result<Vec<SensorEdge>, TrafficError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let header = reader
        .headers()
        .map_err(|error| TrafficError::GraphLoad(format!("weight table header: {}", error)))?
        .clone();

    let heads = header
        .iter()
        .skip(1)
        .map(|cell| {
            parse_sensor_id(cell).ok_or_else(|| {
                TrafficError::GraphLoad(format!("weight table header: invalid detector id '{}'", cell))
            })
        })
        .collect::<Result<Vec<SensorId>, TrafficError>>()?;

    let mut edges = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record
            .map_err(|error| TrafficError::GraphLoad(format!("weight row {}: {}", index + 1, error)))?;
        if record.iter().all(|cell| cell.is_empty()) {
            continue;
        }

        let tail_cell = record.get(0).unwrap_or_default();
        let tail = parse_sensor_id(tail_cell).ok_or_else(|| {
            TrafficError::GraphLoad(format!(
                "weight row {}: invalid detector id '{}'",
                index + 1,
                tail_cell
            ))
        })?;

        if record.len() != heads.len() + 1 {
            return Err(TrafficError::GraphLoad(format!(
                "weight row for sensor {} has {} weights, expected {}",
                tail,
                record.len().saturating_sub(1),
                heads.len()
            )));
        }

        for (&head, cell) in heads.iter().zip(record.iter().skip(1)) {
            let weight: Weight = cell.parse().map_err(|_| {
                TrafficError::GraphLoad(format!(
                    "weight {} -> {}: cannot parse '{}'",
                    tail, head, cell
                ))
            })?;
            if !(0.0..=1.0).contains(&weight) {
                return Err(TrafficError::GraphLoad(format!(
                    "weight {} -> {} is {}, expected a value in [0, 1]",
                    tail, head, weight
                )));
            }
            if weight > MIN_EDGE_WEIGHT && tail != head {
                edges.push(SensorEdge {
                    from: tail,
                    to: head,
                    weight,
                });
            }
        }
    }

    Ok(edges)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensor_ids_accept_float_notation() {
        assert_eq!(parse_sensor_id("51"), Some(51));
        assert_eq!(parse_sensor_id("51.00"), Some(51));
        assert_eq!(parse_sensor_id(" 907.0 "), Some(907));
        assert_eq!(parse_sensor_id("51.5"), None);
        assert_eq!(parse_sensor_id("-3"), None);
        assert_eq!(parse_sensor_id("detid_Y"), None);
    }

    #[test]
    fn reads_sensor_rows_with_optional_columns() {
        let csv = "detid,long,lat,road,length,lanes,fclass\n\
                   61,121.51,25.04,Zhongxiao Rd,120.5,3,primary\n\
                   62,121.52,25.05,,,,secondary\n";
        let sensors = read_sensors_from(csv.as_bytes()).unwrap();

        assert_eq!(sensors.len(), 2);
        assert_eq!(sensors[0].id, 61);
        assert_eq!(sensors[0].road, "Zhongxiao Rd");
        assert_eq!(sensors[0].lanes, 3);
        assert_eq!(sensors[0].class, "primary");
        assert_eq!(sensors[1].road, "secondary");
        assert_eq!(sensors[1].lanes, 1);
        assert_eq!(sensors[1].length, 0.0);
    }

    #[test]
    fn malformed_sensor_row_fails() {
        let csv = "detid,long,lat\n61,121.51,25.04\n62,not-a-number,25.05\n";
        let error = read_sensors_from(csv.as_bytes()).unwrap_err();
        assert!(matches!(error, TrafficError::GraphLoad(_)));
    }

    #[test]
    fn weight_table_filters_noise_and_self_loops() {
        let csv = "detid_Y,51.00,61.00,62.00\n\
                   51.00,1.0,0.4,0.005\n\
                   61.00,0.4,1.0,0\n\
                   62.00,0,0.3,1.0\n";
        let edges = read_weight_table_from(csv.as_bytes()).unwrap();

        assert_eq!(
            edges,
            vec![
                SensorEdge { from: 51, to: 61, weight: 0.4 },
                SensorEdge { from: 61, to: 51, weight: 0.4 },
                SensorEdge { from: 62, to: 61, weight: 0.3 },
            ]
        );
    }

    #[test]
    fn weight_table_rejects_out_of_range_weight() {
        let csv = "detid_Y,51,61\n51,0,1.5\n61,0.2,0\n";
        let error = read_weight_table_from(csv.as_bytes()).unwrap_err();
        assert!(matches!(error, TrafficError::GraphLoad(_)));
    }

    #[test]
    fn weight_table_rejects_ragged_rows() {
        let csv = "detid_Y,51,61\n51,0,0.5\n61,0.2\n";
        let error = read_weight_table_from(csv.as_bytes()).unwrap_err();
        assert!(matches!(error, TrafficError::GraphLoad(_)));
    }
}
