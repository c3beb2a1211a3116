use serde::{Deserialize, Serialize};

use super::SensorId;
use crate::utility::haversine_distance;

/// A fixed traffic detector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    pub id: SensorId,
    pub latitude: f64,
    pub longitude: f64,
    pub road: String,
    pub lanes: u32,
    pub class: String,
    /// Length of the monitored segment in meters.
    pub length: f64,
}

impl Sensor {
    pub fn new(id: SensorId, latitude: f64, longitude: f64) -> Sensor {
        Sensor {
            id,
            latitude,
            longitude,
            road: String::new(),
            lanes: 1,
            class: String::new(),
            length: 0.0,
        }
    }

    /// `[lon, lat]`, the order map libraries expect.
    pub fn coordinate(&self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }

    pub fn distance_to(&self, latitude: f64, longitude: f64) -> f64 {
        haversine_distance(self.latitude, self.longitude, latitude, longitude)
    }

    pub fn distance_to_sensor(&self, other: &Sensor) -> f64 {
        self.distance_to(other.latitude, other.longitude)
    }
}
