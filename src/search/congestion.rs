use rayon::prelude::*;
use tracing::debug;

use crate::{
    graphs::{sensor_graph::SensorGraph, Graph, Vertex},
    predictions::{CongestionReading, PredictionTable},
};

/// Congestion of every sensor at one interval, indexed by vertex.
///
/// Searches treat it as static: a route is priced as if the whole trip
/// happened at the departure interval.
#[derive(Clone, Debug)]
pub struct CongestionSnapshot {
    model: String,
    date: String,
    interval: u32,
    readings: Vec<Option<CongestionReading>>,
}

impl CongestionSnapshot {
    /// Readings for all sensors of `graph`, using the nearest recorded interval
    /// where `interval` itself has no record.
    pub fn from_table(graph: &SensorGraph, table: &PredictionTable, interval: u32) -> CongestionSnapshot {
        let readings: Vec<Option<CongestionReading>> = graph
            .sensors()
            .par_iter()
            .map(|sensor| table.nearest(sensor.id, interval))
            .collect();

        debug!(
            "congestion snapshot for {} on {} at interval {}: {} of {} sensors priced",
            table.model(),
            table.date(),
            interval,
            readings.iter().flatten().count(),
            readings.len()
        );

        CongestionSnapshot {
            model: table.model().to_string(),
            date: table.date().to_string(),
            interval,
            readings,
        }
    }

    pub fn from_readings(
        model: &str,
        date: &str,
        interval: u32,
        readings: Vec<Option<CongestionReading>>,
    ) -> CongestionSnapshot {
        CongestionSnapshot {
            model: model.to_string(),
            date: date.to_string(),
            interval,
            readings,
        }
    }

    /// Every sensor at the same value.
    pub fn uniform(graph: &SensorGraph, value: f64) -> CongestionSnapshot {
        let reading = CongestionReading {
            value,
            interval: 0,
            fallback: false,
        };
        CongestionSnapshot::from_readings(
            "uniform",
            "",
            0,
            vec![Some(reading); graph.number_of_vertices() as usize],
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn interval(&self) -> u32 {
        self.interval
    }

    pub fn reading(&self, vertex: Vertex) -> Option<CongestionReading> {
        self.readings.get(vertex as usize).copied().flatten()
    }

    pub fn value(&self, vertex: Vertex) -> Option<f64> {
        self.reading(vertex).map(|reading| reading.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{graphs::sensor::Sensor, predictions::CongestionScale};

    #[test]
    fn snapshot_is_indexed_by_vertex() {
        let graph = SensorGraph::build(
            vec![Sensor::new(62, 25.0, 121.0), Sensor::new(61, 25.1, 121.0)],
            &[],
        )
        .unwrap();
        let csv = "detid,date,interval,time,traffic_predict\n\
                   61,2017-10-01,3,09:00:00,53.5\n\
                   62,2017-10-01,3,09:03:00,12.0\n";
        let table =
            PredictionTable::from_reader("xgboost", "oct1_2017", csv.as_bytes(), CongestionScale::Canonical)
                .unwrap();

        let snapshot = CongestionSnapshot::from_table(&graph, &table, 180);

        // Vertex 0 is sensor 61.
        assert_eq!(snapshot.value(0), Some(53.5));
        let fallback = snapshot.reading(1).unwrap();
        assert_eq!((fallback.value, fallback.interval, fallback.fallback), (12.0, 181, true));
        assert_eq!(snapshot.reading(7), None);
        assert_eq!(snapshot.model(), "xgboost");
    }
}
