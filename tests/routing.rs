mod common;

use common::{coordinate, fixture, service, DATE};
use rand::{rngs::StdRng, Rng, SeedableRng};
use sensor_routes::{
    error::{ErrorKind, TrafficError},
    graphs::{edge::SensorEdge, sensor::Sensor, sensor_graph::SensorGraph},
    predictions::{time_grid::parse_time, CongestionReading},
    route_service::{PathSlot, RouteRequest},
    search::{
        astar::{fastest_path, fastest_path_at, TrafficEdgeCost},
        congestion::CongestionSnapshot,
        dijkstra::{dijkstra_single_pair, shortest_path},
        TrivialHeuristic,
    },
};

fn request(from: u32, to: u32, model: &str, time: &str) -> RouteRequest {
    let (start_lat, start_lon) = coordinate(from);
    let (end_lat, end_lon) = coordinate(to);
    RouteRequest {
        start_lat,
        start_lon,
        end_lat,
        end_lon,
        model: model.to_string(),
        departure_time: time.to_string(),
        date: None,
    }
}

#[test]
fn fixture_graph_skips_noise_weights() {
    let service = service(&fixture());
    let graph = service.graph();

    assert_eq!(graph.stats().total_detectors, 6);
    // Five symmetric links; the 51 <-> 64 cell is below the noise floor.
    assert_eq!(graph.stats().total_edges, 10);
    assert_eq!(graph.stats().detector_ids_sample, vec![51, 61, 62, 63, 64, 90]);
}

#[test]
fn shortest_path_ignores_departure_time() {
    let service = service(&fixture());

    let night = service.compare_routes(&request(51, 64, "xgboost", "00:00:00")).unwrap();
    let morning = service.compare_routes(&request(51, 64, "xgboost", "09:00:00")).unwrap();

    let night = night.shortest.path().unwrap();
    let morning = morning.shortest.path().unwrap();
    assert_eq!(night.path, vec![51, 61, 64]);
    assert_eq!(night.path, morning.path);
    assert!((night.total_cost - 0.2).abs() < 1e-12);
}

#[test]
fn fastest_path_avoids_congestion_at_rush_hour() {
    let service = service(&fixture());

    let morning = service.compare_routes(&request(51, 64, "xgboost", "09:00:00")).unwrap();
    let fastest = morning.fastest.path().unwrap();
    assert_eq!(fastest.path, vec![51, 62, 63, 64]);
    assert_eq!(fastest.traffic_counts.high_count, 0);
    assert!(fastest.fallback_sensors.is_empty());

    let comparison = morning.comparison.unwrap();
    assert!(!comparison.same_path);
    assert!(comparison.extra_distance_meters > 0.0);

    let shortest = morning.shortest.path().unwrap();
    assert_eq!(shortest.traffic_counts.high_count, 1);
    assert_eq!(shortest.max_traffic, Some(53.5));

    let night = service.compare_routes(&request(51, 64, "xgboost", "00:00:00")).unwrap();
    assert_eq!(night.fastest.path().unwrap().path, vec![51, 61, 64]);
    assert!(night.comparison.unwrap().same_path);
}

#[test]
fn severe_sensor_is_avoided_and_fallback_reported() {
    let service = service(&fixture());

    let result = service.compare_routes(&request(51, 64, "catboost", "09:00:00")).unwrap();
    let fastest = result.fastest.path().unwrap();

    assert_eq!(fastest.path, vec![51, 62, 63, 64]);
    assert_eq!(fastest.fallback_sensors, vec![63]);
    assert!(fastest.traffic_levels.iter().all(|level| level.is_some()));
    assert_eq!(fastest.traffic_counts.severe_count, 0);
}

#[test]
fn missing_sensor_fails_only_the_fastest_slot() {
    let service = service(&fixture());

    let result = service.compare_routes(&request(51, 64, "sparse", "09:00:00")).unwrap();

    assert_eq!(result.shortest.path().unwrap().path, vec![51, 61, 64]);
    match &result.fastest {
        PathSlot::Failed { error } => assert_eq!(error.kind, ErrorKind::StaleData),
        PathSlot::Found(path) => panic!("expected stale data, got {:?}", path.path),
    }
    assert!(result.comparison.is_none());

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["shortest"]["status"], "found");
    assert_eq!(json["fastest"]["status"], "failed");
    assert_eq!(json["fastest"]["error"]["kind"], "stale_data");
}

#[test]
fn isolated_sensor_has_no_path() {
    let service = service(&fixture());

    let error = shortest_path(service.graph(), 51, 90).unwrap_err();
    assert!(matches!(error, TrafficError::NoPath { from: 51, to: 90 }));

    let result = service.compare_routes(&request(51, 90, "xgboost", "09:00:00")).unwrap();
    for slot in [&result.shortest, &result.fastest] {
        match slot {
            PathSlot::Failed { error } => assert_eq!(error.kind, ErrorKind::NotFound),
            PathSlot::Found(_) => panic!("isolated sensor must not be reachable"),
        }
    }
}

#[test]
fn same_start_and_end_is_a_single_sensor_route() {
    let service = service(&fixture());

    let result = service.compare_routes(&request(61, 61, "xgboost", "09:00:00")).unwrap();
    for slot in [&result.shortest, &result.fastest] {
        let path = slot.path().unwrap();
        assert_eq!(path.path, vec![61]);
        assert_eq!(path.distance_meters, 0.0);
    }
}

#[test]
fn whole_request_fails_on_bad_input_or_unknown_model() {
    let service = service(&fixture());

    let mut bad_lat = request(51, 64, "xgboost", "09:00:00");
    bad_lat.start_lat = 91.0;
    let error = service.compare_routes(&bad_lat).unwrap_err();
    assert!(matches!(&error, TrafficError::Validation { field, .. } if field == "start_lat"));

    let error = service.compare_routes(&request(51, 64, "xgboost", "9 o'clock")).unwrap_err();
    assert!(matches!(&error, TrafficError::Validation { field, .. } if field == "departure_time"));

    let error = service.compare_routes(&request(51, 64, "prophet", "09:00:00")).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::NotFound);
}

#[test]
fn far_points_resolve_to_nearest_sensor() {
    let service = service(&fixture());

    let mut far = request(51, 64, "xgboost", "09:00:00");
    far.start_lat = 24.0;
    far.start_lon = 120.0;
    let result = service.compare_routes(&far).unwrap();

    assert_eq!(result.start.detector.sensor.id, 51);
    assert!(result.start.detector.distance_km > 100.0);
    assert_eq!(result.detectors.len(), 6);
}

#[test]
fn nearest_detectors_validates_k() {
    let service = service(&fixture());

    let nearest = service.nearest_detectors(25.040, 121.509, 2).unwrap();
    assert_eq!(nearest.iter().map(|nearby| nearby.sensor.id).collect::<Vec<_>>(), vec![61, 62]);

    for k in [0, 51] {
        let error = service.nearest_detectors(25.04, 121.5, k).unwrap_err();
        assert!(matches!(&error, TrafficError::Validation { field, .. } if field == "k"));
    }
}

#[test]
fn fastest_path_at_loads_from_store() {
    let dir = fixture();
    let service = service(&dir);
    let time = parse_time("time", "09:00:00").unwrap();

    let result =
        fastest_path_at(service.graph(), service.store(), 51, 64, "xgboost", DATE, time).unwrap();
    assert_eq!(result.path, vec![51, 62, 63, 64]);
}

fn random_graph(rng: &mut StdRng, sensors: u32, edges: usize) -> SensorGraph {
    let sensors = (0..sensors)
        .map(|id| Sensor::new(id, 25.0 + rng.gen_range(0.0..0.1), 121.5 + rng.gen_range(0.0..0.1)))
        .collect::<Vec<_>>();
    let edges = (0..edges)
        .map(|_| SensorEdge {
            from: rng.gen_range(0..sensors.len() as u32),
            to: rng.gen_range(0..sensors.len() as u32),
            weight: rng.gen_range(0.02..1.0),
        })
        .collect::<Vec<_>>();
    SensorGraph::build(sensors, &edges).unwrap()
}

#[test]
fn astar_without_congestion_matches_dijkstra_cost() {
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..20 {
        let graph = random_graph(&mut rng, 40, 160);
        let free_flow = CongestionSnapshot::uniform(&graph, 0.0);

        for _ in 0..20 {
            let source = rng.gen_range(0..40);
            let target = rng.gen_range(0..40);
            match (shortest_path(&graph, source, target), fastest_path(&graph, &free_flow, source, target)) {
                (Ok(shortest), Ok(fastest)) => {
                    assert!(
                        (shortest.total_cost - fastest.total_cost).abs() < 1e-9,
                        "{} -> {}: {} vs {}",
                        source,
                        target,
                        shortest.total_cost,
                        fastest.total_cost
                    );
                }
                (Err(TrafficError::NoPath { .. }), Err(TrafficError::NoPath { .. })) => {}
                (shortest, fastest) => panic!("{:?} vs {:?}", shortest.err(), fastest.err()),
            }
        }
    }
}

#[test]
fn astar_heuristic_keeps_traffic_costs_optimal() {
    let mut rng = StdRng::seed_from_u64(11);

    for _ in 0..20 {
        let graph = random_graph(&mut rng, 30, 120);
        let readings = (0..30)
            .map(|_| {
                Some(CongestionReading {
                    value: rng.gen_range(0.0..150.0),
                    interval: 0,
                    fallback: false,
                })
            })
            .collect();
        let snapshot = CongestionSnapshot::from_readings("random", DATE, 0, readings);

        for _ in 0..20 {
            let source = rng.gen_range(0..30);
            let target = rng.gen_range(0..30);
            let Ok(fastest) = fastest_path(&graph, &snapshot, source, target) else {
                continue;
            };
            let exact = dijkstra_single_pair(
                &graph,
                &TrafficEdgeCost { snapshot: &snapshot },
                &TrivialHeuristic {},
                graph.vertex(source).unwrap(),
                graph.vertex(target).unwrap(),
            );
            let exact = exact.path.unwrap().cost();
            assert!((exact - fastest.total_cost).abs() < 1e-9 * exact.max(1.0));
        }
    }
}
