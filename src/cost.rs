//! Routing costs derived from edge weights and predicted congestion.
//!
//! Congestion is not comparable to distance on a linear scale. The traffic
//! penalty jumps by two orders of magnitude at the high band so that a single
//! heavily congested edge outweighs any number of moderate detours.

use crate::{
    category::{HIGH_THRESHOLD, MODERATE_THRESHOLD, SEVERE_THRESHOLD},
    graphs::Weight,
};

/// Smallest penalty any congestion value can produce.
pub const MIN_MULTIPLIER: f64 = 1.0;
/// Penalties are capped to keep path costs bounded.
pub const MAX_MULTIPLIER: f64 = 5000.0;

/// Multiplier applied to an edge weight for a congestion value.
///
/// | band       | multiplier           |
/// |------------|----------------------|
/// | `< 25`     | 1.0 .. 1.25          |
/// | `25 .. 50` | 1.0 .. 3.5           |
/// | `50 .. 100`| 100 .. 500           |
/// | `>= 100`   | 500 .. 5000 (capped) |
pub fn penalty(congestion: f64) -> f64 {
    let congestion = congestion.max(0.0);
    let multiplier = if congestion < MODERATE_THRESHOLD {
        1.0 + congestion / 100.0
    } else if congestion < HIGH_THRESHOLD {
        1.0 + (congestion - MODERATE_THRESHOLD) / 10.0
    } else if congestion < SEVERE_THRESHOLD {
        100.0 + (congestion - HIGH_THRESHOLD) * 8.0
    } else {
        500.0 + (congestion - SEVERE_THRESHOLD) * 10.0
    };
    multiplier.min(MAX_MULTIPLIER)
}

pub fn distance_cost(weight: Weight) -> Weight {
    weight
}

pub fn traffic_cost(weight: Weight, congestion: f64) -> Weight {
    weight * penalty(congestion)
}
