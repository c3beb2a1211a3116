use serde::{Deserialize, Serialize};

/// Congestion level on the canonical 0–100 scale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrafficCategory {
    Low,
    Moderate,
    High,
    Severe,
}

pub const MODERATE_THRESHOLD: f64 = 25.0;
pub const HIGH_THRESHOLD: f64 = 50.0;
pub const SEVERE_THRESHOLD: f64 = 100.0;

impl TrafficCategory {
    /// Half-open bands: `[0, 25)`, `[25, 50)`, `[50, 100)`, `[100, ∞)`.
    pub fn of(value: f64) -> TrafficCategory {
        if value < MODERATE_THRESHOLD {
            TrafficCategory::Low
        } else if value < HIGH_THRESHOLD {
            TrafficCategory::Moderate
        } else if value < SEVERE_THRESHOLD {
            TrafficCategory::High
        } else {
            TrafficCategory::Severe
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrafficCategory::Low => "low",
            TrafficCategory::Moderate => "moderate",
            TrafficCategory::High => "high",
            TrafficCategory::Severe => "severe",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts {
    pub low_count: u32,
    pub moderate_count: u32,
    pub high_count: u32,
    pub severe_count: u32,
}

impl CategoryCounts {
    pub fn add(&mut self, category: TrafficCategory) {
        match category {
            TrafficCategory::Low => self.low_count += 1,
            TrafficCategory::Moderate => self.moderate_count += 1,
            TrafficCategory::High => self.high_count += 1,
            TrafficCategory::Severe => self.severe_count += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.low_count + self.moderate_count + self.high_count + self.severe_count
    }
}

impl FromIterator<TrafficCategory> for CategoryCounts {
    fn from_iter<I: IntoIterator<Item = TrafficCategory>>(iter: I) -> Self {
        let mut counts = CategoryCounts::default();
        iter.into_iter().for_each(|category| counts.add(category));
        counts
    }
}
