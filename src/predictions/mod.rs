pub mod store;
pub mod table;
pub mod time_grid;

pub use store::{normalize_date, PredictionStore};
pub use table::{CongestionReading, CongestionScale, PredictionRecord, PredictionTable};
