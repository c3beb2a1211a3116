use std::path::PathBuf;

use clap::Args;

use crate::predictions::CongestionScale;

/// Where the reference data lives. Shared by every binary.
#[derive(Args, Debug, Clone)]
pub struct DataConfig {
    /// Directory holding the sensor, weight and prediction tables
    #[arg(long, env = "SENSOR_ROUTES_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Sensor table, relative to the data directory
    #[arg(long, env = "SENSOR_ROUTES_DETECTORS", default_value = "taipeh_detectors.csv")]
    pub detectors_file: PathBuf,

    /// Weight matrix, relative to the data directory
    #[arg(
        long,
        env = "SENSOR_ROUTES_WEIGHTS",
        default_value = "taipeh_adjacency_matrix_transposed_normalized.csv"
    )]
    pub weights_file: PathBuf,

    /// Date used when a request names none
    #[arg(id = "default_date", long = "default-date", env = "SENSOR_ROUTES_DATE", default_value = "oct1_2017")]
    pub date: String,

    /// Scale the prediction files are written on
    #[arg(long, env = "SENSOR_ROUTES_SCALE", value_enum, default_value_t = CongestionScale::Canonical)]
    pub scale: CongestionScale,
}

impl DataConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> DataConfig {
        DataConfig {
            data_dir: data_dir.into(),
            detectors_file: PathBuf::from("taipeh_detectors.csv"),
            weights_file: PathBuf::from("taipeh_adjacency_matrix_transposed_normalized.csv"),
            date: "oct1_2017".to_string(),
            scale: CongestionScale::Canonical,
        }
    }

    pub fn detectors_path(&self) -> PathBuf {
        self.data_dir.join(&self.detectors_file)
    }

    pub fn weights_path(&self) -> PathBuf {
        self.data_dir.join(&self.weights_file)
    }
}
