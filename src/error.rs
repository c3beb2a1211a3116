use std::{io, path::PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::graphs::SensorId;

/// Machine readable error category, stable across releases.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    GraphLoad,
    StaleData,
    InvalidData,
    Io,
}

#[derive(Error, Debug)]
pub enum TrafficError {
    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("{0}")]
    NotFound(String),

    #[error("no path from sensor {from} to sensor {to}")]
    NoPath { from: SensorId, to: SensorId },

    #[error("failed to load sensor graph: {0}")]
    GraphLoad(String),

    #[error("sensor {sensor} has no prediction for model '{model}' on '{date}'")]
    StaleData {
        sensor: SensorId,
        model: String,
        date: String,
    },

    #[error("invalid prediction data in '{}': {message}", .path.display())]
    PredictionData { path: PathBuf, message: String },

    #[error("I/O error accessing '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl TrafficError {
    pub fn validation(field: &str, message: impl Into<String>) -> TrafficError {
        TrafficError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            TrafficError::Validation { .. } => ErrorKind::Validation,
            TrafficError::NotFound(_) | TrafficError::NoPath { .. } => ErrorKind::NotFound,
            TrafficError::GraphLoad(_) => ErrorKind::GraphLoad,
            TrafficError::StaleData { .. } => ErrorKind::StaleData,
            TrafficError::PredictionData { .. } => ErrorKind::InvalidData,
            TrafficError::Io { .. } => ErrorKind::Io,
        }
    }
}

/// Serializable form of a [`TrafficError`] returned to callers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl From<&TrafficError> for ErrorBody {
    fn from(error: &TrafficError) -> Self {
        let field = match error {
            TrafficError::Validation { field, .. } => Some(field.clone()),
            _ => None,
        };

        ErrorBody {
            kind: error.kind(),
            message: error.to_string(),
            field,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_body_carries_field() {
        let error = TrafficError::validation("departure_time", "expected HH:MM:SS");
        let body = ErrorBody::from(&error);

        assert_eq!(body.kind, ErrorKind::Validation);
        assert_eq!(body.field.as_deref(), Some("departure_time"));
        assert_eq!(body.message, "invalid departure_time: expected HH:MM:SS");
    }

    #[test]
    fn no_path_is_a_not_found() {
        let error = TrafficError::NoPath { from: 1, to: 2 };
        assert_eq!(error.kind(), ErrorKind::NotFound);

        let json = serde_json::to_value(ErrorBody::from(&error)).unwrap();
        assert_eq!(json["kind"], "not_found");
        assert!(json.get("field").is_none());
    }
}
