//! The fixed daily time grid: 480 three-minute intervals grouped into 48
//! half-hour buckets.

use std::ops::Range;

use chrono::{NaiveTime, Timelike};

use crate::error::TrafficError;

pub const INTERVAL_MINUTES: u32 = 3;
pub const INTERVALS_PER_DAY: u32 = 480;
pub const BUCKET_MINUTES: u32 = 30;
pub const BUCKETS_PER_DAY: u32 = 48;
pub const INTERVALS_PER_BUCKET: u32 = BUCKET_MINUTES / INTERVAL_MINUTES;

/// Parses `HH:MM:SS` or `HH:MM`. `field` names the offending input in the error.
pub fn parse_time(field: &str, value: &str) -> Result<NaiveTime, TrafficError> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|_| {
            TrafficError::validation(field, format!("'{}' is not a time of day (HH:MM:SS)", value))
        })
}

pub fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M:%S").to_string()
}

fn minute_of_day(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

fn time_at_minute(minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(minute / 60, minute % 60, 0).unwrap_or_default()
}

/// Index of the 3-minute interval containing `time`.
pub fn interval_of(time: NaiveTime) -> u32 {
    minute_of_day(time) / INTERVAL_MINUTES
}

/// Start of an interval; indices past the end of the day are clamped.
pub fn interval_to_time(interval: u32) -> NaiveTime {
    time_at_minute(interval.min(INTERVALS_PER_DAY - 1) * INTERVAL_MINUTES)
}

/// Index of the 30-minute bucket containing `time`.
pub fn bucket_of(time: NaiveTime) -> u32 {
    minute_of_day(time) / BUCKET_MINUTES
}

pub fn bucket_to_time(bucket: u32) -> NaiveTime {
    time_at_minute(bucket.min(BUCKETS_PER_DAY - 1) * BUCKET_MINUTES)
}

/// The ten intervals making up a bucket.
pub fn bucket_intervals(bucket: u32) -> Range<u32> {
    let first = bucket.min(BUCKETS_PER_DAY - 1) * INTERVALS_PER_BUCKET;
    first..first + INTERVALS_PER_BUCKET
}
