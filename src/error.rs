use thiserror::Error;

use crate::data::model::ChannelType;

/// Every way a catalog lookup, assembly query or calibration can fail.
///
/// A failed query never yields a partial result.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("material index {0} is out of range (expected 0 or 1)")]
    MaterialOutOfRange(usize),
    #[error("sensor index {0} is out of range (expected 0..8)")]
    SensorOutOfRange(usize),
    #[error(
        "label segment {segment} selects no samples for material {material}, \
         sensor {sensor}, heater step {heater_step}"
    )]
    EmptySegment {
        material: usize,
        sensor: usize,
        heater_step: usize,
        segment: usize,
    },
    #[error("a sensor pair needs exactly 2 sensor indices, got {0}")]
    PairArity(usize),
    #[error("paired sensors disagree on the class of segment {segment}: {left} vs {right}")]
    ClassMismatch { segment: usize, left: i32, right: i32 },
    #[error(
        "paired sensors use different time grids for segment {segment} \
         ({left_len} vs {right_len} points)"
    )]
    TimeGridMismatch {
        segment: usize,
        left_len: usize,
        right_len: usize,
    },
    #[error("no interpolation function for heater step {heater_step}, channel {channel}")]
    MissingInterpolationFunction {
        heater_step: usize,
        channel: ChannelType,
    },
    #[error("interpolation function returned {actual} values for {expected} time points")]
    InterpolationLength { expected: usize, actual: usize },
    #[error("raw store has an invalid shape: {0}")]
    StoreShape(String),
    #[error("channel count mismatch: expected {expected}, got {actual}")]
    ChannelCountMismatch { expected: usize, actual: usize },
    #[error("row count mismatch: expected {expected}, got {actual}")]
    RowCountMismatch { expected: usize, actual: usize },
    #[error("feature blocks cannot be joined: {0}")]
    Shape(#[from] ndarray::ShapeError),
}
