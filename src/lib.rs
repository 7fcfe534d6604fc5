//! Turn labeled, irregularly sampled gas-sensor recordings into fixed-grid
//! feature matrices.
//!
//! ```text
//!  RawStore ──► Sensor (segment extraction, once) ──► interpolation per query
//!                                                          │
//!                                 Dataset: single sensor / sensor pair
//!                                                          │
//!                                               FeatureSet ──► calibrate
//! ```

pub mod calibrate;
pub mod config;
pub mod data;
pub mod dataset;
pub mod error;
pub mod segment;
pub mod sensor;

pub use calibrate::calibrate;
pub use config::{PairOptions, QueryOptions};
pub use data::filter::{clean_regression_data, ClassSubset};
pub use data::interp::{InterpolationBank, InterpolationFunction, LinearInterpolant};
pub use data::model::{
    ChannelType, HeaterStepTable, LabelSegment, Material, RawStore, SensorRecording,
    HEATER_STEPS, NUM_MATERIALS, SENSORS_PER_MATERIAL,
};
pub use dataset::{Dataset, FeatureSet};
pub use error::DatasetError;
