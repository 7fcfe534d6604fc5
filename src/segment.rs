//! Slicing raw heater-step tables down to labeled time windows.

use crate::data::model::{ChannelType, HeaterStepTable, LabelSegment, Material, SensorRecording};
use crate::error::DatasetError;

// ---------------------------------------------------------------------------
// RawHeaterStepSegment – the samples of one heater step inside a label window
// ---------------------------------------------------------------------------

/// Samples of one heater step that fall inside a label window, in their
/// original order. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct RawHeaterStepSegment {
    sample_times: Vec<f64>,
    gas: Vec<f64>,
    temperature: Vec<f64>,
    pressure: Vec<f64>,
    relative_humidity: Vec<f64>,
}

impl RawHeaterStepSegment {
    /// Select rows with `start <= time <= end`. Returns `None` when no row matches.
    fn slice(table: &HeaterStepTable, label: &LabelSegment) -> Option<Self> {
        let rows: Vec<usize> = table
            .time()
            .iter()
            .enumerate()
            .filter(|(_, t)| label.contains(**t))
            .map(|(i, _)| i)
            .collect();
        if rows.is_empty() {
            return None;
        }
        let pick = |values: &[f64]| rows.iter().map(|&i| values[i]).collect::<Vec<f64>>();
        Some(Self {
            sample_times: pick(table.time()),
            gas: pick(table.channel(ChannelType::Gas)),
            temperature: pick(table.channel(ChannelType::Temperature)),
            pressure: pick(table.channel(ChannelType::Pressure)),
            relative_humidity: pick(table.channel(ChannelType::RelativeHumidity)),
        })
    }

    pub fn num_samples(&self) -> usize {
        self.sample_times.len()
    }

    /// First observed sample time.
    pub fn start(&self) -> f64 {
        self.sample_times[0]
    }

    /// Last observed sample time.
    pub fn end(&self) -> f64 {
        self.sample_times[self.sample_times.len() - 1]
    }

    pub fn sample_times(&self) -> &[f64] {
        &self.sample_times
    }

    pub fn values(&self, channel: ChannelType) -> &[f64] {
        match channel {
            ChannelType::Gas => &self.gas,
            ChannelType::Temperature => &self.temperature,
            ChannelType::Pressure => &self.pressure,
            ChannelType::RelativeHumidity => &self.relative_humidity,
        }
    }
}

// ---------------------------------------------------------------------------
// RawClassSegment – one label window across all heater steps
// ---------------------------------------------------------------------------

/// One label segment of one sensor. `start`/`end` are the label's window,
/// not any heater step's observed bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct RawClassSegment {
    pub class: i32,
    pub target: f64,
    pub start: f64,
    pub end: f64,
    heater_steps: Vec<RawHeaterStepSegment>,
}

impl RawClassSegment {
    pub fn heater_steps(&self) -> &[RawHeaterStepSegment] {
        &self.heater_steps
    }

    /// Largest observed sample count among the heater steps.
    pub fn max_num_samples(&self) -> usize {
        self.heater_steps
            .iter()
            .map(RawHeaterStepSegment::num_samples)
            .max()
            .unwrap_or(0)
    }
}

/// Cut every heater step of `recording` to the window of `label`. `segment`
/// is the label's position, used for error reporting.
pub fn extract_segment(
    recording: &SensorRecording,
    label: &LabelSegment,
    material: Material,
    sensor: usize,
    segment: usize,
) -> Result<RawClassSegment, DatasetError> {
    let heater_steps = recording
        .heater_steps()
        .iter()
        .enumerate()
        .map(|(heater_step, table)| {
            RawHeaterStepSegment::slice(table, label).ok_or(DatasetError::EmptySegment {
                material: material.index(),
                sensor,
                heater_step,
                segment,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RawClassSegment {
        class: label.class,
        target: label.target,
        start: label.start,
        end: label.end,
        heater_steps,
    })
}

/// Extract one segment per label, in label order.
pub fn extract_all(
    recording: &SensorRecording,
    labels: &[LabelSegment],
    material: Material,
    sensor: usize,
) -> Result<Vec<RawClassSegment>, DatasetError> {
    labels
        .iter()
        .enumerate()
        .map(|(segment, label)| extract_segment(recording, label, material, sensor, segment))
        .collect()
}
