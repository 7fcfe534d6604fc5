use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use super::interp::InterpolationBank;
use crate::error::DatasetError;

/// Number of sensor substrates.
pub const NUM_MATERIALS: usize = 2;
/// Sensors hosted on each material.
pub const SENSORS_PER_MATERIAL: usize = 8;
/// Operating-temperature phases every sensor cycles through.
pub const HEATER_STEPS: usize = 10;

// ---------------------------------------------------------------------------
// Material – closed two-value set, used as an array index
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Material {
    Zero,
    One,
}

impl Material {
    pub const ALL: [Material; NUM_MATERIALS] = [Material::Zero, Material::One];

    pub fn index(self) -> usize {
        match self {
            Material::Zero => 0,
            Material::One => 1,
        }
    }

    /// Key used by the serialized payloads (`mat_0`, `mat_1`).
    pub fn key(self) -> &'static str {
        match self {
            Material::Zero => "mat_0",
            Material::One => "mat_1",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Material::ALL.into_iter().find(|m| m.key() == key)
    }
}

impl TryFrom<usize> for Material {
    type Error = DatasetError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        Material::ALL
            .get(value)
            .copied()
            .ok_or(DatasetError::MaterialOutOfRange(value))
    }
}

impl fmt::Display for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

// ---------------------------------------------------------------------------
// ChannelType – one measured physical quantity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ChannelType {
    #[serde(rename = "gas")]
    Gas,
    #[serde(rename = "temp")]
    Temperature,
    #[serde(rename = "press")]
    Pressure,
    #[serde(rename = "rh")]
    RelativeHumidity,
}

impl ChannelType {
    pub const ALL: [ChannelType; 4] = [
        ChannelType::Gas,
        ChannelType::Temperature,
        ChannelType::Pressure,
        ChannelType::RelativeHumidity,
    ];

    /// Short name used by the interpolation bank and query presets.
    pub fn name(self) -> &'static str {
        match self {
            ChannelType::Gas => "gas",
            ChannelType::Temperature => "temp",
            ChannelType::Pressure => "press",
            ChannelType::RelativeHumidity => "rh",
        }
    }

    /// Column holding this channel in a heater-step table.
    pub fn column(self) -> &'static str {
        match self {
            ChannelType::Gas => "Filtered_Gas",
            ChannelType::Temperature => "Filtered_Temperature",
            ChannelType::Pressure => "Filtered_Pressure",
            ChannelType::RelativeHumidity => "Filtered_Relative_Humidity",
        }
    }
}

impl FromStr for ChannelType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChannelType::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| format!("unknown channel type '{s}'"))
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ---------------------------------------------------------------------------
// LabelSegment – one annotated time interval
// ---------------------------------------------------------------------------

/// An externally annotated interval with a class and a regression target.
/// A missing target is stored as NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelSegment {
    pub start: f64,
    pub end: f64,
    #[serde(rename = "label")]
    pub class: i32,
    #[serde(default = "missing_target", deserialize_with = "target_or_nan")]
    pub target: f64,
}

impl LabelSegment {
    pub fn new(class: i32, target: f64, start: f64, end: f64) -> Self {
        Self {
            start,
            end,
            class,
            target,
        }
    }

    /// Whether `time` lies inside the window, both ends inclusive.
    pub fn contains(&self, time: f64) -> bool {
        self.start <= time && time <= self.end
    }
}

fn missing_target() -> f64 {
    f64::NAN
}

fn target_or_nan<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

// ---------------------------------------------------------------------------
// HeaterStepTable – raw samples of one heater step
// ---------------------------------------------------------------------------

/// Time column plus the four filtered channel columns, all of equal length.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HeaterStepTable {
    time: Vec<f64>,
    gas: Vec<f64>,
    temperature: Vec<f64>,
    pressure: Vec<f64>,
    relative_humidity: Vec<f64>,
}

impl HeaterStepTable {
    pub fn new(
        time: Vec<f64>,
        gas: Vec<f64>,
        temperature: Vec<f64>,
        pressure: Vec<f64>,
        relative_humidity: Vec<f64>,
    ) -> Result<Self, DatasetError> {
        let n = time.len();
        for (channel, len) in [
            (ChannelType::Gas, gas.len()),
            (ChannelType::Temperature, temperature.len()),
            (ChannelType::Pressure, pressure.len()),
            (ChannelType::RelativeHumidity, relative_humidity.len()),
        ] {
            if len != n {
                return Err(DatasetError::StoreShape(format!(
                    "column {} has {len} values but the time column has {n}",
                    channel.column()
                )));
            }
        }
        Ok(Self {
            time,
            gas,
            temperature,
            pressure,
            relative_humidity,
        })
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn channel(&self, channel: ChannelType) -> &[f64] {
        match channel {
            ChannelType::Gas => &self.gas,
            ChannelType::Temperature => &self.temperature,
            ChannelType::Pressure => &self.pressure,
            ChannelType::RelativeHumidity => &self.relative_humidity,
        }
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }
}

// ---------------------------------------------------------------------------
// SensorRecording – the ten heater-step tables of one sensor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct SensorRecording {
    steps: Vec<HeaterStepTable>,
}

impl SensorRecording {
    pub fn new(steps: Vec<HeaterStepTable>) -> Result<Self, DatasetError> {
        if steps.len() != HEATER_STEPS {
            return Err(DatasetError::StoreShape(format!(
                "expected {HEATER_STEPS} heater steps, got {}",
                steps.len()
            )));
        }
        Ok(Self { steps })
    }

    pub fn heater_step(&self, step: usize) -> Option<&HeaterStepTable> {
        self.steps.get(step)
    }

    pub fn heater_steps(&self) -> &[HeaterStepTable] {
        &self.steps
    }
}

// ---------------------------------------------------------------------------
// RawStore – the three read-only payloads, injected into the dataset
// ---------------------------------------------------------------------------

/// Read-only source of sensor time series, labels and pre-fit
/// interpolation functions, indexed by material.
#[derive(Debug, Clone)]
pub struct RawStore {
    recordings: [Vec<SensorRecording>; NUM_MATERIALS],
    labels: [Vec<LabelSegment>; NUM_MATERIALS],
    bank: InterpolationBank,
}

impl RawStore {
    pub fn new(
        recordings: [Vec<SensorRecording>; NUM_MATERIALS],
        labels: [Vec<LabelSegment>; NUM_MATERIALS],
        bank: InterpolationBank,
    ) -> Result<Self, DatasetError> {
        for material in Material::ALL {
            let count = recordings[material.index()].len();
            if count != SENSORS_PER_MATERIAL {
                return Err(DatasetError::StoreShape(format!(
                    "{material} has {count} sensor recordings, expected {SENSORS_PER_MATERIAL}"
                )));
            }
        }
        Ok(Self {
            recordings,
            labels,
            bank,
        })
    }

    pub fn recording(&self, material: Material, sensor: usize) -> Option<&SensorRecording> {
        self.recordings[material.index()].get(sensor)
    }

    pub fn labels(&self, material: Material) -> &[LabelSegment] {
        &self.labels[material.index()]
    }

    pub fn bank(&self) -> &InterpolationBank {
        &self.bank
    }
}
