use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use super::model::{ChannelType, Material, HEATER_STEPS, NUM_MATERIALS, SENSORS_PER_MATERIAL};
use crate::error::DatasetError;

// ---------------------------------------------------------------------------
// InterpolationFunction – an already-fit continuous resampler
// ---------------------------------------------------------------------------

/// A vectorized function of time. Implementations must return exactly one
/// value per input time.
pub trait InterpolationFunction: Send + Sync {
    fn evaluate(&self, times: &[f64]) -> Vec<f64>;
}

impl<F> InterpolationFunction for F
where
    F: Fn(&[f64]) -> Vec<f64> + Send + Sync,
{
    fn evaluate(&self, times: &[f64]) -> Vec<f64> {
        self(times)
    }
}

pub type SharedFunction = Arc<dyn InterpolationFunction>;

/// Piecewise-linear function through a knot table. Times outside the knot
/// range take the value of the nearest end knot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "KnotTable")]
pub struct LinearInterpolant {
    x: Vec<f64>,
    y: Vec<f64>,
}

#[derive(Deserialize)]
struct KnotTable {
    x: Vec<f64>,
    y: Vec<f64>,
}

impl TryFrom<KnotTable> for LinearInterpolant {
    type Error = DatasetError;

    fn try_from(knots: KnotTable) -> Result<Self, Self::Error> {
        Self::new(knots.x, knots.y)
    }
}

impl LinearInterpolant {
    /// `x` must be finite, ascending and the same length as `y`.
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Result<Self, DatasetError> {
        if x.is_empty() || x.len() != y.len() {
            return Err(DatasetError::StoreShape(format!(
                "knot table needs matching non-empty x/y, got {} and {}",
                x.len(),
                y.len()
            )));
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(DatasetError::StoreShape(
                "knot table x values must be finite".to_string(),
            ));
        }
        if x.windows(2).any(|w| w[1] < w[0]) {
            return Err(DatasetError::StoreShape(
                "knot table x values are not ascending".to_string(),
            ));
        }
        Ok(Self { x, y })
    }

    fn value_at(&self, t: f64) -> f64 {
        let last = self.x.len() - 1;
        if t <= self.x[0] {
            return self.y[0];
        }
        if t >= self.x[last] {
            return self.y[last];
        }
        // first knot strictly greater than t; 1..=last because of the checks above
        let hi = self.x.partition_point(|&k| k <= t);
        let lo = hi - 1;
        let (x0, x1) = (self.x[lo], self.x[hi]);
        let (y0, y1) = (self.y[lo], self.y[hi]);
        if (x1 - x0).abs() < f64::EPSILON {
            return y1;
        }
        y0 + (y1 - y0) * (t - x0) / (x1 - x0)
    }
}

impl InterpolationFunction for LinearInterpolant {
    fn evaluate(&self, times: &[f64]) -> Vec<f64> {
        times.iter().map(|&t| self.value_at(t)).collect()
    }
}

/// `n` evenly spaced points over `[start, end]`, both ends included.
/// The last point is exactly `end`.
pub fn uniform_grid(start: f64, end: f64, n: usize) -> Array1<f64> {
    match n {
        0 => Array1::zeros(0),
        1 => Array1::from_elem(1, start),
        _ => {
            let step = (end - start) / (n - 1) as f64;
            let mut grid = Array1::from_shape_fn(n, |i| start + step * i as f64);
            grid[n - 1] = end;
            grid
        }
    }
}

// ---------------------------------------------------------------------------
// Function bank, addressed by material / sensor / heater step / channel
// ---------------------------------------------------------------------------

/// The interpolation functions of one sensor, one channel map per heater step.
#[derive(Clone, Default)]
pub struct SensorFunctions {
    steps: Vec<BTreeMap<ChannelType, SharedFunction>>,
}

impl SensorFunctions {
    fn empty() -> Self {
        Self {
            steps: vec![BTreeMap::new(); HEATER_STEPS],
        }
    }

    pub fn get(
        &self,
        heater_step: usize,
        channel: ChannelType,
    ) -> Result<&SharedFunction, DatasetError> {
        self.steps
            .get(heater_step)
            .and_then(|fns| fns.get(&channel))
            .ok_or(DatasetError::MissingInterpolationFunction {
                heater_step,
                channel,
            })
    }

    /// Channels available at a heater step.
    pub fn channels(&self, heater_step: usize) -> Vec<ChannelType> {
        self.steps
            .get(heater_step)
            .map(|fns| fns.keys().copied().collect())
            .unwrap_or_default()
    }
}

impl fmt::Debug for SensorFunctions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.steps.iter().map(|fns| fns.keys().collect::<Vec<_>>()))
            .finish()
    }
}

/// Pre-fit functions for every sensor of both materials.
#[derive(Debug, Clone)]
pub struct InterpolationBank {
    sensors: [Vec<SensorFunctions>; NUM_MATERIALS],
}

impl Default for InterpolationBank {
    fn default() -> Self {
        Self::new()
    }
}

impl InterpolationBank {
    pub fn new() -> Self {
        let slots = || vec![SensorFunctions::empty(); SENSORS_PER_MATERIAL];
        Self {
            sensors: [slots(), slots()],
        }
    }

    pub fn insert<F>(
        &mut self,
        material: Material,
        sensor: usize,
        heater_step: usize,
        channel: ChannelType,
        function: F,
    ) -> Result<(), DatasetError>
    where
        F: InterpolationFunction + 'static,
    {
        self.insert_shared(material, sensor, heater_step, channel, Arc::new(function))
    }

    pub fn insert_shared(
        &mut self,
        material: Material,
        sensor: usize,
        heater_step: usize,
        channel: ChannelType,
        function: SharedFunction,
    ) -> Result<(), DatasetError> {
        let functions = self.sensors[material.index()]
            .get_mut(sensor)
            .ok_or(DatasetError::SensorOutOfRange(sensor))?;
        let step = functions.steps.get_mut(heater_step).ok_or_else(|| {
            DatasetError::StoreShape(format!("heater step {heater_step} is out of range"))
        })?;
        step.insert(channel, function);
        Ok(())
    }

    pub fn sensor(&self, material: Material, sensor: usize) -> Option<&SensorFunctions> {
        self.sensors[material.index()].get(sensor)
    }
}
