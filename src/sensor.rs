//! One sensor's extracted segments and their resampling onto uniform grids.

use ndarray::{Array1, Array2, ArrayView1};

use crate::data::interp::{uniform_grid, SensorFunctions};
use crate::data::model::{ChannelType, Material, RawStore, HEATER_STEPS};
use crate::error::DatasetError;
use crate::segment::{extract_all, RawClassSegment};

// ---------------------------------------------------------------------------
// InterpolatedClassBlock – one label segment on a uniform grid
// ---------------------------------------------------------------------------

/// Features of one label segment, resampled onto `time`.
///
/// `x` has one row per (channel type, heater step), channel type outer and
/// heater step inner, so row `c * 10 + h` is heater step `h` of the `c`-th
/// requested channel type. Columns follow `time`.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolatedClassBlock {
    pub class: i32,
    pub target: f64,
    pub start: f64,
    pub end: f64,
    pub time: Array1<f64>,
    pub x: Array2<f64>,
    pub y: Array1<i32>,
    pub targets: Array1<f64>,
}

impl InterpolatedClassBlock {
    pub fn num_samples(&self) -> usize {
        self.time.len()
    }
}

/// Evaluate `functions` for every requested channel type and heater step on a
/// uniform grid over the segment's label window.
pub fn interpolate_segment(
    segment: &RawClassSegment,
    functions: &SensorFunctions,
    force_num_samples: Option<usize>,
    include_types: &[ChannelType],
) -> Result<InterpolatedClassBlock, DatasetError> {
    let num_samples = force_num_samples
        .filter(|&n| n > 0)
        .unwrap_or_else(|| segment.max_num_samples());
    let time = uniform_grid(segment.start, segment.end, num_samples);
    let times = time.to_vec();

    let mut x = Array2::<f64>::zeros((HEATER_STEPS * include_types.len(), num_samples));
    for (c, &channel) in include_types.iter().enumerate() {
        for heater_step in 0..HEATER_STEPS {
            let values = functions.get(heater_step, channel)?.evaluate(&times);
            if values.len() != num_samples {
                return Err(DatasetError::InterpolationLength {
                    expected: num_samples,
                    actual: values.len(),
                });
            }
            x.row_mut(c * HEATER_STEPS + heater_step)
                .assign(&ArrayView1::from(values.as_slice()));
        }
    }

    Ok(InterpolatedClassBlock {
        class: segment.class,
        target: segment.target,
        start: segment.start,
        end: segment.end,
        time,
        x,
        y: Array1::from_elem(num_samples, segment.class),
        targets: Array1::from_elem(num_samples, segment.target),
    })
}

// ---------------------------------------------------------------------------
// Sensor – one catalog entry
// ---------------------------------------------------------------------------

/// A single (material, sensor index) with its raw segments, extracted once,
/// and its slice of the interpolation bank.
#[derive(Debug, Clone)]
pub struct Sensor {
    material: Material,
    index: usize,
    segments: Vec<RawClassSegment>,
    functions: SensorFunctions,
}

impl Sensor {
    pub fn build(store: &RawStore, material: Material, index: usize) -> Result<Self, DatasetError> {
        let recording = store
            .recording(material, index)
            .ok_or(DatasetError::SensorOutOfRange(index))?;
        let functions = store
            .bank()
            .sensor(material, index)
            .cloned()
            .ok_or(DatasetError::SensorOutOfRange(index))?;
        let segments = extract_all(recording, store.labels(material), material, index)?;
        log::debug!(
            "built {material} sensor {index} with {} label segments",
            segments.len()
        );
        Ok(Self {
            material,
            index,
            segments,
            functions,
        })
    }

    pub fn material(&self) -> Material {
        self.material
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn segments(&self) -> &[RawClassSegment] {
        &self.segments
    }

    /// Resample every segment, in label order. Nothing is cached between calls.
    pub fn interpolated_blocks(
        &self,
        force_num_samples: Option<usize>,
        include_types: &[ChannelType],
    ) -> Result<Vec<InterpolatedClassBlock>, DatasetError> {
        self.segments
            .iter()
            .map(|segment| {
                interpolate_segment(segment, &self.functions, force_num_samples, include_types)
            })
            .collect()
    }
}
