//! Sensor catalog and dataset-wide feature assembly.

use std::collections::BTreeSet;
use std::sync::Arc;

use ndarray::{concatenate, Array1, Array2, Axis};

use crate::config::{PairOptions, QueryOptions};
use crate::data::filter::{class_selected, present_target_rows};
use crate::data::model::{Material, RawStore, HEATER_STEPS, NUM_MATERIALS, SENSORS_PER_MATERIAL};
use crate::error::DatasetError;
use crate::sensor::{InterpolatedClassBlock, Sensor};

// ---------------------------------------------------------------------------
// FeatureSet – the result of an assembly query
// ---------------------------------------------------------------------------

/// Assembled features: one row of `x` per resampled time point, and the
/// label, time and target of that row.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSet {
    /// `[samples, features]`.
    pub x: Array2<f64>,
    pub y: Array1<i32>,
    pub time: Array1<f64>,
    pub targets: Array1<f64>,
}

impl FeatureSet {
    pub fn num_samples(&self) -> usize {
        self.x.nrows()
    }

    pub fn num_features(&self) -> usize {
        self.x.ncols()
    }

    pub fn into_parts(self) -> (Array2<f64>, Array1<i32>, Array1<f64>, Array1<f64>) {
        (self.x, self.y, self.time, self.targets)
    }

    /// Drop every row whose target is NaN from all four arrays.
    pub fn without_missing_targets(&self) -> FeatureSet {
        let keep = present_target_rows(&self.targets);
        FeatureSet {
            x: self.x.select(Axis(0), &keep),
            y: self.y.select(Axis(0), &keep),
            time: self.time.select(Axis(0), &keep),
            targets: self.targets.select(Axis(0), &keep),
        }
    }
}

/// Collects per-segment blocks and joins them once at the end.
struct Assembly {
    num_features: usize,
    blocks: Vec<Array2<f64>>,
    y: Vec<i32>,
    time: Vec<f64>,
    targets: Vec<f64>,
}

impl Assembly {
    fn new(num_features: usize, capacity: usize) -> Self {
        Self {
            num_features,
            blocks: Vec::with_capacity(capacity),
            y: Vec::new(),
            time: Vec::new(),
            targets: Vec::new(),
        }
    }

    /// `features` is `[features, samples]` for the grid of `block`.
    fn push(&mut self, features: Array2<f64>, block: &InterpolatedClassBlock) {
        self.y.extend(block.y.iter().copied());
        self.time.extend(block.time.iter().copied());
        self.targets.extend(block.targets.iter().copied());
        self.blocks.push(features);
    }

    fn finish(self, as_log: bool) -> Result<FeatureSet, DatasetError> {
        let mut x = if self.blocks.is_empty() {
            Array2::zeros((self.num_features, 0))
        } else {
            let views: Vec<_> = self.blocks.iter().map(|b| b.view()).collect();
            concatenate(Axis(1), &views)?
        };
        if as_log {
            x.mapv_inplace(f64::ln);
        }
        Ok(FeatureSet {
            x: x.reversed_axes().as_standard_layout().into_owned(),
            y: Array1::from(self.y),
            time: Array1::from(self.time),
            targets: Array1::from(self.targets),
        })
    }
}

// ---------------------------------------------------------------------------
// Dataset – catalog of all sensors plus the assembly queries
// ---------------------------------------------------------------------------

/// Every sensor of both materials, built once from an injected [`RawStore`].
#[derive(Debug, Clone)]
pub struct Dataset {
    store: Arc<RawStore>,
    sensors: [Vec<Sensor>; NUM_MATERIALS],
}

impl Dataset {
    /// Build the 2 × 8 sensor catalog, extracting every label segment of every
    /// sensor. Fails if any label window is empty for any heater step.
    pub fn new(store: Arc<RawStore>) -> Result<Self, DatasetError> {
        let build = |material: Material| {
            (0..SENSORS_PER_MATERIAL)
                .map(|index| Sensor::build(&store, material, index))
                .collect::<Result<Vec<_>, _>>()
        };
        let sensors = [build(Material::Zero)?, build(Material::One)?];
        log::info!(
            "built sensor catalog: {} + {} label segments per sensor",
            store.labels(Material::Zero).len(),
            store.labels(Material::One).len()
        );
        Ok(Self { store, sensors })
    }

    pub fn store(&self) -> &RawStore {
        &self.store
    }

    /// Look up a sensor by material and sensor index.
    pub fn sensor(&self, material: usize, sensor: usize) -> Result<&Sensor, DatasetError> {
        let material = Material::try_from(material)?;
        self.sensors[material.index()]
            .get(sensor)
            .ok_or(DatasetError::SensorOutOfRange(sensor))
    }

    /// Features of one sensor across all its label segments, in label order.
    ///
    /// `x` has `10 * include_types.len()` columns.
    pub fn get_single_sensor(
        &self,
        material: usize,
        sensor: usize,
        options: &QueryOptions,
    ) -> Result<FeatureSet, DatasetError> {
        let sensor = self.sensor(material, sensor)?;
        let blocks =
            sensor.interpolated_blocks(options.forced_num_samples(), &options.include_types)?;

        let mut assembly = Assembly::new(HEATER_STEPS * options.include_types.len(), blocks.len());
        for mut block in blocks {
            let features = std::mem::take(&mut block.x);
            assembly.push(features, &block);
        }
        assembly.finish(options.as_log)
    }

    /// Features of two sensors of the same material, joined per label segment.
    ///
    /// `sensors` must hold exactly two indices. Each pair of segments must
    /// carry the same class and the same time grid, otherwise the whole query
    /// fails. With `as_mean` the two sensors are averaged
    /// (`10 * include_types.len()` columns); otherwise the first sensor's
    /// features come before the second's (`20 * include_types.len()` columns).
    ///
    /// With `sort_by_class`, segments are paired by position after a stable
    /// sort on class, which only lines up if every class occurs at most once
    /// per sensor.
    pub fn get_sensor_pair(
        &self,
        material: usize,
        sensors: &[usize],
        options: &PairOptions,
    ) -> Result<FeatureSet, DatasetError> {
        let &[first, second] = sensors else {
            return Err(DatasetError::PairArity(sensors.len()));
        };
        let first = self.sensor(material, first)?;
        let second = self.sensor(material, second)?;

        let query = &options.query;
        let force = query.forced_num_samples();
        let mut left_blocks = first.interpolated_blocks(force, &query.include_types)?;
        let mut right_blocks = second.interpolated_blocks(force, &query.include_types)?;

        if options.sort_by_class {
            warn_on_repeated_classes(first);
            warn_on_repeated_classes(second);
            left_blocks.sort_by_key(|b| b.class);
            right_blocks.sort_by_key(|b| b.class);
        }

        assemble_pair(&left_blocks, &right_blocks, options)
    }
}

/// Join two sensors' blocks position by position.
///
/// Fails on the first pair whose classes or time grids differ. Pairs whose
/// class is outside `options.class_subset` are skipped after that check.
pub fn assemble_pair(
    left_blocks: &[InterpolatedClassBlock],
    right_blocks: &[InterpolatedClassBlock],
    options: &PairOptions,
) -> Result<FeatureSet, DatasetError> {
    let query = &options.query;
    let per_sensor = HEATER_STEPS * query.include_types.len();
    let num_features = if options.as_mean { per_sensor } else { 2 * per_sensor };
    let mut assembly = Assembly::new(num_features, left_blocks.len());

    for (segment, (left, right)) in left_blocks.iter().zip(right_blocks).enumerate() {
        if left.class != right.class {
            return Err(DatasetError::ClassMismatch {
                segment,
                left: left.class,
                right: right.class,
            });
        }
        if left.time != right.time {
            return Err(DatasetError::TimeGridMismatch {
                segment,
                left_len: left.time.len(),
                right_len: right.time.len(),
            });
        }
        if !class_selected(options.class_subset.as_ref(), left.class) {
            continue;
        }

        let features = if options.as_mean {
            (&left.x + &right.x) / 2.0
        } else {
            concatenate(Axis(0), &[left.x.view(), right.x.view()])?
        };
        assembly.push(features, left);
    }
    assembly.finish(query.as_log)
}

/// First class that occurs a second time, in label order.
fn first_repeated_class(classes: impl IntoIterator<Item = i32>) -> Option<i32> {
    let mut seen = BTreeSet::new();
    classes.into_iter().find(|&class| !seen.insert(class))
}

fn warn_on_repeated_classes(sensor: &Sensor) {
    if let Some(repeated) = first_repeated_class(sensor.segments().iter().map(|s| s.class)) {
        log::warn!(
            "{} sensor {}: class {repeated} occurs more than once, sorted segments may pair up wrongly",
            sensor.material(),
            sensor.index()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::ChannelType;

    fn block(class: i32, time: &[f64], level: f64) -> InterpolatedClassBlock {
        let n = time.len();
        InterpolatedClassBlock {
            class,
            target: class as f64,
            start: time[0],
            end: time[n - 1],
            time: Array1::from(time.to_vec()),
            x: Array2::from_elem((HEATER_STEPS, n), level),
            y: Array1::from_elem(n, class),
            targets: Array1::from_elem(n, class as f64),
        }
    }

    #[test]
    fn differing_classes_abort_the_pairing() {
        let left = [block(1, &[0.0, 1.0], 1.0), block(2, &[2.0, 3.0], 1.0)];
        let right = [block(1, &[0.0, 1.0], 3.0), block(4, &[2.0, 3.0], 3.0)];
        let err = assemble_pair(&left, &right, &PairOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            DatasetError::ClassMismatch {
                segment: 1,
                left: 2,
                right: 4
            }
        ));
    }

    #[test]
    fn mismatch_outside_subset_still_fails() {
        let left = [block(1, &[0.0, 1.0], 1.0)];
        let right = [block(1, &[0.0, 1.5], 3.0)];
        let options = PairOptions::default().with_class_subset([9]);
        assert!(matches!(
            assemble_pair(&left, &right, &options),
            Err(DatasetError::TimeGridMismatch { segment: 0, .. })
        ));
    }

    #[test]
    fn differing_grid_lengths_are_a_grid_mismatch() {
        let left = [block(1, &[0.0, 0.5, 1.0], 1.0)];
        let right = [block(1, &[0.0, 1.0], 3.0)];
        assert!(matches!(
            assemble_pair(&left, &right, &PairOptions::default()),
            Err(DatasetError::TimeGridMismatch {
                segment: 0,
                left_len: 3,
                right_len: 2
            })
        ));
    }

    #[test]
    fn mean_and_stack_layouts() {
        let left = [block(1, &[0.0, 1.0], 1.0)];
        let right = [block(1, &[0.0, 1.0], 3.0)];

        let mean = assemble_pair(&left, &right, &PairOptions::default().with_mean(true)).unwrap();
        assert_eq!(mean.x.dim(), (2, HEATER_STEPS));
        assert!(mean.x.iter().all(|&v| v == 2.0));

        let stacked = assemble_pair(&left, &right, &PairOptions::default()).unwrap();
        assert_eq!(stacked.x.dim(), (2, 2 * HEATER_STEPS));
        assert_eq!(stacked.x[[1, HEATER_STEPS - 1]], 1.0);
        assert_eq!(stacked.x[[1, HEATER_STEPS]], 3.0);
    }

    #[test]
    fn repeated_classes_are_detected() {
        assert_eq!(first_repeated_class([3, 1, 2]), None);
        assert_eq!(first_repeated_class([2, 1, 2, 1]), Some(2));
        assert_eq!(first_repeated_class([4, 4]), Some(4));
        assert_eq!(first_repeated_class(Vec::new()), None);
    }

    #[test]
    fn everything_filtered_leaves_an_empty_set() {
        let left = [block(1, &[0.0, 1.0], 1.0)];
        let right = [block(1, &[0.0, 1.0], 3.0)];
        let options = PairOptions::default()
            .with_query(QueryOptions::default().with_types([ChannelType::Gas, ChannelType::Pressure]))
            .with_class_subset([5]);
        let out = assemble_pair(&left, &right, &options).unwrap();
        assert_eq!(out.x.dim(), (0, 4 * HEATER_STEPS));
        assert!(out.y.is_empty() && out.time.is_empty() && out.targets.is_empty());
    }
}
