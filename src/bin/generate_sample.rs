use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use serde_json::{json, Map, Value as JsonValue};

use sensor_dataset::data::loader::{load_raw_store, table_columns, table_stem};
use sensor_dataset::{
    ChannelType, Dataset, LabelSegment, Material, HEATER_STEPS, SENSORS_PER_MATERIAL,
};

/// Seconds covered by every synthetic recording.
const DURATION: f64 = 1200.0;
/// Mean gap between raw samples of one heater step.
const MEAN_PERIOD: f64 = 2.0;
/// Knot spacing of the generated interpolation tables.
const KNOT_SPACING: f64 = 5.0;

/// Deterministic noise source (splitmix64), seeded so reruns write the same store.
struct Noise(u64);

impl Noise {
    /// Uniform in `[0, 1)`.
    fn uniform(&mut self) -> f64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        ((z ^ (z >> 31)) >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Zero-mean normal sample (Box-Muller).
    fn normal(&mut self, std_dev: f64) -> f64 {
        let u1 = self.uniform().max(1e-15);
        let u2 = self.uniform();
        std_dev * (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
    }
}

/// Label windows shared by all sensors of a material: alternating exposure
/// to classes 1..=4, with every third target left missing.
fn labels_for(material: Material) -> Vec<LabelSegment> {
    let offset = material.index() as f64 * 7.0;
    (0..8)
        .map(|i| {
            let start = 60.0 + offset + i as f64 * 140.0;
            let class = (i % 4) as i32 + 1;
            let target = if i % 3 == 2 { f64::NAN } else { class as f64 * 0.25 };
            LabelSegment::new(class, target, start, start + 100.0)
        })
        .collect()
}

/// Noise-free channel level at time `t`.
fn signal(
    labels: &[LabelSegment],
    sensor: usize,
    step: usize,
    channel: ChannelType,
    t: f64,
) -> f64 {
    match channel {
        ChannelType::Gas => {
            let baseline = 50_000.0 + 4_000.0 * sensor as f64 + 2_500.0 * step as f64;
            let response = labels
                .iter()
                .find(|l| l.contains(t))
                .map(|l| 1.0 - 0.08 * l.class as f64)
                .unwrap_or(1.0);
            baseline * response
        }
        ChannelType::Temperature => 24.0 + 0.002 * t + 0.1 * step as f64,
        ChannelType::Pressure => 1013.0 + 0.5 * (t / 300.0).sin(),
        ChannelType::RelativeHumidity => 40.0 + 5.0 * (t / 450.0).cos(),
    }
}

fn write_table(path: &Path, columns: Vec<Vec<f64>>) -> Result<()> {
    let fields: Vec<Field> = table_columns()
        .iter()
        .map(|name| Field::new(*name, DataType::Float64, false))
        .collect();
    let schema = Arc::new(Schema::new(fields));
    let arrays = columns
        .into_iter()
        .map(|c| Arc::new(Float64Array::from(c)) as ArrayRef)
        .collect();
    let batch = RecordBatch::try_new(schema.clone(), arrays).context("building record batch")?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing writer")?;
    Ok(())
}

fn knot_table(labels: &[LabelSegment], sensor: usize, step: usize, channel: ChannelType) -> JsonValue {
    let count = (DURATION / KNOT_SPACING) as usize + 1;
    let x: Vec<f64> = (0..count).map(|i| i as f64 * KNOT_SPACING).collect();
    let y: Vec<f64> = x
        .iter()
        .map(|&t| signal(labels, sensor, step, channel, t))
        .collect();
    json!({ "x": x, "y": y })
}

fn main() -> Result<()> {
    env_logger::init();

    let out_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("sample_store"));
    let mut noise = Noise(42);

    let mut labels_json = Map::new();
    let mut bank_json = Map::new();

    for material in Material::ALL {
        let labels = labels_for(material);
        let mut sensors = Vec::with_capacity(SENSORS_PER_MATERIAL);

        for sensor in 0..SENSORS_PER_MATERIAL {
            let mut steps = Vec::with_capacity(HEATER_STEPS);
            for step in 0..HEATER_STEPS {
                // irregular sampling: jittered period, different per heater step
                let mut time = Vec::new();
                let mut t = noise.uniform() * MEAN_PERIOD;
                while t <= DURATION {
                    time.push(t);
                    t += MEAN_PERIOD * (0.5 + noise.uniform());
                }

                let mut columns = vec![time.clone()];
                for channel in ChannelType::ALL {
                    let values = time
                        .iter()
                        .map(|&t| {
                            let clean = signal(&labels, sensor, step, channel, t);
                            clean + noise.normal(clean.abs() * 0.002)
                        })
                        .collect();
                    columns.push(values);
                }
                let path = table_stem(&out_dir, material, sensor, step).with_extension("parquet");
                write_table(&path, columns)?;

                let channels: Map<String, JsonValue> = ChannelType::ALL
                    .into_iter()
                    .map(|c| (c.name().to_string(), knot_table(&labels, sensor, step, c)))
                    .collect();
                steps.push(JsonValue::Object(channels));
            }
            sensors.push(JsonValue::Array(steps));
        }

        labels_json.insert(material.key().to_string(), serde_json::to_value(&labels)?);
        bank_json.insert(material.key().to_string(), JsonValue::Array(sensors));
    }

    std::fs::write(
        out_dir.join("labels.json"),
        serde_json::to_string_pretty(&labels_json)?,
    )?;
    std::fs::write(
        out_dir.join("interpolation_functions.json"),
        serde_json::to_string(&bank_json)?,
    )?;

    // Read it all back to make sure the store is consistent.
    let dataset = Dataset::new(Arc::new(load_raw_store(&out_dir)?))?;
    let features = dataset.get_single_sensor(0, 0, &Default::default())?;
    println!(
        "Wrote sample store to {} ({} samples x {} features for mat_0 sensor 0)",
        out_dir.display(),
        features.num_samples(),
        features.num_features()
    );
    Ok(())
}
