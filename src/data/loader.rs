use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use arrow::array::{Array, ArrayRef, Float32Array, Float64Array, Int32Array, Int64Array};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use super::interp::{InterpolationBank, LinearInterpolant};
use super::model::{
    ChannelType, HeaterStepTable, LabelSegment, Material, RawStore, SensorRecording,
    HEATER_STEPS, NUM_MATERIALS, SENSORS_PER_MATERIAL,
};

/// Time column of every heater-step table.
pub const TIME_COLUMN: &str = "Time Since PowerOn";

/// Columns of a heater-step table, in storage order.
pub fn table_columns() -> [&'static str; 5] {
    [
        TIME_COLUMN,
        ChannelType::Gas.column(),
        ChannelType::Temperature.column(),
        ChannelType::Pressure.column(),
        ChannelType::RelativeHumidity.column(),
    ]
}

/// Table extensions tried, in order, when looking for a heater-step file.
const TABLE_EXTENSIONS: [&str; 4] = ["parquet", "pq", "csv", "json"];

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load the three raw payloads from a directory laid out as
///
/// ```text
/// <dir>/labels.json
/// <dir>/interpolation_functions.json
/// <dir>/sensor_data/mat_<m>/sensor_<s>/heater_step_<h>.{parquet,csv,json}
/// ```
pub fn load_raw_store(dir: &Path) -> Result<RawStore> {
    let labels = load_labels(&dir.join("labels.json"))?;
    let bank = load_interpolation_bank(&dir.join("interpolation_functions.json"))?;

    let mut recordings: [Vec<SensorRecording>; NUM_MATERIALS] = Default::default();
    for material in Material::ALL {
        for sensor in 0..SENSORS_PER_MATERIAL {
            let steps = (0..HEATER_STEPS)
                .map(|step| {
                    let path = find_table(dir, material, sensor, step)?;
                    load_heater_step_table(&path)
                })
                .collect::<Result<Vec<_>>>()?;
            recordings[material.index()].push(SensorRecording::new(steps)?);
        }
    }

    log::info!("Loaded raw store from {}", dir.display());
    Ok(RawStore::new(recordings, labels, bank)?)
}

/// Path stem of one heater-step table, without extension.
pub fn table_stem(dir: &Path, material: Material, sensor: usize, step: usize) -> PathBuf {
    dir.join("sensor_data")
        .join(material.key())
        .join(format!("sensor_{sensor}"))
        .join(format!("heater_step_{step}"))
}

fn find_table(dir: &Path, material: Material, sensor: usize, step: usize) -> Result<PathBuf> {
    let stem = table_stem(dir, material, sensor, step);
    TABLE_EXTENSIONS
        .iter()
        .map(|ext| stem.with_extension(ext))
        .find(|p| p.is_file())
        .with_context(|| format!("no heater-step table at {}.*", stem.display()))
}

/// Load one heater-step table.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – one numeric column per table column (recommended)
/// * `.csv`     – header row with the table column names
/// * `.json`    – `{ "<column>": [...], ... }` or `[{ "<column>": v, ... }, ...]`
pub fn load_heater_step_table(path: &Path) -> Result<HeaterStepTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let columns = match ext.as_str() {
        "parquet" | "pq" => load_parquet_columns(path),
        "json" => load_json_columns(path),
        "csv" => load_csv_columns(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
    .with_context(|| format!("loading {}", path.display()))?;

    let [time, gas, temperature, pressure, relative_humidity] = columns;
    Ok(HeaterStepTable::new(
        time,
        gas,
        temperature,
        pressure,
        relative_humidity,
    )?)
}

/// Labels keyed by material:
///
/// ```json
/// { "mat_0": [ { "start": 10.0, "end": 250.0, "label": 1, "target": 0.5 }, ... ],
///   "mat_1": [ ... ] }
/// ```
///
/// A missing or `null` target becomes NaN.
pub fn load_labels(path: &Path) -> Result<[Vec<LabelSegment>; NUM_MATERIALS]> {
    let text = std::fs::read_to_string(path).context("reading labels file")?;
    let by_key: BTreeMap<String, Vec<LabelSegment>> =
        serde_json::from_str(&text).context("parsing labels JSON")?;

    let mut labels: [Vec<LabelSegment>; NUM_MATERIALS] = Default::default();
    for (key, segments) in by_key {
        let material =
            Material::from_key(&key).with_context(|| format!("unknown material key '{key}'"))?;
        labels[material.index()] = segments;
    }
    for material in Material::ALL {
        if labels[material.index()].is_empty() {
            log::warn!("no label segments for {material}");
        }
    }
    Ok(labels)
}

#[derive(Deserialize)]
struct KnotTable {
    x: Vec<f64>,
    y: Vec<f64>,
}

type SensorKnots = Vec<BTreeMap<ChannelType, KnotTable>>;

/// Knot tables keyed by material, then sensor, then heater step, then
/// channel name:
///
/// ```json
/// { "mat_0": [ [ { "gas": { "x": [...], "y": [...] }, "temp": {...} }, ... ], ... ] }
/// ```
pub fn load_interpolation_bank(path: &Path) -> Result<InterpolationBank> {
    let text = std::fs::read_to_string(path).context("reading interpolation function file")?;
    let by_key: BTreeMap<String, Vec<SensorKnots>> =
        serde_json::from_str(&text).context("parsing interpolation function JSON")?;

    let mut bank = InterpolationBank::new();
    let mut count = 0usize;
    for (key, sensors) in by_key {
        let material =
            Material::from_key(&key).with_context(|| format!("unknown material key '{key}'"))?;
        for (sensor, steps) in sensors.into_iter().enumerate() {
            for (step, channels) in steps.into_iter().enumerate() {
                for (channel, knots) in channels {
                    let function = LinearInterpolant::new(knots.x, knots.y).with_context(|| {
                        format!("{material} sensor {sensor} heater step {step} channel {channel}")
                    })?;
                    bank.insert(material, sensor, step, channel, function)?;
                    count += 1;
                }
            }
        }
    }
    log::info!("Loaded {count} interpolation functions");
    Ok(bank)
}

// ---------------------------------------------------------------------------
// JSON tables
// ---------------------------------------------------------------------------

fn load_json_columns(path: &Path) -> Result<[Vec<f64>; 5]> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let mut columns: [Vec<f64>; 5] = Default::default();
    match &root {
        JsonValue::Object(obj) => {
            for (slot, name) in columns.iter_mut().zip(table_columns()) {
                let values = obj
                    .get(name)
                    .and_then(|v| v.as_array())
                    .with_context(|| format!("missing or invalid '{name}' array"))?;
                *slot = values
                    .iter()
                    .enumerate()
                    .map(|(j, v)| json_number(v).with_context(|| format!("{name}[{j}]: not a number")))
                    .collect::<Result<_>>()?;
            }
        }
        JsonValue::Array(records) => {
            for (i, rec) in records.iter().enumerate() {
                let obj = rec
                    .as_object()
                    .with_context(|| format!("Row {i} is not a JSON object"))?;
                for (slot, name) in columns.iter_mut().zip(table_columns()) {
                    let value = obj
                        .get(name)
                        .and_then(json_number)
                        .with_context(|| format!("Row {i}: missing or invalid '{name}'"))?;
                    slot.push(value);
                }
            }
        }
        _ => bail!("Expected a JSON object of columns or an array of records"),
    }
    Ok(columns)
}

/// Numbers as-is, `null` as NaN.
fn json_number(val: &JsonValue) -> Option<f64> {
    match val {
        JsonValue::Null => Some(f64::NAN),
        other => other.as_f64(),
    }
}

// ---------------------------------------------------------------------------
// CSV tables
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, one sample per row.
/// Extra columns are ignored; an empty cell reads as NaN.
fn load_csv_columns(path: &Path) -> Result<[Vec<f64>; 5]> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut positions = [0usize; 5];
    for (slot, name) in positions.iter_mut().zip(table_columns()) {
        *slot = headers
            .iter()
            .position(|h| h == name)
            .with_context(|| format!("CSV missing '{name}' column"))?;
    }

    let mut columns: [Vec<f64>; 5] = Default::default();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        for ((column, &pos), name) in columns.iter_mut().zip(&positions).zip(table_columns()) {
            let cell = record.get(pos).unwrap_or("").trim();
            let value = if cell.is_empty() {
                f64::NAN
            } else {
                cell.parse::<f64>()
                    .with_context(|| format!("Row {row_no}, {name}: '{cell}' is not a number"))?
            };
            column.push(value);
        }
    }
    Ok(columns)
}

// ---------------------------------------------------------------------------
// Parquet tables
// ---------------------------------------------------------------------------

/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`). Nulls read as NaN.
fn load_parquet_columns(path: &Path) -> Result<[Vec<f64>; 5]> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut columns: [Vec<f64>; 5] = Default::default();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();
        for (slot, name) in columns.iter_mut().zip(table_columns()) {
            let idx = schema
                .index_of(name)
                .map_err(|_| anyhow::anyhow!("Parquet file missing '{name}' column"))?;
            extend_f64(slot, batch.column(idx)).with_context(|| format!("column '{name}'"))?;
        }
    }
    Ok(columns)
}

/// Append a numeric Arrow column to `out` as `f64`.
fn extend_f64(out: &mut Vec<f64>, col: &ArrayRef) -> Result<()> {
    match col.data_type() {
        DataType::Float64 => {
            let arr = downcast::<Float64Array>(col)?;
            out.extend(arr.iter().map(|v| v.unwrap_or(f64::NAN)));
        }
        DataType::Float32 => {
            let arr = downcast::<Float32Array>(col)?;
            out.extend(arr.iter().map(|v| v.map_or(f64::NAN, f64::from)));
        }
        DataType::Int64 => {
            let arr = downcast::<Int64Array>(col)?;
            out.extend(arr.iter().map(|v| v.map_or(f64::NAN, |i| i as f64)));
        }
        DataType::Int32 => {
            let arr = downcast::<Int32Array>(col)?;
            out.extend(arr.iter().map(|v| v.map_or(f64::NAN, f64::from)));
        }
        other => bail!("Expected a numeric column, got {other:?}"),
    }
    Ok(())
}

fn downcast<T: Array + 'static>(col: &ArrayRef) -> Result<&T> {
    col.as_any()
        .downcast_ref::<T>()
        .with_context(|| format!("unexpected array type {:?}", col.data_type()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn csv_table_reads_named_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "step.csv",
            "Index,Time Since PowerOn,Filtered_Gas,Filtered_Temperature,Filtered_Pressure,Filtered_Relative_Humidity\n\
             0,1.0,100.5,25.0,1013.0,40.0\n\
             1,2.0,,25.5,1013.5,41.0\n",
        );
        let table = load_heater_step_table(&path).unwrap();
        assert_eq!(table.time(), &[1.0, 2.0]);
        assert_eq!(table.channel(ChannelType::Gas)[0], 100.5);
        assert!(table.channel(ChannelType::Gas)[1].is_nan());
        assert_eq!(table.channel(ChannelType::RelativeHumidity), &[40.0, 41.0]);
    }

    #[test]
    fn json_table_accepts_columns_and_records() {
        let dir = tempfile::tempdir().unwrap();
        let columns = write(
            dir.path(),
            "columns.json",
            r#"{"Time Since PowerOn": [0.0, 1.0], "Filtered_Gas": [5.0, 6.0],
                "Filtered_Temperature": [1.0, 1.0], "Filtered_Pressure": [2.0, 2.0],
                "Filtered_Relative_Humidity": [3.0, 3.0]}"#,
        );
        let records = write(
            dir.path(),
            "records.json",
            r#"[{"Time Since PowerOn": 0.0, "Filtered_Gas": 5.0, "Filtered_Temperature": 1.0,
                 "Filtered_Pressure": 2.0, "Filtered_Relative_Humidity": 3.0},
                {"Time Since PowerOn": 1.0, "Filtered_Gas": 6.0, "Filtered_Temperature": 1.0,
                 "Filtered_Pressure": 2.0, "Filtered_Relative_Humidity": 3.0}]"#,
        );
        assert_eq!(
            load_heater_step_table(&columns).unwrap(),
            load_heater_step_table(&records).unwrap()
        );
    }

    #[test]
    fn missing_column_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "bad.csv", "Time Since PowerOn,Filtered_Gas\n0.0,1.0\n");
        let err = load_heater_step_table(&path).unwrap_err();
        assert!(format!("{err:#}").contains("Filtered_Temperature"));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        assert!(load_heater_step_table(Path::new("table.xlsx")).is_err());
    }

    #[test]
    fn labels_are_indexed_by_material() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "labels.json",
            r#"{"mat_1": [{"start": 0.0, "end": 5.0, "label": 2, "target": null},
                          {"start": 6.0, "end": 9.0, "label": 3, "target": 0.7}]}"#,
        );
        let labels = load_labels(&path).unwrap();
        assert!(labels[0].is_empty());
        assert_eq!(labels[1].len(), 2);
        assert!(labels[1][0].target.is_nan());
        assert_eq!(labels[1][1].class, 3);

        let bad = write(dir.path(), "bad.json", r#"{"mat_7": []}"#);
        assert!(load_labels(&bad).is_err());
    }

    #[test]
    fn bank_builds_linear_interpolants() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "interp.json",
            r#"{"mat_0": [[{"gas": {"x": [0.0, 10.0], "y": [0.0, 100.0]}}]]}"#,
        );
        let bank = load_interpolation_bank(&path).unwrap();
        let f = bank.sensor(Material::Zero, 0).unwrap().get(0, ChannelType::Gas).unwrap();
        assert_eq!(f.evaluate(&[2.5, 20.0]), vec![25.0, 100.0]);

        let bad = write(
            dir.path(),
            "bad_interp.json",
            r#"{"mat_0": [[{"gas": {"x": [0.0, 10.0], "y": [0.0]}}]]}"#,
        );
        assert!(load_interpolation_bank(&bad).is_err());
    }
}
