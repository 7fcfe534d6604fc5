//! Synthetic raw store shared by the integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use sensor_dataset::{
    ChannelType, Dataset, HeaterStepTable, InterpolationBank, LabelSegment, Material, RawStore,
    SensorRecording, HEATER_STEPS, SENSORS_PER_MATERIAL,
};

/// Sensor whose raw tables are sampled twice as densely as the others.
pub const DENSE_SENSOR: usize = 1;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Gas level of `sensor` at heater step `step` and time `t`.
pub fn gas(sensor: usize, step: usize, t: f64) -> f64 {
    1000.0 * (sensor + 1) as f64 + 10.0 * step as f64 + t
}

pub fn labels(material: Material) -> Vec<LabelSegment> {
    match material {
        Material::Zero => vec![
            LabelSegment::new(1, 0.5, 10.0, 20.0),
            LabelSegment::new(2, f64::NAN, 30.0, 45.0),
            LabelSegment::new(3, 1.5, 50.0, 60.0),
        ],
        Material::One => vec![
            LabelSegment::new(3, 0.1, 5.0, 15.0),
            LabelSegment::new(1, 0.2, 20.0, 30.0),
            LabelSegment::new(2, 0.3, 40.0, 50.0),
        ],
    }
}

fn recording(sensor: usize) -> SensorRecording {
    let period = if sensor == DENSE_SENSOR { 0.5 } else { 1.0 };
    let count = (100.0 / period) as usize + 1;
    let time: Vec<f64> = (0..count).map(|i| i as f64 * period).collect();
    let steps = (0..HEATER_STEPS)
        .map(|step| {
            let n = time.len();
            HeaterStepTable::new(
                time.clone(),
                time.iter().map(|&t| gas(sensor, step, t)).collect(),
                vec![20.0 + step as f64; n],
                vec![1000.0; n],
                vec![40.0; n],
            )
            .unwrap()
        })
        .collect();
    SensorRecording::new(steps).unwrap()
}

pub fn bank() -> InterpolationBank {
    let mut bank = InterpolationBank::new();
    for material in Material::ALL {
        for sensor in 0..SENSORS_PER_MATERIAL {
            for step in 0..HEATER_STEPS {
                bank.insert(material, sensor, step, ChannelType::Gas, move |t: &[f64]| -> Vec<f64> {
                    t.iter().map(|&v| gas(sensor, step, v)).collect()
                })
                .unwrap();
                let temperature = 20.0 + step as f64;
                bank.insert(
                    material,
                    sensor,
                    step,
                    ChannelType::Temperature,
                    move |t: &[f64]| vec![temperature; t.len()],
                )
                .unwrap();
                bank.insert(material, sensor, step, ChannelType::Pressure, |t: &[f64]| {
                    vec![1000.0; t.len()]
                })
                .unwrap();
                bank.insert(
                    material,
                    sensor,
                    step,
                    ChannelType::RelativeHumidity,
                    |t: &[f64]| vec![40.0; t.len()],
                )
                .unwrap();
            }
        }
    }
    bank
}

pub fn store_with_labels(labels: [Vec<LabelSegment>; 2]) -> RawStore {
    let recordings = [
        (0..SENSORS_PER_MATERIAL).map(recording).collect(),
        (0..SENSORS_PER_MATERIAL).map(recording).collect(),
    ];
    RawStore::new(recordings, labels, bank()).unwrap()
}

pub fn dataset() -> Dataset {
    init_logging();
    let store = store_with_labels([labels(Material::Zero), labels(Material::One)]);
    Dataset::new(Arc::new(store)).unwrap()
}
