mod common;

use std::sync::{Arc, Mutex};

use log::{Level, LevelFilter, Log, Metadata, Record};

use common::{labels, store_with_labels};
use sensor_dataset::{Dataset, LabelSegment, Material, PairOptions};

/// Keeps every warning so the test can inspect it.
struct WarningLog {
    messages: Mutex<Vec<String>>,
}

impl Log for WarningLog {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Warn
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            if let Ok(mut messages) = self.messages.lock() {
                messages.push(record.args().to_string());
            }
        }
    }

    fn flush(&self) {}
}

static WARNINGS: WarningLog = WarningLog {
    messages: Mutex::new(Vec::new()),
};

fn warnings() -> Vec<String> {
    WARNINGS.messages.lock().unwrap().clone()
}

#[test]
fn sorting_sensors_with_repeated_classes_warns() {
    log::set_logger(&WARNINGS).unwrap();
    log::set_max_level(LevelFilter::Warn);

    let repeated = vec![
        LabelSegment::new(2, 0.1, 5.0, 15.0),
        LabelSegment::new(1, 0.2, 20.0, 30.0),
        LabelSegment::new(2, 0.3, 40.0, 50.0),
    ];
    let ds = Dataset::new(Arc::new(store_with_labels([labels(Material::Zero), repeated]))).unwrap();

    // unsorted queries and materials without repeats stay quiet
    ds.get_sensor_pair(1, &[4, 6], &PairOptions::default()).unwrap();
    ds.get_sensor_pair(0, &[4, 6], &PairOptions::default().with_sort_by_class(true))
        .unwrap();
    assert!(warnings().is_empty());

    ds.get_sensor_pair(1, &[4, 6], &PairOptions::default().with_sort_by_class(true))
        .unwrap();
    let warnings = warnings();
    assert_eq!(warnings.len(), 2);
    assert!(warnings[0].contains("mat_1 sensor 4") && warnings[0].contains("class 2"));
    assert!(warnings[1].contains("mat_1 sensor 6"));
}
