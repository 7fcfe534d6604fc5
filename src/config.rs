//! Query options for dataset assembly.

use serde::{Deserialize, Serialize};

use crate::data::filter::ClassSubset;
use crate::data::model::ChannelType;

/// Options shared by single-sensor and sensor-pair queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryOptions {
    /// Grid length per label segment. `None` (or `Some(0)`) uses the largest
    /// raw sample count among the segment's heater steps.
    pub num_samples: Option<usize>,
    /// Apply the natural log to the assembled feature matrix.
    pub as_log: bool,
    /// Channel types to evaluate, in feature-row order.
    pub include_types: Vec<ChannelType>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            num_samples: None,
            as_log: false,
            include_types: vec![ChannelType::Gas],
        }
    }
}

impl QueryOptions {
    pub fn with_num_samples(mut self, num_samples: usize) -> Self {
        self.num_samples = Some(num_samples);
        self
    }

    pub fn with_log(mut self, as_log: bool) -> Self {
        self.as_log = as_log;
        self
    }

    pub fn with_types(mut self, include_types: impl Into<Vec<ChannelType>>) -> Self {
        self.include_types = include_types.into();
        self
    }

    /// The forced grid length, if any. Zero counts as not forced.
    pub fn forced_num_samples(&self) -> Option<usize> {
        self.num_samples.filter(|&n| n > 0)
    }
}

/// Options for a sensor-pair query.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PairOptions {
    #[serde(flatten)]
    pub query: QueryOptions,
    /// Average the two sensors instead of stacking their rows.
    pub as_mean: bool,
    /// Sort each sensor's segments by class before pairing them by position.
    pub sort_by_class: bool,
    /// Keep only segments of these classes.
    pub class_subset: Option<ClassSubset>,
}

impl PairOptions {
    pub fn with_query(mut self, query: QueryOptions) -> Self {
        self.query = query;
        self
    }

    pub fn with_mean(mut self, as_mean: bool) -> Self {
        self.as_mean = as_mean;
        self
    }

    pub fn with_sort_by_class(mut self, sort_by_class: bool) -> Self {
        self.sort_by_class = sort_by_class;
        self
    }

    pub fn with_class_subset(mut self, classes: impl IntoIterator<Item = i32>) -> Self {
        self.class_subset = Some(classes.into_iter().collect());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_fresh_gas_only() {
        let mut a = QueryOptions::default();
        a.include_types.push(ChannelType::Pressure);
        assert_eq!(QueryOptions::default().include_types, vec![ChannelType::Gas]);
    }

    #[test]
    fn zero_samples_is_not_forced() {
        assert_eq!(QueryOptions::default().with_num_samples(0).forced_num_samples(), None);
        assert_eq!(QueryOptions::default().with_num_samples(50).forced_num_samples(), Some(50));
    }

    #[test]
    fn pair_preset_from_json() {
        let opts: PairOptions = serde_json::from_str(
            r#"{"num_samples": 100, "as_log": true, "include_types": ["gas", "temp", "rh", "press"],
                "class_subset": [1, 2, 3, 4]}"#,
        )
        .unwrap();
        assert_eq!(opts.query.num_samples, Some(100));
        assert!(opts.query.as_log);
        assert_eq!(opts.query.include_types.len(), 4);
        assert_eq!(opts.query.include_types[2], ChannelType::RelativeHumidity);
        assert!(!opts.as_mean && !opts.sort_by_class);
        assert_eq!(opts.class_subset.unwrap().len(), 4);
    }
}
