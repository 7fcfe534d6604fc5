use std::collections::BTreeSet;

use ndarray::{Array1, Array2, Axis};

use crate::error::DatasetError;

// ---------------------------------------------------------------------------
// Class filter: which label classes a pair query keeps
// ---------------------------------------------------------------------------

/// Set of class labels a query keeps.
pub type ClassSubset = BTreeSet<i32>;

/// Whether a segment of class `class` passes the subset filter.
///
/// * No subset → passes (no constraint)
/// * Empty subset → passes, an empty selection is treated as "no filter"
/// * Otherwise the class must be in the subset
pub fn class_selected(subset: Option<&ClassSubset>, class: i32) -> bool {
    match subset {
        Some(classes) if !classes.is_empty() => classes.contains(&class),
        _ => true,
    }
}

// ---------------------------------------------------------------------------
// Regression clean-up: drop rows whose target is missing
// ---------------------------------------------------------------------------

/// Indices of rows whose target is present (not NaN).
pub fn present_target_rows(targets: &Array1<f64>) -> Vec<usize> {
    targets
        .iter()
        .enumerate()
        .filter(|(_, t)| !t.is_nan())
        .map(|(i, _)| i)
        .collect()
}

/// Drop every row of `x` whose target is NaN, keeping row correspondence
/// between the surviving features and targets.
pub fn clean_regression_data(
    x: &Array2<f64>,
    targets: &Array1<f64>,
) -> Result<(Array2<f64>, Array1<f64>), DatasetError> {
    if x.nrows() != targets.len() {
        return Err(DatasetError::RowCountMismatch {
            expected: x.nrows(),
            actual: targets.len(),
        });
    }
    let keep = present_target_rows(targets);
    Ok((x.select(Axis(0), &keep), targets.select(Axis(0), &keep)))
}
