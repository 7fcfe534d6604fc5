//! Per-channel affine calibration of one feature matrix onto another.

use ndarray::{Array1, Array2, Axis};

use crate::error::DatasetError;

/// Rescale and recenter `x_src` so each column's spread and mean match the
/// same column of `x_target`.
///
/// Columns are channels, rows are samples. Each column is first multiplied by
/// `std(target) / std(src)` (population standard deviation), then shifted by
/// the difference of the means. A source column with zero variance yields
/// non-finite values.
pub fn calibrate(x_src: &Array2<f64>, x_target: &Array2<f64>) -> Result<Array2<f64>, DatasetError> {
    if x_src.ncols() != x_target.ncols() {
        return Err(DatasetError::ChannelCountMismatch {
            expected: x_target.ncols(),
            actual: x_src.ncols(),
        });
    }

    let scale = x_target.std_axis(Axis(0), 0.0) / x_src.std_axis(Axis(0), 0.0);
    let scaled = x_src * &scale;
    let mean_diff = column_mean(&scaled) - column_mean(x_target);
    Ok(scaled - &mean_diff)
}

fn column_mean(x: &Array2<f64>) -> Array1<f64> {
    x.mean_axis(Axis(0))
        .unwrap_or_else(|| Array1::from_elem(x.ncols(), f64::NAN))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn assert_close(actual: &Array2<f64>, expected: &Array2<f64>) {
        assert_eq!(actual.dim(), expected.dim());
        for (a, e) in actual.iter().zip(expected.iter()) {
            assert_abs_diff_eq!(*a, *e, epsilon = 1e-9);
        }
    }

    #[test]
    fn identical_inputs_are_unchanged() {
        let x = array![[1.0, 5.0], [2.0, 7.0], [4.0, 6.5]];
        let out = calibrate(&x, &x).unwrap();
        assert_close(&out, &x);
    }

    #[test]
    fn matches_target_spread_and_mean() {
        let src = array![[10.0], [14.0], [20.0]];
        let target = array![[30.0], [38.0], [50.0]];
        let out = calibrate(&src, &target).unwrap();

        assert_abs_diff_eq!(
            out.std_axis(Axis(0), 0.0)[0],
            target.std_axis(Axis(0), 0.0)[0],
            epsilon = 1e-9
        );
        assert_abs_diff_eq!(column_mean(&out)[0], column_mean(&target)[0], epsilon = 1e-9);
        // same relative spread, so the result lands exactly on the target
        assert_close(&out, &target);
    }

    #[test]
    fn channels_are_independent() {
        let src = array![[0.0, 1.0], [2.0, 1.5], [4.0, 2.0]];
        let target = array![[10.0, -1.0], [20.0, -3.0], [30.0, -5.0]];
        let out = calibrate(&src, &target).unwrap();
        assert_abs_diff_eq!(column_mean(&out)[1], -3.0, epsilon = 1e-9);
        for (a, e) in out.column(0).iter().zip([10.0, 20.0, 30.0]) {
            assert_abs_diff_eq!(*a, e, epsilon = 1e-9);
        }
    }

    #[test]
    fn zero_variance_source_is_not_finite() {
        let src = array![[3.0], [3.0]];
        let target = array![[1.0], [2.0]];
        let out = calibrate(&src, &target).unwrap();
        assert!(out.iter().all(|v| !v.is_finite()));
    }

    #[test]
    fn channel_count_must_match() {
        let src = array![[1.0, 2.0]];
        let target = array![[1.0]];
        assert!(matches!(
            calibrate(&src, &target),
            Err(DatasetError::ChannelCountMismatch { expected: 1, actual: 2 })
        ));
    }
}
