//! Interpolation on regular lat/lon slices.
//!
//! Positions are fractional indices into a slice of `width * height`
//! values. Coordinates outside the axes clamp to the nearest edge instead
//! of producing NaN.

/// Fractional index of `value` on a monotonic axis, clamped to the axis.
///
/// Works for ascending and descending axes (CAMS latitudes run north to
/// south).
pub fn axis_position(axis: &[f64], value: f64) -> f64 {
    let n = axis.len();
    if n < 2 {
        return 0.0;
    }
    let descending = axis[0] > axis[n - 1];
    let key = |x: f64| if descending { -x } else { x };
    let target = key(value);

    if target <= key(axis[0]) {
        return 0.0;
    }
    if target >= key(axis[n - 1]) {
        return (n - 1) as f64;
    }

    // Number of points at or before the target; at least 1 here
    let i = axis.partition_point(|&a| key(a) <= target) - 1;
    let lo = key(axis[i]);
    let hi = key(axis[i + 1]);
    i as f64 + (target - lo) / (hi - lo)
}

/// Index of the axis point nearest to `value`.
pub fn nearest_index(axis: &[f64], value: f64) -> usize {
    let position = axis_position(axis, value).round() as usize;
    position.min(axis.len().saturating_sub(1))
}

/// Bilinear interpolation between the four grid points around `(x, y)`.
pub fn bilinear_interpolate(data: &[f32], width: usize, height: usize, x: f64, y: f64) -> f32 {
    let x = x.clamp(0.0, (width - 1) as f64);
    let y = y.clamp(0.0, (height - 1) as f64);

    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);

    let xf = (x - x0 as f64) as f32;
    let yf = (y - y0 as f64) as f32;

    let v00 = data[y0 * width + x0];
    let v10 = data[y0 * width + x1];
    let v01 = data[y1 * width + x0];
    let v11 = data[y1 * width + x1];

    // A missing corner makes the whole sample missing
    if v00.is_nan() || v10.is_nan() || v01.is_nan() || v11.is_nan() {
        return f32::NAN;
    }

    let top = v00 * (1.0 - xf) + v10 * xf;
    let bottom = v01 * (1.0 - xf) + v11 * xf;
    top * (1.0 - yf) + bottom * yf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_position_ascending() {
        let axis = [0.0, 10.0, 20.0];
        assert_eq!(axis_position(&axis, 0.0), 0.0);
        assert_eq!(axis_position(&axis, 5.0), 0.5);
        assert_eq!(axis_position(&axis, 20.0), 2.0);
        assert_eq!(axis_position(&axis, 25.0), 2.0);
        assert_eq!(axis_position(&axis, -5.0), 0.0);
    }

    #[test]
    fn test_axis_position_descending() {
        let axis = [90.0, 45.0, 0.0, -45.0, -90.0];
        assert_eq!(axis_position(&axis, 90.0), 0.0);
        assert_eq!(axis_position(&axis, 67.5), 0.5);
        assert_eq!(axis_position(&axis, 0.0), 2.0);
        assert_eq!(axis_position(&axis, -90.0), 4.0);
        assert_eq!(axis_position(&axis, -100.0), 4.0);
    }

    #[test]
    fn test_nearest_index() {
        let axis = [90.0, 45.0, 0.0];
        assert_eq!(nearest_index(&axis, 50.0), 1);
        assert_eq!(nearest_index(&axis, 10.0), 2);
        assert_eq!(nearest_index(&[3.0], 100.0), 0);
    }

    #[test]
    fn test_bilinear_center() {
        let data = [0.0, 1.0, 2.0, 3.0];
        assert_eq!(bilinear_interpolate(&data, 2, 2, 0.5, 0.5), 1.5);
        assert_eq!(bilinear_interpolate(&data, 2, 2, 1.0, 1.0), 3.0);
    }

    #[test]
    fn test_bilinear_clamps_outside() {
        let data = [0.0, 1.0, 2.0, 3.0];
        assert_eq!(bilinear_interpolate(&data, 2, 2, -3.0, 0.0), 0.0);
        assert_eq!(bilinear_interpolate(&data, 2, 2, 7.0, 9.0), 3.0);
    }
}
