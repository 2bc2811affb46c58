/// Stride needed so that `window_seconds` of signal fits in `max_points`.
///
/// Always at least 1. Negative windows are a caller error and are rejected before
/// this is reached.
pub fn compute_decimation(window_seconds: f64, sample_rate: u32, max_points: usize) -> usize {
    let total_samples = window_seconds * f64::from(sample_rate);
    let stride = (total_samples / max_points.max(1) as f64).ceil();
    if stride.is_finite() && stride > 1.0 {
        stride as usize
    } else {
        1
    }
}
