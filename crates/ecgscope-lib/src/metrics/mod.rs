pub mod distribution;
pub mod events;
pub mod spectrum;
pub mod stats;

/// Round `value` to `digits` decimal places for display.
pub fn round_to(value: f64, digits: i32) -> f64 {
    let scale = 10f64.powi(digits);
    (value * scale).round() / scale
}
