use crate::signal::{Lead, WindowedSeries, SAMPLE_RATE};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpectrumBin {
    pub frequency: f64,
    /// Magnitude relative to the strongest bin, 0..=100.
    pub magnitude_percent: f64,
}

/// Normalised magnitude spectrum of `lead` over the window.
///
/// The lead is truncated to the largest power of two, Hann-windowed and transformed;
/// frequencies are reported against the nominal recording rate.
pub fn spectrogram(series: &WindowedSeries, lead: Lead) -> Vec<SpectrumBin> {
    spectrogram_values(&series.lead_values(lead), f64::from(SAMPLE_RATE))
}

pub fn spectrogram_values(values: &[f64], sample_rate: f64) -> Vec<SpectrumBin> {
    let (frequencies, magnitudes) = magnitude_spectrum(values, sample_rate);
    let peak = magnitudes.iter().copied().fold(0.0, f64::max);
    frequencies
        .into_iter()
        .zip(magnitudes)
        .map(|(frequency, magnitude)| SpectrumBin {
            frequency,
            // silent input: report zeros instead of 0/0
            magnitude_percent: if peak > 0.0 {
                magnitude / peak * 100.0
            } else {
                0.0
            },
        })
        .collect()
}

/// `(frequencies, magnitudes)` for the first half of the spectrum, magnitudes scaled by 1/n.
pub fn magnitude_spectrum(values: &[f64], sample_rate: f64) -> (Vec<f64>, Vec<f64>) {
    let n = largest_power_of_two(values.len());
    if n <= 1 {
        return (Vec::new(), Vec::new());
    }
    let mut re = values[..n].to_vec();
    let mut im = vec![0.0; n];
    apply_hann(&mut re);
    fft_in_place(&mut re, &mut im);

    let half = n / 2;
    let frequencies = (0..half).map(|i| i as f64 * sample_rate / n as f64).collect();
    let magnitudes = (0..half)
        .map(|i| (re[i] * re[i] + im[i] * im[i]).sqrt() / n as f64)
        .collect();
    (frequencies, magnitudes)
}

fn largest_power_of_two(len: usize) -> usize {
    if len == 0 {
        0
    } else {
        1 << (usize::BITS - 1 - len.leading_zeros())
    }
}

/// Symmetric Hann window, `0.5 - 0.5 cos(2πi / (n - 1))`.
pub fn apply_hann(frame: &mut [f64]) {
    let n = frame.len();
    if n < 2 {
        return;
    }
    let denom = (n - 1) as f64;
    for (i, x) in frame.iter_mut().enumerate() {
        *x *= 0.5 - 0.5 * (2.0 * PI * i as f64 / denom).cos();
    }
}

/// Iterative radix-2 Cooley–Tukey forward transform. Length must be a power of two.
pub fn fft_in_place(re: &mut [f64], im: &mut [f64]) {
    let n = re.len();
    debug_assert_eq!(n, im.len());
    debug_assert!(n.is_power_of_two());
    if n < 2 {
        return;
    }

    // bit-reversal permutation
    let bits = n.trailing_zeros();
    for i in 0..n {
        let j = i.reverse_bits() >> (usize::BITS - bits);
        if j > i {
            re.swap(i, j);
            im.swap(i, j);
        }
    }

    let mut size = 2;
    while size <= n {
        let half = size / 2;
        let table_step = n / size;
        for start in (0..n).step_by(size) {
            for j in 0..half {
                let angle = 2.0 * PI * (j * table_step) as f64 / n as f64;
                let (sin, cos) = angle.sin_cos();
                let (a, b) = (start + j, start + j + half);
                let tre = re[b] * cos + im[b] * sin;
                let tim = -re[b] * sin + im[b] * cos;
                re[b] = re[a] - tre;
                im[b] = im[a] - tim;
                re[a] += tre;
                im[a] += tim;
            }
        }
        size *= 2;
    }
}
