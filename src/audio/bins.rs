//! Grouping of FFT bins into equal-width bars.

use std::ops::Range;

use rustfft::num_complex::Complex;

/// Bin range covered by `bar` when `usable` bins are split into `num_bars` bars.
///
/// With fewer bins than bars each bar takes a single bin and bars past `usable` are empty.
pub fn bar_range(bar: usize, num_bars: usize, usable: usize) -> Range<usize> {
    let width = usable / num_bars.max(1);
    if width == 0 {
        return if bar < usable { bar..bar + 1 } else { 0..0 };
    }
    bar * width..(bar + 1) * width
}

/// Number of non-negative-frequency bins kept by `cutoff` (a fraction of Nyquist).
pub fn usable_bins(coefficients: usize, cutoff: f64) -> usize {
    let half = coefficients / 2;
    ((half as f64 * cutoff) as usize).min(half)
}

/// Mean magnitude per bar over the first half of `coefficients` up to `cutoff`.
/// `out.len()` sets the bar count.
pub fn average_bars(coefficients: &[Complex<f64>], cutoff: f64, out: &mut [f64]) {
    let usable = usable_bins(coefficients.len(), cutoff);
    let num_bars = out.len();
    for (bar, slot) in out.iter_mut().enumerate() {
        let range = bar_range(bar, num_bars, usable);
        *slot = if range.is_empty() {
            0.0
        } else {
            let len = range.len();
            coefficients[range].iter().map(|c| c.norm()).sum::<f64>() / len as f64
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_are_contiguous_and_equal() {
        // 2048-point FFT, 64 bars
        let full = usable_bins(2048, 1.0);
        let partial = usable_bins(2048, 0.75);
        assert_eq!(full, 1024);
        assert_eq!(partial, 768);
        assert_eq!(bar_range(0, 64, full), 0..16);
        assert_eq!(bar_range(63, 64, full), 1008..1024);
        assert_eq!(bar_range(1, 64, partial), 12..24);
        assert_eq!(bar_range(63, 64, partial), 756..768);
    }

    #[test]
    fn more_bars_than_bins() {
        assert_eq!(bar_range(2, 8, 4), 2..3);
        assert!(bar_range(5, 8, 4).is_empty());
    }

    #[test]
    fn averages_magnitudes() {
        let coefficients: Vec<Complex<f64>> = [3.0, 4.0, 0.0, 8.0, 0.0, 0.0, 0.0, 0.0]
            .iter()
            .map(|&re| Complex::new(re, 0.0))
            .collect();
        let mut out = [0.0; 2];
        average_bars(&coefficients, 1.0, &mut out);
        assert_eq!(out, [3.5, 4.0]);

        let mut complex = vec![Complex::new(0.0, 0.0); 8];
        complex[0] = Complex::new(3.0, 4.0);
        let mut one = [0.0; 1];
        average_bars(&complex, 0.5, &mut one);
        // usable = 2 bins: |3+4i| = 5 and 0
        assert_eq!(one, [2.5]);
    }
}
