//! FFT magnitudes → gated, log-compressed bar heights.

use rustfft::num_complex::Complex;

use crate::audio::bins::average_bars;
use crate::config::AnalysisConfig;

/// Maps spectra to bar heights. Stateless; every call depends only on its inputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarMapper {
    cutoff: f64,
    noise_gate: f64,
}

impl BarMapper {
    /// Mapper for Pass 2, binning up to `render_cutoff`.
    pub fn new(config: &AnalysisConfig) -> Self {
        Self::with_cutoff(config.render_cutoff, config.noise_gate)
    }

    pub fn with_cutoff(cutoff: f64, noise_gate: f64) -> Self {
        Self { cutoff, noise_gate }
    }

    /// Bin `coefficients` into `out.len()` bars and scale them. Values above 1.0 are left for
    /// the caller to correct.
    pub fn bin_and_scale(
        &self,
        coefficients: &[Complex<f64>],
        sensitivity: f64,
        base_scale: f64,
        out: &mut [f64],
    ) {
        average_bars(coefficients, self.cutoff, out);
        for bar in out.iter_mut() {
            *bar = self.compress(*bar * base_scale * sensitivity);
        }
    }

    /// Scale bar magnitudes that were already averaged.
    pub fn scale_bars(&self, magnitudes: &[f64], sensitivity: f64, base_scale: f64, out: &mut [f64]) {
        for (bar, &magnitude) in out.iter_mut().zip(magnitudes) {
            *bar = self.compress(magnitude * base_scale * sensitivity);
        }
    }

    /// Noise gate, then `log10(1 + 9x)`.
    pub fn compress(&self, scaled: f64) -> f64 {
        if scaled < self.noise_gate {
            0.0
        } else {
            (1.0 + scaled * 9.0).log10()
        }
    }
}

impl Default for BarMapper {
    fn default() -> Self {
        Self::new(&AnalysisConfig::default())
    }
}

/// Mapping with the default render cutoff and noise gate.
pub fn bin_and_scale(
    coefficients: &[Complex<f64>],
    sensitivity: f64,
    base_scale: f64,
    out: &mut [f64],
) {
    BarMapper::default().bin_and_scale(coefficients, sensitivity, base_scale, out)
}
