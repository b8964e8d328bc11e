use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

/// Hanning-windowed forward FFT of a fixed size.
///
/// Holds no mutable state, so one processor can serve several threads.
#[derive(Clone)]
pub struct FftProcessor {
    size: usize,
    window: Vec<f64>,
    fft: Arc<dyn Fft<f64>>,
}

impl FftProcessor {
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::<f64>::new();
        Self {
            size,
            window: hann_window(size),
            fft: planner.plan_fft_forward(size),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Window and transform one chunk. Short input is zero-padded on the right; extra samples
    /// beyond the FFT size are ignored.
    pub fn process_chunk(&self, samples: &[f64]) -> Vec<Complex<f64>> {
        let mut out = Vec::with_capacity(self.size);
        self.process_into(samples, &mut out);
        out
    }

    /// Like [`process_chunk`](Self::process_chunk), reusing `out`.
    pub fn process_into(&self, samples: &[f64], out: &mut Vec<Complex<f64>>) {
        out.clear();
        out.extend(self.window.iter().enumerate().map(|(i, &w)| {
            let s = samples.get(i).copied().unwrap_or(0.0);
            Complex::new(s * w, 0.0)
        }));
        self.fft.process(out);
    }
}

impl std::fmt::Debug for FftProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FftProcessor").field("size", &self.size).finish()
    }
}

/// Symmetric Hanning window: `0.5 * (1 - cos(2πi / (N-1)))`.
pub fn hann_window(size: usize) -> Vec<f64> {
    if size < 2 {
        return vec![1.0; size];
    }
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f64::consts::PI * i as f64 / (size - 1) as f64).cos()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hann_on_ones_tapers_to_zero() {
        for len in [64usize, 1024, 2048] {
            let processor = FftProcessor::new(len);
            let windowed: Vec<f64> = vec![1.0; len]
                .iter()
                .zip(&processor.window)
                .map(|(s, w)| s * w)
                .collect();
            assert!(windowed[0].abs() < 1e-12);
            assert!(windowed[len - 1].abs() < 1e-12);
            assert!((windowed[len / 2] - 1.0).abs() < 0.05);
            for i in 0..len {
                assert!((windowed[i] - windowed[len - 1 - i]).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn degenerate_window_sizes() {
        assert!(hann_window(0).is_empty());
        assert_eq!(hann_window(1), vec![1.0]);
    }

    #[test]
    fn short_input_is_zero_padded() {
        let processor = FftProcessor::new(16);
        let padded = processor.process_chunk(&[0.5; 8]);
        let mut explicit = vec![0.5; 8];
        explicit.resize(16, 0.0);
        let full = processor.process_chunk(&explicit);
        assert_eq!(padded.len(), 16);
        assert_eq!(padded, full);
    }

    #[test]
    fn silence_transforms_to_zero() {
        let processor = FftProcessor::new(256);
        assert!(processor.process_chunk(&[0.0; 256]).iter().all(|c| c.norm() == 0.0));
    }

    #[test]
    fn sine_peaks_at_its_bin() {
        let size = 1024;
        let processor = FftProcessor::new(size);
        // Exactly bin 32.
        let samples: Vec<f64> = (0..size)
            .map(|i| (2.0 * std::f64::consts::PI * 32.0 * i as f64 / size as f64).sin())
            .collect();
        let spectrum = processor.process_chunk(&samples);
        let (peak_bin, _) = spectrum[..size / 2]
            .iter()
            .enumerate()
            .map(|(i, c)| (i, c.norm()))
            .fold((0, 0.0), |best, cur| if cur.1 > best.1 { cur } else { best });
        assert_eq!(peak_bin, 32);
    }

    #[test]
    fn processor_is_shareable_across_threads() {
        let processor = Arc::new(FftProcessor::new(128));
        let handles: Vec<_> = (0..4)
            .map(|k| {
                let processor = Arc::clone(&processor);
                std::thread::spawn(move || processor.process_chunk(&vec![k as f64; 128]))
            })
            .collect();
        for (k, handle) in handles.into_iter().enumerate() {
            let spectrum = handle.join().unwrap();
            assert_eq!(spectrum, processor.process_chunk(&vec![k as f64; 128]));
        }
    }
}
