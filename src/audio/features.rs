use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;

/// Per-frame statistics from Pass 1.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameAnalysis {
    /// Largest bar average in this frame
    pub peak_magnitude: f64,
    /// RMS of the raw (unwindowed) samples
    pub rms_level: f64,
    /// Mean FFT magnitude per bar, `num_bars` long
    pub bar_magnitudes: Vec<f64>,
}

/// Whole-track dynamics (Pass 1 output), read-only once built.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackProfile {
    pub num_frames: usize,
    pub frames: Vec<FrameAnalysis>,
    pub global_peak: f64,
    pub global_rms: f64,
    pub dynamic_range: f64,
    /// Scale that maps the loudest frame to the target visual amplitude
    pub optimal_base_scale: f64,
    pub sample_rate: u32,
    pub hop_size: usize,
    /// Seconds covered by the analyzed frames
    pub duration: f64,
}

impl TrackProfile {
    pub fn from_frames(
        frames: Vec<FrameAnalysis>,
        sample_rate: u32,
        hop_size: usize,
        config: &AnalysisConfig,
    ) -> Self {
        let num_frames = frames.len();
        let global_peak = frames
            .iter()
            .map(|f| f.peak_magnitude)
            .fold(0.0f64, f64::max);
        let global_rms = if num_frames == 0 {
            0.0
        } else {
            frames.iter().map(|f| f.rms_level).sum::<f64>() / num_frames as f64
        };
        let dynamic_range = if global_rms > 0.0 {
            global_peak / global_rms
        } else {
            0.0
        };
        let duration = if sample_rate == 0 {
            0.0
        } else {
            num_frames as f64 * hop_size as f64 / sample_rate as f64
        };

        Self {
            num_frames,
            frames,
            global_peak,
            global_rms,
            dynamic_range,
            optimal_base_scale: config.base_scale_for(global_peak),
            sample_rate,
            hop_size,
            duration,
        }
    }

    /// True when nothing rose above zero; rendering then uses the fallback scale.
    pub fn is_silent(&self) -> bool {
        self.global_peak == 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(peak: f64, rms: f64) -> FrameAnalysis {
        FrameAnalysis {
            peak_magnitude: peak,
            rms_level: rms,
            bar_magnitudes: vec![peak, 0.0],
        }
    }

    #[test]
    fn aggregates_frames() {
        let config = AnalysisConfig::default();
        let profile = TrackProfile::from_frames(
            vec![frame(1.0, 0.2), frame(4.0, 0.4), frame(2.0, 0.3)],
            44100,
            1470,
            &config,
        );
        assert_eq!(profile.num_frames, 3);
        assert_eq!(profile.global_peak, 4.0);
        assert!((profile.global_rms - 0.3).abs() < 1e-12);
        assert!((profile.dynamic_range - 4.0 / 0.3).abs() < 1e-9);
        assert!((profile.optimal_base_scale * profile.global_peak - 0.85).abs() < 1e-12);
        assert!((profile.duration - 0.1).abs() < 1e-12);
    }

    #[test]
    fn silent_frames_use_fallback() {
        let config = AnalysisConfig { fallback_base_scale: 2.5, ..AnalysisConfig::default() };
        let profile = TrackProfile::from_frames(vec![frame(0.0, 0.0); 4], 8000, 160, &config);
        assert!(profile.is_silent());
        assert_eq!(profile.dynamic_range, 0.0);
        assert_eq!(profile.optimal_base_scale, 2.5);
    }

    #[test]
    fn serializes_to_json() {
        let profile = TrackProfile::from_frames(vec![frame(1.0, 0.5)], 8000, 160, &AnalysisConfig::default());
        let json = serde_json::to_string(&profile).unwrap();
        let back: TrackProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(back.num_frames, 1);
        assert_eq!(back.frames[0].bar_magnitudes, vec![1.0, 0.0]);
    }
}
