use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub sensitivity: SensitivityConfig,
}

/// Track-wide constants shared by both passes. Pass 1 and Pass 2 must use the same value.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct AnalysisConfig {
    /// FFT window size in samples.
    #[serde(default = "default_fft_size")]
    pub fft_size: usize,
    /// Number of output bars (must be even for the mirrored layout).
    #[serde(default = "default_num_bars")]
    pub num_bars: usize,
    /// Output frame rate; the hop size is `sample_rate / target_fps`.
    #[serde(default = "default_target_fps")]
    pub target_fps: u32,
    /// Fraction of Nyquist binned by the Pass 1 frame analyzer.
    #[serde(default = "default_analysis_cutoff")]
    pub analysis_cutoff: f64,
    /// Fraction of Nyquist binned by the Pass 2 bar mapper.
    #[serde(default = "default_render_cutoff")]
    pub render_cutoff: f64,
    /// Scaled magnitudes below this are forced to zero.
    #[serde(default = "default_noise_gate")]
    pub noise_gate: f64,
    /// Visual amplitude the loudest frame of the track is scaled to.
    #[serde(default = "default_target_peak")]
    pub target_peak: f64,
    /// Base scale used when the whole track is silent.
    #[serde(default = "default_fallback_base_scale")]
    pub fallback_base_scale: f64,
    /// Report progress every n-th analysis frame.
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct SensitivityConfig {
    #[serde(default = "default_initial_sensitivity")]
    pub initial: f64,
    /// Multiplier applied after a frame that overshoots 1.0.
    #[serde(default = "default_decay")]
    pub decay: f64,
    /// Multiplier applied after a frame that stays within range.
    #[serde(default = "default_recovery")]
    pub recovery: f64,
    #[serde(default = "default_min_sensitivity")]
    pub min: f64,
    #[serde(default = "default_max_sensitivity")]
    pub max: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            fft_size: default_fft_size(),
            num_bars: default_num_bars(),
            target_fps: default_target_fps(),
            analysis_cutoff: default_analysis_cutoff(),
            render_cutoff: default_render_cutoff(),
            noise_gate: default_noise_gate(),
            target_peak: default_target_peak(),
            fallback_base_scale: default_fallback_base_scale(),
            progress_interval: default_progress_interval(),
        }
    }
}

impl Default for SensitivityConfig {
    fn default() -> Self {
        Self {
            initial: default_initial_sensitivity(),
            decay: default_decay(),
            recovery: default_recovery(),
            min: default_min_sensitivity(),
            max: default_max_sensitivity(),
        }
    }
}

fn default_fft_size() -> usize { 2048 }
fn default_num_bars() -> usize { 64 }
fn default_target_fps() -> u32 { 30 }
fn default_analysis_cutoff() -> f64 { 0.75 }
fn default_render_cutoff() -> f64 { 1.0 }
fn default_noise_gate() -> f64 { 0.01 }
fn default_target_peak() -> f64 { 0.85 }
fn default_fallback_base_scale() -> f64 { 1.0 }
fn default_progress_interval() -> usize { 3 }
fn default_initial_sensitivity() -> f64 { 1.0 }
fn default_decay() -> f64 { 0.985 }
fn default_recovery() -> f64 { 1.002 }
fn default_min_sensitivity() -> f64 { 0.05 }
fn default_max_sensitivity() -> f64 { 4.0 }

impl AnalysisConfig {
    pub fn validate(&self) -> Result<()> {
        if self.fft_size < 2 {
            return Err(invalid(format!("fft_size must be at least 2, got {}", self.fft_size)));
        }
        if self.num_bars == 0 || self.num_bars % 2 != 0 {
            return Err(invalid(format!(
                "num_bars must be a positive even number, got {}",
                self.num_bars
            )));
        }
        if self.target_fps == 0 {
            return Err(invalid("target_fps must be positive"));
        }
        for (name, cutoff) in [
            ("analysis_cutoff", self.analysis_cutoff),
            ("render_cutoff", self.render_cutoff),
        ] {
            if !(cutoff > 0.0 && cutoff <= 1.0) {
                return Err(invalid(format!("{} must be in (0, 1], got {}", name, cutoff)));
            }
        }
        if !(self.noise_gate >= 0.0) {
            return Err(invalid(format!("noise_gate must be >= 0, got {}", self.noise_gate)));
        }
        if !(self.target_peak > 0.0) || !(self.fallback_base_scale >= 0.0) {
            return Err(invalid("target_peak must be positive and fallback_base_scale non-negative"));
        }
        if self.progress_interval == 0 {
            return Err(invalid("progress_interval must be at least 1"));
        }
        Ok(())
    }

    /// Samples consumed per frame advance.
    pub fn hop_size(&self, sample_rate: u32) -> usize {
        (sample_rate / self.target_fps.max(1)).max(1) as usize
    }

    /// Base scale mapping `peak` to `target_peak`, or the fallback for silence.
    pub fn base_scale_for(&self, peak: f64) -> f64 {
        if peak > 0.0 {
            self.target_peak / peak
        } else {
            self.fallback_base_scale
        }
    }

    /// Number of analysis frames a stream of `total_samples` yields, or 0 when unknown.
    pub fn expected_frames(&self, total_samples: u64, sample_rate: u32) -> usize {
        if total_samples == 0 {
            return 0;
        }
        let hop = self.hop_size(sample_rate) as u64;
        let remaining = total_samples.saturating_sub(self.fft_size as u64);
        (1 + remaining.div_ceil(hop)) as usize
    }
}

impl SensitivityConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.min > 0.0 && self.min <= self.max) {
            return Err(invalid(format!(
                "sensitivity bounds must satisfy 0 < min <= max, got [{}, {}]",
                self.min, self.max
            )));
        }
        if !(self.decay > 0.0 && self.decay <= 1.0) || !(self.recovery >= 1.0) {
            return Err(invalid("sensitivity decay must be in (0, 1] and recovery >= 1"));
        }
        Ok(())
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        self.analysis.validate()?;
        self.sensitivity.validate()
    }
}

fn invalid(msg: impl Into<String>) -> Error {
    Error::InvalidConfig(msg.into())
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    let config: Config = toml::from_str(&content).map_err(|source| Error::ConfigParse {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate()?;
    Ok(config)
}

/// Explicit path, else `spectrabar.toml` in the working directory, else the user config dirs.
pub fn find_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from("spectrabar.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("spectrabar").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("spectrabar").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.analysis.fft_size, 2048);
        assert_eq!(config.analysis.num_bars, 64);
        assert_eq!(config.analysis.analysis_cutoff, 0.75);
        assert_eq!(config.analysis.render_cutoff, 1.0);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: Config = toml::from_str("[analysis]\nnum_bars = 32\n").unwrap();
        assert_eq!(config.analysis.num_bars, 32);
        assert_eq!(config.analysis.fft_size, 2048);
        assert_eq!(config.sensitivity, SensitivityConfig::default());
    }

    #[test]
    fn rejects_odd_bar_count() {
        let config = AnalysisConfig { num_bars: 63, ..AnalysisConfig::default() };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn rejects_cutoff_out_of_range() {
        let config = AnalysisConfig { render_cutoff: 1.5, ..AnalysisConfig::default() };
        assert!(config.validate().is_err());
        let config = AnalysisConfig { analysis_cutoff: 0.0, ..AnalysisConfig::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn hop_size_divides_sample_rate() {
        let config = AnalysisConfig::default();
        assert_eq!(config.hop_size(44100), 1470);
        assert_eq!(config.hop_size(48000), 1600);
        assert_eq!(config.hop_size(10), 1);
    }

    #[test]
    fn base_scale_falls_back_on_silence() {
        let config = AnalysisConfig::default();
        assert!((config.base_scale_for(2.0) - 0.425).abs() < 1e-12);
        assert_eq!(config.base_scale_for(0.0), config.fallback_base_scale);
    }

    #[test]
    fn expected_frames_counts_final_partial_hop() {
        let config = AnalysisConfig { fft_size: 100, target_fps: 10, ..AnalysisConfig::default() };
        // hop = 10 at 100 Hz
        assert_eq!(config.expected_frames(0, 100), 0);
        assert_eq!(config.expected_frames(50, 100), 1);
        assert_eq!(config.expected_frames(100, 100), 1);
        assert_eq!(config.expected_frames(120, 100), 3);
        assert_eq!(config.expected_frames(125, 100), 4);
    }

    #[test]
    fn load_config_reports_parse_errors() {
        let path = std::env::temp_dir().join(format!("spectrabar-bad-{}.toml", std::process::id()));
        std::fs::write(&path, "[analysis\nfft_size = ").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, Error::ConfigParse { .. }));
        std::fs::remove_file(&path).ok();
    }
}
