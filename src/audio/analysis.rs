use std::path::Path;
use std::time::Instant;

use rustfft::num_complex::Complex;

use super::bins::average_bars;
use super::decode;
use super::features::{FrameAnalysis, TrackProfile};
use super::fft::FftProcessor;
use super::progress::{ProgressSink, ProgressUpdate};
use super::source::SampleSource;
use super::window::{Advance, SlidingWindow};
use crate::config::AnalysisConfig;
use crate::error::{Error, Result};
use crate::render::bars::BarMapper;

/// Reduce one FFT output and the raw samples behind it to frame statistics.
pub fn analyze_frame(
    coefficients: &[Complex<f64>],
    samples: &[f64],
    config: &AnalysisConfig,
) -> FrameAnalysis {
    let rms_level = if samples.is_empty() {
        0.0
    } else {
        (samples.iter().map(|s| s * s).sum::<f64>() / samples.len() as f64).sqrt()
    };

    let mut bar_magnitudes = vec![0.0; config.num_bars];
    average_bars(coefficients, config.analysis_cutoff, &mut bar_magnitudes);
    let peak_magnitude = bar_magnitudes.iter().copied().fold(0.0f64, f64::max);

    FrameAnalysis {
        peak_magnitude,
        rms_level,
        bar_magnitudes,
    }
}

/// Upper bound on frames reserved up front; header frame counts are not trusted beyond it.
const MAX_RESERVED_FRAMES: usize = 1 << 16;

fn reserved_frames(expected: usize) -> usize {
    expected.min(MAX_RESERVED_FRAMES)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfilerState {
    Init,
    Streaming,
    Done,
    Failed,
}

/// Pass 1: walks a whole track with an overlapping window and profiles its dynamics.
#[derive(Debug)]
pub struct TrackProfiler {
    config: AnalysisConfig,
    processor: FftProcessor,
    state: ProfilerState,
}

impl TrackProfiler {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            processor: FftProcessor::new(config.fft_size),
            config,
            state: ProfilerState::Init,
        }
    }

    pub fn state(&self) -> ProfilerState {
        self.state
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Profile everything `source` yields from its current position.
    pub fn profile(
        &mut self,
        source: &mut SampleSource,
        sink: &mut dyn ProgressSink,
    ) -> Result<TrackProfile> {
        self.state = ProfilerState::Init;
        match self.config.validate().and_then(|()| self.run(source, sink)) {
            Ok(profile) => {
                self.state = ProfilerState::Done;
                Ok(profile)
            }
            Err(e) => {
                self.state = ProfilerState::Failed;
                Err(e)
            }
        }
    }

    fn run(&mut self, source: &mut SampleSource, sink: &mut dyn ProgressSink) -> Result<TrackProfile> {
        let config = self.config;
        let sample_rate = source.sample_rate();
        let hop = config.hop_size(sample_rate);
        let total_frames = config.expected_frames(source.total_samples(), sample_rate);

        log::info!(
            "Pass 1: profiling (fft={}, hop={}, bars={}, {}Hz)",
            config.fft_size,
            hop,
            config.num_bars,
            sample_rate
        );

        let mut window = SlidingWindow::new(config.fft_size);
        let initial = window.fill(source).map_err(|e| e.at_frame(0))?;
        if initial == 0 {
            return Err(Error::NoAudioData);
        }
        self.state = ProfilerState::Streaming;

        let mapper = BarMapper::new(&config);
        let started = Instant::now();
        let mut frames: Vec<FrameAnalysis> = Vec::with_capacity(reserved_frames(total_frames));
        let mut spectrum = Vec::with_capacity(config.fft_size);
        let mut heights = vec![0.0; config.num_bars];
        let mut running_peak = 0.0f64;
        let mut running_rms = 0.0f64;
        let mut last = false;

        loop {
            let frame = frames.len();
            self.processor.process_into(window.samples(), &mut spectrum);
            let analysis = analyze_frame(&spectrum, window.samples(), &config);

            running_peak = running_peak.max(analysis.peak_magnitude);
            running_rms += analysis.rms_level;

            if frame % config.progress_interval == 0 {
                mapper.scale_bars(
                    &analysis.bar_magnitudes,
                    1.0,
                    config.base_scale_for(running_peak),
                    &mut heights,
                );
                sink.on_progress(&ProgressUpdate {
                    frame,
                    total_frames,
                    rms: analysis.rms_level,
                    peak: analysis.peak_magnitude,
                    bars: &heights,
                    elapsed: started.elapsed(),
                });
            }
            log::trace!(
                "frame {}: rms={:.5} peak={:.5}",
                frame,
                analysis.rms_level,
                analysis.peak_magnitude
            );
            frames.push(analysis);

            if last {
                break;
            }
            match window.advance(source, hop).map_err(|e| e.at_frame(frame + 1))? {
                Advance::Full => {}
                Advance::Partial(_) => last = true,
                Advance::Exhausted => break,
            }
        }
        sink.finish();

        let num_frames = frames.len();
        let profile = TrackProfile::from_frames(frames, sample_rate, hop, &config);
        log::info!(
            "Pass 1: {} frames, {:.1}s, peak={:.4}, rms={:.4} (sum {:.2}), range={:.2}, base_scale={:.6} in {:.2}s",
            num_frames,
            profile.duration,
            profile.global_peak,
            profile.global_rms,
            running_rms,
            profile.dynamic_range,
            profile.optimal_base_scale,
            started.elapsed().as_secs_f64()
        );
        if profile.is_silent() {
            log::warn!(
                "Track is silent; using fallback base scale {}",
                profile.optimal_base_scale
            );
        }
        Ok(profile)
    }
}

/// Open `path`, profile it and close the source.
pub fn profile_file(
    path: &Path,
    config: &AnalysisConfig,
    sink: &mut dyn ProgressSink,
) -> Result<TrackProfile> {
    let mut source = decode::open(path)?;
    let result = TrackProfiler::new(*config).profile(&mut source, sink);
    source.close();
    result
}
