use std::path::Path;

use rustfft::num_complex::Complex;

use super::bars::BarMapper;
use super::mirror::mirror_center_out;
use super::sensitivity::AutoSensitivity;
use crate::audio::analysis::TrackProfiler;
use crate::audio::decode;
use crate::audio::features::TrackProfile;
use crate::audio::fft::FftProcessor;
use crate::audio::progress::ProgressSink;
use crate::audio::source::SampleSource;
use crate::audio::window::{Advance, SlidingWindow};
use crate::config::{AnalysisConfig, SensitivityConfig};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Start,
    Running,
    Last,
    Done,
}

/// Pass 2: one mirrored bar layout per output frame, hopping exactly like Pass 1.
pub struct BarStream {
    source: SampleSource,
    processor: FftProcessor,
    mapper: BarMapper,
    sensitivity: AutoSensitivity,
    window: SlidingWindow,
    base_scale: f64,
    hop: usize,
    phase: Phase,
    frame: usize,
    spectrum: Vec<Complex<f64>>,
    bars: Vec<f64>,
    layout: Vec<f64>,
}

impl BarStream {
    pub fn new(
        source: SampleSource,
        config: &AnalysisConfig,
        sensitivity: SensitivityConfig,
        base_scale: f64,
    ) -> Result<Self> {
        config.validate()?;
        sensitivity.validate()?;
        let hop = config.hop_size(source.sample_rate());
        Ok(Self {
            processor: FftProcessor::new(config.fft_size),
            mapper: BarMapper::new(config),
            sensitivity: AutoSensitivity::new(sensitivity),
            window: SlidingWindow::new(config.fft_size),
            base_scale,
            hop,
            phase: Phase::Start,
            frame: 0,
            spectrum: Vec::with_capacity(config.fft_size),
            bars: vec![0.0; config.num_bars],
            layout: vec![0.0; config.num_bars],
            source,
        })
    }

    /// Seed the stream from a Pass 1 profile of the same track.
    pub fn for_profile(
        source: SampleSource,
        profile: &TrackProfile,
        config: &AnalysisConfig,
        sensitivity: SensitivityConfig,
    ) -> Result<Self> {
        if profile.sample_rate != source.sample_rate()
            || profile.hop_size != config.hop_size(source.sample_rate())
        {
            return Err(Error::InvalidConfig(format!(
                "profile was built at {}Hz with hop {}, source is {}Hz with hop {}",
                profile.sample_rate,
                profile.hop_size,
                source.sample_rate(),
                config.hop_size(source.sample_rate())
            )));
        }
        if profile
            .frames
            .first()
            .is_some_and(|f| f.bar_magnitudes.len() != config.num_bars)
        {
            return Err(Error::InvalidConfig(
                "profile bar count differs from the render configuration".into(),
            ));
        }
        Self::new(source, config, sensitivity, profile.optimal_base_scale)
    }

    /// The next mirrored layout, or `None` once the track is exhausted.
    pub fn next_frame(&mut self) -> Result<Option<&[f64]>> {
        let frame = self.frame;
        match self.phase {
            Phase::Done => return Ok(None),
            Phase::Last => {
                self.phase = Phase::Done;
                return Ok(None);
            }
            Phase::Start => {
                let read = self.window.fill(&mut self.source).map_err(|e| e.at_frame(frame))?;
                if read == 0 {
                    self.phase = Phase::Done;
                    return Err(Error::NoAudioData);
                }
                self.phase = Phase::Running;
            }
            Phase::Running => {
                match self
                    .window
                    .advance(&mut self.source, self.hop)
                    .map_err(|e| e.at_frame(frame))?
                {
                    Advance::Full => {}
                    Advance::Partial(_) => self.phase = Phase::Last,
                    Advance::Exhausted => {
                        self.phase = Phase::Done;
                        return Ok(None);
                    }
                }
            }
        }

        self.processor.process_into(self.window.samples(), &mut self.spectrum);
        self.mapper.bin_and_scale(
            &self.spectrum,
            self.sensitivity.value(),
            self.base_scale,
            &mut self.bars,
        );
        self.sensitivity.correct(&mut self.bars);
        mirror_center_out(&self.bars, &mut self.layout)?;
        self.frame += 1;
        Ok(Some(self.layout.as_slice()))
    }

    /// Frames emitted so far.
    pub fn frames_emitted(&self) -> usize {
        self.frame
    }

    /// Linear (unmirrored) heights of the most recent frame.
    pub fn last_spectrum(&self) -> &[f64] {
        &self.bars
    }

    pub fn sensitivity(&self) -> f64 {
        self.sensitivity.value()
    }

    pub fn base_scale(&self) -> f64 {
        self.base_scale
    }

    pub fn into_source(self) -> SampleSource {
        self.source
    }
}

/// Run both passes over `path`, handing every mirrored layout to `on_frame`.
pub fn render_track<F>(
    path: &Path,
    config: &AnalysisConfig,
    sensitivity: SensitivityConfig,
    sink: &mut dyn ProgressSink,
    mut on_frame: F,
) -> Result<TrackProfile>
where
    F: FnMut(usize, &[f64]) -> Result<()>,
{
    config.validate()?;
    let mut source = decode::open(path)?;
    let profile = match TrackProfiler::new(*config).profile(&mut source, sink) {
        Ok(profile) => profile,
        Err(e) => {
            source.close();
            return Err(e);
        }
    };

    let source = decode::rewind(source, path)?;
    log::info!(
        "Pass 2: rendering {} frames (base_scale={:.6})",
        profile.num_frames,
        profile.optimal_base_scale
    );
    let mut stream = BarStream::for_profile(source, &profile, config, sensitivity)?;
    let mut index = 0;
    while let Some(layout) = stream.next_frame()? {
        on_frame(index, layout)?;
        index += 1;
    }
    let emitted = stream.frames_emitted();
    if emitted != profile.num_frames {
        log::warn!(
            "Pass 2 produced {} frames, Pass 1 profiled {}",
            emitted,
            profile.num_frames
        );
    }
    log::info!(
        "Pass 2: {} frames, final sensitivity {:.3}",
        emitted,
        stream.sensitivity()
    );
    stream.into_source().close();
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::progress::NoProgress;
    use crate::audio::testutil::{sine, temp_path, write_wav_i16};

    fn config() -> AnalysisConfig {
        AnalysisConfig {
            fft_size: 1024,
            num_bars: 32,
            target_fps: 25,
            ..AnalysisConfig::default()
        }
    }

    fn chord(len: usize, sample_rate: u32) -> Vec<f64> {
        let low = sine(220.0, sample_rate, len, 0.5);
        let high = sine(3000.0, sample_rate, len, 0.2);
        low.iter().zip(&high).map(|(a, b)| a + b).collect()
    }

    #[test]
    fn pass_two_matches_pass_one_frame_count() {
        let config = config();
        let samples = chord(30_000, 16000);
        let mut source = SampleSource::from_mono(samples.clone(), 16000).unwrap();
        let profile = TrackProfiler::new(config).profile(&mut source, &mut NoProgress).unwrap();

        let source = SampleSource::from_mono(samples, 16000).unwrap();
        let mut stream = BarStream::for_profile(source, &profile, &config, SensitivityConfig::default()).unwrap();
        assert_eq!(stream.base_scale(), profile.optimal_base_scale);

        let mut count = 0;
        while let Some(layout) = stream.next_frame().unwrap() {
            assert_eq!(layout.len(), 32);
            for i in 0..16 {
                assert_eq!(layout[15 - i], layout[16 + i]);
            }
            assert!(layout.iter().all(|&b| (0.0..=1.0).contains(&b)));
            count += 1;
        }
        assert_eq!(count, profile.num_frames);
        assert_eq!(stream.frames_emitted(), count);
        assert!(stream.next_frame().unwrap().is_none());
    }

    #[test]
    fn loud_tone_lights_center_bars() {
        let config = config();
        let samples = sine(250.0, 16000, 8000, 0.9);
        let mut source = SampleSource::from_mono(samples.clone(), 16000).unwrap();
        let profile = TrackProfiler::new(config).profile(&mut source, &mut NoProgress).unwrap();
        let mut stream = BarStream::for_profile(
            SampleSource::from_mono(samples, 16000).unwrap(),
            &profile,
            &config,
            SensitivityConfig::default(),
        )
        .unwrap();
        let layout = stream.next_frame().unwrap().unwrap().to_vec();
        // 250 Hz at 15.6 Hz per bin and 16 bins per bar lands in bar 1.
        let max = layout.iter().copied().fold(0.0, f64::max);
        assert!(max > 0.5);
        assert!(layout[14] == max || layout[15] == max);
        assert_eq!(layout[0], 0.0);
    }

    #[test]
    fn silent_track_renders_inert_frames() {
        let config = config();
        let mut source = SampleSource::from_mono(vec![0.0; 5000], 16000).unwrap();
        let profile = TrackProfiler::new(config).profile(&mut source, &mut NoProgress).unwrap();
        let mut stream = BarStream::for_profile(
            SampleSource::from_mono(vec![0.0; 5000], 16000).unwrap(),
            &profile,
            &config,
            SensitivityConfig::default(),
        )
        .unwrap();
        while let Some(layout) = stream.next_frame().unwrap() {
            assert!(layout.iter().all(|&b| b == 0.0));
        }
    }

    #[test]
    fn rejects_profile_from_other_rate() {
        let config = config();
        let mut source = SampleSource::from_mono(vec![0.1; 4000], 16000).unwrap();
        let profile = TrackProfiler::new(config).profile(&mut source, &mut NoProgress).unwrap();
        let other = SampleSource::from_mono(vec![0.1; 4000], 8000).unwrap();
        assert!(BarStream::for_profile(other, &profile, &config, SensitivityConfig::default()).is_err());
    }

    #[test]
    fn empty_source_is_no_audio_data() {
        let source = SampleSource::from_mono(Vec::new(), 16000).unwrap();
        let mut stream = BarStream::new(source, &config(), SensitivityConfig::default(), 1.0).unwrap();
        assert!(matches!(stream.next_frame(), Err(Error::NoAudioData)));
        assert!(stream.next_frame().unwrap().is_none());
    }

    #[test]
    fn frame_consumer_error_stops_rendering() {
        let path = temp_path("render-abort.wav");
        let pcm: Vec<i16> = chord(16000, 16000).iter().map(|s| (s * 30000.0) as i16).collect();
        write_wav_i16(&path, 1, 16000, &pcm);

        let mut calls = 0;
        let err = render_track(&path, &config(), SensitivityConfig::default(), &mut NoProgress, |i, _| {
            calls += 1;
            if i == 2 {
                return Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed").into());
            }
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, Error::Io(_)), "{}", err);
        assert_eq!(calls, 3);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn render_track_runs_both_passes() {
        let path = temp_path("render-track.wav");
        let pcm: Vec<i16> = chord(16000, 16000).iter().map(|s| (s * 30000.0) as i16).collect();
        write_wav_i16(&path, 1, 16000, &pcm);

        let mut frames = Vec::new();
        let profile = render_track(&path, &config(), SensitivityConfig::default(), &mut NoProgress, |i, layout| {
            frames.push((i, layout.to_vec()));
            Ok(())
        })
        .unwrap();
        assert_eq!(frames.len(), profile.num_frames);
        assert!(frames.iter().enumerate().all(|(k, (i, _))| k == *i));
        assert!(frames.iter().any(|(_, layout)| layout.iter().any(|&b| b > 0.0)));
        std::fs::remove_file(&path).ok();
    }
}
