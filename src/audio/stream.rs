//! Streaming packet decoder on top of symphonia.
//!
//! Unlike a whole-file decode, samples are pulled packet by packet as the analysis window asks
//! for them, so a track is never held in memory.

use std::collections::VecDeque;
use std::fs::File;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::TimeBase;
use symphonia::default::formats::{FlacReader, MpaReader, OggReader};

use super::source::{downmix_into, take_pending, Backend, Chunk, SampleSource};
use crate::error::{Error, Result};

/// Containers that can be opened directly, without probing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Container {
    Flac,
    Mp3,
    Ogg,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ReaderKind {
    Probed,
    Direct(Container),
}

impl ReaderKind {
    fn name(self) -> &'static str {
        match self {
            ReaderKind::Probed => "symphonia",
            ReaderKind::Direct(Container::Flac) => "symphonia-flac",
            ReaderKind::Direct(Container::Mp3) => "symphonia-mp3",
            ReaderKind::Direct(Container::Ogg) => "symphonia-ogg",
        }
    }
}

pub(crate) struct SymphoniaSource {
    kind: ReaderKind,
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: u32,
    channels: usize,
    total_samples: u64,
    time_base: Option<TimeBase>,
    /// Decoded mono samples not yet handed out.
    pending: VecDeque<f64>,
    /// Frames to discard after an accurate seek lands before the target.
    skip_frames: usize,
    finished: bool,
}

impl SymphoniaSource {
    /// Probe the container by content, using the extension as a hint.
    pub fn probe(file: File, extension: Option<&str>) -> Result<Self> {
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = extension {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe().format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )?;

        Self::from_reader(probed.format, ReaderKind::Probed)
    }

    /// Open with one specific format reader.
    pub fn open_container(file: File, container: Container) -> Result<Self> {
        let mss = MediaSourceStream::new(Box::new(file), Default::default());
        let options = FormatOptions::default();
        let format: Box<dyn FormatReader> = match container {
            Container::Flac => Box::new(FlacReader::try_new(mss, &options)?),
            Container::Mp3 => Box::new(MpaReader::try_new(mss, &options)?),
            Container::Ogg => Box::new(OggReader::try_new(mss, &options)?),
        };
        Self::from_reader(format, ReaderKind::Direct(container))
    }

    fn from_reader(format: Box<dyn FormatReader>, kind: ReaderKind) -> Result<Self> {
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(Error::NoTrack)?;

        let track_id = track.id;
        let params = track.codec_params.clone();
        let sample_rate = params
            .sample_rate
            .filter(|&sr| sr > 0)
            .ok_or_else(|| Error::unsupported(kind.name(), "unknown sample rate"))?;
        let channels = params.channels.map_or(1, |c| c.count()).max(1);

        let decoder = symphonia::default::get_codecs()
            .make(&params, &DecoderOptions::default())
            .map_err(|e| Error::unsupported(kind.name(), e))?;

        log::debug!(
            "{}: track {} at {}Hz, {} channel(s), {} frames",
            kind.name(),
            track_id,
            sample_rate,
            channels,
            params.n_frames.unwrap_or(0)
        );

        Ok(Self {
            kind,
            format,
            decoder,
            track_id,
            sample_rate,
            channels,
            total_samples: params.n_frames.unwrap_or(0),
            time_base: params.time_base,
            pending: VecDeque::new(),
            skip_frames: 0,
            finished: false,
        })
    }

    pub(crate) fn into_sample_source(self) -> SampleSource {
        let sample_rate = self.sample_rate;
        let total = self.total_samples;
        SampleSource::new(Backend::Symphonia(self), sample_rate, total)
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn num_channels(&self) -> usize {
        self.channels
    }

    pub fn read_chunk(&mut self, n: usize) -> Result<Chunk> {
        while self.pending.len() < n && !self.finished {
            self.decode_next()?;
        }
        Ok(take_pending(&mut self.pending, n, self.finished))
    }

    /// Decode one packet of our track into `pending`.
    fn decode_next(&mut self) -> Result<()> {
        let packet = match self.format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                self.finished = true;
                return Ok(());
            }
            Err(SymphoniaError::ResetRequired) => {
                return Err(Error::unsupported(
                    self.kind.name(),
                    "stream changed parameters mid-track",
                ));
            }
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != self.track_id {
            return Ok(());
        }

        let decoded = self.decoder.decode(&packet)?;
        let spec = *decoded.spec();
        let channels = spec.channels.count().max(1);
        let mut sample_buf = SampleBuffer::<f64>::new(decoded.frames() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);

        let mut samples = sample_buf.samples();
        if self.skip_frames > 0 {
            let skip = self.skip_frames.min(samples.len() / channels);
            samples = &samples[skip * channels..];
            self.skip_frames -= skip;
        }

        self.channels = channels;
        downmix_into(samples, channels, &mut self.pending);
        Ok(())
    }

    pub fn seek(&mut self, position: u64) -> Result<()> {
        let name = self.kind.name();
        let ts = self.frames_to_ts(position);
        let seeked = self
            .format
            .seek(
                SeekMode::Accurate,
                SeekTo::TimeStamp {
                    ts,
                    track_id: self.track_id,
                },
            )
            .map_err(|e| match e {
                SymphoniaError::Unsupported(_) => Error::SeekUnsupported(name),
                other => Error::Seek(other.to_string()),
            })?;

        self.decoder.reset();
        self.pending.clear();
        self.finished = false;
        let behind = seeked.required_ts.saturating_sub(seeked.actual_ts);
        self.skip_frames = self.ts_to_frames(behind) as usize;
        Ok(())
    }

    fn frames_to_ts(&self, frames: u64) -> u64 {
        match self.time_base {
            Some(tb) if tb.numer > 0 => {
                (frames as u128 * tb.denom as u128 / (tb.numer as u128 * self.sample_rate as u128))
                    as u64
            }
            _ => frames,
        }
    }

    fn ts_to_frames(&self, ts: u64) -> u64 {
        match self.time_base {
            Some(tb) if tb.denom > 0 => {
                (ts as u128 * tb.numer as u128 * self.sample_rate as u128 / tb.denom as u128) as u64
            }
            _ => ts,
        }
    }
}
