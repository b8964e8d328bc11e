//! Fallback PCM WAV reader (hound)

use std::collections::VecDeque;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use super::source::{downmix_into, Backend, Chunk, SampleSource};
use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug)]
enum Encoding {
    /// Signed integer PCM, scaled by `1 / 2^(bits-1)`.
    Int { scale: f64 },
    Float,
}

pub(crate) struct WavSource {
    reader: hound::WavReader<BufReader<File>>,
    encoding: Encoding,
    channels: usize,
    sample_rate: u32,
    /// Length in frames from the header.
    duration: u64,
    position: u64,
}

impl WavSource {
    pub fn open(path: &Path) -> Result<Self> {
        let reader = hound::WavReader::open(path)?;
        let spec = reader.spec();

        let encoding = match (spec.sample_format, spec.bits_per_sample) {
            (hound::SampleFormat::Int, bits @ 1..=32) => Encoding::Int {
                scale: 1.0 / (1u64 << (bits - 1)) as f64,
            },
            (hound::SampleFormat::Float, 32) => Encoding::Float,
            (format, bits) => {
                return Err(Error::unsupported(
                    "wav",
                    format!("{}-bit {:?} samples", bits, format),
                ));
            }
        };
        if spec.channels == 0 || spec.sample_rate == 0 {
            return Err(Error::unsupported(
                "wav",
                format!("{} channels at {} Hz", spec.channels, spec.sample_rate),
            ));
        }

        let duration = reader.duration() as u64;
        log::debug!(
            "wav: {}Hz, {} channel(s), {}-bit {:?}, {} frames",
            spec.sample_rate,
            spec.channels,
            spec.bits_per_sample,
            spec.sample_format,
            duration
        );

        Ok(Self {
            reader,
            encoding,
            channels: spec.channels as usize,
            sample_rate: spec.sample_rate,
            duration,
            position: 0,
        })
    }

    pub(crate) fn into_sample_source(self) -> SampleSource {
        let sample_rate = self.sample_rate;
        let total = self.duration;
        SampleSource::new(Backend::Wav(self), sample_rate, total)
    }

    pub fn num_channels(&self) -> usize {
        self.channels
    }

    pub fn read_chunk(&mut self, n: usize) -> Result<Chunk> {
        if self.position >= self.duration {
            return Ok(Chunk::End);
        }
        let frames = (n as u64).min(self.duration - self.position) as usize;
        let wanted = frames * self.channels;

        let mut interleaved = Vec::with_capacity(wanted);
        match self.encoding {
            Encoding::Int { scale } => {
                for sample in self.reader.samples::<i32>().take(wanted) {
                    interleaved.push(sample? as f64 * scale);
                }
            }
            Encoding::Float => {
                for sample in self.reader.samples::<f32>().take(wanted) {
                    interleaved.push(sample? as f64);
                }
            }
        }

        if interleaved.len() < wanted {
            // Header promised more than the data chunk holds.
            self.position = self.duration;
        } else {
            self.position += frames as u64;
        }

        let mut mono = VecDeque::with_capacity(frames);
        downmix_into(&interleaved, self.channels, &mut mono);
        Ok(Chunk::Data {
            samples: mono.into(),
            last: self.position >= self.duration,
        })
    }

    pub fn seek(&mut self, position: u64) -> Result<()> {
        if position > self.duration {
            return Err(Error::Seek(format!(
                "position {} is past the end ({} frames)",
                position, self.duration
            )));
        }
        self.reader
            .seek(position as u32)
            .map_err(|e| Error::Seek(e.to_string()))?;
        self.position = position;
        Ok(())
    }
}
