use std::collections::VecDeque;

use super::stream::SymphoniaSource;
use super::wav::WavSource;
use crate::error::{Error, Result};

/// One `read_chunk` result. `End` is a control signal, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Chunk {
    /// Up to `n` mono samples; `last` is set when the stream is known to end after them.
    Data { samples: Vec<f64>, last: bool },
    End,
}

impl Chunk {
    pub fn len(&self) -> usize {
        match self {
            Chunk::Data { samples, .. } => samples.len(),
            Chunk::End => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The closed set of decoding backends.
pub(crate) enum Backend {
    Symphonia(SymphoniaSource),
    Wav(WavSource),
    Memory(MemorySource),
}

impl Backend {
    fn name(&self) -> &'static str {
        match self {
            Backend::Symphonia(s) => s.name(),
            Backend::Wav(_) => "wav",
            Backend::Memory(_) => "memory",
        }
    }

    fn read_chunk(&mut self, n: usize) -> Result<Chunk> {
        match self {
            Backend::Symphonia(s) => s.read_chunk(n),
            Backend::Wav(s) => s.read_chunk(n),
            Backend::Memory(s) => Ok(s.read_chunk(n)),
        }
    }

    fn seek(&mut self, position: u64) -> Result<()> {
        match self {
            Backend::Symphonia(s) => s.seek(position),
            Backend::Wav(s) => s.seek(position),
            Backend::Memory(s) => s.seek(position),
        }
    }

    fn num_channels(&self) -> usize {
        match self {
            Backend::Symphonia(s) => s.num_channels(),
            Backend::Wav(s) => s.num_channels(),
            Backend::Memory(s) => s.channels,
        }
    }
}

/// A mono f64 sample stream over one decoded track.
///
/// Reads are sequential; the decoder keeps an internal cursor. After [`close`](Self::close)
/// every read or seek fails with [`Error::Closed`] while the metadata accessors keep working.
pub struct SampleSource {
    backend: Option<Backend>,
    name: &'static str,
    sample_rate: u32,
    channels: usize,
    total_samples: u64,
}

impl SampleSource {
    pub(crate) fn new(backend: Backend, sample_rate: u32, total_samples: u64) -> Self {
        Self {
            name: backend.name(),
            channels: backend.num_channels(),
            backend: Some(backend),
            sample_rate,
            total_samples,
        }
    }

    /// In-memory source over interleaved samples, mainly for synthetic signals.
    pub fn from_memory(interleaved: Vec<f64>, channels: usize, sample_rate: u32) -> Result<Self> {
        if channels == 0 || sample_rate == 0 {
            return Err(Error::unsupported(
                "memory",
                format!("{} channels at {} Hz", channels, sample_rate),
            ));
        }
        let total = (interleaved.len() / channels) as u64;
        let memory = MemorySource {
            interleaved,
            channels,
            position: 0,
        };
        Ok(Self::new(Backend::Memory(memory), sample_rate, total))
    }

    /// Mono in-memory source.
    pub fn from_mono(samples: Vec<f64>, sample_rate: u32) -> Result<Self> {
        Self::from_memory(samples, 1, sample_rate)
    }

    /// Read at most `n` mono samples.
    pub fn read_chunk(&mut self, n: usize) -> Result<Chunk> {
        let backend = self.backend.as_mut().ok_or(Error::Closed)?;
        let chunk = backend.read_chunk(n)?;
        self.channels = backend.num_channels();
        Ok(chunk)
    }

    /// Reposition to an absolute mono sample index.
    pub fn seek(&mut self, position: u64) -> Result<()> {
        self.backend.as_mut().ok_or(Error::Closed)?.seek(position)
    }

    /// Release the decoder. Safe to call more than once.
    pub fn close(&mut self) {
        if self.backend.take().is_some() {
            log::debug!("Closed {} sample source", self.name);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.backend.is_none()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Channel count before downmixing.
    pub fn num_channels(&self) -> usize {
        self.channels
    }

    /// Total mono samples, or 0 if the container does not say.
    pub fn total_samples(&self) -> u64 {
        self.total_samples
    }

    pub fn decoder_name(&self) -> &'static str {
        self.name
    }
}

impl std::fmt::Debug for SampleSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleSource")
            .field("decoder", &self.name)
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .field("total_samples", &self.total_samples)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Average each interleaved frame into one mono sample. A trailing partial frame is dropped.
pub(crate) fn downmix_into(interleaved: &[f64], channels: usize, out: &mut VecDeque<f64>) {
    if channels <= 1 {
        out.extend(interleaved.iter().copied());
        return;
    }
    for frame in interleaved.chunks_exact(channels) {
        out.push_back(frame.iter().sum::<f64>() / channels as f64);
    }
}

/// Drain up to `n` samples from decoded-but-unread output.
pub(crate) fn take_pending(pending: &mut VecDeque<f64>, n: usize, finished: bool) -> Chunk {
    if pending.is_empty() && finished {
        return Chunk::End;
    }
    let take = n.min(pending.len());
    let samples: Vec<f64> = pending.drain(..take).collect();
    Chunk::Data {
        samples,
        last: finished && pending.is_empty(),
    }
}

pub(crate) struct MemorySource {
    interleaved: Vec<f64>,
    channels: usize,
    /// Current frame index.
    position: usize,
}

impl MemorySource {
    fn frames(&self) -> usize {
        self.interleaved.len() / self.channels
    }

    fn read_chunk(&mut self, n: usize) -> Chunk {
        let frames = self.frames();
        if self.position >= frames {
            return Chunk::End;
        }
        let end = (self.position + n).min(frames);
        let slice = &self.interleaved[self.position * self.channels..end * self.channels];
        let mut mono = VecDeque::with_capacity(end - self.position);
        downmix_into(slice, self.channels, &mut mono);
        self.position = end;
        Chunk::Data {
            samples: mono.into(),
            last: end == frames,
        }
    }

    fn seek(&mut self, position: u64) -> Result<()> {
        let frames = self.frames() as u64;
        if position > frames {
            return Err(Error::Seek(format!(
                "position {} is past the end ({} samples)",
                position, frames
            )));
        }
        self.position = position as usize;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(source: &mut SampleSource, n: usize) -> Vec<f64> {
        let mut all = Vec::new();
        loop {
            match source.read_chunk(n).unwrap() {
                Chunk::Data { samples, last } => {
                    assert!(samples.len() <= n);
                    all.extend(samples);
                    if last {
                        assert_eq!(source.read_chunk(n).unwrap(), Chunk::End);
                        break;
                    }
                }
                Chunk::End => break,
            }
        }
        all
    }

    #[test]
    fn downmixes_by_averaging_channels() {
        let mut source = SampleSource::from_memory(vec![1.0, 0.0, -0.5, -0.5, 0.25, 0.75], 2, 8000).unwrap();
        assert_eq!(source.num_channels(), 2);
        assert_eq!(source.total_samples(), 3);
        assert_eq!(drain(&mut source, 16), vec![0.5, -0.5, 0.5]);
    }

    #[test]
    fn chunk_size_does_not_change_samples() {
        let signal: Vec<f64> = (0..10_000).map(|i| ((i as f64) * 0.01).sin()).collect();
        let mut small = SampleSource::from_mono(signal.clone(), 44100).unwrap();
        let mut large = SampleSource::from_mono(signal, 44100).unwrap();
        let a = drain(&mut small, 2048);
        let b = drain(&mut large, 4096);
        assert_eq!(a.len(), 10_000);
        assert_eq!(a, b);
    }

    #[test]
    fn closed_source_fails_deterministically() {
        let mut source = SampleSource::from_mono(vec![0.0; 10], 8000).unwrap();
        source.close();
        source.close();
        assert!(source.is_closed());
        assert!(matches!(source.read_chunk(4), Err(Error::Closed)));
        assert!(matches!(source.seek(0), Err(Error::Closed)));
        assert_eq!(source.sample_rate(), 8000);
    }

    #[test]
    fn memory_seek_rewinds() {
        let mut source = SampleSource::from_mono(vec![1.0, 2.0, 3.0], 8000).unwrap();
        assert_eq!(drain(&mut source, 2), vec![1.0, 2.0, 3.0]);
        source.seek(1).unwrap();
        assert_eq!(drain(&mut source, 2), vec![2.0, 3.0]);
        assert!(source.seek(4).is_err());
    }

    #[test]
    fn rejects_zero_channels() {
        assert!(SampleSource::from_memory(vec![0.0], 0, 8000).is_err());
        assert!(SampleSource::from_memory(vec![0.0], 1, 0).is_err());
    }
}
