use super::source::{Chunk, SampleSource};
use crate::error::Result;

/// Outcome of advancing the window by one hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// A full hop was read.
    Full,
    /// Only this many samples remained; the stream is over after this frame.
    Partial(usize),
    /// Nothing left to read.
    Exhausted,
}

/// Fixed-size shift buffer over a sample stream.
///
/// The buffer always holds exactly `size` samples between analysis calls; a stream shorter than
/// `size` leaves zeros at the tail after [`fill`](Self::fill).
pub struct SlidingWindow {
    buf: Vec<f64>,
    incoming: Vec<f64>,
}

impl SlidingWindow {
    pub fn new(size: usize) -> Self {
        Self {
            buf: vec![0.0; size],
            incoming: Vec::new(),
        }
    }

    pub fn samples(&self) -> &[f64] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Fill from the start of the stream. Returns the number of real samples read.
    pub fn fill(&mut self, source: &mut SampleSource) -> Result<usize> {
        self.buf.fill(0.0);
        let size = self.buf.len();
        let read = read_up_to(source, size, &mut self.incoming)?;
        self.buf[..read].copy_from_slice(&self.incoming[..read]);
        Ok(read)
    }

    /// Read `hop` new samples, shift left by the count read and append them at the tail.
    pub fn advance(&mut self, source: &mut SampleSource, hop: usize) -> Result<Advance> {
        let read = read_up_to(source, hop, &mut self.incoming)?;
        if read == 0 {
            return Ok(Advance::Exhausted);
        }
        self.push(read);
        Ok(if read < hop {
            Advance::Partial(read)
        } else {
            Advance::Full
        })
    }

    /// Shift in the first `count` samples of `incoming`.
    fn push(&mut self, count: usize) {
        let size = self.buf.len();
        if count >= size {
            self.buf.copy_from_slice(&self.incoming[count - size..count]);
        } else {
            self.buf.copy_within(count.., 0);
            self.buf[size - count..].copy_from_slice(&self.incoming[..count]);
        }
    }
}

/// Read repeatedly until `n` samples are collected or the stream ends.
fn read_up_to(source: &mut SampleSource, n: usize, out: &mut Vec<f64>) -> Result<usize> {
    out.clear();
    while out.len() < n {
        match source.read_chunk(n - out.len())? {
            Chunk::Data { samples, last } => {
                out.extend_from_slice(&samples);
                if last {
                    break;
                }
            }
            Chunk::End => break,
        }
    }
    Ok(out.len())
}
