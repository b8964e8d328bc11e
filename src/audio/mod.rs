//! Decoding and Pass 1 analysis.

pub mod analysis;
pub mod bins;
pub mod decode;
pub mod features;
pub mod fft;
pub mod progress;
pub mod source;
pub mod stream;
pub mod wav;
pub mod window;

#[cfg(test)]
pub(crate) mod testutil;
