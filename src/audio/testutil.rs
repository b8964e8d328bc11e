//! Fixtures shared by the decoder and analysis tests.

use std::path::{Path, PathBuf};

use super::source::{Chunk, SampleSource};

pub fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("spectrabar-{}-{}", std::process::id(), name))
}

pub fn write_wav_i16(path: &Path, channels: u16, sample_rate: u32, interleaved: &[i16]) {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for &s in interleaved {
        writer.write_sample(s).unwrap();
    }
    writer.finalize().unwrap();
}

pub fn read_all(source: &mut SampleSource, chunk: usize) -> Vec<f64> {
    let mut all = Vec::new();
    loop {
        match source.read_chunk(chunk).unwrap() {
            Chunk::Data { samples, last } => {
                assert!(samples.len() <= chunk);
                all.extend(samples);
                if last {
                    break;
                }
            }
            Chunk::End => break,
        }
    }
    all
}

pub fn sine(freq: f64, sample_rate: u32, len: usize, amplitude: f64) -> Vec<f64> {
    (0..len)
        .map(|i| amplitude * (2.0 * std::f64::consts::PI * freq * i as f64 / sample_rate as f64).sin())
        .collect()
}
