//! Two-pass spectral bar analysis for audio visualizers.
//!
//! Pass 1 ([`TrackProfiler`]) walks a whole track and derives an automatic base scale from its
//! loudest frame. Pass 2 ([`BarStream`]) re-reads the track with the same window and hop and
//! turns each FFT frame into gated, log-compressed bar heights laid out center-out.

pub mod audio;
pub mod config;
pub mod error;
pub mod render;

pub use audio::analysis::{analyze_frame, profile_file, ProfilerState, TrackProfiler};
pub use audio::decode::{open, rewind};
pub use audio::features::{FrameAnalysis, TrackProfile};
pub use audio::fft::{hann_window, FftProcessor};
pub use audio::progress::{BarProgress, LogProgress, NoProgress, ProgressSink, ProgressUpdate};
pub use audio::source::{Chunk, SampleSource};
pub use config::{AnalysisConfig, Config, SensitivityConfig};
pub use error::{Error, Result};
pub use render::bars::{bin_and_scale, BarMapper};
pub use render::mirror::{mirror_center_out, mirrored};
pub use render::sensitivity::AutoSensitivity;
pub use render::stream::{render_track, BarStream};
