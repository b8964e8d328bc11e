use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "spectrabar", about = "Two-pass spectral bar analysis for audio visualizers")]
pub struct Cli {
    /// Config file (defaults to spectrabar.toml or ~/.config/spectrabar/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Number of bars (even)
    #[arg(long, global = true)]
    pub bars: Option<usize>,

    /// Output frame rate; sets the analysis hop size
    #[arg(long, global = true)]
    pub fps: Option<u32>,

    /// FFT window size in samples
    #[arg(long, global = true)]
    pub fft_size: Option<usize>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run Pass 1 and print whole-track statistics
    Profile {
        /// Input audio files (WAV, MP3, FLAC, OGG); several are profiled in parallel
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Print full profiles as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run both passes and write one JSON array of mirrored bar heights per frame
    Bars {
        /// Input audio file
        input: PathBuf,

        /// Output file (JSON lines); stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}
