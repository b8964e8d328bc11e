mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use cli::{Cli, Command};
use spectrabar::config::{self, Config};
use spectrabar::{profile_file, render_track, BarProgress, LogProgress, TrackProfile};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    match cli.command {
        Command::Profile { ref inputs, json } => run_profile(inputs, &config, json),
        Command::Bars { ref input, ref output } => run_bars(input, output.as_deref(), &config),
    }
}

fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut cfg = match config::find_config(cli.config.as_deref()) {
        Some(path) => {
            let cfg = config::load_config(&path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            log::info!("Loaded config from {}", path.display());
            cfg
        }
        None => Config::default(),
    };

    // CLI flags win over the config file
    if let Some(bars) = cli.bars {
        cfg.analysis.num_bars = bars;
    }
    if let Some(fps) = cli.fps {
        cfg.analysis.target_fps = fps;
    }
    if let Some(fft_size) = cli.fft_size {
        cfg.analysis.fft_size = fft_size;
    }
    cfg.validate().context("Invalid analysis configuration")?;
    Ok(cfg)
}

fn run_profile(inputs: &[PathBuf], cfg: &Config, json: bool) -> Result<()> {
    for input in inputs {
        if !input.exists() {
            anyhow::bail!("Input file not found: {}", input.display());
        }
    }

    let profiles: Vec<(PathBuf, TrackProfile)> = if inputs.len() == 1 {
        let input = &inputs[0];
        let mut sink = BarProgress::new(0);
        let profile = profile_file(input, &cfg.analysis, &mut sink)
            .with_context(|| format!("Failed to profile {}", input.display()))?;
        vec![(input.clone(), profile)]
    } else {
        log::info!("Profiling {} files in parallel", inputs.len());
        inputs
            .par_iter()
            .map(|input| {
                let mut sink = LogProgress::new(input.display().to_string());
                profile_file(input, &cfg.analysis, &mut sink)
                    .with_context(|| format!("Failed to profile {}", input.display()))
                    .map(|profile| (input.clone(), profile))
            })
            .collect::<Result<_>>()?
    };

    if json {
        let out: Vec<&TrackProfile> = profiles.iter().map(|(_, p)| p).collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    for (input, profile) in &profiles {
        println!("{}", input.display());
        println!("  frames:        {}", profile.num_frames);
        println!("  duration:      {:.2}s @ {}Hz", profile.duration, profile.sample_rate);
        println!("  global peak:   {:.6}", profile.global_peak);
        println!("  global rms:    {:.6}", profile.global_rms);
        println!("  dynamic range: {:.3}", profile.dynamic_range);
        println!("  base scale:    {:.6}", profile.optimal_base_scale);
    }
    Ok(())
}

fn run_bars(input: &Path, output: Option<&Path>, cfg: &Config) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }
    log::info!("Input: {}", input.display());

    let mut writer: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(std::io::stdout().lock())),
    };

    let mut sink = BarProgress::new(0);
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("[{elapsed_precise}] {spinner} {pos} frames rendered")
            .unwrap()
    );

    let profile = render_track(input, &cfg.analysis, cfg.sensitivity, &mut sink, |index, layout| {
        let line = serde_json::to_string(layout).map_err(std::io::Error::from)?;
        writeln!(writer, "{}", line)?;
        pb.set_position(index as u64 + 1);
        Ok(())
    })
    .with_context(|| format!("Failed to render bars for {}", input.display()))?;
    pb.finish_and_clear();

    writer.flush().context("Failed to flush bar frames")?;

    log::info!(
        "Done: {} frames, base_scale={:.6}{}",
        profile.num_frames,
        profile.optimal_base_scale,
        output.map(|p| format!(", output {}", p.display())).unwrap_or_default()
    );
    Ok(())
}
