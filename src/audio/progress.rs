use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Snapshot handed to a [`ProgressSink`] during Pass 1.
#[derive(Debug, Clone, Copy)]
pub struct ProgressUpdate<'a> {
    pub frame: usize,
    /// 0 when the stream length is unknown
    pub total_frames: usize,
    pub rms: f64,
    pub peak: f64,
    /// Bar heights of this frame, scaled with the peak seen so far
    pub bars: &'a [f64],
    pub elapsed: Duration,
}

/// Observer invoked inline on the analysis thread. Slow sinks stall the analysis.
pub trait ProgressSink {
    fn on_progress(&mut self, update: &ProgressUpdate<'_>);

    /// Called once after the last frame.
    fn finish(&mut self) {}
}

impl<F> ProgressSink for F
where
    F: FnMut(&ProgressUpdate<'_>),
{
    fn on_progress(&mut self, update: &ProgressUpdate<'_>) {
        self(update)
    }
}

/// Discards every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&mut self, _update: &ProgressUpdate<'_>) {}
}

/// Reports through `log` at debug level, tagged with a label (usually the file name).
#[derive(Debug, Clone)]
pub struct LogProgress {
    label: String,
}

impl LogProgress {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into() }
    }
}

impl ProgressSink for LogProgress {
    fn on_progress(&mut self, update: &ProgressUpdate<'_>) {
        log::debug!(
            "{}: frame {}/{} rms={:.4} peak={:.4} ({:.1}s)",
            self.label,
            update.frame,
            update.total_frames,
            update.rms,
            update.peak,
            update.elapsed.as_secs_f64()
        );
    }
}

/// Terminal progress bar; a spinner until the frame count is known.
pub struct BarProgress {
    bar: ProgressBar,
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-")
}

impl BarProgress {
    pub fn new(total_frames: usize) -> Self {
        let bar = if total_frames > 0 {
            let bar = ProgressBar::new(total_frames as u64);
            bar.set_style(bar_style());
            bar
        } else {
            ProgressBar::new_spinner()
        };
        Self { bar }
    }

    pub fn hidden() -> Self {
        Self { bar: ProgressBar::hidden() }
    }
}

impl ProgressSink for BarProgress {
    fn on_progress(&mut self, update: &ProgressUpdate<'_>) {
        if update.total_frames > 0 && self.bar.length() != Some(update.total_frames as u64) {
            self.bar.set_length(update.total_frames as u64);
            self.bar.set_style(bar_style());
        }
        self.bar.set_position(update.frame as u64 + 1);
        self.bar
            .set_message(format!("rms={:.3} peak={:.2}", update.rms, update.peak));
    }

    fn finish(&mut self) {
        self.bar.finish_with_message("analysis complete");
    }
}
