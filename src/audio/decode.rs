use std::fs::File;
use std::path::Path;

use super::source::SampleSource;
use super::stream::{Container, SymphoniaSource};
use super::wav::WavSource;
use crate::error::{Error, Result};

/// Format-specific decoders tried when probing fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fallback {
    Wav,
    Container(Container),
}

/// Extension → fallback decoder, consulted only after the probe fails.
const FALLBACKS: &[(&str, Fallback)] = &[
    ("wav", Fallback::Wav),
    ("wave", Fallback::Wav),
    ("flac", Fallback::Container(Container::Flac)),
    ("mp3", Fallback::Container(Container::Mp3)),
    ("ogg", Fallback::Container(Container::Ogg)),
    ("oga", Fallback::Container(Container::Ogg)),
];

pub fn fallback_for(extension: &str) -> Option<Fallback> {
    let ext = extension.to_ascii_lowercase();
    FALLBACKS
        .iter()
        .find(|(candidate, _)| *candidate == ext)
        .map(|&(_, fallback)| fallback)
}

impl Fallback {
    pub fn name(self) -> &'static str {
        match self {
            Fallback::Wav => "wav",
            Fallback::Container(Container::Flac) => "flac",
            Fallback::Container(Container::Mp3) => "mp3",
            Fallback::Container(Container::Ogg) => "ogg",
        }
    }

    fn open(self, path: &Path) -> Result<SampleSource> {
        match self {
            Fallback::Wav => Ok(WavSource::open(path)?.into_sample_source()),
            Fallback::Container(container) => {
                let file = open_file(path)?;
                Ok(SymphoniaSource::open_container(file, container)?.into_sample_source())
            }
        }
    }
}

fn open_file(path: &Path) -> Result<File> {
    File::open(path).map_err(|source| Error::Open {
        path: path.to_path_buf(),
        source,
    })
}

/// Open `path` with the most capable decoder, falling back by extension.
pub fn open(path: &Path) -> Result<SampleSource> {
    open_with(path, |file, extension| {
        Ok(SymphoniaSource::probe(file, extension)?.into_sample_source())
    })
}

fn open_with<P>(path: &Path, probe: P) -> Result<SampleSource>
where
    P: FnOnce(File, Option<&str>) -> Result<SampleSource>,
{
    let file = open_file(path)?;
    let extension = path.extension().and_then(|e| e.to_str());

    let primary = match probe(file, extension) {
        Ok(source) => {
            log::info!(
                "Opened {} with {}: {}Hz, {} channel(s)",
                path.display(),
                source.decoder_name(),
                source.sample_rate(),
                source.num_channels()
            );
            return Ok(source);
        }
        Err(e) => e,
    };

    let format = extension.unwrap_or("unknown").to_string();
    let Some(fallback) = extension.and_then(fallback_for) else {
        return Err(Error::unsupported(format, primary));
    };

    log::warn!(
        "Probe failed for {} ({}), trying {} decoder",
        path.display(),
        primary,
        fallback.name()
    );
    match fallback.open(path) {
        Ok(source) => {
            log::info!(
                "Opened {} with {}: {}Hz, {} channel(s)",
                path.display(),
                source.decoder_name(),
                source.sample_rate(),
                source.num_channels()
            );
            Ok(source)
        }
        Err(e) => Err(Error::unsupported(
            format,
            format!("{}; {} fallback: {}", primary, fallback.name(), e),
        )),
    }
}

/// Position `source` at the start for another pass, reopening `path` if it cannot seek.
pub fn rewind(mut source: SampleSource, path: &Path) -> Result<SampleSource> {
    match source.seek(0) {
        Ok(()) => Ok(source),
        Err(e) => {
            log::debug!("Rewind by seek failed ({}), reopening {}", e, path.display());
            source.close();
            open(path)
        }
    }
}
