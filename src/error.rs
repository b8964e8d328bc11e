use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The file could not be opened at all.
    #[error("failed to open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no decodable audio track found")]
    NoTrack,

    /// No decoder accepted the input, or the decoder hit an encoding it cannot interpret.
    #[error("unsupported format '{format}': {reason}")]
    UnsupportedFormat { format: String, reason: String },

    #[error("decode error: {0}")]
    Decode(#[from] symphonia::core::errors::Error),

    #[error("WAV read error: {0}")]
    Wav(#[from] hound::Error),

    /// A read failure tagged with the analysis frame it interrupted.
    #[error("frame {frame}: {source}")]
    AtFrame {
        frame: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("no audio data")]
    NoAudioData,

    #[error("sample source is closed")]
    Closed,

    #[error("seeking is not supported by the {0} decoder")]
    SeekUnsupported(&'static str),

    #[error("seek failed: {0}")]
    Seek(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to read config {}: {source}", .path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid layout: {0}")]
    Layout(String),

    /// Failure in a consumer of rendered frames, such as the bar writer.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn unsupported(format: impl Into<String>, reason: impl ToString) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
            reason: reason.to_string(),
        }
    }

    /// Attach the frame index at which a read failed. Already-tagged errors keep their frame.
    pub fn at_frame(self, frame: usize) -> Self {
        match self {
            Self::AtFrame { .. } => self,
            other => Self::AtFrame {
                frame,
                source: Box::new(other),
            },
        }
    }

    /// The frame index carried by this error, if any.
    pub fn frame(&self) -> Option<usize> {
        match self {
            Self::AtFrame { frame, .. } => Some(*frame),
            _ => None,
        }
    }
}
