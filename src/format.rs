use serde::Serialize;
use std::fmt;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Mp3,
    Wav,
}

impl AudioFormat {
    pub fn extension(self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Wav => "wav",
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Codec parameters handed to the looping stage for one output format.
#[derive(Debug, PartialEq, Eq)]
pub struct FormatSpec {
    pub format: AudioFormat,
    pub codec_args: &'static [&'static str],
}

pub const DEFAULT_FORMAT: &str = "mp3";

// The intermediate is always mp3, so mp3 output is a plain stream copy.
static FORMATS: [FormatSpec; 2] = [
    FormatSpec {
        format: AudioFormat::Mp3,
        codec_args: &["-c:a", "copy"],
    },
    FormatSpec {
        format: AudioFormat::Wav,
        codec_args: &["-c:a", "pcm_s16le"],
    },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejected {
    pub requested: String,
}

impl Rejected {
    pub fn allowed() -> String {
        FORMATS
            .iter()
            .map(|spec| spec.format.extension())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Rejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid format. Allowed: {}", Rejected::allowed())
    }
}

pub fn validate(name: &str) -> Result<&'static FormatSpec, Rejected> {
    FORMATS
        .iter()
        .find(|spec| spec.format.extension() == name)
        .ok_or_else(|| Rejected {
            requested: name.to_owned(),
        })
}
