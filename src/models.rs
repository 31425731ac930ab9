use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::format::{AudioFormat, FormatSpec};

/// Body of `POST /process-audio`. Every field is optional here so that
/// missing values are reported by the pipeline rather than the JSON layer.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct ProcessRequest {
    pub url: Option<String>,
    pub loops: Option<i64>,
    #[serde(rename = "audioFormat")]
    pub audio_format: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub source_url: String,
    pub loops: u32,
    pub spec: &'static FormatSpec,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
}

pub enum FileType {
    Input,
    Output(AudioFormat),
}

pub fn build_file_name(id: Uuid, file_type: FileType) -> String {
    match file_type {
        FileType::Input => format!("{id}.mp3"),
        FileType::Output(format) => format!("{id}-looped.{format}"),
    }
}

pub fn build_path(root: &Path, id: Uuid, file_type: FileType) -> PathBuf {
    root.join(build_file_name(id, file_type))
}

impl Job {
    pub fn allocate(
        root: &Path,
        source_url: String,
        loops: u32,
        spec: &'static FormatSpec,
    ) -> Job {
        Job::with_id(Uuid::new_v4(), root, source_url, loops, spec)
    }

    pub fn with_id(
        id: Uuid,
        root: &Path,
        source_url: String,
        loops: u32,
        spec: &'static FormatSpec,
    ) -> Job {
        Job {
            id,
            source_url,
            loops,
            spec,
            input_path: build_path(root, id, FileType::Input),
            output_path: build_path(root, id, FileType::Output(spec.format)),
        }
    }

    pub fn format(&self) -> AudioFormat {
        self.spec.format
    }

    pub fn output_file_name(&self) -> String {
        build_file_name(self.id, FileType::Output(self.spec.format))
    }
}

/// What a successful run leaves behind.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ProcessedAudio {
    pub id: Uuid,
    pub format: AudioFormat,
    pub loops: u32,
    pub file_name: String,
    pub output_path: PathBuf,
}
