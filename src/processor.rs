use regex::Regex;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::command::{run_command, CommandError, ProcessRunner};
use crate::config::{CleanupPolicy, Config};
use crate::error::{Outcome, PipelineError};
use crate::format::{self, FormatSpec, DEFAULT_FORMAT};
use crate::models::{Job, ProcessRequest, ProcessedAudio};

const SOURCE_URL_PATTERN: &str = r"^https?://[^\s/?#]+[^\s]*$";

// ffmpeg reads `-stream_loop` as a signed 32-bit int.
pub const MAX_LOOPS: u32 = i32::MAX as u32 + 1;

pub type PipelineResult = Result<ProcessedAudio, PipelineError>;

/// Runs jobs through acquisition and then looping. Cheap to share; each
/// call to `run` is an independent job.
pub struct Pipeline {
    config: Config,
    runner: Arc<dyn ProcessRunner>,
    admission: Option<Semaphore>,
    source_url: Regex,
}

fn acquisition_arguments(job: &Job) -> Vec<String> {
    vec![
        "-f".to_owned(),
        "bestaudio".to_owned(),
        "-x".to_owned(),
        "--audio-format".to_owned(),
        // The looping stage expects an mp3 intermediate whatever the final format.
        "mp3".to_owned(),
        "-o".to_owned(),
        job.input_path.to_string_lossy().into_owned(),
        "--".to_owned(),
        job.source_url.clone(),
    ]
}

fn looping_arguments(job: &Job, spec: &FormatSpec) -> Vec<String> {
    let mut arguments = vec![
        "-stream_loop".to_owned(),
        // The first play-through is the source itself.
        (job.loops - 1).to_string(),
        "-i".to_owned(),
        job.input_path.to_string_lossy().into_owned(),
    ];
    arguments.extend(spec.codec_args.iter().map(|arg| arg.to_string()));
    arguments.push(job.output_path.to_string_lossy().into_owned());
    arguments
}

async fn remove_if_present(job: &Job, path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => info!(job = %job.id, path = %path.display(), "processor: removed file"),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => {
            warn!(job = %job.id, path = %path.display(), error = %err, "processor: could not remove file")
        }
    }
}

impl Pipeline {
    pub fn new(config: Config, runner: Arc<dyn ProcessRunner>) -> Self {
        let admission = config.max_concurrent_jobs.map(Semaphore::new);

        Self {
            config,
            runner,
            admission,
            source_url: Regex::new(SOURCE_URL_PATTERN).expect("source URL pattern is valid"),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Checks the request and allocates a job for it. Touches nothing on disk.
    pub fn prepare(&self, request: ProcessRequest) -> Result<Job, PipelineError> {
        let (url, loops) = match (request.url, request.loops) {
            (Some(url), Some(loops)) if !url.is_empty() && loops != 0 => (url, loops),
            _ => {
                return Err(PipelineError::InputInvalid(
                    "url and loops required".to_owned(),
                ))
            }
        };

        let loops = u32::try_from(loops)
            .ok()
            .filter(|&loops| loops >= 1)
            .ok_or_else(|| {
                PipelineError::InputInvalid("loops must be a positive integer".to_owned())
            })?;

        if loops > MAX_LOOPS {
            return Err(PipelineError::InputInvalid(format!(
                "loops must be at most {MAX_LOOPS}"
            )));
        }

        if !self.source_url.is_match(&url) {
            return Err(PipelineError::InputInvalid(
                "url must be an http or https URL".to_owned(),
            ));
        }

        let name = request.audio_format.as_deref().unwrap_or(DEFAULT_FORMAT);
        let spec = format::validate(name).map_err(PipelineError::FormatInvalid)?;

        Ok(Job::allocate(&self.config.storage_root, url, loops, spec))
    }

    pub async fn acquire(&self, job: &Job) -> Result<(), CommandError> {
        info!(job = %job.id, url = %job.source_url, "processor: starting download");

        run_command(
            self.runner.as_ref(),
            &self.config.ytdlp_path,
            acquisition_arguments(job),
            "yt-dlp download",
        )
        .await?;

        Ok(())
    }

    pub async fn loop_audio(&self, job: &Job, spec: &FormatSpec) -> Result<(), CommandError> {
        info!(job = %job.id, loops = job.loops, format = %spec.format, "processor: starting ffmpeg");

        run_command(
            self.runner.as_ref(),
            &self.config.ffmpeg_path,
            looping_arguments(job, spec),
            "ffmpeg loop",
        )
        .await?;

        Ok(())
    }

    pub async fn run(&self, request: ProcessRequest) -> PipelineResult {
        let job = self.prepare(request)?;

        let _permit = match &self.admission {
            // The semaphore is never closed, so acquire cannot fail.
            Some(semaphore) => semaphore.acquire().await.ok(),
            None => None,
        };

        let result = self.execute(&job).await;
        let outcome = result
            .as_ref()
            .map_or_else(PipelineError::outcome, |_| Outcome::Success);

        match &result {
            Ok(done) => {
                info!(job = %job.id, ?outcome, path = %done.output_path.display(), "processor: complete");
                if self.config.cleanup == CleanupPolicy::All {
                    remove_if_present(&job, &job.input_path).await;
                }
            }
            Err(err) => {
                warn!(
                    job = %job.id,
                    ?outcome,
                    error = %err,
                    diagnostic = err.diagnostic().unwrap_or(""),
                    "processor: ended with error"
                );
                if self.config.cleanup != CleanupPolicy::Keep {
                    remove_if_present(&job, &job.input_path).await;
                    remove_if_present(&job, &job.output_path).await;
                }
            }
        }

        result
    }

    async fn execute(&self, job: &Job) -> PipelineResult {
        self.acquire(job)
            .await
            .map_err(PipelineError::AcquisitionFailed)?;

        self.loop_audio(job, job.spec)
            .await
            .map_err(PipelineError::LoopingFailed)?;

        Ok(ProcessedAudio {
            id: job.id,
            format: job.format(),
            loops: job.loops,
            file_name: job.output_file_name(),
            output_path: job.output_path.clone(),
        })
    }
}
