use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_PORT: u16 = 3000;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{key} must be a positive integer, got {value:?}")]
    NotPositive { key: &'static str, value: String },

    #[error("{key} must be one of keep, failed, all, got {value:?}")]
    UnknownCleanup { key: &'static str, value: String },
}

/// What happens to a job's files once the pipeline is done with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupPolicy {
    /// Leave every file on disk.
    Keep,
    /// Remove the intermediate and any partial output when a stage fails.
    OnFailure,
    /// Like `OnFailure`, and also drop the intermediate after success.
    All,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub storage_root: PathBuf,
    pub host: String,
    pub port: u16,
    /// Base for download links. Derived from the request when unset.
    pub public_url: Option<String>,
    pub ytdlp_path: String,
    pub ffmpeg_path: String,
    pub tool_timeout: Option<Duration>,
    pub max_concurrent_jobs: Option<usize>,
    pub cleanup: CleanupPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from("files"),
            host: "0.0.0.0".to_owned(),
            port: DEFAULT_PORT,
            public_url: None,
            ytdlp_path: "yt-dlp".to_owned(),
            ffmpeg_path: "ffmpeg".to_owned(),
            tool_timeout: None,
            max_concurrent_jobs: None,
            cleanup: CleanupPolicy::OnFailure,
        }
    }
}

fn positive(key: &'static str, value: String) -> Result<u64, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::NotPositive { key, value }),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        config.port = lookup("PORT")
            .and_then(|string| string.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        if let Some(host) = lookup("LOOPSERVE_HOST") {
            config.host = host;
        }
        if let Some(root) = lookup("LOOPSERVE_STORAGE_ROOT") {
            config.storage_root = PathBuf::from(root);
        }
        config.public_url = lookup("LOOPSERVE_PUBLIC_URL")
            .map(|url| url.trim_end_matches('/').to_owned())
            .filter(|url| !url.is_empty());
        if let Some(path) = lookup("LOOPSERVE_YTDLP") {
            config.ytdlp_path = path;
        }
        if let Some(path) = lookup("LOOPSERVE_FFMPEG") {
            config.ffmpeg_path = path;
        }

        if let Some(value) = lookup("LOOPSERVE_TOOL_TIMEOUT_SECS") {
            let secs = positive("LOOPSERVE_TOOL_TIMEOUT_SECS", value)?;
            config.tool_timeout = Some(Duration::from_secs(secs));
        }
        if let Some(value) = lookup("LOOPSERVE_MAX_JOBS") {
            config.max_concurrent_jobs = Some(positive("LOOPSERVE_MAX_JOBS", value)? as usize);
        }

        if let Some(value) = lookup("LOOPSERVE_CLEANUP") {
            let policy = match value.trim() {
                "keep" => Some(CleanupPolicy::Keep),
                "failed" => Some(CleanupPolicy::OnFailure),
                "all" => Some(CleanupPolicy::All),
                _ => None,
            };
            config.cleanup = policy.ok_or(ConfigError::UnknownCleanup {
                key: "LOOPSERVE_CLEANUP",
                value,
            })?;
        }

        Ok(config)
    }
}
