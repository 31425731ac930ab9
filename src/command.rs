use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("{descriptor} could not be started: {source}")]
    Spawn {
        descriptor: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{descriptor} failed with status {status:?}\n\n{stderr}")]
    Failed {
        descriptor: String,
        status: Option<i32>,
        stderr: String,
    },

    #[error("{descriptor} did not finish within {}s", .after.as_secs())]
    TimedOut { descriptor: String, after: Duration },
}

impl CommandError {
    /// Raw text the tool produced, if it got far enough to produce any.
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            CommandError::Failed { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessOutput {
    /// Exit code, `None` when the process was killed by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Launches an external program and waits for it to exit.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, executable: &str, arguments: &[String])
        -> Result<ProcessOutput, CommandError>;
}

/// Spawns real processes through tokio. Arguments go straight to the
/// process as a vector, never through a shell.
pub struct SystemRunner {
    timeout: Option<Duration>,
}

impl SystemRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl ProcessRunner for SystemRunner {
    async fn run(
        &self,
        executable: &str,
        arguments: &[String],
    ) -> Result<ProcessOutput, CommandError> {
        debug!(executable, ?arguments, "spawning");

        let child = Command::new(executable)
            .args(arguments)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CommandError::Spawn {
                descriptor: executable.to_owned(),
                source,
            })?;

        let waiting = child.wait_with_output();

        // Dropping the future on timeout drops the child, which kills it.
        let output = match self.timeout {
            Some(after) => tokio::time::timeout(after, waiting).await.map_err(|_| {
                CommandError::TimedOut {
                    descriptor: executable.to_owned(),
                    after,
                }
            })?,
            None => waiting.await,
        }
        .map_err(|source| CommandError::Spawn {
            descriptor: executable.to_owned(),
            source,
        })?;

        Ok(ProcessOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

pub async fn run_command(
    runner: &dyn ProcessRunner,
    executable: &str,
    arguments: Vec<String>,
    descriptor: &str,
) -> Result<ProcessOutput, CommandError> {
    let output = runner
        .run(executable, &arguments)
        .await
        .map_err(|err| match err {
            CommandError::Spawn { source, .. } => CommandError::Spawn {
                descriptor: descriptor.to_owned(),
                source,
            },
            CommandError::TimedOut { after, .. } => CommandError::TimedOut {
                descriptor: descriptor.to_owned(),
                after,
            },
            other => other,
        })?;

    debug!(descriptor, status = ?output.status, stdout = %output.stdout, "tool exited");

    if !output.success() {
        return Err(CommandError::Failed {
            descriptor: descriptor.to_owned(),
            status: output.status,
            stderr: output.stderr,
        });
    }

    Ok(output)
}
