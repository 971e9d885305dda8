// dbassist/src/utils/process.rs
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, error, info};

use super::find_executable;

/// Program and verb used to push the declared schema to the live database.
pub const PUSH_PROGRAM: &str = "npx";
pub const PUSH_TOOL: &str = "drizzle-kit";
pub const PUSH_LOG_PREFIX: &str = "[drizzle-kit push]";

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Failed to start command \"{command}\": {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command \"{command}\" failed with code {}", describe_code(.code))]
    Exit { command: String, code: Option<i32> },
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "none (terminated by signal)".to_string(),
    }
}

/// A single external command invocation: program, argument list, optional working directory.
///
/// Arguments are kept as a list and handed to the OS unjoined; no shell is involved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessCommand {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub log_prefix: Option<String>,
}

impl ProcessCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            log_prefix: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn log_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.log_prefix = Some(prefix.into());
        self
    }

    /// Program followed by its arguments, for log lines and error messages.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn prefix(&self) -> String {
        self.log_prefix
            .clone()
            .unwrap_or_else(|| format!("[{}]", self.program))
    }
}

/// Builds the schema-push invocation, run from the project root.
pub fn schema_push_command(config_path: Option<&Path>, project_root: &Path) -> ProcessCommand {
    let mut command = ProcessCommand::new(PUSH_PROGRAM).arg(PUSH_TOOL).arg("push");
    if let Some(path) = config_path {
        command = command
            .arg("--config")
            .arg(path.to_string_lossy().into_owned());
    }
    command
        .current_dir(project_root)
        .log_prefix(PUSH_LOG_PREFIX)
}

#[allow(async_fn_in_trait)]
pub trait ProcessRunner {
    /// Runs the command to completion. Succeeds only on exit code zero.
    async fn run(&self, command: &ProcessCommand) -> Result<(), ProcessError>;
}

/// Spawns commands with tokio and streams their output into the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioProcessRunner;

impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, command: &ProcessCommand) -> Result<(), ProcessError> {
        let shown = command.display();
        match &command.cwd {
            Some(dir) => debug!("Executing command: {} in {}", shown, dir.display()),
            None => debug!("Executing command: {}", shown),
        }

        let spawn_error = |source: std::io::Error| {
            debug!("Failed to start command \"{}\": {}", command.program, source);
            ProcessError::Spawn {
                command: command.program.clone(),
                source,
            }
        };

        let program = find_executable(&command.program)
            .map_err(|e| spawn_error(std::io::Error::new(std::io::ErrorKind::NotFound, e)))?;

        let mut cmd = Command::new(&program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &command.cwd {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(spawn_error)?;

        let prefix = command.prefix();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        tokio::join!(
            stream_lines(stdout, &prefix, StreamKind::Stdout),
            stream_lines(stderr, &prefix, StreamKind::Stderr),
        );

        let status = child.wait().await.map_err(spawn_error)?;
        if status.success() {
            debug!("Command \"{}\" executed successfully.", shown);
            Ok(())
        } else {
            debug!("Command \"{}\" failed with code {:?}.", shown, status.code());
            Err(ProcessError::Exit {
                command: shown,
                code: status.code(),
            })
        }
    }
}

#[derive(Clone, Copy)]
enum StreamKind {
    Stdout,
    Stderr,
}

async fn stream_lines<R>(stream: Option<R>, prefix: &str, kind: StreamKind)
where
    R: AsyncRead + Unpin,
{
    let Some(stream) = stream else {
        return;
    };
    let mut lines = BufReader::new(stream).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim_end();
                if line.is_empty() {
                    continue;
                }
                match kind {
                    StreamKind::Stdout => info!("{}: {}", prefix, line),
                    StreamKind::Stderr => error!("{} (stderr): {}", prefix, line),
                }
            }
            Ok(None) => break,
            Err(e) => {
                debug!("{}: stopped reading output: {}", prefix, e);
                break;
            }
        }
    }
}
