//! Bounded execution of external tools.

use std::io::{BufReader, Read};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use reelforge_common::error::ReelforgeError;

/// How often a running child is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Maximum stderr characters kept in error messages.
const STDERR_TAIL_CHARS: usize = 500;

/// A single external tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
}

impl ToolInvocation {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    /// Space-joined command line, for logs.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured result of a tool that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ToolOutput {
    pub success: bool,
    /// Exit status description (e.g. `exit status: 1`).
    pub status: String,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// Turn a non-zero exit into a [`StageError::Exit`].
    pub fn check(self, program: &str) -> Result<Self, StageError> {
        if self.success {
            Ok(self)
        } else {
            Err(StageError::Exit {
                program: program.to_string(),
                status: self.status,
                stderr: stderr_tail(&self.stderr),
            })
        }
    }
}

/// Why a tool invocation did not produce its artifact.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} failed ({status}): {stderr}")]
    Exit {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("{program} timed out after {}s", after.as_secs())]
    Timeout { program: String, after: Duration },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StageError {
    /// Whether the failure was a timeout rather than a tool-reported error.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Attach a stage name to produce a workspace-level error.
    pub fn into_reelforge(self, stage: &str) -> ReelforgeError {
        ReelforgeError::stage(stage, self.to_string())
    }
}

/// Executes tool invocations. Implemented by [`ProcessRunner`] for real runs
/// and by scripted fakes in tests.
pub trait ToolRunner: Send + Sync {
    /// Run the tool to completion or until its timeout.
    ///
    /// A tool that exits non-zero still yields `Ok` with `success == false`;
    /// callers decide whether that is a failure via [`ToolOutput::check`].
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, StageError>;
}

/// Runs tools as child processes, killing them when they overrun.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

impl ToolRunner for ProcessRunner {
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, StageError> {
        tracing::debug!(command = %invocation.command_line(), "Running tool");
        let started = Instant::now();

        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| StageError::Spawn {
                program: invocation.program.clone(),
                source,
            })?;

        // Drain both pipes concurrently so a chatty tool never blocks on a full pipe.
        let stdout_task = child.stdout.take().map(spawn_reader);
        let stderr_task = child.stderr.take().map(spawn_reader);

        let deadline = started + invocation.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(err) => {
                    abandon(&mut child, stdout_task, stderr_task, &invocation.program);
                    tracing::warn!(error = %err, program = %invocation.program, "Lost track of tool process");
                    return Err(StageError::Io(err));
                }
            }
            if Instant::now() >= deadline {
                abandon(&mut child, stdout_task, stderr_task, &invocation.program);
                tracing::warn!(
                    program = %invocation.program,
                    timeout_secs = invocation.timeout.as_secs(),
                    "Tool timed out"
                );
                return Err(StageError::Timeout {
                    program: invocation.program.clone(),
                    after: invocation.timeout,
                });
            }
            std::thread::sleep(POLL_INTERVAL);
        };

        let output = ToolOutput {
            success: status.success(),
            status: status.to_string(),
            stdout: join_reader(stdout_task),
            stderr: join_reader(stderr_task),
        };

        tracing::debug!(
            program = %invocation.program,
            success = output.success,
            elapsed_ms = started.elapsed().as_millis(),
            "Tool finished"
        );
        Ok(output)
    }
}

/// Kill a child we are giving up on, reap it, and release its pipe readers.
fn abandon(
    child: &mut Child,
    stdout_task: Option<std::thread::JoinHandle<String>>,
    stderr_task: Option<std::thread::JoinHandle<String>>,
    program: &str,
) {
    if let Err(err) = child.kill() {
        tracing::warn!(error = %err, program = %program, "Failed to kill tool");
    }
    child.wait().ok();
    join_reader(stderr_task);
    join_reader(stdout_task);
}

fn spawn_reader<R: Read + Send + 'static>(pipe: R) -> std::thread::JoinHandle<String> {
    std::thread::spawn(move || {
        let mut reader = BufReader::new(pipe);
        let mut bytes = Vec::new();
        match reader.read_to_end(&mut bytes) {
            Ok(_) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(err) => format!("<failed to read tool output: {err}>"),
        }
    })
}

fn join_reader(task: Option<std::thread::JoinHandle<String>>) -> String {
    task.map(|t| {
        t.join()
            .unwrap_or_else(|_| "<failed to join output reader>".to_string())
    })
    .unwrap_or_default()
}

/// Last few hundred characters of a tool's stderr, trimmed.
pub fn stderr_tail(stderr: &str) -> String {
    let trimmed = stderr.trim();
    let count = trimmed.chars().count();
    if count <= STDERR_TAIL_CHARS {
        return trimmed.to_string();
    }
    let tail: String = trimmed.chars().skip(count - STDERR_TAIL_CHARS).collect();
    format!("...{tail}")
}

/// Whether `program` can be started at all.
pub fn tool_available(runner: &dyn ToolRunner, program: &str) -> bool {
    let invocation = ToolInvocation::new(
        program,
        vec!["-version".to_string()],
        Duration::from_secs(10),
    );
    runner
        .run(&invocation)
        .map(|output| output.success)
        .unwrap_or(false)
}
