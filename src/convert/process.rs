//! External tool runner

use std::ffi::OsStr;
use std::io;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use super::error::ToolError;
use crate::logger;

/// Keep at most this much stderr in error messages
const STDERR_TAIL_BYTES: usize = 2000;

/// A program and its arguments
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    program: String,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl ToolInvocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: None,
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for arg in args {
            self = self.arg(arg);
        }
        self
    }

    #[must_use]
    pub fn timeout_secs(mut self, secs: Option<u64>) -> Self {
        self.timeout = secs.map(Duration::from_secs);
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }
}

/// Captured output of a successful run
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Run the tool to completion. The child is killed if the timeout expires
/// or the calling future is dropped.
pub async fn run_tool(invocation: &ToolInvocation) -> Result<ToolOutput, ToolError> {
    let program = invocation.program.clone();
    logger::log_tool_start(&program, &invocation.args);

    let mut command = Command::new(&invocation.program);
    command
        .args(&invocation.args)
        .stdin(Stdio::null())
        .kill_on_drop(true);
    let child = command.output();

    let result = match invocation.timeout {
        Some(limit) => match tokio::time::timeout(limit, child).await {
            Ok(result) => result,
            Err(_) => {
                return Err(ToolError::TimedOut {
                    program,
                    secs: limit.as_secs(),
                })
            }
        },
        None => child.await,
    };

    let output = result.map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => ToolError::NotFound {
            program: program.clone(),
        },
        _ => ToolError::Io {
            program: program.clone(),
            source,
        },
    })?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    logger::log_tool_stderr(&program, &stderr);

    if output.status.success() {
        Ok(ToolOutput { stdout, stderr })
    } else {
        Err(ToolError::Failed {
            program,
            code: output.status.code(),
            stderr: tail(&stderr, STDERR_TAIL_BYTES).trim().to_string(),
        })
    }
}

/// Last `max` bytes of `text`, cut on a char boundary
fn tail(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut start = text.len() - max;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}
