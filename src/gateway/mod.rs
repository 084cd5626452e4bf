// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 reconflow contributors

//! Tool gateway
//!
//! Wraps the invocation of one external executable: builds the child
//! process, supplies stdin from an artifact when asked, streams stdout
//! into the staged artifact file rather than buffering it (scan output
//! can be huge), captures stderr for diagnostics, and enforces the
//! stage's wall-clock timeout. Exactly one child is spawned per call and
//! it is always reaped, including on timeout.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

use crate::errors::{install_hint, ReconflowError, ReconflowResult};

/// A fully resolved external tool invocation
#[derive(Debug, Clone)]
pub struct InvocationRequest {
    /// Executable name or path
    pub tool: String,
    pub args: Vec<String>,
    /// File piped to the child's stdin
    pub stdin: Option<PathBuf>,
    /// Where child stdout streams to; `None` discards stdout (the tool
    /// writes its output file itself)
    pub stdout_to: Option<PathBuf>,
    /// Child working directory (the staging root, so relative paths in
    /// args resolve into the staging area)
    pub cwd: PathBuf,
    pub timeout: Duration,
}

/// Observed result of a completed (non-timed-out) child process
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub exit_code: i32,
    pub stderr: String,
    pub stdout_bytes: u64,
    pub duration: Duration,
}

impl ToolOutput {
    /// The gateway never inspects stdout content; exit status is the only
    /// success signal. Zero findings with exit 0 is success.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Seam between the runner and the operating system
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    /// Run one external tool to completion or timeout.
    ///
    /// Returns `Ok` with the exit status for any process that ran and
    /// exited (including non-zero); `Err(Timeout)` when the limit
    /// expired (the child is killed and reaped); `Err(SpawnFailed)` when
    /// the process could not start.
    async fn invoke(&self, request: &InvocationRequest) -> ReconflowResult<ToolOutput>;
}

/// Gateway that spawns real child processes
#[derive(Debug, Default)]
pub struct SystemGateway;

impl SystemGateway {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ToolInvoker for SystemGateway {
    async fn invoke(&self, request: &InvocationRequest) -> ReconflowResult<ToolOutput> {
        let start = Instant::now();

        let mut cmd = Command::new(&request.tool);
        cmd.args(&request.args)
            .current_dir(&request.cwd)
            .stdout(if request.stdout_to.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        match &request.stdin {
            Some(path) => {
                let file =
                    std::fs::File::open(path).map_err(|e| ReconflowError::io(path, e))?;
                cmd.stdin(Stdio::from(file));
            }
            None => {
                cmd.stdin(Stdio::null());
            }
        }

        tracing::debug!(tool = %request.tool, args = ?request.args, "spawning");

        let mut child = cmd.spawn().map_err(|e| ReconflowError::SpawnFailed {
            tool: request.tool.clone(),
            error: e.to_string(),
            help: Some(install_hint(&request.tool)),
        })?;

        let mut stdout_pipe = child.stdout.take();
        let mut stderr_pipe = child.stderr.take();

        let run = async {
            let mut stderr_buf = String::new();
            let mut copied: u64 = 0;

            match (stdout_pipe.as_mut(), request.stdout_to.as_ref()) {
                (Some(out), Some(dest)) => {
                    let mut file = tokio::fs::File::create(dest)
                        .await
                        .map_err(|e| ReconflowError::io(dest, e))?;

                    // drain both pipes concurrently so neither can fill
                    // and stall the child
                    let (copy_res, _) = tokio::join!(
                        tokio::io::copy(out, &mut file),
                        read_stderr(&mut stderr_pipe, &mut stderr_buf),
                    );
                    copied = copy_res.map_err(|e| ReconflowError::io(dest, e))?;
                    file.flush().await.map_err(|e| ReconflowError::io(dest, e))?;
                }
                _ => {
                    read_stderr(&mut stderr_pipe, &mut stderr_buf).await;
                }
            }

            let status = child.wait().await.map_err(|e| ReconflowError::SpawnFailed {
                tool: request.tool.clone(),
                error: e.to_string(),
                help: None,
            })?;

            Ok::<_, ReconflowError>((status, stderr_buf, copied))
        };

        match tokio::time::timeout(request.timeout, run).await {
            Ok(result) => {
                let (status, stderr, stdout_bytes) = result?;
                let output = ToolOutput {
                    exit_code: status.code().unwrap_or(-1),
                    stderr,
                    stdout_bytes,
                    duration: start.elapsed(),
                };
                tracing::debug!(
                    tool = %request.tool,
                    exit_code = output.exit_code,
                    stdout_bytes,
                    "child exited"
                );
                Ok(output)
            }
            Err(_) => {
                // terminate and fully reap so nothing is orphaned
                let _ = child.start_kill();
                let _ = child.wait().await;
                Err(ReconflowError::Timeout {
                    tool: request.tool.clone(),
                    limit_secs: request.timeout.as_secs(),
                })
            }
        }
    }
}

async fn read_stderr(pipe: &mut Option<tokio::process::ChildStderr>, buf: &mut String) {
    if let Some(err) = pipe.as_mut() {
        let _ = err.read_to_string(buf).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn request(dir: &TempDir, tool: &str, args: &[&str]) -> InvocationRequest {
        InvocationRequest {
            tool: tool.into(),
            args: args.iter().map(|s| s.to_string()).collect(),
            stdin: None,
            stdout_to: None,
            cwd: dir.path().to_path_buf(),
            timeout: Duration::from_secs(10),
        }
    }

    #[tokio::test]
    async fn test_stdout_streams_to_file() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("out.txt");

        let mut req = request(&dir, "sh", &["-c", "printf 'b\\na\\n'"]);
        req.stdout_to = Some(dest.clone());

        let output = SystemGateway::new().invoke(&req).await.unwrap();
        assert!(output.success());
        assert_eq!(output.stdout_bytes, 4);
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "b\na\n");
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_reported_not_errored() {
        let dir = TempDir::new().unwrap();
        let req = request(&dir, "sh", &["-c", "echo oops >&2; exit 3"]);

        let output = SystemGateway::new().invoke(&req).await.unwrap();
        assert!(!output.success());
        assert_eq!(output.exit_code, 3);
        assert!(output.stderr.contains("oops"));
    }

    #[tokio::test]
    async fn test_stdin_pipes_artifact_content() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.txt");
        let dest = dir.path().join("out.txt");
        std::fs::write(&input, "one\ntwo\n").unwrap();

        let mut req = request(&dir, "sh", &["-c", "cat"]);
        req.stdin = Some(input);
        req.stdout_to = Some(dest.clone());

        let output = SystemGateway::new().invoke(&req).await.unwrap();
        assert!(output.success());
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "one\ntwo\n");
    }

    #[tokio::test]
    async fn test_timeout_kills_child() {
        let dir = TempDir::new().unwrap();
        let mut req = request(&dir, "sleep", &["30"]);
        req.timeout = Duration::from_millis(200);

        let start = Instant::now();
        let result = SystemGateway::new().invoke(&req).await;

        assert!(matches!(result, Err(ReconflowError::Timeout { .. })));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_failure() {
        let dir = TempDir::new().unwrap();
        let req = request(&dir, "reconflow-no-such-binary", &[]);

        let result = SystemGateway::new().invoke(&req).await;
        assert!(matches!(result, Err(ReconflowError::SpawnFailed { .. })));
    }
}
