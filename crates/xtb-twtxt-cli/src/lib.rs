//! twtxt / txtnish process runner.
//!
//! Spawns the client with an argument vector (never through a shell) and
//! captures stdout. Non-zero exits surface as `Error::Tool` with a bounded
//! stderr tail.

use std::{collections::VecDeque, process::Stdio, sync::Arc};

use async_trait::async_trait;

use tokio::{
    io::{AsyncBufReadExt, AsyncReadExt, BufReader},
    process::Command,
    sync::Mutex,
};

use xtb_core::{
    errors::Error,
    twtxt::{CliInvocation, CommandRunner},
    Result,
};

const STDERR_TAIL_MAX_BYTES: usize = 16 * 1024;
const STDERR_TAIL_MAX_LINES: usize = 200;

#[derive(Clone, Debug, Default)]
pub struct TwtxtCliRunner;

#[derive(Clone, Debug, Default)]
struct StderrTail {
    lines: VecDeque<String>,
    bytes: usize,
}

impl StderrTail {
    fn push_line(&mut self, line: String) {
        // +1 for the '\n' we join with later.
        self.bytes = self.bytes.saturating_add(line.len() + 1);
        self.lines.push_back(line);

        while self.lines.len() > STDERR_TAIL_MAX_LINES || self.bytes > STDERR_TAIL_MAX_BYTES {
            if let Some(front) = self.lines.pop_front() {
                self.bytes = self.bytes.saturating_sub(front.len() + 1);
            } else {
                break;
            }
        }
    }

    fn snapshot(&self) -> String {
        self.lines.iter().cloned().collect::<Vec<_>>().join("\n")
    }
}

impl TwtxtCliRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for TwtxtCliRunner {
    async fn run(&self, inv: CliInvocation) -> Result<String> {
        tracing::debug!(program = %inv.program.display(), args = ?inv.args, "running twtxt");

        let mut cmd = Command::new(&inv.program);
        cmd.args(&inv.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            Error::External(format!(
                "failed to start {}: {e}",
                inv.program.display()
            ))
        })?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::External("twtxt stdout was not captured".to_string()))?;
        let stderr_tail: Arc<Mutex<StderrTail>> = Arc::new(Mutex::new(StderrTail::default()));

        // Drain stderr in background to avoid blocking on a full pipe.
        let stderr_task = child.stderr.take().map(|stderr| {
            let tail = stderr_tail.clone();
            tokio::spawn(async move {
                let mut r = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = r.next_line().await {
                    tail.lock().await.push_line(line);
                }
            })
        });

        let mut raw = Vec::new();
        stdout.read_to_end(&mut raw).await?;
        let status = child.wait().await?;
        if let Some(task) = stderr_task {
            let _ = task.await;
        }

        if !status.success() {
            let stderr = stderr_tail.lock().await.snapshot();
            tracing::debug!(%status, "twtxt exited unsuccessfully");
            return Err(Error::Tool { status, stderr });
        }

        Ok(String::from_utf8_lossy(&raw).into_owned())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn sh(script: &str) -> CliInvocation {
        CliInvocation {
            program: PathBuf::from("/bin/sh"),
            args: vec!["-c".to_string(), script.to_string()],
        }
    }

    #[tokio::test]
    async fn captures_stdout() {
        let out = TwtxtCliRunner::new()
            .run(sh("printf 'a\\nb\\n'"))
            .await
            .unwrap();
        assert_eq!(out, "a\nb\n");
    }

    #[tokio::test]
    async fn arguments_are_not_shell_interpreted() {
        let inv = CliInvocation {
            program: PathBuf::from("/bin/echo"),
            args: vec!["hello; echo injected".to_string()],
        };
        let out = TwtxtCliRunner::new().run(inv).await.unwrap();
        assert_eq!(out, "hello; echo injected\n");
    }

    #[tokio::test]
    async fn non_zero_exit_is_a_tool_error_with_stderr() {
        let err = TwtxtCliRunner::new()
            .run(sh("echo boom >&2; exit 3"))
            .await
            .unwrap_err();
        match err {
            Error::Tool { status, stderr } => {
                assert_eq!(status.code(), Some(3));
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_program_is_an_error() {
        let inv = CliInvocation {
            program: PathBuf::from("/nonexistent/twtxt"),
            args: vec!["timeline".to_string()],
        };
        assert!(matches!(
            TwtxtCliRunner::new().run(inv).await,
            Err(Error::External(_))
        ));
    }

    #[test]
    fn stderr_tail_is_bounded() {
        let mut tail = StderrTail::default();
        for i in 0..(STDERR_TAIL_MAX_LINES + 10) {
            tail.push_line(format!("line {i}"));
        }
        assert_eq!(tail.lines.len(), STDERR_TAIL_MAX_LINES);
        assert!(tail.snapshot().starts_with("line 10\n"));
    }
}
