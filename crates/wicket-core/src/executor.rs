use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};

/// Grace period between the terminate signal and the force kill.
const KILL_GRACE: Duration = Duration::from_secs(5);

/// Keeps the child from throttling itself with telemetry traffic.
const DISABLE_TRAFFIC_ENV: &str = "CLAUDE_CODE_DISABLE_NONESSENTIAL_TRAFFIC";

/// Removed so the child does not report itself as a nested session.
const NESTED_SESSION_ENVS: &[&str] = &[
    "CLAUDECODE",
    "CLAUDE_CODE_TASK_LIST_ID",
    "CLAUDE_CODE_ENTRYPOINT",
];

/// What one child-process run produced. When `killed` is set the deadline
/// enforcer terminated the child and `exit_code` carries no meaning.
#[derive(Debug, Clone, Default)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub killed: bool,
}

/// Seam between the scheduler and the external CLI. The scheduler only ever
/// holds `Arc<dyn AgentExecutor>`, so tests substitute a scripted double.
#[async_trait]
pub trait AgentExecutor: Send + Sync {
    /// Run one child to completion (or deadline) and return its collected
    /// output. A spawn failure is an `Err`, never a fabricated result.
    async fn execute(&self, args: &[String], timeout: Duration)
        -> anyhow::Result<ExecutionResult>;
}

/// Executor that launches the real CLI binary, resolved via `PATH`.
#[derive(Debug, Clone)]
pub struct CliExecutor {
    bin: String,
}

impl CliExecutor {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }
}

#[async_trait]
impl AgentExecutor for CliExecutor {
    async fn execute(
        &self,
        args: &[String],
        timeout: Duration,
    ) -> anyhow::Result<ExecutionResult> {
        let mut cmd = Command::new(&self.bin);
        cmd.args(args)
            .env(DISABLE_TRAFFIC_ENV, "1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for var in NESTED_SESSION_ENVS {
            cmd.env_remove(var);
        }

        let mut child = cmd.spawn()?;

        // Drain both pipes to EOF off to the side so a chatty child cannot
        // fill a pipe buffer and wedge against our wait below.
        let stdout_pipe = child.stdout.take();
        let stdout_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(mut pipe) = stdout_pipe {
                let _ = pipe.read_to_end(&mut buf).await;
            }
            buf
        });
        let stderr_pipe = child.stderr.take();
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(mut pipe) = stderr_pipe {
                let _ = pipe.read_to_end(&mut buf).await;
            }
            buf
        });

        let mut killed = false;
        let waited = tokio::time::timeout(timeout, child.wait()).await;
        let status = match waited {
            Ok(status) => status?,
            Err(_) => {
                killed = true;
                terminate(&mut child).await?
            }
        };

        // Reader tasks finish once the child's pipe ends close.
        let stdout_buf = stdout_task.await.unwrap_or_default();
        let stderr_buf = stderr_task.await.unwrap_or_default();

        Ok(ExecutionResult {
            stdout: String::from_utf8_lossy(&stdout_buf).into_owned(),
            stderr: String::from_utf8_lossy(&stderr_buf).into_owned(),
            exit_code: status.code().unwrap_or(-1),
            killed,
        })
    }
}

/// Graceful-then-forceful shutdown: SIGTERM, a grace period, then SIGKILL.
/// Returns only once the child is reaped.
async fn terminate(child: &mut Child) -> std::io::Result<std::process::ExitStatus> {
    send_sigterm(child);

    let waited = tokio::time::timeout(KILL_GRACE, child.wait()).await;
    if let Ok(status) = waited {
        return status;
    }

    tracing::warn!(pid=?child.id(), "child ignored termination signal, force killing");
    child.kill().await?;
    child.wait().await
}

#[cfg(unix)]
fn send_sigterm(child: &Child) {
    if let Some(pid) = child.id() {
        let _ = nix::sys::signal::kill(
            nix::unistd::Pid::from_raw(pid as i32),
            nix::sys::signal::Signal::SIGTERM,
        );
    }
}

#[cfg(not(unix))]
fn send_sigterm(_child: &Child) {}
