// Child process execution with independent stdout/stderr capture and a hard deadline
//
// Both pipes are drained by their own tasks while we wait for exit, so a child
// that writes more than a pipe buffer on either stream can never wedge itself.
// On timeout or cancellation the child is killed and reaped before returning.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
use tokio_util::sync::CancellationToken;

use super::errors::ResolveError;

/// Stand-in deadline for timeouts too large to add to `Instant::now()`
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// A single command to run: program, discrete argument vector, deadline
#[derive(Debug, Clone)]
pub struct ProcessInvocation {
    program: PathBuf,
    args: Vec<OsString>,
    timeout: Duration,
}

impl ProcessInvocation {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn arguments(&self) -> &[OsString] {
        &self.args
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn display_name(&self) -> String {
        self.program.display().to_string()
    }
}

/// What a finished child left behind
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub stdout: Vec<u8>,
    /// `None` when the child wrote nothing on stderr
    pub stderr: Option<String>,
    /// `None` when the exit code could not be determined (e.g. killed by a signal)
    pub exit_code: Option<i32>,
}

impl ProcessOutcome {
    fn from_parts(status: ExitStatus, stdout: Vec<u8>, stderr: Vec<u8>) -> Self {
        let stderr = if stderr.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(&stderr).into_owned())
        };
        Self {
            stdout,
            stderr,
            exit_code: status.code(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Stdout lines in emission order, with trailing `\r` removed
    pub fn stdout_lines(&self) -> Vec<String> {
        self.stdout_text()
            .lines()
            .map(|line| line.trim_end_matches('\r').to_string())
            .collect()
    }
}

/// Run a command to completion or until its deadline
pub async fn run(invocation: &ProcessInvocation) -> Result<ProcessOutcome, ResolveError> {
    run_cancellable(invocation, &CancellationToken::new()).await
}

/// Like [`run`], but the child is also killed as soon as `cancel` fires
pub async fn run_cancellable(
    invocation: &ProcessInvocation,
    cancel: &CancellationToken,
) -> Result<ProcessOutcome, ResolveError> {
    if cancel.is_cancelled() {
        return Err(ResolveError::Cancelled);
    }

    let program = invocation.display_name();
    tracing::debug!(
        "[process] spawning {} {:?} (timeout {}ms)",
        program,
        invocation.args,
        invocation.timeout.as_millis()
    );

    let deadline = deadline_after(invocation.timeout);
    let mut child = build_command(invocation)
        .spawn()
        .map_err(|source| ResolveError::Spawn {
            program: program.clone(),
            source,
        })?;

    let mut stdout_task = drain(child.stdout.take());
    let mut stderr_task = drain(child.stderr.take());

    let result = tokio::select! {
        waited = timeout_at(deadline, collect(&mut child, &mut stdout_task, &mut stderr_task)) => {
            match waited {
                Ok(collected) => collected,
                Err(_) => Err(ResolveError::Timeout {
                    program: program.clone(),
                    timeout: invocation.timeout,
                }),
            }
        }
        _ = cancel.cancelled() => Err(ResolveError::Cancelled),
    };

    if let Err(ref e) = result {
        tracing::debug!("[process] {} aborted: {}", program, e);
        // kill() also waits, so the child is reaped before we return
        if let Err(kill_err) = child.kill().await {
            tracing::debug!("[process] kill of {} reported: {}", program, kill_err);
        }
        stdout_task.abort();
        stderr_task.abort();
    }

    let (status, stdout, stderr) = result?;
    let outcome = ProcessOutcome::from_parts(status, stdout, stderr);
    tracing::debug!(
        "[process] {} exited with {:?} ({} bytes stdout)",
        program,
        outcome.exit_code,
        outcome.stdout.len()
    );
    Ok(outcome)
}

/// Huge timeouts mean "no practical limit" and must not overflow `Instant`
fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout).unwrap_or_else(|| now + FAR_FUTURE)
}

fn build_command(invocation: &ProcessInvocation) -> Command {
    let mut cmd = Command::new(&invocation.program);
    cmd.args(&invocation.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    #[cfg(windows)]
    {
        const CREATE_NO_WINDOW: u32 = 0x0800_0000;
        cmd.creation_flags(CREATE_NO_WINDOW);
    }

    cmd
}

fn drain<R>(pipe: Option<R>) -> JoinHandle<std::io::Result<Vec<u8>>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buf).await?;
        }
        Ok(buf)
    })
}

async fn collect(
    child: &mut Child,
    stdout_task: &mut JoinHandle<std::io::Result<Vec<u8>>>,
    stderr_task: &mut JoinHandle<std::io::Result<Vec<u8>>>,
) -> Result<(ExitStatus, Vec<u8>, Vec<u8>), ResolveError> {
    let status = child.wait().await?;
    let stdout = join_pipe(stdout_task.await)?;
    let stderr = join_pipe(stderr_task.await)?;
    Ok((status, stdout, stderr))
}

fn join_pipe(
    joined: Result<std::io::Result<Vec<u8>>, tokio::task::JoinError>,
) -> Result<Vec<u8>, ResolveError> {
    joined
        .map_err(|e| ResolveError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?
        .map_err(ResolveError::from)
}
