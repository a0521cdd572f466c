//! Bounded invocation of the installed binary.
//!
//! Every call runs `<binary> -i <input> -o <output>` with stdin closed and
//! both output pipes drained by reader threads. The whole call, including
//! collecting the captured output, is bounded by the configured timeout; on
//! expiry the process group is killed and the child reaped before
//! [`ExecutionError::ProcessTimeout`] is returned.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::storage::StorageError;

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Binary not found at {}. Run 'bg-remover install' first.", path.display())]
    BinaryNotFound { path: PathBuf },

    #[error("Binary at {} is not executable", path.display())]
    BinaryNotExecutable { path: PathBuf },

    #[error("Process timed out after {} seconds", timeout.as_secs())]
    ProcessTimeout { timeout: Duration },

    #[error("Process failed: {reason}")]
    ProcessFailed {
        reason: String,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("Failed to read '{path}' from disk '{disk}': {source}")]
    StorageReadFailed {
        disk: String,
        path: String,
        #[source]
        source: StorageError,
    },

    #[error("Failed to write '{path}' to disk '{disk}': {source}")]
    StorageWriteFailed {
        disk: String,
        path: String,
        #[source]
        source: StorageError,
    },

    #[error("Failed to allocate temporary files in {}: {source}", dir.display())]
    TempFileAllocationFailed {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Staging file {} could not be accessed: {source}", path.display())]
    Staging {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ExecutionError {
    /// Whether an embedding HTTP layer should answer 5xx (true) or 4xx.
    ///
    /// Only a missing input blob is the caller's fault.
    pub fn is_server_fault(&self) -> bool {
        !self.is_client_error()
    }

    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::StorageReadFailed {
                source: StorageError::NotFound { .. }
                    | StorageError::InvalidPath { .. }
                    | StorageError::UnknownDisk(_),
                ..
            }
        )
    }

    fn failed(reason: impl Into<String>, code: Option<i32>, output: CapturedOutput) -> Self {
        Self::ProcessFailed {
            reason: reason.into(),
            code,
            stdout: output.stdout,
            stderr: output.stderr,
        }
    }
}

/// One invocation of the binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub timeout: Duration,
}

/// Captured stdout/stderr of a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs the installed binary.
#[derive(Debug, Clone)]
pub struct ExecutionService {
    binary_path: PathBuf,
    timeout: Duration,
}

impl ExecutionService {
    pub fn new(binary_path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary_path: binary_path.into(),
            timeout,
        }
    }

    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn request(&self, input: &Path, output: &Path) -> ExecutionRequest {
        ExecutionRequest {
            input_path: input.to_path_buf(),
            output_path: output.to_path_buf(),
            timeout: self.timeout,
        }
    }

    /// Process `input` into `output`.
    pub fn run(&self, input: &Path, output: &Path) -> Result<CapturedOutput, ExecutionError> {
        self.run_request(&self.request(input, output))
    }

    pub fn run_request(&self, req: &ExecutionRequest) -> Result<CapturedOutput, ExecutionError> {
        self.check_binary()?;

        tracing::debug!(
            binary = %self.binary_path.display(),
            input = %req.input_path.display(),
            output = %req.output_path.display(),
            timeout_secs = req.timeout.as_secs(),
            "invoking binary"
        );

        let mut cmd = Command::new(&self.binary_path);
        cmd.arg("-i")
            .arg(&req.input_path)
            .arg("-o")
            .arg(&req.output_path);

        let (status, output) = self.spawn_bounded(cmd, req.timeout)?;

        if !status.success() {
            tracing::warn!(code = ?status.code(), stderr = %output.stderr.trim(), "binary exited with failure");
            let reason = match status.code() {
                Some(code) => format!("exit code {code}: {}", output.stderr.trim()),
                None => format!("terminated by signal: {}", output.stderr.trim()),
            };
            return Err(ExecutionError::failed(reason, status.code(), output));
        }

        if !req.output_path.exists() {
            return Err(ExecutionError::failed("no output produced", status.code(), output));
        }

        Ok(output)
    }

    /// Run `<binary> --help` and return what it printed.
    pub fn probe(&self) -> Result<CapturedOutput, ExecutionError> {
        self.check_binary()?;
        let mut cmd = Command::new(&self.binary_path);
        cmd.arg("--help");

        let (status, output) = self.spawn_bounded(cmd, self.timeout)?;
        if status.success() {
            Ok(output)
        } else {
            Err(ExecutionError::failed(
                format!("'--help' exited with {status}"),
                status.code(),
                output,
            ))
        }
    }

    /// Existence and executable-bit checks, done before every spawn.
    pub fn check_binary(&self) -> Result<(), ExecutionError> {
        let meta = match std::fs::metadata(&self.binary_path) {
            Ok(meta) if meta.is_file() => meta,
            _ => {
                return Err(ExecutionError::BinaryNotFound {
                    path: self.binary_path.clone(),
                });
            }
        };

        if !is_executable(&meta) {
            return Err(ExecutionError::BinaryNotExecutable {
                path: self.binary_path.clone(),
            });
        }
        Ok(())
    }

    fn spawn_bounded(
        &self,
        mut cmd: Command,
        timeout: Duration,
    ) -> Result<(ExitStatus, CapturedOutput), ExecutionError> {
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let mut child = cmd.spawn().map_err(|e| ExecutionError::ProcessFailed {
            reason: format!("failed to spawn {}: {e}", self.binary_path.display()),
            code: None,
            stdout: String::new(),
            stderr: String::new(),
        })?;

        let readers = Readers::spawn(&mut child);
        let started = Instant::now();
        let deadline = started + timeout;

        let status = match wait_bounded(&mut child, timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                kill_and_reap(&mut child);
                tracing::warn!(
                    binary = %self.binary_path.display(),
                    elapsed_ms = started.elapsed().as_millis(),
                    "binary timed out, killed"
                );
                return Err(ExecutionError::ProcessTimeout { timeout });
            }
            Err(e) => {
                kill_and_reap(&mut child);
                return Err(ExecutionError::ProcessFailed {
                    reason: format!("failed to wait for process: {e}"),
                    code: None,
                    stdout: String::new(),
                    stderr: String::new(),
                });
            }
        };

        let (output, complete) = readers.collect(deadline);
        if !complete {
            // A descendant outside the group still holds a pipe.
            tracing::warn!(
                binary = %self.binary_path.display(),
                "output pipes still open at the deadline, detaching readers"
            );
        }
        tracing::debug!(
            code = ?status.code(),
            elapsed_ms = started.elapsed().as_millis(),
            "binary finished"
        );
        Ok((status, output))
    }
}

#[cfg(unix)]
const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy)]
enum Pipe {
    Stdout,
    Stderr,
}

/// Reader threads draining the child's pipes into a channel.
struct Readers {
    rx: Receiver<(Pipe, String)>,
    pending: usize,
}

impl Readers {
    fn spawn(child: &mut Child) -> Self {
        let (tx, rx) = mpsc::channel();
        let mut pending = 0;
        if let Some(pipe) = child.stdout.take() {
            drain(pipe, Pipe::Stdout, tx.clone());
            pending += 1;
        }
        if let Some(pipe) = child.stderr.take() {
            drain(pipe, Pipe::Stderr, tx);
            pending += 1;
        }
        Self { rx, pending }
    }

    /// Gather what the readers finish before `deadline`. Returns `false` as
    /// the second element when some reader was still blocked and got
    /// detached.
    fn collect(mut self, deadline: Instant) -> (CapturedOutput, bool) {
        let mut output = CapturedOutput::default();
        while self.pending > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok((Pipe::Stdout, text)) => output.stdout = text,
                Ok((Pipe::Stderr, text)) => output.stderr = text,
                Err(_) => return (output, false),
            }
            self.pending -= 1;
        }
        (output, true)
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R, which: Pipe, tx: Sender<(Pipe, String)>) {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        let _ = tx.send((which, String::from_utf8_lossy(&buf).into_owned()));
    });
}

fn kill_and_reap(child: &mut Child) {
    kill_group(child);
    let _ = child.kill();
    let _ = child.wait();
}

/// Wait up to `timeout` for the child to exit, returning `None` if it is
/// still running. Stragglers in its group are killed while the exited
/// leader is still unreaped, so the pgid cannot have been recycled.
#[cfg(unix)]
fn wait_bounded(child: &mut Child, timeout: Duration) -> std::io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if exited_unreaped(child)? {
            kill_group(child);
            return child.wait().map(Some);
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        std::thread::sleep(POLL_INTERVAL.min(deadline - now));
    }
}

#[cfg(not(unix))]
fn wait_bounded(child: &mut Child, timeout: Duration) -> std::io::Result<Option<ExitStatus>> {
    use wait_timeout::ChildExt;
    child.wait_timeout(timeout)
}

#[cfg(unix)]
#[allow(unsafe_code)]
fn exited_unreaped(child: &Child) -> std::io::Result<bool> {
    let pid = libc::id_t::from(child.id());
    // SAFETY: `info` is a zero-initialised out-parameter owned by this frame
    // and valid for the call. WNOWAIT leaves the child waitable.
    let (rc, info) = unsafe {
        let mut info: libc::siginfo_t = std::mem::zeroed();
        let rc = libc::waitid(
            libc::P_PID,
            pid,
            &mut info,
            libc::WEXITED | libc::WNOHANG | libc::WNOWAIT,
        );
        (rc, info)
    };
    if rc == -1 {
        let err = std::io::Error::last_os_error();
        if err.kind() == std::io::ErrorKind::Interrupted {
            return Ok(false);
        }
        return Err(err);
    }
    Ok(info.si_signo == libc::SIGCHLD)
}

#[cfg(unix)]
#[allow(unsafe_code)]
fn kill_group(child: &Child) {
    let Ok(pgid) = libc::pid_t::try_from(child.id()) else {
        return;
    };
    // SAFETY: kill(2) has no memory-safety preconditions. The child was
    // spawned with process_group(0), so -pgid names only its own group.
    unsafe {
        libc::kill(-pgid, libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_group(_child: &Child) {}

#[cfg(unix)]
fn is_executable(meta: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_meta: &std::fs::Metadata) -> bool {
    true
}
