// src/command.rs

//! External command execution
//!
//! Every interaction with a version-control tool goes through a
//! [`CommandRunner`]. The system implementation starts the child with its
//! standard input closed and both output streams piped, then polls the two
//! pipes in non-blocking mode until the child has exited:
//!
//! - drain whatever stdout has available, marking it closed at end-of-stream
//! - drain whatever stderr has available, likewise
//! - check (without blocking) whether the child has exited
//! - otherwise sleep, growing the interval while the child is quiet and
//!   resetting it as soon as any byte arrives
//!
//! Once the exit status is observable both pipes are drained one final time,
//! so output written right before exit is never lost. Reading only one pipe
//! at a time with blocking reads would deadlock as soon as the child fills
//! the other pipe's buffer.

use nix::fcntl::{FcntlArg, OFlag, fcntl};
use std::fmt;
use std::io::{self, Read};
use std::os::unix::io::AsRawFd;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Shortest sleep between polls, used again whenever output arrives
const MIN_BACKOFF_MS: u64 = 1;

/// Longest sleep between polls while the child is silent
const MAX_BACKOFF_MS: u64 = 500;

/// Read chunk size for draining a pipe
const READ_CHUNK: usize = 8192;

/// Captured output of a successful command
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }
}

/// Errors raised while running an external command
#[derive(Debug, Error)]
pub enum CommandError {
    /// The command ran and exited unsuccessfully
    #[error("command failed ({status}): {}\nstdout:\n{stdout}\nstderr:\n{stderr}", render_command_line(.command, .args))]
    Failed {
        command: String,
        args: Vec<String>,
        stdout: String,
        stderr: String,
        /// Exit code, or -1 when the child was terminated by a signal
        status: i32,
    },

    /// The process could not be started or its pipes could not be read
    #[error("cannot run process {command}: {source}")]
    Launch {
        command: String,
        #[source]
        source: io::Error,
    },

    /// The wait was interrupted; the child has been killed
    #[error("interrupted while running process: {}", render_command_line(.command, .args))]
    Interrupted { command: String, args: Vec<String> },
}

impl CommandError {
    /// Launch and interrupt failures abort the operation; a failed command
    /// is an ordinary backend error the caller may report.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, CommandError::Failed { .. })
    }
}

fn render_command_line(command: &str, args: &[String]) -> String {
    let mut line = command.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

/// Runs external programs on behalf of backends and editors
pub trait CommandRunner: Send + Sync {
    /// Run `command` with `args`, optionally inside `working_dir`
    fn run(
        &self,
        command: &str,
        args: &[String],
        working_dir: Option<&Path>,
    ) -> Result<CommandOutput, CommandError>;

    /// Like [`CommandRunner::run`], keeping only standard output
    fn run_stdout(
        &self,
        command: &str,
        args: &[String],
        working_dir: Option<&Path>,
    ) -> Result<String, CommandError> {
        self.run(command, args, working_dir).map(|output| output.stdout)
    }
}

/// [`CommandRunner`] backed by real OS processes
#[derive(Debug, Default, Clone)]
pub struct SystemCommandRunner {
    interrupt: Option<Arc<AtomicBool>>,
}

impl SystemCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Abort waiting (and kill the child) once `flag` becomes true
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = Some(flag);
        self
    }

    fn interrupted(&self) -> bool {
        self.interrupt
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }
}

impl CommandRunner for SystemCommandRunner {
    fn run(
        &self,
        command: &str,
        args: &[String],
        working_dir: Option<&Path>,
    ) -> Result<CommandOutput, CommandError> {
        debug!(
            "{} $ {}",
            working_dir.map(|d| d.display().to_string()).unwrap_or_default(),
            render_command_line(command, args)
        );

        let launch_error = |source: io::Error| CommandError::Launch {
            command: command.to_string(),
            source,
        };

        let mut cmd = Command::new(command);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = working_dir
            && !dir.as_os_str().is_empty()
        {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(launch_error)?;

        let (stdout, stderr) = match (child.stdout.take(), child.stderr.take()) {
            (Some(stdout), Some(stderr)) => (stdout, stderr),
            _ => {
                reap(&mut child);
                return Err(launch_error(io::Error::other("child pipes unavailable")));
            }
        };

        let mut stdout_sink = or_reap(&mut child, Sink::new(stdout)).map_err(launch_error)?;
        let mut stderr_sink = or_reap(&mut child, Sink::new(stderr)).map_err(launch_error)?;

        let status = match self.poll(&mut child, &mut stdout_sink, &mut stderr_sink) {
            Ok(Some(status)) => status,
            Ok(None) => {
                reap(&mut child);
                return Err(CommandError::Interrupted {
                    command: command.to_string(),
                    args: args.to_vec(),
                });
            }
            Err(e) => {
                reap(&mut child);
                return Err(launch_error(e));
            }
        };

        stdout_sink.drain().map_err(launch_error)?;
        stderr_sink.drain().map_err(launch_error)?;

        let stdout = stdout_sink.into_string();
        let stderr = stderr_sink.into_string();

        if status.success() {
            return Ok(CommandOutput { stdout, stderr });
        }

        Err(CommandError::Failed {
            command: command.to_string(),
            args: args.to_vec(),
            stdout,
            stderr,
            status: status.code().unwrap_or(-1),
        })
    }
}

impl SystemCommandRunner {
    /// Pump both pipes until the child exits; `None` means interrupted
    fn poll<O: Read + AsRawFd, E: Read + AsRawFd>(
        &self,
        child: &mut Child,
        stdout: &mut Sink<O>,
        stderr: &mut Sink<E>,
    ) -> io::Result<Option<ExitStatus>> {
        let mut backoff_ms = MIN_BACKOFF_MS;
        loop {
            let read_out = stdout.consume_available()?;
            let read_err = stderr.consume_available()?;
            if read_out + read_err > 0 {
                backoff_ms = MIN_BACKOFF_MS;
            }

            if let Some(status) = child.try_wait()? {
                return Ok(Some(status));
            }

            if self.interrupted() {
                return Ok(None);
            }

            backoff_ms = (backoff_ms + 1).min(MAX_BACKOFF_MS);
            thread::sleep(Duration::from_millis(backoff_ms));
        }
    }
}

/// Kill and wait for a child we are abandoning
fn reap(child: &mut Child) {
    if let Err(e) = child.kill() {
        debug!("kill of pid {} failed: {}", child.id(), e);
    }
    if let Err(e) = child.wait() {
        warn!("failed to reap pid {}: {}", child.id(), e);
    }
}

/// Pass `result` through, reaping `child` first when it is an error
fn or_reap<T>(child: &mut Child, result: io::Result<T>) -> io::Result<T> {
    if result.is_err() {
        reap(child);
    }
    result
}

/// Accumulates the bytes of one child output stream
struct Sink<R> {
    stream: Option<R>,
    bytes: Vec<u8>,
}

impl<R: Read + AsRawFd> Sink<R> {
    fn new(stream: R) -> io::Result<Self> {
        set_nonblocking(&stream)?;
        Ok(Self {
            stream: Some(stream),
            bytes: Vec::new(),
        })
    }

    /// Read everything currently available without blocking.
    ///
    /// Returns the number of bytes read; the stream is dropped once it
    /// reports end-of-stream.
    fn consume_available(&mut self) -> io::Result<usize> {
        let Some(stream) = self.stream.as_mut() else {
            return Ok(0);
        };

        let mut total = 0;
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match stream.read(&mut chunk) {
                Ok(0) => {
                    self.stream = None;
                    break;
                }
                Ok(n) => {
                    self.bytes.extend_from_slice(&chunk[..n]);
                    total += n;
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(total)
    }

    /// Final drain once the child has exited
    fn drain(&mut self) -> io::Result<()> {
        while self.stream.is_some() {
            if self.consume_available()? == 0 {
                break;
            }
        }
        Ok(())
    }

    fn into_string(self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

fn set_nonblocking<F: AsRawFd>(stream: &F) -> io::Result<()> {
    let fd = stream.as_raw_fd();
    let flags = fcntl(fd, FcntlArg::F_GETFL).map_err(io::Error::from)?;
    let flags = OFlag::from_bits_truncate(flags) | OFlag::O_NONBLOCK;
    fcntl(fd, FcntlArg::F_SETFL(flags)).map_err(io::Error::from)?;
    Ok(())
}

impl fmt::Display for CommandOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[test]
    fn test_captures_stdout_and_stderr() {
        let runner = SystemCommandRunner::new();
        let output = runner
            .run("sh", &sh("printf out; printf err >&2"), None)
            .unwrap();
        assert_eq!(output.stdout, "out");
        assert_eq!(output.stderr, "err");
    }

    #[test]
    fn test_large_interleaved_output_does_not_deadlock() {
        // 64 rounds of 16 KiB on each stream: 1 MiB per stream, far past a pipe buffer
        let script = "i=0; while [ $i -lt 64 ]; do \
                      head -c 16384 /dev/zero | tr '\\0' o; \
                      head -c 16384 /dev/zero | tr '\\0' e >&2; \
                      i=$((i+1)); done";
        let runner = SystemCommandRunner::new();
        let output = runner.run("sh", &sh(script), None).unwrap();

        assert_eq!(output.stdout.len(), 1024 * 1024);
        assert_eq!(output.stderr.len(), 1024 * 1024);
        assert!(output.stdout.bytes().all(|b| b == b'o'));
        assert!(output.stderr.bytes().all(|b| b == b'e'));
    }

    #[test]
    fn test_nonzero_exit_carries_output() {
        let runner = SystemCommandRunner::new();
        let err = runner
            .run("sh", &sh("echo partial; echo broken >&2; exit 2"), None)
            .unwrap_err();

        match err {
            CommandError::Failed {
                command,
                args,
                stdout,
                stderr,
                status,
            } => {
                assert_eq!(command, "sh");
                assert_eq!(args.len(), 2);
                assert_eq!(stdout, "partial\n");
                assert_eq!(stderr, "broken\n");
                assert_eq!(status, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_program_is_launch_failure() {
        let runner = SystemCommandRunner::new();
        let err = runner
            .run("migrant-no-such-program", &[], None)
            .unwrap_err();
        assert!(matches!(err, CommandError::Launch { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_setup_failure_reaps_child() {
        let mut child = Command::new("sleep").arg("30").spawn().unwrap();

        let result: io::Result<()> = or_reap(&mut child, Err(io::Error::other("fcntl failed")));
        assert!(result.is_err());
        // Killed and waited for: the exit status is already known
        assert!(child.try_wait().unwrap().is_some());
    }

    #[test]
    fn test_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "here").unwrap();

        let runner = SystemCommandRunner::new();
        let out = runner
            .run_stdout("cat", &["marker.txt".to_string()], Some(dir.path()))
            .unwrap();
        assert_eq!(out, "here");
    }

    #[test]
    fn test_interrupt_kills_child() {
        let flag = Arc::new(AtomicBool::new(true));
        let runner = SystemCommandRunner::new().with_interrupt(flag);
        let err = runner.run("sleep", &["30".to_string()], None).unwrap_err();
        assert!(matches!(err, CommandError::Interrupted { .. }));
        assert!(err.is_fatal());
    }
}
