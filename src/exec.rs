//! Timeout-bounded external process execution.
//!
//! Every external tool (git, the test runner, the linter) goes through a
//! [`ProcessExecutor`]. The system implementation drains stdout and stderr on
//! reader threads while polling the child, and kills then reaps the child once
//! the wall-clock limit passes, so a timed-out call never leaves a process
//! behind.

use std::ffi::OsString;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(25);
/// How long output readers may keep draining once the child is gone. A
/// grandchild that inherited the pipes can hold them open indefinitely.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub program: OsString,
    pub args: Vec<OsString>,
    pub cwd: Option<PathBuf>,
    pub timeout: Duration,
}

impl CommandSpec {
    pub fn new(program: impl Into<OsString>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
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

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Program and arguments as display strings.
    pub fn display(&self) -> Vec<String> {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|part| part.to_string_lossy().to_string())
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub duration: Duration,
}

impl ProcessOutput {
    /// Stdout followed by stderr.
    pub fn combined(&self) -> String {
        let mut out = String::with_capacity(self.stdout.len() + self.stderr.len() + 1);
        out.push_str(&self.stdout);
        if !self.stderr.is_empty() {
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&self.stderr);
        }
        out
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("executable not found: {program}")]
    NotFound { program: String },

    #[error("timed out after {}s", .limit.as_secs())]
    TimedOut {
        limit: Duration,
        stdout: String,
        stderr: String,
    },

    #[error("failed to run {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: io::Error,
    },
}

pub trait ProcessExecutor: Send + Sync {
    fn run(&self, spec: &CommandSpec) -> Result<ProcessOutput, ExecError>;
}

/// Spawns real processes on the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemExecutor;

impl ProcessExecutor for SystemExecutor {
    fn run(&self, spec: &CommandSpec) -> Result<ProcessOutput, ExecError> {
        let program = spec.program.to_string_lossy().to_string();
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &spec.cwd {
            cmd.current_dir(dir);
        }

        let start = Instant::now();
        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(ExecError::NotFound { program });
            }
            Err(source) => return Err(ExecError::Io { program, source }),
        };
        tracing::debug!(command = ?spec.display(), pid = child.id(), "spawned process");

        let stdout_reader = drain(child.stdout.take());
        let stderr_reader = drain(child.stderr.take());

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(source) => {
                    terminate(&mut child);
                    return Err(ExecError::Io { program, source });
                }
            }
            if start.elapsed() >= spec.timeout {
                tracing::warn!(
                    command = ?spec.display(),
                    limit_secs = spec.timeout.as_secs(),
                    "process exceeded time limit, killing"
                );
                terminate(&mut child);
                let deadline = Instant::now() + DRAIN_GRACE;
                return Err(ExecError::TimedOut {
                    limit: spec.timeout,
                    stdout: join_reader(stdout_reader, deadline),
                    stderr: join_reader(stderr_reader, deadline),
                });
            }
            thread::sleep(POLL_INTERVAL);
        };

        let deadline = Instant::now() + DRAIN_GRACE;
        Ok(ProcessOutput {
            stdout: join_reader(stdout_reader, deadline),
            stderr: join_reader(stderr_reader, deadline),
            exit_code: status.code(),
            duration: start.elapsed(),
        })
    }
}

fn drain<R>(stream: Option<R>) -> Option<JoinHandle<Vec<u8>>>
where
    R: Read + Send + 'static,
{
    stream.map(|mut stream| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = stream.read_to_end(&mut buf);
            buf
        })
    })
}

fn join_reader(handle: Option<JoinHandle<Vec<u8>>>, deadline: Instant) -> String {
    let Some(handle) = handle else {
        return String::new();
    };
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            // Detach; the thread exits once the last writer closes the pipe.
            return String::new();
        }
        thread::sleep(POLL_INTERVAL);
    }
    handle
        .join()
        .ok()
        .map(|bytes| String::from_utf8_lossy(&bytes).to_string())
        .unwrap_or_default()
}

fn terminate(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combined_joins_streams_with_newline() {
        let output = ProcessOutput {
            stdout: "out".to_string(),
            stderr: "err".to_string(),
            exit_code: Some(0),
            duration: Duration::ZERO,
        };
        assert_eq!(output.combined(), "out\nerr");
        assert!(output.success());
    }

    #[test]
    fn missing_program_is_not_found() {
        let spec = CommandSpec::new("codenav-definitely-missing-binary", Duration::from_secs(5));
        let err = SystemExecutor.run(&spec).unwrap_err();
        assert!(matches!(err, ExecError::NotFound { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn captures_exit_code_and_streams() {
        let spec = CommandSpec::new("sh", Duration::from_secs(10))
            .arg("-c")
            .arg("echo hello; echo oops 1>&2; exit 3");
        let output = SystemExecutor.run(&spec).unwrap();
        assert_eq!(output.exit_code, Some(3));
        assert_eq!(output.stdout.trim(), "hello");
        assert_eq!(output.stderr.trim(), "oops");
    }

    #[cfg(unix)]
    #[test]
    fn kills_process_after_timeout() {
        let spec = CommandSpec::new("sh", Duration::from_millis(500))
            .args(["-c", "echo $$; exec sleep 30"]);
        let start = Instant::now();
        let err = SystemExecutor.run(&spec).unwrap_err();
        assert!(start.elapsed() < Duration::from_secs(5));
        let stdout = match err {
            ExecError::TimedOut { stdout, .. } => stdout,
            other => panic!("expected timeout, got {other:?}"),
        };

        let pid = stdout.trim();
        assert!(pid.parse::<u32>().is_ok(), "stdout: {stdout:?}");
        let alive = std::process::Command::new("kill")
            .args(["-0", pid])
            .stderr(std::process::Stdio::null())
            .status()
            .unwrap();
        assert!(!alive.success(), "process {pid} outlived the timeout");
    }
}
