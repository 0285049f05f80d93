//! Subprocess execution utilities.
//!
//! Compilers are run through a [`CommandRunner`] so that probing code never
//! spawns processes directly. [`SystemRunner`] is the real implementation;
//! tests substitute a mock.

use std::ffi::OsStr;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};

/// Interval between exit checks while a timed process runs.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Builder for subprocess execution.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            timeout: None,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Kill the process if it runs longer than `timeout`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Get the program path.
    pub fn get_program(&self) -> &Path {
        &self.program
    }

    /// Get the arguments.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Get the configured timeout, if any.
    pub fn get_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }

    /// Execute the command and wait for completion.
    ///
    /// A nonzero exit is not an error here; only spawn failures and
    /// timeouts are.
    pub fn exec(&self) -> Result<Output> {
        let mut cmd = self.build_command();
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let child = cmd
            .spawn()
            .with_context(|| format!("failed to spawn `{}`", self.program.display()))?;

        match self.timeout {
            Some(timeout) => self.wait_with_timeout(child, timeout),
            None => child
                .wait_with_output()
                .with_context(|| format!("failed to wait for `{}`", self.program.display())),
        }
    }

    fn wait_with_timeout(&self, mut child: Child, timeout: Duration) -> Result<Output> {
        // Drain pipes on separate threads so a chatty child cannot block on a full pipe.
        let stdout = child.stdout.take().map(spawn_reader);
        let stderr = child.stderr.take().map(spawn_reader);

        let deadline = Instant::now() + timeout;
        let status = loop {
            if let Some(status) = child
                .try_wait()
                .with_context(|| format!("failed to wait for `{}`", self.program.display()))?
            {
                break status;
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                bail!(
                    "`{}` timed out after {:?}",
                    self.display_command(),
                    timeout
                );
            }
            thread::sleep(POLL_INTERVAL);
        };

        Ok(Output {
            status,
            stdout: join_reader(stdout),
            stderr: join_reader(stderr),
        })
    }

    /// Display the command for error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn join_reader(handle: Option<thread::JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

/// Captured result of running a command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` if the process was terminated by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// A successful run that printed `stdout`.
    pub fn success(stdout: impl Into<String>) -> Self {
        CommandOutput {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }

    /// Stdout followed by stderr.
    pub fn combined(&self) -> String {
        let mut text = self.stdout.clone();
        text.push_str(&self.stderr);
        text
    }
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// Runs a prepared command and captures its output.
///
/// Implementations must not fail on a nonzero exit; that is reported
/// through [`CommandOutput::code`].
pub trait CommandRunner: Send + Sync {
    fn run(&self, cmd: &ProcessBuilder) -> Result<CommandOutput>;
}

/// Runs commands as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, cmd: &ProcessBuilder) -> Result<CommandOutput> {
        tracing::debug!("running `{}`", cmd.display_command());
        cmd.exec().map(CommandOutput::from)
    }
}

/// Find an executable in PATH.
pub fn find_executable(name: impl AsRef<OsStr>) -> Option<PathBuf> {
    which::which(name).ok()
}
