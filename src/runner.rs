//! External process execution with live output forwarding.
//!
//! A run returns only after the child has exited and both of its output
//! streams have been drained, so output from consecutive runs never
//! interleaves.

use std::io::{self, Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Shell-quoted command line, for display only.
    pub fn display(&self) -> String {
        let words =
            std::iter::once(self.program.as_str()).chain(self.args.iter().map(String::as_str));
        shell_words::join(words)
    }
}

/// How a finished process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    Success,
    /// Non-zero exit; `code` is `None` when killed by a signal
    Failed { code: Option<i32> },
    /// Killed after exceeding the timeout
    TimedOut { after: Duration },
}

impl ExitOutcome {
    fn from_status(status: ExitStatus) -> Self {
        if status.success() {
            Self::Success
        } else {
            Self::Failed {
                code: status.code(),
            }
        }
    }
}

/// Errors from starting or supervising a process.
#[derive(Debug, Error)]
pub enum RunError {
    /// Program missing, not executable, or pipes could not be set up
    #[error("failed to start {program}: {source}")]
    Start {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The process started but waiting on it failed
    #[error("failed waiting for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },
}

impl RunError {
    /// Start failures mean the environment is broken; nothing else will run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Start { .. })
    }
}

/// Something that can execute an [`Invocation`].
pub trait Runner {
    fn run(
        &self,
        invocation: &Invocation,
        timeout: Option<Duration>,
    ) -> Result<ExitOutcome, RunError>;
}

/// Runs real processes, forwarding their stdout/stderr to ours.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl Runner for ProcessRunner {
    fn run(
        &self,
        invocation: &Invocation,
        timeout: Option<Duration>,
    ) -> Result<ExitOutcome, RunError> {
        let program = invocation.program.clone();
        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if timeout.is_some() {
            own_process_group(&mut command);
        }

        let mut child = command.spawn().map_err(|source| RunError::Start {
            program: program.clone(),
            source,
        })?;
        log::debug!("started {} (pid {})", program, child.id());

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        thread::scope(|s| {
            let out = s.spawn(move || forward(stdout, io::stdout()));
            let err = s.spawn(move || forward(stderr, io::stderr()));

            let waited = wait(&mut child, timeout);
            if waited.is_err() {
                let _ = kill(&mut child);
            }

            for (name, handle) in [("stdout", out), ("stderr", err)] {
                match handle.join() {
                    Ok(Ok(bytes)) => log::trace!("{name}: forwarded {bytes} bytes"),
                    Ok(Err(e)) => log::warn!("{name} forwarding stopped: {e}"),
                    Err(_) => log::warn!("{name} forwarding thread panicked"),
                }
            }

            waited.map_err(|source| RunError::Wait { program, source })
        })
    }
}

/// Wait for exit, killing the child once `timeout` has elapsed.
fn wait(child: &mut Child, timeout: Option<Duration>) -> io::Result<ExitOutcome> {
    let Some(limit) = timeout else {
        return child.wait().map(ExitOutcome::from_status);
    };

    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(ExitOutcome::from_status(status));
        }
        if started.elapsed() >= limit {
            log::warn!("pid {} exceeded {:?}, killing", child.id(), limit);
            if let Err(e) = kill(child) {
                log::debug!("kill failed: {e}");
            }
            child.wait()?;
            return Ok(ExitOutcome::TimedOut { after: limit });
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Start the child as a process group leader so a timeout kill also reaches
/// whatever it spawned (ssh connections, forks).
#[cfg(unix)]
fn own_process_group(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(not(unix))]
fn own_process_group(_command: &mut Command) {}

#[cfg(unix)]
fn kill(child: &mut Child) -> io::Result<()> {
    let pgid = libc::pid_t::try_from(child.id())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
    // SAFETY: kill(2) has no memory-safety preconditions. A negative pid
    // targets the process group; fall back to the child alone when it
    // was not started as a group leader.
    let rc = unsafe { libc::kill(-pgid, libc::SIGKILL) };
    if rc == 0 { Ok(()) } else { child.kill() }
}

#[cfg(not(unix))]
fn kill(child: &mut Child) -> io::Result<()> {
    child.kill()
}

/// Copy `source` into `sink` chunk by chunk, flushing as data arrives.
fn forward<R: Read, W: Write>(source: Option<R>, mut sink: W) -> io::Result<u64> {
    let Some(mut source) = source else {
        return Ok(0);
    };

    let mut buf = [0u8; 8192];
    let mut total = 0u64;
    loop {
        let n = match source.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        sink.write_all(&buf[..n])?;
        sink.flush()?;
        total += n as u64;
    }
    Ok(total)
}
