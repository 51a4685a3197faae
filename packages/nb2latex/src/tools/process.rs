//! Blocking execution of external programs.

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Interval between exit checks while a timeout is armed.
const POLL_INTERVAL_MS: u64 = 50;

/// How long pipe readers may drain after a timed-out tool was killed.
const DRAIN_GRACE_MS: u64 = 250;

/// Program used to run commands inside a micromamba environment.
pub const MICROMAMBA_PROGRAM: &str = "micromamba";

/// A fully described external command.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: String,
    args: Vec<String>,
    cwd: PathBuf,
    environment: Option<String>,
    timeout: Option<Duration>,
}

/// Captured result of a command that ran to completion.
#[derive(Debug)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Why a command did not succeed.
#[derive(Debug)]
pub enum ToolFailure {
    /// The program could not be started at all.
    Unavailable { program: String, source: io::Error },
    /// The program ran and exited unsuccessfully.
    Exited {
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },
    /// The program was killed after exceeding its timeout.
    TimedOut { after: Duration, stderr: String },
    /// Waiting on or reading from the program failed.
    Io(io::Error),
}

impl ToolFailure {
    /// One-line description without captured output.
    pub fn message(&self, program: &str) -> String {
        match self {
            Self::Unavailable { program, source } => format!("failed to execute {program}: {source}"),
            Self::Exited { code: Some(code), .. } => format!("{program} exited with code {code}"),
            Self::Exited { code: None, .. } => format!("{program} was terminated by a signal"),
            Self::TimedOut { after, .. } => format!("{program} timed out after {}s", after.as_secs()),
            Self::Io(e) => format!("failed while waiting for {program}: {e}"),
        }
    }

    /// Captured output most likely to explain the failure.
    ///
    /// TeX engines report errors on stdout as lines starting with `!`, so those
    /// win over stderr when present.
    pub fn diagnostic_output(&self) -> String {
        match self {
            Self::Exited { stdout, stderr, .. } => stdout
                .lines()
                .find(|line| line.starts_with('!'))
                .map(str::to_string)
                .unwrap_or_else(|| stderr.clone()),
            Self::TimedOut { stderr, .. } => stderr.clone(),
            Self::Unavailable { .. } | Self::Io(_) => String::new(),
        }
    }
}

impl ToolCommand {
    pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
            environment: None,
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Run through `micromamba run -n <environment>` when set.
    pub fn in_environment(mut self, environment: Option<&str>) -> Self {
        self.environment = environment.map(str::to_string);
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Program and arguments actually handed to the operating system.
    pub fn command_line(&self) -> (String, Vec<String>) {
        match &self.environment {
            Some(env) => {
                let mut args = vec!["run".to_string(), "-n".to_string(), env.clone()];
                args.push(self.program.clone());
                args.extend(self.args.iter().cloned());
                (MICROMAMBA_PROGRAM.to_string(), args)
            }
            None => (self.program.clone(), self.args.clone()),
        }
    }

    /// Run the command to completion, capturing stdout and stderr.
    pub fn run(&self) -> Result<ToolOutput, ToolFailure> {
        let (program, args) = self.command_line();
        tracing::debug!(cwd = %self.cwd.display(), program = %program, args = ?args, "Running external command");

        let mut command = Command::new(&program);
        command
            .args(&args)
            .current_dir(&self.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // A timed command leads its own process group, so a timeout also
        // reaches what it started (pdflatex under `micromamba run`).
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            if self.timeout.is_some() {
                command.process_group(0);
            }
        }

        let child = command
            .spawn()
            .map_err(|source| ToolFailure::Unavailable {
                program: program.clone(),
                source,
            })?;

        let (status, stdout, stderr) = wait_with_timeout(child, self.timeout)?;

        let Some(status) = status else {
            return Err(ToolFailure::TimedOut {
                after: self.timeout.unwrap_or_default(),
                stderr,
            });
        };

        if !status.success() {
            return Err(ToolFailure::Exited {
                code: status.code(),
                stdout,
                stderr,
            });
        }

        if !stderr.trim().is_empty() {
            tracing::debug!(program = %program, stderr = %stderr, "External command stderr (non-fatal)");
        }

        Ok(ToolOutput { stdout, stderr })
    }
}

/// Wait for `child`, draining its pipes on background threads so a chatty
/// program cannot block on a full pipe. Returns `None` as status on timeout,
/// after killing the child and its process group.
fn wait_with_timeout(
    mut child: Child,
    timeout: Option<Duration>,
) -> Result<(Option<ExitStatus>, String, String), ToolFailure> {
    let stdout_reader = spawn_reader(child.stdout.take());
    let stderr_reader = spawn_reader(child.stderr.take());

    let Some(limit) = timeout else {
        let status = child.wait().map_err(ToolFailure::Io)?;
        return Ok((Some(status), finish(stdout_reader), finish(stderr_reader)));
    };

    let deadline = Instant::now() + limit;
    loop {
        if let Some(status) = child.try_wait().map_err(ToolFailure::Io)? {
            return Ok((Some(status), finish(stdout_reader), finish(stderr_reader)));
        }
        if Instant::now() >= deadline {
            break;
        }
        thread::sleep(Duration::from_millis(POLL_INTERVAL_MS));
    }

    tracing::warn!(timeout_secs = limit.as_secs(), "External command timed out, killing it");
    // The child may have exited between the checks.
    let _ = kill_tree(&mut child);
    child.wait().map_err(ToolFailure::Io)?;

    // A process that escaped the group can keep the pipes open; after a short
    // drain take what was captured and leave the readers detached.
    let drained = Instant::now() + Duration::from_millis(DRAIN_GRACE_MS);
    while Instant::now() < drained
        && [&stdout_reader, &stderr_reader]
            .iter()
            .any(|r| r.as_ref().is_some_and(|r| !r.handle.is_finished()))
    {
        thread::sleep(Duration::from_millis(POLL_INTERVAL_MS / 5));
    }
    Ok((None, snapshot(&stdout_reader), snapshot(&stderr_reader)))
}

#[cfg(unix)]
fn kill_tree(child: &mut Child) -> io::Result<()> {
    let pgid = child.id() as libc::pid_t;
    // SAFETY: killpg only sends a signal; the group was created for this child.
    if unsafe { libc::killpg(pgid, libc::SIGKILL) } == 0 {
        Ok(())
    } else {
        child.kill()
    }
}

#[cfg(not(unix))]
fn kill_tree(child: &mut Child) -> io::Result<()> {
    child.kill()
}

/// Output of one pipe, filled by a background thread.
struct PipeReader {
    captured: Arc<Mutex<Vec<u8>>>,
    handle: thread::JoinHandle<()>,
}

fn spawn_reader<R>(pipe: Option<R>) -> Option<PipeReader>
where
    R: Read + Send + 'static,
{
    pipe.map(|mut pipe| {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&captured);
        let handle = thread::spawn(move || {
            let mut chunk = [0u8; 8192];
            loop {
                match pipe.read(&mut chunk) {
                    Ok(0) => break,
                    Ok(n) => match sink.lock() {
                        Ok(mut buf) => buf.extend_from_slice(&chunk[..n]),
                        Err(_) => break,
                    },
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    // A read error leaves whatever was captured so far.
                    Err(_) => break,
                }
            }
        });
        PipeReader { captured, handle }
    })
}

/// Wait for the pipe to close and return everything it carried.
fn finish(reader: Option<PipeReader>) -> String {
    match reader {
        Some(PipeReader { captured, handle }) => {
            let _ = handle.join();
            text_of(&captured)
        }
        None => String::new(),
    }
}

/// Output captured so far, without waiting for the pipe to close.
fn snapshot(reader: &Option<PipeReader>) -> String {
    reader
        .as_ref()
        .map(|r| text_of(&r.captured))
        .unwrap_or_default()
}

fn text_of(captured: &Mutex<Vec<u8>>) -> String {
    captured
        .lock()
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}
