//! # External Process Execution
//!
//! Every external tool the pipeline drives (git, Maven, the remappers and
//! the decompiler) is started through [`ProcessExecutor`]. The executor owns
//! the child environment rules and the output draining, so stages only
//! describe *what* to run.
//!
//! ## Child Environment
//!
//! Children inherit the current environment, with these adjustments:
//!
//! - `JAVA_HOME` is forced to the Java runtime the pipeline detected.
//! - `M2_HOME` is removed so Maven locates its home from its own script.
//! - `MAVEN_OPTS` defaults to `-Xmx1024M` when the caller has not set it.
//! - `_JAVA_OPTIONS`, when not already set, carries the class-path URL
//!   check switch plus the heap sizing flags from the tool's JVM options.
//! - With a portable shell installation active, its directories are
//!   prepended to `PATH` and commands are wrapped in `cmd.exe /C`.
//!
//! ## Output
//!
//! Both output streams are drained on scoped reader threads while the
//! calling thread waits for the child, so a chatty tool can never block on a
//! full pipe. Lines are logged as they arrive; quiet invocations, whose
//! output the caller parses, also capture them in [`ProcessOutput`].

use std::ffi::OsString;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

use log::{debug, info};

use crate::defaults::{DEFAULT_MAVEN_OPTS, JAVA_OPTIONS_BASE};
use crate::error::{Error, Result};

/// Log target used for child process output.
pub const PROCESS_LOG_TARGET: &str = "buildtools::process";

/// Settings that shape every child environment.
#[derive(Debug, Clone, Default)]
pub struct ExecutorSettings {
    /// Java runtime home forced into `JAVA_HOME`.
    pub java_home: Option<PathBuf>,
    /// JVM startup options of the tool; only heap sizing flags are forwarded.
    pub jvm_options: Vec<String>,
    /// Portable git-for-windows installation, when one is in use.
    pub msys_dir: Option<PathBuf>,
}

/// A change applied to the inherited child environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvChange {
    Set(String, String),
    Remove(String),
}

/// Describes a single command to run.
#[derive(Debug, Clone)]
pub struct Invocation {
    dir: PathBuf,
    program: String,
    args: Vec<String>,
    echo: bool,
}

impl Invocation {
    pub fn new(dir: impl Into<PathBuf>, program: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            program: program.into(),
            args: Vec::new(),
            echo: true,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Log output at debug level instead of info, and capture it into the
    /// returned [`ProcessOutput`]. Echoed output is only logged.
    pub fn quiet(mut self) -> Self {
        self.echo = false;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Arguments with blank entries dropped.
    pub fn effective_args(&self) -> Vec<String> {
        self.args
            .iter()
            .filter(|arg| !arg.trim().is_empty())
            .cloned()
            .collect()
    }

    /// Human-readable command line, used in diagnostics.
    pub fn command_line(&self) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.effective_args());
        parts.join(" ")
    }
}

/// Exit status and captured output of a finished process.
///
/// Output is captured for quiet invocations only; echoed runs leave both
/// streams empty.
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    /// Exit code; `-1` when the process was terminated by a signal.
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Runs external commands with the pipeline's environment rules.
#[derive(Debug, Clone, Default)]
pub struct ProcessExecutor {
    settings: ExecutorSettings,
}

impl ProcessExecutor {
    pub fn new(settings: ExecutorSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ExecutorSettings {
        &self.settings
    }

    /// Run a pipeline-critical command. A non-zero exit is an error that
    /// carries the full command line.
    pub fn run(&self, invocation: &Invocation) -> Result<ProcessOutput> {
        let output = self.execute(invocation)?;
        if !output.success() {
            return Err(Error::ProcessFailed {
                command: invocation.command_line(),
                status: output.status,
            });
        }
        Ok(output)
    }

    /// Capability probe: true when the command could not be started or
    /// exited non-zero. Never raises.
    pub fn fails(&self, invocation: &Invocation) -> bool {
        match self.execute(invocation) {
            Ok(output) => !output.success(),
            Err(e) => {
                debug!("Probe {} failed: {}", invocation.command_line(), e);
                true
            }
        }
    }

    /// Run a command and return its status without judging it. Only a
    /// failure to start is an error.
    pub fn execute(&self, invocation: &Invocation) -> Result<ProcessOutput> {
        let (program, args) = self.resolve_command(invocation);
        let command_line = invocation.command_line();

        let mut command = Command::new(&program);
        command
            .args(&args)
            .current_dir(&invocation.dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let overrides = environment_overrides(&self.settings, |key| {
            std::env::var_os(key).map(|value| value.to_string_lossy().into_owned())
        });
        for change in overrides {
            match change {
                EnvChange::Set(key, value) => {
                    command.env(key, value);
                }
                EnvChange::Remove(key) => {
                    command.env_remove(key);
                }
            }
        }

        debug!("Running {} in {}", command_line, invocation.dir.display());

        let mut child = command.spawn().map_err(|e| Error::ProcessSpawn {
            command: command_line.clone(),
            message: e.to_string(),
        })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let echo = invocation.echo;

        let (status, stdout, stderr) = thread::scope(|scope| {
            let stdout_reader = scope.spawn(move || drain(stdout, echo));
            let stderr_reader = scope.spawn(move || drain(stderr, echo));
            let status = child.wait();
            (
                status,
                stdout_reader.join().unwrap_or_default(),
                stderr_reader.join().unwrap_or_default(),
            )
        });

        let status = status.map_err(|e| Error::ProcessSpawn {
            command: command_line,
            message: e.to_string(),
        })?;

        Ok(ProcessOutput {
            status: status.code().unwrap_or(-1),
            stdout,
            stderr,
        })
    }

    /// Apply program rebinding and the portable shell wrapper.
    fn resolve_command(&self, invocation: &Invocation) -> (OsString, Vec<OsString>) {
        let mut program = OsString::from(&invocation.program);
        let args: Vec<OsString> = invocation
            .effective_args()
            .into_iter()
            .map(OsString::from)
            .collect();

        if invocation.program == "java" {
            if let Some(java_home) = &self.settings.java_home {
                program = java_home.join("bin").join("java").into_os_string();
            }
        }

        if self.settings.msys_dir.is_some() {
            if invocation.program == "bash" {
                program = OsString::from("git-bash");
            }
            let mut wrapped = vec![OsString::from("/C"), program];
            wrapped.extend(args);
            return (OsString::from("cmd.exe"), wrapped);
        }

        (program, args)
    }
}

/// Compute the changes applied to the inherited environment.
///
/// `lookup` reads the current value of a variable, which keeps this
/// function independent of the real process environment.
pub fn environment_overrides<F>(settings: &ExecutorSettings, lookup: F) -> Vec<EnvChange>
where
    F: Fn(&str) -> Option<String>,
{
    let mut changes = Vec::new();

    if let Some(java_home) = &settings.java_home {
        changes.push(EnvChange::Set(
            "JAVA_HOME".to_string(),
            java_home.to_string_lossy().into_owned(),
        ));
    }

    changes.push(EnvChange::Remove("M2_HOME".to_string()));

    if lookup("MAVEN_OPTS").is_none() {
        changes.push(EnvChange::Set(
            "MAVEN_OPTS".to_string(),
            DEFAULT_MAVEN_OPTS.to_string(),
        ));
    }

    if lookup("_JAVA_OPTIONS").is_none() {
        let mut java_options = JAVA_OPTIONS_BASE.to_string();
        for flag in memory_flags(&settings.jvm_options) {
            java_options.push(' ');
            java_options.push_str(flag);
        }
        changes.push(EnvChange::Set("_JAVA_OPTIONS".to_string(), java_options));
    }

    if let Some(msys_dir) = &settings.msys_dir {
        let mut path = format!(
            "{};{}",
            msys_dir.display(),
            msys_dir.join("bin").display()
        );
        if let Some(existing) = lookup("PATH") {
            path.push(';');
            path.push_str(&existing);
        }
        changes.push(EnvChange::Set("PATH".to_string(), path));
    }

    changes
}

/// Heap sizing flags among the given JVM options.
pub fn memory_flags(options: &[String]) -> impl Iterator<Item = &str> {
    options
        .iter()
        .map(String::as_str)
        .filter(|option| option.starts_with("-Xmx") || option.starts_with("-Xms"))
}

fn drain<R: Read>(pipe: Option<R>, echo: bool) -> String {
    let Some(pipe) = pipe else {
        return String::new();
    };

    let mut reader = BufReader::new(pipe);
    let mut captured = String::new();
    let mut buffer = Vec::new();
    loop {
        buffer.clear();
        match reader.read_until(b'\n', &mut buffer) {
            Ok(0) | Err(_) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buffer);
                let trimmed = line.trim_end_matches(['\r', '\n']);
                if echo {
                    info!(target: PROCESS_LOG_TARGET, "{}", trimmed);
                } else {
                    debug!(target: PROCESS_LOG_TARGET, "{}", trimmed);
                    captured.push_str(trimmed);
                    captured.push('\n');
                }
            }
        }
    }
    captured
}
