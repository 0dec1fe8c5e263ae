// dbvault/src/utils/process.rs
//! Runs external tools (pg_dump, gzip, openssl, psql) as explicit pipelines.
//!
//! A [`Pipeline`] is an ordered list of [`CommandSpec`]s; the stdout of each
//! stage feeds the stdin of the next. Exit statuses are decoded once here and
//! returned as a [`ToolOutcome`], so callers never look at raw wait statuses.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, ChildStdout, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};

use crate::errors::{AppError, Result};
use crate::utils::find_executable;

/// Upper bound on the stderr text carried inside an error.
const MAX_STDERR_BYTES: usize = 4096;

/// One external program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    /// File fed to stdin. Only honoured on the first stage of a pipeline.
    pub stdin: Option<PathBuf>,
    /// File receiving stdout. Only honoured on the last stage of a pipeline.
    pub stdout: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            stdin: None,
            stdout: None,
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

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn stdin_from(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdin = Some(path.into());
        self
    }

    pub fn stdout_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdout = Some(path.into());
        self
    }
}

// Environment values are never printed: they may carry PGPASSWORD.
impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        if let Some(path) = &self.stdin {
            write!(f, " < {}", path.display())?;
        }
        if let Some(path) = &self.stdout {
            write!(f, " > {}", path.display())?;
        }
        Ok(())
    }
}

/// A named, ordered chain of commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    /// Human readable step name used in progress output and errors.
    pub step: String,
    pub stages: Vec<CommandSpec>,
}

impl Pipeline {
    pub fn new(step: impl Into<String>, stages: Vec<CommandSpec>) -> Self {
        Self {
            step: step.into(),
            stages,
        }
    }

    pub fn single(step: impl Into<String>, command: CommandSpec) -> Self {
        Self::new(step, vec![command])
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, stage) in self.stages.iter().enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            write!(f, "{}", stage)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageStatus {
    pub program: String,
    pub code: i32,
}

/// Result of running a pipeline to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutcome {
    pub statuses: Vec<StageStatus>,
    pub stderr: String,
}

impl ToolOutcome {
    /// Composite status: the rightmost non-zero stage status, like `set -o pipefail`.
    pub fn code(&self) -> i32 {
        self.statuses
            .iter()
            .rev()
            .map(|s| s.code)
            .find(|code| *code != 0)
            .unwrap_or(0)
    }

    pub fn success(&self) -> bool {
        self.code() == 0
    }
}

/// Process-invocation seam. Pipelines run synchronously; `run` returns only
/// after every stage has exited.
pub trait ToolRunner: Send + Sync {
    fn run(&self, pipeline: &Pipeline) -> Result<ToolOutcome>;
}

/// Runs `pipeline` and turns a non-zero composite status into [`AppError::Command`].
pub fn run_checked(runner: &dyn ToolRunner, pipeline: &Pipeline) -> Result<()> {
    tracing::debug!(step = %pipeline.step, command = %pipeline, "running pipeline");
    let outcome = runner.run(pipeline)?;
    let code = outcome.code();
    if code != 0 {
        return Err(AppError::Command {
            step: pipeline.step.clone(),
            code,
            stderr: stderr_tail(&outcome.stderr),
        });
    }
    if !outcome.stderr.trim().is_empty() {
        tracing::debug!(step = %pipeline.step, stderr = %outcome.stderr.trim(), "tool diagnostics");
    }
    Ok(())
}

/// Spawns real OS processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    fn run(&self, pipeline: &Pipeline) -> Result<ToolOutcome> {
        if pipeline.stages.is_empty() {
            return Err(AppError::Precondition(format!(
                "{}: pipeline has no commands",
                pipeline.step
            )));
        }

        // Resolve every executable before anything is spawned.
        let programs = pipeline
            .stages
            .iter()
            .map(|stage| find_executable(&stage.program))
            .collect::<Result<Vec<_>>>()?;

        let mut running: Vec<(String, Child, JoinHandle<String>)> = Vec::new();
        if let Err(e) = spawn_stages(pipeline, &programs, &mut running) {
            for (_, child, _) in running.iter_mut() {
                let _ = child.kill();
                let _ = child.wait();
            }
            return Err(e);
        }

        let mut outcome = ToolOutcome::default();
        for (program, mut child, stderr_reader) in running {
            let status = child.wait()?;
            let stderr = stderr_reader.join().unwrap_or_default();
            if !stderr.is_empty() {
                outcome.stderr.push_str(&stderr);
            }
            outcome.statuses.push(StageStatus {
                program,
                code: decode_status(status),
            });
        }
        Ok(outcome)
    }
}

fn spawn_stages(
    pipeline: &Pipeline,
    programs: &[PathBuf],
    running: &mut Vec<(String, Child, JoinHandle<String>)>,
) -> Result<()> {
    let last = pipeline.stages.len() - 1;
    let mut upstream: Option<ChildStdout> = None;

    for (i, (stage, program)) in pipeline.stages.iter().zip(programs).enumerate() {
        let stdin = match upstream.take() {
            Some(previous) => Stdio::from(previous),
            None => match (&stage.stdin, i) {
                (Some(path), 0) => Stdio::from(File::open(path)?),
                _ => Stdio::null(),
            },
        };
        let stdout = if i < last {
            Stdio::piped()
        } else {
            match &stage.stdout {
                Some(path) => Stdio::from(File::create(path)?),
                None => Stdio::inherit(),
            }
        };

        let mut command = Command::new(program);
        command
            .args(&stage.args)
            .envs(stage.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(stdin)
            .stdout(stdout)
            .stderr(Stdio::piped());

        let mut child = command.spawn()?;
        upstream = child.stdout.take();
        let stderr_reader = match child.stderr.take() {
            Some(mut pipe) => thread::spawn(move || {
                let mut buf = String::new();
                let _ = pipe.read_to_string(&mut buf);
                buf
            }),
            None => thread::spawn(String::new),
        };
        running.push((stage.program.clone(), child, stderr_reader));
    }
    Ok(())
}

/// Maps a wait status to a shell-style exit code.
fn decode_status(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}

fn stderr_tail(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.len() <= MAX_STDERR_BYTES {
        return trimmed.to_string();
    }
    let mut start = trimmed.len() - MAX_STDERR_BYTES;
    while !trimmed.is_char_boundary(start) {
        start += 1;
    }
    format!("...{}", &trimmed[start..])
}
