use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::errors::BenchError;

/// A subcommand plus its flat argument list, e.g. `ctree -s in.dvseqs -o out.tre -k 12`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub subcommand: String,
    pub args: Vec<OsString>,
}

impl Invocation {
    pub fn new(subcommand: &str) -> Self {
        Self {
            subcommand: subcommand.to_string(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn flag(self, name: &str, value: impl AsRef<OsStr>) -> Self {
        self.arg(name).arg(value)
    }

    /// `prepare -s <dir> -o <out> -sf <suffix> -L <limit> [-np <threads>] -hp`
    pub fn prepare(
        input_dir: &Path,
        output: &Path,
        suffix: &str,
        limit: u64,
        threads: Option<u32>,
    ) -> Self {
        let inv = Self::new("prepare")
            .flag("-s", input_dir)
            .flag("-o", output)
            .flag("-sf", suffix)
            .flag("-L", limit.to_string());
        inv.with_threads(threads).arg("-hp")
    }

    /// `ctree -s <in> -o <out> -k <k> --sketch-size <ss> [-np <threads>] -hp`
    pub fn ctree(input: &Path, output: &Path, k: u64, ss: u64, threads: Option<u32>) -> Self {
        let inv = Self::new("ctree")
            .flag("-s", input)
            .flag("-o", output)
            .flag("-k", k.to_string())
            .flag("--sketch-size", ss.to_string());
        inv.with_threads(threads).arg("-hp")
    }

    fn with_threads(self, threads: Option<u32>) -> Self {
        match threads {
            Some(n) => self.flag("-np", n.to_string()),
            None => self,
        }
    }

    /// Renders `program subcommand args...` for logs and error messages.
    pub fn command_line(&self, program: &Path) -> String {
        let mut parts = vec![
            quote_arg(program.as_os_str()),
            quote_arg(OsStr::new(&self.subcommand)),
        ];
        parts.extend(self.args.iter().map(|a| quote_arg(a)));
        parts.join(" ")
    }
}

/// Captured result of a successful tool run.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Executes one invocation to completion inside `cwd`.
///
/// Any non-success exit must come back as [`BenchError::ToolFailed`].
pub trait ToolRunner {
    fn run(&self, invocation: &Invocation, cwd: &Path) -> Result<ToolOutput, BenchError>;
}

/// Runs the real external tool as a child process.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: PathBuf,
}

impl ProcessRunner {
    /// A path like `./bin/dvs` is anchored to the current directory here, since every
    /// run changes the child's working directory. Bare names still go through `PATH`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        let program = program.into();
        let program = if program.components().count() > 1 {
            std::path::absolute(&program).unwrap_or(program)
        } else {
            program
        };
        Self { program }
    }
}

impl ToolRunner for ProcessRunner {
    fn run(&self, invocation: &Invocation, cwd: &Path) -> Result<ToolOutput, BenchError> {
        let command = invocation.command_line(&self.program);
        tracing::debug!(%command, cwd = %cwd.display(), "invoking tool");

        let output = Command::new(&self.program)
            .arg(&invocation.subcommand)
            .args(&invocation.args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| BenchError::ToolSpawn {
                command: command.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(BenchError::ToolFailed {
                command,
                status: output.status.to_string(),
                output: format!("{}{}", stdout, stderr),
            });
        }

        Ok(ToolOutput {
            code: output.status.code(),
            stdout,
            stderr,
        })
    }
}

/// Wraps an argument in single quotes when it would not survive a shell as-is,
/// escaping internal single quotes as `'\''`.
pub fn quote_arg(arg: &OsStr) -> String {
    let s = arg.to_string_lossy();
    let plain = !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if plain {
        return s.into_owned();
    }

    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        if c == '\'' {
            out.push_str("'\\''");
        } else {
            out.push(c);
        }
    }
    out.push('\'');
    out
}
