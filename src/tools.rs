use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::Serialize;
use tracing::debug;

use crate::config::ToolPaths;
use crate::domain::{Accession, Adapter};
use crate::error::PipelineError;
use crate::fs_util;
use crate::store::RunPaths;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    Download,
    Trim,
    Align,
    PostProcess,
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Download => "download",
            Step::Trim => "trim",
            Step::Align => "align",
            Step::PostProcess => "post-process",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single external command: the program and its argument list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invocation {
    pub step: Step,
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(step: Step, program: impl Into<String>) -> Self {
        Self {
            step,
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, value: impl Into<String>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn command_line(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " '{arg}'")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// `fastq-dump --gzip --split-3 <accession>`
pub fn download(tools: &ToolPaths, accession: &Accession) -> Invocation {
    Invocation::new(Step::Download, tools.fastq_dump.as_str())
        .arg("--gzip")
        .arg("--split-3")
        .arg(accession.as_str())
}

/// `cutadapt -a <a> -A <A> -o <out1> -p <out2> <in1> <in2>`
pub fn trim(
    tools: &ToolPaths,
    adapter_one: &Adapter,
    adapter_two: &Adapter,
    paths: &RunPaths,
) -> Invocation {
    Invocation::new(Step::Trim, tools.cutadapt.as_str())
        .arg("-a")
        .arg(adapter_one.as_str())
        .arg("-A")
        .arg(adapter_two.as_str())
        .arg("-o")
        .arg(paths.trimmed_one.as_str())
        .arg("-p")
        .arg(paths.trimmed_two.as_str())
        .arg(paths.read_one.as_str())
        .arg(paths.read_two.as_str())
}

/// `bowtie <index> -1 <trimmed1> -2 <trimmed2> --sam <out.sam>`
pub fn align(tools: &ToolPaths, bowtie_index: &str, paths: &RunPaths) -> Invocation {
    Invocation::new(Step::Align, tools.bowtie.as_str())
        .arg(bowtie_index)
        .arg("-1")
        .arg(paths.trimmed_one.as_str())
        .arg("-2")
        .arg(paths.trimmed_two.as_str())
        .arg("--sam")
        .arg(paths.alignment.as_str())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    pub code: Option<i32>,
}

impl StepOutcome {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolStatus {
    Ready(PathBuf),
    Missing,
}

pub trait ToolRunner {
    /// Runs the invocation to completion in `cwd`. A non-zero exit is not
    /// an error here; only failing to start the process is.
    fn run(&self, invocation: &Invocation, cwd: &Path) -> Result<StepOutcome, PipelineError>;

    fn locate(&self, program: &str) -> ToolStatus;
}

/// Spawns real processes that share this process's stderr and, unless
/// redirected, its stdout.
#[derive(Debug, Clone, Default)]
pub struct SystemToolRunner {
    stdout_to_stderr: bool,
}

impl SystemToolRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sends the tools' stdout to our stderr, leaving stdout free for a
    /// machine-readable report.
    pub fn with_stdout_to_stderr() -> Self {
        Self {
            stdout_to_stderr: true,
        }
    }

    pub fn stdout_to_stderr(&self) -> bool {
        self.stdout_to_stderr
    }
}

impl ToolRunner for SystemToolRunner {
    fn run(&self, invocation: &Invocation, cwd: &Path) -> Result<StepOutcome, PipelineError> {
        debug!(cwd = %cwd.display(), command = %invocation, "spawning");
        let stdout = if self.stdout_to_stderr {
            Stdio::from(io::stderr())
        } else {
            Stdio::inherit()
        };
        let status = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(Stdio::inherit())
            .status()
            .map_err(|err| PipelineError::Spawn {
                program: invocation.program.clone(),
                message: err.to_string(),
            })?;
        debug!(step = %invocation.step, code = ?status.code(), "process exited");
        Ok(StepOutcome {
            code: status.code(),
        })
    }

    fn locate(&self, program: &str) -> ToolStatus {
        let candidate = Path::new(program);
        if candidate.components().count() > 1 {
            return if candidate.is_file() {
                ToolStatus::Ready(candidate.to_path_buf())
            } else {
                ToolStatus::Missing
            };
        }
        match fs_util::find_in_path(program) {
            Some(path) => ToolStatus::Ready(path),
            None => ToolStatus::Missing,
        }
    }
}
