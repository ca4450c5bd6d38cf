use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::tools::Step;

#[derive(Debug, Error, Diagnostic)]
pub enum PipelineError {
    #[error("an accession is required (pass --accession or set it in the config file)")]
    MissingAccession,

    #[error("invalid accession: {0}")]
    InvalidAccession(String),

    #[error("invalid adapter: {0:?}")]
    InvalidAdapter(String),

    #[error("{name} must be at least 1, got {value}")]
    InvalidCount { name: &'static str, value: u64 },

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("paired-end run requires {0}")]
    #[diagnostic(help("paired reads were downloaded; supply the option and rerun"))]
    MissingPairedOption(&'static str),

    #[error("required tool not found: {0}")]
    #[diagnostic(help("install the tool or point the config file's `tools` section at it"))]
    MissingTool(String),

    #[error("failed to start {program}: {message}")]
    Spawn { program: String, message: String },

    #[error("{step} step failed with {}", describe_code(.code))]
    StepFailed { step: Step, code: Option<i32> },

    #[error("{step} step did not produce {path}")]
    MissingOutput { step: Step, path: String },

    #[error("{path} is not a readable gzip file: {message}")]
    CorruptOutput { path: String, message: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl PipelineError {
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            PipelineError::MissingAccession
                | PipelineError::InvalidAccession(_)
                | PipelineError::InvalidAdapter(_)
                | PipelineError::InvalidCount { .. }
                | PipelineError::ConfigRead(_)
                | PipelineError::ConfigParse(_)
                | PipelineError::MissingPairedOption(_)
        )
    }
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}
