use std::fs;
use std::path::{Path, PathBuf};

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::domain::{Accession, Adapter};
use crate::error::PipelineError;

pub const DEFAULT_NUMBER: u64 = 10_000;
pub const DEFAULT_NOF: u64 = 1;

/// Optional JSON file carrying the same settings as the command line.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub accession: Option<String>,
    #[serde(default)]
    pub number: Option<u64>,
    #[serde(default)]
    pub nof: Option<u64>,
    #[serde(default)]
    pub bowtie_index: Option<String>,
    #[serde(default)]
    pub adapter: Option<String>,
    #[serde(default)]
    pub adapter_two: Option<String>,
    #[serde(default)]
    pub workdir: Option<Utf8PathBuf>,
    #[serde(default)]
    pub tools: ToolPathsEntry,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ToolPathsEntry {
    #[serde(default)]
    pub fastq_dump: Option<String>,
    #[serde(default)]
    pub cutadapt: Option<String>,
    #[serde(default)]
    pub bowtie: Option<String>,
    #[serde(default)]
    pub samtools: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolPaths {
    pub fastq_dump: String,
    pub cutadapt: String,
    pub bowtie: String,
    pub samtools: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            fastq_dump: "fastq-dump".to_string(),
            cutadapt: "cutadapt".to_string(),
            bowtie: "bowtie".to_string(),
            samtools: "samtools".to_string(),
        }
    }
}

/// Values supplied on the command line; `None` falls through to the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub accession: Option<String>,
    pub number: Option<u64>,
    pub nof: Option<u64>,
    pub bowtie_index: Option<String>,
    pub adapter: Option<String>,
    pub adapter_two: Option<String>,
    pub workdir: Option<Utf8PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineConfig {
    pub accession: Accession,
    /// Reads per output file. Carried for the download tool, not consumed yet.
    pub number: u64,
    /// Number of output files. Carried for the download tool, not consumed yet.
    pub nof: u64,
    pub bowtie_index: Option<String>,
    pub adapter: Adapter,
    pub adapter_two: Option<Adapter>,
    pub workdir: Utf8PathBuf,
    pub tools: ToolPaths,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(overrides: ConfigOverrides) -> Result<PipelineConfig, PipelineError> {
        let config = match &overrides.config_path {
            Some(path) => Self::load(path)?,
            None => Config::default(),
        };
        Self::resolve_config(config, overrides)
    }

    pub fn load(path: &Path) -> Result<Config, PipelineError> {
        let content =
            fs::read_to_string(path).map_err(|_| PipelineError::ConfigRead(path.to_path_buf()))?;
        serde_json::from_str(&content).map_err(|err| PipelineError::ConfigParse(err.to_string()))
    }

    pub fn resolve_config(
        config: Config,
        overrides: ConfigOverrides,
    ) -> Result<PipelineConfig, PipelineError> {
        let accession: Accession = overrides
            .accession
            .or(config.accession)
            .ok_or(PipelineError::MissingAccession)?
            .parse()?;

        let number = validate_count(
            "number",
            overrides.number.or(config.number),
            DEFAULT_NUMBER,
        )?;
        let nof = validate_count("nof", overrides.nof.or(config.nof), DEFAULT_NOF)?;

        let adapter: Adapter = match overrides.adapter.or(config.adapter) {
            Some(value) => value.parse()?,
            None => Adapter::default(),
        };
        let adapter_two = overrides
            .adapter_two
            .or(config.adapter_two)
            .map(|value| value.parse::<Adapter>())
            .transpose()?;

        let bowtie_index = overrides
            .bowtie_index
            .or(config.bowtie_index)
            .filter(|value| !value.trim().is_empty());

        let cwd =
            std::env::current_dir().map_err(|err| PipelineError::Filesystem(err.to_string()))?;
        let defaults = ToolPaths::default();
        let tools = ToolPaths {
            fastq_dump: anchor_tool(config.tools.fastq_dump, defaults.fastq_dump, &cwd),
            cutadapt: anchor_tool(config.tools.cutadapt, defaults.cutadapt, &cwd),
            bowtie: anchor_tool(config.tools.bowtie, defaults.bowtie, &cwd),
            samtools: anchor_tool(config.tools.samtools, defaults.samtools, &cwd),
        };

        Ok(PipelineConfig {
            accession,
            number,
            nof,
            bowtie_index,
            adapter,
            adapter_two,
            workdir: overrides
                .workdir
                .or(config.workdir)
                .unwrap_or_else(|| Utf8PathBuf::from(".")),
            tools,
        })
    }
}

/// Tools run inside the work directory, so a relative path such as
/// `bin/cutadapt` is pinned to the directory the driver was started from.
/// Bare program names stay as they are and are looked up on `PATH`.
fn anchor_tool(value: Option<String>, default: String, cwd: &Path) -> String {
    let program = value.unwrap_or(default);
    let path = Path::new(&program);
    if path.is_absolute() || path.components().count() < 2 {
        return program;
    }
    cwd.join(path).to_string_lossy().into_owned()
}

fn validate_count(
    name: &'static str,
    value: Option<u64>,
    default: u64,
) -> Result<u64, PipelineError> {
    match value {
        Some(0) => Err(PipelineError::InvalidCount { name, value: 0 }),
        Some(value) => Ok(value),
        None => Ok(default),
    }
}
