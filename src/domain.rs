use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Illumina TruSeq adapter prefix, used for read one unless overridden.
pub const DEFAULT_ADAPTER: &str = "AGATCGGAAGAG";

static ACCESSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("accession regex"));

/// Identifier of a sequencing run as understood by the download tool.
///
/// Any token that is safe to use as a file name stem is accepted, so run
/// accessions (`SRR…`, `ERR…`, `DRR…`) and local aliases both work.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Accession(String);

impl Accession {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Accession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Accession {
    type Err = PipelineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if !ACCESSION_RE.is_match(trimmed) {
            return Err(PipelineError::InvalidAccession(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl TryFrom<String> for Accession {
    type Error = PipelineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Accession> for String {
    fn from(value: Accession) -> Self {
        value.0
    }
}

/// Adapter argument handed to cutadapt verbatim.
///
/// cutadapt has its own grammar here (`ADAPTER$`, `^ADAPTER`, `file:adapters.fa`,
/// `ADAPTER;min_overlap=5`), so only values that would not survive as a single
/// argument are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Adapter(String);

impl Adapter {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Adapter {
    fn default() -> Self {
        Self(DEFAULT_ADAPTER.to_string())
    }
}

impl fmt::Display for Adapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Adapter {
    type Err = PipelineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.is_empty() || value.contains(char::is_whitespace) {
            return Err(PipelineError::InvalidAdapter(value.to_string()));
        }
        Ok(Self(value.to_string()))
    }
}

impl TryFrom<String> for Adapter {
    type Error = PipelineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Adapter> for String {
    fn from(value: Adapter) -> Self {
        value.0
    }
}

/// Shape of the download tool's output on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadLayout {
    Paired,
    Unpaired,
    Missing,
}

impl fmt::Display for ReadLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadLayout::Paired => write!(f, "paired"),
            ReadLayout::Unpaired => write!(f, "unpaired"),
            ReadLayout::Missing => write!(f, "missing"),
        }
    }
}
