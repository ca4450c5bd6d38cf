use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tempfile::Builder;

use crate::domain::{Accession, ReadLayout};
use crate::error::PipelineError;

const FASTQ_GZ: &str = ".fastq.gz";
const CUTADAPT_GZ: &str = ".cutadapt.gz";
const ALIGNED_GZ: &str = ".aligned.gz";
const SAM: &str = ".sam";
const ALIGNED_SAM: &str = ".aligned.sam";

/// File names produced and consumed by one run, relative to the workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunPaths {
    pub read_one: Utf8PathBuf,
    pub read_two: Utf8PathBuf,
    pub unpaired: Utf8PathBuf,
    pub trimmed_one: Utf8PathBuf,
    pub trimmed_two: Utf8PathBuf,
    pub alignment: Utf8PathBuf,
    pub aligned_sam: Utf8PathBuf,
    pub aligned_one: Utf8PathBuf,
    pub aligned_two: Utf8PathBuf,
}

impl RunPaths {
    pub fn new(accession: &Accession) -> Self {
        let acc = accession.as_str();
        let read_one = Utf8PathBuf::from(format!("{acc}_1{FASTQ_GZ}"));
        let read_two = Utf8PathBuf::from(format!("{acc}_2{FASTQ_GZ}"));
        let trimmed_one = replace_suffix(&read_one, FASTQ_GZ, CUTADAPT_GZ);
        let trimmed_two = replace_suffix(&read_two, FASTQ_GZ, CUTADAPT_GZ);
        let alignment = Utf8PathBuf::from(format!("{acc}{SAM}"));

        Self {
            unpaired: Utf8PathBuf::from(format!("{acc}{FASTQ_GZ}")),
            aligned_sam: replace_suffix(&alignment, SAM, ALIGNED_SAM),
            aligned_one: replace_suffix(&trimmed_one, CUTADAPT_GZ, ALIGNED_GZ),
            aligned_two: replace_suffix(&trimmed_two, CUTADAPT_GZ, ALIGNED_GZ),
            read_one,
            read_two,
            trimmed_one,
            trimmed_two,
            alignment,
        }
    }
}

/// Swaps a compound suffix such as `.fastq.gz` for another one. Paths that
/// do not carry `from` get `to` appended instead.
pub fn replace_suffix(path: &Utf8Path, from: &str, to: &str) -> Utf8PathBuf {
    let raw = path.as_str();
    match raw.strip_suffix(from) {
        Some(stem) => Utf8PathBuf::from(format!("{stem}{to}")),
        None => Utf8PathBuf::from(format!("{raw}{to}")),
    }
}

/// Directory every tool runs in and every derived path is relative to.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: Utf8PathBuf,
}

impl Workspace {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn resolve(&self, relative: &Utf8Path) -> Utf8PathBuf {
        self.root.join(relative)
    }

    pub fn exists(&self, relative: &Utf8Path) -> bool {
        self.resolve(relative).as_std_path().is_file()
    }

    pub fn ensure_root(&self) -> Result<(), PipelineError> {
        fs::create_dir_all(self.root.as_std_path())
            .map_err(|err| PipelineError::Filesystem(err.to_string()))
    }

    pub fn detect_layout(&self, paths: &RunPaths) -> ReadLayout {
        if self.exists(&paths.read_one) && self.exists(&paths.read_two) {
            ReadLayout::Paired
        } else if self.exists(&paths.unpaired) {
            ReadLayout::Unpaired
        } else {
            ReadLayout::Missing
        }
    }

    pub fn write_manifest<T: Serialize>(path: &Utf8Path, value: &T) -> Result<(), PipelineError> {
        let parent = match path.parent() {
            Some(parent) if !parent.as_str().is_empty() => parent.to_path_buf(),
            _ => Utf8PathBuf::from("."),
        };
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| PipelineError::Filesystem(err.to_string()))?;
        let content = serde_json::to_vec_pretty(value)
            .map_err(|err| PipelineError::Filesystem(err.to_string()))?;
        let temp = Builder::new()
            .prefix(".sra-pipeline-manifest")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| PipelineError::Filesystem(err.to_string()))?;
        fs::write(temp.path(), &content)
            .map_err(|err| PipelineError::Filesystem(err.to_string()))?;
        temp.persist(path.as_std_path())
            .map_err(|err| PipelineError::Filesystem(err.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_suffix_substitutes() {
        let path = Utf8PathBuf::from("X_1.fastq.gz");
        assert_eq!(replace_suffix(&path, FASTQ_GZ, CUTADAPT_GZ), "X_1.cutadapt.gz");
    }

    #[test]
    fn replace_suffix_appends_when_absent() {
        let path = Utf8PathBuf::from("reads");
        assert_eq!(replace_suffix(&path, FASTQ_GZ, CUTADAPT_GZ), "reads.cutadapt.gz");
    }

    #[test]
    fn layout_without_files_is_missing() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let workspace = Workspace::new(root);
        let acc: Accession = "SRR1".parse().unwrap();
        assert_eq!(
            workspace.detect_layout(&RunPaths::new(&acc)),
            ReadLayout::Missing
        );
    }
}
