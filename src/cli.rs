use std::path::PathBuf;

use camino::Utf8PathBuf;
use clap::Parser;

use crate::config::ConfigOverrides;

#[derive(Debug, Parser)]
#[command(name = "sra-pipeline")]
#[command(
    about = "Download an SRA run, trim adapters with cutadapt and align with bowtie",
    long_about = None
)]
#[command(version)]
pub struct Cli {
    /// The SRA accession number to download
    #[arg(long, required_unless_present = "config")]
    pub accession: Option<String>,

    /// Number of reads per output file [default: 10000]
    #[arg(short = 'n', long, value_parser = clap::value_parser!(u64).range(1..))]
    pub number: Option<u64>,

    /// Number of output files [default: 1]
    #[arg(short = 'N', long, value_parser = clap::value_parser!(u64).range(1..))]
    pub nof: Option<u64>,

    /// The bowtie index to align to
    #[arg(long = "bowtie-index", visible_alias = "bti")]
    pub bowtie_index: Option<String>,

    /// Adapter for read one [default: AGATCGGAAGAG]
    #[arg(short = 'a', long)]
    pub adapter: Option<String>,

    /// Adapter for read two (required for paired-end runs)
    #[arg(short = 'A')]
    pub adapter_two: Option<String>,

    /// JSON config file; command-line flags take precedence over its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory the tools run in and write their outputs to
    #[arg(long)]
    pub workdir: Option<Utf8PathBuf>,

    /// Print the planned commands without running anything
    #[arg(long)]
    pub dry_run: bool,

    /// Continue with later steps when a tool fails
    #[arg(long)]
    pub keep_going: bool,

    /// Print the run report as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Write the run report as JSON to this path
    #[arg(long)]
    pub manifest: Option<Utf8PathBuf>,
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            config_path: self.config.clone(),
            accession: self.accession.clone(),
            number: self.number,
            nof: self.nof,
            bowtie_index: self.bowtie_index.clone(),
            adapter: self.adapter.clone(),
            adapter_two: self.adapter_two.clone(),
            workdir: self.workdir.clone(),
        }
    }
}
