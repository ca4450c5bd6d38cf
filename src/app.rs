use std::time::{Duration, Instant};

use camino::Utf8Path;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::domain::{Adapter, ReadLayout};
use crate::error::PipelineError;
use crate::fs_util;
use crate::store::{RunPaths, Workspace};
use crate::tools::{self, Invocation, Step, ToolRunner, ToolStatus};

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub dry_run: bool,
    pub keep_going: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Planned,
    Succeeded,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub step: Step,
    pub command: Option<String>,
    pub status: StepStatus,
    pub exit_code: Option<i32>,
    pub elapsed_ms: Option<u64>,
    pub notes: Vec<String>,
}

impl StepReport {
    fn planned(invocation: &Invocation) -> Self {
        Self {
            step: invocation.step,
            command: Some(invocation.command_line()),
            status: StepStatus::Planned,
            exit_code: None,
            elapsed_ms: None,
            notes: Vec::new(),
        }
    }

    fn skipped(step: Step, note: String) -> Self {
        Self {
            step,
            command: None,
            status: StepStatus::Skipped,
            exit_code: None,
            elapsed_ms: None,
            notes: vec![note],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub accession: String,
    pub workdir: String,
    pub dry_run: bool,
    pub layout: Option<ReadLayout>,
    pub paths: RunPaths,
    pub steps: Vec<StepReport>,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub error: Option<String>,
}

impl RunReport {
    pub fn first_failure(&self) -> Option<&StepReport> {
        self.steps.iter().find(|step| step.status == StepStatus::Failed)
    }

    pub fn step(&self, step: Step) -> Option<&StepReport> {
        self.steps.iter().find(|report| report.step == step)
    }

    fn finish(mut self) -> Self {
        self.finished_at = Some(now_rfc3339());
        self
    }
}

/// A run that stopped early, with the report of everything up to that point.
#[derive(Debug)]
pub struct RunFailure {
    pub error: PipelineError,
    pub report: RunReport,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

/// Drives the download, trim, align chain for one accession.
pub struct App<T: ToolRunner> {
    config: PipelineConfig,
    runner: T,
    workspace: Workspace,
    paths: RunPaths,
}

impl<T: ToolRunner> App<T> {
    pub fn new(config: PipelineConfig, runner: T) -> Self {
        let workspace = Workspace::new(config.workdir.clone());
        let paths = RunPaths::new(&config.accession);
        Self {
            config,
            runner,
            workspace,
            paths,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn paths(&self) -> &RunPaths {
        &self.paths
    }

    pub fn runner(&self) -> &T {
        &self.runner
    }

    /// Runs every step. On failure the partial report comes back with the
    /// error so callers can still persist what happened.
    pub fn run(
        &self,
        options: RunOptions,
        sink: &dyn ProgressSink,
    ) -> Result<RunReport, RunFailure> {
        let mut report = RunReport {
            accession: self.config.accession.to_string(),
            workdir: self.workspace.root().to_string(),
            dry_run: options.dry_run,
            layout: None,
            paths: self.paths.clone(),
            steps: Vec::new(),
            started_at: now_rfc3339(),
            finished_at: None,
            error: None,
        };

        if options.dry_run {
            self.plan(&mut report, sink);
            return Ok(report.finish());
        }

        match self.run_steps(options, &mut report, sink) {
            Ok(()) => Ok(report.finish()),
            Err(error) => {
                report.error = Some(error.to_string());
                Err(RunFailure {
                    error,
                    report: report.finish(),
                })
            }
        }
    }

    fn run_steps(
        &self,
        options: RunOptions,
        report: &mut RunReport,
        sink: &dyn ProgressSink,
    ) -> Result<(), PipelineError> {
        self.preflight(&[&self.config.tools.fastq_dump], sink)?;
        self.workspace.ensure_root()?;

        let download = tools::download(&self.config.tools, &self.config.accession);
        self.execute(download, options, report, sink)?;

        let layout = self.workspace.detect_layout(&self.paths);
        report.layout = Some(layout);
        sink.event(ProgressEvent {
            message: format!("phase=Layout; {layout} reads"),
            elapsed: None,
        });
        match layout {
            ReadLayout::Paired => {}
            ReadLayout::Unpaired => {
                warn!(
                    file = %self.paths.unpaired,
                    "single-end run; only paired-end reads are trimmed and aligned"
                );
                return Ok(());
            }
            ReadLayout::Missing => {
                warn!(
                    accession = %self.config.accession,
                    "download produced no read files; nothing left to do"
                );
                return Ok(());
            }
        }

        let (adapter_two, index) = self.paired_options()?;
        self.preflight(&[&self.config.tools.cutadapt, &self.config.tools.bowtie], sink)?;

        let trim = tools::trim(
            &self.config.tools,
            &self.config.adapter,
            adapter_two,
            &self.paths,
        );
        self.execute(trim, options, report, sink)?;
        self.verify(Step::Trim, &self.paths.trimmed_one, true, options, report)?;
        self.verify(Step::Trim, &self.paths.trimmed_two, true, options, report)?;

        let align = tools::align(&self.config.tools, index, &self.paths);
        self.execute(align, options, report, sink)?;
        self.verify(Step::Align, &self.paths.alignment, false, options, report)?;

        // TODO: filter mapped reads into `aligned_sam` with samtools and export the
        // mates to `aligned_one`/`aligned_two` with picard SamToFastq once the
        // filtering criteria are settled.
        let note = self.post_process_note();
        info!(step = %Step::PostProcess, "{note}");
        sink.event(ProgressEvent {
            message: format!("phase={}; skipped", Step::PostProcess),
            elapsed: None,
        });
        report.steps.push(StepReport::skipped(Step::PostProcess, note));
        Ok(())
    }

    fn plan(&self, report: &mut RunReport, sink: &dyn ProgressSink) {
        let mut planned = vec![tools::download(&self.config.tools, &self.config.accession)];
        match self.paired_options() {
            Ok((adapter_two, index)) => {
                planned.push(tools::trim(
                    &self.config.tools,
                    &self.config.adapter,
                    adapter_two,
                    &self.paths,
                ));
                planned.push(tools::align(&self.config.tools, index, &self.paths));
            }
            Err(err) => {
                report.steps.push(StepReport::skipped(Step::Trim, err.to_string()));
                report.steps.push(StepReport::skipped(Step::Align, err.to_string()));
            }
        }

        for invocation in &planned {
            sink.event(ProgressEvent {
                message: format!("phase=Plan; {invocation}"),
                elapsed: None,
            });
            report.steps.push(StepReport::planned(invocation));
        }
        report.steps.sort_by_key(|step| step.step as u8);
        report
            .steps
            .push(StepReport::skipped(Step::PostProcess, self.post_process_note()));
    }

    fn preflight(
        &self,
        programs: &[&String],
        sink: &dyn ProgressSink,
    ) -> Result<(), PipelineError> {
        sink.event(ProgressEvent {
            message: format!(
                "phase=Preflight; locating {}",
                programs
                    .iter()
                    .map(|program| program.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            elapsed: None,
        });
        let missing = programs
            .iter()
            .filter(|program| self.runner.locate(program) == ToolStatus::Missing)
            .map(|program| program.as_str())
            .collect::<Vec<_>>();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::MissingTool(missing.join(", ")))
        }
    }

    fn paired_options(&self) -> Result<(&Adapter, &str), PipelineError> {
        let adapter_two = self
            .config
            .adapter_two
            .as_ref()
            .ok_or(PipelineError::MissingPairedOption("a read two adapter (-A)"))?;
        let index = self
            .config
            .bowtie_index
            .as_deref()
            .ok_or(PipelineError::MissingPairedOption("a bowtie index (--bowtie-index)"))?;
        Ok((adapter_two, index))
    }

    fn execute(
        &self,
        invocation: Invocation,
        options: RunOptions,
        report: &mut RunReport,
        sink: &dyn ProgressSink,
    ) -> Result<(), PipelineError> {
        let step = invocation.step;
        sink.event(ProgressEvent {
            message: format!("phase={step}; {invocation}"),
            elapsed: None,
        });
        info!(%step, command = %invocation, "running");

        let started = Instant::now();
        let outcome = self
            .runner
            .run(&invocation, self.workspace.root().as_std_path())?;
        let elapsed = started.elapsed();

        report.steps.push(StepReport {
            step,
            command: Some(invocation.command_line()),
            status: if outcome.success() {
                StepStatus::Succeeded
            } else {
                StepStatus::Failed
            },
            exit_code: outcome.code,
            elapsed_ms: Some(elapsed.as_millis() as u64),
            notes: Vec::new(),
        });
        sink.event(ProgressEvent {
            message: format!("phase={step}; done"),
            elapsed: Some(elapsed),
        });

        if outcome.success() {
            return Ok(());
        }
        let err = PipelineError::StepFailed {
            step,
            code: outcome.code,
        };
        if options.keep_going {
            warn!(%step, error = %err, "continuing after failed step");
            Ok(())
        } else {
            Err(err)
        }
    }

    fn verify(
        &self,
        step: Step,
        relative: &Utf8Path,
        gzip: bool,
        options: RunOptions,
        report: &mut RunReport,
    ) -> Result<(), PipelineError> {
        let result = if !self.workspace.exists(relative) {
            Err(PipelineError::MissingOutput {
                step,
                path: relative.to_string(),
            })
        } else if gzip {
            fs_util::validate_gzip(self.workspace.resolve(relative).as_std_path()).map(|_| ())
        } else {
            Ok(())
        };

        match result {
            Ok(()) => Ok(()),
            Err(err) => {
                // A tool that exits 0 without its output still failed the step.
                if let Some(last) = report.steps.iter_mut().rev().find(|s| s.step == step) {
                    last.status = StepStatus::Failed;
                    last.notes.push(err.to_string());
                }
                if options.keep_going {
                    warn!(%step, error = %err, "continuing without verified output");
                    Ok(())
                } else {
                    Err(err)
                }
            }
        }
    }

    fn post_process_note(&self) -> String {
        format!(
            "conversion of {} into {}, {} and {} is not implemented",
            self.paths.alignment,
            self.paths.aligned_sam,
            self.paths.aligned_one,
            self.paths.aligned_two
        )
    }
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
