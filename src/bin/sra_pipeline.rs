use std::process::ExitCode;

use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use sra_pipeline::app::{App, ProgressSink, RunFailure, RunOptions, RunReport};
use sra_pipeline::cli::Cli;
use sra_pipeline::config::ConfigLoader;
use sra_pipeline::error::PipelineError;
use sra_pipeline::output::{self, ConsoleProgress, JsonOutput};
use sra_pipeline::store::Workspace;
use sra_pipeline::tools::SystemToolRunner;

fn main() -> ExitCode {
    match run() {
        Ok(code) => ExitCode::from(code),
        Err(report) => {
            eprintln!("{report:?}");
            if let Some(err) = report.downcast_ref::<PipelineError>() {
                return ExitCode::from(map_exit_code(err));
            }
            ExitCode::from(1)
        }
    }
}

fn map_exit_code(error: &PipelineError) -> u8 {
    match error {
        PipelineError::StepFailed { code, .. } => step_exit_code(*code),
        PipelineError::MissingTool(_) | PipelineError::Spawn { .. } => 3,
        err if err.is_config_error() => 2,
        _ => 1,
    }
}

/// Exit code for a run that finished, possibly with `--keep-going` failures.
fn report_exit_code(report: &RunReport) -> u8 {
    match report.first_failure() {
        Some(failed) => step_exit_code(failed.exit_code),
        None => 0,
    }
}

/// The failing tool's own status when it fits in a process exit code.
fn step_exit_code(code: Option<i32>) -> u8 {
    code.and_then(|code| u8::try_from(code).ok())
        .filter(|code| *code != 0)
        .unwrap_or(1)
}

fn run() -> miette::Result<u8> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ConfigLoader::resolve(cli.overrides())?;
    tracing::debug!(?config, "resolved configuration");
    let options = RunOptions {
        dry_run: cli.dry_run,
        keep_going: cli.keep_going,
    };

    let runner = if cli.json {
        SystemToolRunner::with_stdout_to_stderr()
    } else {
        SystemToolRunner::new()
    };
    let app = App::new(config, runner);
    let sink: &dyn ProgressSink = if cli.json {
        &JsonOutput
    } else {
        &ConsoleProgress
    };
    let (report, error) = match app.run(options, sink) {
        Ok(report) => (report, None),
        Err(RunFailure { error, report }) => (report, Some(error)),
    };

    if let Some(path) = &cli.manifest {
        Workspace::write_manifest(path, &report)?;
    }
    if cli.json {
        JsonOutput::print_report(&report).into_diagnostic()?;
    } else {
        output::print_summary(&report);
    }

    match error {
        Some(error) => Err(error.into()),
        None => Ok(report_exit_code(&report)),
    }
}

#[cfg(test)]
mod tests {
    use sra_pipeline::app::{StepReport, StepStatus};
    use sra_pipeline::domain::Accession;
    use sra_pipeline::store::RunPaths;
    use sra_pipeline::tools::Step;

    use super::*;

    fn report_with(steps: Vec<StepReport>) -> RunReport {
        let acc: Accession = "SRR000".parse().unwrap();
        RunReport {
            accession: acc.to_string(),
            workdir: ".".to_string(),
            dry_run: false,
            layout: None,
            paths: RunPaths::new(&acc),
            steps,
            started_at: "2024-01-01T00:00:00+00:00".to_string(),
            finished_at: None,
            error: None,
        }
    }

    fn step(step: Step, status: StepStatus, exit_code: Option<i32>) -> StepReport {
        StepReport {
            step,
            command: None,
            status,
            exit_code,
            elapsed_ms: None,
            notes: Vec::new(),
        }
    }

    #[test]
    fn config_errors_exit_with_two() {
        assert_eq!(map_exit_code(&PipelineError::MissingAccession), 2);
        assert_eq!(
            map_exit_code(&PipelineError::InvalidAdapter(String::new())),
            2
        );
        assert_eq!(
            map_exit_code(&PipelineError::MissingPairedOption("a bowtie index")),
            2
        );
    }

    #[test]
    fn missing_tools_exit_with_three() {
        assert_eq!(map_exit_code(&PipelineError::MissingTool("bowtie".into())), 3);
        let spawn = PipelineError::Spawn {
            program: "cutadapt".to_string(),
            message: "No such file or directory".to_string(),
        };
        assert_eq!(map_exit_code(&spawn), 3);
    }

    #[test]
    fn step_failure_passes_tool_status_through() {
        let failed = PipelineError::StepFailed {
            step: Step::Align,
            code: Some(42),
        };
        assert_eq!(map_exit_code(&failed), 42);
    }

    #[test]
    fn unrepresentable_status_falls_back_to_one() {
        assert_eq!(step_exit_code(None), 1);
        assert_eq!(step_exit_code(Some(256)), 1);
        assert_eq!(step_exit_code(Some(-1)), 1);
        assert_eq!(step_exit_code(Some(0)), 1);
        let missing = PipelineError::MissingOutput {
            step: Step::Align,
            path: "SRR000.sam".to_string(),
        };
        assert_eq!(map_exit_code(&missing), 1);
    }

    #[test]
    fn finished_report_exit_code() {
        let clean = report_with(vec![step(Step::Download, StepStatus::Succeeded, Some(0))]);
        assert_eq!(report_exit_code(&clean), 0);

        let kept_going = report_with(vec![
            step(Step::Download, StepStatus::Succeeded, Some(0)),
            step(Step::Trim, StepStatus::Failed, Some(7)),
            step(Step::Align, StepStatus::Failed, Some(0)),
        ]);
        assert_eq!(report_exit_code(&kept_going), 7);

        let silent_failure = report_with(vec![step(Step::Align, StepStatus::Failed, Some(0))]);
        assert_eq!(report_exit_code(&silent_failure), 1);
    }
}
