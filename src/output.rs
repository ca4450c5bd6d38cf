use std::io::{self, Write};

use serde::Serialize;

use crate::app::{ProgressEvent, ProgressSink, RunReport, StepStatus};

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_report(report: &RunReport) -> io::Result<()> {
        Self::print_json(report)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

/// Writes one line per progress event to stderr, next to the tools' own output.
pub struct ConsoleProgress;

impl ProgressSink for ConsoleProgress {
    fn event(&self, event: ProgressEvent) {
        let mut stderr = io::stderr().lock();
        let _ = match event.elapsed {
            Some(elapsed) => writeln!(
                stderr,
                "==> {} ({:.1}s)",
                event.message,
                elapsed.as_secs_f64()
            ),
            None => writeln!(stderr, "==> {}", event.message),
        };
    }
}

pub fn print_summary(report: &RunReport) {
    let layout = report
        .layout
        .map(|layout| layout.to_string())
        .unwrap_or_else(|| "-".to_string());
    eprintln!("accession {} ({layout})", report.accession);
    for step in &report.steps {
        let status = match step.status {
            StepStatus::Planned => "planned",
            StepStatus::Succeeded => "ok",
            StepStatus::Failed => "FAILED",
            StepStatus::Skipped => "skipped",
        };
        match &step.command {
            Some(command) => eprintln!("  {:<12} {:<8} {command}", step.step.name(), status),
            None => eprintln!("  {:<12} {}", step.step.name(), status),
        }
        for note in &step.notes {
            eprintln!("  {:<12} note: {note}", "");
        }
    }
}
