use std::io::{self, Write};

use serde::Serialize;

use crate::materialize::{MaterializationReport, RunStatus};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Human,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_reports(reports: &[MaterializationReport]) -> io::Result<()> {
        Self::print_json(&reports)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

pub struct SummaryOutput;

impl SummaryOutput {
    pub fn print_reports(reports: &[MaterializationReport]) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        stdout.write_all(Self::render(reports).as_bytes())
    }

    /// One block per run: samples paired vs declared, artifacts found vs missing.
    pub fn render(reports: &[MaterializationReport]) -> String {
        let mut out = String::new();
        let failed = reports
            .iter()
            .filter(|report| report.status == RunStatus::Failed)
            .count();
        out.push_str(&format!(
            "basemount-retrieve summary: {} run(s), {} failed\n",
            reports.len(),
            failed
        ));

        for report in reports {
            let name = report
                .run_id
                .as_ref()
                .map(|id| id.to_string())
                .unwrap_or_else(|| report.run_dir.to_string());
            let status = match report.status {
                RunStatus::Materialized => "materialized",
                RunStatus::AlreadyPresent => "already present",
                RunStatus::Failed => "failed",
            };
            out.push_str(&format!("- {name} ({status})\n"));
            if let Some(error) = &report.error {
                out.push_str(&format!("    error: {error}\n"));
                continue;
            }
            if let Some(dir) = &report.out_dir {
                out.push_str(&format!("    output: {dir}\n"));
            }
            out.push_str(&format!(
                "    samples: {} paired / {} declared, {} dropped\n",
                report.samples_paired,
                report.samples_declared,
                report.dropped_samples.len()
            ));
            out.push_str(&format!(
                "    artifacts: {} found / {} missing",
                report.artifacts_found.len(),
                report.artifacts_missing.len()
            ));
            if !report.artifacts_missing.is_empty() {
                out.push_str(&format!(" ({})", report.artifacts_missing.join(", ")));
            }
            out.push('\n');
            out.push_str(&format!("    files copied: {}\n", report.files_copied));
            if !report.discrepancy.is_empty() {
                let ids = report
                    .discrepancy
                    .ids()
                    .map(|id| id.as_str())
                    .collect::<Vec<_>>();
                out.push_str(&format!("    undeclared samples: {}\n", ids.join(", ")));
            }
        }
        out
    }
}
