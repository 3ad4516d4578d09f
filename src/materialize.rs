use std::collections::BTreeSet;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::{Discrepancy, DropReason, DroppedSample, Run, RunId, Sample};
use crate::error::RetrieveError;
use crate::fs_util;
use crate::schema::ArtifactKind;

pub const READS_DIR: &str = "Data/Intensities/BaseCalls";
pub const INTEROP_DIR: &str = "InterOp";
pub const LOGS_DIR: &str = "Logs";

/// Directory skeleton of an instrument run folder.
pub const SKELETON: [&str; 7] = [
    "Config",
    READS_DIR,
    "Images",
    INTEROP_DIR,
    LOGS_DIR,
    "Recipes",
    "Thumbnail_Images",
];

pub const SAMPLE_SHEET_NAME: &str = "SampleSheet.csv";
pub const RUN_INFO_NAME: &str = "RunInfo.xml";
pub const RUN_PARAMETERS_NAME: &str = "RunParameters.xml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    Materialized,
    AlreadyPresent,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct MaterializationReport {
    pub run_id: Option<RunId>,
    pub run_dir: Utf8PathBuf,
    pub out_dir: Option<Utf8PathBuf>,
    pub status: RunStatus,
    pub files_copied: usize,
    pub samples_paired: usize,
    pub samples_declared: usize,
    pub dropped_samples: Vec<DroppedSample>,
    pub artifacts_found: Vec<String>,
    pub artifacts_missing: Vec<String>,
    pub discrepancy: Discrepancy,
    pub error: Option<String>,
    pub finished_at: String,
}

impl MaterializationReport {
    fn for_run(run: &Run, out_dir: &Utf8Path, status: RunStatus) -> Self {
        let (artifacts_found, artifacts_missing) = artifact_presence(run);
        Self {
            run_id: Some(run.run_id.clone()),
            run_dir: run.run_dir.clone(),
            out_dir: Some(out_dir.to_path_buf()),
            status,
            files_copied: 0,
            samples_paired: run.samples.len(),
            samples_declared: run.declared_sample_ids.len(),
            dropped_samples: run.dropped.clone(),
            artifacts_found,
            artifacts_missing,
            discrepancy: run.discrepancy.clone(),
            error: None,
            finished_at: iso_timestamp(),
        }
    }

    /// A run abandoned before or during materialization.
    pub fn failed(run_dir: &Utf8Path, run_id: Option<RunId>, error: &RetrieveError) -> Self {
        Self {
            run_id,
            run_dir: run_dir.to_path_buf(),
            out_dir: None,
            status: RunStatus::Failed,
            files_copied: 0,
            samples_paired: 0,
            samples_declared: 0,
            dropped_samples: Vec::new(),
            artifacts_found: Vec::new(),
            artifacts_missing: Vec::new(),
            discrepancy: Discrepancy::default(),
            error: Some(error.to_string()),
            finished_at: iso_timestamp(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RunMaterializer {
    rename: bool,
    file_mode: u32,
}

impl RunMaterializer {
    pub fn new(rename: bool) -> Self {
        Self {
            rename,
            file_mode: fs_util::DEFAULT_FILE_MODE,
        }
    }

    pub fn with_file_mode(mut self, file_mode: u32) -> Self {
        self.file_mode = file_mode;
        self
    }

    /// Writes `run` into `out_dir`. A non-empty `out_dir` counts as already
    /// materialized and is left untouched. A sample whose reads cannot all be
    /// written is dropped from the report; the rest of the run is still copied.
    pub fn materialize(
        &self,
        run: &Run,
        out_dir: &Utf8Path,
    ) -> Result<MaterializationReport, RetrieveError> {
        if fs_util::dir_is_non_empty(out_dir)? {
            info!(run_id = %run.run_id, out_dir = %out_dir, "run already materialized, skipping");
            return Ok(MaterializationReport::for_run(
                run,
                out_dir,
                RunStatus::AlreadyPresent,
            ));
        }

        create_skeleton(out_dir)?;
        let mut copied = 0;

        let meta = &run.metadata;
        self.copy(&meta.sample_sheet, &out_dir.join(SAMPLE_SHEET_NAME))?;
        copied += 1;
        for (source, name) in [
            (meta.run_info.as_deref(), RUN_INFO_NAME),
            (meta.run_parameters.as_deref(), RUN_PARAMETERS_NAME),
        ] {
            match source {
                Some(source) => copied += self.copy_best_effort(source, &out_dir.join(name)),
                None => debug!(run_id = %run.run_id, artifact = name, "not present, skipping"),
            }
        }

        copied += self.copy_dir_files(
            meta.interop_dir.as_deref(),
            &out_dir.join(INTEROP_DIR),
            ArtifactKind::InteropDir,
        )?;
        copied += self.copy_dir_files(
            meta.log_dir.as_deref(),
            &out_dir.join(LOGS_DIR),
            ArtifactKind::LogDir,
        )?;

        let reads_dir = out_dir.join(READS_DIR);
        let mut written = BTreeSet::new();
        let mut dropped = Vec::new();
        for sample in run.samples.values() {
            info!(run_id = %run.run_id, sample_id = %sample.sample_id, "copying reads");
            match self.copy_reads(sample, &reads_dir, &mut written) {
                Ok(files) => copied += files,
                Err(reason) => {
                    warn!(run_id = %run.run_id, sample_id = %sample.sample_id, %reason, "dropping sample");
                    dropped.push(DroppedSample {
                        sample_id: sample.sample_id.clone(),
                        reason,
                    });
                }
            }
        }

        let mut report = MaterializationReport::for_run(run, out_dir, RunStatus::Materialized);
        report.files_copied = copied;
        report.samples_paired -= dropped.len();
        report.dropped_samples.extend(dropped);
        info!(run_id = %run.run_id, files = copied, "run materialized");
        Ok(report)
    }

    /// Copies every read of `sample` or none of them: on failure the files
    /// already written for it are removed again.
    fn copy_reads(
        &self,
        sample: &Sample,
        reads_dir: &Utf8Path,
        written: &mut BTreeSet<String>,
    ) -> Result<usize, DropReason> {
        let mut copied = Vec::with_capacity(sample.reads.len());
        let mut outcome = Ok(());
        for (slot, source) in &sample.reads {
            let name = if self.rename {
                format!("{}_{slot}.fastq.gz", sample.sample_id)
            } else {
                source.file_name().unwrap_or_default().to_string()
            };
            if written.contains(&name) {
                outcome = Err(DropReason::DuplicateFileName { file: name });
                break;
            }
            let dest = reads_dir.join(&name);
            if let Err(err) = self.copy(source, &dest) {
                // persisted but not chmod-ed
                if dest.is_file() {
                    copied.push(name);
                }
                outcome = Err(DropReason::CopyFailed {
                    detail: err.to_string(),
                });
                break;
            }
            copied.push(name);
        }

        match outcome {
            Ok(()) => {
                let count = copied.len();
                written.extend(copied);
                Ok(count)
            }
            Err(reason) => {
                for name in copied {
                    let path = reads_dir.join(&name);
                    if let Err(err) = fs::remove_file(path.as_std_path()) {
                        warn!(path = %path, "could not remove partial read: {err}");
                    }
                }
                Err(reason)
            }
        }
    }

    fn copy(&self, source: &Utf8Path, dest: &Utf8Path) -> Result<(), RetrieveError> {
        let bytes = fs_util::copy_file(source, dest, self.file_mode)?;
        debug!(from = %source, to = %dest, bytes, "copied");
        Ok(())
    }

    fn copy_best_effort(&self, source: &Utf8Path, dest: &Utf8Path) -> usize {
        match self.copy(source, dest) {
            Ok(()) => 1,
            Err(err) => {
                warn!(from = %source, "optional artifact not copied: {err}");
                0
            }
        }
    }

    fn copy_dir_files(
        &self,
        source_dir: Option<&Utf8Path>,
        dest_dir: &Utf8Path,
        kind: ArtifactKind,
    ) -> Result<usize, RetrieveError> {
        let Some(source_dir) = source_dir else {
            debug!(artifact = %kind, "not present, skipping");
            return Ok(0);
        };
        let mut copied = 0;
        for file in fs_util::list_files(source_dir)? {
            let Some(name) = file.file_name() else {
                continue;
            };
            copied += self.copy_best_effort(&file, &dest_dir.join(name));
        }
        Ok(copied)
    }
}

/// Creates the run folder skeleton; existing directories are fine.
pub fn create_skeleton(out_dir: &Utf8Path) -> Result<(), RetrieveError> {
    for dir in SKELETON {
        fs_util::ensure_dir(&out_dir.join(dir))?;
    }
    Ok(())
}

fn artifact_presence(run: &Run) -> (Vec<String>, Vec<String>) {
    let meta = &run.metadata;
    let present = [
        (ArtifactKind::SampleSheet, true),
        (ArtifactKind::RunInfo, meta.run_info.is_some()),
        (ArtifactKind::RunParameters, meta.run_parameters.is_some()),
        (ArtifactKind::LogDir, meta.log_dir.is_some()),
        (ArtifactKind::InteropDir, meta.interop_dir.is_some()),
    ];
    let (found, missing): (Vec<_>, Vec<_>) = present.into_iter().partition(|(_, found)| *found);
    (
        found.into_iter().map(|(kind, _)| kind.to_string()).collect(),
        missing.into_iter().map(|(kind, _)| kind.to_string()).collect(),
    )
}

fn iso_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
