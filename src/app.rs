use std::collections::BTreeSet;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{info, warn};

use crate::config::ResolvedConfig;
use crate::domain::{Run, RunId};
use crate::error::RetrieveError;
use crate::fs_util;
use crate::materialize::{MaterializationReport, RunMaterializer};
use crate::metadata::MetadataLocator;
use crate::reconcile::ReconciliationEngine;
use crate::sample::SampleResolver;
use crate::samplesheet::SampleSheet;

/// Where runs live under a project, newest layout first.
pub const SESSION_DIRS: [&str; 2] = ["AppSessions.v1", "AppSessions"];
pub const RUN_DIR_PREFIX: &str = "FASTQ";

/// Depth of the mount root above a project (`<mount>/Projects/<project>`).
const PROJECT_DEPTH: usize = 2;
/// Depth of the mount root above a run directory.
const RUN_DEPTH: usize = PROJECT_DEPTH + 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputTarget {
    Project(Utf8PathBuf),
    Run(Utf8PathBuf),
}

impl InputTarget {
    /// Exactly one of a project or a run must be given.
    pub fn from_args(
        project_dir: Option<Utf8PathBuf>,
        run_dir: Option<Utf8PathBuf>,
    ) -> Result<Self, RetrieveError> {
        match (project_dir, run_dir) {
            (Some(project), None) => {
                if !project.is_dir() {
                    return Err(RetrieveError::MissingProjectDirectory(project));
                }
                Ok(InputTarget::Project(project))
            }
            (None, Some(run)) => {
                if !run.is_dir() {
                    return Err(RetrieveError::MissingRunDirectory(run));
                }
                Ok(InputTarget::Run(run))
            }
            (Some(_), Some(_)) => Err(RetrieveError::InvalidInput(
                "provide either a project directory or a run directory, not both".to_string(),
            )),
            (None, None) => Err(RetrieveError::InvalidInput(
                "a project directory or a run directory is required".to_string(),
            )),
        }
    }
}

/// Drives resolution and materialization, one run at a time.
#[derive(Debug, Clone)]
pub struct App {
    config: ResolvedConfig,
    materializer: RunMaterializer,
}

impl App {
    pub fn new(config: ResolvedConfig, rename: bool) -> Self {
        let materializer = RunMaterializer::new(rename).with_file_mode(config.file_mode);
        Self {
            config,
            materializer,
        }
    }

    pub fn retrieve(
        &self,
        target: &InputTarget,
        out_dir: &Utf8Path,
    ) -> Result<Vec<MaterializationReport>, RetrieveError> {
        match target {
            InputTarget::Project(project_dir) => self.retrieve_project(project_dir, out_dir),
            InputTarget::Run(run_dir) => Ok(vec![self.retrieve_run(run_dir, out_dir)?]),
        }
    }

    /// Every run of the project. A failing run is reported and skipped.
    pub fn retrieve_project(
        &self,
        project_dir: &Utf8Path,
        out_dir: &Utf8Path,
    ) -> Result<Vec<MaterializationReport>, RetrieveError> {
        if !project_dir.is_dir() {
            return Err(RetrieveError::MissingProjectDirectory(
                project_dir.to_path_buf(),
            ));
        }
        fs_util::ensure_dir(out_dir)?;
        let mount_root = mount_root_of(project_dir, PROJECT_DEPTH);

        let run_dirs = Self::run_dirs(project_dir)?;
        info!(project = %project_dir, runs = run_dirs.len(), "discovered runs");

        let mut reports = Vec::with_capacity(run_dirs.len());
        for run_dir in run_dirs {
            let report = match self.resolve_run(&run_dir, mount_root.clone()) {
                Ok(run) => self
                    .materialize(&run, out_dir)
                    .unwrap_or_else(|err| {
                        warn!(run_id = %run.run_id, "materialization failed: {err}");
                        MaterializationReport::failed(&run_dir, Some(run.run_id.clone()), &err)
                    }),
                Err(err) => {
                    warn!(run_dir = %run_dir, "skipping run: {err}");
                    MaterializationReport::failed(&run_dir, None, &err)
                }
            };
            reports.push(report);
        }
        Ok(reports)
    }

    /// A single explicit run; failures propagate to the caller.
    pub fn retrieve_run(
        &self,
        run_dir: &Utf8Path,
        out_dir: &Utf8Path,
    ) -> Result<MaterializationReport, RetrieveError> {
        fs_util::ensure_dir(out_dir)?;
        let run = self.resolve_run(run_dir, mount_root_of(run_dir, RUN_DEPTH))?;
        self.materialize(&run, out_dir)
    }

    /// Builds the read-only model of one run from the mount.
    pub fn resolve_run(
        &self,
        run_dir: &Utf8Path,
        mount_root: Option<Utf8PathBuf>,
    ) -> Result<Run, RetrieveError> {
        let locator = MetadataLocator::new(self.config.schema.clone()).with_mount_root(mount_root);
        let sheet_path = locator.locate_sample_sheet(run_dir)?;
        let sheet = SampleSheet::read(&sheet_path)?;
        let metadata = locator.locate_artifacts(run_dir, sheet_path, Some(sheet.run_id.as_str()))?;
        info!(run_id = %sheet.run_id, run_dir = %run_dir, "resolving run");

        let resolution = SampleResolver::resolve(run_dir)?;
        let resolved = resolution.samples.keys().cloned().collect::<BTreeSet<_>>();
        let discrepancy = ReconciliationEngine::reconcile(&resolved, &sheet.declared_sample_ids);
        ReconciliationEngine::report(&sheet.run_id, &discrepancy);

        Ok(Run {
            run_id: sheet.run_id,
            run_dir: run_dir.to_path_buf(),
            metadata,
            instrument: resolution.instrument,
            samples: resolution.samples,
            dropped: resolution.dropped,
            declared_sample_ids: sheet.declared_sample_ids,
            discrepancy,
        })
    }

    /// `FASTQ*` entries of the project's app-session directory.
    pub fn run_dirs(project_dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>, RetrieveError> {
        for sessions in SESSION_DIRS {
            let runs = fs_util::list_dirs(&project_dir.join(sessions))?
                .into_iter()
                .filter(|dir| {
                    dir.file_name()
                        .is_some_and(|name| name.starts_with(RUN_DIR_PREFIX))
                })
                .collect::<Vec<_>>();
            if !runs.is_empty() {
                return Ok(runs);
            }
        }
        Ok(Vec::new())
    }

    fn materialize(
        &self,
        run: &Run,
        out_dir: &Utf8Path,
    ) -> Result<MaterializationReport, RetrieveError> {
        self.materializer
            .materialize(run, &run_out_dir(out_dir, &run.run_id))
    }
}

pub fn run_out_dir(out_dir: &Utf8Path, run_id: &RunId) -> Utf8PathBuf {
    out_dir.join(run_id.as_str())
}

fn mount_root_of(dir: &Utf8Path, depth: usize) -> Option<Utf8PathBuf> {
    let absolute = dir.canonicalize_utf8().ok()?;
    absolute.ancestors().nth(depth).map(Utf8Path::to_path_buf)
}
