use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, warn};

use crate::domain::RunMetadata;
use crate::error::RetrieveError;
use crate::probe::{Expect, PathProbe, Probe};
use crate::sample::SampleResolver;
use crate::samplesheet;
use crate::schema::{ArtifactKind, ProbeContext, SchemaTable};

pub const NESTED_LOG_DIR: &str = "ParentAppSession/Logs";

/// Finds run-level artifacts through the candidate table.
#[derive(Debug, Clone, Default)]
pub struct MetadataLocator {
    table: SchemaTable,
    mount_root: Option<Utf8PathBuf>,
}

impl MetadataLocator {
    pub fn new(table: SchemaTable) -> Self {
        Self {
            table,
            mount_root: None,
        }
    }

    /// Root of the BaseMount mount, for candidates anchored with `@mount/`.
    pub fn with_mount_root(mut self, mount_root: Option<Utf8PathBuf>) -> Self {
        self.mount_root = mount_root;
        self
    }

    pub fn mount_root(&self) -> Option<&Utf8Path> {
        self.mount_root.as_deref()
    }

    pub fn locate(&self, run_dir: &Utf8Path) -> Result<RunMetadata, RetrieveError> {
        let sample_sheet = self.locate_sample_sheet(run_dir)?;
        // Legacy candidates are keyed by run name, which lives in the sheet.
        let run_name = samplesheet::extract_experiment_name(&sample_sheet).ok();
        self.locate_artifacts(run_dir, sample_sheet, run_name.as_deref())
    }

    pub fn locate_sample_sheet(&self, run_dir: &Utf8Path) -> Result<Utf8PathBuf, RetrieveError> {
        if !run_dir.is_dir() {
            return Err(RetrieveError::MissingRunDirectory(run_dir.to_path_buf()));
        }
        let ctx = ProbeContext {
            run_dir,
            mount_root: self.mount_root.as_deref(),
            run_name: None,
        };
        let sample_sheet = self
            .probe(ArtifactKind::SampleSheet, &ctx)
            .found()
            .ok_or_else(|| RetrieveError::MissingSampleSheet {
                run_dir: run_dir.to_path_buf(),
            })?;
        debug!(path = %sample_sheet, "found sample sheet");
        Ok(sample_sheet)
    }

    /// The optional artifacts, for a run whose sheet is already known.
    /// `run_name` fills `{run_name}` in mount-anchored candidates.
    pub fn locate_artifacts(
        &self,
        run_dir: &Utf8Path,
        sample_sheet: Utf8PathBuf,
        run_name: Option<&str>,
    ) -> Result<RunMetadata, RetrieveError> {
        let ctx = ProbeContext {
            run_dir,
            mount_root: self.mount_root.as_deref(),
            run_name,
        };

        let run_info = self.optional(ArtifactKind::RunInfo, &ctx);
        let run_parameters = self.optional(ArtifactKind::RunParameters, &ctx);
        let interop_dir = self.optional(ArtifactKind::InteropDir, &ctx);
        let log_dir = match self.probe(ArtifactKind::LogDir, &ctx).found() {
            Some(dir) => Some(dir),
            None => {
                let nested = Self::nested_log_dir(run_dir)?;
                if nested.is_none() {
                    warn!(run_dir = %run_dir, artifact = %ArtifactKind::LogDir, "artifact not found");
                }
                nested
            }
        };

        Ok(RunMetadata {
            sample_sheet,
            run_info,
            run_parameters,
            log_dir,
            interop_dir,
        })
    }

    fn probe(&self, kind: ArtifactKind, ctx: &ProbeContext<'_>) -> Probe {
        PathProbe::resolve(self.table.expand(kind, ctx), kind.expect())
    }

    fn optional(&self, kind: ArtifactKind, ctx: &ProbeContext<'_>) -> Option<Utf8PathBuf> {
        match self.probe(kind, ctx) {
            Probe::Found(path) => {
                debug!(artifact = %kind, path = %path, "found artifact");
                Some(path)
            }
            Probe::NotFound { tried } => {
                warn!(
                    run_dir = %ctx.run_dir,
                    artifact = %kind,
                    tried = tried.len(),
                    "artifact not found"
                );
                None
            }
        }
    }

    /// Log placement follows run topology: when the run has no `Logs`
    /// directory, the first sample directory holding
    /// `ParentAppSession/Logs` supplies it.
    fn nested_log_dir(run_dir: &Utf8Path) -> Result<Option<Utf8PathBuf>, RetrieveError> {
        let mut sample_dirs = SampleResolver::sample_dirs(run_dir)?;
        for dir in SampleResolver::output_sample_dirs(run_dir)? {
            if !sample_dirs.contains(&dir) {
                sample_dirs.push(dir);
            }
        }
        let found = PathProbe::resolve(
            sample_dirs.iter().map(|dir| dir.join(NESTED_LOG_DIR)),
            Expect::Dir,
        )
        .found();
        if let Some(dir) = &found {
            debug!(path = %dir, "adopting nested log directory");
        }
        Ok(found)
    }
}
