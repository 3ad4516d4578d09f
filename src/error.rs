use camino::Utf8PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum RetrieveError {
    #[error("no sample sheet found for run directory {run_dir}")]
    #[diagnostic(help("confirm the run was shared on BaseSpace and the mount is synchronised"))]
    MissingSampleSheet { run_dir: Utf8PathBuf },

    #[error("run directory does not exist: {0}")]
    MissingRunDirectory(Utf8PathBuf),

    #[error("project directory does not exist: {0}")]
    MissingProjectDirectory(Utf8PathBuf),

    #[error("could not find '{field}' in sample sheet {path}")]
    SampleSheetField { path: Utf8PathBuf, field: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(Utf8PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
