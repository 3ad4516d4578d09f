//! Known BaseMount locations for run-level artifacts.
//!
//! Each artifact kind maps to an ordered list of path templates. Order is
//! priority: the most common layout first, legacy fallbacks last. Supporting
//! a new mount layout means adding a row here or an `extra_candidates` entry
//! in the config file.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::RetrieveError;
use crate::probe::Expect;

pub const MOUNT_PREFIX: &str = "@mount/";
pub const RUN_NAME_PLACEHOLDER: &str = "{run_name}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ArtifactKind {
    SampleSheet,
    RunInfo,
    RunParameters,
    LogDir,
    InteropDir,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 5] = [
        ArtifactKind::SampleSheet,
        ArtifactKind::RunInfo,
        ArtifactKind::RunParameters,
        ArtifactKind::LogDir,
        ArtifactKind::InteropDir,
    ];

    pub fn expect(&self) -> Expect {
        match self {
            ArtifactKind::SampleSheet | ArtifactKind::RunInfo | ArtifactKind::RunParameters => {
                Expect::File
            }
            ArtifactKind::LogDir | ArtifactKind::InteropDir => Expect::Dir,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::SampleSheet => "sample_sheet",
            ArtifactKind::RunInfo => "run_info",
            ArtifactKind::RunParameters => "run_parameters",
            ArtifactKind::LogDir => "log_dir",
            ArtifactKind::InteropDir => "interop_dir",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactKind {
    type Err = RetrieveError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ArtifactKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value.trim())
            .ok_or_else(|| RetrieveError::ConfigParse(format!("unknown artifact kind: {value}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    NextSeq,
    MiSeq,
    Legacy,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Run,
    Mount,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub anchor: Anchor,
    pub template: String,
    pub layout: Layout,
}

impl Candidate {
    /// Templates starting with `@mount/` are anchored at the mount root.
    pub fn parse(template: &str, layout: Layout) -> Self {
        let template = template.trim();
        match template.strip_prefix(MOUNT_PREFIX) {
            Some(rest) => Self {
                anchor: Anchor::Mount,
                template: rest.to_string(),
                layout,
            },
            None => Self {
                anchor: Anchor::Run,
                template: template.trim_start_matches('/').to_string(),
                layout,
            },
        }
    }

    /// Expands the template for one run. `None` when the template needs a
    /// mount root or run name that is not known.
    pub fn expand(&self, ctx: &ProbeContext<'_>) -> Option<Utf8PathBuf> {
        let relative = if self.template.contains(RUN_NAME_PLACEHOLDER) {
            self.template.replace(RUN_NAME_PLACEHOLDER, ctx.run_name?)
        } else {
            self.template.clone()
        };
        let base = match self.anchor {
            Anchor::Run => ctx.run_dir,
            Anchor::Mount => ctx.mount_root?,
        };
        Some(base.join(relative))
    }
}

/// Per-run values substituted into candidate templates.
#[derive(Debug, Clone, Copy)]
pub struct ProbeContext<'a> {
    pub run_dir: &'a Utf8Path,
    pub mount_root: Option<&'a Utf8Path>,
    pub run_name: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaTable {
    entries: BTreeMap<ArtifactKind, Vec<Candidate>>,
}

impl Default for SchemaTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl SchemaTable {
    pub fn builtin() -> Self {
        use Layout::*;

        let rows: [(ArtifactKind, Vec<Candidate>); 5] = [
            (
                ArtifactKind::SampleSheet,
                vec![
                    Candidate::parse("Properties/Input.sample-sheet", MiSeq),
                    Candidate::parse("Properties/Input.Runs/0/Files/SampleSheet.csv", NextSeq),
                    Candidate::parse(
                        "Properties/Input.Libraries/0/Properties/Input.Runs/0/Files/SampleSheet.csv",
                        NextSeq,
                    ),
                    Candidate::parse("Files/SampleSheet.csv", Legacy),
                ],
            ),
            (
                ArtifactKind::RunInfo,
                vec![
                    Candidate::parse("Properties/Input.Runs/0/Files/RunInfo.xml", NextSeq),
                    Candidate::parse("Logs/RunInfo.xml", MiSeq),
                    Candidate::parse("@mount/Runs/{run_name}/Files/RunInfo.xml", Legacy),
                ],
            ),
            (
                ArtifactKind::RunParameters,
                vec![
                    Candidate::parse("Properties/Input.Runs/0/Files/RunParameters.xml", NextSeq),
                    Candidate::parse("Properties/Input.Runs/0/Files/runParameters.xml", MiSeq),
                    Candidate::parse("@mount/Runs/{run_name}/Files/RunParameters.xml", Legacy),
                    Candidate::parse("@mount/Runs/{run_name}/Files/runParameters.xml", Legacy),
                ],
            ),
            (
                ArtifactKind::LogDir,
                vec![Candidate::parse("Logs", MiSeq)],
            ),
            (
                ArtifactKind::InteropDir,
                vec![
                    Candidate::parse("Properties/Input.Runs/0/Files/InterOp", NextSeq),
                    Candidate::parse("@mount/Runs/{run_name}/Files/InterOp", Legacy),
                ],
            ),
        ];

        Self {
            entries: rows.into_iter().collect(),
        }
    }

    pub fn candidates(&self, kind: ArtifactKind) -> &[Candidate] {
        self.entries
            .get(&kind)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Appends templates after the built-in rows for `kind`.
    pub fn extend<I, S>(&mut self, kind: ArtifactKind, templates: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let row = self.entries.entry(kind).or_default();
        row.extend(
            templates
                .into_iter()
                .map(|template| Candidate::parse(template.as_ref(), Layout::Custom)),
        );
    }

    pub fn expand(&self, kind: ArtifactKind, ctx: &ProbeContext<'_>) -> Vec<Utf8PathBuf> {
        self.candidates(kind)
            .iter()
            .filter_map(|candidate| candidate.expand(ctx))
            .collect()
    }
}
