use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use camino::Utf8PathBuf;
use serde::{Serialize, Serializer};

use crate::error::RetrieveError;

/// Canonical run identity, taken from the sample sheet's `Experiment Name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RunId {
    type Err = RetrieveError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        file_name_component("run", value).map(Self)
    }
}

/// Identifiers end up as file or directory names in the output tree, so they
/// must be a single non-empty path component.
fn file_name_component(what: &str, value: &str) -> Result<String, RetrieveError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RetrieveError::InvalidInput(format!(
            "{what} identifier must not be empty"
        )));
    }
    if trimmed.contains('/') || trimmed.contains('\\') || trimmed == "." || trimmed == ".." {
        return Err(RetrieveError::InvalidInput(format!(
            "{what} identifier is not a valid file name: {trimmed}"
        )));
    }
    Ok(trimmed.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SampleId(String);

impl SampleId {
    /// Wraps `value` unchecked. Ids that name output files go through
    /// `FromStr` instead.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SampleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SampleId {
    type Err = RetrieveError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        file_name_component("sample", value).map(Self)
    }
}

impl From<&str> for SampleId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReadDirection {
    R1,
    R2,
}

impl fmt::Display for ReadDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadDirection::R1 => write!(f, "R1"),
            ReadDirection::R2 => write!(f, "R2"),
        }
    }
}

/// A position a read file must occupy: `R1`, `R2`, or `R{1,2}_L{1..4}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReadSlot {
    pub direction: ReadDirection,
    pub lane: Option<u8>,
}

impl ReadSlot {
    pub fn single(direction: ReadDirection) -> Self {
        Self {
            direction,
            lane: None,
        }
    }

    pub fn laned(direction: ReadDirection, lane: u8) -> Self {
        Self {
            direction,
            lane: Some(lane),
        }
    }
}

impl fmt::Display for ReadSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.lane {
            Some(lane) => write!(f, "{}_L{lane}", self.direction),
            None => write!(f, "{}", self.direction),
        }
    }
}

impl Serialize for ReadSlot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

pub const MULTI_LANE_COUNT: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstrumentClass {
    SingleLane,
    MultiLane,
}

impl InstrumentClass {
    pub fn required_slots(&self) -> Vec<ReadSlot> {
        let directions = [ReadDirection::R1, ReadDirection::R2];
        match self {
            InstrumentClass::SingleLane => directions.into_iter().map(ReadSlot::single).collect(),
            InstrumentClass::MultiLane => directions
                .into_iter()
                .flat_map(|direction| {
                    (1..=MULTI_LANE_COUNT).map(move |lane| ReadSlot::laned(direction, lane))
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub sample_id: SampleId,
    pub sample_name: String,
    pub reads: BTreeMap<ReadSlot, Utf8PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum DropReason {
    NoFileArea,
    DuplicateId,
    InvalidId { detail: String },
    Unreadable { detail: String },
    MissingSlot { slot: ReadSlot },
    AmbiguousSlot { slot: ReadSlot, candidates: usize },
    DuplicateFileName { file: String },
    CopyFailed { detail: String },
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::NoFileArea => write!(f, "sample has no Files directory"),
            DropReason::DuplicateId => write!(f, "another sample directory has the same id"),
            DropReason::InvalidId { detail } => write!(f, "{detail}"),
            DropReason::Unreadable { detail } => write!(f, "sample directory unreadable: {detail}"),
            DropReason::MissingSlot { slot } => write!(f, "no read file for slot {slot}"),
            DropReason::AmbiguousSlot { slot, candidates } => {
                write!(f, "{candidates} read files match slot {slot}")
            }
            DropReason::DuplicateFileName { file } => {
                write!(f, "read file {file} is already taken by another sample")
            }
            DropReason::CopyFailed { detail } => write!(f, "reads not copied: {detail}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedSample {
    pub sample_id: SampleId,
    pub reason: DropReason,
}

/// Located run-level artifacts. Only the sample sheet is mandatory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunMetadata {
    pub sample_sheet: Utf8PathBuf,
    pub run_info: Option<Utf8PathBuf>,
    pub run_parameters: Option<Utf8PathBuf>,
    pub log_dir: Option<Utf8PathBuf>,
    pub interop_dir: Option<Utf8PathBuf>,
}

/// Resolved sample ids the sample sheet does not declare.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Discrepancy(pub BTreeSet<SampleId>);

impl Discrepancy {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &SampleId> {
        self.0.iter()
    }
}

/// Read-only snapshot of one run as found on the mount.
#[derive(Debug, Clone)]
pub struct Run {
    pub run_id: RunId,
    /// Mount-assigned directory; a lookup key only.
    pub run_dir: Utf8PathBuf,
    pub metadata: RunMetadata,
    pub instrument: InstrumentClass,
    pub samples: BTreeMap<SampleId, Sample>,
    pub dropped: Vec<DroppedSample>,
    pub declared_sample_ids: BTreeSet<SampleId>,
    pub discrepancy: Discrepancy,
}
